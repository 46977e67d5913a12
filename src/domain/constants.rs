//! Centralized constants for commonly repeated DER/OID bytes, tags and PDF values.
//! Keep this intentionally small; only broadly reused literals should live here.

// === ASN.1 DER Constants ===

/// ASN.1 NULL value (tag + length + null)
pub const ASN1_NULL: &[u8] = &[0x05, 0x00];

/// ASN.1 INTEGER tag
pub const ASN1_INTEGER_TAG: u8 = 0x02;

/// ASN.1 OCTET STRING tag
pub const ASN1_OCTET_STRING_TAG: u8 = 0x04;

/// ASN.1 OBJECT IDENTIFIER tag
pub const ASN1_OID_TAG: u8 = 0x06;

/// ASN.1 UTCTime tag
pub const ASN1_UTC_TIME_TAG: u8 = 0x17;

/// ASN.1 GeneralizedTime tag (dates from 2050 on)
pub const ASN1_GENERALIZED_TIME_TAG: u8 = 0x18;

/// ASN.1 SEQUENCE tag
pub const ASN1_SEQUENCE_TAG: u8 = 0x30;

/// ASN.1 SET tag
pub const ASN1_SET_TAG: u8 = 0x31;

/// ASN.1 context-specific constructed tag [0]
pub const ASN1_CONTEXT_0_TAG: u8 = 0xa0;

/// CMS version 1 for `SignedData` and `SignerInfo` with issuerAndSerialNumber
pub const CMS_VERSION_1: &[u8] = &[0x02, 0x01, 0x01];

// === PKCS#7/CMS OID Constants ===

/// PKCS#7 data OID (1.2.840.113549.1.7.1) DER encoding
pub const PKCS7_DATA_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01];

/// PKCS#7 `SignedData` OID (1.2.840.113549.1.7.2) DER encoding
pub const PKCS7_SIGNED_DATA_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02];

/// PKCS#9 contentType attribute OID (1.2.840.113549.1.9.3) DER encoding
pub const PKCS9_CONTENT_TYPE_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x03];

/// PKCS#9 messageDigest attribute OID (1.2.840.113549.1.9.4) DER encoding
pub const PKCS9_MESSAGE_DIGEST_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x04];

/// PKCS#9 signingTime attribute OID (1.2.840.113549.1.9.5) DER encoding
pub const PKCS9_SIGNING_TIME_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x05];

// === Algorithm OIDs ===

/// SHA-256 algorithm OID (2.16.840.1.101.3.4.2.1) DER encoding
pub const SHA256_ALGORITHM_OID: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];

/// rsaEncryption OID (1.2.840.113549.1.1.1) DER encoding
pub const RSA_ENCRYPTION_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];

/// ecdsa-with-SHA256 OID (1.2.840.10045.4.3.2) DER encoding
pub const ECDSA_WITH_SHA256_OID: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x02];

// === PDF Signature Constants ===

/// Reference page width (A4, points) used by the stamp presets
pub const REFERENCE_PAGE_WIDTH: f64 = 595.0;

/// Reference page height (A4, points) used by the stamp presets
pub const REFERENCE_PAGE_HEIGHT: f64 = 842.0;

/// Signature handler written into /Filter
pub const PDF_SIG_FILTER: &[u8] = b"Adobe.PPKLite";

/// Detached CMS sub-filter written into /SubFilter
pub const PDF_SIG_SUBFILTER: &[u8] = b"adbe.pkcs7.detached";

/// Widget annotation flags: Print (4) + Locked (128)
pub const PDF_WIDGET_FLAGS: i64 = 132;

/// AcroForm /SigFlags: SignaturesExist (1) + AppendOnly (2)
pub const PDF_SIG_FLAGS: i64 = 3;

/// Prefix for signature field names (`Signature1`, `Signature2`, ...)
pub const PDF_SIG_FIELD_PREFIX: &str = "Signature";

/// Width reserved for each placeholder number in /ByteRange
pub const BYTE_RANGE_DIGITS: usize = 10;
