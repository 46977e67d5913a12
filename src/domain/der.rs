//! Minimal DER writer used to assemble CMS structures by hand.
//!
//! Only the handful of universal types needed for a detached `SignedData`
//! are covered. Every function returns a complete TLV.

use crate::domain::constants;
use chrono::{DateTime, Datelike, Utc};

/// Encode a DER length in short or long form.
#[must_use]
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        return vec![len as u8];
    }
    let bytes: Vec<u8> = len
        .to_be_bytes()
        .iter()
        .copied()
        .skip_while(|b| *b == 0)
        .collect();
    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.push(0x80 | bytes.len() as u8);
    out.extend_from_slice(&bytes);
    out
}

/// Wrap `content` in a tag and length.
#[must_use]
pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 6);
    out.push(tag);
    out.extend_from_slice(&encode_length(content.len()));
    out.extend_from_slice(content);
    out
}

/// SEQUENCE of already encoded parts, kept in order.
#[must_use]
pub fn sequence(parts: &[&[u8]]) -> Vec<u8> {
    tlv(constants::ASN1_SEQUENCE_TAG, &parts.concat())
}

/// SET OF already encoded elements, sorted by encoding as DER requires.
#[must_use]
pub fn set_of(mut elements: Vec<Vec<u8>>) -> Vec<u8> {
    elements.sort();
    tlv(constants::ASN1_SET_TAG, &elements.concat())
}

/// OBJECT IDENTIFIER from its content octets.
#[must_use]
pub fn oid(content: &[u8]) -> Vec<u8> {
    tlv(constants::ASN1_OID_TAG, content)
}

#[must_use]
pub fn octet_string(content: &[u8]) -> Vec<u8> {
    tlv(constants::ASN1_OCTET_STRING_TAG, content)
}

/// INTEGER from unsigned big-endian magnitude bytes.
#[must_use]
pub fn unsigned_integer(magnitude: &[u8]) -> Vec<u8> {
    let trimmed: Vec<u8> = magnitude.iter().copied().skip_while(|b| *b == 0).collect();
    let mut content = Vec::with_capacity(trimmed.len() + 1);
    if trimmed.first().map_or(true, |b| b & 0x80 != 0) {
        content.push(0);
    }
    content.extend_from_slice(&trimmed);
    tlv(constants::ASN1_INTEGER_TAG, &content)
}

/// `AlgorithmIdentifier`, with explicit NULL parameters when requested.
#[must_use]
pub fn algorithm_identifier(oid_content: &[u8], null_params: bool) -> Vec<u8> {
    let id = oid(oid_content);
    if null_params {
        sequence(&[&id, constants::ASN1_NULL])
    } else {
        sequence(&[&id])
    }
}

/// RFC 5280 time: UTCTime through 2049, GeneralizedTime afterwards.
#[must_use]
pub fn time(at: DateTime<Utc>) -> Vec<u8> {
    if at.year() < 2050 {
        let text = at.format("%y%m%d%H%M%SZ").to_string();
        tlv(constants::ASN1_UTC_TIME_TAG, text.as_bytes())
    } else {
        let text = at.format("%Y%m%d%H%M%SZ").to_string();
        tlv(constants::ASN1_GENERALIZED_TIME_TAG, text.as_bytes())
    }
}
