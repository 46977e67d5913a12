//! End-to-end PDF signing against generated certificates and documents.

mod common;

use common::*;
use lopdf::{Document, Object};
use openssl::cms::{CMSOptions, CmsContentInfo};
use pdf_trust::infra::config::SigningDefaults;
use pdf_trust::{
    sign_pdf_file, CertificateError, CertificateLoader, Passphrase, PdfSigner, SignOptions,
    SignWorkflow, SignatureAnchor, SigningCredential, SigningError, SigningRequest, TargetPage,
    TrustError,
};

fn credential() -> SigningCredential {
    CertificateLoader::load(&valid_pfx(), &Passphrase::from(PFX_PASSWORD)).unwrap()
}

fn signer() -> PdfSigner {
    PdfSigner::new(SigningDefaults::default())
}

fn assert_signature_verifies(pdf: &[u8]) {
    let range = byte_range(pdf);
    assert_eq!(range[0], 0);
    assert_eq!(range[2] + range[3], pdf.len());

    let der = signature_der(pdf, range);
    let mut cms = CmsContentInfo::from_der(&der).unwrap();
    let content = signed_content(pdf, range);
    cms.verify(
        None,
        None,
        Some(content.as_slice()),
        None,
        CMSOptions::NO_SIGNER_CERT_VERIFY | CMSOptions::BINARY,
    )
    .unwrap();
}

/// Signature field dictionaries reachable from the AcroForm, in order.
fn signature_fields(pdf: &[u8]) -> Vec<lopdf::Dictionary> {
    let document = Document::load_mem(pdf).unwrap();
    let root = document.trailer.get(b"Root").unwrap().as_reference().unwrap();
    let catalog = document.get_dictionary(root).unwrap();
    let acroform = match catalog.get(b"AcroForm").unwrap() {
        Object::Reference(id) => document.get_dictionary(*id).unwrap(),
        Object::Dictionary(dict) => dict,
        other => panic!("unexpected AcroForm {other:?}"),
    };
    acroform
        .get(b"Fields")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|field| {
            document
                .get_dictionary(field.as_reference().unwrap())
                .unwrap()
                .clone()
        })
        .collect()
}

fn field_name(field: &lopdf::Dictionary) -> String {
    match field.get(b"T").unwrap() {
        Object::String(bytes, _) => String::from_utf8_lossy(bytes).into_owned(),
        other => panic!("unexpected /T {other:?}"),
    }
}

#[test]
fn invisible_signature_is_an_incremental_update() {
    let original = a4_pdf(2);
    let request = SigningRequest::new(original.clone(), credential())
        .with_reason("Aprovação do contrato")
        .with_location("Vitória");

    let signed = signer().sign(request).unwrap();
    assert!(signed.bytes.starts_with(&original));
    assert!(signed.bytes.len() > original.len());
    assert_eq!(signed.signer_common_name, SIGNER_CN);
    assert_signature_verifies(&signed.bytes);

    let fields = signature_fields(&signed.bytes);
    assert_eq!(fields.len(), 1);
    assert_eq!(field_name(&fields[0]), "Signature1");
    let rect = fields[0].get(b"Rect").unwrap().as_array().unwrap();
    assert!(rect.iter().all(|v| matches!(v, Object::Integer(0))));
    assert!(fields[0].get(b"AP").is_err());
}

#[test]
fn visible_signature_carries_appearance_on_target_page() {
    let original = a4_pdf(3);
    let request = SigningRequest::new(original.clone(), credential())
        .with_reason("Documento assinado digitalmente")
        .with_stamp(SignatureAnchor::BottomRight, TargetPage::Last);

    let signed = signer().sign(request).unwrap();
    assert!(signed.bytes.starts_with(&original));
    assert_signature_verifies(&signed.bytes);

    let document = Document::load_mem(&signed.bytes).unwrap();
    let pages: Vec<_> = document.get_pages().into_values().collect();
    let last_page = document.get_dictionary(pages[2]).unwrap();
    let annots = last_page.get(b"Annots").unwrap().as_array().unwrap();
    assert_eq!(annots.len(), 1);
    assert!(document
        .get_dictionary(pages[0])
        .unwrap()
        .get(b"Annots")
        .is_err());

    let widget = document
        .get_dictionary(annots[0].as_reference().unwrap())
        .unwrap();
    assert!(widget.get(b"AP").is_ok());
    let rect: Vec<f64> = widget
        .get(b"Rect")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|v| match v {
            Object::Integer(i) => *i as f64,
            Object::Real(r) => f64::from(*r),
            other => panic!("unexpected coordinate {other:?}"),
        })
        .collect();
    assert_eq!(rect, vec![365.0, 30.0, 565.0, 110.0]);
}

#[test]
fn stamp_is_reanchored_on_letter_pages() {
    let original = sample_pdf(1, 612.0, 792.0);
    let request = SigningRequest::new(original, credential())
        .with_stamp(SignatureAnchor::TopLeft, TargetPage::First);
    let signed = signer().sign(request).unwrap();
    assert_signature_verifies(&signed.bytes);
}

#[test]
fn page_smaller_than_stamp_is_a_layout_error() {
    let original = sample_pdf(1, 150.0, 100.0);
    let request = SigningRequest::new(original, credential())
        .with_stamp(SignatureAnchor::CenterBottom, TargetPage::First);
    assert!(matches!(
        signer().sign(request),
        Err(SigningError::AppearanceLayoutError(_))
    ));
}

#[test]
fn expired_certificate_is_rejected_before_the_pdf() {
    let (key, cert) = expired_certificate();
    let pfx = pkcs12(&key, &cert, PFX_PASSWORD);
    let credential = CertificateLoader::load(&pfx, &Passphrase::from(PFX_PASSWORD)).unwrap();

    // Not a PDF: an expired certificate must fail first
    let request = SigningRequest::new(b"garbage".to_vec(), credential);
    assert!(matches!(
        signer().sign(request),
        Err(SigningError::InvalidCertificate(CertificateError::Expired(_)))
    ));
}

#[test]
fn corrupt_pdf_is_reported() {
    let request = SigningRequest::new(b"%PDF-1.7\nnot really a pdf".to_vec(), credential());
    assert!(matches!(
        signer().sign(request),
        Err(SigningError::PdfCorrupt(_))
    ));
}

#[test]
fn resigning_adds_a_second_field() {
    let first = signer()
        .sign(SigningRequest::new(a4_pdf(1), credential()))
        .unwrap();
    let second = signer()
        .sign(
            SigningRequest::new(first.bytes.clone(), credential())
                .with_stamp(SignatureAnchor::BottomLeft, TargetPage::First),
        )
        .unwrap();

    assert!(second.bytes.starts_with(&first.bytes));
    assert_signature_verifies(&second.bytes);

    let names: Vec<String> = signature_fields(&second.bytes).iter().map(field_name).collect();
    assert_eq!(names, ["Signature1", "Signature2"]);
}

#[test]
fn workflow_applies_configured_defaults() {
    let workflow = SignWorkflow::new(SigningDefaults::default());
    let outcome = workflow
        .sign(
            a4_pdf(1),
            &valid_pfx(),
            &Passphrase::from(PFX_PASSWORD),
            &SignOptions::default(),
        )
        .unwrap();

    assert!(outcome.certificate.validity.is_valid);
    let text = String::from_utf8_lossy(&outcome.document.bytes);
    assert!(text.contains("/Reason (Documento assinado digitalmente)"));
    assert!(text.contains("/Location (Brasil)"));
}

#[test]
fn workflow_surfaces_wrong_password() {
    let result = SignWorkflow::new(SigningDefaults::default()).sign(
        a4_pdf(1),
        &valid_pfx(),
        &Passphrase::from("nope"),
        &SignOptions::default(),
    );
    assert!(matches!(
        result,
        Err(TrustError::Certificate(CertificateError::WrongPassword))
    ));
}

#[test]
fn file_helper_writes_nothing_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    let pfx = dir.path().join("cert.pfx");
    std::fs::write(&input, a4_pdf(1)).unwrap();
    std::fs::write(&pfx, valid_pfx()).unwrap();

    let failed = sign_pdf_file(
        &input,
        &output,
        &pfx,
        &Passphrase::from("wrong"),
        &SignOptions::default(),
        SigningDefaults::default(),
    );
    assert!(failed.is_err());
    assert!(!output.exists());

    let options = SignOptions {
        visible: true,
        ..SignOptions::default()
    };
    let outcome = sign_pdf_file(
        &input,
        &output,
        &pfx,
        &Passphrase::from(PFX_PASSWORD),
        &options,
        SigningDefaults::default(),
    )
    .unwrap();
    assert_eq!(std::fs::read(&output).unwrap(), outcome.document.bytes);
}
