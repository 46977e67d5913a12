//! Shared fixtures for integration tests: throwaway certificates, PKCS#12
//! bundles, small PDFs with exact xref offsets, results markup, and a
//! scripted automation session.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509NameBuilder, X509};
use pdf_trust::adapters::validator::{AutomationSession, SessionFactory};
use pdf_trust::infra::config::ValidatorConfig;
use pdf_trust::{ValidationError, ValidationResult};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const PFX_PASSWORD: &str = "correct horse battery staple";
pub const SIGNER_CN: &str = "MARIA DA SILVA:12345678901";

/// Self-signed RSA-2048 certificate valid from `now + starts_in` for
/// `lifetime`.
pub fn self_signed(
    common_name: &str,
    starts_in: Duration,
    lifetime: Duration,
) -> (PKey<Private>, X509) {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, common_name).unwrap();
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, "ICP-Brasil Teste").unwrap();
    let name = name.build();

    let not_before = Utc::now() + starts_in;
    let not_after = not_before + lifetime;

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(424_242).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::from_unix(not_before.timestamp()).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::from_unix(not_after.timestamp()).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    (key, builder.build())
}

/// A certificate valid for a year starting yesterday.
pub fn valid_certificate() -> (PKey<Private>, X509) {
    self_signed(SIGNER_CN, Duration::days(-1), Duration::days(365))
}

/// A certificate that expired a week ago.
pub fn expired_certificate() -> (PKey<Private>, X509) {
    self_signed(SIGNER_CN, Duration::days(-400), Duration::days(393))
}

pub fn pkcs12(key: &PKey<Private>, cert: &X509, password: &str) -> Vec<u8> {
    Pkcs12::builder()
        .name("signer")
        .pkey(key)
        .cert(cert)
        .build2(password)
        .unwrap()
        .to_der()
        .unwrap()
}

pub fn valid_pfx() -> Vec<u8> {
    let (key, cert) = valid_certificate();
    pkcs12(&key, &cert, PFX_PASSWORD)
}

/// A PDF with `page_count` pages of `width` x `height` points.
pub fn sample_pdf(page_count: usize, width: f64, height: f64) -> Vec<u8> {
    let mut bodies = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        String::new(),
    ];
    let mut kids = Vec::new();
    for index in 0..page_count {
        let page_id = bodies.len() + 1;
        let content_id = page_id + 1;
        kids.push(format!("{page_id} 0 R"));
        bodies.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {width} {height}] /Contents {content_id} 0 R /Resources << >> >>"
        ));
        let content = format!("BT /F1 12 Tf 72 72 Td (Pagina {}) Tj ET", index + 1);
        bodies.push(format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ));
    }
    bodies[1] = format!(
        "<< /Type /Pages /Kids [{}] /Count {page_count} >>",
        kids.join(" ")
    );

    let mut out = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::new();
    for (index, body) in bodies.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", index + 1).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(
        format!("xref\n0 {}\n0000000000 65535 f \n", bodies.len() + 1).as_bytes(),
    );
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            bodies.len() + 1
        )
        .as_bytes(),
    );
    out
}

pub fn a4_pdf(page_count: usize) -> Vec<u8> {
    sample_pdf(page_count, 595.0, 842.0)
}

/// `/ByteRange` of the last signature in `pdf`.
pub fn byte_range(pdf: &[u8]) -> [usize; 4] {
    let key = b"/ByteRange [";
    let start = pdf
        .windows(key.len())
        .rposition(|w| w == key)
        .expect("no ByteRange")
        + key.len();
    let end = start + pdf[start..].iter().position(|b| *b == b']').unwrap();
    let values: Vec<usize> = std::str::from_utf8(&pdf[start..end])
        .unwrap()
        .split_whitespace()
        .map(|v| v.parse().unwrap())
        .collect();
    [values[0], values[1], values[2], values[3]]
}

/// DER signature from `/Contents`, with the zero padding removed.
pub fn signature_der(pdf: &[u8], range: [usize; 4]) -> Vec<u8> {
    let hex_text = &pdf[range[1] + 1..range[2] - 1];
    let bytes = hex::decode(hex_text).unwrap();
    let len = der_length(&bytes);
    bytes[..len].to_vec()
}

fn der_length(der: &[u8]) -> usize {
    let first = der[1];
    if first & 0x80 == 0 {
        return 2 + usize::from(first);
    }
    let count = usize::from(first & 0x7f);
    let len = der[2..2 + count]
        .iter()
        .fold(0usize, |acc, b| (acc << 8) | usize::from(*b));
    2 + count + len
}

/// The bytes covered by a byte range.
pub fn signed_content(pdf: &[u8], range: [usize; 4]) -> Vec<u8> {
    let mut content = pdf[range[0]..range[0] + range[1]].to_vec();
    content.extend_from_slice(&pdf[range[2]..range[2] + range[3]]);
    content
}

const SLOT_LABELS: [&str; 8] = [
    "Extensão PDF",
    "Sem senha",
    "Tamanho do arquivo",
    "Tamanho da página",
    "Assinado",
    "Autenticidade e integridade",
    "Pesquisável",
    "Conforme",
];

fn slot(pass: bool, label: &str) -> String {
    let icon = if pass {
        "fa fa-check text-success"
    } else {
        "fa fa-times text-danger"
    };
    format!(r#"<div class="d-inline-block"><i class="{icon}"></i> <span>{label}</span></div>"#)
}

/// Results container with the given pass flags.
pub fn results_markup(flags: [bool; 8]) -> String {
    let slots: String = flags
        .iter()
        .zip(SLOT_LABELS)
        .map(|(pass, label)| slot(*pass, label))
        .collect();
    format!(r#"<div id="validacoes-arquivo">{slots}</div>"#)
}

/// What the authority renders for a document with one valid signature.
pub fn signed_markup() -> String {
    results_markup([true; 8])
}

/// What the authority renders for an unsigned document.
pub fn unsigned_markup() -> String {
    results_markup([true, true, true, true, false, false, true, false])
        .replace("Autenticidade e integridade", "Documento não assinado")
}

/// Container still loading: slots present without any marker.
pub fn pending_markup() -> String {
    let slots: String = SLOT_LABELS
        .iter()
        .map(|label| {
            format!(r#"<div class="d-inline-block"><i class="fa fa-spinner"></i> {label}</div>"#)
        })
        .collect();
    format!(r#"<div id="validacoes-arquivo">{slots}</div>"#)
}

/// Validator settings with short waits for scripted sessions.
pub fn fast_validator_config() -> ValidatorConfig {
    ValidatorConfig {
        poll_interval_ms: 100,
        stable_samples: 2,
        max_wait_secs: 1,
        grace_delay_secs: 0,
        hard_timeout_secs: 5,
        ..ValidatorConfig::default()
    }
}

/// Counters shared between a factory and the sessions it opens.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub uploads: AtomicUsize,
}

impl SessionStats {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Replays a fixed sequence of container reads; the last one repeats.
pub struct ScriptedSession {
    reads: VecDeque<Option<String>>,
    last: Option<String>,
    navigate_error: Option<ValidationError>,
    stats: Arc<SessionStats>,
}

#[async_trait]
impl AutomationSession for ScriptedSession {
    async fn navigate(&mut self, _url: &str) -> ValidationResult<()> {
        match self.navigate_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn upload(&mut self, _input_selector: &str, file: &Path) -> ValidationResult<()> {
        assert!(file.exists(), "upload file must be staged on disk");
        self.stats.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn results_markup(
        &mut self,
        _container_selector: &str,
    ) -> ValidationResult<Option<String>> {
        if let Some(next) = self.reads.pop_front() {
            self.last = next;
        }
        Ok(self.last.clone())
    }

    async fn close(self: Box<Self>) -> ValidationResult<()> {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Opens a [`ScriptedSession`] per document with the same script.
pub struct ScriptedFactory {
    pub script: Vec<Option<String>>,
    pub navigate_error: Option<ValidationError>,
    pub stats: Arc<SessionStats>,
}

impl ScriptedFactory {
    pub fn new(script: Vec<Option<String>>) -> Self {
        Self {
            script,
            navigate_error: None,
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Every session renders `markup` from the first read on.
    pub fn settled(markup: String) -> Self {
        Self::new(vec![Some(markup)])
    }

    pub fn failing_navigation(error: ValidationError) -> Self {
        Self {
            navigate_error: Some(error),
            ..Self::new(Vec::new())
        }
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    async fn open_session(&self) -> ValidationResult<Box<dyn AutomationSession>> {
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            reads: self.script.iter().cloned().collect(),
            last: None,
            navigate_error: self.navigate_error.clone(),
            stats: Arc::clone(&self.stats),
        }))
    }
}
