//! PDF signing with an incremental update and a detached CMS signature.

use crate::domain::certificate::CertificateInfo;
use crate::domain::constants;
use crate::domain::signing::{SignedDocument, SigningRequest};
use crate::infra::config::SigningDefaults;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::certificate_loader::CertificateLoader;
use crate::services::cms_builder::CmsBuilderService;
use crate::services::pdf_incremental::{find_startxref, IncrementalWriter, SignaturePlaceholder};
use crate::services::stamp::{appearance_stream, StampGeometry, StampRect, StampText};
use chrono::{DateTime, Utc};
use lopdf::{text_string, Dictionary, Document, Object, ObjectId};
use std::collections::HashSet;

/// Inherited attribute lookups stop after this many `/Parent` hops.
const MAX_PAGE_TREE_DEPTH: usize = 32;

pub struct PdfSigner {
    defaults: SigningDefaults,
}

impl PdfSigner {
    #[must_use]
    pub fn new(defaults: SigningDefaults) -> Self {
        Self { defaults }
    }

    pub fn sign(&self, request: SigningRequest) -> SigningResult<SignedDocument> {
        self.sign_at(request, Utc::now())
    }

    /// Sign as of `now`. The certificate window is checked before the PDF is
    /// parsed; the credential is dropped when this returns.
    pub fn sign_at(
        &self,
        request: SigningRequest,
        now: DateTime<Utc>,
    ) -> SigningResult<SignedDocument> {
        let info = CertificateLoader::get_info_at(request.credential.certificate(), now)?;
        CertificateLoader::check_validity(&info)?;

        log::info!(
            "Signing PDF ({} bytes) as {} (visible: {})",
            request.pdf_bytes.len(),
            info.display_name(),
            request.visible
        );

        let document = Document::load_mem(&request.pdf_bytes)?;
        if document.trailer.has(b"Encrypt") {
            return Err(SigningError::PdfCorrupt(
                "encrypted documents are not supported".to_string(),
            ));
        }
        let previous_xref = find_startxref(&request.pdf_bytes)?;

        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(SigningError::PdfCorrupt("document has no pages".to_string()));
        }
        let page_index = request.target_page.resolve(pages.len());
        let page_id = pages[page_index];

        let rect = if request.visible {
            let rect = StampGeometry::from(&self.defaults)
                .place(request.anchor, media_box(&document, page_id)?)?;
            log::debug!(
                "Stamp at {:?} on page {} ({})",
                rect,
                page_index + 1,
                request.anchor
            );
            Some(rect)
        } else {
            None
        };

        let update = UpdatePlan {
            document: &document,
            request: &request,
            info: &info,
            page_id,
            rect,
            signed_at: now,
            capacity: self.defaults.signature_capacity,
        };
        let (mut bytes, placeholder) = update.write(previous_xref)?;

        let byte_range = placeholder.apply_byte_range(&mut bytes)?;
        let digest = placeholder.signed_digest(&bytes);
        log::debug!("ByteRange {:?}, digest {}", byte_range, digest.to_hex());

        let cms = CmsBuilderService::new(&request.credential, now).build_detached(&digest)?;
        placeholder.embed(&mut bytes, &cms)?;
        log::info!(
            "Signed PDF: {} bytes (CMS {} of {} reserved)",
            bytes.len(),
            cms.len(),
            placeholder.capacity()
        );

        Ok(SignedDocument {
            bytes,
            signer_common_name: info
                .common_name
                .clone()
                .unwrap_or_else(|| info.display_name()),
            signed_at: now,
        })
    }
}

/// Everything the incremental update needs, resolved up front.
struct UpdatePlan<'a> {
    document: &'a Document,
    request: &'a SigningRequest,
    info: &'a CertificateInfo,
    page_id: ObjectId,
    rect: Option<StampRect>,
    signed_at: DateTime<Utc>,
    capacity: usize,
}

impl UpdatePlan<'_> {
    fn write(&self, previous_xref: usize) -> SigningResult<(Vec<u8>, SignaturePlaceholder)> {
        let document = self.document;
        let catalog_id = document.trailer.get(b"Root")?.as_reference()?;
        let mut catalog = document.get_dictionary(catalog_id)?.clone();

        let mut acroform = match catalog.get(b"AcroForm") {
            Ok(object) => resolve(document, object)?.as_dict()?.clone(),
            Err(_) => Dictionary::new(),
        };
        let mut fields = match acroform.get(b"Fields") {
            Ok(object) => resolve(document, object)?.as_array()?.clone(),
            Err(_) => Vec::new(),
        };
        let field_name = next_field_name(document, &fields);

        let mut writer =
            IncrementalWriter::new(&self.request.pdf_bytes, next_object_number(document));
        let sig_id = writer.allocate();
        let field_id = writer.allocate();
        let acroform_id = writer.allocate();

        let placeholder =
            writer.write_signature_dictionary(sig_id, &self.signature_entries(), self.capacity);

        let mut widget = Dictionary::new();
        widget.set("Type", Object::Name(b"Annot".to_vec()));
        widget.set("Subtype", Object::Name(b"Widget".to_vec()));
        widget.set("FT", Object::Name(b"Sig".to_vec()));
        widget.set("T", text_string(&field_name));
        widget.set("V", Object::Reference(sig_id));
        widget.set("F", Object::Integer(constants::PDF_WIDGET_FLAGS));
        widget.set("P", Object::Reference(self.page_id));
        match &self.rect {
            Some(rect) => {
                let ap_id = writer.allocate();
                let stamp = StampText {
                    signer: self.info.display_name(),
                    signed_at: self.signed_at,
                    reason: self.request.reason.clone(),
                };
                writer.write_object(ap_id, &Object::Stream(appearance_stream(rect, &stamp)?));
                let mut appearance = Dictionary::new();
                appearance.set("N", Object::Reference(ap_id));
                widget.set("Rect", rect.to_object());
                widget.set("AP", Object::Dictionary(appearance));
            }
            None => {
                widget.set(
                    "Rect",
                    Object::Array(vec![Object::Integer(0); 4]),
                );
            }
        }
        writer.write_object(field_id, &Object::Dictionary(widget));

        let mut page = document.get_dictionary(self.page_id)?.clone();
        let mut annots = match page.get(b"Annots") {
            Ok(object) => resolve(document, object)?.as_array()?.clone(),
            Err(_) => Vec::new(),
        };
        annots.push(Object::Reference(field_id));
        page.set("Annots", Object::Array(annots));
        writer.write_object(self.page_id, &Object::Dictionary(page));

        fields.push(Object::Reference(field_id));
        acroform.set("Fields", Object::Array(fields));
        acroform.set("SigFlags", Object::Integer(constants::PDF_SIG_FLAGS));
        writer.write_object(acroform_id, &Object::Dictionary(acroform));

        catalog.set("AcroForm", Object::Reference(acroform_id));
        writer.write_object(catalog_id, &Object::Dictionary(catalog));

        let mut trailer = Dictionary::new();
        trailer.set("Root", Object::Reference(catalog_id));
        for key in [b"Info".as_slice(), b"ID".as_slice()] {
            if let Ok(value) = document.trailer.get(key) {
                trailer.set(key.to_vec(), value.clone());
            }
        }

        log::debug!(
            "Incremental update: field {} as object {}, size {}",
            field_name,
            field_id.0,
            writer.size()
        );
        Ok((writer.finish(trailer, previous_xref), placeholder))
    }

    fn signature_entries(&self) -> Dictionary {
        let mut entries = Dictionary::new();
        entries.set("Type", Object::Name(b"Sig".to_vec()));
        entries.set("Filter", Object::Name(constants::PDF_SIG_FILTER.to_vec()));
        entries.set("SubFilter", Object::Name(constants::PDF_SIG_SUBFILTER.to_vec()));
        entries.set("Name", text_string(&self.info.display_name()));
        entries.set("M", text_string(&pdf_date(self.signed_at)));
        if !self.request.reason.is_empty() {
            entries.set("Reason", text_string(&self.request.reason));
        }
        if !self.request.location.is_empty() {
            entries.set("Location", text_string(&self.request.location));
        }
        entries
    }
}

fn pdf_date(at: DateTime<Utc>) -> String {
    at.format("D:%Y%m%d%H%M%S+00'00'").to_string()
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> SigningResult<&'a Object> {
    match object {
        Object::Reference(id) => Ok(document.get_object(*id)?),
        other => Ok(other),
    }
}

/// First object number not used by the original file.
fn next_object_number(document: &Document) -> u32 {
    let declared = document
        .trailer
        .get(b"Size")
        .and_then(Object::as_i64)
        .ok()
        .and_then(|size| u32::try_from(size).ok())
        .unwrap_or(0);
    declared.max(document.max_id + 1)
}

/// `Signature<N>`, one past the existing signature fields and never reusing
/// an existing field name.
fn next_field_name(document: &Document, fields: &[Object]) -> String {
    let mut names = HashSet::new();
    let mut signature_fields = 0usize;
    for field in fields {
        let Ok(Object::Dictionary(dict)) = resolve(document, field) else {
            continue;
        };
        if let Ok(Object::String(name, _)) = dict.get(b"T") {
            names.insert(String::from_utf8_lossy(name).into_owned());
        }
        if dict.get(b"FT").and_then(Object::as_name).is_ok_and(|ft| ft == b"Sig") {
            signature_fields += 1;
        }
    }

    let mut n = signature_fields + 1;
    loop {
        let candidate = format!("{}{n}", constants::PDF_SIG_FIELD_PREFIX);
        if !names.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// MediaBox of a page, following `/Parent` for inherited values. Pages without
/// one fall back to the reference A4 size.
fn media_box(document: &Document, page_id: ObjectId) -> SigningResult<[f64; 4]> {
    let mut current = document.get_dictionary(page_id)?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Ok(object) = current.get(b"MediaBox") {
            let values = resolve(document, object)?.as_array()?;
            if values.len() != 4 {
                return Err(SigningError::PdfCorrupt(format!(
                    "MediaBox has {} entries",
                    values.len()
                )));
            }
            let mut rect = [0.0; 4];
            for (slot, value) in rect.iter_mut().zip(values) {
                *slot = number(resolve(document, value)?)?;
            }
            let [x1, y1, x2, y2] = rect;
            return Ok([x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)]);
        }
        match current.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent) => current = document.get_dictionary(parent)?,
            Err(_) => break,
        }
    }
    log::warn!("Page {:?} has no MediaBox, assuming A4", page_id);
    Ok([
        0.0,
        0.0,
        constants::REFERENCE_PAGE_WIDTH,
        constants::REFERENCE_PAGE_HEIGHT,
    ])
}

fn number(object: &Object) -> SigningResult<f64> {
    match object {
        Object::Integer(value) => Ok(*value as f64),
        Object::Real(value) => Ok(f64::from(*value)),
        other => Err(SigningError::PdfCorrupt(format!(
            "expected a number, found {other:?}"
        ))),
    }
}
