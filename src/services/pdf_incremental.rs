//! Incremental-update writer for PDF files.
//!
//! New and replaced objects are appended after the original bytes together
//! with a classic xref section whose trailer points back (`/Prev`) at the
//! previous one. The original bytes are never modified.

use crate::domain::constants;
use crate::domain::crypto::Sha256Digest;
use crate::infra::error::{SigningError, SigningResult};
use lopdf::{Dictionary, Object, ObjectId, StringFormat};
use std::io::Write;

/// Location of the `/ByteRange` and `/Contents` placeholders in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignaturePlaceholder {
    /// Offset of the `[` opening the byte range array
    pub byte_range_at: usize,
    /// Offset of the `<` opening the contents hex string
    pub contents_at: usize,
    /// Length including both angle brackets
    pub contents_len: usize,
}

impl SignaturePlaceholder {
    /// Reserved space for the DER signature, in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        (self.contents_len - 2) / 2
    }

    /// `[start1 len1 start2 len2]` covering everything except `/Contents`.
    #[must_use]
    pub fn byte_range(&self, total_len: usize) -> [usize; 4] {
        let gap_end = self.contents_at + self.contents_len;
        [0, self.contents_at, gap_end, total_len - gap_end]
    }

    /// Overwrite the byte range placeholder with the real offsets.
    pub fn apply_byte_range(&self, bytes: &mut [u8]) -> SigningResult<[usize; 4]> {
        let range = self.byte_range(bytes.len());
        let width = constants::BYTE_RANGE_DIGITS;
        let text = format!(
            "[{:<width$} {:<width$} {:<width$} {:<width$}]",
            range[0], range[1], range[2], range[3]
        );
        if text.len() != byte_range_placeholder().len() {
            return Err(SigningError::PdfCorrupt(
                "document too large for byte range placeholder".to_string(),
            ));
        }
        let end = self.byte_range_at + text.len();
        bytes[self.byte_range_at..end].copy_from_slice(text.as_bytes());
        Ok(range)
    }

    /// SHA-256 over the two signed ranges.
    #[must_use]
    pub fn signed_digest(&self, bytes: &[u8]) -> Sha256Digest {
        let gap_end = self.contents_at + self.contents_len;
        Sha256Digest::of_parts(&[&bytes[..self.contents_at], &bytes[gap_end..]])
    }

    /// Write the hex-encoded signature into `/Contents`, zero padded.
    pub fn embed(&self, bytes: &mut [u8], signature_der: &[u8]) -> SigningResult<()> {
        if signature_der.len() > self.capacity() {
            return Err(SigningError::CryptographicError(format!(
                "signature of {} bytes exceeds reserved capacity of {} bytes",
                signature_der.len(),
                self.capacity()
            )));
        }
        let encoded = hex::encode_upper(signature_der);
        let start = self.contents_at + 1;
        bytes[start..start + encoded.len()].copy_from_slice(encoded.as_bytes());
        Ok(())
    }
}

fn byte_range_placeholder() -> String {
    let zeros = "0".repeat(constants::BYTE_RANGE_DIGITS);
    format!("[{zeros} {zeros} {zeros} {zeros}]")
}

/// Appends objects after the original file and tracks their offsets.
pub struct IncrementalWriter {
    buffer: Vec<u8>,
    offsets: Vec<(u32, usize)>,
    next_id: u32,
}

impl IncrementalWriter {
    #[must_use]
    pub fn new(original: &[u8], next_id: u32) -> Self {
        let mut buffer = Vec::with_capacity(original.len() + 32 * 1024);
        buffer.extend_from_slice(original);
        if !buffer.ends_with(b"\n") {
            buffer.push(b'\n');
        }
        Self {
            buffer,
            offsets: Vec::new(),
            next_id,
        }
    }

    /// Reserve a fresh object number.
    pub fn allocate(&mut self) -> ObjectId {
        let id = (self.next_id, 0);
        self.next_id += 1;
        id
    }

    /// Append `id` with the given value, replacing any earlier definition.
    pub fn write_object(&mut self, id: ObjectId, object: &Object) {
        self.begin_object(id);
        write_value(&mut self.buffer, object);
        self.end_object();
    }

    /// Append the signature dictionary and return where its placeholders
    /// landed. `entries` must not contain `/ByteRange` or `/Contents`.
    pub fn write_signature_dictionary(
        &mut self,
        id: ObjectId,
        entries: &Dictionary,
        capacity: usize,
    ) -> SignaturePlaceholder {
        self.begin_object(id);
        self.buffer.extend_from_slice(b"<<");
        for (key, value) in entries.iter() {
            write_name(&mut self.buffer, key);
            self.buffer.push(b' ');
            write_value(&mut self.buffer, value);
        }

        self.buffer.extend_from_slice(b"/ByteRange ");
        let byte_range_at = self.buffer.len();
        self.buffer
            .extend_from_slice(byte_range_placeholder().as_bytes());

        self.buffer.extend_from_slice(b"/Contents ");
        let contents_at = self.buffer.len();
        self.buffer.push(b'<');
        self.buffer.resize(self.buffer.len() + capacity * 2, b'0');
        self.buffer.push(b'>');
        let contents_len = self.buffer.len() - contents_at;

        self.buffer.extend_from_slice(b">>");
        self.end_object();

        SignaturePlaceholder {
            byte_range_at,
            contents_at,
            contents_len,
        }
    }

    /// Next unused object number, i.e. the trailer `/Size`.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.next_id
    }

    /// Append xref and trailer. `trailer` gets `/Size` and `/Prev` filled in.
    #[must_use]
    pub fn finish(mut self, mut trailer: Dictionary, previous_xref: usize) -> Vec<u8> {
        self.offsets.sort_unstable();
        let xref_at = self.buffer.len();
        self.buffer.extend_from_slice(b"xref\n");
        for (number, offset) in &self.offsets {
            let _ = write!(self.buffer, "{number} 1\n{offset:010} 00000 n \n");
        }

        trailer.set("Size", Object::Integer(i64::from(self.next_id)));
        trailer.set("Prev", Object::Integer(previous_xref as i64));
        self.buffer.extend_from_slice(b"trailer\n");
        write_value(&mut self.buffer, &Object::Dictionary(trailer));
        let _ = write!(self.buffer, "\nstartxref\n{xref_at}\n%%EOF\n");
        self.buffer
    }

    fn begin_object(&mut self, id: ObjectId) {
        self.offsets.push((id.0, self.buffer.len()));
        let _ = write!(self.buffer, "{} {} obj\n", id.0, id.1);
    }

    fn end_object(&mut self) {
        self.buffer.extend_from_slice(b"\nendobj\n");
    }
}

/// Offset of the most recent xref section, read from the file tail.
pub fn find_startxref(bytes: &[u8]) -> SigningResult<usize> {
    const KEYWORD: &[u8] = b"startxref";
    let tail_start = bytes.len().saturating_sub(2048);
    let tail = &bytes[tail_start..];
    let position = tail
        .windows(KEYWORD.len())
        .rposition(|w| w == KEYWORD)
        .ok_or_else(|| SigningError::PdfCorrupt("startxref not found".to_string()))?;
    let digits: String = tail[position + KEYWORD.len()..]
        .iter()
        .map(|b| *b as char)
        .skip_while(char::is_ascii_whitespace)
        .take_while(char::is_ascii_digit)
        .collect();
    digits
        .parse()
        .map_err(|_| SigningError::PdfCorrupt("startxref offset is not a number".to_string()))
}

/// Serialize a single object in PDF syntax.
#[must_use]
pub fn serialize(object: &Object) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, object);
    out
}

fn write_value(out: &mut Vec<u8>, object: &Object) {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(value) => {
            out.extend_from_slice(if *value { b"true" } else { b"false" });
        }
        Object::Integer(value) => out.extend_from_slice(value.to_string().as_bytes()),
        Object::Real(value) => out.extend_from_slice(format_real(f64::from(*value)).as_bytes()),
        Object::Name(name) => write_name(out, name),
        Object::String(bytes, StringFormat::Literal) => write_literal(out, bytes),
        Object::String(bytes, StringFormat::Hexadecimal) => {
            out.push(b'<');
            out.extend_from_slice(hex::encode_upper(bytes).as_bytes());
            out.push(b'>');
        }
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_value(out, item);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(out, dict),
        Object::Stream(stream) => {
            let mut dict = stream.dict.clone();
            dict.set("Length", Object::Integer(stream.content.len() as i64));
            write_dictionary(out, &dict);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.content);
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference((number, generation)) => {
            let _ = write!(out, "{number} {generation} R");
        }
    }
}

fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        write_name(out, key);
        out.push(b' ');
        write_value(out, value);
    }
    out.extend_from_slice(b">>");
}

fn write_name(out: &mut Vec<u8>, name: &[u8]) {
    out.push(b'/');
    for &byte in name {
        let regular = (0x21..=0x7e).contains(&byte) && !b"#()<>[]{}/%".contains(&byte);
        if regular {
            out.push(byte);
        } else {
            let _ = write!(out, "#{byte:02X}");
        }
    }
}

fn write_literal(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'(');
    for &byte in bytes {
        match byte {
            b'\\' | b'(' | b')' => {
                out.push(b'\\');
                out.push(byte);
            }
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(byte),
        }
    }
    out.push(b')');
}

fn format_real(value: f64) -> String {
    let text = format!("{value:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() || text == "-" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
