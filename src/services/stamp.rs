//! Visible signature stamp: placement and appearance stream.
//!
//! The stamp has a fixed size. Anchors are resolved against the target page's
//! own MediaBox; a page too small to hold the stamp plus margins is rejected
//! rather than scaled.

use crate::domain::constants;
use crate::domain::signing::SignatureAnchor;
use crate::infra::config::SigningDefaults;
use crate::infra::error::{SigningError, SigningResult};
use chrono::{DateTime, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, Stream, StringFormat};

const FONT_SIZE: f64 = 8.0;
const LINE_HEIGHT: f64 = 11.0;
const PADDING: f64 = 6.0;
/// Rough Helvetica advance as a fraction of the font size
const AVERAGE_GLYPH_WIDTH: f64 = 0.5;

/// Stamp rectangle in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl StampRect {
    #[must_use]
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    #[must_use]
    pub fn to_object(&self) -> Object {
        Object::Array(
            [self.x1, self.y1, self.x2, self.y2]
                .iter()
                .map(|v| Object::from(*v))
                .collect(),
        )
    }
}

/// Fixed stamp dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StampGeometry {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
}

impl From<&SigningDefaults> for StampGeometry {
    fn from(defaults: &SigningDefaults) -> Self {
        Self {
            width: defaults.stamp_width,
            height: defaults.stamp_height,
            margin: defaults.stamp_margin,
        }
    }
}

impl StampGeometry {
    /// Rectangle for `anchor` on a page with the given MediaBox
    /// (`[llx, lly, urx, ury]`).
    pub fn place(&self, anchor: SignatureAnchor, media_box: [f64; 4]) -> SigningResult<StampRect> {
        let [llx, lly, urx, ury] = media_box;
        let page_width = urx - llx;
        let page_height = ury - lly;
        if page_width < self.width + 2.0 * self.margin
            || page_height < self.height + 2.0 * self.margin
        {
            return Err(SigningError::AppearanceLayoutError(format!(
                "{page_width:.0}x{page_height:.0} pt page cannot hold a {:.0}x{:.0} pt stamp \
                 with {:.0} pt margins",
                self.width, self.height, self.margin
            )));
        }

        let left = llx + self.margin;
        let right = urx - self.margin - self.width;
        let bottom = lly + self.margin;
        let top = ury - self.margin - self.height;
        let (x, y) = match anchor {
            SignatureAnchor::BottomRight => (right, bottom),
            SignatureAnchor::BottomLeft => (left, bottom),
            SignatureAnchor::TopRight => (right, top),
            SignatureAnchor::TopLeft => (left, top),
            SignatureAnchor::CenterBottom => (llx + (page_width - self.width) / 2.0, bottom),
        };
        Ok(StampRect {
            x1: x,
            y1: y,
            x2: x + self.width,
            y2: y + self.height,
        })
    }

    /// Placement on the reference A4 page.
    pub fn reference_place(&self, anchor: SignatureAnchor) -> SigningResult<StampRect> {
        self.place(
            anchor,
            [
                0.0,
                0.0,
                constants::REFERENCE_PAGE_WIDTH,
                constants::REFERENCE_PAGE_HEIGHT,
            ],
        )
    }
}

/// Text printed inside the stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StampText {
    pub signer: String,
    pub signed_at: DateTime<Utc>,
    pub reason: String,
}

impl StampText {
    fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Assinado digitalmente por:".to_string(),
            self.signer.clone(),
            format!("Data: {}", self.signed_at.format("%d/%m/%Y %H:%M:%S UTC")),
        ];
        if !self.reason.is_empty() {
            lines.push(format!("Motivo: {}", self.reason));
        }
        lines
    }
}

/// Form XObject drawing the stamp box and text at the rect's size.
pub fn appearance_stream(rect: &StampRect, text: &StampText) -> SigningResult<Stream> {
    let width = rect.width();
    let height = rect.height();
    let max_chars =
        ((width - 2.0 * PADDING) / (FONT_SIZE * AVERAGE_GLYPH_WIDTH)).max(1.0) as usize;
    let max_lines = ((height - PADDING) / LINE_HEIGHT).max(1.0) as usize;

    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("rg", vec![real(0.96), real(0.96), real(0.96)]),
        Operation::new("re", vec![real(0.0), real(0.0), real(width), real(height)]),
        Operation::new("f", vec![]),
        Operation::new("RG", vec![real(0.2), real(0.2), real(0.2)]),
        Operation::new("w", vec![real(0.8)]),
        Operation::new("re", vec![real(0.4), real(0.4), real(width - 0.8), real(height - 0.8)]),
        Operation::new("S", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("rg", vec![real(0.0), real(0.0), real(0.0)]),
        Operation::new("Tf", vec![Object::Name(b"Helv".to_vec()), real(FONT_SIZE)]),
        Operation::new("TL", vec![real(LINE_HEIGHT)]),
        Operation::new("Td", vec![real(PADDING), real(height - PADDING - FONT_SIZE)]),
    ];
    for line in text.lines().iter().take(max_lines) {
        let shown = latin1_literal(&truncate(line, max_chars));
        operations.push(Operation::new("Tj", vec![shown]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    operations.push(Operation::new("Q", vec![]));

    let content = Content { operations }
        .encode()
        .map_err(|e| SigningError::AppearanceLayoutError(format!("stamp content: {e}")))?;

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    let mut fonts = Dictionary::new();
    fonts.set("Helv", Object::Dictionary(font));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Form".to_vec()));
    dict.set(
        "BBox",
        StampRect {
            x1: 0.0,
            y1: 0.0,
            x2: width,
            y2: height,
        }
        .to_object(),
    );
    dict.set("Resources", Object::Dictionary(resources));
    Ok(Stream::new(dict, content))
}

fn truncate(line: &str, max_chars: usize) -> String {
    if line.chars().count() <= max_chars {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(max_chars.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Literal string in WinAnsi; characters outside Latin-1 become `?`.
fn latin1_literal(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn geometry() -> StampGeometry {
        StampGeometry::from(&SigningDefaults::default())
    }

    #[test]
    fn anchors_on_reference_page() {
        let g = geometry();
        let br = g.reference_place(SignatureAnchor::BottomRight).unwrap();
        assert_eq!((br.x1, br.y1, br.x2, br.y2), (365.0, 30.0, 565.0, 110.0));

        let tl = g.reference_place(SignatureAnchor::TopLeft).unwrap();
        assert_eq!((tl.x1, tl.y2), (30.0, 812.0));

        let cb = g.reference_place(SignatureAnchor::CenterBottom).unwrap();
        assert_eq!(cb.x1, 197.5);
        assert_eq!(cb.width(), 200.0);
    }

    #[test]
    fn anchors_follow_actual_media_box() {
        let letter_landscape = [0.0, 0.0, 792.0, 612.0];
        let rect = geometry()
            .place(SignatureAnchor::TopRight, letter_landscape)
            .unwrap();
        assert_eq!((rect.x2, rect.y2), (762.0, 582.0));
        assert_eq!(rect.height(), 80.0);

        let offset_box = [100.0, 100.0, 695.0, 942.0];
        let rect = geometry()
            .place(SignatureAnchor::BottomLeft, offset_box)
            .unwrap();
        assert_eq!((rect.x1, rect.y1), (130.0, 130.0));
    }

    #[test]
    fn small_page_is_layout_error() {
        let result = geometry().place(SignatureAnchor::BottomRight, [0.0, 0.0, 200.0, 200.0]);
        assert!(matches!(result, Err(SigningError::AppearanceLayoutError(_))));
    }

    #[test]
    fn appearance_escapes_and_truncates() {
        let rect = geometry().reference_place(SignatureAnchor::BottomRight).unwrap();
        let text = StampText {
            signer: "JOSÉ (TESTE) DA SILVA".to_string(),
            signed_at: Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap(),
            reason: "x".repeat(200),
        };
        let stream = appearance_stream(&rect, &text).unwrap();
        let content = stream.content;
        assert!(content.windows(3).any(|w| w == b"JOS"));
        assert!(content.contains(&0xC9)); // É in WinAnsi
        assert!(content.windows(7).any(|w| w == b"(TESTE)"));
        assert!(content.windows(8).any(|w| w == b"/Helv 8 "));
        assert!(content.windows(3).any(|w| w == b"..."));
        assert!(content.windows(19).any(|w| w == b"02/01/2025 03:04:05"));
    }
}
