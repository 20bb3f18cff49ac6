//! PDF encoder – streams composed pages into a `printpdf` document
//! (v0.8 ops-based API).

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use printpdf::*;

use crate::error::{Error, Result};
use crate::export::PageEncoder;
use crate::layout_config::{BorderStyle, LayoutBox, PageLayout, TextContent};

const PT_TO_MM: f32 = 0.352778;

/// Baseline of a line of text below its glyph top, as a fraction of the size.
const ASCENT: f32 = 0.75;

/// Gap between a list marker and its item text.
const MARKER_GUTTER_PT: f32 = 12.0;

/// A printpdf XObject together with the pixel dimensions of the source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// [`PageEncoder`] that writes a PDF with the builtin Helvetica/Times faces.
///
/// Images are registered the first time a page references them. A `src` that
/// is not a base64 data URI, or that fails to decode, is skipped with a
/// `log::warn`.
pub struct PdfEncoder {
    doc: Option<PdfDocument>,
    page_width: f32,
    page_height: f32,
    pages: Vec<PdfPage>,
    images: HashMap<String, Option<ImageResource>>,
    warnings: Vec<PdfWarnMsg>,
}

impl PdfEncoder {
    pub fn new() -> Self {
        Self {
            doc: None,
            page_width: 0.0,
            page_height: 0.0,
            pages: Vec::new(),
            images: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn register_images(&mut self, lbox: &LayoutBox) -> Result<()> {
        if let Some(img) = &lbox.image {
            if !self.images.contains_key(&img.src) {
                let resource = self.decode_image(&img.src)?;
                self.images.insert(img.src.clone(), resource);
            }
        }
        for child in &lbox.children {
            self.register_images(child)?;
        }
        Ok(())
    }

    fn decode_image(&mut self, src: &str) -> Result<Option<ImageResource>> {
        let doc = self.doc.as_mut().ok_or_else(not_started)?;
        let bytes = match parse_data_uri(src) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("skipping image: {e}");
                return Ok(None);
            }
        };
        let dyn_img = match ::image::load_from_memory(&bytes) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("skipping image: decode error: {e}");
                return Ok(None);
            }
        };
        let raw = match RawImage::decode_from_bytes(&bytes, &mut self.warnings) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping image: PDF encode error: {e}");
                return Ok(None);
            }
        };
        Ok(Some(ImageResource {
            xobj_id: doc.add_image(&raw),
            px_width: dyn_img.width(),
            px_height: dyn_img.height(),
        }))
    }
}

impl Default for PdfEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PageEncoder for PdfEncoder {
    fn begin(&mut self, title: &str, page_width: f32, page_height: f32) -> Result<()> {
        if self.doc.is_some() {
            return Err(Error::ExportEncoding("document already started".into()));
        }
        self.doc = Some(PdfDocument::new(title));
        self.page_width = page_width;
        self.page_height = page_height;
        Ok(())
    }

    fn add_page(&mut self, page: PageLayout) -> Result<()> {
        if self.doc.is_none() {
            return Err(not_started());
        }
        for lbox in &page.boxes {
            self.register_images(lbox)?;
        }
        let mut ops = Vec::new();
        for lbox in &page.boxes {
            render_box(&mut ops, lbox, self.page_height, &self.images);
        }
        self.pages.push(PdfPage::new(
            Mm(self.page_width * PT_TO_MM),
            Mm(self.page_height * PT_TO_MM),
            ops,
        ));
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>> {
        let mut doc = self.doc.take().ok_or_else(not_started)?;
        if self.pages.is_empty() {
            self.pages.push(PdfPage::new(
                Mm(self.page_width * PT_TO_MM),
                Mm(self.page_height * PT_TO_MM),
                Vec::new(),
            ));
        }
        let pages = std::mem::take(&mut self.pages);
        doc.with_pages(pages);
        let bytes = doc.save(&PdfSaveOptions::default(), &mut self.warnings);
        if bytes.is_empty() {
            return Err(Error::ExportEncoding("empty PDF stream".into()));
        }
        Ok(bytes)
    }
}

fn not_started() -> Error {
    Error::ExportEncoding("no document started".into())
}

fn rgb(c: &[f32; 4]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

fn builtin_font(text: &TextContent) -> BuiltinFont {
    let serif = text.font_family == "Times";
    match (serif, text.bold, text.italic) {
        (true, true, true) => BuiltinFont::TimesBoldItalic,
        (true, true, false) => BuiltinFont::TimesBold,
        (true, false, true) => BuiltinFont::TimesItalic,
        (true, false, false) => BuiltinFont::TimesRoman,
        (false, true, true) => BuiltinFont::HelveticaBoldOblique,
        (false, true, false) => BuiltinFont::HelveticaBold,
        (false, false, true) => BuiltinFont::HelveticaOblique,
        (false, false, false) => BuiltinFont::Helvetica,
    }
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\u{00A0}' => 0x20,
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for the 0x80-0xFF range; printpdf passes
    // these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

/// Decode a `data:<mime>;base64,<data>` URI.
pub(crate) fn parse_data_uri(src: &str) -> std::result::Result<Vec<u8>, String> {
    let rest = src.strip_prefix("data:").ok_or_else(|| {
        let preview: String = src.chars().take(80).collect();
        format!("image src must be a base64 data URI, got {preview:?}")
    })?;
    let (header, data) = rest
        .split_once(',')
        .ok_or("invalid data URI: missing `,` between header and data")?;
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

fn fill_rect(ops: &mut Vec<Op>, x1: f32, y1: f32, x2: f32, y2: f32, color: &[f32; 4]) {
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![point(x1, y1), point(x2, y1), point(x2, y2), point(x1, y2)],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

/// Stroke each border side along the middle of its strip.
fn stroke_border(ops: &mut Vec<Op>, border: &BorderStyle, left: f32, top: f32, right: f32, bottom: f32) {
    ops.push(Op::SetOutlineColor {
        col: rgb(&border.color),
    });
    let sides = [
        (border.top, (left, top - border.top / 2.0), (right, top - border.top / 2.0)),
        (border.right, (right - border.right / 2.0, top), (right - border.right / 2.0, bottom)),
        (border.bottom, (left, bottom + border.bottom / 2.0), (right, bottom + border.bottom / 2.0)),
        (border.left, (left + border.left / 2.0, top), (left + border.left / 2.0, bottom)),
    ];
    for (width, (x1, y1), (x2, y2)) in sides {
        if width <= 0.0 {
            continue;
        }
        ops.push(Op::SetOutlineThickness { pt: Pt(width) });
        ops.push(Op::DrawLine {
            line: Line {
                points: vec![point(x1, y1), point(x2, y2)],
                is_closed: false,
            },
        });
    }
}

fn write_text(ops: &mut Vec<Op>, text: &str, x: f32, y: f32, size: f32, line_height: f32, font: BuiltinFont, color: &[f32; 4]) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point { x: Pt(x), y: Pt(y) },
    });
    ops.push(Op::SetFontSizeBuiltinFont { size: Pt(size), font });
    ops.push(Op::SetLineHeight { lh: Pt(line_height) });
    ops.push(Op::SetFillColor { col: rgb(color) });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winlatin(text))],
        font,
    });
    ops.push(Op::EndTextSection);
}

/// Recursively render a LayoutBox and its children into PDF ops.
fn render_box(
    ops: &mut Vec<Op>,
    lbox: &LayoutBox,
    page_height: f32,
    images: &HashMap<String, Option<ImageResource>>,
) {
    // PDF origin is bottom-left, layout origin top-left.
    let top = page_height - lbox.y;
    let bottom = top - lbox.height;
    let right = lbox.x + lbox.width;

    if let Some(bg) = &lbox.background_color {
        fill_rect(ops, lbox.x, bottom, right, top, bg);
    }

    if let Some(border) = &lbox.border {
        stroke_border(ops, border, lbox.x, top, right, bottom);
    }

    if let Some(text) = &lbox.text {
        let font = builtin_font(text);
        let half_leading = (text.line_height - text.font_size).max(0.0) / 2.0;
        let baseline = half_leading + text.font_size * ASCENT;

        for tline in text.lines.iter().filter(|l| !l.text.is_empty()) {
            write_text(
                ops,
                &tline.text,
                lbox.x + tline.x_offset,
                top - tline.y_offset - baseline,
                text.font_size,
                text.line_height,
                font,
                &text.color,
            );
        }

        if let (Some(marker), Some(first)) = (&text.list_marker, text.lines.first()) {
            write_text(
                ops,
                marker,
                lbox.x + first.x_offset - MARKER_GUTTER_PT,
                top - first.y_offset - baseline,
                text.font_size,
                text.line_height,
                font,
                &text.color,
            );
        }
    }

    if let Some(img) = &lbox.image {
        if let Some(Some(res)) = images.get(&img.src) {
            // At dpi=72 printpdf renders 1 px = 1 pt, so scale = desired_pt / px.
            let scale = |pt: f32, px: u32| if px > 0 { pt / px as f32 } else { 1.0 };
            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(lbox.x)),
                    translate_y: Some(Pt(top - img.height)),
                    dpi: Some(72.0),
                    scale_x: Some(scale(img.width, res.px_width)),
                    scale_y: Some(scale(img.height, res.px_height)),
                    rotate: None,
                },
            });
        }
    }

    for child in &lbox.children {
        render_box(ops, child, page_height, images);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_config::{ImageContent, TextLine};

    fn text_box() -> LayoutBox {
        let mut lb = LayoutBox::new(40.0, 40.0, 200.0, 20.0);
        lb.text = Some(TextContent {
            lines: vec![TextLine {
                text: "Café – Zürich".into(),
                x_offset: 0.0,
                y_offset: 0.0,
            }],
            font_family: "Times".into(),
            font_size: 12.0,
            bold: true,
            italic: false,
            color: [0.0, 0.0, 0.0, 1.0],
            line_height: 16.8,
            text_align: "left".into(),
            list_marker: Some("\u{2022}".into()),
        });
        lb
    }

    #[test]
    fn empty_document_still_has_a_page() {
        let mut enc = PdfEncoder::new();
        enc.begin("Resume", 595.28, 841.89).unwrap();
        let bytes = enc.finish().unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn pages_are_appended_in_order() {
        let mut enc = PdfEncoder::new();
        enc.begin("Resume", 595.28, 841.89).unwrap();
        for i in 0..3 {
            enc.add_page(PageLayout {
                page_index: i,
                boxes: vec![text_box()],
            })
            .unwrap();
        }
        assert_eq!(enc.page_count(), 3);
        assert_eq!(&enc.finish().unwrap()[0..5], b"%PDF-");
    }

    #[test]
    fn add_page_requires_begin() {
        let mut enc = PdfEncoder::new();
        let err = enc
            .add_page(PageLayout {
                page_index: 0,
                boxes: vec![],
            })
            .unwrap_err();
        assert!(matches!(err, Error::ExportEncoding(_)));
    }

    #[test]
    fn broken_images_are_skipped() {
        let mut enc = PdfEncoder::new();
        enc.begin("Resume", 595.28, 841.89).unwrap();
        let mut lb = LayoutBox::new(40.0, 40.0, 72.0, 72.0);
        lb.image = Some(ImageContent {
            src: "data:image/png;base64,AAAA".into(),
            width: 72.0,
            height: 72.0,
        });
        enc.add_page(PageLayout {
            page_index: 0,
            boxes: vec![lb],
        })
        .unwrap();
        assert!(enc.finish().is_ok());
    }

    #[test]
    fn data_uri_parsing() {
        assert_eq!(parse_data_uri("data:image/png;base64,aGk=").unwrap(), b"hi");
        assert!(parse_data_uri("https://example.com/a.png").is_err());
        assert!(parse_data_uri("data:image/png,raw").is_err());
    }

    #[test]
    fn serif_faces_map_to_times() {
        let lb = text_box();
        assert!(matches!(builtin_font(lb.text.as_ref().unwrap()), BuiltinFont::TimesBold));
    }
}
