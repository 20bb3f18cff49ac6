//! Layout config – the frozen per-page box tree handed to page encoders.
//!
//! Everything here is page-absolute and in points; an encoder never has to
//! consult styles, fonts, or the assignment again.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "LayoutConfig::default_title")]
    pub title: String,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pub pages: Vec<PageLayout>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    /// Position relative to page top-left, in points.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 4]>,
    pub border: Option<BorderStyle>,

    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,

    pub children: Vec<LayoutBox>,
}

/// Per-side border widths sharing one colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderStyle {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
    pub color: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// Pre-wrapped lines of text.
    pub lines: Vec<TextLine>,
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: [f32; 4],
    pub line_height: f32,
    pub text_align: String,
    /// Bullet drawn in the gutter left of the box.
    pub list_marker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// X offset within the layout box (padding plus alignment).
    pub x_offset: f32,
    /// Y offset of the line top within the layout box.
    pub y_offset: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl LayoutConfig {
    pub fn new(title: impl Into<String>, page_width_pt: f32, page_height_pt: f32) -> Self {
        Self {
            title: title.into(),
            page_width_pt,
            page_height_pt,
            pages: Vec::new(),
        }
    }

    fn default_title() -> String {
        "Resume".to_string()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            image: None,
            children: Vec::new(),
        }
    }

    /// Text lines of this box and its descendants in paint order.
    pub fn text_lines(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .text
            .iter()
            .flat_map(|t| t.lines.iter().map(|l| l.text.as_str()))
            .collect();
        for child in &self.children {
            out.extend(child.text_lines());
        }
        out
    }
}

impl PageLayout {
    pub fn text_lines(&self) -> Vec<&str> {
        self.boxes.iter().flat_map(LayoutBox::text_lines).collect()
    }
}
