//! Font metrics and text measurement using `ttf-parser`.
//!
//! Without loaded font files the manager falls back to synthetic metrics for
//! the two builtin PDF families (Helvetica, Times). A loaded TTF/OTF replaces
//! the synthetic advances for its family so measured and rendered line breaks
//! agree with the face the user configured.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::error::{Error, Result};
use crate::style::FontFamily;

#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes; empty for synthetic metrics.
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
    /// Average advance per character in em, used when `bytes` is empty.
    pub avg_advance: f32,
}

static SYNTHETIC_FALLBACK: FontData = FontData {
    bytes: Vec::new(),
    units_per_em: 1000.0,
    ascender: 750.0,
    descender: -250.0,
    avg_advance: 0.5,
};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontKey {
    pub family: FontFamily,
    pub bold: bool,
    pub italic: bool,
}

pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
}

impl FontManager {
    /// An empty manager; every lookup resolves to the synthetic fallback.
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
        }
    }

    /// Register synthetic metrics for every builtin face that has nothing
    /// loaded yet.
    pub fn ensure_builtins(&mut self) {
        for family in [FontFamily::Sans, FontFamily::Serif] {
            for bold in [false, true] {
                for italic in [false, true] {
                    let key = FontKey {
                        family,
                        bold,
                        italic,
                    };
                    self.fonts
                        .entry(key)
                        .or_insert_with(|| synthetic_metrics(family, bold));
                }
            }
        }
    }

    /// Load a TTF/OTF face from bytes, replacing any metrics for `key`.
    pub fn load_font(&mut self, key: FontKey, bytes: Vec<u8>) -> Result<()> {
        let face = ttf_parser::Face::parse(&bytes, 0)
            .map_err(|e| Error::Font(format!("failed to parse font: {e}")))?;
        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            avg_advance: 0.5,
            bytes,
        };
        log::debug!(
            "loaded {} font ({} bytes, {} units/em)",
            key.family.name(),
            data.bytes.len(),
            data.units_per_em
        );
        self.fonts.insert(key, data);
        Ok(())
    }

    /// Load a font file and use it for the regular face of `family`.
    pub fn load_font_file(&mut self, family: FontFamily, path: impl AsRef<Path>) -> Result<()> {
        let bytes = std::fs::read(path.as_ref())?;
        self.load_font(
            FontKey {
                family,
                bold: false,
                italic: false,
            },
            bytes,
        )
    }

    /// Exact face if registered, then the regular face of the family, then
    /// the synthetic fallback.
    pub fn get(&self, key: &FontKey) -> &FontData {
        self.fonts
            .get(key)
            .or_else(|| {
                self.fonts.get(&FontKey {
                    bold: false,
                    italic: false,
                    ..*key
                })
            })
            .unwrap_or(&SYNTHETIC_FALLBACK)
    }

    pub fn measure_text_width(
        &self,
        text: &str,
        font_size: f32,
        bold: bool,
        italic: bool,
        family: FontFamily,
    ) -> f32 {
        let data = self.get(&FontKey {
            family,
            bold,
            italic,
        });
        if data.bytes.is_empty() {
            return text.chars().count() as f32 * font_size * data.avg_advance;
        }
        match ttf_parser::Face::parse(&data.bytes, 0) {
            Ok(face) => {
                let scale = font_size / data.units_per_em;
                text.chars()
                    .map(|ch| match face.glyph_index(ch) {
                        Some(gid) => face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale,
                        None => font_size * 0.5,
                    })
                    .sum()
            }
            Err(_) => text.chars().count() as f32 * font_size * 0.5,
        }
    }

    pub fn line_height_px(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    pub fn has_real_fonts(&self) -> bool {
        self.fonts.values().any(|d| !d.bytes.is_empty())
    }

    /// Stable identifier of the loaded face set. Two managers with the same
    /// fingerprint measure every string identically.
    pub fn fingerprint(&self) -> u64 {
        let mut keys: Vec<&FontKey> = self.fonts.keys().collect();
        keys.sort();
        let mut hasher = DefaultHasher::new();
        for key in keys {
            let data = &self.fonts[key];
            key.hash(&mut hasher);
            data.bytes.hash(&mut hasher);
            data.units_per_em.to_bits().hash(&mut hasher);
            data.avg_advance.to_bits().hash(&mut hasher);
        }
        hasher.finish()
    }
}

impl Default for FontManager {
    fn default() -> Self {
        let mut mgr = Self::new();
        mgr.ensure_builtins();
        mgr
    }
}

fn synthetic_metrics(family: FontFamily, bold: bool) -> FontData {
    let (ascender, descender, avg) = match family {
        FontFamily::Sans => (718.0, -207.0, if bold { 0.55 } else { 0.5 }),
        FontFamily::Serif => (683.0, -217.0, if bold { 0.5 } else { 0.45 }),
    };
    FontData {
        bytes: Vec::new(),
        units_per_em: 1000.0,
        ascender,
        descender,
        avg_advance: avg,
    }
}

/// Greedy word wrap to `max_width` points. Hard newlines start a new line;
/// a word wider than the line stays whole on its own line.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    italic: bool,
    family: FontFamily,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            let w = fonts.measure_text_width(&candidate, font_size, bold, italic, family);
            if w > max_width && !current.is_empty() {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_widths_depend_on_family_and_weight() {
        let mgr = FontManager::default();
        let sans = mgr.measure_text_width("Hello", 16.0, false, false, FontFamily::Sans);
        assert!((sans - 40.0).abs() < 0.01);
        let bold = mgr.measure_text_width("Hello", 16.0, true, false, FontFamily::Sans);
        assert!(bold > sans);
        let serif = mgr.measure_text_width("Hello", 16.0, false, false, FontFamily::Serif);
        assert!(serif < sans);
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let mgr = FontManager::default();
        let lines = wrap_text("Creative Director at Uber", 12.0, false, false, FontFamily::Sans, 60.0, &mgr);
        assert!(lines.len() >= 3, "{lines:?}");
        assert!(lines.iter().all(|l| !l.starts_with(' ')));
    }

    #[test]
    fn keeps_blank_lines_between_paragraphs() {
        let mgr = FontManager::default();
        let lines = wrap_text("one\n\ntwo", 12.0, false, false, FontFamily::Sans, 500.0, &mgr);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn fingerprint_tracks_loaded_faces() {
        let a = FontManager::default();
        let b = FontManager::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), FontManager::new().fingerprint());
    }

    #[test]
    fn rejects_garbage_font_bytes() {
        let mut mgr = FontManager::default();
        let key = FontKey {
            family: FontFamily::Sans,
            bold: false,
            italic: false,
        };
        assert!(matches!(mgr.load_font(key, vec![0u8; 16]), Err(Error::Font(_))));
        assert!(!mgr.has_real_fonts());
    }

    #[test]
    fn unknown_face_falls_back_to_regular() {
        let mut mgr = FontManager::new();
        mgr.fonts.insert(
            FontKey {
                family: FontFamily::Serif,
                bold: false,
                italic: false,
            },
            synthetic_metrics(FontFamily::Serif, false),
        );
        let w = mgr.measure_text_width("ab", 10.0, true, true, FontFamily::Serif);
        assert!((w - 9.0).abs() < 0.01);
    }
}
