//! Style variants – the six visual skins a resume can be rendered in.
//!
//! A variant only decides *how* a section looks. Which sections and items
//! land on a page is fixed by the paginator before a variant is consulted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::section::SectionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleVariant {
    #[default]
    Professional,
    Modern,
    Minimal,
    Creative,
    Executive,
    Academic,
}

impl StyleVariant {
    pub const ALL: [StyleVariant; 6] = [
        StyleVariant::Professional,
        StyleVariant::Modern,
        StyleVariant::Minimal,
        StyleVariant::Creative,
        StyleVariant::Executive,
        StyleVariant::Academic,
    ];

    /// Resolve a template id. Unknown ids fall back to [`StyleVariant::Professional`].
    pub fn parse(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "professional" => Self::Professional,
            "modern" => Self::Modern,
            "minimal" => Self::Minimal,
            "creative" => Self::Creative,
            "executive" => Self::Executive,
            "academic" => Self::Academic,
            other => {
                log::debug!("unknown template id {other:?}, using professional");
                Self::default()
            }
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Modern => "modern",
            Self::Minimal => "minimal",
            Self::Creative => "creative",
            Self::Executive => "executive",
            Self::Academic => "academic",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Professional => "Professional",
            Self::Modern => "Modern",
            Self::Minimal => "Minimal",
            Self::Creative => "Creative",
            Self::Executive => "Executive",
            Self::Academic => "Academic",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Professional => "A clean, traditional template perfect for corporate roles",
            Self::Modern => "A contemporary design with a creative touch",
            Self::Minimal => "A simple, elegant template that lets your content shine",
            Self::Creative => "Stand out with this bold, unique design",
            Self::Executive => "Sophisticated template for senior positions",
            Self::Academic => "Ideal for academic and research positions",
        }
    }

    pub fn theme(self) -> &'static Theme {
        match self {
            Self::Professional => &PROFESSIONAL,
            Self::Modern => &MODERN,
            Self::Minimal => &MINIMAL,
            Self::Creative => &CREATIVE,
            Self::Executive => &EXECUTIVE,
            Self::Academic => &ACADEMIC,
        }
    }
}

impl fmt::Display for StyleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Utility-class vocabulary for one variant.
///
/// Every string here is a class list understood by [`crate::style`].
#[derive(Debug)]
pub struct Theme {
    /// Font family class applied to the fragment root.
    pub font: &'static str,
    pub header: &'static str,
    pub header_name: &'static str,
    pub header_title: &'static str,
    pub show_photo: bool,
    pub photo: &'static str,
    pub continuation: &'static str,
    pub continuation_name: &'static str,
    pub section_title: &'static str,
    /// Wrapper for single-block section bodies (profile, contact, lists).
    pub block_body: &'static str,
    pub item: &'static str,
    /// Chip class when skills render as tags; `None` renders a bullet list.
    pub skill_chip: Option<&'static str>,
    pub labels: SectionLabels,
}

#[derive(Debug)]
pub struct SectionLabels {
    pub contact: &'static str,
    pub profile: &'static str,
    pub experience: &'static str,
    pub education: &'static str,
    pub skills: &'static str,
    pub languages: &'static str,
}

impl SectionLabels {
    pub fn label(&self, kind: SectionKind) -> &'static str {
        match kind {
            SectionKind::Contact => self.contact,
            SectionKind::Profile => self.profile,
            SectionKind::Experience => self.experience,
            SectionKind::Education => self.education,
            SectionKind::Skills => self.skills,
            SectionKind::Languages => self.languages,
        }
    }
}

const PLAIN_LABELS: SectionLabels = SectionLabels {
    contact: "Contact",
    profile: "Profile",
    experience: "Experience",
    education: "Education",
    skills: "Skills",
    languages: "Languages",
};

static PROFESSIONAL: Theme = Theme {
    font: "font-sans",
    header: "flex items-center border-b border-gray-300 pb-4 mb-6",
    header_name: "text-2xl font-bold",
    header_title: "text-lg text-gray-600",
    show_photo: true,
    photo: "w-24 h-24 mr-4 border-2 border-gray-200",
    continuation: "border-b border-gray-300 pb-4 mb-6",
    continuation_name: "text-xl font-bold",
    section_title: "text-lg font-semibold border-b border-gray-200 pb-2 mt-0 mb-3",
    block_body: "mb-6",
    item: "mb-4",
    skill_chip: None,
    labels: PLAIN_LABELS,
};

static MODERN: Theme = Theme {
    font: "font-sans",
    header: "bg-gray-800 text-white p-6 text-center mb-6",
    header_name: "text-2xl font-bold",
    header_title: "text-lg text-gray-300",
    show_photo: true,
    photo: "w-24 h-24 mb-3 border-2 border-white",
    continuation: "bg-gray-800 text-white p-4 mb-6",
    continuation_name: "text-xl font-bold",
    section_title: "text-lg font-semibold border-b border-gray-300 pb-2 mt-0 mb-3 text-gray-800",
    block_body: "mb-6",
    item: "mb-4",
    skill_chip: Some("px-3 py-1 bg-gray-100 text-gray-700 text-sm"),
    labels: SectionLabels {
        profile: "About Me",
        ..PLAIN_LABELS
    },
};

static MINIMAL: Theme = Theme {
    font: "font-sans",
    header: "border-b border-gray-200 pb-4 mb-6",
    header_name: "text-2xl font-bold",
    header_title: "text-base text-gray-600",
    show_photo: false,
    photo: "",
    continuation: "border-b border-gray-200 pb-4 mb-6",
    continuation_name: "text-xl font-bold",
    section_title: "text-base font-semibold uppercase mt-0 mb-3",
    block_body: "mb-6",
    item: "mb-4",
    skill_chip: None,
    labels: PLAIN_LABELS,
};

static CREATIVE: Theme = Theme {
    font: "font-sans",
    header: "bg-emerald-600 text-white p-6 text-center mb-6",
    header_name: "text-2xl font-bold",
    header_title: "text-lg",
    show_photo: true,
    photo: "w-24 h-24 mb-3 border-4 border-white",
    continuation: "bg-emerald-600 text-white p-4 mb-6",
    continuation_name: "text-xl font-bold",
    section_title: "text-lg font-semibold text-green-600 mt-0 mb-3",
    block_body: "mb-6",
    item: "border-l-2 border-green-200 pl-4 mb-4",
    skill_chip: Some("px-3 py-1 bg-green-50 text-green-700 text-xs"),
    labels: SectionLabels {
        profile: "About Me",
        ..PLAIN_LABELS
    },
};

static EXECUTIVE: Theme = Theme {
    font: "font-serif",
    header: "bg-gray-900 text-white p-6 mb-6",
    header_name: "text-2xl font-bold",
    header_title: "text-lg text-gray-300",
    show_photo: false,
    photo: "",
    continuation: "bg-gray-900 text-white p-4 mb-6",
    continuation_name: "text-xl font-bold",
    section_title: "text-lg font-bold border-b border-gray-300 pb-1 mt-0 mb-3",
    block_body: "mb-6",
    item: "mb-5",
    skill_chip: None,
    labels: SectionLabels {
        profile: "Professional Summary",
        experience: "Professional Experience",
        skills: "Skills & Expertise",
        ..PLAIN_LABELS
    },
};

static ACADEMIC: Theme = Theme {
    font: "font-serif",
    header: "text-center border-b border-gray-200 pb-4 mb-6",
    header_name: "text-2xl font-bold",
    header_title: "text-lg",
    show_photo: false,
    photo: "",
    continuation: "text-center border-b border-gray-200 pb-4 mb-6",
    continuation_name: "text-xl font-bold",
    section_title: "text-base font-bold uppercase mt-0 mb-3",
    block_body: "border-l-2 border-gray-300 pl-4 mb-6",
    item: "border-l-2 border-gray-300 pl-4 mb-4",
    skill_chip: None,
    labels: SectionLabels {
        experience: "Professional Experience",
        ..PLAIN_LABELS
    },
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_fall_back() {
        assert_eq!(StyleVariant::parse("Modern"), StyleVariant::Modern);
        assert_eq!(StyleVariant::parse(" academic "), StyleVariant::Academic);
        assert_eq!(StyleVariant::parse("brutalist"), StyleVariant::Professional);
        assert_eq!(StyleVariant::parse(""), StyleVariant::Professional);
    }

    #[test]
    fn ids_round_trip() {
        for v in StyleVariant::ALL {
            assert_eq!(StyleVariant::parse(v.id()), v);
        }
    }

    #[test]
    fn executive_relabels_sections() {
        let labels = &StyleVariant::Executive.theme().labels;
        assert_eq!(labels.label(SectionKind::Profile), "Professional Summary");
        assert_eq!(labels.label(SectionKind::Education), "Education");
    }
}
