//! Resume record – the plain data the editor forms produce.
//!
//! The record is replaced wholesale on every edit; nothing in the pipeline
//! mutates it. Field names follow the editor's camelCase JSON.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeRecord {
    pub personal: PersonalInfo,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Vec<String>,
    pub languages: Vec<LanguageEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfo {
    pub job_title: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub bio: String,
    /// Optional `data:image/...;base64,` portrait.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageEntry {
    pub language: String,
    pub proficiency: String,
}

impl ResumeRecord {
    /// Placeholder content shown when the editor first opens.
    pub fn sample() -> Self {
        Self {
            personal: PersonalInfo {
                job_title: "Service Designer".into(),
                first_name: "Matthew".into(),
                last_name: "Smith".into(),
                address: "3808 Kuphal Cove Apt. 338".into(),
                email: "schuppe_angie@hotmail.com".into(),
                phone: "(123) 456-7890".into(),
                website: "info@example.com".into(),
                bio: "Be concise - The harsh reality is that hiring managers only spent an \
                      average of 6 seconds on each resume."
                    .into(),
                photo: None,
            },
            experience: vec![ExperienceEntry {
                title: "Creative Director".into(),
                company: "Uber".into(),
                location: "New York City".into(),
                start_date: "Sep 2018".into(),
                end_date: "Jan 2020".into(),
                current: false,
                description: "My role as a team lead at Uber consisted out of leading the team \
                              that built up their first Design System that spread all across \
                              their services."
                    .into(),
            }],
            education: vec![EducationEntry {
                degree: "Here comes your Degree".into(),
                institution: "University".into(),
                location: "Location".into(),
                start_date: "MM YYYY".into(),
                end_date: "MM YYYY".into(),
                description: "Here is the place where your description will appear. Be concise \
                              - The harsh reality is that hiring managers only spent an average \
                              of 6 seconds on each resume."
                    .into(),
            }],
            skills: ["UX Design", "UI Design", "Prototyping", "Wireframing", "User Research"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            languages: vec![
                LanguageEntry {
                    language: "English".into(),
                    proficiency: "Native".into(),
                },
                LanguageEntry {
                    language: "Spanish".into(),
                    proficiency: "Intermediate".into(),
                },
            ],
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidRecord(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// "First Last", skipping whichever part is blank.
    pub fn full_name(&self) -> String {
        [&self.personal.first_name, &self.personal.last_name]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Percentage of the four editor tabs that carry content.
    pub fn completion_percent(&self) -> u8 {
        let filled = [
            !self.personal.first_name.trim().is_empty()
                && !self.personal.last_name.trim().is_empty(),
            !self.experience.is_empty(),
            !self.education.is_empty(),
            !self.skills.is_empty(),
        ]
        .iter()
        .filter(|f| **f)
        .count();
        ((filled as f32 / 4.0) * 100.0).round() as u8
    }

    /// Download name for the exported document, e.g. `Matthew_Smith_Resume.pdf`.
    pub fn export_file_name(&self) -> String {
        let parts: Vec<String> = [&self.personal.first_name, &self.personal.last_name]
            .iter()
            .map(|s| sanitize_file_part(s))
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            "Resume.pdf".to_string()
        } else {
            format!("{}_Resume.pdf", parts.join("_"))
        }
    }
}

fn sanitize_file_part(s: &str) -> String {
    let cleaned: String = s
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_matches(|c| c == '_' || c == '.').to_string()
}

impl ExperienceEntry {
    pub fn date_range(&self) -> String {
        let end = if self.current {
            "Present"
        } else {
            self.end_date.as_str()
        };
        join_range(&self.start_date, end)
    }

    /// "Company, Location" with blank parts dropped.
    pub fn organisation_line(&self) -> String {
        join_nonempty(&[&self.company, &self.location], ", ")
    }
}

impl EducationEntry {
    pub fn date_range(&self) -> String {
        join_range(&self.start_date, &self.end_date)
    }

    pub fn organisation_line(&self) -> String {
        join_nonempty(&[&self.institution, &self.location], ", ")
    }
}

impl LanguageEntry {
    pub fn label(&self) -> String {
        join_nonempty(&[&self.language, &self.proficiency], " - ")
    }
}

fn join_range(start: &str, end: &str) -> String {
    join_nonempty(&[start, end], " - ")
}

pub(crate) fn join_nonempty(parts: &[&str], sep: &str) -> String {
    parts
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_is_complete() {
        let r = ResumeRecord::sample();
        assert_eq!(r.completion_percent(), 100);
        assert_eq!(r.full_name(), "Matthew Smith");
    }

    #[test]
    fn completion_counts_filled_tabs() {
        let mut r = ResumeRecord::sample();
        r.education.clear();
        r.skills.clear();
        assert_eq!(r.completion_percent(), 50);
        assert_eq!(ResumeRecord::default().completion_percent(), 0);
    }

    #[test]
    fn file_name_from_names() {
        let mut r = ResumeRecord::sample();
        assert_eq!(r.export_file_name(), "Matthew_Smith_Resume.pdf");
        r.personal.first_name = "Anne Marie".into();
        r.personal.last_name = "".into();
        assert_eq!(r.export_file_name(), "Anne_Marie_Resume.pdf");
        r.personal.first_name = " / ".into();
        assert_eq!(r.export_file_name(), "Resume.pdf");
    }

    #[test]
    fn current_role_ends_at_present() {
        let mut e = ResumeRecord::sample().experience.remove(0);
        assert_eq!(e.date_range(), "Sep 2018 - Jan 2020");
        e.current = true;
        assert_eq!(e.date_range(), "Sep 2018 - Present");
    }

    #[test]
    fn parses_editor_json() {
        let json = r#"{
            "personal": {"firstName": "Ada", "lastName": "Lovelace", "jobTitle": "Analyst"},
            "experience": [{"title": "Engineer", "company": "Analytical", "current": true}],
            "skills": ["Maths"]
        }"#;
        let r = ResumeRecord::from_json(json).unwrap();
        assert_eq!(r.personal.job_title, "Analyst");
        assert!(r.experience[0].current);
        assert!(r.education.is_empty());
        assert!(ResumeRecord::from_json("{not json").is_err());
    }
}
