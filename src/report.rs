//! Report metadata and report-type selection.
//!
//! [`ReportMetadata`] is the record a caller supplies at finalize time. Every
//! field is optional; the renderer never fails on a missing field because
//! [`ReportMetadata::resolved`] substitutes documented defaults. Keeping the
//! defaults here — not scattered through templates — makes them testable in
//! one place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Front-page metadata for a report, all fields optional.
///
/// Supplied fresh per finalize/standardize call and never mutated once
/// constructed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub author_name: Option<String>,
    pub roll_no: Option<String>,
    pub department: Option<String>,
    pub guide_name: Option<String>,
    pub session_year: Option<String>,
}

/// Metadata with all defaults applied, ready for template injection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub title: String,
    pub abstract_text: String,
    pub author_name: String,
    pub roll_no: String,
    pub department: String,
    pub guide_name: String,
    pub session_year: String,
}

impl ReportMetadata {
    /// Textual default used when no title is supplied.
    pub const DEFAULT_TITLE: &'static str = "Project Report";
    /// Textual default used when no author is supplied.
    pub const DEFAULT_AUTHOR: &'static str = "Student";

    /// Apply the documented fallback defaults: title → "Project Report",
    /// author → "Student", every other field → empty string.
    pub fn resolved(&self) -> ResolvedMetadata {
        let or_empty = |f: &Option<String>| f.clone().unwrap_or_default();
        ResolvedMetadata {
            title: self
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| Self::DEFAULT_TITLE.to_string()),
            abstract_text: or_empty(&self.abstract_text),
            author_name: self
                .author_name
                .clone()
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| Self::DEFAULT_AUTHOR.to_string()),
            roll_no: or_empty(&self.roll_no),
            department: or_empty(&self.department),
            guide_name: or_empty(&self.guide_name),
            session_year: or_empty(&self.session_year),
        }
    }
}

/// Derive a presentable report title from an uploaded file name.
///
/// Strips the extension, replaces underscores with spaces, and uppercases
/// the first letter of each word. Used by the standardize flow when the
/// caller supplied no title.
pub fn title_from_filename(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _ext)| stem)
        .unwrap_or(file_name);
    stem.replace('_', " ")
        .split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Template selector for the front page and structural layout rules.
///
/// A closed enumeration with an explicit default: any unrecognized selector
/// string falls back to [`ReportType::Default`] rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportType {
    /// Generic report front page. (default)
    #[default]
    Default,
    /// Micro-project report variant.
    MicroProject,
    /// Mini-project report variant.
    MiniProject,
    /// Capstone / final-year project report variant.
    Capstone,
}

impl ReportType {
    /// Parse a selector string, case- and separator-insensitively.
    /// Unrecognized input yields [`ReportType::Default`].
    pub fn parse(s: &str) -> Self {
        let norm: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "microproject" | "micro" => ReportType::MicroProject,
            "miniproject" | "mini" => ReportType::MiniProject,
            "capstone" | "majorproject" | "major" => ReportType::Capstone,
            _ => ReportType::Default,
        }
    }

    /// Canonical selector string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Default => "default",
            ReportType::MicroProject => "micro-project",
            ReportType::MiniProject => "mini-project",
            ReportType::Capstone => "capstone",
        }
    }

    /// Human-readable label placed on the front page.
    pub fn front_page_label(&self) -> &'static str {
        match self {
            ReportType::Default => "Project Report",
            ReportType::MicroProject => "Micro Project Report",
            ReportType::MiniProject => "Mini Project Report",
            ReportType::Capstone => "Capstone Project Report",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ReportType {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metadata_resolves_to_defaults() {
        let r = ReportMetadata::default().resolved();
        assert_eq!(r.title, "Project Report");
        assert_eq!(r.author_name, "Student");
        assert_eq!(r.abstract_text, "");
        assert_eq!(r.roll_no, "");
        assert_eq!(r.department, "");
        assert_eq!(r.guide_name, "");
        assert_eq!(r.session_year, "");
    }

    #[test]
    fn blank_title_treated_as_absent() {
        let meta = ReportMetadata {
            title: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(meta.resolved().title, "Project Report");
    }

    #[test]
    fn supplied_fields_pass_through() {
        let meta = ReportMetadata {
            title: Some("Thesis".into()),
            author_name: Some("A. Student".into()),
            session_year: Some("2024-2025".into()),
            ..Default::default()
        };
        let r = meta.resolved();
        assert_eq!(r.title, "Thesis");
        assert_eq!(r.author_name, "A. Student");
        assert_eq!(r.session_year, "2024-2025");
    }

    #[test]
    fn report_type_parse_is_lenient() {
        assert_eq!(ReportType::parse("Mini Project"), ReportType::MiniProject);
        assert_eq!(ReportType::parse("micro-project"), ReportType::MicroProject);
        assert_eq!(ReportType::parse("CAPSTONE"), ReportType::Capstone);
        assert_eq!(ReportType::parse("default"), ReportType::Default);
    }

    #[test]
    fn unknown_type_falls_back_to_default() {
        assert_eq!(ReportType::parse("interpretive-dance"), ReportType::Default);
        assert_eq!(ReportType::parse(""), ReportType::Default);
    }

    #[test]
    fn title_from_filename_cleans_up() {
        assert_eq!(
            title_from_filename("final_year_report.docx"),
            "Final Year Report"
        );
        assert_eq!(title_from_filename("thesis.docx"), "Thesis");
        assert_eq!(title_from_filename("no_extension"), "No Extension");
    }
}
