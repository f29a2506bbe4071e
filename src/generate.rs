//! Proposal generation
//!
//! Turns a form payload into a token mapping, fills a fresh copy of the
//! template and writes it into the output directory under a timestamped name.

use std::path::PathBuf;

use chrono::{DateTime, Local, TimeZone};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::info;

use crate::config::AppConfig;
use crate::datetime::format_jp_date;
use crate::document::Document;
use crate::error::{DocgenError, Result};
use crate::tokens::{replace_doc_tokens, value_to_text, TokenMapping};

/// Prefix of every generated file name (企画書 = proposal)
pub const OUTPUT_PREFIX: &str = "企画書";
/// Used when the payload carries no title
pub const UNTITLED: &str = "noname";
/// Title budget in a file name; the rest of the name takes 31 bytes and most
/// filesystems stop at 255
pub const MAX_TITLE_BYTES: usize = 200;
/// Token filled with the formatted event date
pub const DATETIME_KEY: &str = "datetime";

/// Form fields the template refers to
pub const FORM_FIELDS: &[&str] = &[
    "title",
    "club",
    "dept",
    "category",
    "field",
    "datetime",
    "place",
    "expected_ivusa",
    "expected_other",
    "owner",
    "other_club",
    "beneficiary",
    "is_new",
    "activity_kind",
    "duration",
    "skills",
    "purpose",
    "kpi",
    "details",
    "pre_schedule",
    "exec_schedule",
    "day_schedule",
    "risk_before",
    "risk_during",
    "stakeholders",
    "permit_city",
    "permit_fire",
    "permit_police",
    "other_notes",
    "budget_total",
    "funding",
    "budget_usage",
    "press",
    "drive_student",
    "rentacar",
    "general_join",
    "knife",
    "power_tool",
    "self_cook",
    "stay",
    "emg_clubman",
    "emg_officer",
    "emg_day",
    "emg_ok",
];

/// A document written to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub filename: String,
    pub path: PathBuf,
    pub download_url: String,
}

// ============================================================================
// Payload -> mapping
// ============================================================================

/// Every payload field plus `datetime`.
///
/// A non-empty `formatted_datetime` wins; otherwise the date is formatted from
/// `year`, `month`, `day`, `timeStart`/`time_start` and `timeEnd`/`time_end`.
/// Payloads that are not JSON objects are treated as empty.
pub fn build_mapping(payload: &Value) -> TokenMapping {
    let empty = Map::new();
    let fields = payload.as_object().unwrap_or(&empty);

    let mut mapping = TokenMapping::from_json(payload);
    mapping.insert(DATETIME_KEY, event_datetime(fields));
    mapping
}

fn event_datetime(fields: &Map<String, Value>) -> String {
    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| fields.get(*key).and_then(value_to_text))
            .unwrap_or_default()
    };

    let formatted = text(&["formatted_datetime"]);
    if !formatted.is_empty() {
        return formatted;
    }

    format_jp_date(
        &text(&["year"]),
        &text(&["month"]),
        &text(&["day"]),
        &text(&["timeStart", "time_start"]),
        &text(&["timeEnd", "time_end"]),
    )
}

/// Form fields with no usable value; their tokens fall back to defaults
pub fn blank_form_fields(mapping: &TokenMapping) -> usize {
    FORM_FIELDS
        .iter()
        .filter(|field| mapping.resolve(field).is_none())
        .count()
}

/// Template tokens the form never fills; only their defaults will show
pub fn unknown_tokens(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .filter(|token| !FORM_FIELDS.contains(&token.as_str()))
        .cloned()
        .collect()
}

// ============================================================================
// File names
// ============================================================================

/// `企画書_{title}_{YYYYMMDD_HHMMSS}.docx`
pub fn output_filename<Tz>(title: Option<&str>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let title = title
        .map(sanitize_title)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());
    format!(
        "{}_{}_{}.docx",
        OUTPUT_PREFIX,
        title,
        now.format("%Y%m%d_%H%M%S")
    )
}

/// Replace characters that cannot appear in a file name on common systems,
/// and cut the result to [`MAX_TITLE_BYTES`] on a character boundary
pub fn sanitize_title(title: &str) -> String {
    let mut sanitized = String::new();
    for c in title.trim().chars() {
        let c = match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        };
        if sanitized.len() + c.len_utf8() > MAX_TITLE_BYTES {
            break;
        }
        sanitized.push(c);
    }
    sanitized.trim_end().to_string()
}

/// Accepts only bare file names: no separators, no `.`/`..`
pub fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

// ============================================================================
// Generator
// ============================================================================

/// Fills the configured template; one fresh document per call
#[derive(Debug, Clone)]
pub struct DocumentGenerator {
    config: AppConfig,
}

impl DocumentGenerator {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn generate(&self, payload: &Value) -> Result<GeneratedDocument> {
        self.generate_at(payload, &Local::now())
    }

    /// Generate with an explicit timestamp for the file name
    pub fn generate_at<Tz>(&self, payload: &Value, now: &DateTime<Tz>) -> Result<GeneratedDocument>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        if !self.config.template_exists() {
            return Err(DocgenError::TemplateNotFound {
                path: self.config.template_path.clone(),
            });
        }

        let mapping = build_mapping(payload);
        let mut document = Document::open(&self.config.template_path)?;
        let report = replace_doc_tokens(&mut document, &mapping);

        let title = mapping.get("title");
        let filename = output_filename(title, now);
        let path = self.config.output_dir.join(&filename);

        // Serialize next to the target and rename, so a failure leaves nothing behind
        self.config.ensure_output_dir()?;
        let mut staged = NamedTempFile::new_in(&self.config.output_dir)?;
        document.write_to(staged.as_file_mut())?;
        staged.persist(&path)?;

        info!(
            filename = %filename,
            stories = report.stories,
            paragraphs = report.paragraphs_rewritten,
            blank_fields = blank_form_fields(&mapping),
            "generated proposal"
        );

        Ok(GeneratedDocument {
            download_url: format!("/download/{}", filename),
            filename,
            path,
        })
    }
}
