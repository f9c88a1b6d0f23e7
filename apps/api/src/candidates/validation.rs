//! Pure validation rules for candidate input and résumé uploads.
//!
//! Every check is total and side-effect free: it returns `Ok(())` or a
//! [`ValidationError`] tagged with a [`ValidationKind`], so checks compose
//! with `?`.

use std::path::Path;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::candidates::models::UploadedFile;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const DOC_MIME: &str = "application/msword";

const ALLOWED_MIME_TYPES: &[&str] = &[PDF_MIME, DOCX_MIME, DOC_MIME];
const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc"];

/// 10 MiB.
pub const MAX_RESUME_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValidationKind {
    MissingField,
    TooShort,
    BadFormat,
    RangeOrder,
    UnsupportedType,
    TooLarge,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub kind: ValidationKind,
    pub message: String,
}

impl ValidationError {
    pub fn new(kind: ValidationKind, message: impl Into<String>) -> Self {
        ValidationError {
            kind,
            message: message.into(),
        }
    }

    /// Prefixes the message with the section it was raised in, e.g. `Education: ...`.
    pub fn within(self, context: &str) -> Self {
        ValidationError {
            message: format!("{context}: {}", self.message),
            ..self
        }
    }
}

pub type Validation = Result<(), ValidationError>;

pub fn require_non_empty(value: Option<&str>, label: &str) -> Validation {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(ValidationError::new(
            ValidationKind::MissingField,
            format!("{label} is required"),
        )),
    }
}

/// Length is counted in characters after trimming surrounding whitespace.
pub fn min_length(value: &str, min: usize, label: &str) -> Validation {
    if value.trim().chars().count() < min {
        return Err(ValidationError::new(
            ValidationKind::TooShort,
            format!("{label} must be at least {min} characters long"),
        ));
    }
    Ok(())
}

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn email_pattern() -> Option<&'static Regex> {
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

pub fn valid_email(value: Option<&str>) -> Validation {
    require_non_empty(value, "Email")?;
    let value = value.unwrap_or_default();
    if !email_pattern().is_some_and(|re| re.is_match(value)) {
        return Err(ValidationError::new(
            ValidationKind::BadFormat,
            "Email format is not valid",
        ));
    }
    Ok(())
}

/// Parses a calendar date. Accepts `YYYY-MM-DD`, RFC 3339 timestamps and
/// zone-less `YYYY-MM-DDTHH:MM:SS[.fff]`; only the date part is kept.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// A single optional date. Blank counts as absent.
pub fn valid_date(value: Option<&str>, label: &str) -> Validation {
    match present(value) {
        Some(v) if parse_calendar_date(v).is_none() => Err(ValidationError::new(
            ValidationKind::BadFormat,
            format!("{label} must be a valid date"),
        )),
        _ => Ok(()),
    }
}

/// The range check only applies when both endpoints are present. Equal
/// dates pass.
pub fn valid_date_range(start: Option<&str>, end: Option<&str>) -> Validation {
    let (Some(start), Some(end)) = (present(start), present(end)) else {
        return Ok(());
    };
    let (Some(start), Some(end)) = (parse_calendar_date(start), parse_calendar_date(end)) else {
        return Err(ValidationError::new(
            ValidationKind::BadFormat,
            "Dates must be in a valid format",
        ));
    };
    if end < start {
        return Err(ValidationError::new(
            ValidationKind::RangeOrder,
            "End date must not be before start date",
        ));
    }
    Ok(())
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// MIME type and extension are checked independently; both must be on the
/// allow-list. No file at all passes, since the résumé is optional.
pub fn valid_file(file: Option<&UploadedFile>) -> Validation {
    let Some(file) = file else {
        return Ok(());
    };

    if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Err(ValidationError::new(
            ValidationKind::UnsupportedType,
            "The file must be a PDF, DOC or DOCX document",
        ));
    }

    let extension_allowed = extension_of(&file.original_name)
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
    if !extension_allowed {
        return Err(ValidationError::new(
            ValidationKind::UnsupportedType,
            "The file must have a .pdf, .doc or .docx extension",
        ));
    }

    if file.size() > MAX_RESUME_BYTES {
        return Err(too_large());
    }

    Ok(())
}

pub fn too_large() -> ValidationError {
    ValidationError::new(ValidationKind::TooLarge, "The file may not exceed 10MB")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn upload(name: &str, mime: &str, size: usize) -> UploadedFile {
        UploadedFile {
            original_name: name.to_string(),
            mime_type: mime.to_string(),
            bytes: Bytes::from(vec![0u8; size]),
        }
    }

    fn kind(result: Validation) -> ValidationKind {
        result.unwrap_err().kind
    }

    #[test]
    fn test_require_non_empty_accepts_text() {
        assert!(require_non_empty(Some("Jane"), "First name").is_ok());
    }

    #[test]
    fn test_require_non_empty_rejects_absent_and_blank() {
        assert_eq!(kind(require_non_empty(None, "First name")), ValidationKind::MissingField);
        assert_eq!(kind(require_non_empty(Some(""), "First name")), ValidationKind::MissingField);
        assert_eq!(kind(require_non_empty(Some("   "), "First name")), ValidationKind::MissingField);
    }

    #[test]
    fn test_require_non_empty_message_names_field() {
        let err = require_non_empty(None, "Last name").unwrap_err();
        assert_eq!(err.message, "Last name is required");
    }

    #[test]
    fn test_min_length_counts_trimmed_chars() {
        assert!(min_length("Jo", 2, "First name").is_ok());
        assert_eq!(kind(min_length(" J ", 2, "First name")), ValidationKind::TooShort);
        assert!(min_length("Zoë", 3, "First name").is_ok());
    }

    #[test]
    fn test_valid_email_accepts_simple_address() {
        assert!(valid_email(Some("test@example.com")).is_ok());
    }

    #[test]
    fn test_valid_email_empty_is_missing() {
        assert_eq!(kind(valid_email(Some(""))), ValidationKind::MissingField);
        assert_eq!(kind(valid_email(None)), ValidationKind::MissingField);
    }

    #[test]
    fn test_valid_email_rejects_malformed() {
        assert_eq!(kind(valid_email(Some("invalid-email"))), ValidationKind::BadFormat);
        assert_eq!(kind(valid_email(Some("test@"))), ValidationKind::BadFormat);
        assert_eq!(kind(valid_email(Some("test@example"))), ValidationKind::BadFormat);
        assert_eq!(kind(valid_email(Some("a b@example.com"))), ValidationKind::BadFormat);
        assert_eq!(kind(valid_email(Some("a@b@example.com"))), ValidationKind::BadFormat);
    }

    #[test]
    fn test_date_range_passes_when_either_absent() {
        assert!(valid_date_range(None, Some("2020-01-01")).is_ok());
        assert!(valid_date_range(Some("2020-01-01"), None).is_ok());
        assert!(valid_date_range(Some(""), Some("not a date")).is_ok());
        assert!(valid_date_range(None, None).is_ok());
    }

    #[test]
    fn test_date_range_equal_dates_pass() {
        assert!(valid_date_range(Some("2021-05-01"), Some("2021-05-01")).is_ok());
    }

    #[test]
    fn test_date_range_end_before_start_fails() {
        assert_eq!(
            kind(valid_date_range(Some("2024-01-01"), Some("2020-01-01"))),
            ValidationKind::RangeOrder
        );
    }

    #[test]
    fn test_date_range_unparseable_is_bad_format() {
        assert_eq!(
            kind(valid_date_range(Some("2020-13-45"), Some("2021-01-01"))),
            ValidationKind::BadFormat
        );
    }

    #[test]
    fn test_date_range_accepts_timestamps() {
        assert!(valid_date_range(Some("2020-01-01T00:00:00.000Z"), Some("2020-06-01")).is_ok());
        assert!(valid_date_range(Some("2020-01-01T09:30:00"), Some("2020-01-01")).is_ok());
    }

    #[test]
    fn test_valid_date_single_value() {
        assert!(valid_date(None, "Start date").is_ok());
        assert!(valid_date(Some("2022-02-28"), "Start date").is_ok());
        assert_eq!(kind(valid_date(Some("yesterday"), "Start date")), ValidationKind::BadFormat);
    }

    #[test]
    fn test_valid_file_absent_passes() {
        assert!(valid_file(None).is_ok());
    }

    #[test]
    fn test_valid_file_accepts_allowed_types() {
        assert!(valid_file(Some(&upload("cv.pdf", PDF_MIME, 100))).is_ok());
        assert!(valid_file(Some(&upload("cv.DOCX", DOCX_MIME, 100))).is_ok());
        assert!(valid_file(Some(&upload("cv.doc", DOC_MIME, 100))).is_ok());
    }

    #[test]
    fn test_valid_file_rejects_mismatched_extension() {
        assert_eq!(
            kind(valid_file(Some(&upload("cv.exe", PDF_MIME, 100)))),
            ValidationKind::UnsupportedType
        );
        assert_eq!(
            kind(valid_file(Some(&upload("cv", PDF_MIME, 100)))),
            ValidationKind::UnsupportedType
        );
    }

    #[test]
    fn test_valid_file_rejects_mismatched_mime() {
        assert_eq!(
            kind(valid_file(Some(&upload("cv.pdf", "image/png", 100)))),
            ValidationKind::UnsupportedType
        );
    }

    #[test]
    fn test_valid_file_size_limit() {
        assert!(valid_file(Some(&upload("cv.pdf", PDF_MIME, MAX_RESUME_BYTES))).is_ok());
        assert_eq!(
            kind(valid_file(Some(&upload("cv.pdf", PDF_MIME, 11 * 1024 * 1024)))),
            ValidationKind::TooLarge
        );
    }

    #[test]
    fn test_within_prefixes_message() {
        let err = valid_date_range(Some("2024-01-01"), Some("2020-01-01"))
            .unwrap_err()
            .within("Education");
        assert_eq!(err.kind, ValidationKind::RangeOrder);
        assert!(err.message.starts_with("Education: "));
    }
}
