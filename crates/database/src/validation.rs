//! Input validation for registry fields.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Validation error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid email format.
    InvalidEmail(String),
    /// Invalid phone number.
    InvalidPhone(String),
    /// A date or time that does not parse.
    InvalidDate { field: String, value: String },
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Empty value where one is required.
    Empty(String),
    /// Number outside the accepted range.
    OutOfRange { field: String, min: i64, max: i64, actual: i64 },
    /// A timestamp that must not be before now.
    InPast(String),
    /// Text that is not one of a fixed vocabulary.
    UnknownValue { field: String, value: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidEmail(msg) => write!(f, "Invalid email: {}", msg),
            ValidationError::InvalidPhone(msg) => write!(f, "Invalid phone: {}", msg),
            ValidationError::InvalidDate { field, value } => {
                write!(f, "{} has an invalid date/time: '{}'", field, value)
            }
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => write!(f, "{} must be between {} and {} (got {})", field, min, max, actual),
            ValidationError::InPast(field) => write!(f, "{} cannot be in the past", field),
            ValidationError::UnknownValue { field, value } => {
                write!(f, "Unknown {}: '{}'", field, value)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum allowed length for names and titles.
pub const MAX_NAME_LENGTH: usize = 120;

/// Maximum allowed length for free-text notes and bodies.
pub const MAX_NOTES_LENGTH: usize = 2000;

/// Calendar date format used for every date column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp format matching SQLite's `datetime('now')`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Validate an email address (basic RFC 5322 format check).
///
/// Checks for exactly one @, non-empty local part, and a dotted domain
/// without leading, trailing or consecutive dots.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Empty("email".to_string()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LENGTH,
            actual: email.len(),
        });
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail(
            "must contain exactly one @ symbol".to_string(),
        ));
    };

    if domain.contains('@') {
        return Err(ValidationError::InvalidEmail(
            "must contain exactly one @ symbol".to_string(),
        ));
    }

    if local.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing local part (before @)".to_string(),
        ));
    }

    if domain.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "missing domain (after @)".to_string(),
        ));
    }

    if !domain.contains('.') {
        return Err(ValidationError::InvalidEmail(
            "domain must contain at least one dot".to_string(),
        ));
    }

    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return Err(ValidationError::InvalidEmail(
            "domain has a misplaced dot".to_string(),
        ));
    }

    Ok(())
}

/// Validate a phone number.
///
/// Accepts digits plus the separators `+ ( ) -` and spaces, with 8 to 20 digits.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Empty("phone".to_string()));
    }

    if let Some(c) = phone
        .chars()
        .find(|c| !(c.is_ascii_digit() || matches!(c, '+' | '(' | ')' | '-' | ' ')))
    {
        return Err(ValidationError::InvalidPhone(format!(
            "unexpected character '{}'",
            c
        )));
    }

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !(8..=20).contains(&digits) {
        return Err(ValidationError::InvalidPhone(format!(
            "expected 8 to 20 digits, got {}",
            digits
        )));
    }

    Ok(())
}

/// Validate a required text field and its length.
pub fn validate_required(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }

    validate_max_length(field, value, max)
}

/// Validate only the length of a text field.
pub fn validate_max_length(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
            actual,
        });
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        ValidationError::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        }
    })
}

/// Validate an optional `YYYY-MM-DD` date.
pub fn validate_optional_date(field: &str, value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => parse_date(field, v).map(|_| ()),
        _ => Ok(()),
    }
}

/// Parse an `HH:MM` time of day.
pub fn parse_time(field: &str, value: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ValidationError::InvalidDate {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Parse a timestamp in either `YYYY-MM-DD HH:MM:SS` or RFC 3339-ish
/// `YYYY-MM-DDTHH:MM[:SS]` form.
pub fn parse_timestamp(field: &str, value: &str) -> Result<NaiveDateTime, ValidationError> {
    let value = value.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| ValidationError::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        })
}

/// Validate an integer range (inclusive).
pub fn validate_range(field: &str, value: i64, min: i64, max: i64) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
            actual: value,
        });
    }
    Ok(())
}

/// Format a timestamp the way SQLite stores it.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}
