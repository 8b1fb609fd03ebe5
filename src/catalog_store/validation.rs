//! Validation for catalog entities.
//!
//! Checks run field by field in a fixed order and stop at the first
//! violation, so the caller always learns about exactly one field.

use super::models::{AlbumInput, ArtistInput, TrackInput};
use chrono::Datelike;
use std::fmt;

pub const MIN_ALBUM_YEAR: i64 = 1900;

/// Validation error types
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingField {
        field: &'static str,
    },
    EmptyField {
        field: &'static str,
    },
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: Option<i64>,
    },
    ForeignKeyViolation {
        entity_type: &'static str,
        id: String,
    },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field }
            | ValidationError::EmptyField { field }
            | ValidationError::OutOfRange { field, .. } => field,
            ValidationError::ForeignKeyViolation { entity_type, .. } => match *entity_type {
                "artist" => "artist_id",
                "album" => "album_id",
                _ => "id",
            },
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingField { field } => {
                write!(f, "Field '{}' is required", field)
            }
            ValidationError::EmptyField { field } => {
                write!(f, "Field '{}' is required but was empty", field)
            }
            ValidationError::OutOfRange {
                field,
                value,
                min,
                max: Some(max),
            } => write!(
                f,
                "Field '{}' must be between {} and {}, got {}",
                field, min, max, value
            ),
            ValidationError::OutOfRange {
                field,
                value,
                min,
                max: None,
            } => write!(f, "Field '{}' must be at least {}, got {}", field, min, value),
            ValidationError::ForeignKeyViolation { entity_type, id } => {
                write!(f, "Referenced {} '{}' does not exist", entity_type, id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Whether required fields must be present (create) or may be omitted (update).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

pub fn current_year() -> i64 {
    chrono::Utc::now().year() as i64
}

fn check_text(field: &'static str, value: &Option<String>, mode: Mode) -> ValidationResult<()> {
    match value {
        None if mode == Mode::Create => Err(ValidationError::MissingField { field }),
        None => Ok(()),
        Some(v) if v.trim().is_empty() => Err(ValidationError::EmptyField { field }),
        Some(_) => Ok(()),
    }
}

fn check_range(
    field: &'static str,
    value: Option<i64>,
    min: i64,
    max: Option<i64>,
) -> ValidationResult<()> {
    match value {
        Some(v) if v < min || max.is_some_and(|max| v > max) => {
            Err(ValidationError::OutOfRange {
                field,
                value: v,
                min,
                max,
            })
        }
        _ => Ok(()),
    }
}

pub fn validate_artist(input: &ArtistInput, mode: Mode) -> ValidationResult<()> {
    check_text("name", &input.name, mode)?;
    check_range("grammy", input.grammy, 0, None)
}

pub fn validate_album(input: &AlbumInput, mode: Mode) -> ValidationResult<()> {
    check_text("name", &input.name, mode)?;
    check_text("artist_id", &input.artist_id, mode)?;
    if mode == Mode::Create && input.year.is_none() {
        return Err(ValidationError::MissingField { field: "year" });
    }
    check_range("year", input.year, MIN_ALBUM_YEAR, Some(current_year()))
}

pub fn validate_track(input: &TrackInput, mode: Mode) -> ValidationResult<()> {
    check_text("name", &input.name, mode)?;
    check_text("artist_id", &input.artist_id, mode)?;
    check_text("album_id", &input.album_id, mode)?;
    if mode == Mode::Create && input.duration.is_none() {
        return Err(ValidationError::MissingField { field: "duration" });
    }
    check_range("duration", input.duration, 1, None)
}
