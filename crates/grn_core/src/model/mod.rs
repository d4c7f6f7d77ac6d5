//! Domain model for shops, suppliers, categories, GRNs and payments.
//!
//! # Responsibility
//! - Define canonical records shared by repositories, services and the API.
//! - Own field-level validation so every write path enforces the same rules.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Money is held in integer cents; quantities are non-negative integers.

pub mod category;
pub mod grn;
pub mod payment;
pub mod shop;
pub mod supplier;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Field-level validation failure raised by model constructors and checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    Blank(&'static str),
    /// Text field exceeds its maximum length in characters.
    TooLong {
        field: &'static str,
        max_chars: usize,
    },
    /// Field does not match its expected format.
    InvalidFormat {
        field: &'static str,
        reason: String,
    },
    /// Numeric field is negative.
    Negative(&'static str),
    /// Accepted and rejected quantities do not add up to received.
    QuantityMismatch {
        position: usize,
        received: i64,
        accepted: i64,
        rejected: i64,
    },
    /// Non-draft GRN has no items.
    MissingItems,
    /// Payment amount is zero or negative.
    NonPositiveAmount,
    /// Sum or product overflowed `i64`.
    AmountOverflow,
    /// Section key is not part of the known catalog.
    UnknownSection(String),
    /// Full section replacement omitted known keys.
    IncompleteSections(Vec<String>),
    /// Partial section update carried no entries.
    EmptyPatch,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be blank"),
            Self::TooLong { field, max_chars } => {
                write!(f, "{field} must be at most {max_chars} characters")
            }
            Self::InvalidFormat { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::Negative(field) => write!(f, "{field} must not be negative"),
            Self::QuantityMismatch {
                position,
                received,
                accepted,
                rejected,
            } => write!(
                f,
                "item {position}: accepted ({accepted}) + rejected ({rejected}) must equal received ({received})"
            ),
            Self::MissingItems => write!(f, "a GRN must contain at least one item"),
            Self::NonPositiveAmount => write!(f, "amount must be greater than zero"),
            Self::AmountOverflow => write!(f, "amount is too large"),
            Self::UnknownSection(key) => write!(f, "unknown section `{key}`"),
            Self::IncompleteSections(missing) => {
                write!(f, "missing sections: {}", missing.join(", "))
            }
            Self::EmptyPatch => write!(f, "at least one section must be provided"),
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and requires it to be non-empty and at most `max_chars`.
pub fn require_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(trimmed.to_string())
}

/// Uniqueness key for shop-scoped names: trimmed and Unicode-lowercased.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Trims optional text, mapping blank values to `None`.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Like [`normalize_optional`] with an upper length bound.
pub fn optional_text(
    field: &'static str,
    value: Option<String>,
    max_chars: usize,
) -> Result<Option<String>, ValidationError> {
    match normalize_optional(value) {
        Some(text) if text.chars().count() > max_chars => {
            Err(ValidationError::TooLong { field, max_chars })
        }
        other => Ok(other),
    }
}
