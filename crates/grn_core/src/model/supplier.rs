//! Supplier record.
//!
//! # Invariants
//! - `name` is unique per shop, compared case-insensitively.
//! - Optional contact fields are trimmed; blanks are stored as `NULL`.

use super::shop::ShopId;
use super::{optional_text, require_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SupplierId = Uuid;

const SUPPLIER_NAME_MAX_CHARS: usize = 120;
const CONTACT_MAX_CHARS: usize = 120;
const ADDRESS_MAX_CHARS: usize = 500;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("valid email regex"));
static PHONE_SEPARATORS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-()]").expect("valid phone separator regex"));
static PHONE_DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{7,15}$").expect("valid phone digits regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub shop_id: ShopId,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create/update payload for suppliers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl Supplier {
    /// Builds a new supplier from normalized input.
    pub fn from_input(shop_id: ShopId, input: SupplierInput) -> Result<Self, ValidationError> {
        let mut supplier = Self {
            id: Uuid::new_v4(),
            shop_id,
            name: String::new(),
            contact_person: None,
            phone: None,
            email: None,
            address: None,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        };
        supplier.apply_input(input)?;
        Ok(supplier)
    }

    /// Overwrites editable fields with normalized input.
    ///
    /// `is_active` keeps its current value when the input omits it.
    pub fn apply_input(&mut self, input: SupplierInput) -> Result<(), ValidationError> {
        self.name = require_text("name", &input.name, SUPPLIER_NAME_MAX_CHARS)?;
        self.contact_person =
            optional_text("contact_person", input.contact_person, CONTACT_MAX_CHARS)?;
        self.phone = optional_text("phone", input.phone, CONTACT_MAX_CHARS)?;
        self.email = optional_text("email", input.email, CONTACT_MAX_CHARS)?
            .map(|email| email.to_lowercase());
        self.address = optional_text("address", input.address, ADDRESS_MAX_CHARS)?;
        if let Some(active) = input.is_active {
            self.is_active = active;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, SUPPLIER_NAME_MAX_CHARS)?;
        if let Some(email) = self.email.as_deref() {
            if !EMAIL_RE.is_match(email) {
                return Err(ValidationError::InvalidFormat {
                    field: "email",
                    reason: format!("`{email}` is not an email address"),
                });
            }
        }
        if let Some(phone) = self.phone.as_deref() {
            phone_digits(phone)?;
        }
        Ok(())
    }
}

/// Strips separators and a leading `+`, requiring 7 to 15 digits.
pub fn phone_digits(phone: &str) -> Result<String, ValidationError> {
    let stripped = PHONE_SEPARATORS_RE.replace_all(phone.trim(), "");
    let digits = stripped.strip_prefix('+').unwrap_or(stripped.as_ref());
    if PHONE_DIGITS_RE.is_match(digits) {
        Ok(digits.to_string())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "phone",
            reason: format!("`{phone}` must contain 7 to 15 digits"),
        })
    }
}
