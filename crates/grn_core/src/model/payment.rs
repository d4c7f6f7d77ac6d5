//! Supplier payment record.
//!
//! # Invariants
//! - `amount_cents > 0`.
//! - A payment linked to a GRN settles that GRN only; the link is fixed at
//!   creation time.

use super::grn::GrnId;
use super::shop::ShopId;
use super::supplier::SupplierId;
use super::{optional_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PaymentId = Uuid;

const REFERENCE_MAX_CHARS: usize = 120;
const NOTES_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
    Card,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [Self::Cash, Self::BankTransfer, Self::Cheque, Self::Card];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::Cheque => "cheque",
            Self::Card => "card",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.as_str() == value.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub shop_id: ShopId,
    pub supplier_id: SupplierId,
    pub grn_id: Option<GrnId>,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentInput {
    pub supplier_id: SupplierId,
    #[serde(default)]
    pub grn_id: Option<GrnId>,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub paid_at: Option<i64>,
}

impl Payment {
    /// Builds an unsaved payment; `now_ms` fills a missing `paid_at`.
    pub fn from_input(shop_id: ShopId, input: PaymentInput, now_ms: i64) -> Result<Self, ValidationError> {
        let payment = Self {
            id: Uuid::new_v4(),
            shop_id,
            supplier_id: input.supplier_id,
            grn_id: input.grn_id,
            amount_cents: input.amount_cents,
            method: input.method,
            reference: optional_text("reference", input.reference, REFERENCE_MAX_CHARS)?,
            notes: optional_text("notes", input.notes, NOTES_MAX_CHARS)?,
            paid_at: input.paid_at.unwrap_or(now_ms),
            created_at: 0,
        };
        payment.validate()?;
        Ok(payment)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount_cents <= 0 {
            return Err(ValidationError::NonPositiveAmount);
        }
        if self.paid_at < 0 {
            return Err(ValidationError::Negative("paid_at"));
        }
        Ok(())
    }
}
