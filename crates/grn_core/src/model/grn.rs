//! Goods Received Note (GRN) model.
//!
//! # Responsibility
//! - Define the GRN header, its ordered line items and lifecycle states.
//! - Compute line and document totals in integer cents.
//!
//! # Invariants
//! - For every item `accepted_qty + rejected_qty == received_qty`.
//! - `total_cents` equals the sum of item line totals.
//! - `payment_status` is derived from `paid_cents` and `total_cents`.
//! - Non-draft GRNs carry at least one item.

use super::category::CategoryId;
use super::shop::ShopId;
use super::supplier::SupplierId;
use super::{optional_text, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GrnId = Uuid;
pub type GrnItemId = Uuid;

const PRODUCT_NAME_MAX_CHARS: usize = 200;
const INVOICE_NUMBER_MAX_CHARS: usize = 60;
const NOTES_MAX_CHARS: usize = 2000;
const ATTACHMENT_URL_MAX_CHARS: usize = 2048;

/// Formats the shop-scoped sequence number of a GRN.
pub fn format_grn_number(sequence: i64) -> String {
    format!("GRN-{sequence:05}")
}

/// GRN lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrnStatus {
    /// Being prepared; items may still be empty.
    Draft,
    /// Goods arrived and were checked.
    Received,
    /// Stock posted; no further edits expected.
    Completed,
    /// Voided; terminal.
    Cancelled,
}

impl GrnStatus {
    pub const ALL: [GrnStatus; 4] = [
        Self::Draft,
        Self::Received,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Received => "received",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
    }

    /// Whether a GRN in this state may move to `next`.
    ///
    /// Staying in the same state is always allowed except for `cancelled`,
    /// which is terminal.
    pub fn can_transition_to(self, next: GrnStatus) -> bool {
        match (self, next) {
            (Self::Cancelled, _) => false,
            (current, next) if current == next => true,
            (Self::Draft, _) => true,
            (Self::Received, Self::Completed | Self::Cancelled) => true,
            (Self::Completed, Self::Cancelled) => true,
            _ => false,
        }
    }
}

/// Settlement state derived from paid vs total amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [Self::Unpaid, Self::Partial, Self::Paid];

    /// `paid >= total` is paid (including zero totals), `paid == 0` unpaid,
    /// anything between partial.
    pub fn derive(total_cents: i64, paid_cents: i64) -> Self {
        if paid_cents >= total_cents {
            Self::Paid
        } else if paid_cents == 0 {
            Self::Unpaid
        } else {
            Self::Partial
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
    }
}

/// One received product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrnItem {
    pub id: GrnItemId,
    pub product_name: String,
    pub category_id: Option<CategoryId>,
    pub ordered_qty: i64,
    pub received_qty: i64,
    pub accepted_qty: i64,
    pub rejected_qty: i64,
    pub unit_cost_cents: i64,
    pub selling_price_cents: Option<i64>,
    pub line_total_cents: i64,
}

/// Item payload. Either of `accepted_qty` / `rejected_qty` may be omitted and
/// is then derived from `received_qty`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GrnItemInput {
    pub product_name: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub ordered_qty: i64,
    pub received_qty: i64,
    #[serde(default)]
    pub accepted_qty: Option<i64>,
    #[serde(default)]
    pub rejected_qty: Option<i64>,
    pub unit_cost_cents: i64,
    #[serde(default)]
    pub selling_price_cents: Option<i64>,
}

impl GrnItem {
    /// Builds an item from input. `position` is 1-based and only used in errors.
    pub fn from_input(position: usize, input: GrnItemInput) -> Result<Self, ValidationError> {
        let (accepted_qty, rejected_qty) = match (input.accepted_qty, input.rejected_qty) {
            (Some(accepted), Some(rejected)) => (accepted, rejected),
            (Some(accepted), None) => (accepted, input.received_qty.saturating_sub(accepted)),
            (None, Some(rejected)) => (input.received_qty.saturating_sub(rejected), rejected),
            (None, None) => (input.received_qty, 0),
        };

        let mut item = Self {
            id: Uuid::new_v4(),
            product_name: require_text("product_name", &input.product_name, PRODUCT_NAME_MAX_CHARS)?,
            category_id: input.category_id,
            ordered_qty: input.ordered_qty,
            received_qty: input.received_qty,
            accepted_qty,
            rejected_qty,
            unit_cost_cents: input.unit_cost_cents,
            selling_price_cents: input.selling_price_cents,
            line_total_cents: 0,
        };
        item.validate(position)?;
        item.line_total_cents = item.compute_line_total()?;
        Ok(item)
    }

    /// `accepted_qty * unit_cost_cents`.
    pub fn compute_line_total(&self) -> Result<i64, ValidationError> {
        self.accepted_qty
            .checked_mul(self.unit_cost_cents)
            .ok_or(ValidationError::AmountOverflow)
    }

    pub fn validate(&self, position: usize) -> Result<(), ValidationError> {
        require_text("product_name", &self.product_name, PRODUCT_NAME_MAX_CHARS)?;
        for (field, value) in [
            ("ordered_qty", self.ordered_qty),
            ("received_qty", self.received_qty),
            ("accepted_qty", self.accepted_qty),
            ("rejected_qty", self.rejected_qty),
            ("unit_cost_cents", self.unit_cost_cents),
        ] {
            if value < 0 {
                return Err(ValidationError::Negative(field));
            }
        }
        if matches!(self.selling_price_cents, Some(price) if price < 0) {
            return Err(ValidationError::Negative("selling_price_cents"));
        }
        if self.accepted_qty.checked_add(self.rejected_qty) != Some(self.received_qty) {
            return Err(ValidationError::QuantityMismatch {
                position,
                received: self.received_qty,
                accepted: self.accepted_qty,
                rejected: self.rejected_qty,
            });
        }
        Ok(())
    }
}

/// GRN header with its items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoodsReceivedNote {
    pub id: GrnId,
    pub shop_id: ShopId,
    /// Assigned by storage on insert.
    pub grn_number: String,
    pub supplier_id: SupplierId,
    pub received_date: i64,
    pub status: GrnStatus,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub attachment_url: Option<String>,
    pub items: Vec<GrnItem>,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub payment_status: PaymentStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create/update payload for a GRN. Items replace the stored list as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GrnInput {
    pub supplier_id: SupplierId,
    #[serde(default)]
    pub received_date: Option<i64>,
    #[serde(default)]
    pub status: Option<GrnStatus>,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub attachment_url: Option<String>,
    #[serde(default)]
    pub items: Vec<GrnItemInput>,
}

impl GoodsReceivedNote {
    /// Builds an unsaved GRN. `now_ms` fills a missing `received_date`; the
    /// status defaults to `received`.
    pub fn from_input(shop_id: ShopId, input: GrnInput, now_ms: i64) -> Result<Self, ValidationError> {
        let mut grn = Self {
            id: Uuid::new_v4(),
            shop_id,
            grn_number: String::new(),
            supplier_id: input.supplier_id,
            received_date: now_ms,
            status: GrnStatus::Received,
            invoice_number: None,
            notes: None,
            attachment_url: None,
            items: Vec::new(),
            total_cents: 0,
            paid_cents: 0,
            payment_status: PaymentStatus::Paid,
            created_at: 0,
            updated_at: 0,
        };
        grn.apply_input(input)?;
        Ok(grn)
    }

    /// Replaces editable fields and the item list, then recomputes totals.
    ///
    /// A missing `status` or `received_date` keeps the current value.
    pub fn apply_input(&mut self, input: GrnInput) -> Result<(), ValidationError> {
        self.supplier_id = input.supplier_id;
        if let Some(received_date) = input.received_date {
            self.received_date = received_date;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        self.invoice_number =
            optional_text("invoice_number", input.invoice_number, INVOICE_NUMBER_MAX_CHARS)?;
        self.notes = optional_text("notes", input.notes, NOTES_MAX_CHARS)?;
        self.attachment_url =
            optional_text("attachment_url", input.attachment_url, ATTACHMENT_URL_MAX_CHARS)?;
        self.items = input
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| GrnItem::from_input(index + 1, item))
            .collect::<Result<Vec<_>, _>>()?;
        self.refresh_totals()?;
        self.validate()
    }

    /// Recomputes line totals, `total_cents` and `payment_status`.
    pub fn refresh_totals(&mut self) -> Result<(), ValidationError> {
        let mut total: i64 = 0;
        for item in &mut self.items {
            item.line_total_cents = item.compute_line_total()?;
            total = total
                .checked_add(item.line_total_cents)
                .ok_or(ValidationError::AmountOverflow)?;
        }
        self.total_cents = total;
        self.payment_status = PaymentStatus::derive(self.total_cents, self.paid_cents);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.received_date < 0 {
            return Err(ValidationError::Negative("received_date"));
        }
        if self.status != GrnStatus::Draft && self.items.is_empty() {
            return Err(ValidationError::MissingItems);
        }
        for (index, item) in self.items.iter().enumerate() {
            item.validate(index + 1)?;
        }
        if let Some(url) = self.attachment_url.as_deref() {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ValidationError::InvalidFormat {
                    field: "attachment_url",
                    reason: "must be an http(s) URL".to_string(),
                });
            }
        }
        if self.paid_cents < 0 {
            return Err(ValidationError::Negative("paid_cents"));
        }
        Ok(())
    }

    /// Remaining amount owed to the supplier for this GRN.
    pub fn outstanding_cents(&self) -> i64 {
        (self.total_cents - self.paid_cents).max(0)
    }

    pub fn received_qty(&self) -> i64 {
        self.items.iter().map(|item| item.received_qty).sum()
    }

    pub fn accepted_qty(&self) -> i64 {
        self.items.iter().map(|item| item.accepted_qty).sum()
    }

    pub fn rejected_qty(&self) -> i64 {
        self.items.iter().map(|item| item.rejected_qty).sum()
    }
}
