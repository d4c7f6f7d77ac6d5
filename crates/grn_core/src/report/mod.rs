//! In-memory aggregation over GRNs and supplier ledgers.
//!
//! # Invariants
//! - Money and quantity totals exclude cancelled GRNs; the status counts
//!   include them.
//! - Percentages are rounded to two decimals and are `0.0` for an empty base.

use crate::model::grn::{GoodsReceivedNote, GrnStatus};
use crate::model::supplier::SupplierId;
use crate::repo::payment_repo::SupplierLedger;
use serde::Serialize;

/// Number of GRNs per lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub draft: u64,
    pub received: u64,
    pub completed: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    fn add(&mut self, status: GrnStatus) {
        match status {
            GrnStatus::Draft => self.draft += 1,
            GrnStatus::Received => self.received += 1,
            GrnStatus::Completed => self.completed += 1,
            GrnStatus::Cancelled => self.cancelled += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrnSummary {
    pub grn_count: u64,
    pub status_counts: StatusCounts,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub outstanding_cents: i64,
    pub received_qty: i64,
    pub accepted_qty: i64,
    pub rejected_qty: i64,
    /// `accepted_qty / received_qty` as a percentage.
    pub acceptance_rate: f64,
}

impl GrnSummary {
    pub fn from_grns(grns: &[GoodsReceivedNote]) -> Self {
        let mut summary = Self::default();
        for grn in grns {
            summary.grn_count += 1;
            summary.status_counts.add(grn.status);
            if grn.status == GrnStatus::Cancelled {
                continue;
            }
            summary.total_cents = summary.total_cents.saturating_add(grn.total_cents);
            summary.paid_cents = summary.paid_cents.saturating_add(grn.paid_cents);
            summary.outstanding_cents = summary
                .outstanding_cents
                .saturating_add(grn.outstanding_cents());
            summary.received_qty = summary.received_qty.saturating_add(grn.received_qty());
            summary.accepted_qty = summary.accepted_qty.saturating_add(grn.accepted_qty());
            summary.rejected_qty = summary.rejected_qty.saturating_add(grn.rejected_qty());
        }
        summary.acceptance_rate = percentage(summary.accepted_qty, summary.received_qty);
        summary
    }
}

/// What a shop owes one supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SupplierBalance {
    pub supplier_id: SupplierId,
    pub purchased_cents: i64,
    pub paid_cents: i64,
    /// `purchased - paid`; negative when the supplier holds an advance.
    pub outstanding_cents: i64,
    pub grn_count: i64,
    pub payment_count: i64,
}

impl SupplierBalance {
    pub fn from_ledger(supplier_id: SupplierId, ledger: &SupplierLedger) -> Self {
        Self {
            supplier_id,
            purchased_cents: ledger.purchased_cents,
            paid_cents: ledger.paid_cents,
            outstanding_cents: ledger.purchased_cents.saturating_sub(ledger.paid_cents),
            grn_count: ledger.grn_count,
            payment_count: ledger.payment_count,
        }
    }
}

/// `part / whole * 100`, rounded to two decimals.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = part as f64 * 100.0 / whole as f64;
    (raw * 100.0).round() / 100.0
}
