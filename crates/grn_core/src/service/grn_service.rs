//! GRN use cases.
//!
//! # Responsibility
//! - Build GRNs from client input and recompute derived totals.
//! - Check that referenced suppliers and categories belong to the shop.
//! - Enforce lifecycle rules before touching storage.
//!
//! # Invariants
//! - Cancelled GRNs are read-only.
//! - A GRN with payments recorded against it cannot be cancelled.
//! - Leaving `draft` requires at least one item.

use super::{ServiceError, ServiceResult};
use crate::db::now_epoch_ms;
use crate::model::category::CategoryId;
use crate::model::grn::{GoodsReceivedNote, GrnId, GrnInput, GrnStatus};
use crate::model::shop::ShopId;
use crate::model::ValidationError;
use crate::report::GrnSummary;
use crate::repo::grn_repo::{GrnFilter, GrnRepository};
use crate::repo::{Page, PageRequest};

pub struct GrnService<R: GrnRepository> {
    repo: R,
}

impl<R: GrnRepository> GrnService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a GRN and returns it with its assigned number.
    pub fn create_grn(&mut self, shop_id: ShopId, input: GrnInput) -> ServiceResult<GoodsReceivedNote> {
        let grn = GoodsReceivedNote::from_input(shop_id, input, now_epoch_ms())?;
        self.check_references(&grn)?;
        let grn_number = self.repo.create_grn(&grn)?;
        log::info!(
            "event=grn_create module=service status=ok shop_id={shop_id} grn_id={} grn_number={grn_number} items={}",
            grn.id,
            grn.items.len()
        );
        self.read_back(grn.id, "created grn not found in read-back")
    }

    /// Replaces header fields and items of an existing GRN.
    ///
    /// A status carried by the input must be a valid transition from the
    /// stored status.
    pub fn update_grn(
        &mut self,
        shop_id: ShopId,
        grn_id: GrnId,
        input: GrnInput,
    ) -> ServiceResult<GoodsReceivedNote> {
        let mut grn = self.get_grn(shop_id, grn_id)?;
        ensure_editable(&grn)?;
        if let Some(next) = input.status {
            ensure_transition(&grn, next)?;
        }
        grn.apply_input(input)?;
        self.check_references(&grn)?;
        self.repo.update_grn(&grn)?;
        log::info!(
            "event=grn_update module=service status=ok shop_id={shop_id} grn_id={grn_id} items={}",
            grn.items.len()
        );
        self.read_back(grn_id, "updated grn not found in read-back")
    }

    /// Loads a GRN that must belong to `shop_id`.
    pub fn get_grn(&self, shop_id: ShopId, grn_id: GrnId) -> ServiceResult<GoodsReceivedNote> {
        match self.repo.get_grn(grn_id)? {
            Some(grn) if grn.shop_id == shop_id => Ok(grn),
            _ => Err(ServiceError::NotFound {
                entity: "grn",
                id: grn_id,
            }),
        }
    }

    /// Loads a GRN regardless of shop. Callers authorize on `grn.shop_id`.
    pub fn locate_grn(&self, grn_id: GrnId) -> ServiceResult<GoodsReceivedNote> {
        self.repo.get_grn(grn_id)?.ok_or(ServiceError::NotFound {
            entity: "grn",
            id: grn_id,
        })
    }

    pub fn list_grns(
        &self,
        filter: &GrnFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<GoodsReceivedNote>> {
        ensure_date_range(filter)?;
        Ok(self.repo.list_grns(filter, Some(page))?)
    }

    /// Aggregates every GRN matching `filter`, ignoring pagination.
    pub fn summarize(&self, filter: &GrnFilter) -> ServiceResult<GrnSummary> {
        ensure_date_range(filter)?;
        let grns = self.repo.list_grns(filter, None)?;
        Ok(GrnSummary::from_grns(&grns.items))
    }

    pub fn set_status(
        &self,
        shop_id: ShopId,
        grn_id: GrnId,
        next: GrnStatus,
    ) -> ServiceResult<GoodsReceivedNote> {
        let grn = self.get_grn(shop_id, grn_id)?;
        ensure_transition(&grn, next)?;
        if next != GrnStatus::Draft && grn.items.is_empty() {
            return Err(ValidationError::MissingItems.into());
        }
        if grn.status != next {
            self.repo.set_status(grn_id, next)?;
            log::info!(
                "event=grn_status module=service status=ok shop_id={shop_id} grn_id={grn_id} from={} to={}",
                grn.status.as_str(),
                next.as_str()
            );
        }
        self.read_back(grn_id, "grn missing after status change")
    }

    pub fn delete_grn(&mut self, shop_id: ShopId, grn_id: GrnId) -> ServiceResult<()> {
        self.get_grn(shop_id, grn_id)?;
        self.repo.delete_grn(grn_id)?;
        log::info!("event=grn_delete module=service status=ok shop_id={shop_id} grn_id={grn_id}");
        Ok(())
    }

    fn check_references(&self, grn: &GoodsReceivedNote) -> ServiceResult<()> {
        if !self.repo.supplier_exists(grn.shop_id, grn.supplier_id)? {
            return Err(ValidationError::InvalidFormat {
                field: "supplier_id",
                reason: format!("supplier {} does not exist in this shop", grn.supplier_id),
            }
            .into());
        }
        let category_ids: Vec<CategoryId> =
            grn.items.iter().filter_map(|item| item.category_id).collect();
        if category_ids.is_empty() {
            return Ok(());
        }
        let missing = self.repo.missing_categories(grn.shop_id, &category_ids)?;
        if let Some(first) = missing.first() {
            return Err(ValidationError::InvalidFormat {
                field: "category_id",
                reason: format!("category {first} does not exist in this shop"),
            }
            .into());
        }
        Ok(())
    }

    fn read_back(&self, grn_id: GrnId, details: &'static str) -> ServiceResult<GoodsReceivedNote> {
        self.repo
            .get_grn(grn_id)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}

fn ensure_editable(grn: &GoodsReceivedNote) -> ServiceResult<()> {
    if grn.status == GrnStatus::Cancelled {
        return Err(ServiceError::Conflict(format!(
            "grn {} is cancelled and cannot be modified",
            grn.grn_number
        )));
    }
    Ok(())
}

fn ensure_transition(grn: &GoodsReceivedNote, next: GrnStatus) -> ServiceResult<()> {
    ensure_editable(grn)?;
    if !grn.status.can_transition_to(next) {
        return Err(ServiceError::Conflict(format!(
            "grn {} cannot move from {} to {}",
            grn.grn_number,
            grn.status.as_str(),
            next.as_str()
        )));
    }
    if next == GrnStatus::Cancelled && grn.paid_cents > 0 {
        return Err(ServiceError::Conflict(format!(
            "grn {} has payments recorded; delete them before cancelling",
            grn.grn_number
        )));
    }
    Ok(())
}

fn ensure_date_range(filter: &GrnFilter) -> ServiceResult<()> {
    if let (Some(from), Some(to)) = (filter.received_from, filter.received_to) {
        if from > to {
            return Err(ValidationError::InvalidFormat {
                field: "from",
                reason: "must not be after `to`".to_string(),
            }
            .into());
        }
    }
    Ok(())
}
