//! Supplier payment use cases.
//!
//! Overpayment, cancelled GRNs and supplier mismatches are rejected by the
//! repository inside the same transaction that applies the payment.

use super::{ServiceError, ServiceResult};
use crate::db::now_epoch_ms;
use crate::model::payment::{Payment, PaymentId, PaymentInput};
use crate::model::shop::ShopId;
use crate::model::supplier::SupplierId;
use crate::model::ValidationError;
use crate::report::SupplierBalance;
use crate::repo::payment_repo::{PaymentListQuery, PaymentRepository};
use crate::repo::Page;

pub struct PaymentService<R: PaymentRepository> {
    repo: R,
}

impl<R: PaymentRepository> PaymentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn record_payment(&mut self, shop_id: ShopId, input: PaymentInput) -> ServiceResult<Payment> {
        let payment = Payment::from_input(shop_id, input, now_epoch_ms())?;
        let payment_id = self.repo.create_payment(&payment)?;
        log::info!(
            "event=payment_create module=service status=ok shop_id={shop_id} payment_id={payment_id} linked_grn={}",
            payment.grn_id.is_some()
        );
        self.repo
            .get_payment(shop_id, payment_id)?
            .ok_or(ServiceError::InconsistentState(
                "created payment not found in read-back",
            ))
    }

    pub fn get_payment(&self, shop_id: ShopId, payment_id: PaymentId) -> ServiceResult<Payment> {
        self.repo
            .get_payment(shop_id, payment_id)?
            .ok_or(ServiceError::NotFound {
                entity: "payment",
                id: payment_id,
            })
    }

    pub fn list_payments(&self, query: &PaymentListQuery) -> ServiceResult<Page<Payment>> {
        if let (Some(from), Some(to)) = (query.paid_from, query.paid_to) {
            if from > to {
                return Err(ValidationError::InvalidFormat {
                    field: "from",
                    reason: "must not be after `to`".to_string(),
                }
                .into());
            }
        }
        Ok(self.repo.list_payments(query)?)
    }

    /// Deletes a payment; a linked GRN gets the amount back as outstanding.
    pub fn delete_payment(&mut self, shop_id: ShopId, payment_id: PaymentId) -> ServiceResult<()> {
        self.repo.delete_payment(shop_id, payment_id)?;
        log::info!(
            "event=payment_delete module=service status=ok shop_id={shop_id} payment_id={payment_id}"
        );
        Ok(())
    }

    pub fn supplier_balance(
        &self,
        shop_id: ShopId,
        supplier_id: SupplierId,
    ) -> ServiceResult<SupplierBalance> {
        let ledger = self.repo.supplier_ledger(shop_id, supplier_id)?;
        Ok(SupplierBalance::from_ledger(supplier_id, &ledger))
    }
}
