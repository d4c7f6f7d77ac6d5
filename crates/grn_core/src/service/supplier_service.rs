//! Supplier use cases.

use super::{ServiceError, ServiceResult};
use crate::model::shop::ShopId;
use crate::model::supplier::{Supplier, SupplierId, SupplierInput};
use crate::repo::supplier_repo::{SupplierListQuery, SupplierRepository};
use crate::repo::Page;

pub struct SupplierService<R: SupplierRepository> {
    repo: R,
}

impl<R: SupplierRepository> SupplierService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_supplier(
        &self,
        shop_id: ShopId,
        input: SupplierInput,
    ) -> ServiceResult<Supplier> {
        let supplier = Supplier::from_input(shop_id, input)?;
        let supplier_id = self.repo.create_supplier(&supplier)?;
        log::info!(
            "event=supplier_create module=service status=ok shop_id={shop_id} supplier_id={supplier_id}"
        );
        self.read_back(shop_id, supplier_id, "created supplier not found in read-back")
    }

    /// Replaces editable fields. An omitted `is_active` keeps the stored flag.
    pub fn update_supplier(
        &self,
        shop_id: ShopId,
        supplier_id: SupplierId,
        input: SupplierInput,
    ) -> ServiceResult<Supplier> {
        let mut supplier = self.get_supplier(shop_id, supplier_id)?;
        supplier.apply_input(input)?;
        self.repo.update_supplier(&supplier)?;
        log::info!(
            "event=supplier_update module=service status=ok shop_id={shop_id} supplier_id={supplier_id}"
        );
        self.read_back(shop_id, supplier_id, "updated supplier not found in read-back")
    }

    pub fn get_supplier(&self, shop_id: ShopId, supplier_id: SupplierId) -> ServiceResult<Supplier> {
        self.repo
            .get_supplier(shop_id, supplier_id)?
            .ok_or(ServiceError::NotFound {
                entity: "supplier",
                id: supplier_id,
            })
    }

    pub fn list_suppliers(&self, query: &SupplierListQuery) -> ServiceResult<Page<Supplier>> {
        Ok(self.repo.list_suppliers(query)?)
    }

    pub fn delete_supplier(&self, shop_id: ShopId, supplier_id: SupplierId) -> ServiceResult<()> {
        self.repo.delete_supplier(shop_id, supplier_id)?;
        log::info!(
            "event=supplier_delete module=service status=ok shop_id={shop_id} supplier_id={supplier_id}"
        );
        Ok(())
    }

    fn read_back(
        &self,
        shop_id: ShopId,
        supplier_id: SupplierId,
        details: &'static str,
    ) -> ServiceResult<Supplier> {
        self.repo
            .get_supplier(shop_id, supplier_id)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}
