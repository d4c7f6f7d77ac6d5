//! Shop and section-visibility use cases.
//!
//! # Invariants
//! - `replace_sections` requires the complete key catalog.
//! - `patch_sections` merges a non-empty partial map over stored values.
//! - Unknown section keys are rejected by both write paths.

use super::{ServiceError, ServiceResult};
use crate::model::shop::{SectionVisibility, Shop, ShopId};
use crate::repo::shop_repo::ShopRepository;
use std::collections::BTreeMap;

pub struct ShopService<R: ShopRepository> {
    repo: R,
}

impl<R: ShopRepository> ShopService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a shop with every section visible.
    pub fn create_shop(&mut self, name: &str) -> ServiceResult<Shop> {
        let shop = Shop::new(name)?;
        let shop_id = self.repo.create_shop(&shop)?;
        log::info!("event=shop_create module=service status=ok shop_id={shop_id}");
        self.repo
            .get_shop(shop_id)?
            .ok_or(ServiceError::InconsistentState(
                "created shop not found in read-back",
            ))
    }

    pub fn get_shop(&self, shop_id: ShopId) -> ServiceResult<Shop> {
        self.repo
            .get_shop(shop_id)?
            .ok_or(ServiceError::NotFound {
                entity: "shop",
                id: shop_id,
            })
    }

    pub fn list_shops(&self) -> ServiceResult<Vec<Shop>> {
        Ok(self.repo.list_shops()?)
    }

    pub fn get_sections(&self, shop_id: ShopId) -> ServiceResult<SectionVisibility> {
        Ok(self.get_shop(shop_id)?.sections)
    }

    /// Full replacement (PUT semantics).
    pub fn replace_sections(
        &self,
        shop_id: ShopId,
        raw: &BTreeMap<String, bool>,
    ) -> ServiceResult<SectionVisibility> {
        self.get_shop(shop_id)?;
        let sections = SectionVisibility::from_complete(raw)?;
        self.store_sections(shop_id, &sections)
    }

    /// Partial merge (PATCH semantics).
    pub fn patch_sections(
        &self,
        shop_id: ShopId,
        raw: &BTreeMap<String, bool>,
    ) -> ServiceResult<SectionVisibility> {
        let mut sections = self.get_sections(shop_id)?;
        sections.apply_patch(raw)?;
        self.store_sections(shop_id, &sections)
    }

    fn store_sections(
        &self,
        shop_id: ShopId,
        sections: &SectionVisibility,
    ) -> ServiceResult<SectionVisibility> {
        self.repo.set_sections(shop_id, sections)?;
        log::info!(
            "event=sections_update module=service status=ok shop_id={shop_id} visible={}",
            sections.visible_sections().len()
        );
        self.get_sections(shop_id)
    }
}
