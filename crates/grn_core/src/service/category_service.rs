//! Category use cases.

use super::{ServiceError, ServiceResult};
use crate::model::category::{Category, CategoryId, CategoryInput};
use crate::model::shop::ShopId;
use crate::repo::category_repo::CategoryRepository;

pub struct CategoryService<R: CategoryRepository> {
    repo: R,
}

impl<R: CategoryRepository> CategoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_category(
        &self,
        shop_id: ShopId,
        input: CategoryInput,
    ) -> ServiceResult<Category> {
        let category = Category::from_input(shop_id, input)?;
        let category_id = self.repo.create_category(&category)?;
        log::info!(
            "event=category_create module=service status=ok shop_id={shop_id} category_id={category_id}"
        );
        self.repo
            .get_category(shop_id, category_id)?
            .ok_or(ServiceError::InconsistentState(
                "created category not found in read-back",
            ))
    }

    pub fn update_category(
        &self,
        shop_id: ShopId,
        category_id: CategoryId,
        input: CategoryInput,
    ) -> ServiceResult<Category> {
        let mut category = self.get_category(shop_id, category_id)?;
        category.apply_input(input)?;
        self.repo.update_category(&category)?;
        self.repo
            .get_category(shop_id, category_id)?
            .ok_or(ServiceError::InconsistentState(
                "updated category not found in read-back",
            ))
    }

    pub fn get_category(&self, shop_id: ShopId, category_id: CategoryId) -> ServiceResult<Category> {
        self.repo
            .get_category(shop_id, category_id)?
            .ok_or(ServiceError::NotFound {
                entity: "category",
                id: category_id,
            })
    }

    pub fn list_categories(&self, shop_id: ShopId) -> ServiceResult<Vec<Category>> {
        Ok(self.repo.list_categories(shop_id)?)
    }

    /// Items that referenced the category keep their data with no category.
    pub fn delete_category(&self, shop_id: ShopId, category_id: CategoryId) -> ServiceResult<()> {
        self.repo.delete_category(shop_id, category_id)?;
        log::info!(
            "event=category_delete module=service status=ok shop_id={shop_id} category_id={category_id}"
        );
        Ok(())
    }
}
