//! Product category record.

use super::shop::ShopId;
use super::{optional_text, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CategoryId = Uuid;

const CATEGORY_NAME_MAX_CHARS: usize = 80;
const CATEGORY_DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub shop_id: ShopId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Category {
    pub fn from_input(shop_id: ShopId, input: CategoryInput) -> Result<Self, ValidationError> {
        let mut category = Self {
            id: Uuid::new_v4(),
            shop_id,
            name: String::new(),
            description: None,
            created_at: 0,
            updated_at: 0,
        };
        category.apply_input(input)?;
        Ok(category)
    }

    pub fn apply_input(&mut self, input: CategoryInput) -> Result<(), ValidationError> {
        self.name = require_text("name", &input.name, CATEGORY_NAME_MAX_CHARS)?;
        self.description = optional_text(
            "description",
            input.description,
            CATEGORY_DESCRIPTION_MAX_CHARS,
        )?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, CATEGORY_NAME_MAX_CHARS).map(|_| ())
    }
}
