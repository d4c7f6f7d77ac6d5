//! Category repository contracts and SQLite implementation.
//!
//! Deleting a category clears `grn_items.category_id` through the
//! `ON DELETE SET NULL` foreign key.

use super::{ensure_connection_ready, map_unique_violation, parse_uuid, RepoError, RepoResult};
use crate::model::category::{Category, CategoryId};
use crate::model::name_key;
use crate::model::shop::ShopId;
use rusqlite::{params, Connection, Row};

const CATEGORY_SELECT_SQL: &str = "SELECT
    id,
    shop_id,
    name,
    description,
    created_at,
    updated_at
FROM categories";

pub trait CategoryRepository {
    fn create_category(&self, category: &Category) -> RepoResult<CategoryId>;
    fn update_category(&self, category: &Category) -> RepoResult<()>;
    fn get_category(&self, shop_id: ShopId, id: CategoryId) -> RepoResult<Option<Category>>;
    /// Lists all categories of a shop sorted by name.
    fn list_categories(&self, shop_id: ShopId) -> RepoResult<Vec<Category>>;
    fn delete_category(&self, shop_id: ShopId, id: CategoryId) -> RepoResult<()>;
}

pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn create_category(&self, category: &Category) -> RepoResult<CategoryId> {
        category.validate()?;
        self.conn
            .execute(
                "INSERT INTO categories (id, shop_id, name, description, name_key)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    category.id.to_string(),
                    category.shop_id.to_string(),
                    category.name.as_str(),
                    category.description.as_deref(),
                    name_key(&category.name),
                ],
            )
            .map_err(|err| duplicate_name(err, &category.name))?;
        Ok(category.id)
    }

    fn update_category(&self, category: &Category) -> RepoResult<()> {
        category.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE categories
                 SET
                    name = ?3,
                    description = ?4,
                    name_key = ?5,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1 AND shop_id = ?2;",
                params![
                    category.id.to_string(),
                    category.shop_id.to_string(),
                    category.name.as_str(),
                    category.description.as_deref(),
                    name_key(&category.name),
                ],
            )
            .map_err(|err| duplicate_name(err, &category.name))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "category",
                id: category.id,
            });
        }
        Ok(())
    }

    fn get_category(&self, shop_id: ShopId, id: CategoryId) -> RepoResult<Option<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CATEGORY_SELECT_SQL} WHERE id = ?1 AND shop_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), shop_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_category_row(row)?));
        }
        Ok(None)
    }

    fn list_categories(&self, shop_id: ShopId) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CATEGORY_SELECT_SQL} WHERE shop_id = ?1 ORDER BY name COLLATE NOCASE ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([shop_id.to_string()])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    fn delete_category(&self, shop_id: ShopId, id: CategoryId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM categories WHERE id = ?1 AND shop_id = ?2;",
            params![id.to_string(), shop_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "category",
                id,
            });
        }
        Ok(())
    }
}

fn duplicate_name(err: rusqlite::Error, name: &str) -> RepoError {
    map_unique_violation(err, format!("category `{name}` already exists"))
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    let id_text: String = row.get("id")?;
    let shop_text: String = row.get("shop_id")?;
    Ok(Category {
        id: parse_uuid("categories.id", &id_text)?,
        shop_id: parse_uuid("categories.shop_id", &shop_text)?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
