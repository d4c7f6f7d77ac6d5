//! Shop repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Each shop row owns one `shop_counters` row created alongside it.
//! - `sections` is stored as a JSON object keyed by section key.

use super::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use crate::model::shop::{SectionVisibility, Shop, ShopId};
use rusqlite::{params, Connection, Row, TransactionBehavior};

const SHOP_SELECT_SQL: &str = "SELECT
    id,
    name,
    sections,
    created_at,
    updated_at
FROM shops";

/// Repository interface for shop tenants.
pub trait ShopRepository {
    fn create_shop(&mut self, shop: &Shop) -> RepoResult<ShopId>;
    fn get_shop(&self, id: ShopId) -> RepoResult<Option<Shop>>;
    fn list_shops(&self) -> RepoResult<Vec<Shop>>;
    /// Replaces the stored visibility map.
    fn set_sections(&self, id: ShopId, sections: &SectionVisibility) -> RepoResult<()>;
}

/// SQLite-backed shop repository.
pub struct SqliteShopRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteShopRepository<'conn> {
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ShopRepository for SqliteShopRepository<'_> {
    fn create_shop(&mut self, shop: &Shop) -> RepoResult<ShopId> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO shops (id, name, sections) VALUES (?1, ?2, ?3);",
            params![
                shop.id.to_string(),
                shop.name.as_str(),
                shop.sections.to_stored_json()
            ],
        )?;
        tx.execute(
            "INSERT INTO shop_counters (shop_id, next_grn) VALUES (?1, 1);",
            [shop.id.to_string()],
        )?;
        tx.commit()?;
        Ok(shop.id)
    }

    fn get_shop(&self, id: ShopId) -> RepoResult<Option<Shop>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SHOP_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_shop_row(row)?));
        }
        Ok(None)
    }

    fn list_shops(&self) -> RepoResult<Vec<Shop>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SHOP_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut shops = Vec::new();
        while let Some(row) = rows.next()? {
            shops.push(parse_shop_row(row)?);
        }
        Ok(shops)
    }

    fn set_sections(&self, id: ShopId, sections: &SectionVisibility) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE shops
             SET
                sections = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), sections.to_stored_json()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "shop", id });
        }
        Ok(())
    }
}

fn parse_shop_row(row: &Row<'_>) -> RepoResult<Shop> {
    let id_text: String = row.get("id")?;
    let sections_text: String = row.get("sections")?;
    let sections = SectionVisibility::from_stored_json(&sections_text)
        .map_err(|err| RepoError::InvalidData(format!("{err} in shops.sections")))?;
    Ok(Shop {
        id: parse_uuid("shops.id", &id_text)?,
        name: row.get("name")?,
        sections,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
