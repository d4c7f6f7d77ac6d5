//! Supplier repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Every query is scoped by `shop_id`.
//! - A supplier referenced by GRNs or payments cannot be deleted.

use super::{
    bool_to_int, ensure_connection_ready, like_pattern, map_unique_violation, parse_bool,
    parse_uuid, Page, PageRequest, RepoError, RepoResult,
};
use crate::model::name_key;
use crate::model::shop::ShopId;
use crate::model::supplier::{Supplier, SupplierId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const SUPPLIER_SELECT_SQL: &str = "SELECT
    id,
    shop_id,
    name,
    contact_person,
    phone,
    email,
    address,
    is_active,
    created_at,
    updated_at
FROM suppliers";

/// List filter for suppliers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierListQuery {
    pub shop_id: ShopId,
    /// Case-insensitive match on name, contact person, phone or email.
    pub search: Option<String>,
    pub active: Option<bool>,
    pub page: PageRequest,
}

impl SupplierListQuery {
    pub fn for_shop(shop_id: ShopId) -> Self {
        Self {
            shop_id,
            search: None,
            active: None,
            page: PageRequest::default(),
        }
    }
}

pub trait SupplierRepository {
    fn create_supplier(&self, supplier: &Supplier) -> RepoResult<SupplierId>;
    fn update_supplier(&self, supplier: &Supplier) -> RepoResult<()>;
    fn get_supplier(&self, shop_id: ShopId, id: SupplierId) -> RepoResult<Option<Supplier>>;
    fn list_suppliers(&self, query: &SupplierListQuery) -> RepoResult<Page<Supplier>>;
    fn delete_supplier(&self, shop_id: ShopId, id: SupplierId) -> RepoResult<()>;
}

pub struct SqliteSupplierRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSupplierRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SupplierRepository for SqliteSupplierRepository<'_> {
    fn create_supplier(&self, supplier: &Supplier) -> RepoResult<SupplierId> {
        supplier.validate()?;

        self.conn
            .execute(
                "INSERT INTO suppliers (
                    id,
                    shop_id,
                    name,
                    contact_person,
                    phone,
                    email,
                    address,
                    is_active,
                    name_key
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    supplier.id.to_string(),
                    supplier.shop_id.to_string(),
                    supplier.name.as_str(),
                    supplier.contact_person.as_deref(),
                    supplier.phone.as_deref(),
                    supplier.email.as_deref(),
                    supplier.address.as_deref(),
                    bool_to_int(supplier.is_active),
                    name_key(&supplier.name),
                ],
            )
            .map_err(|err| duplicate_name(err, &supplier.name))?;

        Ok(supplier.id)
    }

    fn update_supplier(&self, supplier: &Supplier) -> RepoResult<()> {
        supplier.validate()?;

        let changed = self
            .conn
            .execute(
                "UPDATE suppliers
                 SET
                    name = ?3,
                    contact_person = ?4,
                    phone = ?5,
                    email = ?6,
                    address = ?7,
                    is_active = ?8,
                    name_key = ?9,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1 AND shop_id = ?2;",
                params![
                    supplier.id.to_string(),
                    supplier.shop_id.to_string(),
                    supplier.name.as_str(),
                    supplier.contact_person.as_deref(),
                    supplier.phone.as_deref(),
                    supplier.email.as_deref(),
                    supplier.address.as_deref(),
                    bool_to_int(supplier.is_active),
                    name_key(&supplier.name),
                ],
            )
            .map_err(|err| duplicate_name(err, &supplier.name))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "supplier",
                id: supplier.id,
            });
        }
        Ok(())
    }

    fn get_supplier(&self, shop_id: ShopId, id: SupplierId) -> RepoResult<Option<Supplier>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SUPPLIER_SELECT_SQL} WHERE id = ?1 AND shop_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), shop_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_supplier_row(row)?));
        }
        Ok(None)
    }

    fn list_suppliers(&self, query: &SupplierListQuery) -> RepoResult<Page<Supplier>> {
        let mut where_sql = String::from(" WHERE shop_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(query.shop_id.to_string())];

        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            where_sql.push_str(
                " AND (name LIKE ? ESCAPE '\\'
                    OR contact_person LIKE ? ESCAPE '\\'
                    OR phone LIKE ? ESCAPE '\\'
                    OR email LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(search);
            for _ in 0..4 {
                bind_values.push(Value::Text(pattern.clone()));
            }
        }

        if let Some(active) = query.active {
            where_sql.push_str(" AND is_active = ?");
            bind_values.push(Value::Integer(bool_to_int(active)));
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM suppliers{where_sql};"),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "{SUPPLIER_SELECT_SQL}{where_sql} ORDER BY name COLLATE NOCASE ASC, id ASC LIMIT ? OFFSET ?;"
        );
        bind_values.push(Value::Integer(i64::from(query.page.page_size)));
        bind_values.push(Value::Integer(query.page.offset()));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut suppliers = Vec::new();
        while let Some(row) = rows.next()? {
            suppliers.push(parse_supplier_row(row)?);
        }

        Ok(Page::new(suppliers, query.page, total.max(0) as u64))
    }

    fn delete_supplier(&self, shop_id: ShopId, id: SupplierId) -> RepoResult<()> {
        if self.get_supplier(shop_id, id)?.is_none() {
            return Err(RepoError::NotFound {
                entity: "supplier",
                id,
            });
        }

        let references: i64 = self.conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM grns WHERE supplier_id = ?1)
              + (SELECT COUNT(*) FROM payments WHERE supplier_id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        if references > 0 {
            return Err(RepoError::Conflict(format!(
                "supplier {id} is referenced by {references} GRN(s) or payment(s); deactivate it instead"
            )));
        }

        let changed = self.conn.execute(
            "DELETE FROM suppliers WHERE id = ?1 AND shop_id = ?2;",
            params![id.to_string(), shop_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "supplier",
                id,
            });
        }
        Ok(())
    }
}

fn duplicate_name(err: rusqlite::Error, name: &str) -> RepoError {
    map_unique_violation(err, format!("supplier `{name}` already exists"))
}

fn parse_supplier_row(row: &Row<'_>) -> RepoResult<Supplier> {
    let id_text: String = row.get("id")?;
    let shop_text: String = row.get("shop_id")?;
    let supplier = Supplier {
        id: parse_uuid("suppliers.id", &id_text)?,
        shop_id: parse_uuid("suppliers.shop_id", &shop_text)?,
        name: row.get("name")?,
        contact_person: row.get("contact_person")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        address: row.get("address")?,
        is_active: parse_bool("suppliers.is_active", row.get("is_active")?)?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    supplier
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("{err} in suppliers row {id_text}")))?;
    Ok(supplier)
}
