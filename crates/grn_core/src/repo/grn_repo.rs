//! GRN repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist GRN headers and their ordered items as one unit.
//! - Assign shop-scoped GRN numbers from `shop_counters`.
//! - Provide filtered, paginated listing with an unpaged total count.
//!
//! # Invariants
//! - Number assignment and header insert share one immediate transaction,
//!   so numbers are never reused.
//! - Item lists are replaced as a whole; `position` preserves input order.
//! - `paid_cents` is only changed by the payment repository.
//! - A stored total never drops below the amount already paid.

use super::{
    ensure_connection_ready, like_pattern, parse_optional_uuid, parse_uuid, Page, PageRequest,
    RepoError, RepoResult,
};
use crate::model::category::CategoryId;
use crate::model::grn::{
    format_grn_number, GoodsReceivedNote, GrnId, GrnItem, GrnStatus, PaymentStatus,
};
use crate::model::shop::ShopId;
use crate::model::supplier::SupplierId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const GRN_SELECT_SQL: &str = "SELECT
    g.id,
    g.shop_id,
    g.grn_number,
    g.supplier_id,
    g.received_date,
    g.status,
    g.invoice_number,
    g.notes,
    g.attachment_url,
    g.total_cents,
    g.paid_cents,
    g.created_at,
    g.updated_at
FROM grns g
INNER JOIN suppliers s ON s.id = g.supplier_id";

const PAYMENT_STATUS_SQL: &str = "CASE
    WHEN g.paid_cents >= g.total_cents THEN 'paid'
    WHEN g.paid_cents = 0 THEN 'unpaid'
    ELSE 'partial'
END";

/// Filters for GRN listing. Every populated field narrows the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrnFilter {
    pub shop_id: ShopId,
    /// Case-insensitive match on GRN number, invoice number, notes or
    /// supplier name.
    pub search: Option<String>,
    pub status: Option<GrnStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub supplier_id: Option<SupplierId>,
    /// Inclusive lower bound on `received_date` (epoch ms).
    pub received_from: Option<i64>,
    /// Inclusive upper bound on `received_date` (epoch ms).
    pub received_to: Option<i64>,
}

impl GrnFilter {
    pub fn for_shop(shop_id: ShopId) -> Self {
        Self {
            shop_id,
            search: None,
            status: None,
            payment_status: None,
            supplier_id: None,
            received_from: None,
            received_to: None,
        }
    }
}

pub trait GrnRepository {
    /// Inserts a GRN with its items and returns the assigned GRN number.
    fn create_grn(&mut self, grn: &GoodsReceivedNote) -> RepoResult<String>;
    /// Updates header fields and replaces items. Number and paid amount are kept.
    fn update_grn(&mut self, grn: &GoodsReceivedNote) -> RepoResult<()>;
    fn get_grn(&self, id: GrnId) -> RepoResult<Option<GoodsReceivedNote>>;
    /// Lists GRNs newest first. `None` page returns every match.
    fn list_grns(
        &self,
        filter: &GrnFilter,
        page: Option<PageRequest>,
    ) -> RepoResult<Page<GoodsReceivedNote>>;
    fn set_status(&self, id: GrnId, status: GrnStatus) -> RepoResult<()>;
    /// Deletes a GRN and its items. Rejected while payments reference it.
    fn delete_grn(&mut self, id: GrnId) -> RepoResult<()>;
    fn supplier_exists(&self, shop_id: ShopId, supplier_id: SupplierId) -> RepoResult<bool>;
    /// Returns the ids from `ids` that are not categories of `shop_id`.
    fn missing_categories(
        &self,
        shop_id: ShopId,
        ids: &[CategoryId],
    ) -> RepoResult<Vec<CategoryId>>;
}

pub struct SqliteGrnRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteGrnRepository<'conn> {
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl GrnRepository for SqliteGrnRepository<'_> {
    fn create_grn(&mut self, grn: &GoodsReceivedNote) -> RepoResult<String> {
        grn.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let shop_id_text = grn.shop_id.to_string();
        let next: Option<i64> = {
            let mut stmt = tx.prepare("SELECT next_grn FROM shop_counters WHERE shop_id = ?1;")?;
            let mut rows = stmt.query([shop_id_text.as_str()])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };
        let sequence = next.ok_or(RepoError::NotFound {
            entity: "shop",
            id: grn.shop_id,
        })?;
        let grn_number = format_grn_number(sequence);

        tx.execute(
            "INSERT INTO grns (
                id,
                shop_id,
                grn_number,
                supplier_id,
                received_date,
                status,
                invoice_number,
                notes,
                attachment_url,
                total_cents,
                paid_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0);",
            params![
                grn.id.to_string(),
                shop_id_text.as_str(),
                grn_number.as_str(),
                grn.supplier_id.to_string(),
                grn.received_date,
                grn.status.as_str(),
                grn.invoice_number.as_deref(),
                grn.notes.as_deref(),
                grn.attachment_url.as_deref(),
                grn.total_cents,
            ],
        )?;
        insert_items(&tx, grn)?;
        tx.execute(
            "UPDATE shop_counters SET next_grn = next_grn + 1 WHERE shop_id = ?1;",
            [shop_id_text.as_str()],
        )?;
        tx.commit()?;

        Ok(grn_number)
    }

    fn update_grn(&mut self, grn: &GoodsReceivedNote) -> RepoResult<()> {
        grn.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id_text = grn.id.to_string();
        let stored: Option<(String, i64, String)> = {
            let mut stmt = tx.prepare(
                "SELECT status, paid_cents, supplier_id FROM grns WHERE id = ?1 AND shop_id = ?2;",
            )?;
            let mut rows = stmt.query(params![id_text.as_str(), grn.shop_id.to_string()])?;
            match rows.next()? {
                Some(row) => Some((row.get(0)?, row.get(1)?, row.get(2)?)),
                None => None,
            }
        };
        let (stored_status, paid_cents, stored_supplier) = stored.ok_or(RepoError::NotFound {
            entity: "grn",
            id: grn.id,
        })?;
        if stored_status == GrnStatus::Cancelled.as_str() {
            return Err(RepoError::Conflict(format!(
                "grn {} is cancelled and cannot be modified",
                grn.id
            )));
        }
        if stored_supplier != grn.supplier_id.to_string() {
            let linked_payments: i64 = tx.query_row(
                "SELECT COUNT(*) FROM payments WHERE grn_id = ?1;",
                [id_text.as_str()],
                |row| row.get(0),
            )?;
            if paid_cents > 0 || linked_payments > 0 {
                return Err(RepoError::Conflict(format!(
                    "grn {} has payments recorded against supplier {stored_supplier}; delete them before changing the supplier",
                    grn.id
                )));
            }
        }
        if grn.total_cents < paid_cents {
            return Err(RepoError::Conflict(format!(
                "grn total {} is below the amount already paid {}",
                grn.total_cents, paid_cents
            )));
        }

        tx.execute(
            "UPDATE grns
             SET
                supplier_id = ?2,
                received_date = ?3,
                status = ?4,
                invoice_number = ?5,
                notes = ?6,
                attachment_url = ?7,
                total_cents = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id_text.as_str(),
                grn.supplier_id.to_string(),
                grn.received_date,
                grn.status.as_str(),
                grn.invoice_number.as_deref(),
                grn.notes.as_deref(),
                grn.attachment_url.as_deref(),
                grn.total_cents,
            ],
        )?;
        tx.execute("DELETE FROM grn_items WHERE grn_id = ?1;", [id_text.as_str()])?;
        insert_items(&tx, grn)?;
        tx.commit()?;
        Ok(())
    }

    fn get_grn(&self, id: GrnId) -> RepoResult<Option<GoodsReceivedNote>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{GRN_SELECT_SQL} WHERE g.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let mut grn = parse_grn_row(row)?;
            grn.items = load_items(self.conn, grn.id)?;
            return Ok(Some(grn));
        }
        Ok(None)
    }

    fn list_grns(
        &self,
        filter: &GrnFilter,
        page: Option<PageRequest>,
    ) -> RepoResult<Page<GoodsReceivedNote>> {
        let mut where_sql = String::from(" WHERE g.shop_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(filter.shop_id.to_string())];

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            where_sql.push_str(
                " AND (g.grn_number LIKE ? ESCAPE '\\'
                    OR g.invoice_number LIKE ? ESCAPE '\\'
                    OR g.notes LIKE ? ESCAPE '\\'
                    OR s.name LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(search);
            for _ in 0..4 {
                bind_values.push(Value::Text(pattern.clone()));
            }
        }
        if let Some(status) = filter.status {
            where_sql.push_str(" AND g.status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(payment_status) = filter.payment_status {
            where_sql.push_str(&format!(" AND ({PAYMENT_STATUS_SQL}) = ?"));
            bind_values.push(Value::Text(payment_status.as_str().to_string()));
        }
        if let Some(supplier_id) = filter.supplier_id {
            where_sql.push_str(" AND g.supplier_id = ?");
            bind_values.push(Value::Text(supplier_id.to_string()));
        }
        if let Some(from) = filter.received_from {
            where_sql.push_str(" AND g.received_date >= ?");
            bind_values.push(Value::Integer(from));
        }
        if let Some(to) = filter.received_to {
            where_sql.push_str(" AND g.received_date <= ?");
            bind_values.push(Value::Integer(to));
        }

        let total: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM grns g INNER JOIN suppliers s ON s.id = g.supplier_id{where_sql};"
            ),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let mut sql =
            format!("{GRN_SELECT_SQL}{where_sql} ORDER BY g.received_date DESC, g.grn_number DESC");
        if let Some(request) = page {
            sql.push_str(" LIMIT ? OFFSET ?");
            bind_values.push(Value::Integer(i64::from(request.page_size)));
            bind_values.push(Value::Integer(request.offset()));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut grns = Vec::new();
        while let Some(row) = rows.next()? {
            grns.push(parse_grn_row(row)?);
        }
        for grn in &mut grns {
            grn.items = load_items(self.conn, grn.id)?;
        }

        Ok(match page {
            Some(request) => Page::new(grns, request, total.max(0) as u64),
            None => Page::single(grns),
        })
    }

    fn set_status(&self, id: GrnId, status: GrnStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE grns
             SET
                status = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), status.as_str()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "grn", id });
        }
        Ok(())
    }

    fn delete_grn(&mut self, id: GrnId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let id_text = id.to_string();
        let payments: i64 = tx.query_row(
            "SELECT COUNT(*) FROM payments WHERE grn_id = ?1;",
            [id_text.as_str()],
            |row| row.get(0),
        )?;
        if payments > 0 {
            return Err(RepoError::Conflict(format!(
                "grn {id} has {payments} payment(s); delete them first"
            )));
        }
        let changed = tx.execute("DELETE FROM grns WHERE id = ?1;", [id_text.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "grn", id });
        }
        tx.commit()?;
        Ok(())
    }

    fn supplier_exists(&self, shop_id: ShopId, supplier_id: SupplierId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM suppliers WHERE id = ?1 AND shop_id = ?2
            );",
            params![supplier_id.to_string(), shop_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn missing_categories(
        &self,
        shop_id: ShopId,
        ids: &[CategoryId],
    ) -> RepoResult<Vec<CategoryId>> {
        let mut stmt = self.conn.prepare(
            "SELECT EXISTS(
                SELECT 1 FROM categories WHERE id = ?1 AND shop_id = ?2
            );",
        )?;
        let shop_text = shop_id.to_string();
        let mut missing = Vec::new();
        for id in ids {
            let exists: i64 =
                stmt.query_row(params![id.to_string(), shop_text.as_str()], |row| row.get(0))?;
            if exists == 0 && !missing.contains(id) {
                missing.push(*id);
            }
        }
        Ok(missing)
    }
}

fn insert_items(tx: &Transaction<'_>, grn: &GoodsReceivedNote) -> RepoResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO grn_items (
            id,
            grn_id,
            position,
            product_name,
            category_id,
            ordered_qty,
            received_qty,
            accepted_qty,
            rejected_qty,
            unit_cost_cents,
            selling_price_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
    )?;
    let grn_id = grn.id.to_string();
    for (position, item) in grn.items.iter().enumerate() {
        stmt.execute(params![
            item.id.to_string(),
            grn_id.as_str(),
            position as i64,
            item.product_name.as_str(),
            item.category_id.map(|id| id.to_string()),
            item.ordered_qty,
            item.received_qty,
            item.accepted_qty,
            item.rejected_qty,
            item.unit_cost_cents,
            item.selling_price_cents,
        ])?;
    }
    Ok(())
}

fn load_items(conn: &Connection, grn_id: GrnId) -> RepoResult<Vec<GrnItem>> {
    let mut stmt = conn.prepare(
        "SELECT
            id,
            product_name,
            category_id,
            ordered_qty,
            received_qty,
            accepted_qty,
            rejected_qty,
            unit_cost_cents,
            selling_price_cents
         FROM grn_items
         WHERE grn_id = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([grn_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        let id_text: String = row.get("id")?;
        let mut item = GrnItem {
            id: parse_uuid("grn_items.id", &id_text)?,
            product_name: row.get("product_name")?,
            category_id: parse_optional_uuid("grn_items.category_id", row.get("category_id")?)?,
            ordered_qty: row.get("ordered_qty")?,
            received_qty: row.get("received_qty")?,
            accepted_qty: row.get("accepted_qty")?,
            rejected_qty: row.get("rejected_qty")?,
            unit_cost_cents: row.get("unit_cost_cents")?,
            selling_price_cents: row.get("selling_price_cents")?,
            line_total_cents: 0,
        };
        item.validate(items.len() + 1).map_err(|err| {
            RepoError::InvalidData(format!("{err} in grn_items row {id_text}"))
        })?;
        item.line_total_cents = item.compute_line_total().map_err(|err| {
            RepoError::InvalidData(format!("{err} in grn_items row {id_text}"))
        })?;
        items.push(item);
    }
    Ok(items)
}

fn parse_grn_row(row: &Row<'_>) -> RepoResult<GoodsReceivedNote> {
    let id_text: String = row.get("id")?;
    let shop_text: String = row.get("shop_id")?;
    let supplier_text: String = row.get("supplier_id")?;
    let status_text: String = row.get("status")?;
    let status = GrnStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid grn status `{status_text}` in grns.status"))
    })?;
    let total_cents: i64 = row.get("total_cents")?;
    let paid_cents: i64 = row.get("paid_cents")?;

    Ok(GoodsReceivedNote {
        id: parse_uuid("grns.id", &id_text)?,
        shop_id: parse_uuid("grns.shop_id", &shop_text)?,
        grn_number: row.get("grn_number")?,
        supplier_id: parse_uuid("grns.supplier_id", &supplier_text)?,
        received_date: row.get("received_date")?,
        status,
        invoice_number: row.get("invoice_number")?,
        notes: row.get("notes")?,
        attachment_url: row.get("attachment_url")?,
        items: Vec::new(),
        total_cents,
        paid_cents,
        payment_status: PaymentStatus::derive(total_cents, paid_cents),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
