//! Supplier payment repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Inserting or deleting a GRN-linked payment updates `grns.paid_cents`
//!   in the same transaction.
//! - A linked GRN belongs to the payment's shop and supplier.
//! - `grns.paid_cents` never exceeds `grns.total_cents`.

use super::{
    ensure_connection_ready, parse_optional_uuid, parse_uuid, Page, PageRequest, RepoError,
    RepoResult,
};
use crate::model::grn::{GrnId, GrnStatus};
use crate::model::payment::{Payment, PaymentId, PaymentMethod};
use crate::model::shop::ShopId;
use crate::model::supplier::SupplierId;
use crate::model::ValidationError;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const PAYMENT_SELECT_SQL: &str = "SELECT
    id,
    shop_id,
    supplier_id,
    grn_id,
    amount_cents,
    method,
    reference,
    notes,
    paid_at,
    created_at
FROM payments";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentListQuery {
    pub shop_id: ShopId,
    pub supplier_id: Option<SupplierId>,
    pub grn_id: Option<GrnId>,
    /// Inclusive lower bound on `paid_at` (epoch ms).
    pub paid_from: Option<i64>,
    /// Inclusive upper bound on `paid_at` (epoch ms).
    pub paid_to: Option<i64>,
    pub page: PageRequest,
}

impl PaymentListQuery {
    pub fn for_shop(shop_id: ShopId) -> Self {
        Self {
            shop_id,
            supplier_id: None,
            grn_id: None,
            paid_from: None,
            paid_to: None,
            page: PageRequest::default(),
        }
    }
}

/// Purchase and payment sums for one supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplierLedger {
    /// Sum of non-cancelled GRN totals.
    pub purchased_cents: i64,
    /// Sum of all payments, linked or not.
    pub paid_cents: i64,
    pub grn_count: i64,
    pub payment_count: i64,
}

pub trait PaymentRepository {
    fn create_payment(&mut self, payment: &Payment) -> RepoResult<PaymentId>;
    fn get_payment(&self, shop_id: ShopId, id: PaymentId) -> RepoResult<Option<Payment>>;
    /// Lists payments newest first.
    fn list_payments(&self, query: &PaymentListQuery) -> RepoResult<Page<Payment>>;
    /// Deletes a payment and reverts its effect on the linked GRN.
    fn delete_payment(&mut self, shop_id: ShopId, id: PaymentId) -> RepoResult<()>;
    fn supplier_ledger(&self, shop_id: ShopId, supplier_id: SupplierId)
        -> RepoResult<SupplierLedger>;
}

pub struct SqlitePaymentRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqlitePaymentRepository<'conn> {
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PaymentRepository for SqlitePaymentRepository<'_> {
    fn create_payment(&mut self, payment: &Payment) -> RepoResult<PaymentId> {
        payment.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let shop_text = payment.shop_id.to_string();
        let supplier_text = payment.supplier_id.to_string();

        let supplier_known: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM suppliers WHERE id = ?1 AND shop_id = ?2);",
            params![supplier_text.as_str(), shop_text.as_str()],
            |row| row.get(0),
        )?;
        if supplier_known == 0 {
            return Err(RepoError::NotFound {
                entity: "supplier",
                id: payment.supplier_id,
            });
        }

        if let Some(grn_id) = payment.grn_id {
            check_linked_grn(&tx, payment, grn_id)?;
            tx.execute(
                "UPDATE grns
                 SET
                    paid_cents = paid_cents + ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![grn_id.to_string(), payment.amount_cents],
            )?;
        }

        tx.execute(
            "INSERT INTO payments (
                id,
                shop_id,
                supplier_id,
                grn_id,
                amount_cents,
                method,
                reference,
                notes,
                paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                payment.id.to_string(),
                shop_text.as_str(),
                supplier_text.as_str(),
                payment.grn_id.map(|id| id.to_string()),
                payment.amount_cents,
                payment.method.as_str(),
                payment.reference.as_deref(),
                payment.notes.as_deref(),
                payment.paid_at,
            ],
        )?;
        tx.commit()?;
        Ok(payment.id)
    }

    fn get_payment(&self, shop_id: ShopId, id: PaymentId) -> RepoResult<Option<Payment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PAYMENT_SELECT_SQL} WHERE id = ?1 AND shop_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), shop_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_payment_row(row)?));
        }
        Ok(None)
    }

    fn list_payments(&self, query: &PaymentListQuery) -> RepoResult<Page<Payment>> {
        let mut where_sql = String::from(" WHERE shop_id = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(query.shop_id.to_string())];

        if let Some(supplier_id) = query.supplier_id {
            where_sql.push_str(" AND supplier_id = ?");
            bind_values.push(Value::Text(supplier_id.to_string()));
        }
        if let Some(grn_id) = query.grn_id {
            where_sql.push_str(" AND grn_id = ?");
            bind_values.push(Value::Text(grn_id.to_string()));
        }
        if let Some(from) = query.paid_from {
            where_sql.push_str(" AND paid_at >= ?");
            bind_values.push(Value::Integer(from));
        }
        if let Some(to) = query.paid_to {
            where_sql.push_str(" AND paid_at <= ?");
            bind_values.push(Value::Integer(to));
        }

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM payments{where_sql};"),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "{PAYMENT_SELECT_SQL}{where_sql} ORDER BY paid_at DESC, created_at DESC, id ASC LIMIT ? OFFSET ?;"
        );
        bind_values.push(Value::Integer(i64::from(query.page.page_size)));
        bind_values.push(Value::Integer(query.page.offset()));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut payments = Vec::new();
        while let Some(row) = rows.next()? {
            payments.push(parse_payment_row(row)?);
        }
        Ok(Page::new(payments, query.page, total.max(0) as u64))
    }

    fn delete_payment(&mut self, shop_id: ShopId, id: PaymentId) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let stored: Option<(Option<String>, i64)> = {
            let mut stmt = tx.prepare(
                "SELECT grn_id, amount_cents FROM payments WHERE id = ?1 AND shop_id = ?2;",
            )?;
            let mut rows = stmt.query(params![id.to_string(), shop_id.to_string()])?;
            match rows.next()? {
                Some(row) => Some((row.get(0)?, row.get(1)?)),
                None => None,
            }
        };
        let (grn_text, amount_cents) = stored.ok_or(RepoError::NotFound {
            entity: "payment",
            id,
        })?;

        if let Some(grn_id) = parse_optional_uuid("payments.grn_id", grn_text)? {
            tx.execute(
                "UPDATE grns
                 SET
                    paid_cents = MAX(paid_cents - ?2, 0),
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![grn_id.to_string(), amount_cents],
            )?;
        }
        tx.execute("DELETE FROM payments WHERE id = ?1;", [id.to_string()])?;
        tx.commit()?;
        Ok(())
    }

    fn supplier_ledger(
        &self,
        shop_id: ShopId,
        supplier_id: SupplierId,
    ) -> RepoResult<SupplierLedger> {
        let ledger = self.conn.query_row(
            "SELECT
                (SELECT COALESCE(SUM(total_cents), 0) FROM grns
                  WHERE shop_id = ?1 AND supplier_id = ?2 AND status <> ?3),
                (SELECT COALESCE(SUM(amount_cents), 0) FROM payments
                  WHERE shop_id = ?1 AND supplier_id = ?2),
                (SELECT COUNT(*) FROM grns
                  WHERE shop_id = ?1 AND supplier_id = ?2 AND status <> ?3),
                (SELECT COUNT(*) FROM payments
                  WHERE shop_id = ?1 AND supplier_id = ?2);",
            params![
                shop_id.to_string(),
                supplier_id.to_string(),
                GrnStatus::Cancelled.as_str()
            ],
            |row| {
                Ok(SupplierLedger {
                    purchased_cents: row.get(0)?,
                    paid_cents: row.get(1)?,
                    grn_count: row.get(2)?,
                    payment_count: row.get(3)?,
                })
            },
        )?;
        Ok(ledger)
    }
}

fn check_linked_grn(tx: &Transaction<'_>, payment: &Payment, grn_id: GrnId) -> RepoResult<()> {
    let stored: Option<(String, String, String, i64, i64)> = {
        let mut stmt = tx.prepare(
            "SELECT shop_id, supplier_id, status, total_cents, paid_cents
             FROM grns
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([grn_id.to_string()])?;
        match rows.next()? {
            Some(row) => Some((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            None => None,
        }
    };
    let (shop_text, supplier_text, status_text, total_cents, paid_cents) =
        stored.ok_or(RepoError::NotFound {
            entity: "grn",
            id: grn_id,
        })?;

    if parse_uuid("grns.shop_id", &shop_text)? != payment.shop_id {
        return Err(RepoError::NotFound {
            entity: "grn",
            id: grn_id,
        });
    }
    if parse_uuid("grns.supplier_id", &supplier_text)? != payment.supplier_id {
        return Err(ValidationError::InvalidFormat {
            field: "grn_id",
            reason: "grn belongs to a different supplier".to_string(),
        }
        .into());
    }
    if status_text == GrnStatus::Cancelled.as_str() {
        return Err(RepoError::Conflict(format!(
            "grn {grn_id} is cancelled and cannot receive payments"
        )));
    }
    let outstanding = total_cents.saturating_sub(paid_cents).max(0);
    if payment.amount_cents > outstanding {
        return Err(RepoError::Conflict(format!(
            "payment of {} exceeds the outstanding amount {} of grn {grn_id}",
            payment.amount_cents, outstanding
        )));
    }
    Ok(())
}

fn parse_payment_row(row: &Row<'_>) -> RepoResult<Payment> {
    let id_text: String = row.get("id")?;
    let shop_text: String = row.get("shop_id")?;
    let supplier_text: String = row.get("supplier_id")?;
    let method_text: String = row.get("method")?;
    let method = PaymentMethod::parse(&method_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid payment method `{method_text}` in payments.method"
        ))
    })?;

    let payment = Payment {
        id: parse_uuid("payments.id", &id_text)?,
        shop_id: parse_uuid("payments.shop_id", &shop_text)?,
        supplier_id: parse_uuid("payments.supplier_id", &supplier_text)?,
        grn_id: parse_optional_uuid("payments.grn_id", row.get("grn_id")?)?,
        amount_cents: row.get("amount_cents")?,
        method,
        reference: row.get("reference")?,
        notes: row.get("notes")?,
        paid_at: row.get("paid_at")?,
        created_at: row.get("created_at")?,
    };
    payment
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("{err} in payments row {id_text}")))?;
    Ok(payment)
}
