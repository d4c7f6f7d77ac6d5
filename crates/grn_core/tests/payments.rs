use grn_core::db::open_db_in_memory;
use grn_core::model::grn::{GrnId, GrnInput, GrnItemInput, GrnStatus, PaymentStatus};
use grn_core::model::payment::{PaymentInput, PaymentMethod};
use grn_core::model::shop::ShopId;
use grn_core::model::supplier::{SupplierId, SupplierInput};
use grn_core::repo::grn_repo::SqliteGrnRepository;
use grn_core::repo::payment_repo::{PaymentListQuery, SqlitePaymentRepository};
use grn_core::repo::shop_repo::SqliteShopRepository;
use grn_core::repo::supplier_repo::SqliteSupplierRepository;
use grn_core::service::grn_service::GrnService;
use grn_core::service::payment_service::PaymentService;
use grn_core::service::shop_service::ShopService;
use grn_core::service::supplier_service::SupplierService;
use grn_core::{ServiceError, ValidationError};
use rusqlite::Connection;
use uuid::Uuid;

struct Fixture {
    conn: Connection,
    shop_id: ShopId,
    supplier_id: SupplierId,
}

impl Fixture {
    fn new() -> Self {
        let mut conn = open_db_in_memory().unwrap();
        let shop_id = ShopService::new(SqliteShopRepository::try_new(&mut conn).unwrap())
            .create_shop("Shop")
            .unwrap()
            .id;
        let supplier_id = add_supplier(&conn, shop_id, "Tech Distributors");
        Self {
            conn,
            shop_id,
            supplier_id,
        }
    }

    fn grn(&mut self, supplier_id: SupplierId, total_cents: i64) -> GrnId {
        GrnService::new(SqliteGrnRepository::try_new(&mut self.conn).unwrap())
            .create_grn(
                self.shop_id,
                GrnInput {
                    supplier_id,
                    items: vec![GrnItemInput {
                        product_name: "RAM 16GB".to_string(),
                        received_qty: 1,
                        unit_cost_cents: total_cents,
                        ..GrnItemInput::default()
                    }],
                    ..GrnInput::default()
                },
            )
            .unwrap()
            .id
    }

    fn payments(&mut self) -> PaymentService<SqlitePaymentRepository<'_>> {
        PaymentService::new(SqlitePaymentRepository::try_new(&mut self.conn).unwrap())
    }

    fn grn_state(&mut self, grn_id: GrnId) -> (i64, PaymentStatus) {
        let grn = GrnService::new(SqliteGrnRepository::try_new(&mut self.conn).unwrap())
            .get_grn(self.shop_id, grn_id)
            .unwrap();
        (grn.paid_cents, grn.payment_status)
    }
}

fn add_supplier(conn: &Connection, shop_id: ShopId, name: &str) -> SupplierId {
    SupplierService::new(SqliteSupplierRepository::try_new(conn).unwrap())
        .create_supplier(
            shop_id,
            SupplierInput {
                name: name.to_string(),
                ..SupplierInput::default()
            },
        )
        .unwrap()
        .id
}

fn payment(supplier_id: SupplierId, grn_id: Option<GrnId>, amount_cents: i64) -> PaymentInput {
    PaymentInput {
        supplier_id,
        grn_id,
        amount_cents,
        method: PaymentMethod::Cheque,
        reference: Some("CHQ-001".to_string()),
        notes: None,
        paid_at: Some(1_704_067_200_000),
    }
}

#[test]
fn payments_move_grn_through_payment_statuses() {
    let mut fx = Fixture::new();
    let grn_id = fx.grn(fx.supplier_id, 10_000);
    let supplier_id = fx.supplier_id;
    let shop_id = fx.shop_id;

    let first = fx
        .payments()
        .record_payment(shop_id, payment(supplier_id, Some(grn_id), 4_000))
        .unwrap();
    assert_eq!(first.reference.as_deref(), Some("CHQ-001"));
    assert_eq!(fx.grn_state(grn_id), (4_000, PaymentStatus::Partial));

    fx.payments()
        .record_payment(shop_id, payment(supplier_id, Some(grn_id), 6_000))
        .unwrap();
    assert_eq!(fx.grn_state(grn_id), (10_000, PaymentStatus::Paid));

    fx.payments().delete_payment(shop_id, first.id).unwrap();
    assert_eq!(fx.grn_state(grn_id), (6_000, PaymentStatus::Partial));
    assert!(matches!(
        fx.payments().get_payment(shop_id, first.id),
        Err(ServiceError::NotFound { entity: "payment", .. })
    ));
}

#[test]
fn paid_grn_cannot_move_to_another_supplier() {
    let mut fx = Fixture::new();
    let shop_id = fx.shop_id;
    let supplier_id = fx.supplier_id;
    let other_id = add_supplier(&fx.conn, shop_id, "Laptop World");
    let grn_id = fx.grn(supplier_id, 10_000);
    let paid = fx
        .payments()
        .record_payment(shop_id, payment(supplier_id, Some(grn_id), 4_000))
        .unwrap();

    let reassign = |supplier_id: SupplierId| GrnInput {
        supplier_id,
        items: vec![GrnItemInput {
            product_name: "RAM 16GB".to_string(),
            received_qty: 1,
            unit_cost_cents: 10_000,
            ..GrnItemInput::default()
        }],
        ..GrnInput::default()
    };

    let err = GrnService::new(SqliteGrnRepository::try_new(&mut fx.conn).unwrap())
        .update_grn(shop_id, grn_id, reassign(other_id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let grn = GrnService::new(SqliteGrnRepository::try_new(&mut fx.conn).unwrap())
        .get_grn(shop_id, grn_id)
        .unwrap();
    assert_eq!(grn.supplier_id, supplier_id);
    let old_balance = fx.payments().supplier_balance(shop_id, supplier_id).unwrap();
    assert_eq!(old_balance.outstanding_cents, 6_000);
    let other_balance = fx.payments().supplier_balance(shop_id, other_id).unwrap();
    assert_eq!(other_balance.outstanding_cents, 0);

    fx.payments().delete_payment(shop_id, paid.id).unwrap();
    let moved = GrnService::new(SqliteGrnRepository::try_new(&mut fx.conn).unwrap())
        .update_grn(shop_id, grn_id, reassign(other_id))
        .unwrap();
    assert_eq!(moved.supplier_id, other_id);
}

#[test]
fn overpayment_is_rejected_without_side_effects() {
    let mut fx = Fixture::new();
    let grn_id = fx.grn(fx.supplier_id, 10_000);
    let (shop_id, supplier_id) = (fx.shop_id, fx.supplier_id);

    fx.payments()
        .record_payment(shop_id, payment(supplier_id, Some(grn_id), 9_000))
        .unwrap();
    assert!(matches!(
        fx.payments()
            .record_payment(shop_id, payment(supplier_id, Some(grn_id), 1_001)),
        Err(ServiceError::Conflict(_))
    ));
    assert_eq!(fx.grn_state(grn_id), (9_000, PaymentStatus::Partial));
    let listed = fx
        .payments()
        .list_payments(&PaymentListQuery::for_shop(shop_id))
        .unwrap();
    assert_eq!(listed.total, 1);
}

#[test]
fn payment_rules_for_linked_grns() {
    let mut fx = Fixture::new();
    let (shop_id, supplier_id) = (fx.shop_id, fx.supplier_id);
    let other_supplier = add_supplier(&fx.conn, shop_id, "Mega Imports");
    let grn_id = fx.grn(supplier_id, 5_000);

    assert!(matches!(
        fx.payments().record_payment(shop_id, payment(supplier_id, Some(grn_id), 0)),
        Err(ServiceError::Validation(ValidationError::NonPositiveAmount))
    ));
    assert!(matches!(
        fx.payments()
            .record_payment(shop_id, payment(other_supplier, Some(grn_id), 100)),
        Err(ServiceError::Validation(ValidationError::InvalidFormat {
            field: "grn_id",
            ..
        }))
    ));
    assert!(matches!(
        fx.payments()
            .record_payment(shop_id, payment(supplier_id, Some(Uuid::new_v4()), 100)),
        Err(ServiceError::NotFound { entity: "grn", .. })
    ));
    assert!(matches!(
        fx.payments()
            .record_payment(shop_id, payment(Uuid::new_v4(), None, 100)),
        Err(ServiceError::NotFound {
            entity: "supplier",
            ..
        })
    ));

    GrnService::new(SqliteGrnRepository::try_new(&mut fx.conn).unwrap())
        .set_status(shop_id, grn_id, GrnStatus::Cancelled)
        .unwrap();
    assert!(matches!(
        fx.payments()
            .record_payment(shop_id, payment(supplier_id, Some(grn_id), 100)),
        Err(ServiceError::Conflict(_))
    ));
}

#[test]
fn payments_are_scoped_to_their_shop() {
    let mut fx = Fixture::new();
    let (shop_id, supplier_id) = (fx.shop_id, fx.supplier_id);
    let other_shop = ShopService::new(SqliteShopRepository::try_new(&mut fx.conn).unwrap())
        .create_shop("Other")
        .unwrap()
        .id;
    let grn_id = fx.grn(supplier_id, 5_000);

    let recorded = fx
        .payments()
        .record_payment(shop_id, payment(supplier_id, None, 700))
        .unwrap();
    assert!(matches!(
        fx.payments().get_payment(other_shop, recorded.id),
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        fx.payments().delete_payment(other_shop, recorded.id),
        Err(ServiceError::NotFound { .. })
    ));
    assert!(matches!(
        fx.payments()
            .record_payment(other_shop, payment(supplier_id, Some(grn_id), 100)),
        Err(ServiceError::NotFound {
            entity: "supplier",
            ..
        })
    ));
}

#[test]
fn list_filters_and_supplier_balance() {
    let mut fx = Fixture::new();
    let (shop_id, supplier_id) = (fx.shop_id, fx.supplier_id);
    let other_supplier = add_supplier(&fx.conn, shop_id, "Mega Imports");
    let grn_a = fx.grn(supplier_id, 10_000);
    let grn_b = fx.grn(supplier_id, 4_000);
    let cancelled = fx.grn(supplier_id, 50_000);
    fx.grn(other_supplier, 7_000);
    GrnService::new(SqliteGrnRepository::try_new(&mut fx.conn).unwrap())
        .set_status(shop_id, cancelled, GrnStatus::Cancelled)
        .unwrap();

    {
        let mut payments = fx.payments();
        let mut input = payment(supplier_id, Some(grn_a), 3_000);
        input.paid_at = Some(1_000);
        payments.record_payment(shop_id, input).unwrap();

        let mut input = payment(supplier_id, Some(grn_b), 4_000);
        input.paid_at = Some(2_000);
        payments.record_payment(shop_id, input).unwrap();

        let mut advance = payment(supplier_id, None, 500);
        advance.paid_at = Some(3_000);
        payments.record_payment(shop_id, advance).unwrap();

        let mut other = payment(other_supplier, None, 1_000);
        other.paid_at = Some(4_000);
        payments.record_payment(shop_id, other).unwrap();
    }

    let payments = fx.payments();
    let for_supplier = payments
        .list_payments(&PaymentListQuery {
            supplier_id: Some(supplier_id),
            ..PaymentListQuery::for_shop(shop_id)
        })
        .unwrap();
    assert_eq!(for_supplier.total, 3);
    assert_eq!(for_supplier.items[0].paid_at, 3_000);

    let for_grn = payments
        .list_payments(&PaymentListQuery {
            grn_id: Some(grn_b),
            ..PaymentListQuery::for_shop(shop_id)
        })
        .unwrap();
    assert_eq!(for_grn.total, 1);
    assert_eq!(for_grn.items[0].amount_cents, 4_000);

    let window = payments
        .list_payments(&PaymentListQuery {
            paid_from: Some(2_000),
            paid_to: Some(3_000),
            ..PaymentListQuery::for_shop(shop_id)
        })
        .unwrap();
    assert_eq!(window.total, 2);

    let balance = payments.supplier_balance(shop_id, supplier_id).unwrap();
    assert_eq!(balance.purchased_cents, 14_000);
    assert_eq!(balance.paid_cents, 7_500);
    assert_eq!(balance.outstanding_cents, 6_500);
    assert_eq!(balance.grn_count, 2);
    assert_eq!(balance.payment_count, 3);
}
