use grn_core::db::open_db_in_memory;
use grn_core::model::category::CategoryInput;
use grn_core::model::grn::{GrnInput, GrnItemInput};
use grn_core::model::shop::ShopId;
use grn_core::model::supplier::SupplierInput;
use grn_core::repo::category_repo::SqliteCategoryRepository;
use grn_core::repo::grn_repo::SqliteGrnRepository;
use grn_core::repo::shop_repo::SqliteShopRepository;
use grn_core::repo::supplier_repo::{SqliteSupplierRepository, SupplierListQuery};
use grn_core::repo::PageRequest;
use grn_core::service::category_service::CategoryService;
use grn_core::service::grn_service::GrnService;
use grn_core::service::shop_service::ShopService;
use grn_core::service::supplier_service::SupplierService;
use grn_core::{ServiceError, ValidationError};
use rusqlite::Connection;
use uuid::Uuid;

fn seed_shop(conn: &mut Connection, name: &str) -> ShopId {
    let mut service = ShopService::new(SqliteShopRepository::try_new(conn).unwrap());
    service.create_shop(name).unwrap().id
}

fn supplier_input(name: &str) -> SupplierInput {
    SupplierInput {
        name: name.to_string(),
        phone: Some("+94 77 123-4567".to_string()),
        email: Some("Sales@Example.COM".to_string()),
        ..SupplierInput::default()
    }
}

#[test]
fn supplier_create_normalizes_fields() {
    let mut conn = open_db_in_memory().unwrap();
    let shop_id = seed_shop(&mut conn, "Shop");
    let service = SupplierService::new(SqliteSupplierRepository::try_new(&conn).unwrap());

    let created = service
        .create_supplier(
            shop_id,
            SupplierInput {
                contact_person: Some("   ".to_string()),
                ..supplier_input("  Tech Distributors ")
            },
        )
        .unwrap();
    assert_eq!(created.name, "Tech Distributors");
    assert_eq!(created.email.as_deref(), Some("sales@example.com"));
    assert_eq!(created.contact_person, None);
    assert!(created.is_active);
    assert!(created.created_at > 0);
}

#[test]
fn supplier_names_are_unique_per_shop_ignoring_case() {
    let mut conn = open_db_in_memory().unwrap();
    let shop_a = seed_shop(&mut conn, "A");
    let shop_b = seed_shop(&mut conn, "B");
    let service = SupplierService::new(SqliteSupplierRepository::try_new(&conn).unwrap());

    service.create_supplier(shop_a, supplier_input("Acme")).unwrap();
    assert!(matches!(
        service.create_supplier(shop_a, supplier_input("ACME")),
        Err(ServiceError::Conflict(_))
    ));
    service.create_supplier(shop_b, supplier_input("Acme")).unwrap();
}

#[test]
fn name_uniqueness_folds_non_ascii_case() {
    let mut conn = open_db_in_memory().unwrap();
    let shop_id = seed_shop(&mut conn, "Shop");
    let suppliers = SupplierService::new(SqliteSupplierRepository::try_new(&conn).unwrap());

    suppliers
        .create_supplier(shop_id, supplier_input("Éclair Computers"))
        .unwrap();
    assert!(matches!(
        suppliers.create_supplier(shop_id, supplier_input("éclair computers")),
        Err(ServiceError::Conflict(_))
    ));

    let other = suppliers
        .create_supplier(shop_id, supplier_input("Ömer Traders"))
        .unwrap();
    assert!(matches!(
        suppliers.update_supplier(shop_id, other.id, supplier_input("ÉCLAIR COMPUTERS")),
        Err(ServiceError::Conflict(_))
    ));

    let categories = CategoryService::new(SqliteCategoryRepository::try_new(&conn).unwrap());
    categories
        .create_category(
            shop_id,
            CategoryInput {
                name: "Écrans".to_string(),
                description: None,
            },
        )
        .unwrap();
    assert!(matches!(
        categories.create_category(
            shop_id,
            CategoryInput {
                name: "écrans".to_string(),
                description: None,
            }
        ),
        Err(ServiceError::Conflict(_))
    ));
}

#[test]
fn supplier_invalid_contact_data_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let shop_id = seed_shop(&mut conn, "Shop");
    let service = SupplierService::new(SqliteSupplierRepository::try_new(&conn).unwrap());

    let bad_phone = SupplierInput {
        phone: Some("12-34".to_string()),
        ..supplier_input("Acme")
    };
    assert!(matches!(
        service.create_supplier(shop_id, bad_phone),
        Err(ServiceError::Validation(ValidationError::InvalidFormat { field: "phone", .. }))
    ));

    let bad_email = SupplierInput {
        email: Some("not-an-email".to_string()),
        ..supplier_input("Acme")
    };
    assert!(matches!(
        service.create_supplier(shop_id, bad_email),
        Err(ServiceError::Validation(ValidationError::InvalidFormat { field: "email", .. }))
    ));
}

#[test]
fn supplier_list_searches_filters_and_paginates() {
    let mut conn = open_db_in_memory().unwrap();
    let shop_id = seed_shop(&mut conn, "Shop");
    let service = SupplierService::new(SqliteSupplierRepository::try_new(&conn).unwrap());

    for name in ["Alpha Tech", "Beta Parts", "Gamma Tech", "Delta 50%"] {
        service.create_supplier(shop_id, supplier_input(name)).unwrap();
    }
    let beta = service
        .list_suppliers(&SupplierListQuery {
            search: Some("beta".to_string()),
            ..SupplierListQuery::for_shop(shop_id)
        })
        .unwrap();
    assert_eq!(beta.total, 1);

    let gamma_id = service
        .list_suppliers(&SupplierListQuery {
            search: Some("gamma".to_string()),
            ..SupplierListQuery::for_shop(shop_id)
        })
        .unwrap()
        .items[0]
        .id;
    service
        .update_supplier(
            shop_id,
            gamma_id,
            SupplierInput {
                is_active: Some(false),
                ..supplier_input("Gamma Tech")
            },
        )
        .unwrap();

    let active_tech = service
        .list_suppliers(&SupplierListQuery {
            search: Some("tech".to_string()),
            active: Some(true),
            ..SupplierListQuery::for_shop(shop_id)
        })
        .unwrap();
    assert_eq!(active_tech.total, 1);
    assert_eq!(active_tech.items[0].name, "Alpha Tech");

    let percent = service
        .list_suppliers(&SupplierListQuery {
            search: Some("50%".to_string()),
            ..SupplierListQuery::for_shop(shop_id)
        })
        .unwrap();
    assert_eq!(percent.total, 1);

    let second_page = service
        .list_suppliers(&SupplierListQuery {
            page: PageRequest::normalized(Some(2), Some(3)),
            ..SupplierListQuery::for_shop(shop_id)
        })
        .unwrap();
    assert_eq!(second_page.total, 4);
    assert_eq!(second_page.total_pages, 2);
    assert_eq!(second_page.items.len(), 1);
    assert_eq!(second_page.items[0].name, "Gamma Tech");
}

#[test]
fn supplier_update_keeps_active_flag_when_omitted() {
    let mut conn = open_db_in_memory().unwrap();
    let shop_id = seed_shop(&mut conn, "Shop");
    let service = SupplierService::new(SqliteSupplierRepository::try_new(&conn).unwrap());

    let created = service
        .create_supplier(
            shop_id,
            SupplierInput {
                is_active: Some(false),
                ..supplier_input("Acme")
            },
        )
        .unwrap();
    let updated = service
        .update_supplier(shop_id, created.id, supplier_input("Acme Ltd"))
        .unwrap();
    assert_eq!(updated.name, "Acme Ltd");
    assert!(!updated.is_active);
}

#[test]
fn supplier_is_invisible_from_other_shops() {
    let mut conn = open_db_in_memory().unwrap();
    let shop_a = seed_shop(&mut conn, "A");
    let shop_b = seed_shop(&mut conn, "B");
    let service = SupplierService::new(SqliteSupplierRepository::try_new(&conn).unwrap());

    let created = service.create_supplier(shop_a, supplier_input("Acme")).unwrap();
    assert!(matches!(
        service.get_supplier(shop_b, created.id),
        Err(ServiceError::NotFound { entity: "supplier", .. })
    ));
    assert!(matches!(
        service.delete_supplier(shop_b, created.id),
        Err(ServiceError::NotFound { entity: "supplier", .. })
    ));
}

#[test]
fn supplier_with_grns_cannot_be_deleted() {
    let mut conn = open_db_in_memory().unwrap();
    let shop_id = seed_shop(&mut conn, "Shop");
    let (used_id, unused_id) = {
        let service = SupplierService::new(SqliteSupplierRepository::try_new(&conn).unwrap());
        (
            service.create_supplier(shop_id, supplier_input("Used")).unwrap().id,
            service.create_supplier(shop_id, supplier_input("Unused")).unwrap().id,
        )
    };
    {
        let mut grns = GrnService::new(SqliteGrnRepository::try_new(&mut conn).unwrap());
        grns.create_grn(
            shop_id,
            GrnInput {
                supplier_id: used_id,
                items: vec![GrnItemInput {
                    product_name: "Mouse".to_string(),
                    received_qty: 1,
                    unit_cost_cents: 1_000,
                    ..GrnItemInput::default()
                }],
                ..GrnInput::default()
            },
        )
        .unwrap();
    }

    let service = SupplierService::new(SqliteSupplierRepository::try_new(&conn).unwrap());
    assert!(matches!(
        service.delete_supplier(shop_id, used_id),
        Err(ServiceError::Conflict(_))
    ));
    service.delete_supplier(shop_id, unused_id).unwrap();
    assert!(matches!(
        service.get_supplier(shop_id, unused_id),
        Err(ServiceError::NotFound { .. })
    ));
}

#[test]
fn category_crud_and_delete_clears_item_links() {
    let mut conn = open_db_in_memory().unwrap();
    let shop_id = seed_shop(&mut conn, "Shop");
    let supplier_id = SupplierService::new(SqliteSupplierRepository::try_new(&conn).unwrap())
        .create_supplier(shop_id, supplier_input("Acme"))
        .unwrap()
        .id;

    let category_id = {
        let service = CategoryService::new(SqliteCategoryRepository::try_new(&conn).unwrap());
        let laptops = service
            .create_category(
                shop_id,
                CategoryInput {
                    name: "Laptops".to_string(),
                    description: Some("Portable".to_string()),
                },
            )
            .unwrap();
        service
            .create_category(
                shop_id,
                CategoryInput {
                    name: "Accessories".to_string(),
                    description: None,
                },
            )
            .unwrap();
        assert!(matches!(
            service.create_category(
                shop_id,
                CategoryInput {
                    name: "laptops".to_string(),
                    description: None,
                }
            ),
            Err(ServiceError::Conflict(_))
        ));

        let names: Vec<String> = service
            .list_categories(shop_id)
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect();
        assert_eq!(names, vec!["Accessories".to_string(), "Laptops".to_string()]);

        let renamed = service
            .update_category(
                shop_id,
                laptops.id,
                CategoryInput {
                    name: "Notebooks".to_string(),
                    description: None,
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "Notebooks");
        assert_eq!(renamed.description, None);
        laptops.id
    };

    let grn_id = {
        let mut grns = GrnService::new(SqliteGrnRepository::try_new(&mut conn).unwrap());
        grns.create_grn(
            shop_id,
            GrnInput {
                supplier_id,
                items: vec![GrnItemInput {
                    product_name: "ThinkPad".to_string(),
                    category_id: Some(category_id),
                    received_qty: 2,
                    unit_cost_cents: 100_000,
                    ..GrnItemInput::default()
                }],
                ..GrnInput::default()
            },
        )
        .unwrap()
        .id
    };

    CategoryService::new(SqliteCategoryRepository::try_new(&conn).unwrap())
        .delete_category(shop_id, category_id)
        .unwrap();

    let grns = GrnService::new(SqliteGrnRepository::try_new(&mut conn).unwrap());
    let grn = grns.get_grn(shop_id, grn_id).unwrap();
    assert_eq!(grn.items[0].category_id, None);
    assert_eq!(grn.total_cents, 200_000);

    assert!(matches!(
        CategoryService::new(SqliteCategoryRepository::try_new(&conn).unwrap())
            .get_category(shop_id, Uuid::new_v4()),
        Err(ServiceError::NotFound { entity: "category", .. })
    ));
}
