//! Supplier endpoints under `/shops/{shop_id}/suppliers`.

use super::Deleted;
use crate::auth::{Claims, Role};
use crate::error::{created, ok, ApiResult};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::{Extension, Json};
use grn_core::model::shop::ShopId;
use grn_core::model::supplier::{SupplierId, SupplierInput};
use grn_core::repo::payment_repo::SqlitePaymentRepository;
use grn_core::repo::supplier_repo::{SqliteSupplierRepository, SupplierListQuery};
use grn_core::repo::PageRequest;
use grn_core::service::payment_service::PaymentService;
use grn_core::service::supplier_service::SupplierService;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SupplierListParams {
    pub search: Option<String>,
    pub active: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub async fn list_suppliers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<ShopId>, PathRejection>,
    params: Result<Query<SupplierListParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Path(shop_id) = path?;
    claims.authorize(shop_id, Role::Staff)?;
    let Query(params) = params?;
    let query = SupplierListQuery {
        shop_id,
        search: params.search,
        active: params.active,
        page: PageRequest::normalized(params.page, params.page_size),
    };
    let page = state.with_conn(|conn| {
        let service = SupplierService::new(SqliteSupplierRepository::try_new(conn)?);
        Ok(service.list_suppliers(&query)?)
    })?;
    Ok(ok(page))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<ShopId>, PathRejection>,
    payload: Result<Json<SupplierInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(shop_id) = path?;
    claims.authorize(shop_id, Role::Manager)?;
    let Json(input) = payload?;
    let supplier = state.with_conn(|conn| {
        let service = SupplierService::new(SqliteSupplierRepository::try_new(conn)?);
        Ok(service.create_supplier(shop_id, input)?)
    })?;
    Ok(created(supplier))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<(ShopId, SupplierId)>, PathRejection>,
) -> ApiResult<Response> {
    let Path((shop_id, supplier_id)) = path?;
    claims.authorize(shop_id, Role::Staff)?;
    let supplier = state.with_conn(|conn| {
        let service = SupplierService::new(SqliteSupplierRepository::try_new(conn)?);
        Ok(service.get_supplier(shop_id, supplier_id)?)
    })?;
    Ok(ok(supplier))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<(ShopId, SupplierId)>, PathRejection>,
    payload: Result<Json<SupplierInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Path((shop_id, supplier_id)) = path?;
    claims.authorize(shop_id, Role::Manager)?;
    let Json(input) = payload?;
    let supplier = state.with_conn(|conn| {
        let service = SupplierService::new(SqliteSupplierRepository::try_new(conn)?);
        Ok(service.update_supplier(shop_id, supplier_id, input)?)
    })?;
    Ok(ok(supplier))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<(ShopId, SupplierId)>, PathRejection>,
) -> ApiResult<Response> {
    let Path((shop_id, supplier_id)) = path?;
    claims.authorize(shop_id, Role::Admin)?;
    state.with_conn(|conn| {
        let service = SupplierService::new(SqliteSupplierRepository::try_new(conn)?);
        Ok(service.delete_supplier(shop_id, supplier_id)?)
    })?;
    Ok(ok(Deleted::new(supplier_id)))
}

/// Purchases, payments and outstanding amount for one supplier.
pub async fn supplier_balance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<(ShopId, SupplierId)>, PathRejection>,
) -> ApiResult<Response> {
    let Path((shop_id, supplier_id)) = path?;
    claims.authorize(shop_id, Role::Staff)?;
    let balance = state.with_conn(|conn| {
        SupplierService::new(SqliteSupplierRepository::try_new(conn)?)
            .get_supplier(shop_id, supplier_id)?;
        let service = PaymentService::new(SqlitePaymentRepository::try_new(conn)?);
        Ok(service.supplier_balance(shop_id, supplier_id)?)
    })?;
    Ok(ok(balance))
}
