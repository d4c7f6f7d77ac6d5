//! Supplier payment endpoints under `/shops/{shop_id}/payments`.

use super::{parse_date_bound, Deleted};
use crate::auth::{Claims, Role};
use crate::error::{created, ok, ApiResult};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::{Extension, Json};
use grn_core::model::grn::GrnId;
use grn_core::model::payment::{PaymentId, PaymentInput};
use grn_core::model::shop::ShopId;
use grn_core::model::supplier::SupplierId;
use grn_core::repo::payment_repo::{PaymentListQuery, SqlitePaymentRepository};
use grn_core::repo::PageRequest;
use grn_core::service::payment_service::PaymentService;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PaymentListParams {
    pub supplier_id: Option<SupplierId>,
    pub grn_id: Option<GrnId>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

pub async fn list_payments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<ShopId>, PathRejection>,
    params: Result<Query<PaymentListParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Path(shop_id) = path?;
    claims.authorize(shop_id, Role::Staff)?;
    let Query(params) = params?;
    let query = PaymentListQuery {
        shop_id,
        supplier_id: params.supplier_id,
        grn_id: params.grn_id,
        paid_from: parse_date_bound("from", params.from.as_deref(), false)?,
        paid_to: parse_date_bound("to", params.to.as_deref(), true)?,
        page: PageRequest::normalized(params.page, params.page_size),
    };
    let page = state.with_conn(|conn| {
        let service = PaymentService::new(SqlitePaymentRepository::try_new(conn)?);
        Ok(service.list_payments(&query)?)
    })?;
    Ok(ok(page))
}

pub async fn create_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<ShopId>, PathRejection>,
    payload: Result<Json<PaymentInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(shop_id) = path?;
    claims.authorize(shop_id, Role::Manager)?;
    let Json(input) = payload?;
    let payment = state.with_conn(|conn| {
        let mut service = PaymentService::new(SqlitePaymentRepository::try_new(conn)?);
        Ok(service.record_payment(shop_id, input)?)
    })?;
    Ok(created(payment))
}

pub async fn get_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<(ShopId, PaymentId)>, PathRejection>,
) -> ApiResult<Response> {
    let Path((shop_id, payment_id)) = path?;
    claims.authorize(shop_id, Role::Staff)?;
    let payment = state.with_conn(|conn| {
        let service = PaymentService::new(SqlitePaymentRepository::try_new(conn)?);
        Ok(service.get_payment(shop_id, payment_id)?)
    })?;
    Ok(ok(payment))
}

pub async fn delete_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<(ShopId, PaymentId)>, PathRejection>,
) -> ApiResult<Response> {
    let Path((shop_id, payment_id)) = path?;
    claims.authorize(shop_id, Role::Admin)?;
    state.with_conn(|conn| {
        let mut service = PaymentService::new(SqlitePaymentRepository::try_new(conn)?);
        Ok(service.delete_payment(shop_id, payment_id)?)
    })?;
    Ok(ok(Deleted::new(payment_id)))
}
