//! GRN endpoints under `/grns`.
//!
//! GRNs are addressed by id alone; access is checked against the shop that
//! owns the loaded record, inside the same connection lock as the action.

use super::{parse_choice, parse_date_bound, Deleted};
use crate::auth::{Claims, Role};
use crate::error::{created, ok, ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::{Extension, Json};
use grn_core::model::grn::{GrnId, GrnInput, GrnStatus, PaymentStatus};
use grn_core::model::shop::ShopId;
use grn_core::model::supplier::SupplierId;
use grn_core::repo::grn_repo::{GrnFilter, SqliteGrnRepository};
use grn_core::repo::supplier_repo::SqliteSupplierRepository;
use grn_core::repo::PageRequest;
use grn_core::service::grn_service::GrnService;
use grn_core::service::supplier_service::SupplierService;
use grn_core::share::{grn_share_message, whatsapp_link};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct GrnListParams {
    pub shop_id: Option<ShopId>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub supplier_id: Option<SupplierId>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl GrnListParams {
    fn filter(&self, shop_id: ShopId) -> ApiResult<GrnFilter> {
        Ok(GrnFilter {
            shop_id,
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            status: parse_choice("status", self.status.as_deref(), GrnStatus::parse)?,
            payment_status: parse_choice(
                "payment_status",
                self.payment_status.as_deref(),
                PaymentStatus::parse,
            )?,
            supplier_id: self.supplier_id,
            received_from: parse_date_bound("from", self.from.as_deref(), false)?,
            received_to: parse_date_bound("to", self.to.as_deref(), true)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ShopParams {
    pub shop_id: Option<ShopId>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: GrnStatus,
}

#[derive(Debug, Deserialize)]
pub struct ShareParams {
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub grn_id: GrnId,
    pub grn_number: String,
    pub phone: String,
    pub message: String,
    pub whatsapp_url: String,
}

pub async fn list_grns(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    params: Result<Query<GrnListParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let shop_id = claims.resolve_shop(params.shop_id)?;
    claims.authorize(shop_id, Role::Staff)?;
    let filter = params.filter(shop_id)?;
    let page = PageRequest::normalized(params.page, params.page_size);
    let grns = state.with_conn(|conn| {
        let service = GrnService::new(SqliteGrnRepository::try_new(conn)?);
        Ok(service.list_grns(&filter, page)?)
    })?;
    Ok(ok(grns))
}

/// Totals and acceptance figures over every GRN matching the list filters.
pub async fn grn_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    params: Result<Query<GrnListParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let shop_id = claims.resolve_shop(params.shop_id)?;
    claims.authorize(shop_id, Role::Staff)?;
    let filter = params.filter(shop_id)?;
    let summary = state.with_conn(|conn| {
        let service = GrnService::new(SqliteGrnRepository::try_new(conn)?);
        Ok(service.summarize(&filter)?)
    })?;
    Ok(ok(summary))
}

pub async fn create_grn(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    params: Result<Query<ShopParams>, QueryRejection>,
    payload: Result<Json<GrnInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Query(params) = params?;
    let shop_id = claims.resolve_shop(params.shop_id)?;
    claims.authorize(shop_id, Role::Manager)?;
    let Json(input) = payload?;
    let grn = state.with_conn(|conn| {
        let mut service = GrnService::new(SqliteGrnRepository::try_new(conn)?);
        Ok(service.create_grn(shop_id, input)?)
    })?;
    Ok(created(grn))
}

pub async fn get_grn(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<GrnId>, PathRejection>,
) -> ApiResult<Response> {
    let Path(grn_id) = path?;
    let grn = state.with_conn(|conn| {
        let service = GrnService::new(SqliteGrnRepository::try_new(conn)?);
        let grn = service.locate_grn(grn_id)?;
        claims.authorize(grn.shop_id, Role::Staff)?;
        Ok(grn)
    })?;
    Ok(ok(grn))
}

pub async fn update_grn(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<GrnId>, PathRejection>,
    payload: Result<Json<GrnInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(grn_id) = path?;
    let Json(input) = payload?;
    let grn = state.with_conn(|conn| {
        let mut service = GrnService::new(SqliteGrnRepository::try_new(conn)?);
        let shop_id = service.locate_grn(grn_id)?.shop_id;
        claims.authorize(shop_id, Role::Manager)?;
        Ok(service.update_grn(shop_id, grn_id, input)?)
    })?;
    Ok(ok(grn))
}

pub async fn set_grn_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<GrnId>, PathRejection>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(grn_id) = path?;
    let Json(request) = payload?;
    let grn = state.with_conn(|conn| {
        let service = GrnService::new(SqliteGrnRepository::try_new(conn)?);
        let shop_id = service.locate_grn(grn_id)?.shop_id;
        claims.authorize(shop_id, Role::Manager)?;
        Ok(service.set_status(shop_id, grn_id, request.status)?)
    })?;
    Ok(ok(grn))
}

pub async fn delete_grn(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<GrnId>, PathRejection>,
) -> ApiResult<Response> {
    let Path(grn_id) = path?;
    state.with_conn(|conn| {
        let mut service = GrnService::new(SqliteGrnRepository::try_new(conn)?);
        let shop_id = service.locate_grn(grn_id)?.shop_id;
        claims.authorize(shop_id, Role::Admin)?;
        Ok(service.delete_grn(shop_id, grn_id)?)
    })?;
    Ok(ok(Deleted::new(grn_id)))
}

/// WhatsApp link with a plain-text summary of the GRN.
///
/// Without `phone` the supplier's stored phone number is used.
pub async fn share_grn(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<GrnId>, PathRejection>,
    params: Result<Query<ShareParams>, QueryRejection>,
) -> ApiResult<Response> {
    let Path(grn_id) = path?;
    let Query(params) = params?;
    let country_code = state.share.default_country_code.clone();
    let response = state.with_conn(|conn| {
        let grn = GrnService::new(SqliteGrnRepository::try_new(conn)?).locate_grn(grn_id)?;
        claims.authorize(grn.shop_id, Role::Staff)?;
        let supplier = SupplierService::new(SqliteSupplierRepository::try_new(conn)?)
            .get_supplier(grn.shop_id, grn.supplier_id)?;

        let phone = params
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .or(supplier.phone.as_deref())
            .ok_or_else(|| {
                ApiError::Validation(
                    "phone is required because the supplier has no phone number".to_string(),
                )
            })?
            .to_string();

        let message = grn_share_message(&grn, &supplier.name);
        let whatsapp_url = whatsapp_link(&phone, &message, country_code.as_deref())
            .map_err(|err| ApiError::Validation(err.to_string()))?;
        Ok(ShareResponse {
            grn_id: grn.id,
            grn_number: grn.grn_number,
            phone,
            message,
            whatsapp_url,
        })
    })?;
    Ok(ok(response))
}
