//! Shop bootstrap and section visibility endpoints.

use crate::auth::{Claims, Role};
use crate::error::{created, ok, ApiResult};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Extension, Json};
use grn_core::model::shop::{SectionVisibility, ShopId};
use grn_core::repo::shop_repo::SqliteShopRepository;
use grn_core::service::shop_service::ShopService;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct CreateShopRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SectionsResponse {
    pub shop_id: ShopId,
    pub sections: SectionVisibility,
}

pub async fn list_shops(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Response> {
    let shops = state.with_conn(|conn| {
        let service = ShopService::new(SqliteShopRepository::try_new(conn)?);
        if claims.is_super_admin() {
            return Ok(service.list_shops()?);
        }
        match claims.shop_id {
            Some(shop_id) => Ok(vec![service.get_shop(shop_id)?]),
            None => Ok(Vec::new()),
        }
    })?;
    Ok(ok(shops))
}

pub async fn create_shop(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateShopRequest>, JsonRejection>,
) -> ApiResult<Response> {
    claims.require_role(Role::SuperAdmin)?;
    let Json(request) = payload?;
    let shop = state.with_conn(|conn| {
        let mut service = ShopService::new(SqliteShopRepository::try_new(conn)?);
        Ok(service.create_shop(&request.name)?)
    })?;
    Ok(created(shop))
}

pub async fn get_shop(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<ShopId>, PathRejection>,
) -> ApiResult<Response> {
    let Path(shop_id) = path?;
    claims.authorize(shop_id, Role::Staff)?;
    let shop = state.with_conn(|conn| {
        let service = ShopService::new(SqliteShopRepository::try_new(conn)?);
        Ok(service.get_shop(shop_id)?)
    })?;
    Ok(ok(shop))
}

pub async fn get_sections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<ShopId>, PathRejection>,
) -> ApiResult<Response> {
    let Path(shop_id) = path?;
    claims.authorize(shop_id, Role::Staff)?;
    let sections = state.with_conn(|conn| {
        let service = ShopService::new(SqliteShopRepository::try_new(conn)?);
        Ok(service.get_sections(shop_id)?)
    })?;
    Ok(ok(SectionsResponse { shop_id, sections }))
}

/// `PUT`: replaces the whole visibility map.
pub async fn replace_sections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<ShopId>, PathRejection>,
    payload: Result<Json<BTreeMap<String, bool>>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(shop_id) = path?;
    claims.authorize(shop_id, Role::Admin)?;
    let Json(raw) = payload?;
    let sections = state.with_conn(|conn| {
        let service = ShopService::new(SqliteShopRepository::try_new(conn)?);
        Ok(service.replace_sections(shop_id, &raw)?)
    })?;
    Ok(ok(SectionsResponse { shop_id, sections }))
}

/// `PATCH`: merges the given keys over the stored map.
pub async fn patch_sections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<ShopId>, PathRejection>,
    payload: Result<Json<BTreeMap<String, bool>>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(shop_id) = path?;
    claims.authorize(shop_id, Role::Admin)?;
    let Json(raw) = payload?;
    let sections = state.with_conn(|conn| {
        let service = ShopService::new(SqliteShopRepository::try_new(conn)?);
        Ok(service.patch_sections(shop_id, &raw)?)
    })?;
    Ok(ok(SectionsResponse { shop_id, sections }))
}
