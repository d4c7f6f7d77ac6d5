//! Category endpoints under `/shops/{shop_id}/categories`.

use super::Deleted;
use crate::auth::{Claims, Role};
use crate::error::{created, ok, ApiResult};
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::{Extension, Json};
use grn_core::model::category::{CategoryId, CategoryInput};
use grn_core::model::shop::ShopId;
use grn_core::repo::category_repo::SqliteCategoryRepository;
use grn_core::service::category_service::CategoryService;

pub async fn list_categories(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<ShopId>, PathRejection>,
) -> ApiResult<Response> {
    let Path(shop_id) = path?;
    claims.authorize(shop_id, Role::Staff)?;
    let categories = state.with_conn(|conn| {
        let service = CategoryService::new(SqliteCategoryRepository::try_new(conn)?);
        Ok(service.list_categories(shop_id)?)
    })?;
    Ok(ok(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<ShopId>, PathRejection>,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Path(shop_id) = path?;
    claims.authorize(shop_id, Role::Manager)?;
    let Json(input) = payload?;
    let category = state.with_conn(|conn| {
        let service = CategoryService::new(SqliteCategoryRepository::try_new(conn)?);
        Ok(service.create_category(shop_id, input)?)
    })?;
    Ok(created(category))
}

pub async fn get_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<(ShopId, CategoryId)>, PathRejection>,
) -> ApiResult<Response> {
    let Path((shop_id, category_id)) = path?;
    claims.authorize(shop_id, Role::Staff)?;
    let category = state.with_conn(|conn| {
        let service = CategoryService::new(SqliteCategoryRepository::try_new(conn)?);
        Ok(service.get_category(shop_id, category_id)?)
    })?;
    Ok(ok(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<(ShopId, CategoryId)>, PathRejection>,
    payload: Result<Json<CategoryInput>, JsonRejection>,
) -> ApiResult<Response> {
    let Path((shop_id, category_id)) = path?;
    claims.authorize(shop_id, Role::Manager)?;
    let Json(input) = payload?;
    let category = state.with_conn(|conn| {
        let service = CategoryService::new(SqliteCategoryRepository::try_new(conn)?);
        Ok(service.update_category(shop_id, category_id, input)?)
    })?;
    Ok(ok(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    path: Result<Path<(ShopId, CategoryId)>, PathRejection>,
) -> ApiResult<Response> {
    let Path((shop_id, category_id)) = path?;
    claims.authorize(shop_id, Role::Admin)?;
    state.with_conn(|conn| {
        let service = CategoryService::new(SqliteCategoryRepository::try_new(conn)?);
        Ok(service.delete_category(shop_id, category_id)?)
    })?;
    Ok(ok(Deleted::new(category_id)))
}
