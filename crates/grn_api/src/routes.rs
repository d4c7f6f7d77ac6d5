//! Route registration.

use crate::auth;
use crate::handlers::{categories, grns, payments, shops, suppliers, system};
use crate::state::AppState;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, patch};
use axum::Router;
use std::time::Instant;

/// Builds the complete router: public system endpoints plus `/api/v1`.
pub fn build_router(state: AppState) -> Router {
    let jwt_state = state.jwt_state.clone();

    let api = Router::new()
        .route("/shops", get(shops::list_shops).post(shops::create_shop))
        .route("/shops/{shop_id}", get(shops::get_shop))
        .route(
            "/shops/{shop_id}/sections",
            get(shops::get_sections)
                .put(shops::replace_sections)
                .patch(shops::patch_sections),
        )
        .route(
            "/shops/{shop_id}/suppliers",
            get(suppliers::list_suppliers).post(suppliers::create_supplier),
        )
        .route(
            "/shops/{shop_id}/suppliers/{supplier_id}",
            get(suppliers::get_supplier)
                .put(suppliers::update_supplier)
                .delete(suppliers::delete_supplier),
        )
        .route(
            "/shops/{shop_id}/suppliers/{supplier_id}/balance",
            get(suppliers::supplier_balance),
        )
        .route(
            "/shops/{shop_id}/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/shops/{shop_id}/categories/{category_id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        .route(
            "/shops/{shop_id}/payments",
            get(payments::list_payments).post(payments::create_payment),
        )
        .route(
            "/shops/{shop_id}/payments/{payment_id}",
            get(payments::get_payment).delete(payments::delete_payment),
        )
        .route("/grns", get(grns::list_grns).post(grns::create_grn))
        .route("/grns/summary", get(grns::grn_summary))
        .route(
            "/grns/{grn_id}",
            get(grns::get_grn)
                .put(grns::update_grn)
                .delete(grns::delete_grn),
        )
        .route("/grns/{grn_id}/status", patch(grns::set_grn_status))
        .route("/grns/{grn_id}/share", get(grns::share_grn));

    Router::new()
        .route("/health", get(system::health))
        .route("/version", get(system::version))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            jwt_state,
            auth::auth_middleware,
        ))
        .layer(middleware::from_fn(log_request))
}

/// Logs one metadata-only line per request. Query strings are omitted.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(request).await;
    let status_code = response.status();
    let status = if status_code.is_server_error() {
        "error"
    } else {
        "ok"
    };
    log::info!(
        "event=http_request module=api status={status} method={method} path={path} status_code={} duration_ms={}",
        status_code.as_u16(),
        started.elapsed().as_millis()
    );
    response
}
