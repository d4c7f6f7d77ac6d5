//! HTTP surface for the GRN backend.
//!
//! Handlers stay thin: extract, authorize against JWT claims, then call one
//! `grn_core` service while holding the shared connection.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use auth::{Claims, JwtState, Role};
pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::{AppState, ShareSettings};
