//! JWT authentication middleware and shop-level permission checks.
//!
//! Extracts the JWT from `Authorization: Bearer <token>`, validates it and
//! stores [`Claims`] in request extensions for downstream handlers.

use crate::error::ApiError;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use grn_core::model::shop::ShopId;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Access level carried in the token. Ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    Manager,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Staff => "staff",
            Self::Manager => "manager",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id.
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Home shop. Absent for super admins.
    #[serde(default)]
    pub shop_id: Option<ShopId>,
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    pub fn can_access_shop(&self, shop_id: ShopId) -> bool {
        self.is_super_admin() || self.shop_id == Some(shop_id)
    }

    /// Requires access to `shop_id` and at least `min_role`.
    pub fn authorize(&self, shop_id: ShopId, min_role: Role) -> Result<(), ApiError> {
        if !self.can_access_shop(shop_id) {
            return Err(ApiError::PermissionDenied(format!(
                "user {} has no access to shop {shop_id}",
                self.sub
            )));
        }
        self.require_role(min_role)
    }

    pub fn require_role(&self, min_role: Role) -> Result<(), ApiError> {
        if self.role < min_role {
            return Err(ApiError::PermissionDenied(format!(
                "role {} is required, user {} is {}",
                min_role.as_str(),
                self.sub,
                self.role.as_str()
            )));
        }
        Ok(())
    }

    /// Shop named in the request, or the caller's home shop.
    pub fn resolve_shop(&self, requested: Option<ShopId>) -> Result<ShopId, ApiError> {
        requested
            .or(self.shop_id)
            .ok_or_else(|| ApiError::Validation("shop_id is required".to_string()))
    }
}

/// Shared JWT configuration for the middleware.
#[derive(Clone)]
pub struct JwtState {
    pub decoding_key: DecodingKey,
    pub validation: Validation,
}

impl JwtState {
    /// HS256 validation with the given clock leeway.
    pub fn from_secret(secret: &str, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

/// Validates the bearer token of every non-public request.
pub async fn auth_middleware(
    State(jwt_state): State<Arc<JwtState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public_path(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthenticated("missing bearer token".to_string()))?;

    let token_data =
        jsonwebtoken::decode::<Claims>(token, &jwt_state.decoding_key, &jwt_state.validation)
            .map_err(|err| ApiError::Unauthenticated(format!("invalid token: {err}")))?;

    request.extensions_mut().insert(token_data.claims);
    Ok(next.run(request).await)
}

fn is_public_path(path: &str) -> bool {
    matches!(path, "/health" | "/version")
}
