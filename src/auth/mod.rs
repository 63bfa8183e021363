//! Bearer-token identity and the driver ownership gate.
//!
//! Tokens are HS256 JWTs signed with the configured secret. The subject is the
//! user id of the principal; driver identity is resolved separately through the
//! driver profile linked to that user.

use crate::{
    errors::ServiceError,
    models::{assignment, driver},
};
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_DISPATCHER: &str = "dispatcher";
pub const ROLE_DRIVER: &str = "driver";

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,        // Subject (user ID)
    pub roles: Vec<String>, // User's roles
    pub iat: i64,           // Issued at time
    pub exp: i64,           // Expiration time
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(user_id: Uuid, roles: Vec<String>) -> Self {
        Self { user_id, roles }
    }

    /// Check if the principal has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// Dispatchers run the fleet; admins can do everything a dispatcher can.
    pub fn is_dispatcher(&self) -> bool {
        self.has_role(ROLE_DISPATCHER) || self.is_admin()
    }

    pub fn require_dispatcher(&self) -> Result<(), ServiceError> {
        if self.is_dispatcher() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "Dispatcher or admin role required".into(),
            ))
        }
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("Admin role required".into()))
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            token_ttl: Duration::hours(1),
        }
    }
}

/// Validates bearer tokens. Issuing is only offered for tooling and tests.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn issue_token(&self, user_id: Uuid, roles: &[&str]) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iat: now.timestamp(),
            exp: (now + self.config.token_ttl).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("Failed to sign token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<Principal, ServiceError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("Token expired".into())
            }
            _ => ServiceError::Unauthorized("Invalid token".into()),
        })?
        .claims;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid token subject".into()))?;

        Ok(Principal::new(user_id, claims.roles))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    Arc<AuthService>: FromRef<S>,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthService>::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or_else(|| ServiceError::Unauthorized("Missing bearer token".into()))?;

        auth.validate_token(token)
    }
}

/// Resolves callers to drivers and answers assignment ownership questions.
#[async_trait]
pub trait OwnershipGate: Send + Sync {
    /// Driver profile id for the principal, or NotFound when none is linked.
    async fn driver_id_for_principal(&self, principal: &Principal) -> Result<Uuid, ServiceError>;

    /// Never fails: any lookup error answers `false`.
    async fn is_assignment_owned_by(&self, assignment_id: Uuid, principal: &Principal) -> bool;
}

/// Ownership gate backed by the `drivers.user_id` link.
#[derive(Clone)]
pub struct DbOwnershipGate {
    db: Arc<DatabaseConnection>,
}

impl DbOwnershipGate {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OwnershipGate for DbOwnershipGate {
    async fn driver_id_for_principal(&self, principal: &Principal) -> Result<Uuid, ServiceError> {
        driver::Entity::find()
            .filter(driver::Column::UserId.eq(principal.user_id))
            .one(&*self.db)
            .await?
            .map(|d| d.id)
            .ok_or_else(|| ServiceError::not_found("Driver", "user_id", principal.user_id))
    }

    async fn is_assignment_owned_by(&self, assignment_id: Uuid, principal: &Principal) -> bool {
        let driver_id = match self.driver_id_for_principal(principal).await {
            Ok(id) => id,
            Err(error) => {
                debug!(%assignment_id, %error, "ownership lookup failed");
                return false;
            }
        };

        match assignment::Entity::find_by_id(assignment_id)
            .one(&*self.db)
            .await
        {
            Ok(Some(found)) => found.driver_id == driver_id,
            Ok(None) => false,
            Err(error) => {
                debug!(%assignment_id, %error, "ownership lookup failed");
                false
            }
        }
    }
}
