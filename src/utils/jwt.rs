// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject - the team (user) id as a string.
    pub sub: String,
    pub team_name: String,
    /// 'user' or 'admin'.
    pub role: String,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiration, Unix seconds.
    pub exp: i64,
}

impl Claims {
    pub fn new(team_id: i64, team_name: &str, role: &str, issued_at: i64, ttl_seconds: u64) -> Self {
        Self {
            sub: team_id.to_string(),
            team_name: team_name.to_owned(),
            role: role.to_owned(),
            iat: issued_at,
            exp: issued_at + ttl_seconds as i64,
        }
    }

    /// The authenticated team id carried in `sub`.
    pub fn team_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Seconds left before expiry relative to `now` (negative once expired).
    pub fn remaining(&self, now: i64) -> i64 {
        self.exp - now
    }
}

/// What `auth_middleware` leaves in the request extensions.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub claims: Claims,
    /// Replacement token when the presented one was close to expiry.
    pub renewed_token: Option<String>,
}

impl AuthSession {
    pub fn team_id(&self) -> Result<i64, AppError> {
        self.claims.team_id()
    }
}

/// Encodes already-built claims with HS256.
pub fn sign_claims(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Signs a new JWT for a team, valid for `expiration_seconds` from now.
pub fn sign_jwt(
    team_id: i64,
    team_name: &str,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims::new(team_id, team_name, role, Utc::now().timestamp(), expiration_seconds);
    sign_claims(&claims, secret)
}

/// Verifies and decodes a JWT string.
///
/// No leeway is applied: a token is rejected the second it expires.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::AuthError("Token expired".to_string()),
            _ => AppError::AuthError("Invalid token".to_string()),
        })
}

/// Sliding expiration: re-issues a full-lifetime token for the same identity
/// once the remaining lifetime drops below `jwt_renew_threshold`.
pub fn renew_if_needed(claims: &Claims, config: &Config) -> Result<Option<String>, AppError> {
    let now = Utc::now().timestamp();
    if claims.remaining(now) >= config.jwt_renew_threshold as i64 {
        return Ok(None);
    }

    let renewed = Claims::new(
        claims.team_id()?,
        &claims.team_name,
        &claims.role,
        now,
        config.jwt_expiration,
    );
    tracing::debug!("Renewing token for team {}", claims.sub);
    sign_claims(&renewed, &config.jwt_secret).map(Some)
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header and injects an
/// `AuthSession` (claims plus an optional renewed token) for handlers to use.
/// Any failure answers 401 with the usual JSON error body.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token);

    let Some(token) = token else {
        return AppError::AuthError("Missing bearer token".to_string()).into_response();
    };

    let session = verify_jwt(token, &config.jwt_secret).and_then(|claims| {
        let renewed_token = renew_if_needed(&claims, &config)?;
        Ok(AuthSession {
            claims,
            renewed_token,
        })
    });

    match session {
        Ok(session) => {
            req.extensions_mut().insert(session);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. The injected session must carry the 'admin' role.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Response {
    let Some(session) = req.extensions().get::<AuthSession>() else {
        return AppError::AuthError("Missing bearer token".to_string()).into_response();
    };

    if !session.claims.is_admin() {
        return AppError::Forbidden("Administrator role required".to_string()).into_response();
    }

    next.run(req).await
}
