// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, is_unique_violation},
    models::user::{LoginRequest, SignupRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        json::AppJson,
        jwt::{AuthSession, ROLE_ADMIN, ROLE_USER, sign_jwt},
    },
};

async fn find_by_team_name(pool: &SqlitePool, team_name: &str) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, team_name, password, group_id, role, created_at, last_access_at
        FROM users
        WHERE team_name = ?
        "#,
    )
    .bind(team_name)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::from(e)
    })
}

async fn touch_last_access(pool: &SqlitePool, team_id: i64) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET last_access_at = ? WHERE id = ?")
        .bind(Utc::now().naive_utc())
        .bind(team_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Registers a new team.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created; a taken team name answers 409 and writes nothing.
pub async fn signup(
    State(pool): State<SqlitePool>,
    AppJson(mut payload): AppJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Length and charset rules apply to the name as it will be stored.
    payload.team_name = payload.team_name.trim().to_string();
    payload.validate()?;
    let team_name = payload.team_name.as_str();

    if let Some(group_id) = payload.group_id {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM team_groups WHERE id = ?")
            .bind(group_id)
            .fetch_optional(&pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::BadRequest(format!("Group {} does not exist", group_id)));
        }
    }

    let hashed_password = hash_password(&payload.password)?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO users (team_name, password, group_id, role)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(team_name)
    .bind(&hashed_password)
    .bind(payload.group_id)
    .bind(ROLE_USER)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Team name '{}' already exists", team_name))
        } else {
            tracing::error!("Failed to register team: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!("Team '{}' signed up (id {})", team_name, id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "teamName": team_name,
            "role": ROLE_USER,
            "groupId": payload.group_id,
        })),
    ))
}

/// Verifies team name and password, records the access time and signs a token.
async fn authenticate(pool: &SqlitePool, config: &Config, payload: &LoginRequest) -> Result<(User, String), AppError> {
    payload.validate()?;

    let user = find_by_team_name(pool, payload.team_name.trim())
        .await?
        .ok_or(AppError::AuthError("Team not found".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    touch_last_access(pool, user.id).await?;

    let token = sign_jwt(
        user.id,
        &user.team_name,
        &user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok((user, token))
}

fn login_body(user: &User, token: String) -> serde_json::Value {
    json!({
        "token": token,
        "type": "Bearer",
        "teamId": user.id,
        "teamName": user.team_name,
        "role": user.role,
        "groupId": user.group_id,
    })
}

/// Authenticates a team and returns a JWT token.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, token) = authenticate(&pool, &config, &payload).await?;
    Ok(Json(login_body(&user, token)))
}

/// Admin console login. Same credentials check, but only 'admin' accounts pass.
pub async fn admin_login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, token) = authenticate(&pool, &config, &payload).await?;

    if user.role != ROLE_ADMIN {
        tracing::warn!("Non-admin team '{}' tried the admin login", user.team_name);
        return Err(AppError::AuthError("Not an administrator".to_string()));
    }

    Ok(Json(login_body(&user, token)))
}

/// Confirms the bearer token still maps to a team and reports its role.
///
/// Echoes a renewed token when the presented one is close to expiry.
pub async fn check(
    State(pool): State<SqlitePool>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse, AppError> {
    let team_id = session.team_id()?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, team_name, password, group_id, role, created_at, last_access_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(team_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::AuthError("Team no longer exists".to_string()))?;

    touch_last_access(&pool, user.id).await?;

    Ok(Json(json!({
        "valid": true,
        "teamId": user.id,
        "teamName": user.team_name,
        "role": user.role,
        "groupId": user.group_id,
        "token": session.renewed_token,
    })))
}
