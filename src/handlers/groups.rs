// src/handlers/groups.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::{AppError, is_unique_violation},
    models::group::{CreateGroupRequest, Group},
    utils::json::AppJson,
};

/// Lists every group, for the signup form.
pub async fn list_groups(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let groups = sqlx::query_as::<_, Group>("SELECT id, name, created_at FROM team_groups ORDER BY name")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list groups: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(groups))
}

/// Creates a group.
/// Admin only.
pub async fn create_group(
    State(pool): State<SqlitePool>,
    AppJson(payload): AppJson<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let name = payload.name.trim();

    let group = sqlx::query_as::<_, Group>(
        "INSERT INTO team_groups (name) VALUES (?) RETURNING id, name, created_at",
    )
    .bind(name)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict(format!("Group '{}' already exists", name))
        } else {
            tracing::error!("Failed to create group: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(group)))
}
