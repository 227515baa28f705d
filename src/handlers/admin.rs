// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::Question,
        session::AppVariant,
        user::{TeamSummary, UpdateTeamRequest},
    },
    utils::{hash::hash_password, json::AppJson},
};

/// Lists all teams with their group label.
/// Admin only.
pub async fn list_teams(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let teams = sqlx::query_as::<_, TeamSummary>(
        r#"
        SELECT u.id, u.team_name, u.role, u.group_id, g.name AS group_name,
               u.created_at, u.last_access_at
        FROM users u
        LEFT JOIN team_groups g ON g.id = u.group_id
        ORDER BY u.id DESC
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list teams: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(teams))
}

/// Updates a team's role, password or group.
/// Admin only.
pub async fn update_team(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateTeamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if payload.role.is_none() && payload.password.is_none() && payload.group_id.is_none() {
        return Ok(StatusCode::OK);
    }

    if let Some(group_id) = payload.group_id {
        sqlx::query_scalar::<_, i64>("SELECT id FROM team_groups WHERE id = ?")
            .bind(group_id)
            .fetch_optional(&pool)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("Group {} does not exist", group_id)))?;
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET ");
    let mut separated = builder.separated(", ");

    if let Some(role) = payload.role {
        separated.push("role = ");
        separated.push_bind_unseparated(role);
    }

    if let Some(password) = payload.password {
        separated.push("password = ");
        separated.push_bind_unseparated(hash_password(&password)?);
    }

    if let Some(group_id) = payload.group_id {
        separated.push("group_id = ");
        separated.push_bind_unseparated(group_id);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update team: {:?}", e);
        AppError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Team not found".to_string()));
    }

    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct QuestionFilter {
    pub variant: Option<String>,
}

/// Lists every saved question, answers included, optionally for one variant.
/// Admin only.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Query(filter): Query<QuestionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let variant = match filter.variant.as_deref() {
        Some(raw) => Some(
            AppVariant::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown variant '{}'", raw)))?,
        ),
        None => None,
    };

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, topic, difficulty, question, options, answer, team_id, variant,
               next_location, contents_id, created_at
        FROM questions
        WHERE (?1 IS NULL OR variant = ?1)
        ORDER BY id DESC
        "#,
    )
    .bind(variant.map(|v| v.as_str()))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list questions: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(questions))
}
