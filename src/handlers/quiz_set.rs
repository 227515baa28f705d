// src/handlers/quiz_set.rs

//! Legacy fixed quiz sets: admin-authored, ordered, each quiz with its own QR payload.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        question::QuestionDraft,
        quiz_set::{CreateQuizSetRequest, Quiz, QuizSet, QuizSetDetail, quiz_qr_payload},
    },
    utils::{html::plain_text, json::AppJson},
};

async fn load_detail(pool: &SqlitePool, id: i64, with_answers: bool) -> Result<QuizSetDetail, AppError> {
    let set = sqlx::query_as::<_, QuizSet>("SELECT id, title, topic, created_at FROM quiz_sets WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz set {} not found", id)))?;

    let quizzes = sqlx::query_as::<_, Quiz>(
        r#"
        SELECT id, quiz_set_id, question, options,
               CASE WHEN ?1 THEN answer ELSE NULL END AS answer,
               question_order, qr_payload
        FROM quizzes
        WHERE quiz_set_id = ?2
        ORDER BY question_order ASC
        "#,
    )
    .bind(with_answers)
    .bind(id)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch quizzes of set {}: {:?}", id, e);
        AppError::from(e)
    })?;

    Ok(QuizSetDetail { set, quizzes })
}

/// Lists all quiz sets, newest first.
pub async fn list_quiz_sets(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let sets = sqlx::query_as::<_, QuizSet>(
        "SELECT id, title, topic, created_at FROM quiz_sets ORDER BY created_at DESC, id DESC",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(sets))
}

/// One quiz set with its quizzes in order; answers hidden.
pub async fn get_quiz_set(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load_detail(&pool, id, false).await?))
}

/// Same as `get_quiz_set`, answers included.
/// Admin only.
pub async fn admin_get_quiz_set(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load_detail(&pool, id, true).await?))
}

/// Creates a quiz set; quizzes are numbered 1..n in the order given.
/// Admin only.
pub async fn create_quiz_set(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    AppJson(payload): AppJson<CreateQuizSetRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let drafts = payload
        .quizzes
        .iter()
        .enumerate()
        .map(|(idx, q)| {
            QuestionDraft::from_loose(&q.question, &q.options, &q.answer)
                .map_err(|e| AppError::BadRequest(format!("Quiz {}: {}", idx + 1, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut tx = pool.begin().await?;

    let set_id = sqlx::query_scalar::<_, i64>("INSERT INTO quiz_sets (title, topic) VALUES (?, ?) RETURNING id")
        .bind(plain_text(&payload.title))
        .bind(plain_text(&payload.topic))
        .fetch_one(&mut *tx)
        .await?;

    for (order, draft) in (1_i64..).zip(drafts.iter()) {
        let qr_payload = quiz_qr_payload(&config.public_base_url, set_id, order)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO quizzes (quiz_set_id, question, options, answer, question_order, qr_payload)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(set_id)
        .bind(&draft.question)
        .bind(sqlx::types::Json(&draft.options))
        .bind(&draft.answer)
        .bind(order)
        .bind(qr_payload)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert quiz {} of set {}: {:?}", order, set_id, e);
            AppError::from(e)
        })?;
    }

    tx.commit().await?;
    tracing::info!("Created quiz set {} with {} quizzes", set_id, drafts.len());

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": set_id, "quizCount": drafts.len() })),
    ))
}
