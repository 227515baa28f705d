// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    ai::{QuestionGenerator, QuizPrompt, generate_questions},
    config::{Config, DEFAULT_GENERATE_COUNT, MAX_SAVE_BATCH, MIN_SAVE_BATCH},
    error::AppError,
    models::{
        question::{
            CreateQuizRequest, ListParams, NextLocationRequest, OwnQuestion, PublicQuestion,
            PublicQuestionRow, Question, SaveQuizRequest, question_qr_payload,
        },
        session::{AppVariant, QuizSession, SessionItem},
    },
    utils::{json::AppJson, jwt::AuthSession},
};

/// Loads a question of the given variant, or 404.
pub(crate) async fn find_question(
    pool: &SqlitePool,
    variant: AppVariant,
    question_id: i64,
) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, topic, difficulty, question, options, answer, team_id, variant,
               next_location, contents_id, created_at
        FROM questions
        WHERE id = ? AND variant = ?
        "#,
    )
    .bind(question_id)
    .bind(variant.as_str())
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch question {}: {:?}", question_id, e);
        AppError::from(e)
    })?
    .ok_or_else(|| AppError::NotFound(format!("Question {} not found", question_id)))
}

/// Generates multiple-choice questions with the AI provider.
///
/// Nothing is stored. The caller's session (if any) comes in with the request
/// and goes back out with the new questions appended, so no conversation state
/// lives on the server.
pub async fn create_quiz(
    State(generator): State<Arc<dyn QuestionGenerator>>,
    Extension(variant): Extension<AppVariant>,
    Extension(auth): Extension<AuthSession>,
    AppJson(payload): AppJson<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let team_id = auth.team_id()?;

    let mut session = match payload.session {
        Some(session) if session.belongs_to(variant, team_id) => session,
        Some(session) => {
            tracing::debug!(
                "Ignoring session {} from another team or variant",
                session.session_id
            );
            QuizSession::new(variant, Some(team_id))
        }
        None => QuizSession::new(variant, Some(team_id)),
    };

    if session.is_full() {
        return Err(AppError::BadRequest(
            "Quiz session is full; save it or start a new one".to_string(),
        ));
    }

    let count = payload
        .count
        .unwrap_or(DEFAULT_GENERATE_COUNT)
        .min(session.remaining());

    let topic = payload.topic.trim();
    let drafts = generate_questions(
        generator.as_ref(),
        &QuizPrompt {
            topic,
            difficulty: &payload.difficulty,
            count,
            previous: session.asked_questions(),
        },
    )
    .await?;

    session.extend_bounded(drafts.iter().map(|d| SessionItem {
        question: d.question.clone(),
        options: d.options.clone(),
        answer: d.answer.clone(),
        chosen: None,
    }));

    Ok(Json(json!({
        "topic": topic,
        "difficulty": payload.difficulty,
        "contentsId": payload.contents_id,
        "questions": drafts,
        "storageKey": variant.session_storage_key(),
        "session": session,
        "token": auth.renewed_token,
    })))
}

/// Saves a batch of questions authored by the caller's team.
///
/// The whole batch is validated first and inserted in one transaction.
pub async fn save_quiz(
    State(pool): State<SqlitePool>,
    Extension(variant): Extension<AppVariant>,
    Extension(auth): Extension<AuthSession>,
    AppJson(payload): AppJson<SaveQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let team_id = auth.team_id()?;

    let submitted = payload.questions.len();
    if submitted < MIN_SAVE_BATCH {
        return Err(AppError::BadRequest(format!(
            "At least {} questions are required, got {}",
            MIN_SAVE_BATCH, submitted
        )));
    }
    if submitted > MAX_SAVE_BATCH {
        return Err(AppError::BadRequest(format!(
            "At most {} questions can be saved at once",
            MAX_SAVE_BATCH
        )));
    }

    let questions = payload
        .questions
        .into_iter()
        .enumerate()
        .map(|(idx, q)| q.into_new_question(idx + 1))
        .collect::<Result<Vec<_>, _>>()?;

    let mut tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(questions.len());

    for q in questions {
        // Hints only mean something in the escape room.
        let next_location = q.next_location.filter(|_| variant.uses_next_location());

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO questions
            (topic, difficulty, question, options, answer, team_id, variant, next_location, contents_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&q.topic)
        .bind(&q.difficulty)
        .bind(&q.draft.question)
        .bind(sqlx::types::Json(&q.draft.options))
        .bind(&q.draft.answer)
        .bind(team_id)
        .bind(variant.as_str())
        .bind(next_location)
        .bind(q.contents_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save question: {:?}", e);
            AppError::from(e)
        })?;
        ids.push(id);
    }

    tx.commit().await?;
    tracing::info!("Team {} saved {} {} question(s)", team_id, ids.len(), variant);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "saved": ids.len(),
            "ids": ids,
            "token": auth.renewed_token,
        })),
    ))
}

/// Lists the caller's own questions (with answers and QR payloads), newest first.
pub async fn list_own(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(variant): Extension<AppVariant>,
    Extension(auth): Extension<AuthSession>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let team_id = auth.team_id()?;
    let topic = params.topic.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());

    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, topic, difficulty, question, options, answer, team_id, variant,
               next_location, contents_id, created_at
        FROM questions
        WHERE team_id = ?1 AND variant = ?2 AND (?3 IS NULL OR topic = ?3)
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(team_id)
    .bind(variant.as_str())
    .bind(topic)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list questions: {:?}", e);
        AppError::from(e)
    })?;

    let listed = questions
        .into_iter()
        .map(|question| -> Result<OwnQuestion, AppError> {
            let qr_payload = question_qr_payload(&config.public_base_url, variant.as_str(), question.id)?;
            Ok(OwnQuestion { question, qr_payload })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(listed))
}

/// Public lookup behind a QR code. The answer is never included.
pub async fn get_by_qr(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(variant): Extension<AppVariant>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let row = sqlx::query_as::<_, PublicQuestionRow>(
        r#"
        SELECT q.id, q.topic, q.difficulty, q.question, q.options, q.variant, u.team_name
        FROM questions q
        JOIN users u ON u.id = q.team_id
        WHERE q.id = ? AND q.variant = ?
        "#,
    )
    .bind(id)
    .bind(variant.as_str())
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Question {} not found", id)))?;

    let qr_payload = question_qr_payload(&config.public_base_url, variant.as_str(), row.id)?;
    Ok(Json(PublicQuestion::from_row(row, qr_payload)))
}

/// Sets the escape-room hint revealed after a correct first attempt.
/// Only the authoring team may change it.
pub async fn set_next_location(
    State(pool): State<SqlitePool>,
    Extension(variant): Extension<AppVariant>,
    Extension(auth): Extension<AuthSession>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<NextLocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let team_id = auth.team_id()?;

    let question = find_question(&pool, variant, id).await?;
    if question.team_id != team_id {
        return Err(AppError::Forbidden(
            "Only the authoring team can set the next location".to_string(),
        ));
    }

    let next_location = crate::utils::html::plain_text(&payload.next_location);
    sqlx::query("UPDATE questions SET next_location = ? WHERE id = ?")
        .bind(&next_location)
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update next location: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(json!({
        "id": id,
        "nextLocation": next_location,
        "token": auth.renewed_token,
    })))
}
