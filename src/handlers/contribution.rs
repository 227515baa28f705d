// src/handlers/contribution.rs

//! Scan and attempt recording: at most one row per (team, question), first write wins.

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    handlers::quiz::find_question,
    models::{
        contribution::{
            AttemptRequest, AttemptResponse, IgnoredReason, RankingEntry, RankingParams,
            ScanRequest, ScanResponse, contribution_key,
        },
        session::AppVariant,
    },
    utils::{
        html::plain_text,
        json::AppJson,
        jwt::AuthSession,
        normalize::{answers_match, coerce_id},
    },
};

/// Number of distinct questions of `variant` the team has scanned.
async fn found_count(pool: &SqlitePool, team_id: i64, variant: AppVariant) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM quiz_scans s
        JOIN questions q ON q.id = s.question_id
        WHERE s.team_id = ? AND q.variant = ?
        "#,
    )
    .bind(team_id)
    .bind(variant.as_str())
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// (attempted, solved) over first attempts at questions of `variant`.
async fn attempt_counts(
    pool: &SqlitePool,
    team_id: i64,
    variant: AppVariant,
) -> Result<(i64, i64), AppError> {
    let counts = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT COUNT(*), COALESCE(SUM(CASE WHEN a.is_correct THEN 1 ELSE 0 END), 0)
        FROM quiz_attempts a
        JOIN questions q ON q.id = a.question_id
        WHERE a.team_id = ? AND q.variant = ?
        "#,
    )
    .bind(team_id)
    .bind(variant.as_str())
    .fetch_one(pool)
    .await?;
    Ok(counts)
}

/// Records that the caller's team scanned a question's QR code.
///
/// * `qrId` must coerce to an integer (400 otherwise).
/// * Scanning your own question is accepted but never recorded.
/// * Repeat scans are no-ops; `foundCount` is re-read after the write.
pub async fn scan(
    State(pool): State<SqlitePool>,
    Extension(variant): Extension<AppVariant>,
    Extension(auth): Extension<AuthSession>,
    AppJson(payload): AppJson<ScanRequest>,
) -> Result<impl IntoResponse, AppError> {
    let team_id = auth.team_id()?;
    let question_id = coerce_id(&payload.qr_id)
        .ok_or_else(|| AppError::BadRequest("qrId must be an integer".to_string()))?;

    let question = find_question(&pool, variant, question_id).await?;

    if question.team_id == team_id {
        tracing::debug!("Team {} scanned its own question {}", team_id, question_id);
        return Ok(Json(ScanResponse {
            question_id,
            recorded: false,
            ignored: true,
            reason: Some(IgnoredReason::SelfContribution),
            found_count: found_count(&pool, team_id, variant).await?,
            token: auth.renewed_token,
        }));
    }

    // Empty update clause: the first scan wins, later ones change nothing.
    let result = sqlx::query(
        r#"
        INSERT INTO quiz_scans (id, team_id, question_id)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(contribution_key(team_id, question_id))
    .bind(team_id)
    .bind(question_id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record scan: {:?}", e);
        AppError::from(e)
    })?;

    let recorded = result.rows_affected() == 1;
    if recorded {
        tracing::info!("Team {} found question {}", team_id, question_id);
    }

    Ok(Json(ScanResponse {
        question_id,
        recorded,
        ignored: false,
        reason: None,
        found_count: found_count(&pool, team_id, variant).await?,
        token: auth.renewed_token,
    }))
}

/// Records the caller's first answer to a question.
///
/// Same rules as `scan`: integer id, self-attempts ignored, first attempt wins.
/// `correct` grades this submission; `firstCorrect` is what counts.
pub async fn attempt(
    State(pool): State<SqlitePool>,
    Extension(variant): Extension<AppVariant>,
    Extension(auth): Extension<AuthSession>,
    AppJson(payload): AppJson<AttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let team_id = auth.team_id()?;
    let question_id = coerce_id(&payload.question_idx)
        .ok_or_else(|| AppError::BadRequest("questionIdx must be an integer".to_string()))?;

    // Graded in the same plain-text form the options were stored in.
    let answer = plain_text(&payload.answer);
    if answer.is_empty() {
        return Err(AppError::BadRequest("answer is required".to_string()));
    }

    let question = find_question(&pool, variant, question_id).await?;
    let correct = answers_match(&answer, &question.answer);

    if question.team_id == team_id {
        let (attempt_count, solved_count) = attempt_counts(&pool, team_id, variant).await?;
        return Ok(Json(AttemptResponse {
            question_id,
            correct,
            first_correct: None,
            recorded: false,
            ignored: true,
            reason: Some(IgnoredReason::SelfContribution),
            solved_count,
            attempt_count,
            next_location: None,
            token: auth.renewed_token,
        }));
    }

    let key = contribution_key(team_id, question_id);
    let result = sqlx::query(
        r#"
        INSERT INTO quiz_attempts (id, team_id, question_id, answer, is_correct)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(&key)
    .bind(team_id)
    .bind(question_id)
    .bind(&answer)
    .bind(correct)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to record attempt: {:?}", e);
        AppError::from(e)
    })?;
    let recorded = result.rows_affected() == 1;

    let first_correct = sqlx::query_scalar::<_, bool>("SELECT is_correct FROM quiz_attempts WHERE id = ?")
        .bind(&key)
        .fetch_optional(&pool)
        .await?;

    let next_location = if variant.uses_next_location() && first_correct == Some(true) {
        question.next_location
    } else {
        None
    };

    let (attempt_count, solved_count) = attempt_counts(&pool, team_id, variant).await?;

    Ok(Json(AttemptResponse {
        question_id,
        correct,
        first_correct,
        recorded,
        ignored: false,
        reason: None,
        solved_count,
        attempt_count,
        next_location,
        token: auth.renewed_token,
    }))
}

/// Aggregated scan and answer counts per team for one variant.
pub async fn ranking(
    State(pool): State<SqlitePool>,
    Extension(variant): Extension<AppVariant>,
    Query(params): Query<RankingParams>,
) -> Result<impl IntoResponse, AppError> {
    let entries = sqlx::query_as::<_, RankingEntry>(
        r#"
        SELECT
            u.id AS team_id,
            u.team_name,
            g.name AS group_name,
            (SELECT COUNT(*) FROM quiz_scans s JOIN questions q ON q.id = s.question_id
              WHERE s.team_id = u.id AND q.variant = ?1) AS found_count,
            (SELECT COUNT(*) FROM quiz_attempts a JOIN questions q ON q.id = a.question_id
              WHERE a.team_id = u.id AND a.is_correct AND q.variant = ?1) AS solved_count,
            (SELECT COUNT(*) FROM questions q
              WHERE q.team_id = u.id AND q.variant = ?1) AS authored_count
        FROM users u
        LEFT JOIN team_groups g ON g.id = u.group_id
        WHERE u.role = 'user' AND (?2 IS NULL OR u.group_id = ?2)
        ORDER BY solved_count DESC, found_count DESC, u.team_name ASC
        "#,
    )
    .bind(variant.as_str())
    .bind(params.group_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to build ranking: {:?}", e);
        AppError::from(e)
    })?;

    Ok(Json(entries))
}
