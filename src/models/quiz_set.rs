// src/models/quiz_set.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Represents the 'quiz_sets' table: a titled, topic-tagged group of quizzes.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSet {
    pub id: i64,
    pub title: String,
    pub topic: String,
    pub created_at: NaiveDateTime,
}

/// Represents the 'quizzes' table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub quiz_set_id: i64,
    pub question: String,
    pub options: Json<Vec<String>>,
    /// Hidden from public listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub question_order: i64,
    pub qr_payload: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSetDetail {
    #[serde(flatten)]
    pub set: QuizSet,
    pub quizzes: Vec<Quiz>,
}

/// Serialize is needed by the `length` rule on `CreateQuizSetRequest::quizzes`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateQuizInput {
    pub question: String,
    pub options: Value,
    pub answer: Value,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizSetRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[validate(length(min = 1, max = 50, message = "A quiz set holds 1 to 50 quizzes."))]
    pub quizzes: Vec<CreateQuizInput>,
}

/// Payload encoded into a legacy quiz's QR code.
pub fn quiz_qr_payload(base: &url::Url, set_id: i64, order: i64) -> Result<String, url::ParseError> {
    base.join(&format!("quiz-sets/{}/{}", set_id, order))
        .map(String::from)
}
