// src/models/question.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::{
    config::OPTION_COUNT,
    error::AppError,
    models::session::QuizSession,
    utils::{
        html::plain_text,
        normalize::{coerce_string_array, resolve_answer_index},
    },
};

pub const DIFFICULTIES: [&str; 3] = ["easy", "medium", "hard"];

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    pub topic: String,

    /// 'easy', 'medium' or 'hard'.
    pub difficulty: String,

    /// The question text.
    pub question: String,

    /// Exactly four options, stored as a JSON array.
    pub options: Json<Vec<String>>,

    /// The correct option text.
    pub answer: String,

    /// Authoring team.
    pub team_id: i64,

    /// 'ai-quiz-walk' or 'escape-room'.
    pub variant: String,

    /// Escape-room hint revealed after a correct first attempt.
    pub next_location: Option<String>,

    /// Contents / category id chosen on the creation form.
    pub contents_id: Option<i64>,

    pub created_at: NaiveDateTime,
}

/// A team's own question as listed for printing QR codes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnQuestion {
    #[serde(flatten)]
    pub question: Question,
    pub qr_payload: String,
}

/// Row for the public QR lookup (answer excluded, author joined).
#[derive(Debug, FromRow)]
pub struct PublicQuestionRow {
    pub id: i64,
    pub topic: String,
    pub difficulty: String,
    pub question: String,
    pub options: Json<Vec<String>>,
    pub variant: String,
    pub team_name: String,
}

/// DTO for sending a question to whoever scanned its QR code.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub topic: String,
    pub difficulty: String,
    pub question: String,
    pub options: Vec<String>,
    pub variant: String,
    pub author_team_name: String,
    pub qr_payload: String,
}

impl PublicQuestion {
    pub fn from_row(row: PublicQuestionRow, qr_payload: String) -> Self {
        Self {
            id: row.id,
            topic: row.topic,
            difficulty: row.difficulty,
            question: row.question,
            options: row.options.0,
            variant: row.variant,
            author_team_name: row.team_name,
            qr_payload,
        }
    }
}

fn validate_difficulty(difficulty: &str) -> Result<(), validator::ValidationError> {
    if !DIFFICULTIES.contains(&difficulty) {
        return Err(validator::ValidationError::new("invalid_difficulty"));
    }
    Ok(())
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.len() != OPTION_COUNT {
        return Err(validator::ValidationError::new("options_must_have_four_entries"));
    }
    for opt in options {
        if opt.is_empty() || opt.len() > 500 {
            return Err(validator::ValidationError::new("option_length"));
        }
    }
    Ok(())
}

/// The question/options/answer core shared by AI output and save requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[validate(length(min = 1, max = 1000))]
    pub question: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
}

impl QuestionDraft {
    /// Builds a draft from loosely shaped JSON: options are coerced to a string
    /// list and the answer is resolved against them before both are reduced to
    /// plain text, so the stored answer is always one of the stored options.
    pub fn from_loose(question: &str, options: &Value, answer: &Value) -> Result<Self, String> {
        let raw_options = coerce_string_array(options);
        let answer_idx = resolve_answer_index(answer, &raw_options)
            .ok_or_else(|| "answer is not one of the options".to_string())?;
        let options: Vec<String> = raw_options.iter().map(|o| plain_text(o)).collect();

        let draft = Self {
            question: plain_text(question),
            answer: options[answer_idx].clone(),
            options,
        };
        draft.validate().map_err(|e| e.to_string())?;
        Ok(draft)
    }
}

/// DTO for the AI generation request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: String,
    #[validate(range(min = 1, max = 7))]
    pub count: Option<usize>,
    pub contents_id: Option<i64>,
    /// The client's current session, if one is in progress.
    pub session: Option<QuizSession>,
}

/// One question in a save request, in whatever shape the client kept it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveQuestionInput {
    pub topic: String,
    pub difficulty: String,
    pub question: String,
    pub options: Value,
    pub answer: Value,
    pub contents_id: Option<i64>,
    pub next_location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SaveQuizRequest {
    pub questions: Vec<SaveQuestionInput>,
}

/// A validated question ready to insert.
#[derive(Debug, Clone, Validate)]
pub struct NewQuestion {
    #[validate(length(min = 1, max = 100))]
    pub topic: String,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: String,
    #[validate(nested)]
    pub draft: QuestionDraft,
    pub contents_id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub next_location: Option<String>,
}

impl SaveQuestionInput {
    /// `position` is 1-based and only used in error messages.
    pub fn into_new_question(self, position: usize) -> Result<NewQuestion, AppError> {
        let draft = QuestionDraft::from_loose(&self.question, &self.options, &self.answer)
            .map_err(|e| AppError::BadRequest(format!("Question {}: {}", position, e)))?;

        let new_question = NewQuestion {
            topic: plain_text(&self.topic),
            difficulty: self.difficulty.trim().to_lowercase(),
            draft,
            contents_id: self.contents_id,
            next_location: self
                .next_location
                .map(|l| plain_text(&l))
                .filter(|l| !l.is_empty()),
        };
        new_question
            .validate()
            .map_err(|e| AppError::BadRequest(format!("Question {}: {}", position, e)))?;
        Ok(new_question)
    }
}

/// DTO for setting the escape-room next-location hint.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NextLocationRequest {
    #[validate(length(min = 1, max = 200))]
    pub next_location: String,
}

/// Payload encoded into a question's QR code: the page that opens the question.
pub fn question_qr_payload(
    base: &url::Url,
    variant: &str,
    question_id: i64,
) -> Result<String, AppError> {
    base.join(&format!("{}/quiz/{}", variant, question_id))
        .map(String::from)
        .map_err(|e| AppError::InternalServerError(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub topic: Option<String>,
}
