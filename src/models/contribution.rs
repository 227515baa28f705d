// src/models/contribution.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Primary key shared by scans and attempts: one row per (team, question).
pub fn contribution_key(team_id: i64, question_id: i64) -> String {
    format!("{}:{}", team_id, question_id)
}

/// Why a contribution was accepted but not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IgnoredReason {
    /// The caller authored the question.
    #[serde(rename = "self")]
    SelfContribution,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// Question id; a number or a numeric string.
    #[serde(default)]
    pub qr_id: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub question_id: i64,
    /// True only for the call that created the row.
    pub recorded: bool,
    pub ignored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<IgnoredReason>,
    pub found_count: i64,
    /// Renewed bearer token, if the presented one was close to expiry.
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRequest {
    #[serde(default)]
    pub question_idx: Value,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResponse {
    pub question_id: i64,
    /// Whether this submission's answer is correct.
    pub correct: bool,
    /// Whether the stored first attempt was correct (None when nothing is stored).
    pub first_correct: Option<bool>,
    pub recorded: bool,
    pub ignored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<IgnoredReason>,
    pub solved_count: i64,
    pub attempt_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_location: Option<String>,
    pub token: Option<String>,
}

/// One ranking row for a variant.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub team_id: i64,
    pub team_name: String,
    pub group_name: Option<String>,
    pub found_count: i64,
    pub solved_count: i64,
    pub authored_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingParams {
    pub group_id: Option<i64>,
}
