// src/models/user.rs

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

static TEAM_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{N}_\- ]{2,30}$").expect("team name pattern is valid")
});

/// Represents the 'users' table. Every account is a team.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,

    /// Unique team name.
    pub team_name: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Optional school / organization.
    pub group_id: Option<i64>,

    /// 'user' or 'admin'.
    pub role: String,

    pub created_at: NaiveDateTime,

    pub last_access_at: Option<NaiveDateTime>,
}

/// Admin listing row: a team joined with its group label.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub id: i64,
    pub team_name: String,
    pub role: String,
    pub group_id: Option<i64>,
    pub group_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub last_access_at: Option<NaiveDateTime>,
}

fn validate_team_name(name: &str) -> Result<(), validator::ValidationError> {
    if !TEAM_NAME.is_match(name) {
        return Err(validator::ValidationError::new("invalid_team_name").with_message(
            "Team name must be 2-30 letters, digits, spaces, '_' or '-'.".into(),
        ));
    }
    Ok(())
}

/// DTO for team signup.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(custom(function = validate_team_name))]
    pub team_name: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    pub group_id: Option<i64>,
}

/// DTO for team and admin login.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 30))]
    pub team_name: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for admin edits of a team. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTeamRequest {
    #[validate(custom(function = validate_role))]
    pub role: Option<String>,
    #[validate(length(min = 4, max = 128))]
    pub password: Option<String>,
    pub group_id: Option<i64>,
}

fn validate_role(role: &str) -> Result<(), validator::ValidationError> {
    if role != crate::utils::jwt::ROLE_USER && role != crate::utils::jwt::ROLE_ADMIN {
        return Err(validator::ValidationError::new("invalid_role"));
    }
    Ok(())
}
