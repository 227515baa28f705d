// src/models/session.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MAX_SESSION_QUESTIONS;

/// The two quiz applications served by this backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppVariant {
    AiQuizWalk,
    EscapeRoom,
}

impl AppVariant {
    pub const ALL: [AppVariant; 2] = [AppVariant::AiQuizWalk, AppVariant::EscapeRoom];

    /// Path segment and the value stored in `questions.variant`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppVariant::AiQuizWalk => "ai-quiz-walk",
            AppVariant::EscapeRoom => "escape-room",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == raw)
    }

    /// Local-storage key the browser keeps this variant's session under.
    pub fn session_storage_key(&self) -> String {
        format!("{}-session", self.as_str())
    }

    /// Only the escape room chains questions through next-location hints.
    pub fn uses_next_location(&self) -> bool {
        matches!(self, AppVariant::EscapeRoom)
    }
}

impl fmt::Display for AppVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One question/answer pair in progress on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItem {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub chosen: Option<String>,
}

/// Client-held quiz session.
///
/// The server never stores it: the client persists it, sends it with each
/// generation request, and replaces its copy with the one returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSession {
    pub session_id: String,
    pub variant: AppVariant,
    pub team_id: Option<i64>,
    #[serde(default)]
    pub items: Vec<SessionItem>,
}

impl QuizSession {
    pub fn new(variant: AppVariant, team_id: Option<i64>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            variant,
            team_id,
            items: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        MAX_SESSION_QUESTIONS.saturating_sub(self.items.len())
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Appends items up to the session limit and returns how many were taken.
    pub fn extend_bounded<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = SessionItem>,
    {
        let room = self.remaining();
        let before = self.items.len();
        self.items.extend(items.into_iter().take(room));
        self.items.len() - before
    }

    /// Question texts already asked in this session.
    pub fn asked_questions(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.question.as_str()).collect()
    }

    /// A session from another variant or another team is not continued.
    pub fn belongs_to(&self, variant: AppVariant, team_id: i64) -> bool {
        self.variant == variant && self.team_id.is_none_or(|t| t == team_id)
    }
}
