// src/ai/mod.rs

//! Question generation through a third-party generative-language API.

pub mod gemini;
pub mod prompt;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::{error::AppError, models::question::QuestionDraft};

pub use gemini::GeminiClient;
pub use prompt::{QuizPrompt, build_prompt, parse_generated};

/// Anything that turns a prompt into raw model text.
///
/// The router holds it as `Arc<dyn QuestionGenerator>` so tests can swap in a
/// canned implementation.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, AppError>;
}

/// Questions differing only in case or surrounding whitespace count as repeats.
fn question_key(question: &str) -> String {
    question.trim().to_lowercase()
}

/// Builds the prompt, calls the model and validates what came back.
pub async fn generate_questions(
    generator: &dyn QuestionGenerator,
    request: &QuizPrompt<'_>,
) -> Result<Vec<QuestionDraft>, AppError> {
    let prompt = build_prompt(request);
    let raw = generator.complete(&prompt).await?;
    let mut drafts = parse_generated(&raw)?;

    // Models sometimes repeat themselves or ignore the requested count.
    let mut seen: HashSet<String> = request.previous.iter().map(|q| question_key(q)).collect();
    drafts.retain(|d| seen.insert(question_key(&d.question)));
    drafts.truncate(request.count);

    if drafts.is_empty() {
        return Err(AppError::InternalServerError(
            "AI response malformed: no usable questions".to_string(),
        ));
    }

    tracing::info!(
        "Generated {} question(s) on '{}' ({})",
        drafts.len(),
        request.topic,
        request.difficulty
    );
    Ok(drafts)
}
