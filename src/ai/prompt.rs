// src/ai/prompt.rs

use serde_json::Value;

use crate::{config::OPTION_COUNT, error::AppError, models::question::QuestionDraft};

/// Everything the prompt is built from.
#[derive(Debug, Clone)]
pub struct QuizPrompt<'a> {
    pub topic: &'a str,
    pub difficulty: &'a str,
    pub count: usize,
    /// Questions already asked in the caller's session.
    pub previous: Vec<&'a str>,
}

pub fn build_prompt(request: &QuizPrompt<'_>) -> String {
    let mut prompt = format!(
        "You are writing questions for a walking-tour quiz played by teams of students.\n\
         Write {count} multiple-choice question(s) about \"{topic}\" at {difficulty} difficulty.\n\
         Each question must have exactly {options} short options and exactly one correct option.\n\
         Questions must be answerable by someone visiting the place and must not depend on each other.\n",
        count = request.count,
        topic = request.topic,
        difficulty = request.difficulty,
        options = OPTION_COUNT,
    );

    if !request.previous.is_empty() {
        prompt.push_str("Do not repeat or rephrase any of these earlier questions:\n");
        for q in &request.previous {
            prompt.push_str("- ");
            prompt.push_str(q);
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "Respond with JSON only, no prose and no Markdown, in exactly this shape:\n\
         [{\"question\": \"...\", \"options\": [\"...\", \"...\", \"...\", \"...\"], \"answer\": \"<the correct option text>\"}]\n",
    );
    prompt
}

/// Removes a surrounding Markdown code fence (```json ... ```), if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn first_field<'v>(item: &'v Value, keys: &[&str]) -> Option<&'v Value> {
    keys.iter().find_map(|k| item.get(*k))
}

/// Parses and validates raw model output.
///
/// Accepts a top-level array or an object carrying a `questions` array.
/// Entries that fail validation are dropped; a response with no valid entry,
/// or one that is not JSON at all, is malformed.
pub fn parse_generated(raw: &str) -> Result<Vec<QuestionDraft>, AppError> {
    let malformed = |reason: String| AppError::InternalServerError(format!("AI response malformed: {}", reason));

    let value: Value = serde_json::from_str(strip_code_fence(raw)).map_err(|e| malformed(e.to_string()))?;

    let items = match &value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("questions") {
            Some(Value::Array(items)) => items,
            _ => return Err(malformed("missing questions array".to_string())),
        },
        _ => return Err(malformed("expected an array".to_string())),
    };

    let drafts: Vec<QuestionDraft> = items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let question = first_field(item, &["question", "text"]).and_then(Value::as_str)?;
            let options = first_field(item, &["options", "choices"])?;
            let answer = first_field(item, &["answer", "correctAnswer", "correct"])?;

            match QuestionDraft::from_loose(question, options, answer) {
                Ok(draft) => Some(draft),
                Err(reason) => {
                    tracing::warn!("Dropping generated question #{}: {}", idx + 1, reason);
                    None
                }
            }
        })
        .collect();

    if drafts.is_empty() {
        return Err(malformed("no valid questions".to_string()));
    }
    Ok(drafts)
}
