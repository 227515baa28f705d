// src/utils/html.rs

use std::collections::HashSet;

/// Reduces user or model supplied text to plain text.
///
/// Every tag is removed and `<script>`/`<style>` lose their content too.
/// Entities are then decoded, so `Fish &amp; Chips` and `Fish & Chips` store
/// the same string and compare equal when graded. The pages escape on render.
pub fn plain_text(input: &str) -> String {
    let stripped = ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input.trim())
        .to_string();

    html_escape::decode_html_entities(&stripped).trim().to_string()
}
