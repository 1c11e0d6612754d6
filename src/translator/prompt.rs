//! Prompt construction and model output cleanup.

use std::sync::LazyLock;

use regex::Regex;

use crate::translator::language::Language;
use crate::translator::prefs::Preferences;
use crate::zai::CompletionRequest;

/// GLM reasoning models may prepend their chain of thought.
static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("static regex"));

/// Build the request for translating `text` under `prefs`.
pub fn build(text: &str, prefs: &Preferences, max_tokens: u32) -> CompletionRequest {
    let target = Language::from_code(&prefs.target_language)
        .map(|l| l.name)
        .unwrap_or("English");

    let mut instructions = vec![format!("Translate the following text into {target}.")];
    if prefs.preserve_format {
        instructions.push(
            "Keep the original formatting: line breaks, lists, emphasis, code blocks and links."
                .to_string(),
        );
    }
    if prefs.add_notes {
        instructions.push(
            "Where a term is ambiguous or has no direct equivalent, add a short note in parentheses."
                .to_string(),
        );
    }
    instructions.push("Reply with the translation only, without commentary.".to_string());

    CompletionRequest {
        system: prefs.style.system_prompt().to_string(),
        user: format!("{}\n\nText:\n{}", instructions.join(" "), text),
        temperature: prefs.temperature.value(),
        max_tokens,
    }
}

/// Strip reasoning blocks and surrounding whitespace from a completion.
pub fn clean_response(raw: &str) -> String {
    THINK_BLOCK.replace_all(raw, "").trim().to_string()
}
