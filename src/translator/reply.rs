//! Telegram HTML formatting for translation results.

use teloxide::utils::html::escape;

use crate::translator::engine::{TranslateError, Translation};
use crate::translator::language::Language;
use crate::zai;

/// Telegram's limit on message text, in characters.
pub const TELEGRAM_MAX_CHARS: usize = 4096;

pub const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━";

/// Room left for the style/language header in the first message.
const BODY_CHUNK_CHARS: usize = TELEGRAM_MAX_CHARS - 256;

fn header(translation: &Translation) -> String {
    let prefs = &translation.prefs;
    let language = Language::from_code(&prefs.target_language)
        .map(|l| l.label())
        .unwrap_or_else(|| prefs.target_language.clone());

    format!(
        "{} <b>Style:</b> {}\n🌍 <b>Language:</b> {}\n{DIVIDER}",
        prefs.style.emoji(),
        prefs.style.name(),
        escape(&language)
    )
}

fn original_heading() -> String {
    format!("\n{DIVIDER}\n📄 <b>Original:</b>")
}

/// The whole result as a single HTML message.
pub fn format_translation(translation: &Translation) -> String {
    let mut out = format!("{}\n{}", header(translation), escape(&translation.text));
    if translation.prefs.show_original {
        out.push_str(&format!(
            "\n{}\n<i>{}</i>",
            original_heading(),
            escape(&translation.original)
        ));
    }
    out
}

/// The result as one or more HTML messages, each within Telegram's limit.
///
/// Text is split before escaping so no entity or tag is cut in half.
pub fn render_translation(translation: &Translation) -> Vec<String> {
    let visible = translation.text.chars().count()
        + if translation.prefs.show_original {
            translation.original.chars().count()
        } else {
            0
        };
    if visible < BODY_CHUNK_CHARS {
        return vec![format_translation(translation)];
    }

    let mut messages: Vec<String> = split_message(&translation.text, BODY_CHUNK_CHARS)
        .iter()
        .map(|chunk| escape(chunk))
        .collect();
    messages[0] = format!("{}\n{}", header(translation), messages[0]);

    if translation.prefs.show_original {
        for (i, chunk) in split_message(&translation.original, BODY_CHUNK_CHARS).iter().enumerate() {
            let body = format!("<i>{}</i>", escape(chunk));
            if i == 0 {
                messages.push(format!("{}\n{body}", original_heading().trim_start()));
            } else {
                messages.push(body);
            }
        }
    }

    messages
}

/// What the user sees when a translation does not go through.
pub fn error_text(error: &TranslateError) -> String {
    match error {
        TranslateError::EmptyInput => "✏️ Send me some text and I will translate it.".to_string(),
        TranslateError::TooLong { length, max } => format!(
            "⚠️ <b>Text too long</b>\n\nYour message has {length} characters, the limit is {max}. \
             Please split it into smaller parts."
        ),
        TranslateError::Upstream(zai::Error::Filtered) => {
            "⚠️ The translation service declined this text.".to_string()
        }
        TranslateError::Upstream(_) | TranslateError::EmptyResponse => {
            "❌ Translation failed. Please try again in a moment.".to_string()
        }
        TranslateError::Storage(_) => "❌ Something went wrong on our side. Please try again.".to_string(),
    }
}

/// Split `text` into chunks of at most `limit` characters, preferring to break
/// after a newline. Never splits inside a character and never yields a blank
/// chunk unless `text` itself is blank. Expects unescaped text.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    assert!(limit > 0, "chunk limit must be positive");

    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > limit {
        // Byte offset just past the `limit`th character.
        let hard_end = rest
            .char_indices()
            .nth(limit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());

        let end = match rest[..hard_end].rfind('\n') {
            Some(pos) if pos > 0 => pos + 1,
            _ => hard_end,
        };

        let chunk = rest[..end].trim_end_matches('\n');
        if !chunk.trim().is_empty() {
            chunks.push(chunk.to_string());
        }
        // Blank lines at a boundary would otherwise become an empty message.
        rest = rest[end..].trim_start_matches('\n');
    }

    if !rest.trim().is_empty() || chunks.is_empty() {
        chunks.push(rest.to_string());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::prefs::{Preferences, Toggle};

    fn translation(text: &str, original: &str, show_original: bool) -> Translation {
        let mut prefs = Preferences::with_language("en");
        if show_original {
            prefs.toggle(Toggle::ShowOriginal);
        }
        Translation {
            original: original.to_string(),
            text: text.to_string(),
            prefs,
        }
    }

    #[test]
    fn test_format_without_original() {
        let out = format_translation(&translation("Hello", "Xin chào", false));
        assert!(out.contains("💼 <b>Style:</b> Professional"));
        assert!(out.contains("🇬🇧 English"));
        assert!(out.ends_with("Hello"));
        assert!(!out.contains("Xin chào"));
    }

    #[test]
    fn test_format_with_original() {
        let out = format_translation(&translation("Hello", "Xin chào", true));
        assert!(out.contains("<b>Original:</b>"));
        assert!(out.ends_with("<i>Xin chào</i>"));
        assert_eq!(out.matches(DIVIDER).count(), 2);
    }

    #[test]
    fn test_format_escapes_html() {
        let out = format_translation(&translation("a <b> & c", "<script>", true));
        assert!(out.contains("a &lt;b&gt; &amp; c"));
        assert!(out.contains("<i>&lt;script&gt;</i>"));
    }

    #[test]
    fn test_render_short_is_single_message() {
        let t = translation("Hello", "Xin chào", true);
        assert_eq!(render_translation(&t), vec![format_translation(&t)]);
    }

    #[test]
    fn test_render_long_translation() {
        let line = "word & word\n";
        let text = line.repeat(700);
        let t = translation(&text, "short", true);
        let messages = render_translation(&t);

        assert!(messages.len() >= 3);
        assert!(messages[0].contains("<b>Style:</b>"));
        for message in &messages {
            assert!(message.chars().count() <= TELEGRAM_MAX_CHARS * 2);
            assert!(!message.contains("& "), "unescaped ampersand");
        }
        let last = messages.last().unwrap();
        assert!(last.contains("<b>Original:</b>"));
        assert!(last.ends_with("<i>short</i>"));
    }

    #[test]
    fn test_render_long_without_original() {
        let text = "x".repeat(BODY_CHUNK_CHARS * 2);
        let messages = render_translation(&translation(&text, "orig", false));
        assert_eq!(messages.len(), 2);
        assert!(!messages.iter().any(|m| m.contains("orig")));
    }

    #[test]
    fn test_error_text() {
        let too_long = error_text(&TranslateError::TooLong { length: 5000, max: 4000 });
        assert!(too_long.contains("5000"));
        assert!(too_long.contains("4000"));

        let filtered = error_text(&TranslateError::Upstream(zai::Error::Filtered));
        assert!(filtered.contains("declined"));

        let api = error_text(&TranslateError::Upstream(zai::Error::Api {
            status: 500,
            body: "<secret internals>".to_string(),
        }));
        assert!(!api.contains("secret"));
    }

    #[test]
    fn test_split_short_message() {
        assert_eq!(split_message("hello", 10), vec!["hello"]);
        assert_eq!(split_message("", 10), vec![""]);
    }

    #[test]
    fn test_split_prefers_newlines() {
        let chunks = split_message("aaaa\nbbbb\ncccc", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn test_split_skips_blank_runs_at_boundary() {
        assert_eq!(split_message("aaa\n\n\n\nbbbbbb", 4), vec!["aaa", "bbbb", "bb"]);
        assert_eq!(split_message("aa\n   \n\nbb", 3), vec!["aa", "bb"]);
    }

    #[test]
    fn test_render_blank_lines_at_boundary() {
        let text = format!("{}\n\n\n{}", "x".repeat(BODY_CHUNK_CHARS - 1), "y".repeat(4000));
        let messages = render_translation(&translation(&text, "orig", true));

        assert_eq!(messages.len(), 4);
        for message in &messages {
            assert!(!message.trim().is_empty());
            assert!(message.chars().count() <= TELEGRAM_MAX_CHARS);
        }
        assert!(messages[1].starts_with('y'));
        assert!(messages[3].contains("<i>orig</i>"));
    }

    #[test]
    fn test_split_hard_when_no_newline() {
        let chunks = split_message("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let text = "日本語のテキスト".repeat(3);
        let chunks = split_message(&text, 5);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 5);
        }
        assert_eq!(chunks.concat(), text);
    }
}
