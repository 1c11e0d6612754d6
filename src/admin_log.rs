//! Forwards warnings and errors to an admin chat.

use std::fmt::Write as _;
use std::time::Duration;

use teloxide::prelude::*;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const FLUSH_INTERVAL: Duration = Duration::from_secs(3);
const MAX_BATCH: usize = 20;
const MAX_CHARS: usize = 4000;

pub struct AdminLogLayer {
    tx: mpsc::UnboundedSender<String>,
}

impl AdminLogLayer {
    /// Must be called inside a tokio runtime.
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(forward(bot, chat_id, rx));
        Self { tx }
    }
}

/// Collects lines and sends them in batches so a burst of failures
/// does not turn into a burst of Telegram messages.
async fn forward(bot: Bot, chat_id: ChatId, mut rx: mpsc::UnboundedReceiver<String>) {
    let mut pending: Vec<String> = Vec::new();
    let mut ticker = tokio::time::interval(FLUSH_INTERVAL);

    loop {
        tokio::select! {
            line = rx.recv() => match line {
                Some(line) => {
                    pending.push(line);
                    if pending.len() >= MAX_BATCH {
                        flush(&bot, chat_id, &mut pending).await;
                    }
                }
                None => {
                    flush(&bot, chat_id, &mut pending).await;
                    break;
                }
            },
            _ = ticker.tick() => flush(&bot, chat_id, &mut pending).await,
        }
    }
}

async fn flush(bot: &Bot, chat_id: ChatId, pending: &mut Vec<String>) {
    if pending.is_empty() {
        return;
    }
    let text = truncate(&pending.join("\n"), MAX_CHARS);
    pending.clear();
    // Logging here would feed back into this layer.
    if let Err(e) = bot.send_message(chat_id, text).await {
        eprintln!("Failed to forward log to admin chat: {e}");
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: String,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

fn format_event(level: Level, target: &str, collector: FieldCollector) -> String {
    let icon = if level == Level::ERROR { "❌" } else { "⚠️" };
    format!("{icon} [{target}] {}{}", collector.message, collector.fields)
}

impl<S: Subscriber> Layer<S> for AdminLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = *metadata.level();
        if level > Level::WARN {
            return;
        }
        // HTTP client internals are noisy and unactionable from a chat.
        if !metadata.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return;
        }

        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        if self.tx.send(format_event(level, metadata.target(), collector)).is_err() {
            eprintln!("Admin log channel closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("héllo", 5), "héllo");
        assert_eq!(truncate("héllo", 2), "hé…");
    }

    #[test]
    fn test_format_event() {
        let collector = FieldCollector {
            message: "Translation failed".to_string(),
            fields: " user_id=42".to_string(),
        };
        assert_eq!(
            format_event(Level::ERROR, "tgtranslator::translator", collector),
            "❌ [tgtranslator::translator] Translation failed user_id=42"
        );

        let warn = format_event(Level::WARN, "t", FieldCollector::default());
        assert!(warn.starts_with("⚠️ [t]"));
    }
}
