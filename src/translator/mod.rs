//! Translator module - relays Telegram text to the model and formats replies.

pub mod callback;
pub mod commands;
pub mod database;
pub mod engine;
pub mod language;
pub mod prefs;
pub mod prompt;
pub mod reply;
pub mod style;
pub mod telegram;

pub use callback::{CallbackAction, CallbackOutcome};
pub use commands::{Caller, Command, Reply};
pub use database::Database;
pub use engine::{Settings, TranslateError, Translation, Translator};
pub use telegram::TelegramClient;
