//! Translation pipeline: preferences lookup, one model call, usage accounting.

use std::fmt;

use chrono::Utc;
use tracing::{info, warn};

use crate::translator::database::{Database, Totals, Usage, UsageEvent};
use crate::translator::language::Language;
use crate::translator::prefs::{Preferences, Temperature, Toggle};
use crate::translator::prompt;
use crate::translator::style::Style;
use crate::zai::{self, Completion};

/// Engine knobs taken from the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub default_language: String,
    /// Limit in characters, also used as the completion token budget.
    pub max_message_length: usize,
    pub enable_stats: bool,
}

/// A finished translation and the preferences it was made with.
#[derive(Debug, Clone)]
pub struct Translation {
    pub original: String,
    pub text: String,
    pub prefs: Preferences,
}

#[derive(Debug)]
pub enum TranslateError {
    EmptyInput,
    TooLong { length: usize, max: usize },
    Upstream(zai::Error),
    EmptyResponse,
    Storage(rusqlite::Error),
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "nothing to translate"),
            Self::TooLong { length, max } => {
                write!(f, "text is {length} characters, the limit is {max}")
            }
            Self::Upstream(e) => write!(f, "translation service failed: {e}"),
            Self::EmptyResponse => write!(f, "translation service returned no text"),
            Self::Storage(e) => write!(f, "preference storage failed: {e}"),
        }
    }
}

impl std::error::Error for TranslateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Upstream(e) => Some(e),
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for TranslateError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e)
    }
}

/// Completion budget for a request; the character limit doubles as the token cap.
fn max_tokens(max_message_length: usize) -> u32 {
    u32::try_from(max_message_length).unwrap_or(u32::MAX)
}

pub struct Translator<C> {
    database: Database,
    client: C,
    settings: Settings,
}

impl<C: Completion> Translator<C> {
    pub fn new(database: Database, client: C, settings: Settings) -> Self {
        Self { database, client, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Preferences a brand-new user starts with.
    pub fn defaults(&self) -> Preferences {
        Preferences::with_language(&self.settings.default_language)
    }

    /// Translate `text` for `user_id` with one call to the model.
    pub async fn translate(&self, user_id: i64, text: &str) -> Result<Translation, TranslateError> {
        let result = self.run(user_id, text).await;

        match &result {
            Ok(translation) => {
                info!("Translated {} chars for user {user_id}", translation.original.chars().count());
                self.record(user_id, UsageEvent::Translation {
                    characters: translation.original.chars().count(),
                });
            }
            // Rejected before any work was done; not a failure of the service.
            Err(TranslateError::EmptyInput | TranslateError::TooLong { .. }) => {}
            Err(e) => {
                warn!("Translation failed for user {user_id}: {e}");
                self.record(user_id, UsageEvent::Failure);
            }
        }

        result
    }

    async fn run(&self, user_id: i64, text: &str) -> Result<Translation, TranslateError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TranslateError::EmptyInput);
        }
        let length = text.chars().count();
        if length > self.settings.max_message_length {
            return Err(TranslateError::TooLong { length, max: self.settings.max_message_length });
        }

        let prefs = self.preferences(user_id)?;
        let request = prompt::build(text, &prefs, max_tokens(self.settings.max_message_length));

        let raw = self.client.complete(&request).await.map_err(TranslateError::Upstream)?;
        let translated = prompt::clean_response(&raw);
        if translated.is_empty() {
            return Err(TranslateError::EmptyResponse);
        }

        Ok(Translation {
            original: text.to_string(),
            text: translated,
            prefs,
        })
    }

    // ==================== PREFERENCES ====================

    pub fn preferences(&self, user_id: i64) -> rusqlite::Result<Preferences> {
        self.database.preferences(user_id, &self.defaults())
    }

    fn update(&self, user_id: i64, change: impl FnOnce(&mut Preferences)) -> rusqlite::Result<Preferences> {
        let mut prefs = self.preferences(user_id)?;
        change(&mut prefs);
        self.database.save_preferences(user_id, &prefs)?;
        Ok(prefs)
    }

    pub fn set_style(&self, user_id: i64, style: Style) -> rusqlite::Result<Preferences> {
        self.update(user_id, |p| p.style = style)
    }

    /// Returns `None` when `code` is not a supported language.
    pub fn set_language(&self, user_id: i64, code: &str) -> rusqlite::Result<Option<Preferences>> {
        let Some(language) = Language::from_code(code) else {
            return Ok(None);
        };
        self.update(user_id, |p| p.target_language = language.code.to_string())
            .map(Some)
    }

    pub fn set_temperature(&self, user_id: i64, temperature: Temperature) -> rusqlite::Result<Preferences> {
        self.update(user_id, |p| p.temperature = temperature)
    }

    pub fn toggle(&self, user_id: i64, toggle: Toggle) -> rusqlite::Result<Preferences> {
        self.update(user_id, |p| {
            p.toggle(toggle);
        })
    }

    pub fn reset(&self, user_id: i64) -> rusqlite::Result<Preferences> {
        let defaults = self.defaults();
        self.database.reset_preferences(user_id, &defaults)?;
        info!("Reset preferences for user {user_id}");
        Ok(defaults)
    }

    // ==================== USAGE ====================

    pub fn record_command(&self, user_id: i64) {
        self.record(user_id, UsageEvent::Command);
    }

    fn record(&self, user_id: i64, event: UsageEvent) {
        if !self.settings.enable_stats {
            return;
        }
        if let Err(e) = self.database.record(user_id, event, Utc::now()) {
            warn!("Failed to record {event:?} for user {user_id}: {e}");
        }
    }

    pub fn usage(&self, user_id: i64) -> rusqlite::Result<Option<Usage>> {
        self.database.usage(user_id)
    }

    pub fn totals(&self) -> rusqlite::Result<Totals> {
        self.database.totals()
    }
}
