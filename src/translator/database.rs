//! Persistent SQLite storage for preferences and usage counters.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{info, warn};

use crate::translator::language::Language;
use crate::translator::prefs::{Preferences, Temperature};
use crate::translator::style::Style;

/// Something worth counting in a user's usage row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageEvent {
    Translation { characters: usize },
    Command,
    Failure,
}

/// Cumulative counters for one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Usage {
    pub translations: u64,
    pub commands: u64,
    pub failures: u64,
    pub characters: u64,
    pub first_use: DateTime<Utc>,
    pub last_use: DateTime<Utc>,
}

/// Aggregate counters across all users.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Totals {
    pub users: u64,
    pub translations: u64,
    pub commands: u64,
    pub failures: u64,
    pub characters: u64,
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let db = Self::init(Connection::open(path)?)?;
        let totals = db.totals()?;
        info!(
            "Loaded database from {:?} ({} users, {} translations)",
            path, totals.users, totals.translations
        );
        Ok(db)
    }

    fn init(conn: Connection) -> rusqlite::Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                user_id INTEGER PRIMARY KEY,
                style TEXT NOT NULL,
                temperature REAL NOT NULL,
                preserve_format INTEGER NOT NULL,
                add_notes INTEGER NOT NULL,
                target_language TEXT NOT NULL,
                show_original INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS usage (
                user_id INTEGER PRIMARY KEY,
                translations INTEGER NOT NULL DEFAULT 0,
                commands INTEGER NOT NULL DEFAULT 0,
                failures INTEGER NOT NULL DEFAULT 0,
                characters INTEGER NOT NULL DEFAULT 0,
                first_use TEXT NOT NULL,
                last_use TEXT NOT NULL
            );
        "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    // ==================== PREFERENCES ====================

    /// Fetch a user's preferences, creating the record from `defaults` on
    /// first contact.
    pub fn preferences(&self, user_id: i64, defaults: &Preferences) -> rusqlite::Result<Preferences> {
        let conn = self.conn.lock().expect("database lock poisoned");

        let existing = conn
            .query_row(
                "SELECT style, temperature, preserve_format, add_notes, target_language, show_original
                 FROM preferences WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok(StoredPreferences {
                        style: row.get(0)?,
                        temperature: row.get(1)?,
                        preserve_format: row.get(2)?,
                        add_notes: row.get(3)?,
                        target_language: row.get(4)?,
                        show_original: row.get(5)?,
                    })
                },
            )
            .optional()?;

        match existing {
            Some(stored) => Ok(stored.into_preferences(user_id, defaults)),
            None => {
                insert_preferences(&conn, user_id, defaults)?;
                Ok(defaults.clone())
            }
        }
    }

    pub fn save_preferences(&self, user_id: i64, prefs: &Preferences) -> rusqlite::Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        insert_preferences(&conn, user_id, prefs)
    }

    /// Drop the stored record and start over from `defaults`.
    pub fn reset_preferences(&self, user_id: i64, defaults: &Preferences) -> rusqlite::Result<()> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM preferences WHERE user_id = ?1", params![user_id])?;
        insert_preferences(&tx, user_id, defaults)?;
        tx.commit()
    }

    // ==================== USAGE ====================

    pub fn record(&self, user_id: i64, event: UsageEvent, now: DateTime<Utc>) -> rusqlite::Result<()> {
        let (translations, commands, failures, characters) = match event {
            UsageEvent::Translation { characters } => (1, 0, 0, characters as i64),
            UsageEvent::Command => (0, 1, 0, 0),
            UsageEvent::Failure => (0, 0, 1, 0),
        };
        let now = now.to_rfc3339();

        let conn = self.conn.lock().expect("database lock poisoned");
        conn.execute(
            "INSERT INTO usage (user_id, translations, commands, failures, characters, first_use, last_use)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(user_id) DO UPDATE SET
                translations = translations + ?2,
                commands = commands + ?3,
                failures = failures + ?4,
                characters = characters + ?5,
                last_use = ?6",
            params![user_id, translations, commands, failures, characters, now],
        )?;
        Ok(())
    }

    pub fn usage(&self, user_id: i64) -> rusqlite::Result<Option<Usage>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.query_row(
            "SELECT translations, commands, failures, characters, first_use, last_use
             FROM usage WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Usage {
                    translations: row.get::<_, i64>(0)? as u64,
                    commands: row.get::<_, i64>(1)? as u64,
                    failures: row.get::<_, i64>(2)? as u64,
                    characters: row.get::<_, i64>(3)? as u64,
                    first_use: parse_timestamp(&row.get::<_, String>(4)?),
                    last_use: parse_timestamp(&row.get::<_, String>(5)?),
                })
            },
        )
        .optional()
    }

    pub fn totals(&self) -> rusqlite::Result<Totals> {
        let conn = self.conn.lock().expect("database lock poisoned");
        conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(translations), 0),
                    COALESCE(SUM(commands), 0),
                    COALESCE(SUM(failures), 0),
                    COALESCE(SUM(characters), 0)
             FROM usage",
            [],
            |row| {
                Ok(Totals {
                    users: row.get::<_, i64>(0)? as u64,
                    translations: row.get::<_, i64>(1)? as u64,
                    commands: row.get::<_, i64>(2)? as u64,
                    failures: row.get::<_, i64>(3)? as u64,
                    characters: row.get::<_, i64>(4)? as u64,
                })
            },
        )
    }
}

fn insert_preferences(conn: &Connection, user_id: i64, prefs: &Preferences) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO preferences
            (user_id, style, temperature, preserve_format, add_notes, target_language, show_original)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user_id,
            prefs.style.key(),
            f64::from(prefs.temperature.value()),
            prefs.preserve_format,
            prefs.add_notes,
            prefs.target_language,
            prefs.show_original,
        ],
    )?;
    Ok(())
}

/// Raw row, validated on the way out.
struct StoredPreferences {
    style: String,
    temperature: f64,
    preserve_format: bool,
    add_notes: bool,
    target_language: String,
    show_original: bool,
}

impl StoredPreferences {
    fn into_preferences(self, user_id: i64, defaults: &Preferences) -> Preferences {
        let style = self.style.parse::<Style>().unwrap_or_else(|e| {
            warn!("User {user_id}: {e}, using {}", defaults.style);
            defaults.style
        });
        let temperature = Temperature::new(self.temperature as f32).unwrap_or_else(|e| {
            warn!("User {user_id}: stored temperature {e}, using {}", defaults.temperature);
            defaults.temperature
        });
        let target_language = match Language::from_code(&self.target_language) {
            Some(lang) => lang.code.to_string(),
            None => {
                warn!(
                    "User {user_id}: unsupported language '{}', using {}",
                    self.target_language, defaults.target_language
                );
                defaults.target_language.clone()
            }
        };

        Preferences {
            style,
            temperature,
            preserve_format: self.preserve_format,
            add_notes: self.add_notes,
            target_language,
            show_original: self.show_original,
        }
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}
