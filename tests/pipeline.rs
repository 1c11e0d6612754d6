//! End-to-end flow through the translator with a scripted model:
//! commands and button presses change preferences, and the next
//! translation request reflects them.

use std::sync::Mutex;

use tempfile::TempDir;
use tgtranslator::translator::callback::{self, CallbackAction};
use tgtranslator::translator::commands::{self, Caller, Command};
use tgtranslator::translator::prefs::Toggle;
use tgtranslator::translator::reply;
use tgtranslator::translator::style::Style;
use tgtranslator::translator::{Database, Settings, TranslateError, Translator};
use tgtranslator::zai::{self, Completion, CompletionRequest};

/// Answers every request with a fixed reply and remembers what it was asked.
struct Scripted {
    answer: Result<String, zai::Error>,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl Scripted {
    fn ok(answer: &str) -> Self {
        Self { answer: Ok(answer.to_string()), seen: Mutex::new(Vec::new()) }
    }

    fn failing() -> Self {
        Self {
            answer: Err(zai::Error::Api { status: 503, body: "overloaded".to_string() }),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn last(&self) -> CompletionRequest {
        self.seen.lock().unwrap().last().cloned().expect("no request made")
    }
}

impl Completion for Scripted {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, zai::Error> {
        self.seen.lock().unwrap().push(request.clone());
        match &self.answer {
            Ok(text) => Ok(text.clone()),
            Err(zai::Error::Api { status, body }) => {
                Err(zai::Error::Api { status: *status, body: body.clone() })
            }
            Err(_) => Err(zai::Error::Empty),
        }
    }
}

fn settings() -> Settings {
    Settings {
        default_language: "vi".to_string(),
        max_message_length: 50,
        enable_stats: true,
    }
}

fn caller(user_id: i64) -> Caller {
    Caller { user_id, first_name: "Linh".to_string(), is_admin: false }
}

#[tokio::test]
async fn test_preferences_flow_into_request() {
    let translator = Translator::new(Database::open_in_memory().unwrap(), Scripted::ok("Hello"), settings());

    callback::apply(CallbackAction::SetStyle(Style::Technical), 7, &translator).unwrap();
    callback::apply(CallbackAction::SetLanguage("en"), 7, &translator).unwrap();
    callback::apply(CallbackAction::Toggle(Toggle::AddNotes), 7, &translator).unwrap();
    commands::execute(Command::Temp("0,6".to_string()), &caller(7), &translator).unwrap();

    let translation = translator.translate(7, "  Xin chào  ").await.unwrap();
    assert_eq!(translation.original, "Xin chào");
    assert_eq!(translation.text, "Hello");

    let request = translator.client().last();
    assert_eq!(request.system, Style::Technical.system_prompt());
    assert!((request.temperature - 0.6).abs() < 1e-6);
    assert!(request.user.contains("into English"));
    assert!(request.user.contains("add a short note"));
    assert!(request.user.ends_with("Text:\nXin chào"));
}

#[tokio::test]
async fn test_reply_rendering_and_stats() {
    let translator = Translator::new(
        Database::open_in_memory().unwrap(),
        Scripted::ok("<think>hm</think>Hi & bye"),
        settings(),
    );
    callback::apply(CallbackAction::Toggle(Toggle::ShowOriginal), 1, &translator).unwrap();

    let translation = translator.translate(1, "Chào & tạm biệt").await.unwrap();
    let messages = reply::render_translation(&translation);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Hi &amp; bye"));
    assert!(messages[0].contains("<i>Chào &amp; tạm biệt</i>"));
    assert!(!messages[0].contains("think"));

    let stats = commands::execute(Command::Stats, &caller(1), &translator).unwrap();
    assert!(stats.text.contains("📝 Translations: 1"));
    assert!(stats.text.contains("Characters translated: 15"));
    assert!(stats.text.contains("⚡ Commands: 1"));
}

#[tokio::test]
async fn test_failures_are_counted_and_explained() {
    let translator = Translator::new(Database::open_in_memory().unwrap(), Scripted::failing(), settings());

    let err = translator.translate(3, "Xin chào").await.unwrap_err();
    assert!(matches!(err, TranslateError::Upstream(zai::Error::Api { status: 503, .. })));
    assert!(!reply::error_text(&err).contains("overloaded"));

    let err = translator.translate(3, &"a".repeat(51)).await.unwrap_err();
    assert!(matches!(err, TranslateError::TooLong { length: 51, max: 50 }));
    assert!(reply::error_text(&err).contains("51"));

    let usage = translator.usage(3).unwrap().unwrap();
    assert_eq!(usage.failures, 1);
    assert_eq!(usage.translations, 0);
}

#[tokio::test]
async fn test_preferences_survive_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("translator.db");

    {
        let translator = Translator::new(Database::open(&path).unwrap(), Scripted::ok("x"), settings());
        callback::apply(CallbackAction::SetStyle(Style::Casual), 9, &translator).unwrap();
        callback::apply(CallbackAction::SetLanguage("ja"), 9, &translator).unwrap();
        translator.translate(9, "hello").await.unwrap();
    }

    let translator = Translator::new(Database::open(&path).unwrap(), Scripted::ok("x"), settings());
    let prefs = translator.preferences(9).unwrap();
    assert_eq!(prefs.style, Style::Casual);
    assert_eq!(prefs.target_language, "ja");
    assert_eq!(translator.usage(9).unwrap().unwrap().translations, 1);

    let admin = Caller { user_id: 1, first_name: "Admin".to_string(), is_admin: true };
    let totals = commands::execute(Command::Usage, &admin, &translator).unwrap();
    assert!(totals.text.contains("👥 Users: 2"));
}

