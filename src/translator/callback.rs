//! Inline keyboard callbacks.
//!
//! Callback data is a short `kind:value` string, well under Telegram's
//! 64-byte limit: `style:casual`, `style:info`, `lang:ja`, `toggle:notes`,
//! `menu:settings`, `reset`.

use std::fmt;

use teloxide::utils::html::escape;
use tracing::info;

use crate::translator::commands::{self, Reply};
use crate::translator::engine::Translator;
use crate::translator::language::Language;
use crate::translator::prefs::Toggle;
use crate::translator::style::Style;
use crate::zai::Completion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Style,
    Language,
    Settings,
    Help,
}

impl Menu {
    fn key(self) -> &'static str {
        match self {
            Menu::Style => "style",
            Menu::Language => "language",
            Menu::Settings => "settings",
            Menu::Help => "help",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    SetStyle(Style),
    StyleInfo,
    /// Always a supported language code.
    SetLanguage(&'static str),
    Toggle(Toggle),
    Menu(Menu),
    Reset,
}

impl CallbackAction {
    /// Parse callback data; `None` for anything we did not produce.
    pub fn parse(data: &str) -> Option<Self> {
        if data == "reset" {
            return Some(CallbackAction::Reset);
        }
        let (kind, value) = data.split_once(':')?;
        match kind {
            "style" if value == "info" => Some(CallbackAction::StyleInfo),
            "style" => value.parse().ok().map(CallbackAction::SetStyle),
            "lang" => Language::from_code(value).map(|l| CallbackAction::SetLanguage(l.code)),
            "toggle" => Toggle::from_key(value).map(CallbackAction::Toggle),
            "menu" => match value {
                "style" => Some(CallbackAction::Menu(Menu::Style)),
                "language" => Some(CallbackAction::Menu(Menu::Language)),
                "settings" => Some(CallbackAction::Menu(Menu::Settings)),
                "help" => Some(CallbackAction::Menu(Menu::Help)),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::SetStyle(style) => write!(f, "style:{}", style.key()),
            CallbackAction::StyleInfo => write!(f, "style:info"),
            CallbackAction::SetLanguage(code) => write!(f, "lang:{code}"),
            CallbackAction::Toggle(t) => write!(f, "toggle:{}", t.key()),
            CallbackAction::Menu(m) => write!(f, "menu:{}", m.key()),
            CallbackAction::Reset => write!(f, "reset"),
        }
    }
}

/// What to show after a button press: a short popup and/or new message content.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackOutcome {
    pub toast: Option<String>,
    pub reply: Option<Reply>,
}

pub fn apply<C: Completion>(
    action: CallbackAction,
    user_id: i64,
    translator: &Translator<C>,
) -> rusqlite::Result<CallbackOutcome> {
    let outcome = match action {
        CallbackAction::SetStyle(style) => {
            translator.set_style(user_id, style)?;
            info!("User {user_id} chose style {style}");
            CallbackOutcome {
                toast: Some(format!("Style: {}", style.name())),
                reply: Some(Reply::text(format!(
                    "✅ Style set to <b>{}</b>\n<i>{}</i>",
                    style.label(),
                    style.description()
                ))),
            }
        }
        CallbackAction::StyleInfo => CallbackOutcome { toast: None, reply: Some(commands::style_info()) },
        CallbackAction::SetLanguage(code) => match translator.set_language(user_id, code)? {
            Some(prefs) => {
                let label = Language::from_code(&prefs.target_language)
                    .map(|l| l.label())
                    .unwrap_or_else(|| prefs.target_language.clone());
                info!("User {user_id} chose language {code}");
                CallbackOutcome {
                    toast: Some(format!("Language: {label}")),
                    reply: Some(Reply::text(format!("✅ Target language: <b>{}</b>", escape(&label)))),
                }
            }
            None => CallbackOutcome { toast: Some("Unsupported language".to_string()), reply: None },
        },
        CallbackAction::Toggle(toggle) => {
            let prefs = translator.toggle(user_id, toggle)?;
            let state = if prefs.get(toggle) { "on" } else { "off" };
            CallbackOutcome {
                toast: Some(format!("{}: {state}", toggle.label())),
                reply: Some(commands::settings_view(&prefs)),
            }
        }
        CallbackAction::Menu(menu) => {
            let reply = match menu {
                Menu::Style => commands::style_menu(&translator.preferences(user_id)?),
                Menu::Language => commands::language_menu(&translator.preferences(user_id)?),
                Menu::Settings => commands::settings_view(&translator.preferences(user_id)?),
                Menu::Help => commands::help(translator.settings().max_message_length),
            };
            CallbackOutcome { toast: None, reply: Some(reply) }
        }
        CallbackAction::Reset => {
            translator.reset(user_id)?;
            CallbackOutcome {
                toast: Some("Settings reset".to_string()),
                reply: Some(Reply::text("🔄 <b>Settings restored to defaults.</b>")),
            }
        }
    };

    Ok(outcome)
}
