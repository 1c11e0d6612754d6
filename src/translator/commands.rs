//! Slash commands and the views they render.
//!
//! Everything here produces a [`Reply`] instead of talking to Telegram, so the
//! handlers in `main.rs` stay thin and the command behavior is unit-testable.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands;
use teloxide::utils::html::escape;
use tracing::info;

use crate::translator::callback::{CallbackAction, Menu};
use crate::translator::database::{Totals, Usage};
use crate::translator::engine::Translator;
use crate::translator::language::Language;
use crate::translator::prefs::{Preferences, Temperature, Toggle};
use crate::translator::reply::DIVIDER;
use crate::translator::style::Style;
use crate::zai::Completion;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Commands:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "about this bot")]
    About,
    #[command(description = "choose a translation style")]
    Style,
    #[command(description = "choose the target language")]
    Language,
    #[command(description = "show and change your settings")]
    Settings,
    #[command(description = "set creativity, e.g. /temp 0.5")]
    Temp(String),
    #[command(description = "your usage statistics")]
    Stats,
    #[command(description = "restore default settings")]
    Reset,
    #[command(hide)]
    Usage,
}

/// Text plus an optional inline keyboard, ready to send as HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), keyboard: None }
    }

    fn with_keyboard(text: impl Into<String>, rows: Vec<Vec<InlineKeyboardButton>>) -> Self {
        Self { text: text.into(), keyboard: Some(InlineKeyboardMarkup::new(rows)) }
    }
}

/// Who sent the command.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: i64,
    pub first_name: String,
    pub is_admin: bool,
}

/// What to do with a message that did not parse as a known command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'a> {
    Translate(&'a str),
    /// Stickers, photos and the like sent in a private chat.
    NotText,
    UnknownCommand,
    Ignore,
}

/// Text is translated in any chat. Hints about non-text messages and
/// unknown commands are only given in private chats; in groups those
/// are usually meant for someone else.
pub fn route_message(text: Option<&str>, private: bool) -> Inbound<'_> {
    match text {
        Some(t) if t.starts_with('/') => {
            if private { Inbound::UnknownCommand } else { Inbound::Ignore }
        }
        Some(t) => Inbound::Translate(t),
        None if private => Inbound::NotText,
        None => Inbound::Ignore,
    }
}

pub fn execute<C: Completion>(
    command: Command,
    caller: &Caller,
    translator: &Translator<C>,
) -> rusqlite::Result<Reply> {
    let user_id = caller.user_id;
    translator.record_command(user_id);

    let reply = match command {
        Command::Start => welcome(&caller.first_name),
        Command::Help => help(translator.settings().max_message_length),
        Command::About => about(),
        Command::Style => style_menu(&translator.preferences(user_id)?),
        Command::Language => language_menu(&translator.preferences(user_id)?),
        Command::Settings => settings_view(&translator.preferences(user_id)?),
        Command::Temp(arg) => temperature(arg.trim(), user_id, translator)?,
        Command::Stats => {
            if !translator.settings().enable_stats {
                Reply::text("📊 Statistics are disabled on this bot.")
            } else {
                match translator.usage(user_id)? {
                    Some(usage) => stats_view(&usage, &translator.preferences(user_id)?),
                    None => Reply::text("📊 No statistics yet. Send some text to translate!"),
                }
            }
        }
        Command::Reset => {
            translator.reset(user_id)?;
            Reply::text("🔄 <b>Settings restored to defaults.</b>")
        }
        Command::Usage => {
            if caller.is_admin {
                totals_view(&translator.totals()?)
            } else {
                Reply::text("This command is for bot administrators.")
            }
        }
    };

    Ok(reply)
}

fn temperature<C: Completion>(arg: &str, user_id: i64, translator: &Translator<C>) -> rusqlite::Result<Reply> {
    if arg.is_empty() {
        let current = translator.preferences(user_id)?.temperature;
        return Ok(Reply::text(format!(
            "🌡️ <b>Creativity</b>\n\n\
             Usage: <code>/temp &lt;value&gt;</code> with a value from {:.1} to {:.1}.\n\n\
             • 0.1-0.3: literal, close to the source\n\
             • 0.4-0.6: balanced\n\
             • 0.7-1.0: free and creative\n\n\
             Current value: <code>{current}</code>",
            Temperature::MIN,
            Temperature::MAX,
        )));
    }

    match Temperature::parse(arg) {
        Ok(t) => {
            translator.set_temperature(user_id, t)?;
            info!("User {user_id} set temperature {t}");
            Ok(Reply::text(format!("✅ Creativity set to <b>{t}</b>.")))
        }
        Err(e) => Ok(Reply::text(format!("⚠️ {}", escape(&e.to_string())))),
    }
}

// ==================== VIEWS ====================

fn button(label: impl Into<String>, action: CallbackAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.to_string())
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

pub fn welcome(first_name: &str) -> Reply {
    Reply::with_keyboard(
        format!(
            "🌐 <b>Hi {}!</b>\n\n\
             Send me any text and I will translate it.\n\n\
             Pick a style and a target language below, or see /help for all commands.",
            escape(first_name)
        ),
        vec![
            vec![button("🎨 Style", CallbackAction::Menu(Menu::Style))],
            vec![button("🌍 Language", CallbackAction::Menu(Menu::Language))],
            vec![button("📚 Help", CallbackAction::Menu(Menu::Help))],
        ],
    )
}

pub fn help(max_message_length: usize) -> Reply {
    let styles: Vec<String> = Style::ALL
        .iter()
        .map(|s| format!("{} {}: {}", s.emoji(), s.name(), s.description()))
        .collect();

    Reply::text(format!(
        "📚 <b>How to use</b>\n\n\
         Send text in this chat and the translation comes back as a reply.\n\
         Messages up to {max_message_length} characters are accepted.\n\n\
         {}\n\n\
         <b>Styles</b>\n{}",
        escape(&Command::descriptions().to_string()),
        styles.join("\n")
    ))
}

pub fn about() -> Reply {
    Reply::text(format!(
        "🤖 <b>Translator bot</b> v{}\n{DIVIDER}\n\n\
         Translation by Z.AI GLM models.\n\
         Your style, language and display settings are remembered between sessions.",
        env!("CARGO_PKG_VERSION")
    ))
}

pub fn style_menu(prefs: &Preferences) -> Reply {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = Style::ALL
        .iter()
        .map(|&style| {
            let check = if style == prefs.style { "✅ " } else { "" };
            vec![button(format!("{check}{}", style.label()), CallbackAction::SetStyle(style))]
        })
        .collect();
    rows.push(vec![button("ℹ️ Style details", CallbackAction::StyleInfo)]);

    Reply::with_keyboard("🎨 <b>Choose a translation style:</b>", rows)
}

pub fn style_info() -> Reply {
    let entries: Vec<String> = Style::ALL
        .iter()
        .map(|s| format!("{}\n<i>{}</i> (temperature {:.1})", s.label(), s.description(), s.temperature()))
        .collect();
    Reply::text(format!("📖 <b>Translation styles</b>\n\n{}", entries.join("\n\n")))
}

pub fn language_menu(prefs: &Preferences) -> Reply {
    let rows: Vec<Vec<InlineKeyboardButton>> = Language::all()
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|lang| {
                    let check = if lang.code == prefs.target_language { "✅ " } else { "" };
                    button(format!("{check}{}", lang.label()), CallbackAction::SetLanguage(lang.code))
                })
                .collect::<Vec<_>>()
        })
        .collect();

    Reply::with_keyboard("🌍 <b>Choose the target language:</b>", rows)
}

pub fn settings_view(prefs: &Preferences) -> Reply {
    let language = Language::from_code(&prefs.target_language)
        .map(|l| l.label())
        .unwrap_or_else(|| prefs.target_language.clone());

    let text = format!(
        "⚙️ <b>Current settings</b>\n{DIVIDER}\n\n\
         🎨 Style: {}\n\
         🌍 Language: {}\n\
         🌡️ Creativity: {}\n\
         📝 {}: {}\n\
         📌 {}: {}\n\
         👁️ {}: {}",
        prefs.style.label(),
        escape(&language),
        prefs.temperature,
        Toggle::PreserveFormat.label(),
        on_off(prefs.preserve_format),
        Toggle::AddNotes.label(),
        on_off(prefs.add_notes),
        Toggle::ShowOriginal.label(),
        on_off(prefs.show_original),
    );

    let toggle = |t: Toggle| {
        button(format!("{}: {}", t.label(), on_off(prefs.get(t))), CallbackAction::Toggle(t))
    };

    Reply::with_keyboard(
        text,
        vec![
            vec![toggle(Toggle::PreserveFormat), toggle(Toggle::AddNotes)],
            vec![toggle(Toggle::ShowOriginal)],
            vec![
                button("🎨 Style", CallbackAction::Menu(Menu::Style)),
                button("🌍 Language", CallbackAction::Menu(Menu::Language)),
            ],
            vec![button("🔄 Reset to defaults", CallbackAction::Reset)],
        ],
    )
}

pub fn stats_view(usage: &Usage, prefs: &Preferences) -> Reply {
    let language = Language::from_code(&prefs.target_language)
        .map(|l| l.label())
        .unwrap_or_else(|| prefs.target_language.clone());

    Reply::text(format!(
        "📊 <b>Your statistics</b>\n{DIVIDER}\n\n\
         📝 Translations: {}\n\
         🔤 Characters translated: {}\n\
         ⚡ Commands: {}\n\
         ❌ Failed requests: {}\n\
         🎨 Style: {}\n\
         🌍 Language: {}\n\
         📅 First use: {}\n\
         🕒 Last use: {}",
        usage.translations,
        usage.characters,
        usage.commands,
        usage.failures,
        prefs.style.label(),
        escape(&language),
        usage.first_use.format("%Y-%m-%d"),
        usage.last_use.format("%Y-%m-%d"),
    ))
}

pub fn totals_view(totals: &Totals) -> Reply {
    Reply::text(format!(
        "📈 <b>Bot usage</b>\n{DIVIDER}\n\n\
         👥 Users: {}\n\
         📝 Translations: {}\n\
         🔤 Characters: {}\n\
         ⚡ Commands: {}\n\
         ❌ Failures: {}",
        totals.users, totals.translations, totals.characters, totals.commands, totals.failures
    ))
}
