use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{Chat, User};
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

use tgtranslator::admin_log::AdminLogLayer;
use tgtranslator::config::Config;
use tgtranslator::translator::callback;
use tgtranslator::translator::commands::{self, Caller, Command, Inbound, Reply};
use tgtranslator::translator::reply;
use tgtranslator::translator::{CallbackAction, Database, Settings, TelegramClient, Translator};
use tgtranslator::zai;

struct BotState {
    config: Config,
    translator: Translator<zai::Client>,
    telegram: TelegramClient,
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "translator.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Failed to create log directory {}: {e}", log_dir.display());
        std::process::exit(1);
    }
    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("translator.log"))
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file: {e}");
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        registry.with(AdminLogLayer::new(bot.clone(), log_chat_id)).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting translator...");
    info!("Loaded config from {config_path}");
    info!("Admin IDs: {:?}", config.admin_ids);
    if config.allowed_users.is_empty() {
        info!("Open access (no allowed_users)");
    } else {
        info!("{} allowed user(s)", config.allowed_users.len());
    }

    let database = match Database::open(&config.data_dir.join("translator.db")) {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let client = match zai::Client::new(
        config.zai_api_key.clone(),
        config.model.clone(),
        config.api_url.clone(),
        config.request_timeout,
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build Z.AI client: {e}");
            std::process::exit(1);
        }
    };
    info!("Model: {}", client.model());

    let settings = Settings {
        default_language: config.default_language.clone(),
        max_message_length: config.max_message_length,
        enable_stats: config.enable_stats,
    };
    let state = Arc::new(BotState {
        translator: Translator::new(database, client, settings),
        telegram: TelegramClient::new(bot.clone()),
        config,
    });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command))
                .branch(dptree::endpoint(handle_text)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .error_handler(LoggingErrorHandler::with_custom_text("An error from the update listener"))
        .build()
        .dispatch()
        .await;
}

/// Users outside the allowlist are told so in private chats and ignored elsewhere.
async fn check_access(state: &BotState, user: &User, chat: &Chat) -> bool {
    if state.config.is_allowed(user.id) {
        return true;
    }
    info!("Denied {} ({})", user.first_name, user.id);
    if chat.is_private() {
        state
            .telegram
            .send_reply(chat.id, Reply::text("⛔ You are not allowed to use this bot."), None)
            .await
            .ok();
    }
    false
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if !check_access(&state, user, &msg.chat).await {
        return Ok(());
    }

    info!("📨 {:?} from {} ({})", cmd, user.first_name, user.id);
    let caller = Caller {
        user_id: user.id.0 as i64,
        first_name: user.first_name.clone(),
        is_admin: state.config.is_admin(user.id),
    };

    let reply = match commands::execute(cmd, &caller, &state.translator) {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Command failed for user {}: {e}", user.id);
            Reply::text("❌ Something went wrong on our side. Please try again.")
        }
    };
    state.telegram.send_reply(msg.chat.id, reply, None).await.ok();
    Ok(())
}

async fn handle_text(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let route = commands::route_message(msg.text(), msg.chat.is_private());
    if route == Inbound::Ignore || !check_access(&state, user, &msg.chat).await {
        return Ok(());
    }
    let text = match route {
        Inbound::Translate(text) => text,
        Inbound::NotText | Inbound::UnknownCommand => {
            let hint = if route == Inbound::NotText {
                "✏️ I can only translate text messages."
            } else {
                "Unknown command. See /help."
            };
            state.telegram.send_reply(msg.chat.id, Reply::text(hint), None).await.ok();
            return Ok(());
        }
        Inbound::Ignore => return Ok(()),
    };

    let chat_id = msg.chat.id;
    let placeholder = state
        .telegram
        .send_html(chat_id, "🔄 Translating…", Some(msg.id), None)
        .await
        .ok();
    state.telegram.typing(chat_id).await;

    let result = state.translator.translate(user.id.0 as i64, text).await;

    if let Some(id) = placeholder {
        state.telegram.delete_message(chat_id, id).await.ok();
    }

    match result {
        Ok(translation) => {
            for part in reply::render_translation(&translation) {
                if state.telegram.send_html(chat_id, &part, Some(msg.id), None).await.is_err() {
                    break;
                }
            }
        }
        Err(e) => {
            state
                .telegram
                .send_html(chat_id, &reply::error_text(&e), Some(msg.id), None)
                .await
                .ok();
        }
    }

    Ok(())
}

async fn handle_callback(bot: Bot, query: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    let user_id = query.from.id;
    let action = query.data.as_deref().and_then(CallbackAction::parse);

    let Some(action) = action else {
        warn!("Unknown callback data from {}: {:?}", user_id, query.data);
        bot.answer_callback_query(query.id.clone()).text("Unknown action").await?;
        return Ok(());
    };

    if !state.config.is_allowed(user_id) {
        bot.answer_callback_query(query.id.clone())
            .text("⛔ You are not allowed to use this bot.")
            .await?;
        return Ok(());
    }

    let outcome = match callback::apply(action, user_id.0 as i64, &state.translator) {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Callback {action} failed for user {user_id}: {e}");
            bot.answer_callback_query(query.id.clone())
                .text("❌ Something went wrong")
                .await?;
            return Ok(());
        }
    };

    let mut answer = bot.answer_callback_query(query.id.clone());
    if let Some(toast) = outcome.toast {
        answer = answer.text(toast);
    }
    // The change is already saved; an expired query must not skip the edit.
    if let Err(e) = answer.await {
        warn!("Failed to answer callback from {user_id}: {e}");
    }

    if let Some(reply) = outcome.reply {
        match query.regular_message() {
            // Telegram refuses edits that leave the message unchanged; edit_reply logs it.
            Some(message) => {
                state.telegram.edit_reply(message.chat.id, message.id, reply).await.ok();
            }
            // Too old to edit; answer in the user's private chat instead.
            None => {
                state.telegram.send_reply(ChatId(user_id.0 as i64), reply, None).await.ok();
            }
        }
    }

    Ok(())
}
