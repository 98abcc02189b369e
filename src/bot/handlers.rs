//! Interaction controller: command handling and callback dispatch.
//!
//! Drives the search → paginate → select → download → deliver → clean up
//! flow against the session store and the media provider. Ownership and
//! expiry rules are enforced here, at the event boundary.

use crate::bot::callbacks::CallbackAction;
use crate::bot::delivery::{self, DeliveryError, DownloadArtifact};
use crate::bot::pagination::select;
use crate::bot::resilient::{edit_message_safe_resilient, send_message_resilient};
use crate::bot::session::{SearchSession, SessionStore};
use crate::bot::views;
use crate::config::{Settings, SEARCH_MAX_RESULTS};
use crate::provider::{MediaKind, MediaProvider, ProviderError};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show welcome and usage text
    #[command(description = "Start the bot.")]
    Start,
    /// Search and download audio
    #[command(description = "Search and download a song (MP3).")]
    Song(String),
    /// Search and download video
    #[command(description = "Search and download a video (MP4).")]
    Vid(String),
}

/// `/start` handler
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("User {user_id} initiated /start command.");
    send_message_resilient(&bot, msg.chat.id, views::welcome_text()).await?;
    Ok(())
}

/// `/song` and `/vid` handler: run the provider search and show the first
/// result page.
///
/// # Errors
///
/// Returns an error if Telegram messages cannot be sent after retries.
pub async fn search(
    bot: Bot,
    msg: Message,
    query: String,
    kind: MediaKind,
    store: Arc<SessionStore>,
    provider: Arc<dyn MediaProvider>,
) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let query = query.trim().to_string();

    if query.is_empty() {
        send_message_resilient(&bot, msg.chat.id, views::missing_query_text(kind)).await?;
        return Ok(());
    }

    info!("User {user_id} searching {} for '{query}'", kind.as_str());
    let searching = send_message_resilient(&bot, msg.chat.id, views::searching_text(kind)).await?;

    let results = match provider.search(&query, SEARCH_MAX_RESULTS).await {
        Ok(results) => results,
        Err(ProviderError::Timeout(secs)) => {
            warn!("Search for '{query}' timed out after {secs}s");
            edit_message_safe_resilient(
                &bot,
                msg.chat.id,
                searching.id,
                &views::search_timeout_text(),
                None,
            )
            .await;
            return Ok(());
        }
        Err(e) => {
            error!("Search error for '{query}': {e}");
            edit_message_safe_resilient(
                &bot,
                msg.chat.id,
                searching.id,
                &views::search_failed_text(),
                None,
            )
            .await;
            return Ok(());
        }
    };

    // An empty result set creates no session
    let Some(session) = SearchSession::from_results(user_id, query, kind, results) else {
        edit_message_safe_resilient(
            &bot,
            msg.chat.id,
            searching.id,
            &views::no_results_text(),
            None,
        )
        .await;
        return Ok(());
    };

    let text = views::results_text(&session);
    let keyboard = views::results_keyboard(&session);
    // Unconditionally replaces any previous session for this user; when
    // two searches race, the last one to complete wins.
    store.put(session).await;

    edit_message_safe_resilient(&bot, msg.chat.id, searching.id, &text, Some(keyboard)).await;
    Ok(())
}

/// Callback dispatch: decode once, enforce ownership, route per action.
///
/// # Errors
///
/// Returns an error if Telegram calls fail after retries.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    store: Arc<SessionStore>,
    provider: Arc<dyn MediaProvider>,
    settings: Arc<Settings>,
) -> Result<()> {
    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    };

    let acting_user = q.from.id.0.cast_signed();

    if !action.permits(acting_user) {
        bot.answer_callback_query(q.id.clone())
            .text(views::not_your_search_text())
            .show_alert(true)
            .await?;
        return Ok(());
    }

    // The page indicator: acknowledge and do nothing
    if action == CallbackAction::Noop {
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    }

    // The message the keyboard hangs off; without it there is nothing to
    // edit, so only acknowledge.
    let Some((chat_id, msg_id)) = q.message.as_ref().map(|m| (m.chat().id, m.id())) else {
        let _ = bot.answer_callback_query(q.id.clone()).await;
        return Ok(());
    };

    match action {
        CallbackAction::Page { page, .. } => {
            let _ = bot.answer_callback_query(q.id.clone()).await;
            handle_page(&bot, chat_id, msg_id, &store, acting_user, page).await;
        }
        CallbackAction::Cancel { .. } => {
            let _ = bot.answer_callback_query(q.id.clone()).await;
            let first_name = q.from.first_name.clone();
            handle_cancel(&bot, chat_id, msg_id, &store, acting_user, &first_name).await;
        }
        CallbackAction::Download { kind, index, .. } => {
            let ctx = DownloadContext {
                chat_id,
                msg_id,
                user_id: acting_user,
                kind,
                index,
            };
            handle_download(&bot, &q, ctx, &store, provider, &settings).await?;
        }
        CallbackAction::Noop => {}
    }
    Ok(())
}

/// Page navigation: re-validate the session, move, re-render.
async fn handle_page(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    store: &SessionStore,
    user_id: i64,
    page: usize,
) {
    // None covers both a vanished session and a page that no longer fits
    // the session's shape (stale button after supersession)
    match store.set_page(user_id, page).await {
        Some(session) => {
            let text = views::results_text(&session);
            let keyboard = views::results_keyboard(&session);
            edit_message_safe_resilient(bot, chat_id, msg_id, &text, Some(keyboard)).await;
        }
        None => {
            edit_message_safe_resilient(bot, chat_id, msg_id, &views::session_expired_text(), None)
                .await;
        }
    }
}

/// Cancel: tear down the session and say who did it.
async fn handle_cancel(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    store: &SessionStore,
    user_id: i64,
    first_name: &str,
) {
    if store.remove(user_id).await {
        info!("User {user_id} cancelled their search.");
        edit_message_safe_resilient(
            bot,
            chat_id,
            msg_id,
            &views::cancelled_text(user_id, first_name),
            None,
        )
        .await;
    } else {
        edit_message_safe_resilient(bot, chat_id, msg_id, &views::session_expired_text(), None)
            .await;
    }
}

/// Everything a download needs besides the shared services.
struct DownloadContext {
    chat_id: ChatId,
    msg_id: MessageId,
    user_id: i64,
    kind: MediaKind,
    index: usize,
}

/// Selection accepted: download, deliver, clean up, end the session.
async fn handle_download(
    bot: &Bot,
    q: &CallbackQuery,
    ctx: DownloadContext,
    store: &SessionStore,
    provider: Arc<dyn MediaProvider>,
    settings: &Settings,
) -> Result<()> {
    let Some(session) = store.get(ctx.user_id).await else {
        let _ = bot.answer_callback_query(q.id.clone()).await;
        edit_message_safe_resilient(
            bot,
            ctx.chat_id,
            ctx.msg_id,
            &views::session_expired_text(),
            None,
        )
        .await;
        return Ok(());
    };

    // Out-of-range selection is a signal, not a crash, and mutates nothing
    let Some(item) = select(&session.results, ctx.index).cloned() else {
        bot.answer_callback_query(q.id.clone())
            .text(views::invalid_selection_text())
            .show_alert(true)
            .await?;
        return Ok(());
    };

    let _ = bot.answer_callback_query(q.id.clone()).await;
    info!(
        "User {} downloading '{}' as {}",
        ctx.user_id,
        item.title,
        ctx.kind.as_str()
    );
    edit_message_safe_resilient(
        bot,
        ctx.chat_id,
        ctx.msg_id,
        &views::downloading_text(&item, ctx.kind),
        None,
    )
    .await;

    let user_dir = PathBuf::from(&settings.downloads_dir).join(ctx.user_id.to_string());
    let outcome = run_delivery(bot, &ctx, provider, &item, &user_dir).await;
    edit_message_safe_resilient(bot, ctx.chat_id, ctx.msg_id, &outcome, None).await;

    // A completed or failed download always ends the interaction
    store.remove(ctx.user_id).await;
    Ok(())
}

/// Download and deliver one item; returns the final status text. The
/// artifact guard makes file and directory cleanup unconditional.
async fn run_delivery(
    bot: &Bot,
    ctx: &DownloadContext,
    provider: Arc<dyn MediaProvider>,
    item: &crate::provider::SearchResult,
    user_dir: &std::path::Path,
) -> String {
    let path = match provider.download(item, ctx.kind, user_dir).await {
        Ok(path) => path,
        Err(e) => {
            error!("Download error for '{}': {e}", item.url);
            // yt-dlp may have left partial files behind
            prune_user_dir(user_dir);
            return views::download_failed_text();
        }
    };

    let artifact = DownloadArtifact::new(path, user_dir.to_path_buf());

    edit_message_safe_resilient(
        bot,
        ctx.chat_id,
        ctx.msg_id,
        &views::uploading_text(ctx.kind),
        None,
    )
    .await;

    match delivery::deliver(bot, ctx.chat_id, item, ctx.kind, &artifact).await {
        Ok(()) => views::delivered_text(item),
        Err(DeliveryError::Oversized { size }) => {
            warn!("File for '{}' oversized at {size} bytes, discarded", item.url);
            views::oversized_text()
        }
        Err(e) => {
            error!("Delivery error for '{}': {e}", item.url);
            views::delivery_failed_text()
        }
    }
    // artifact drops here: file removed, empty user dir pruned
}

/// Best-effort removal of a user's download directory and its contents.
fn prune_user_dir(dir: &std::path::Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(dir = %dir.display(), "Failed to prune user dir: {e}");
        }
    }
}
