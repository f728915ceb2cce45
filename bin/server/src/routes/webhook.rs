//! The bot webhook.
//!
//! This is the one auth path with an interactive channel: the bot chat. It
//! negotiates the subscription before ever claiming a pairing token, which
//! is why (unlike the widget and embedded-app endpoints) an unsubscribed
//! user gets no session here — they get a subscribe prompt instead.

use crate::db::{CheckMethod, PairingRepository, ProfileRepository, SubscriptionCheckRepository};
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use chrono::Utc;
use habbiter_core::TelegramId;
use habbiter_platform_access::{
    Profile, TelegramAccount, TokenStatus, token_from_start_command,
};
use habbiter_telegram::{
    BotApiError, CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Sender, Update,
};
use serde_json::json;
use std::sync::Arc;

/// Callback data for the in-chat "I subscribed" button.
const CHECK_SUBSCRIPTION_CALLBACK: &str = "check_subscription";

/// `POST /telegram-webhook` — bot platform updates.
///
/// Always answers 200: failures are logged, not surfaced, so a poison
/// update cannot put Telegram into a redelivery loop. The claim path is
/// idempotent, so genuine redeliveries are harmless too.
pub async fn telegram_webhook(
    State(state): State<Arc<AppState>>,
    Json(update): Json<Update>,
) -> Json<serde_json::Value> {
    let update_id = update.update_id;
    if let Err(e) = process_update(&state, update).await {
        tracing::error!(update_id, error = ?e, "webhook update processing failed");
    }
    Json(json!({ "ok": true }))
}

async fn process_update(state: &AppState, update: Update) -> Result<(), ApiError> {
    if let Some(message) = update.message {
        let (Some(text), Some(from)) = (message.text, message.from) else {
            return Ok(());
        };
        let chat_id = message.chat.id;

        if let Some(token) = token_from_start_command(&text) {
            return handle_auth_start(state, chat_id, &from, token).await;
        }
        if text.trim() == "/start" {
            return handle_plain_start(state, chat_id, &from).await;
        }
        return Ok(());
    }

    if let Some(query) = update.callback_query {
        if query.data.as_deref() == Some(CHECK_SUBSCRIPTION_CALLBACK) {
            return handle_check_callback(state, &query).await;
        }
        // Unknown button; just dismiss the spinner.
        answer(state, &query.id, None).await;
    }

    Ok(())
}

/// `/start auth_<token>` — the deep-link arrival.
async fn handle_auth_start(
    state: &AppState,
    chat_id: TelegramId,
    from: &Sender,
    token: &str,
) -> Result<(), ApiError> {
    let repo = PairingRepository::new(state.db_pool.clone());
    let Some(row) = repo.find(token).await? else {
        notify(
            state,
            chat_id,
            "This login link is not valid. Please start again from the app.",
            None,
        )
        .await;
        return Ok(());
    };

    if row.status() == TokenStatus::Pending && !row.can_claim_at(Utc::now()) {
        notify(
            state,
            chat_id,
            "This login link has expired. Please start again from the app.",
            None,
        )
        .await;
        return Ok(());
    }

    let check = state
        .bot
        .is_channel_member(&state.config.bot.channel_id, from.id)
        .await;
    match start_action(&check) {
        StartAction::Complete => complete_pairing(state, chat_id, from, token).await,
        action => {
            if let Err(e) = &check {
                tracing::warn!(telegram_id = %from.id, error = %e, "membership check failed in webhook");
            }
            // Remember who is pairing so "I subscribed" (or a plain /start)
            // can finish the job.
            repo.attach_telegram_id(
                token,
                from.id,
                from.username.as_deref(),
                from.first_name.as_deref(),
            )
            .await?;
            let text = match action {
                StartAction::PromptSubscribe => {
                    "To use habbiter you need to be subscribed to our channel. \
                     Subscribe, then press the button below."
                }
                _ => {
                    "We couldn't verify your subscription right now. Please \
                     press the button below to try again in a moment."
                }
            };
            notify(state, chat_id, text, Some(subscribe_keyboard(state))).await;
            Ok(())
        }
    }
}

/// What the deep-link handler does once the membership check has resolved.
///
/// Both prompt variants take the same path through the handler: the sender
/// is attached to the token before the prompt goes out, so the pairing can
/// be resumed by the button or a plain `/start` either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartAction {
    /// Confirmed member: upsert the ledger and claim the token.
    Complete,
    /// Not a member: ask the user to subscribe.
    PromptSubscribe,
    /// Undetermined: ask the user to retry, without recording a negative.
    PromptRetry,
}

fn start_action(check: &Result<bool, BotApiError>) -> StartAction {
    match check {
        Ok(true) => StartAction::Complete,
        Ok(false) => StartAction::PromptSubscribe,
        Err(_) => StartAction::PromptRetry,
    }
}

/// Plain `/start` — greet, or resume an interrupted pairing.
async fn handle_plain_start(
    state: &AppState,
    chat_id: TelegramId,
    from: &Sender,
) -> Result<(), ApiError> {
    let repo = PairingRepository::new(state.db_pool.clone());
    if let Some(pending) = repo.latest_pending_for(from.id).await? {
        // The user came back without the deep link; pick up where the
        // subscribe prompt left off.
        let token = pending.token().to_string();
        return handle_auth_start(state, chat_id, from, &token).await;
    }

    let profile = ProfileRepository::new(state.db_pool.clone())
        .find_by_telegram_id(from.id)
        .await?;
    if profile.is_some_and(|p| p.is_subscribed()) {
        notify(
            state,
            chat_id,
            "You're all set. Open the habbiter app to continue.",
            None,
        )
        .await;
    } else {
        notify(
            state,
            chat_id,
            "Welcome to habbiter! Subscribe to our channel to use the app.",
            Some(subscribe_keyboard(state)),
        )
        .await;
    }
    Ok(())
}

/// The "I subscribed" button.
async fn handle_check_callback(state: &AppState, query: &CallbackQuery) -> Result<(), ApiError> {
    let from = &query.from;
    let chat_id = query
        .message
        .as_ref()
        .map_or(from.id, |message| message.chat.id);

    let is_member = match state
        .bot
        .is_channel_member(&state.config.bot.channel_id, from.id)
        .await
    {
        Ok(is_member) => is_member,
        Err(e) => {
            // Undetermined, not "no": tell the user to retry instead of
            // recording a false negative.
            tracing::warn!(telegram_id = %from.id, error = %e, "membership check failed for button");
            answer(
                state,
                &query.id,
                Some("We couldn't verify right now. Please try again."),
            )
            .await;
            return Ok(());
        }
    };

    let repo = ProfileRepository::new(state.db_pool.clone());
    let mut profile = match repo.find_by_telegram_id(from.id).await? {
        Some(mut existing) => {
            existing.apply_account(&account_from_sender(from));
            existing
        }
        None => Profile::from_account(&account_from_sender(from)),
    };
    profile.record_subscription_check(is_member);
    let profile = repo.upsert_login(&profile).await?;

    SubscriptionCheckRepository::new(state.db_pool.clone())
        .record(profile.id(), is_member, CheckMethod::WebhookButton)
        .await?;

    if !is_member {
        answer(state, &query.id, Some("You're not subscribed yet.")).await;
        return Ok(());
    }

    answer(state, &query.id, Some("Subscription confirmed!")).await;

    // Finish the web login the button press belongs to, if one is waiting.
    let pairing = PairingRepository::new(state.db_pool.clone());
    if let Some(pending) = pairing.latest_pending_for(from.id).await? {
        let claimed = pairing
            .claim(
                pending.token(),
                from.id,
                from.username.as_deref(),
                from.first_name.as_deref(),
            )
            .await?;
        if claimed.is_some() {
            tracing::info!(telegram_id = %from.id, "pairing token claimed via button");
            notify(
                state,
                chat_id,
                "You're in! Return to the habbiter app to continue.",
                None,
            )
            .await;
        }
    }

    Ok(())
}

/// Upserts the ledger and claims the token for a confirmed member.
async fn complete_pairing(
    state: &AppState,
    chat_id: TelegramId,
    from: &Sender,
    token: &str,
) -> Result<(), ApiError> {
    let repo = ProfileRepository::new(state.db_pool.clone());
    let mut profile = match repo.find_by_telegram_id(from.id).await? {
        Some(mut existing) => {
            existing.apply_account(&account_from_sender(from));
            existing
        }
        None => Profile::from_account(&account_from_sender(from)),
    };
    profile.record_subscription_check(true);
    // Ledger first: the polling client resolves the claim into a session
    // immediately, and that needs the row in place.
    repo.upsert_login(&profile).await?;

    let claimed = PairingRepository::new(state.db_pool.clone())
        .claim(
            token,
            from.id,
            from.username.as_deref(),
            from.first_name.as_deref(),
        )
        .await?;

    if claimed.is_some() {
        tracing::info!(telegram_id = %from.id, "pairing token claimed");
        notify(
            state,
            chat_id,
            "You're in! Return to the habbiter app to continue.",
            None,
        )
        .await;
    } else {
        notify(
            state,
            chat_id,
            "This login link has expired. Please start again from the app.",
            None,
        )
        .await;
    }
    Ok(())
}

/// The subscribe prompt keyboard: a channel link (when the channel has a
/// public URL) plus the re-check button.
fn subscribe_keyboard(state: &AppState) -> InlineKeyboardMarkup {
    let mut buttons = Vec::new();
    if let Some(url) = state.config.bot.channel_url() {
        buttons.push(InlineKeyboardButton::url("Subscribe to the channel", url));
    }
    buttons.push(InlineKeyboardButton::callback(
        "I subscribed",
        CHECK_SUBSCRIPTION_CALLBACK,
    ));
    InlineKeyboardMarkup::rows(buttons)
}

/// Sends a chat message, best effort. Outbound messages are UX, not state;
/// a failure is logged and the update still counts as processed.
async fn notify(
    state: &AppState,
    chat_id: TelegramId,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) {
    if let Err(e) = state.bot.send_message(chat_id, text, keyboard).await {
        tracing::warn!(%chat_id, error = %e, "failed to send bot message");
    }
}

/// Answers a callback query, best effort.
async fn answer(state: &AppState, callback_query_id: &str, text: Option<&str>) {
    if let Err(e) = state.bot.answer_callback_query(callback_query_id, text).await {
        tracing::warn!(error = %e, "failed to answer callback query");
    }
}

fn account_from_sender(from: &Sender) -> TelegramAccount {
    TelegramAccount {
        id: from.id,
        first_name: from.first_name.clone(),
        last_name: from.last_name.clone(),
        username: from.username.clone(),
        photo_url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmed_member_completes_the_pairing() {
        assert_eq!(start_action(&Ok(true)), StartAction::Complete);
    }

    #[test]
    fn non_member_is_prompted_to_subscribe() {
        assert_eq!(start_action(&Ok(false)), StartAction::PromptSubscribe);
    }

    #[test]
    fn undetermined_check_still_keeps_the_pairing_resumable() {
        // Both prompt variants run the handler arm that attaches the
        // sender to the token, so a later button press can resume.
        let network = Err(BotApiError::Network {
            reason: "connection timed out".to_string(),
        });
        assert_eq!(start_action(&network), StartAction::PromptRetry);

        let api = Err(BotApiError::Api {
            error_code: 429,
            description: "Too Many Requests".to_string(),
        });
        assert_eq!(start_action(&api), StartAction::PromptRetry);
    }
}
