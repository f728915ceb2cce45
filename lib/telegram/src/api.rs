//! HTTP client for the Telegram Bot API.

use crate::error::BotApiError;
use crate::membership::{MembershipStatus, normalize_channel_id};
use habbiter_core::TelegramId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const API_ROOT: &str = "https://api.telegram.org";

/// Every Bot API response arrives in this envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<R> {
    ok: bool,
    result: Option<R>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: MembershipStatus,
}

/// An inline keyboard attached to an outgoing message.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    /// A keyboard with one button per row.
    #[must_use]
    pub fn rows(buttons: Vec<InlineKeyboardButton>) -> Self {
        Self {
            inline_keyboard: buttons.into_iter().map(|b| vec![b]).collect(),
        }
    }
}

/// A single inline-keyboard button.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

impl InlineKeyboardButton {
    /// A button that opens a URL.
    #[must_use]
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
            callback_data: None,
        }
    }

    /// A button that sends a callback query back to the bot.
    #[must_use]
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
            callback_data: Some(data.into()),
        }
    }
}

/// Client for the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct BotApi {
    http: reqwest::Client,
    base: String,
}

impl BotApi {
    /// Creates a client for the given bot token against the production API.
    #[must_use]
    pub fn new(bot_token: &str) -> Self {
        Self::with_api_root(API_ROOT, bot_token)
    }

    /// Creates a client against an alternate API root.
    #[must_use]
    pub fn with_api_root(root: &str, bot_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("{}/bot{bot_token}", root.trim_end_matches('/')),
        }
    }

    /// Looks up a user's membership status in a chat.
    pub async fn get_chat_member(
        &self,
        chat_id: &str,
        user_id: TelegramId,
    ) -> Result<MembershipStatus, BotApiError> {
        #[derive(Serialize)]
        struct Params<'a> {
            chat_id: &'a str,
            user_id: i64,
        }

        let member: ChatMember = self
            .call(
                "getChatMember",
                &Params {
                    chat_id,
                    user_id: user_id.as_i64(),
                },
            )
            .await?;
        Ok(member.status)
    }

    /// Checks whether a user currently counts as a member of the channel.
    ///
    /// The channel id is normalized first, so bare usernames from
    /// configuration work. An `Err` means the answer could not be
    /// determined; it is not a "no".
    pub async fn is_channel_member(
        &self,
        channel_id: &str,
        user_id: TelegramId,
    ) -> Result<bool, BotApiError> {
        let chat_id = normalize_channel_id(channel_id);
        let status = self.get_chat_member(&chat_id, user_id).await?;
        Ok(status.grants_access())
    }

    /// Sends a text message, optionally with an inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: TelegramId,
        text: &str,
        reply_markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), BotApiError> {
        #[derive(Serialize)]
        struct Params<'a> {
            chat_id: i64,
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            reply_markup: Option<InlineKeyboardMarkup>,
        }

        let _: serde_json::Value = self
            .call(
                "sendMessage",
                &Params {
                    chat_id: chat_id.as_i64(),
                    text,
                    reply_markup,
                },
            )
            .await?;
        Ok(())
    }

    /// Acknowledges an inline-keyboard button press.
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), BotApiError> {
        #[derive(Serialize)]
        struct Params<'a> {
            callback_query_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            text: Option<&'a str>,
        }

        let _: serde_json::Value = self
            .call(
                "answerCallbackQuery",
                &Params {
                    callback_query_id,
                    text,
                },
            )
            .await?;
        Ok(())
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: &impl Serialize,
    ) -> Result<R, BotApiError> {
        tracing::debug!(method, "calling bot api");
        let response = self
            .http
            .post(format!("{}/{method}", self.base))
            .json(params)
            .send()
            .await
            .map_err(|e| BotApiError::Network {
                reason: e.to_string(),
            })?;

        // The API wraps errors in the same JSON envelope regardless of the
        // HTTP status, so parse the body before judging the status code.
        let envelope: ApiEnvelope<R> =
            response.json().await.map_err(|e| BotApiError::Malformed {
                reason: e.to_string(),
            })?;

        if envelope.ok {
            envelope.result.ok_or_else(|| BotApiError::Malformed {
                reason: "ok response without result".to_string(),
            })
        } else {
            Err(BotApiError::Api {
                error_code: envelope.error_code.unwrap_or(0),
                description: envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_success() {
        let json = r#"{"ok": true, "result": {"status": "member"}}"#;
        let envelope: ApiEnvelope<ChatMember> = serde_json::from_str(json).expect("parse");
        assert!(envelope.ok);
        assert_eq!(
            envelope.result.expect("result").status,
            MembershipStatus::Member
        );
    }

    #[test]
    fn envelope_parses_api_error() {
        let json = r#"{"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}"#;
        let envelope: ApiEnvelope<ChatMember> = serde_json::from_str(json).expect("parse");
        assert!(!envelope.ok);
        assert_eq!(envelope.error_code, Some(400));
        assert!(envelope.result.is_none());
    }

    #[test]
    fn keyboard_serializes_to_bot_api_shape() {
        let keyboard = InlineKeyboardMarkup::rows(vec![
            InlineKeyboardButton::url("Subscribe", "https://t.me/habbiter_channel"),
            InlineKeyboardButton::callback("I subscribed", "check_subscription"),
        ]);

        let json = serde_json::to_value(&keyboard).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "inline_keyboard": [
                    [{"text": "Subscribe", "url": "https://t.me/habbiter_channel"}],
                    [{"text": "I subscribed", "callback_data": "check_subscription"}]
                ]
            })
        );
    }
}
