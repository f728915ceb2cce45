//! Webhook update payloads.
//!
//! Only the fields the bot actually reads are modeled; serde ignores the
//! rest of Telegram's payload.

use habbiter_core::TelegramId;
use serde::Deserialize;

/// A single incoming update delivered to the webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<IncomingMessage>,
    pub callback_query: Option<CallbackQuery>,
}

/// A message sent to the bot.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub message_id: i64,
    pub from: Option<Sender>,
    pub chat: Chat,
    pub text: Option<String>,
}

/// The chat a message belongs to.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: TelegramId,
}

/// The account that sent a message or pressed a button.
#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub id: TelegramId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// An inline-keyboard button press.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: Sender,
    pub message: Option<IncomingMessage>,
    pub data: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_command_update() {
        let json = r#"{
            "update_id": 731245,
            "message": {
                "message_id": 17,
                "from": {"id": 111222333, "is_bot": false, "first_name": "Ada", "username": "ada"},
                "chat": {"id": 111222333, "type": "private"},
                "text": "/start auth_01JF2Z3Y4N5Q6R7S8T9V0W1X2Y"
            }
        }"#;

        let update: Update = serde_json::from_str(json).expect("parse update");
        let message = update.message.expect("message present");
        assert_eq!(message.chat.id, TelegramId::new(111_222_333));
        assert_eq!(
            message.text.as_deref(),
            Some("/start auth_01JF2Z3Y4N5Q6R7S8T9V0W1X2Y")
        );
        let from = message.from.expect("from present");
        assert_eq!(from.username.as_deref(), Some("ada"));
        assert!(update.callback_query.is_none());
    }

    #[test]
    fn parses_callback_query_update() {
        let json = r#"{
            "update_id": 731246,
            "callback_query": {
                "id": "4382abc",
                "from": {"id": 111222333, "is_bot": false, "first_name": "Ada"},
                "message": {
                    "message_id": 18,
                    "chat": {"id": 111222333, "type": "private"},
                    "text": "Subscribe to continue"
                },
                "data": "check_subscription"
            }
        }"#;

        let update: Update = serde_json::from_str(json).expect("parse update");
        let query = update.callback_query.expect("callback present");
        assert_eq!(query.data.as_deref(), Some("check_subscription"));
        assert_eq!(query.from.id, TelegramId::new(111_222_333));
    }

    #[test]
    fn parses_update_without_text() {
        let json = r#"{
            "update_id": 731247,
            "message": {
                "message_id": 19,
                "chat": {"id": 5, "type": "private"}
            }
        }"#;

        let update: Update = serde_json::from_str(json).expect("parse update");
        let message = update.message.expect("message present");
        assert!(message.text.is_none());
        assert!(message.from.is_none());
    }
}
