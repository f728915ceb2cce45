//! Signed login payloads presented by Telegram clients.
//!
//! Two shapes arrive at the platform: the Login Widget posts a flat JSON
//! object, and the embedded app hands over an `initData` query string. Both
//! carry a `hash` field signed over every other field, canonicalized as
//! sorted `key=value` lines joined with newlines.

use crate::error::AuthenticationError;
use habbiter_core::TelegramId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity fields extracted from a verified login payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramAccount {
    pub id: TelegramId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
}

/// A login payload from the Login Widget, pending verification.
///
/// Fields are kept as strings exactly as they participate in the signed
/// canonical form; typed accessors parse on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetAssertion {
    fields: BTreeMap<String, String>,
    hash: String,
}

impl WidgetAssertion {
    /// Parses the widget's JSON payload.
    ///
    /// Numbers and booleans are rendered to strings the way the widget
    /// itself renders them when signing, so the canonical form survives the
    /// JSON round trip.
    pub fn from_json(payload: &serde_json::Value) -> Result<Self, AuthenticationError> {
        let object = payload
            .as_object()
            .ok_or_else(|| AuthenticationError::MalformedPayload {
                reason: "login payload is not a JSON object".to_string(),
            })?;

        let mut fields = BTreeMap::new();
        let mut hash = None;
        for (key, value) in object {
            if key == "hash" {
                let value =
                    value
                        .as_str()
                        .ok_or_else(|| AuthenticationError::MalformedPayload {
                            reason: "hash is not a string".to_string(),
                        })?;
                hash = Some(value.to_string());
                continue;
            }

            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Bool(b) => b.to_string(),
                _ => {
                    return Err(AuthenticationError::MalformedPayload {
                        reason: format!("field '{key}' has an unsupported type"),
                    });
                }
            };
            fields.insert(key.clone(), rendered);
        }

        let hash = hash.ok_or_else(|| AuthenticationError::MissingField {
            field: "hash".to_string(),
        })?;
        Ok(Self { fields, hash })
    }

    /// The canonical string the signature covers.
    #[must_use]
    pub fn data_check_string(&self) -> String {
        data_check_string(&self.fields)
    }

    /// The hash the widget attached.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The signed login timestamp, unix seconds.
    pub fn auth_date(&self) -> Result<i64, AuthenticationError> {
        let raw = self
            .fields
            .get("auth_date")
            .ok_or_else(|| AuthenticationError::MissingField {
                field: "auth_date".to_string(),
            })?;
        raw.parse()
            .map_err(|_| AuthenticationError::MalformedPayload {
                reason: format!("auth_date '{raw}' is not a timestamp"),
            })
    }

    /// The identity fields carried by the payload.
    pub fn account(&self) -> Result<TelegramAccount, AuthenticationError> {
        let raw_id = self
            .fields
            .get("id")
            .ok_or_else(|| AuthenticationError::MissingField {
                field: "id".to_string(),
            })?;
        let id = raw_id
            .parse::<i64>()
            .map_err(|_| AuthenticationError::MalformedPayload {
                reason: format!("id '{raw_id}' is not numeric"),
            })?;

        Ok(TelegramAccount {
            id: TelegramId::new(id),
            first_name: self.fields.get("first_name").cloned(),
            last_name: self.fields.get("last_name").cloned(),
            username: self.fields.get("username").cloned(),
            photo_url: self.fields.get("photo_url").cloned(),
        })
    }
}

/// Init data handed over by the embedded app, pending verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitData {
    fields: BTreeMap<String, String>,
    hash: String,
}

impl InitData {
    /// Parses the raw `initData` query string.
    ///
    /// Values are percent-decoded before they enter the canonical form;
    /// that is the form the platform signed.
    pub fn parse(raw: &str) -> Result<Self, AuthenticationError> {
        let mut fields = BTreeMap::new();
        let mut hash = None;
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if key == "hash" {
                hash = Some(value.into_owned());
            } else {
                fields.insert(key.into_owned(), value.into_owned());
            }
        }

        let hash = hash.ok_or_else(|| AuthenticationError::MissingField {
            field: "hash".to_string(),
        })?;
        Ok(Self { fields, hash })
    }

    /// The canonical string the signature covers.
    #[must_use]
    pub fn data_check_string(&self) -> String {
        data_check_string(&self.fields)
    }

    /// The hash the platform attached.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// The identity fields from the embedded `user` JSON.
    pub fn account(&self) -> Result<TelegramAccount, AuthenticationError> {
        let raw = self
            .fields
            .get("user")
            .ok_or_else(|| AuthenticationError::MissingField {
                field: "user".to_string(),
            })?;
        serde_json::from_str(raw).map_err(|e| AuthenticationError::MalformedPayload {
            reason: format!("user field is not valid JSON: {e}"),
        })
    }
}

/// Sorted `key=value` lines joined with `\n`. Both signing schemes share
/// this canonical form.
pub(crate) fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widget_payload_sorts_fields_and_excludes_hash() {
        let payload = serde_json::json!({
            "username": "ada",
            "id": 111222333,
            "first_name": "Ada",
            "auth_date": 1726000000,
            "hash": "abcd"
        });

        let assertion = WidgetAssertion::from_json(&payload).expect("parse");
        assert_eq!(
            assertion.data_check_string(),
            "auth_date=1726000000\nfirst_name=Ada\nid=111222333\nusername=ada"
        );
        assert_eq!(assertion.hash(), "abcd");
    }

    #[test]
    fn widget_payload_without_hash_is_rejected() {
        let payload = serde_json::json!({"id": 1, "auth_date": 1726000000});
        let err = WidgetAssertion::from_json(&payload).unwrap_err();
        assert_eq!(
            err,
            AuthenticationError::MissingField {
                field: "hash".to_string()
            }
        );
    }

    #[test]
    fn widget_account_parses_identity_fields() {
        let payload = serde_json::json!({
            "id": 111222333,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "username": "ada",
            "photo_url": "https://t.me/i/userpic/ada.jpg",
            "auth_date": 1726000000,
            "hash": "abcd"
        });

        let assertion = WidgetAssertion::from_json(&payload).expect("parse");
        let account = assertion.account().expect("account");
        assert_eq!(account.id, TelegramId::new(111_222_333));
        assert_eq!(account.first_name.as_deref(), Some("Ada"));
        assert_eq!(account.username.as_deref(), Some("ada"));
    }

    #[test]
    fn widget_auth_date_must_be_numeric() {
        let payload = serde_json::json!({
            "id": 1,
            "auth_date": "yesterday",
            "hash": "abcd"
        });
        let assertion = WidgetAssertion::from_json(&payload).expect("parse");
        assert!(matches!(
            assertion.auth_date(),
            Err(AuthenticationError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn init_data_decodes_percent_encoding() {
        let user_json = r#"{"id":111222333,"first_name":"Ada","username":"ada"}"#;
        let raw: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("auth_date", "1726000000")
            .append_pair("query_id", "AAH3kFpq")
            .append_pair("user", user_json)
            .append_pair("hash", "abcd")
            .finish();

        let init_data = InitData::parse(&raw).expect("parse");
        assert_eq!(init_data.hash(), "abcd");
        assert_eq!(
            init_data.data_check_string(),
            format!("auth_date=1726000000\nquery_id=AAH3kFpq\nuser={user_json}")
        );

        let account = init_data.account().expect("account");
        assert_eq!(account.id, TelegramId::new(111_222_333));
        assert_eq!(account.username.as_deref(), Some("ada"));
    }

    #[test]
    fn init_data_without_hash_is_rejected() {
        let err = InitData::parse("auth_date=1726000000&query_id=AAH").unwrap_err();
        assert_eq!(
            err,
            AuthenticationError::MissingField {
                field: "hash".to_string()
            }
        );
    }

    #[test]
    fn init_data_without_user_has_no_account() {
        let init_data = InitData::parse("auth_date=1726000000&hash=abcd").expect("parse");
        assert!(matches!(
            init_data.account(),
            Err(AuthenticationError::MissingField { .. })
        ));
    }
}
