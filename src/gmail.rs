//! Decoding of Gmail API message resources into [`RawMessage`]s.
//!
//! Exports are the JSON returned by `users.messages.get?format=full`, either
//! as a bare array or wrapped in `{"messages": [...]}`. Anything that does not
//! decode cleanly is rejected here so extraction only ever sees plain text.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::RawMessage;

#[derive(Debug, Error)]
pub enum GmailDecodeError {
    #[error("export is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message {0} has no payload")]
    MissingPayload(String),
    #[error("message {0} has no text/plain body")]
    MissingBody(String),
    #[error("message {id} body is not valid base64url: {reason}")]
    Base64 { id: String, reason: String },
    #[error("message {0} body is not valid UTF-8")]
    InvalidUtf8(String),
    #[error("message {0} has no usable Date header or internalDate")]
    MissingDate(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Export {
    Wrapped { messages: Vec<GmailMessage> },
    Bare(Vec<GmailMessage>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub internal_date: Option<String>,
    #[serde(default)]
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

impl MessagePart {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }

    fn data(&self) -> Option<&str> {
        self.body.as_ref()?.data.as_deref()
    }

    /// Depth-first search for the first `text/plain` part carrying data.
    fn plain_text_data(&self) -> Option<&str> {
        if self.mime_type == "text/plain" {
            if let Some(data) = self.data() {
                return Some(data);
            }
        }
        self.parts.iter().find_map(MessagePart::plain_text_data)
    }
}

/// Sender/subject filter applied to decoded messages. Owned by the caller,
/// mirrors the search used against the mailbox.
#[derive(Debug, Clone)]
pub struct InboxQuery {
    pub senders: Vec<String>,
    pub subject: Option<String>,
}

impl Default for InboxQuery {
    fn default() -> Self {
        Self {
            senders: vec![
                "noreply@formspree.io".to_string(),
                "forms@formspree.io".to_string(),
            ],
            subject: Some("New submission".to_string()),
        }
    }
}

impl InboxQuery {
    pub fn accepts(&self, from: &str, subject: &str) -> bool {
        let from = from.to_lowercase();
        let sender_ok = self.senders.is_empty()
            || self
                .senders
                .iter()
                .any(|sender| from.contains(&sender.to_lowercase()));
        let subject_ok = self
            .subject
            .as_ref()
            .map_or(true, |wanted| subject.to_lowercase().contains(&wanted.to_lowercase()));
        sender_ok && subject_ok
    }
}

pub fn decode_message(message: &GmailMessage) -> Result<RawMessage, GmailDecodeError> {
    let payload = message
        .payload
        .as_ref()
        .ok_or_else(|| GmailDecodeError::MissingPayload(message.id.clone()))?;

    let data = if payload.parts.is_empty() {
        payload.data()
    } else {
        payload.plain_text_data()
    }
    .ok_or_else(|| GmailDecodeError::MissingBody(message.id.clone()))?;

    Ok(RawMessage {
        id: message.id.clone(),
        subject: payload.header("Subject").unwrap_or_default().to_string(),
        received_at: received_at(message, payload)?,
        body: decode_body(&message.id, data)?,
    })
}

fn decode_body(id: &str, data: &str) -> Result<String, GmailDecodeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .map_err(|e| GmailDecodeError::Base64 {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|_| GmailDecodeError::InvalidUtf8(id.to_string()))
}

fn received_at(message: &GmailMessage, payload: &MessagePart) -> Result<DateTime<Utc>, GmailDecodeError> {
    if let Some(parsed) = payload
        .header("Date")
        .and_then(|value| DateTime::parse_from_rfc2822(value).ok())
    {
        return Ok(parsed.with_timezone(&Utc));
    }

    message
        .internal_date
        .as_deref()
        .and_then(|millis| millis.parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .ok_or_else(|| GmailDecodeError::MissingDate(message.id.clone()))
}

/// Decodes an export, keeping messages that pass `query`. Messages that fail
/// to decode are logged and skipped.
pub fn decode_export(json: &str, query: &InboxQuery) -> Result<Vec<RawMessage>, GmailDecodeError> {
    let messages = match serde_json::from_str::<Export>(json)? {
        Export::Wrapped { messages } | Export::Bare(messages) => messages,
    };

    let mut decoded = Vec::with_capacity(messages.len());
    for message in &messages {
        let headers = message.payload.as_ref();
        let from = headers.and_then(|p| p.header("From")).unwrap_or_default();
        let subject = headers.and_then(|p| p.header("Subject")).unwrap_or_default();
        if !query.accepts(from, subject) {
            debug!(id = %message.id, from, subject, "message outside inbox query");
            continue;
        }

        match decode_message(message) {
            Ok(raw) => decoded.push(raw),
            Err(err) => warn!(id = %message.id, error = %err, "skipping undecodable message"),
        }
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn encode(text: &str) -> String {
        URL_SAFE_NO_PAD.encode(text.as_bytes())
    }

    fn multipart(id: &str, from: &str, body: &str) -> serde_json::Value {
        json!({
            "id": id,
            "internalDate": "1771061400000",
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [
                    { "name": "From", "value": from },
                    { "name": "Subject", "value": "New submission from foodie.dev" },
                    { "name": "Date", "value": "Sat, 14 Feb 2026 09:30:00 +0000" }
                ],
                "parts": [
                    { "mimeType": "text/html", "body": { "data": encode("<p>html</p>") } },
                    { "mimeType": "text/plain", "body": { "data": encode(body) } }
                ]
            }
        })
    }

    #[test]
    fn decodes_plain_text_part_and_headers() {
        let value = multipart("abc", "Formspree <noreply@formspree.io>", "Utilidad percibida: 8");
        let message: GmailMessage = serde_json::from_value(value).unwrap();
        let raw = decode_message(&message).unwrap();

        assert_eq!(raw.id, "abc");
        assert_eq!(raw.subject, "New submission from foodie.dev");
        assert_eq!(raw.body, "Utilidad percibida: 8");
        assert_eq!(raw.received_at, Utc.with_ymd_and_hms(2026, 2, 14, 9, 30, 0).unwrap());
    }

    #[test]
    fn single_part_body_with_padding_and_internal_date() {
        let value = json!({
            "id": "single",
            "internalDate": "1771061400000",
            "payload": {
                "mimeType": "text/plain",
                "headers": [{ "name": "Subject", "value": "New submission" }],
                "body": { "data": "Zm9vZGll" }
            }
        });
        let message: GmailMessage = serde_json::from_value(value).unwrap();
        let raw = decode_message(&message).unwrap();

        assert_eq!(raw.body, "foodie");
        assert_eq!(raw.received_at.timestamp_millis(), 1_771_061_400_000);
    }

    #[test]
    fn rejects_payloads_without_body() {
        let value = json!({ "id": "empty", "payload": { "mimeType": "multipart/mixed", "parts": [] } });
        let message: GmailMessage = serde_json::from_value(value).unwrap();
        assert!(matches!(
            decode_message(&message),
            Err(GmailDecodeError::MissingBody(id)) if id == "empty"
        ));

        let value = json!({ "id": "bare" });
        let message: GmailMessage = serde_json::from_value(value).unwrap();
        assert!(matches!(decode_message(&message), Err(GmailDecodeError::MissingPayload(_))));
    }

    #[test]
    fn export_skips_bad_messages_and_foreign_senders() {
        let export = json!({
            "messages": [
                multipart("ok", "noreply@formspree.io", "Foodie"),
                multipart("other", "news@example.com", "Foodie"),
                { "id": "broken", "payload": {
                    "mimeType": "text/plain",
                    "headers": [
                        { "name": "From", "value": "forms@formspree.io" },
                        { "name": "Subject", "value": "New submission" }
                    ],
                    "body": { "data": "!!not base64!!" }
                } }
            ]
        });

        let decoded = decode_export(&export.to_string(), &InboxQuery::default()).unwrap();
        let ids: Vec<&str> = decoded.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            decode_export("{not json", &InboxQuery::default()),
            Err(GmailDecodeError::Json(_))
        ));
    }

    #[test]
    fn empty_query_accepts_everything() {
        let query = InboxQuery {
            senders: vec![],
            subject: None,
        };
        assert!(query.accepts("anyone@example.com", "Weekly newsletter"));
        assert!(!InboxQuery::default().accepts("anyone@example.com", "New submission"));
    }
}
