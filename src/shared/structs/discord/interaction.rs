use std::collections::BTreeMap;

use axum::{
    Json,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::shared::{CONTENT_TYPE_HEADER, CONTENT_TYPE_JSON};
use crate::shared::error::InteractionError;

pub const PONG_CALLBACK_TYPE: u8 = 1;
pub const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

/// One inbound request as handed over by a transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionRequest {
    pub headers: BTreeMap<String, String>,
    pub raw_body: String,
}

impl InteractionRequest {
    pub fn new(headers: BTreeMap<String, String>, raw_body: impl Into<String>) -> Self {
        InteractionRequest {
            headers,
            raw_body: raw_body.into(),
        }
    }

    /// Looks a header up by its canonical spelling, then lowercase, then any ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| self.headers.get(&name.to_ascii_lowercase()))
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionType {
    Ping,
    ApplicationCommand,
    MessageComponent,
    Unknown(i64),
}

impl From<i64> for InteractionType {
    fn from(value: i64) -> Self {
        match value {
            1 => InteractionType::Ping,
            2 => InteractionType::ApplicationCommand,
            3 => InteractionType::MessageComponent,
            other => InteractionType::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InteractionEnvelope {
    pub r#type: i64,
    #[serde(default)]
    pub data: Option<InteractionData>,
}

impl InteractionEnvelope {
    pub fn kind(&self) -> InteractionType {
        InteractionType::from(self.r#type)
    }

    pub fn command_name(&self) -> &str {
        self.data
            .as_ref()
            .and_then(|data| data.name.as_deref())
            .unwrap_or_default()
    }

    pub fn custom_id(&self) -> &str {
        self.data
            .as_ref()
            .and_then(|data| data.custom_id.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InteractionData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub custom_id: Option<String>,
}

/// Accepts any JSON value: strings as-is, `null` as absent, anything else as its JSON text.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CallbackData {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InteractionCallback {
    pub r#type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CallbackData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Callback(InteractionCallback),
    Error(ErrorBody),
}

/// The single response produced for one [`InteractionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: ResponseBody,
}

impl InteractionResponse {
    fn with_body(status: StatusCode, body: ResponseBody) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(CONTENT_TYPE_HEADER.to_string(), CONTENT_TYPE_JSON.to_string());

        InteractionResponse {
            status_code: status.as_u16(),
            headers,
            body,
        }
    }

    pub fn pong() -> Self {
        Self::with_body(
            StatusCode::OK,
            ResponseBody::Callback(InteractionCallback {
                r#type: PONG_CALLBACK_TYPE,
                data: None,
            }),
        )
    }

    pub fn message(content: impl Into<String>) -> Self {
        Self::with_body(
            StatusCode::OK,
            ResponseBody::Callback(InteractionCallback {
                r#type: CHANNEL_MESSAGE_WITH_SOURCE,
                data: Some(CallbackData {
                    content: content.into(),
                }),
            }),
        )
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::with_body(
            status,
            ResponseBody::Error(ErrorBody {
                error: message.into(),
            }),
        )
    }

    /// Message content of a type 4 callback, if this is one.
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Callback(InteractionCallback {
                data: Some(data), ..
            }) => Some(data.content.as_str()),
            _ => None,
        }
    }

    pub fn body_json(&self) -> String {
        // Plain structs of strings and integers always serialize.
        serde_json::to_string(&self.body).unwrap_or_else(|_| String::from("{}"))
    }
}

impl From<&InteractionError> for InteractionResponse {
    fn from(error: &InteractionError) -> Self {
        InteractionResponse::error(error.status_code(), error.public_message())
    }
}

impl IntoResponse for InteractionResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.body)).into_response();

        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                response.headers_mut().insert(name, value);
            }
        }

        response
    }
}
