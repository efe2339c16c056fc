use std::collections::BTreeMap;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::controller::discord::handler::InteractionHandler;
use crate::shared::error::InteractionError;
use crate::shared::structs::discord::interaction::{InteractionRequest, InteractionResponse};

/// API Gateway / function URL proxy event. Only the fields an interaction needs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl From<InteractionResponse> for ProxyResponse {
    fn from(response: InteractionResponse) -> Self {
        let body = response.body_json();
        ProxyResponse {
            status_code: response.status_code,
            headers: response.headers,
            body,
        }
    }
}

impl TryFrom<ProxyRequest> for InteractionRequest {
    type Error = InteractionError;

    fn try_from(event: ProxyRequest) -> Result<Self, Self::Error> {
        let body = event.body.context("request body is missing")?;

        let raw_body = if event.is_base64_encoded {
            let decoded = STANDARD
                .decode(body.as_bytes())
                .context("failed to decode base64 request body")?;
            String::from_utf8(decoded).context("request body is not valid UTF-8")?
        } else {
            body
        };

        Ok(InteractionRequest::new(
            event.headers.unwrap_or_default(),
            raw_body,
        ))
    }
}

/// Turns one raw proxy event into a proxy response. Never fails: malformed events are
/// answered with a structured 500.
pub fn handle_proxy_event(handler: &InteractionHandler, event: Value) -> ProxyResponse {
    let request = serde_json::from_value::<ProxyRequest>(event)
        .context("malformed proxy event")
        .map_err(InteractionError::from)
        .and_then(InteractionRequest::try_from);

    let response = match request {
        Ok(request) => handler.handle(&request),
        Err(e) => {
            tracing::error!("Error processing event: {}", e);
            InteractionResponse::from(&e)
        }
    };

    ProxyResponse::from(response)
}
