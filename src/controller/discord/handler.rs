use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::Dispatch;

use crate::shared::error::InteractionError;
use crate::shared::structs::config::{Configuration, VerificationSetting};
use crate::shared::structs::discord::command::{
    CommandReply, CommandTable, unrecognized_command_message,
};
use crate::shared::structs::discord::interaction::{
    InteractionData, InteractionEnvelope, InteractionRequest, InteractionResponse, InteractionType,
};
use crate::shared::utility::discord_validation::verify_signature;
use crate::shared::{SIGNATURE_HEADER, TIMESTAMP_HEADER, UNSUPPORTED_INTERACTION_MESSAGE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureVerification {
    Enabled { public_key: String },
    /// Skips verification altogether. Never use outside of local testing.
    Disabled,
}

impl SignatureVerification {
    pub fn is_enabled(&self) -> bool {
        matches!(self, SignatureVerification::Enabled { .. })
    }
}

/// Answers Discord interactions. Holds only read-only state, so one instance can serve
/// any number of invocations.
#[derive(Debug, Clone)]
pub struct InteractionHandler {
    verification: SignatureVerification,
    commands: CommandTable,
    logger: Option<Dispatch>,
}

impl InteractionHandler {
    pub fn new(verification: SignatureVerification, commands: CommandTable) -> Self {
        InteractionHandler {
            verification,
            commands,
            logger: None,
        }
    }

    pub fn from_configuration(config: &Configuration) -> Self {
        let verification = match config.signature_verification {
            VerificationSetting::Enabled => {
                if config.public_key.is_empty() {
                    tracing::error!(
                        "Signature verification is enabled but no public key is configured. Every interaction will be rejected."
                    );
                }
                SignatureVerification::Enabled {
                    public_key: config.public_key.clone(),
                }
            }
            VerificationSetting::Disabled => {
                tracing::warn!(
                    "Signature verification is DISABLED. Unsigned requests will be accepted; never run this in production."
                );
                SignatureVerification::Disabled
            }
        };

        Self::new(verification, config.command_table())
    }

    /// Routes every log event of this handler to `logger` instead of the global subscriber.
    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn verification(&self) -> &SignatureVerification {
        &self.verification
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn handle(&self, request: &InteractionRequest) -> InteractionResponse {
        match &self.logger {
            Some(logger) => {
                tracing::dispatcher::with_default(logger, || self.handle_logged(request))
            }
            None => self.handle_logged(request),
        }
    }

    fn handle_logged(&self, request: &InteractionRequest) -> InteractionResponse {
        let span = tracing::info_span!("interaction", body_length = request.raw_body.len());
        let _guard = span.enter();

        let response = match self.try_handle(request) {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    InteractionError::SignatureInvalid(reason) => {
                        tracing::warn!("Rejected interaction: {}", reason)
                    }
                    other => tracing::error!("Error processing interaction: {}", other),
                }
                InteractionResponse::from(&e)
            }
        };

        tracing::debug!(status = response.status_code, "Responding to interaction.");
        response
    }

    fn try_handle(
        &self,
        request: &InteractionRequest,
    ) -> Result<InteractionResponse, InteractionError> {
        let signature = request.header(SIGNATURE_HEADER).unwrap_or_default();
        let timestamp = request.header(TIMESTAMP_HEADER).unwrap_or_default();
        tracing::debug!(signature, timestamp, "Received interaction headers.");

        match &self.verification {
            SignatureVerification::Enabled { public_key } => {
                verify_signature(public_key, signature, timestamp, &request.raw_body)?;
                tracing::debug!("Signature verification successful.");
            }
            SignatureVerification::Disabled => {
                tracing::warn!("Skipping signature verification.");
            }
        }

        let envelope = serde_json::from_str::<InteractionEnvelope>(&request.raw_body)?;
        self.dispatch(&envelope)
    }

    fn dispatch(
        &self,
        envelope: &InteractionEnvelope,
    ) -> Result<InteractionResponse, InteractionError> {
        match envelope.kind() {
            InteractionType::Ping => {
                tracing::info!("Received PING from Discord, responding with PONG.");
                Ok(InteractionResponse::pong())
            }
            InteractionType::ApplicationCommand => {
                let command_name = envelope.command_name();
                tracing::info!(command = command_name, "Received command interaction.");
                let content = self.run_command(command_name, envelope.data.as_ref())?;
                Ok(InteractionResponse::message(content))
            }
            InteractionType::MessageComponent => {
                let custom_id = envelope.custom_id();
                tracing::info!(custom_id, "Received component interaction.");
                Ok(InteractionResponse::message(format!(
                    "interaction with component `{custom_id}` received"
                )))
            }
            InteractionType::Unknown(kind) => {
                tracing::warn!(kind, "Received unsupported interaction type.");
                Ok(InteractionResponse::message(UNSUPPORTED_INTERACTION_MESSAGE))
            }
        }
    }

    fn run_command(
        &self,
        command_name: &str,
        data: Option<&InteractionData>,
    ) -> Result<String, InteractionError> {
        match self.commands.get(command_name) {
            Some(CommandReply::Text(text)) => Ok(text.clone()),
            Some(CommandReply::Handler(handler)) => {
                let default_data = InteractionData::default();
                let data = data.unwrap_or(&default_data);

                match catch_unwind(AssertUnwindSafe(|| (handler.as_ref())(data))) {
                    Ok(result) => Ok(result?),
                    Err(panic) => Err(InteractionError::Internal(anyhow::anyhow!(
                        "command `{}` panicked: {}",
                        command_name,
                        panic_message(panic.as_ref())
                    ))),
                }
            }
            None => {
                tracing::debug!(command = command_name, "Command not found in table.");
                Ok(unrecognized_command_message(command_name))
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use ed25519_dalek::{Signer, SigningKey};
    use serde_json::{Value, json};
    use std::collections::BTreeMap;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use crate::shared::INVALID_SIGNATURE_MESSAGE;

    const TIMESTAMP: &str = "1718000000";

    fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[42u8; 32])
    }

    fn verifying_handler() -> InteractionHandler {
        InteractionHandler::new(
            SignatureVerification::Enabled {
                public_key: hex::encode(signing_key().verifying_key().to_bytes()),
            },
            CommandTable::default(),
        )
    }

    fn open_handler() -> InteractionHandler {
        InteractionHandler::new(SignatureVerification::Disabled, CommandTable::default())
    }

    fn signed_request(body: &str) -> InteractionRequest {
        signed_request_with(TIMESTAMP, body, TIMESTAMP, body)
    }

    fn signed_request_with(
        signed_timestamp: &str,
        signed_body: &str,
        sent_timestamp: &str,
        sent_body: &str,
    ) -> InteractionRequest {
        let message = format!("{signed_timestamp}{signed_body}");
        let signature = hex::encode(signing_key().sign(message.as_bytes()).to_bytes());

        let mut headers = BTreeMap::new();
        headers.insert("X-Signature-Ed25519".to_string(), signature);
        headers.insert("X-Signature-Timestamp".to_string(), sent_timestamp.to_string());
        InteractionRequest::new(headers, sent_body)
    }

    fn unsigned_request(body: &str) -> InteractionRequest {
        InteractionRequest::new(BTreeMap::new(), body)
    }

    fn body_value(response: &InteractionResponse) -> Value {
        serde_json::to_value(&response.body).unwrap()
    }

    #[test]
    fn ping_is_answered_with_pong_when_signed() {
        let response = verifying_handler().handle(&signed_request(r#"{"type":1}"#));
        assert_eq!(response.status_code, 200);
        assert_eq!(body_value(&response), json!({"type": 1}));
    }

    #[test]
    fn ping_is_answered_with_pong_without_verification() {
        let response = open_handler().handle(&unsigned_request(r#"{"type": 1}"#));
        assert_eq!(response.status_code, 200);
        assert_eq!(body_value(&response), json!({"type": 1}));
    }

    #[test]
    fn unsigned_ping_is_rejected_when_verification_is_enabled() {
        let response = verifying_handler().handle(&unsigned_request(r#"{"type":1}"#));
        assert_eq!(response.status_code, 401);
        assert_eq!(body_value(&response), json!({"error": INVALID_SIGNATURE_MESSAGE}));
    }

    #[test]
    fn lowercase_signature_headers_are_accepted() {
        let signed = signed_request(r#"{"type":1}"#);
        let headers = signed
            .headers
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        let request = InteractionRequest::new(headers, signed.raw_body);

        assert_eq!(verifying_handler().handle(&request).status_code, 200);
    }

    #[test]
    fn known_commands_reply_with_mapped_text() {
        let handler = open_handler();
        let cases = [
            ("hello", "Hello! I'm TerraBot, your serverless assistant."),
            ("info", "TerraBot v2.0 - Deployed on AWS Lambda with Terraform"),
            ("ping", "Pong! 🏓"),
        ];

        for (name, expected) in cases {
            let body = json!({"type": 2, "data": {"name": name}}).to_string();
            let response = handler.handle(&unsigned_request(&body));
            assert_eq!(response.status_code, 200);
            assert_eq!(
                body_value(&response),
                json!({"type": 4, "data": {"content": expected}})
            );
        }
    }

    #[test]
    fn unknown_commands_name_the_command() {
        let body = json!({"type": 2, "data": {"name": "teleport"}}).to_string();
        let response = open_handler().handle(&unsigned_request(&body));
        assert_eq!(response.status_code, 200);
        assert_eq!(response.content(), Some("command `teleport` not recognized"));
    }

    #[test]
    fn non_string_names_get_the_fallback_reply() {
        let response = open_handler().handle(&unsigned_request(r#"{"type":2,"data":{"name":42}}"#));
        assert_eq!(response.status_code, 200);
        assert_eq!(response.content(), Some("command `42` not recognized"));

        let response =
            open_handler().handle(&unsigned_request(r#"{"type":3,"data":{"custom_id":7}}"#));
        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.content(),
            Some("interaction with component `7` received")
        );
    }

    #[test]
    fn missing_command_name_falls_back() {
        for body in [r#"{"type":2}"#, r#"{"type":2,"data":{}}"#] {
            let response = open_handler().handle(&unsigned_request(body));
            assert_eq!(response.status_code, 200);
            assert_eq!(response.content(), Some("command `` not recognized"));
        }
    }

    #[test]
    fn components_echo_their_custom_id() {
        let body = json!({"type": 3, "data": {"custom_id": "confirm_button"}}).to_string();
        let response = open_handler().handle(&unsigned_request(&body));
        assert_eq!(response.status_code, 200);
        assert_eq!(
            response.content(),
            Some("interaction with component `confirm_button` received")
        );
    }

    #[test]
    fn other_types_are_unsupported() {
        for kind in [0, 4, 5, 99] {
            let body = json!({"type": kind}).to_string();
            let response = open_handler().handle(&unsigned_request(&body));
            assert_eq!(response.status_code, 200);
            assert_eq!(response.content(), Some(UNSUPPORTED_INTERACTION_MESSAGE));
        }
    }

    #[test]
    fn malformed_json_is_a_server_error() {
        for body in ["", "not json", r#"{"type":"#, r#"{"data":{}}"#] {
            let response = open_handler().handle(&unsigned_request(body));
            assert_eq!(response.status_code, 500, "body: {body:?}");
            let value = body_value(&response);
            assert!(value["error"].as_str().is_some_and(|e| !e.is_empty()));
        }
    }

    #[test]
    fn signed_malformed_json_is_a_server_error() {
        let response = verifying_handler().handle(&signed_request("{oops"));
        assert_eq!(response.status_code, 500);
    }

    #[test]
    fn every_response_is_json() {
        let handler = verifying_handler();
        for request in [
            signed_request(r#"{"type":1}"#),
            unsigned_request(r#"{"type":1}"#),
            signed_request("{"),
        ] {
            let response = handler.handle(&request);
            assert_eq!(
                response.headers.get("Content-Type").map(String::as_str),
                Some("application/json")
            );
        }
    }

    #[test]
    fn tampered_body_is_rejected_before_dispatch() {
        let body = r#"{"type":2,"data":{"name":"hello"}}"#;
        let tampered = r#"{"type":2,"data":{"name":"hellp"}}"#;
        let request = signed_request_with(TIMESTAMP, body, TIMESTAMP, tampered);

        let response = verifying_handler().handle(&request);
        assert_eq!(response.status_code, 401);
        assert_eq!(response.content(), None);
    }

    #[test]
    fn tampered_timestamp_is_rejected() {
        let body = r#"{"type":1}"#;
        let request = signed_request_with(TIMESTAMP, body, "1718000001", body);
        assert_eq!(verifying_handler().handle(&request).status_code, 401);
    }

    #[test]
    fn every_single_bit_flip_of_the_timestamp_is_rejected() {
        let handler = verifying_handler();
        let body = r#"{"type":1}"#;

        for bit in 0..TIMESTAMP.len() * 8 {
            let mut bytes = TIMESTAMP.as_bytes().to_vec();
            bytes[bit / 8] ^= 1 << (bit % 8);
            let Ok(mutated) = String::from_utf8(bytes) else {
                continue;
            };

            let request = signed_request_with(TIMESTAMP, body, &mutated, body);
            let response = handler.handle(&request);
            assert_eq!(response.status_code, 401, "bit {bit}");
            assert_eq!(response.content(), None);
        }
    }

    #[test]
    fn every_single_bit_flip_of_the_signature_is_rejected() {
        let handler = verifying_handler();
        let request = signed_request(r#"{"type":1}"#);
        let signature = hex::decode(request.header(SIGNATURE_HEADER).unwrap()).unwrap();

        for bit in 0..signature.len() * 8 {
            let mut flipped = signature.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);

            let mut mutated = request.clone();
            mutated
                .headers
                .insert("X-Signature-Ed25519".to_string(), hex::encode(flipped));

            let response = handler.handle(&mutated);
            assert_eq!(
                response.status_code,
                StatusCode::UNAUTHORIZED.as_u16(),
                "bit {bit} flip was accepted"
            );
        }
    }

    #[test]
    fn every_single_bit_flip_of_the_body_is_rejected() {
        let handler = verifying_handler();
        let body = r#"{"type":1}"#;

        for bit in 0..body.len() * 8 {
            let mut bytes = body.as_bytes().to_vec();
            bytes[bit / 8] ^= 1 << (bit % 8);
            // Flips that break UTF-8 cannot be carried by a string body.
            let Ok(mutated) = String::from_utf8(bytes) else {
                continue;
            };

            let request = signed_request_with(TIMESTAMP, body, TIMESTAMP, &mutated);
            assert_eq!(handler.handle(&request).status_code, 401, "bit {bit}");
        }
    }

    #[test]
    fn empty_public_key_rejects_everything() {
        let handler = InteractionHandler::new(
            SignatureVerification::Enabled {
                public_key: String::new(),
            },
            CommandTable::default(),
        );
        assert_eq!(handler.handle(&signed_request(r#"{"type":1}"#)).status_code, 401);
    }

    #[test]
    fn handler_commands_can_compute_replies() {
        let mut commands = CommandTable::empty();
        commands.insert_handler("echo", |data| {
            Ok(format!("echo from `{}`", data.name.as_deref().unwrap_or_default()))
        });
        let handler = InteractionHandler::new(SignatureVerification::Disabled, commands);

        let response = handler.handle(&unsigned_request(r#"{"type":2,"data":{"name":"echo"}}"#));
        assert_eq!(response.content(), Some("echo from `echo`"));
    }

    #[test]
    fn failing_command_handlers_become_server_errors() {
        let mut commands = CommandTable::empty();
        commands
            .insert_handler("broken", |_| Err(anyhow::anyhow!("upstream unavailable")))
            .insert_handler("panicky", |_| panic!("boom"));
        let handler = InteractionHandler::new(SignatureVerification::Disabled, commands);

        let response =
            handler.handle(&unsigned_request(r#"{"type":2,"data":{"name":"broken"}}"#));
        assert_eq!(response.status_code, 500);
        assert_eq!(body_value(&response), json!({"error": "upstream unavailable"}));

        let response =
            handler.handle(&unsigned_request(r#"{"type":2,"data":{"name":"panicky"}}"#));
        assert_eq!(response.status_code, 500);
        assert_eq!(
            body_value(&response),
            json!({"error": "command `panicky` panicked: boom"})
        );
    }

    #[test]
    fn identical_requests_produce_identical_responses() {
        let handler = verifying_handler();
        let requests = [
            signed_request(r#"{"type":2,"data":{"name":"info"}}"#),
            signed_request("{broken"),
            unsigned_request(r#"{"type":1}"#),
        ];

        for request in requests {
            let first = handler.handle(&request);
            let second = handler.handle(&request);
            assert_eq!(first, second);
            assert_eq!(first.body_json(), second.body_json());
        }
    }

    #[test]
    fn configuration_builds_matching_handler() {
        let mut config = Configuration::new();
        config.public_key = "ab".repeat(32);
        config.commands.insert("weather".into(), "sunny".into());

        let handler = InteractionHandler::from_configuration(&config);
        assert!(handler.verification().is_enabled());
        assert!(handler.commands().contains("weather"));

        config.signature_verification = VerificationSetting::Disabled;
        let handler = InteractionHandler::from_configuration(&config);
        assert_eq!(handler.verification(), &SignatureVerification::Disabled);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn injected_logger_receives_handler_events() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        let handler = verifying_handler().with_logger(Dispatch::new(subscriber));
        let response = handler.handle(&unsigned_request(r#"{"type":1}"#));
        assert_eq!(response.status_code, 401);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Rejected interaction"), "logs: {output}");
        assert!(output.contains("missing signature or timestamp header"));
    }
}
