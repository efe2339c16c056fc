use axum::http::StatusCode;
use thiserror::Error;

use crate::shared::INVALID_SIGNATURE_MESSAGE;

/// Every way a single interaction can fail. All variants are terminal for the invocation.
#[derive(Debug, Error)]
pub enum InteractionError {
    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),
    #[error("failed to parse interaction body: {0}")]
    BodyParse(#[from] serde_json::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl InteractionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            InteractionError::SignatureInvalid(_) => StatusCode::UNAUTHORIZED,
            InteractionError::BodyParse(_) | InteractionError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message returned to the caller. The reason behind a rejected signature is only logged.
    pub fn public_message(&self) -> String {
        match self {
            InteractionError::SignatureInvalid(_) => INVALID_SIGNATURE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}
