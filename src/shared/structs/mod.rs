use std::sync::Arc;

use crate::controller::discord::handler::InteractionHandler;
use crate::shared::structs::config::Configuration;

pub mod config;
pub mod discord;

#[derive(Debug, Clone)]
pub struct AppState {
    pub handler: Arc<InteractionHandler>,
}

impl AppState {
    pub fn new(config: &Configuration) -> Self {
        Self::with_handler(InteractionHandler::from_configuration(config))
    }

    pub fn with_handler(handler: InteractionHandler) -> Self {
        AppState {
            handler: Arc::new(handler),
        }
    }
}
