use std::collections::HashMap;
use std::path::Path;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, USER_AGENT as USER_AGENT_HEADER};

use crate::shared::structs::discord::command::CommandDescriptor;
use crate::shared::{DISCORD_APPLICATION_COMMANDS_ENDPOINT, DISCORD_ROOT_ENDPOINT, USER_AGENT};

pub const DISCORD_TOKEN_VARIABLE: &str = "DISCORD_TOKEN";
pub const DISCORD_APPLICATION_ID_VARIABLE: &str = "DISCORD_APPLICATION_ID";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    pub registered: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl RegistrationReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registers slash commands for one application through Discord's HTTP API.
#[derive(Debug, Clone)]
pub struct CommandRegistrar {
    http_client: reqwest::Client,
    root_endpoint: String,
    application_id: String,
    bot_token: String,
}

impl CommandRegistrar {
    pub fn new(http_client: reqwest::Client, application_id: &str, bot_token: &str) -> Self {
        CommandRegistrar {
            http_client,
            root_endpoint: DISCORD_ROOT_ENDPOINT.into(),
            application_id: application_id.into(),
            bot_token: bot_token.into(),
        }
    }

    /// Reads `DISCORD_TOKEN` and `DISCORD_APPLICATION_ID` from the process environment,
    /// falling back to a dotenv file for anything unset. A missing file is not an error.
    pub fn from_env_file(
        http_client: reqwest::Client,
        env_file: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let env_file = env_file.as_ref();
        let mut file_values = HashMap::new();

        if env_file.exists() {
            for item in dotenvy::from_path_iter(env_file)? {
                let (key, value) = item?;
                file_values.insert(key, value);
            }
            tracing::debug!("Loaded {} variables from {}", file_values.len(), env_file.display());
        }

        Self::from_lookup(http_client, |key| {
            std::env::var(key)
                .ok()
                .filter(|value| !value.is_empty())
                .or_else(|| file_values.get(key).cloned())
        })
    }

    fn from_lookup<F>(http_client: reqwest::Client, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match (
            lookup(DISCORD_TOKEN_VARIABLE),
            lookup(DISCORD_APPLICATION_ID_VARIABLE),
        ) {
            (Some(token), Some(application_id))
                if !token.is_empty() && !application_id.is_empty() =>
            {
                Ok(Self::new(http_client, &application_id, &token))
            }
            _ => Err(anyhow::anyhow!(
                "{} and {} must both be set.",
                DISCORD_TOKEN_VARIABLE,
                DISCORD_APPLICATION_ID_VARIABLE
            )),
        }
    }

    pub fn with_root_endpoint(mut self, root_endpoint: &str) -> Self {
        self.root_endpoint = root_endpoint.trim_end_matches('/').into();
        self
    }

    pub fn commands_url(&self) -> String {
        format!(
            "{}{}",
            self.root_endpoint,
            DISCORD_APPLICATION_COMMANDS_ENDPOINT.replace("$APPLICATION_ID", &self.application_id)
        )
    }

    /// Posts each descriptor in order. A failed command is recorded and the rest still run.
    pub async fn register_all(&self, commands: &[CommandDescriptor]) -> RegistrationReport {
        tracing::info!(
            "Registering {} commands for application {}...",
            commands.len(),
            &self.application_id
        );

        let mut report = RegistrationReport::default();
        for command in commands {
            match self.register(command).await {
                Ok(()) => {
                    tracing::info!("Command '{}' registered.", &command.name);
                    report.registered.push(command.name.clone());
                }
                Err(e) => {
                    tracing::error!("Failed to register command '{}': {}", &command.name, e);
                    report.failed.push((command.name.clone(), e.to_string()));
                }
            }
        }

        report
    }

    pub async fn register(&self, command: &CommandDescriptor) -> anyhow::Result<()> {
        tracing::debug!("Registering command: {}", &command.name);

        let response = self
            .http_client
            .post(self.commands_url())
            .header(AUTHORIZATION, format!("Bot {}", &self.bot_token))
            .header(USER_AGENT_HEADER, USER_AGENT)
            .json(command)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            Ok(())
        } else {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("failed to read response body: {e}"),
            };
            Err(anyhow::anyhow!("{}: {}", status.as_u16(), text))
        }
    }
}
