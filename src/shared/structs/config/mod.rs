use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::shared::structs::discord::command::CommandTable;

pub const PUBLIC_KEY_VARIABLE: &str = "DISCORD_PUBLIC_KEY";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationSetting {
    #[default]
    Enabled,
    /// Insecure: accepts unsigned requests. Only meant for local testing.
    Disabled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Configuration {
    pub server_bind_point: String,
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub signature_verification: VerificationSetting,
    /// Extra or overriding replies, command name to text.
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
    #[serde(skip)]
    pub public_key: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl Configuration {
    pub fn new() -> Self {
        Configuration {
            server_bind_point: "0.0.0.0:80".into(),
            log_level: "DEBUG".into(),
            log_format: LogFormat::Pretty,
            signature_verification: VerificationSetting::Enabled,
            commands: BTreeMap::new(),
            public_key: String::new(),
        }
    }

    /// Loads the configuration file when `CONFIG_DIRECTORY` and `CONFIG_FILE_NAME` are set,
    /// otherwise starts from defaults. Environment overrides are applied last.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = match (
            std::env::var("CONFIG_DIRECTORY"),
            std::env::var("CONFIG_FILE_NAME"),
        ) {
            (Ok(directory), Ok(file_name)) => Self::load_from_config_file(&directory, &file_name)?,
            _ => Configuration::new(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from_config_file(
        config_directory_path: &str,
        config_file_name: &str,
    ) -> anyhow::Result<Self> {
        let config_directory = std::path::Path::new(config_directory_path);
        if !config_directory.exists() {
            std::fs::create_dir_all(config_directory)?;
        }

        let configuration_path = config_directory.join(config_file_name);
        if !configuration_path.exists() {
            let new_config = Configuration::new();
            let serialized = toml::to_string_pretty(&new_config)?;
            std::fs::write(configuration_path, serialized)?;
            Ok(new_config)
        } else {
            let raw_config = std::fs::read_to_string(configuration_path)?;
            let deserialized: Configuration = toml::from_str(&raw_config)?;
            Ok(deserialized)
        }
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level;
        }

        match lookup("LOG_FORMAT").as_deref() {
            Some("json") | Some("JSON") => self.log_format = LogFormat::Json,
            Some("pretty") | Some("PRETTY") => self.log_format = LogFormat::Pretty,
            _ => {}
        }

        if let (Some(bind_point), Some(port)) = (lookup("SERVER_BIND_POINT"), lookup("PORT")) {
            self.server_bind_point = format!("{}:{}", bind_point, port);
        }

        if let Some(setting) = lookup("SIGNATURE_VERIFICATION") {
            self.signature_verification = match setting.to_ascii_lowercase().as_str() {
                "disabled" | "false" | "off" | "0" => VerificationSetting::Disabled,
                _ => VerificationSetting::Enabled,
            };
        }

        if let Some(public_key) = lookup(PUBLIC_KEY_VARIABLE) {
            self.public_key = public_key.trim().to_string();
        }
    }

    /// The default command table with the configured replies layered on top.
    pub fn command_table(&self) -> CommandTable {
        let mut table = CommandTable::default();
        for (name, reply) in &self.commands {
            table.insert_text(name, reply);
        }
        table
    }
}
