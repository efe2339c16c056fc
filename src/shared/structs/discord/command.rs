use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::shared::structs::discord::interaction::InteractionData;

pub const CHAT_INPUT_COMMAND_TYPE: u8 = 1;

pub type CommandHandler = Arc<dyn Fn(&InteractionData) -> anyhow::Result<String> + Send + Sync>;

#[derive(Clone)]
pub enum CommandReply {
    Text(String),
    Handler(CommandHandler),
}

impl fmt::Debug for CommandReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandReply::Text(text) => f.debug_tuple("Text").field(text).finish(),
            CommandReply::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

/// A slash command as registered with Discord.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    pub r#type: u8,
}

impl CommandDescriptor {
    pub fn chat_input(name: &str, description: &str) -> Self {
        CommandDescriptor {
            name: name.into(),
            description: description.into(),
            r#type: CHAT_INPUT_COMMAND_TYPE,
        }
    }
}

struct DefaultCommand {
    name: &'static str,
    description: &'static str,
    reply: &'static str,
}

const DEFAULT_COMMANDS: [DefaultCommand; 3] = [
    DefaultCommand {
        name: "hello",
        description: "Greets the user",
        reply: "Hello! I'm TerraBot, your serverless assistant.",
    },
    DefaultCommand {
        name: "info",
        description: "Shows information about the bot",
        reply: "TerraBot v2.0 - Deployed on AWS Lambda with Terraform",
    },
    DefaultCommand {
        name: "ping",
        description: "Checks that the bot is alive",
        reply: "Pong! 🏓",
    },
];

pub static DEFAULT_COMMAND_DESCRIPTORS: Lazy<Vec<CommandDescriptor>> = Lazy::new(|| {
    DEFAULT_COMMANDS
        .iter()
        .map(|command| CommandDescriptor::chat_input(command.name, command.description))
        .collect()
});

/// Command name to reply. Lookups are exact and case-sensitive, like Discord command names.
#[derive(Debug, Clone)]
pub struct CommandTable {
    commands: BTreeMap<String, CommandReply>,
}

impl Default for CommandTable {
    fn default() -> Self {
        let mut table = CommandTable::empty();
        for command in DEFAULT_COMMANDS.iter() {
            table.insert_text(command.name, command.reply);
        }
        table
    }
}

impl CommandTable {
    pub fn empty() -> Self {
        CommandTable {
            commands: BTreeMap::new(),
        }
    }

    pub fn insert_text(&mut self, name: &str, reply: &str) -> &mut Self {
        self.commands
            .insert(name.to_string(), CommandReply::Text(reply.to_string()));
        self
    }

    pub fn insert_handler<F>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(&InteractionData) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.commands
            .insert(name.to_string(), CommandReply::Handler(Arc::new(handler)));
        self
    }

    pub fn get(&self, name: &str) -> Option<&CommandReply> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }
}

pub fn unrecognized_command_message(name: &str) -> String {
    format!("command `{name}` not recognized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_registered_descriptors() {
        let table = CommandTable::default();
        let descriptor_names: Vec<&str> = DEFAULT_COMMAND_DESCRIPTORS
            .iter()
            .map(|descriptor| descriptor.name.as_str())
            .collect();

        assert_eq!(table.commands.len(), descriptor_names.len());
        for name in descriptor_names {
            assert!(table.contains(name), "missing reply for `{name}`");
        }
    }

    #[test]
    fn descriptors_are_chat_input_commands() {
        assert!(
            DEFAULT_COMMAND_DESCRIPTORS
                .iter()
                .all(|descriptor| descriptor.r#type == CHAT_INPUT_COMMAND_TYPE)
        );
        let json = serde_json::to_value(&DEFAULT_COMMAND_DESCRIPTORS[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "hello", "description": "Greets the user", "type": 1})
        );
    }

    #[test]
    fn inserted_entries_replace_defaults() {
        let mut table = CommandTable::default();
        table
            .insert_text("hello", "hi there")
            .insert_handler("roll", |_| Ok("4".to_string()));

        assert!(matches!(table.get("hello"), Some(CommandReply::Text(text)) if text == "hi there"));
        assert!(matches!(table.get("roll"), Some(CommandReply::Handler(_))));
        assert!(table.get("Hello").is_none());
    }

    #[test]
    fn unrecognized_message_names_the_command() {
        assert_eq!(
            unrecognized_command_message("dance"),
            "command `dance` not recognized"
        );
    }
}
