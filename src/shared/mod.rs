pub mod error;
pub mod structs;
pub mod utility;

pub const USER_AGENT: &str = concat!(
    "DiscordBot (https://github.com/terrabot/terrabot, ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

pub const CONTENT_TYPE_HEADER: &str = "Content-Type";
pub const CONTENT_TYPE_JSON: &str = "application/json";

pub const INTERACTION_ROUTE: &str = "/api/discord/interaction";
pub const HEALTH_ROUTE: &str = "/health";

pub const DISCORD_ROOT_ENDPOINT: &str = "https://discord.com/api/v10";
pub const DISCORD_APPLICATION_COMMANDS_ENDPOINT: &str = "/applications/$APPLICATION_ID/commands";

pub const INVALID_SIGNATURE_MESSAGE: &str = "Invalid request signature";
pub const UNSUPPORTED_INTERACTION_MESSAGE: &str = "unsupported interaction type";
