use terrabot::controller::discord::register::CommandRegistrar;
use terrabot::shared::structs::config::LogFormat;
use terrabot::shared::structs::discord::command::DEFAULT_COMMAND_DESCRIPTORS;
use terrabot::shared::utility::logging::initialize_tracing;

const ENV_FILE: &str = ".env";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".into());
    initialize_tracing(&log_level, LogFormat::Pretty);

    let registrar = CommandRegistrar::from_env_file(reqwest::Client::new(), ENV_FILE)?;
    let report = registrar.register_all(&DEFAULT_COMMAND_DESCRIPTORS).await;

    if report.is_success() {
        tracing::info!("Registered {} commands.", report.registered.len());
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Failed to register {} of {} commands: {:?}",
            report.failed.len(),
            DEFAULT_COMMAND_DESCRIPTORS.len(),
            report.failed
        ))
    }
}
