use tracing::Level;

use crate::shared::structs::config::LogFormat;

pub fn parse_log_level(level: &str) -> Level {
    match level.to_ascii_uppercase().as_str() {
        "TRACE" => Level::TRACE,
        "INFO" => Level::INFO,
        "WARN" => Level::WARN,
        "ERROR" => Level::ERROR,
        _ => Level::DEBUG,
    }
}

/// Installs the process-wide subscriber. Failing to install one is reported but not fatal.
pub fn initialize_tracing(log_level: &str, log_format: LogFormat) {
    let builder = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(parse_log_level(log_level));

    let result = match log_format {
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish()),
        LogFormat::Json => tracing::subscriber::set_global_default(
            builder.json().with_current_span(true).finish(),
        ),
    };

    if let Err(e) = result {
        eprintln!(
            "Initialization of tracing subscriber failed with error: {}",
            e
        );
    }
}
