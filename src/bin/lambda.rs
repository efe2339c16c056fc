use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::Value;
use terrabot::controller::discord::handler::InteractionHandler;
use terrabot::controller::lambda::{ProxyResponse, handle_proxy_event};
use terrabot::shared::structs::config::{Configuration, LogFormat};
use terrabot::shared::utility::logging::initialize_tracing;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let mut config = Configuration::load()?;
    // CloudWatch reads one JSON object per line.
    config.log_format = LogFormat::Json;
    initialize_tracing(&config.log_level, config.log_format);

    let handler = InteractionHandler::from_configuration(&config);
    let handler = &handler;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        let (payload, context) = event.into_parts();
        tracing::debug!(request_id = %context.request_id, "Received Lambda event.");
        Ok::<ProxyResponse, Error>(handle_proxy_event(handler, payload))
    }))
    .await
}
