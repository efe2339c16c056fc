use terrabot::controller::build_router;
use terrabot::shared::structs::AppState;
use terrabot::shared::structs::config::Configuration;
use terrabot::shared::utility::logging::initialize_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Configuration::load()?;
    initialize_tracing(&config.log_level, config.log_format);

    let server_bind_point = config.server_bind_point.clone();
    let app = build_router(AppState::new(&config));

    let listener = tokio::net::TcpListener::bind(&server_bind_point).await?;
    tracing::info!("Listening for Discord interactions on {}", &server_bind_point);
    axum::serve(listener, app).await?;

    Ok(())
}
