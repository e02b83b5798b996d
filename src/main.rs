use user_directory::{app, config::AppConfig, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    telemetry::init(&config.log)?;
    tracing::info!(store = ?config.store, format = ?config.log.format, "configuration loaded");

    let state = AppState::init(config).await?;
    let listener = app::bind(&state.config.bind_addr()).await?;
    app::serve(listener, app::build_app(state)).await
}
