mod app;
mod auth;
mod config;
mod db;
mod errors;
mod seed;
mod state;
mod students;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "classroom=debug,axum=info,tower_http=info,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    tracing::info!(
        environment = %app_state.config.environment,
        store = ?app_state.config.store,
        "state initialised"
    );

    if app_state.config.seed_demo_data {
        seed::seed_demo_data(&app_state).await?;
    }

    app::serve(app::build_app(app_state)).await
}
