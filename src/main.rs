mod admin;
mod app;
mod auth;
mod config;
mod error;
mod payload;
mod state;
mod users;

#[cfg(test)]
mod test_util;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "accounts=debug,axum=info,tower_http=info".to_string());
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

    let app_state = AppState::init().await?;
    bootstrap_superuser(&app_state).await?;

    let host = app_state.config.host.clone();
    let port = app_state.config.port;
    app::serve(app::build_app(app_state), &host, port).await
}

/// Creates the configured superuser unless the email is already taken.
async fn bootstrap_superuser(state: &AppState) -> anyhow::Result<()> {
    let Some(seed) = &state.config.superuser else {
        return Ok(());
    };
    let users = state.users();
    if users.get_by_email(&seed.email).await?.is_some() {
        tracing::debug!(email = %seed.email, "superuser already present");
        return Ok(());
    }
    let user = users.create_superuser(&seed.email, &seed.password).await?;
    tracing::info!(user_id = %user.id, email = %user.email, "superuser created");
    Ok(())
}
