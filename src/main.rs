use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use topic_reserver::config::Config;
use topic_reserver::gateways::{DiscourseClient, SheetsClient};
use topic_reserver::ledger::FileLedger;
use topic_reserver::reservation::Reserver;
use topic_reserver::server::{AppState, build_router};

#[tokio::main]
async fn main() {
    // Load a .env file if one is present; deployed environments set real vars.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "topic_reserver=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let forum = match DiscourseClient::new(
        &config.discourse_url,
        &config.discourse_api_key,
        &config.discourse_api_username,
        config.gateway_timeout,
    ) {
        Ok(forum) => forum,
        Err(e) => {
            tracing::error!("failed to construct forum client: {}", e);
            std::process::exit(1);
        }
    };

    let sheets = match SheetsClient::new(
        &config.spreadsheet_id,
        &config.sheets_token,
        config.gateway_timeout,
    ) {
        Ok(sheets) => sheets,
        Err(e) => {
            tracing::error!("failed to construct spreadsheet client: {}", e);
            std::process::exit(1);
        }
    };

    let ledger = match FileLedger::new(&config.ledger_dir) {
        Ok(ledger) => ledger,
        Err(e) => {
            tracing::error!(dir = %config.ledger_dir.display(), "failed to open ledger: {}", e);
            std::process::exit(1);
        }
    };

    let reserver = Reserver::new(
        config.policy.clone(),
        forum,
        sheets,
        ledger,
        config.sheet_layout.clone(),
        config.discourse_url.clone(),
    );

    let app = build_router(AppState::new(config.webhook_secret.as_bytes(), reserver));

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
