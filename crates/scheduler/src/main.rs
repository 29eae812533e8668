use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use scheduler::config::SchedulerConfig;
use scheduler::db::{ContactInfo, Role, SchedulerDb};
use scheduler::error::SchedulerError;
use scheduler::server;
use scheduler::types::AppState;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("scheduler.json"));

    let config = SchedulerConfig::load_from_file(&config_path)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .init();

    let db = SchedulerDb::open(&config.database_path)
        .with_context(|| format!("failed to open database {}", config.database_path))?;
    info!("Opened database {}", config.database_path);

    if let Some(boot) = &config.bootstrap_supervisor {
        match db.create_user(&boot.email, &boot.password, Role::Supervisor, &ContactInfo::default()) {
            Ok(user) => info!("Created supervisor {}", user.email),
            Err(SchedulerError::Integrity { .. }) => {}
            Err(e) => warn!("Could not create supervisor {}: {}", boot.email, e),
        }
    }

    let address = config.bind_address();
    let state = Arc::new(AppState::new(db, config));
    let app = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
