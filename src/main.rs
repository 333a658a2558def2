mod config;
mod counter;
mod db;
mod directory;
mod response;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use config::AppConfig;
use counter::{CounterStore, MemoryCounterStore, RedisCounterStore};
use directory::http::{HttpSchoolDirectory, HttpUserDirectory};
use services::room_store::PgRoomStore;
use state::{AppState, SessionSettings};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "everyschool failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    let pool = db::init_pool(&config.database_url).await?;

    // Redis is optional: a single instance can keep live counts in memory.
    let counter: Arc<dyn CounterStore> = match config.redis_url.as_deref() {
        Some(url) => match RedisCounterStore::connect(url).await {
            Ok(store) => {
                tracing::info!("redis counter store connected");
                Arc::new(store)
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable — live counts kept in memory");
                Arc::new(MemoryCounterStore::new())
            }
        },
        None => Arc::new(MemoryCounterStore::new()),
    };

    let users = HttpUserDirectory::new(config.user_service_url.clone(), config.directory_timeouts)?;
    let schools = HttpSchoolDirectory::new(config.school_service_url.clone(), config.directory_timeouts)?;

    let state = AppState::new(
        pool.clone(),
        Arc::new(PgRoomStore::new(pool)),
        Arc::new(users),
        Arc::new(schools),
        counter,
        SessionSettings::from_config(&config),
    );

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;

    tracing::info!(port = config.port, "everyschool listening");
    axum::serve(listener, app).await?;
    Ok(())
}
