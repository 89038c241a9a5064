use crate::token::{IssueTokenError, issue_token};
use postboard_common::snowflake::{ProcessId, WorkerId};
use postboard_db::{
    client::DbClient,
    memory::MemoryStore,
    store::{DbError, PostStore},
};
use serde::Deserialize;
use std::{
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Error setting up the store: {0}")]
    Store(#[from] DbError),
    #[error("Error issuing the in-memory token: {0}")]
    MemoryToken(#[from] IssueTokenError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

/// Process configuration, read from the environment and an optional `.env` file.
#[derive(Clone, Eq, PartialEq, Hash, Deserialize)]
pub struct Env {
    #[serde(default = "default_server_address")]
    pub server_address: IpAddr,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    pub database_url: Option<String>,
    /// Without a database, a token for this user is issued at startup.
    pub memory_token_user: Option<u64>,
    #[serde(default)]
    pub worker_id: WorkerId,
    #[serde(default)]
    pub process_id: ProcessId,
}

fn default_server_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_server_port() -> u16 {
    5000
}

pub fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "postboard_api=debug,\
                postboard_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .env file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

/// Connects to `DATABASE_URL` and migrates it, or falls back to memory.
pub async fn connect_store(env: &Env) -> Result<Arc<dyn PostStore>, InitError> {
    let Some(database_url) = &env.database_url else {
        warn!("DATABASE_URL is not set, posts will only be kept in memory");
        let store = MemoryStore::new(env.worker_id, env.process_id);
        seed_memory_token(&store, env.memory_token_user).await?;
        return Ok(Arc::new(store));
    };

    let client = DbClient::connect(database_url, env.worker_id, env.process_id).await?;
    client.migrate().await?;

    Ok(Arc::new(client))
}

/// The in-memory store starts without authentications, so protected routes
/// answer 401 unless a token is issued here.
async fn seed_memory_token(store: &MemoryStore, user: Option<u64>) -> Result<(), InitError> {
    let Some(user) = user else {
        warn!("MEMORY_TOKEN_USER is not set, protected routes will reject every request");
        return Ok(());
    };

    let token = issue_token(store, user.into(), None).await?;
    info!(%user, token = %token.as_token_str(), "Issued in-memory token");

    Ok(())
}
