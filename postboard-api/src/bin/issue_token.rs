//! Mints a bearer token for a user: `issue-token <user id> [expires-after-seconds]`.
//!
//! The user gets a profile if they have none. Only the token hash is stored,
//! so the printed token cannot be recovered later.

use postboard_api::{
    env::{InitError, connect_store, get_env, install_tracing},
    token::{IssueTokenError, issue_token},
};
use postboard_common::{
    model::{Id, profile::UserMarker},
    util::{ParsePositiveDurationError, PositiveDuration},
};
use std::num::ParseIntError;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
enum CliError {
    #[error("Usage: issue-token <user id> [expires-after-seconds]")]
    Usage,
    #[error("Invalid user id: {0}")]
    InvalidUser(#[from] ParseIntError),
    #[error("Invalid token lifetime: {0}")]
    InvalidLifetime(#[from] ParsePositiveDurationError),
    #[error("DATABASE_URL must be set, tokens for an in-memory store would be lost")]
    NoDatabase,
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    Issue(#[from] IssueTokenError),
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    install_tracing();

    let mut args = std::env::args().skip(1);
    let user: Id<UserMarker> = args
        .next()
        .ok_or(CliError::Usage)?
        .parse::<u64>()?
        .into();
    let expires_after = args
        .next()
        .map(|seconds| seconds.parse::<PositiveDuration>())
        .transpose()?;

    let env = get_env()?;
    if env.database_url.is_none() {
        return Err(CliError::NoDatabase);
    }
    let store = connect_store(&env).await?;

    let token = issue_token(&*store, user, expires_after).await;
    store.close().await;
    let token = token?;

    info!(%user, "Issued token");
    println!("{}", token.as_token_str());

    Ok(())
}
