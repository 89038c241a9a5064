use postboard_common::{
    model::{
        Id,
        auth::{AuthToken, AuthTokenHashError, Authentication},
        profile::{Profile, ProfileHandle, UserMarker},
    },
    util::PositiveDuration,
};
use postboard_db::store::{DbError, PostStore};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Error)]
pub enum IssueTokenError {
    #[error("The new token could not be hashed: {0}")]
    Hash(#[from] AuthTokenHashError),
    #[error("The token could not be stored: {0}")]
    Store(#[from] DbError),
}

/// Mints a bearer token for `user` and stores its hash.
///
/// The user gets a default profile if they have none. Only the returned token
/// can authenticate; it cannot be recovered from the store.
pub async fn issue_token(
    store: &dyn PostStore,
    user: Id<UserMarker>,
    expires_after: Option<PositiveDuration>,
) -> Result<AuthToken, IssueTokenError> {
    store
        .create_profile(&Profile {
            user,
            handle: ProfileHandle::for_user(user),
        })
        .await?;

    let token = AuthToken::generate_random(user);
    store
        .create_auth(&Authentication {
            user,
            token_hash: token.hash()?,
            created_at: OffsetDateTime::now_utc(),
            expires_after,
        })
        .await?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::issue_token;
    use postboard_common::{model::Id, util::PositiveDuration};
    use postboard_db::{memory::MemoryStore, store::PostStore};

    #[tokio::test]
    async fn issued_token_is_stored_with_profile() {
        let store = MemoryStore::default();
        let user = Id::from(7);

        let token = issue_token(&store, user, PositiveDuration::from_seconds(60).ok())
            .await
            .unwrap();

        let authentication = store
            .fetch_auth(&token.hash().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(authentication.user, user);
        assert_eq!(
            authentication.expires_after,
            PositiveDuration::from_seconds(60).ok()
        );
        assert_eq!(
            store
                .fetch_profile(user)
                .await
                .unwrap()
                .map(|profile| profile.handle.get().to_owned()),
            Some("user7".to_owned())
        );
    }
}
