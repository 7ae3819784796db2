//! Maps a verified identity to a stored user, creating it on first sight.

use crate::db::models::{NewUser, User};
use crate::db::Store;
use crate::error::{AppError, Result};

use super::verifier::{TelegramUser, VerifyError};

/// Telegram id of the placeholder user served in development mode.
pub const DEV_TELEGRAM_ID: i64 = 123_456_789;

/// What the request carried, after the signature check.
#[derive(Debug, Clone)]
pub enum Credential {
    Missing,
    Verified(TelegramUser),
    Rejected(VerifyError),
}

#[derive(Debug, Clone, Copy)]
pub struct IdentityResolver {
    dev_mode: bool,
}

impl IdentityResolver {
    pub fn new(dev_mode: bool) -> Self {
        IdentityResolver { dev_mode }
    }

    /// The acting user for a request, or `Unauthenticated`.
    ///
    /// In development mode a missing or rejected credential falls back to
    /// the placeholder user; outside it both are refused.
    pub async fn resolve(&self, store: &dyn Store, credential: Credential) -> Result<User> {
        match credential {
            Credential::Verified(identity) => resolve_or_create(store, &identity).await,
            Credential::Missing if self.dev_mode => dev_user(store).await,
            Credential::Rejected(reason) if self.dev_mode => {
                log::debug!("dev mode: ignoring rejected init data ({reason})");
                dev_user(store).await
            }
            Credential::Missing => Err(AppError::Unauthenticated("Missing authentication data")),
            Credential::Rejected(reason) => {
                log::warn!("rejected init data: {reason}");
                Err(AppError::Unauthenticated("Invalid authentication data"))
            }
        }
    }
}

/// Look the identity up by telegram id; persist a zero-stat user if absent.
pub async fn resolve_or_create(store: &dyn Store, identity: &TelegramUser) -> Result<User> {
    if let Some(user) = store.user_by_telegram_id(identity.id).await? {
        return Ok(user);
    }
    let user = store
        .create_user(&NewUser {
            telegram_id: identity.id,
            username: identity.username.clone(),
            first_name: identity.first_name.clone(),
            photo_url: identity.photo_url.clone(),
        })
        .await?;
    log::info!("registered user {} (telegram {})", user.id, user.telegram_id);
    Ok(user)
}

async fn dev_user(store: &dyn Store) -> Result<User> {
    resolve_or_create(
        store,
        &TelegramUser {
            id: DEV_TELEGRAM_ID,
            first_name: "Тестовый".into(),
            username: Some("test_user".into()),
            photo_url: None,
        },
    )
    .await
}
