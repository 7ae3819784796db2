pub mod auth;
pub mod health;
pub mod leaderboard;
pub mod matches;
pub mod routes;
pub mod users;

use std::sync::Arc;

use crate::auth::{IdentityResolver, TokenVerifier};
use crate::config::Settings;
use crate::db::models::MatchStatus;
use crate::db::Store;
use crate::error::{AppError, Result};

/// Shared per-worker application state.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub verifier: TokenVerifier,
    pub resolver: IdentityResolver,
    pub settings: Settings,
}

impl AppState {
    pub fn new(settings: Settings, store: Arc<dyn Store>) -> Self {
        AppState {
            verifier: TokenVerifier::new(&settings.bot_token),
            resolver: IdentityResolver::new(settings.dev_mode),
            store,
            settings,
        }
    }
}

/// Parse a `status` query value. Absent means `default`; `all` or an empty
/// value disables the filter.
pub(crate) fn status_filter(
    raw: Option<&str>,
    default: Option<MatchStatus>,
) -> Result<Option<MatchStatus>> {
    match raw.map(str::trim) {
        None => Ok(default),
        Some("") | Some("all") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(AppError::Validation),
    }
}
