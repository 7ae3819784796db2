//! Request extractor resolving the acting user from the init-data header.

use actix_web::{dev::Payload, error::ErrorInternalServerError, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;

use crate::auth::{Credential, TokenVerifier, VerifyError};
use crate::db::models::User;
use crate::http::AppState;

/// Header the mini app puts its raw init data in.
pub const INIT_DATA_HEADER: &str = "X-Telegram-Init-Data";

/// The verified (or, in development mode, placeholder) caller.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Run the signature check on whatever the request carried.
pub fn credential_from(req: &HttpRequest, verifier: &TokenVerifier) -> Credential {
    match req.headers().get(INIT_DATA_HEADER) {
        None => Credential::Missing,
        Some(v) if v.is_empty() => Credential::Missing,
        // Raw user JSON may carry non-ASCII names, so decode as UTF-8
        // rather than visible ASCII.
        Some(v) => match std::str::from_utf8(v.as_bytes()) {
            Ok(init_data) => match verifier.verify(init_data) {
                Ok(identity) => Credential::Verified(identity),
                Err(e) => Credential::Rejected(e),
            },
            Err(_) => Credential::Rejected(VerifyError::BadSignature),
        },
    }
}

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _pl: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let credential = state
            .as_ref()
            .map(|s| credential_from(req, &s.verifier));

        Box::pin(async move {
            let (state, credential) = match (state, credential) {
                (Some(s), Some(c)) => (s, c),
                _ => return Err(ErrorInternalServerError("application state missing")),
            };
            let user = state
                .resolver
                .resolve(state.store.as_ref(), credential)
                .await?;
            Ok(CurrentUser(user))
        })
    }
}
