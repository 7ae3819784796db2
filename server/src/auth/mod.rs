//! Caller identity: signature check on the init data, then user lookup.

pub mod resolver;
pub mod verifier;

pub use resolver::{Credential, IdentityResolver, DEV_TELEGRAM_ID};
pub use verifier::{TelegramUser, TokenVerifier, VerifyError};
