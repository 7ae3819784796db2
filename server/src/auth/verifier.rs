//! Init-data signature verification.
//!
//! The client forwards the mini app's init data verbatim: `&`-separated
//! `key=value` pairs, one of them `hash`, one of them `user` (JSON). The
//! signature is HMAC-SHA-256 over the remaining pairs sorted by key and
//! joined with `\n`, keyed with SHA-256 of the bot token.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// The user descriptor embedded in verified init data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub username: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("init data has no hash field")]
    MissingHash,

    #[error("init data signature mismatch")]
    BadSignature,

    #[error("init data carries no user")]
    MissingUser,

    #[error("init data user is not valid JSON: {0}")]
    MalformedUser(String),
}

#[derive(Clone)]
pub struct TokenVerifier {
    secret: [u8; 32],
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenVerifier(..)")
    }
}

impl TokenVerifier {
    pub fn new(bot_token: &str) -> Self {
        TokenVerifier {
            secret: Sha256::digest(bot_token.as_bytes()).into(),
        }
    }

    /// Check `init_data` and return the caller it vouches for.
    pub fn verify(&self, init_data: &str) -> Result<TelegramUser, VerifyError> {
        let mut fields = parse_fields(init_data);
        let hash = fields.remove("hash").ok_or(VerifyError::MissingHash)?;

        let mut mac = self.mac();
        mac.update(canonical_string(&fields).as_bytes());

        // Only the lowercase hex rendering is accepted.
        if hash.len() != 64 || hash.bytes().any(|b| b.is_ascii_uppercase()) {
            return Err(VerifyError::BadSignature);
        }
        let expected = hex::decode(hash).map_err(|_| VerifyError::BadSignature)?;
        mac.verify_slice(&expected)
            .map_err(|_| VerifyError::BadSignature)?;

        let user = fields.get("user").ok_or(VerifyError::MissingUser)?;
        serde_json::from_str(user).map_err(|e| VerifyError::MalformedUser(e.to_string()))
    }

    /// Lowercase hex HMAC of `data_check_string`; what a genuine `hash`
    /// field holds.
    pub fn signature(&self, data_check_string: &str) -> String {
        let mut mac = self.mac();
        mac.update(data_check_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Produce signed init data for `pairs`. Used by tests and local tooling
    /// to impersonate the platform.
    pub fn sign(&self, pairs: &[(&str, &str)]) -> String {
        let fields: BTreeMap<&str, &str> = pairs.iter().copied().collect();
        let hash = self.signature(&canonical_string(&fields));
        let mut out: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
        out.push(format!("hash={hash}"));
        out.join("&")
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC takes keys of any length")
    }
}

/// Split on `&`, then on the first `=`. Later duplicates win; items without
/// `=` are skipped. Values are taken as-is.
pub fn parse_fields(init_data: &str) -> BTreeMap<&str, &str> {
    init_data
        .split('&')
        .filter_map(|item| item.split_once('='))
        .collect()
}

/// `key=value` lines in byte-wise key order.
pub fn canonical_string<K: AsRef<str>, V: AsRef<str>>(fields: &BTreeMap<K, V>) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}
