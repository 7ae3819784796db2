//! Dribbling: pick-up football matches for a chat-platform mini app.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod matches;
pub mod metrics;
pub mod ranking;
