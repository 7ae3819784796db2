//! Request metrics for the match, user and leaderboard API.
//!
//! Every route is counted and timed under the `dribbling` namespace
//! (`dribbling_http_requests_total`, `dribbling_http_requests_duration_seconds`,
//! with per-endpoint labels). The scrape endpoint is `/metrics`,
//! outside `/api` and the credential check.

use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use once_cell::sync::Lazy;

/// Request metrics middleware, also serving `/metrics`.
pub static METRICS: Lazy<PrometheusMetrics> = Lazy::new(|| {
    PrometheusMetricsBuilder::new("dribbling")
        .endpoint("/metrics")
        .build()
        .expect("metrics builder")
});
