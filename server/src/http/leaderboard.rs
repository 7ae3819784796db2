// src/http/leaderboard.rs

use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::error::Result;
use crate::http::auth::CurrentUser;
use crate::http::AppState;
use crate::ranking;

#[derive(Deserialize)]
pub struct LeaderboardParams {
    /// Maximum number of entries to return (1..=500, default 100).
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[get("/leaderboard")]
pub async fn leaderboard(
    state: web::Data<AppState>,
    web::Query(params): web::Query<LeaderboardParams>,
    CurrentUser(viewer): CurrentUser,
) -> Result<HttpResponse> {
    let board = ranking::leaderboard(
        state.store.as_ref(),
        &viewer,
        params.offset.unwrap_or(0),
        params.limit.unwrap_or(100),
    )
    .await?;
    Ok(HttpResponse::Ok().json(board))
}

/// Mounts the leaderboard route under `/api`
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(leaderboard);
}
