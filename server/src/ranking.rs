//! Leaderboard over stored user stats.

use serde::Serialize;
use uuid::Uuid;

use crate::db::models::User;
use crate::db::Store;
use crate::error::Result;

/// Upper bound on one leaderboard page.
pub const MAX_PAGE: i64 = 500;

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: i64,
    pub id: Uuid,
    pub name: String,
    pub username: Option<String>,
    pub rating: i32,
    pub matches: i32,
    pub wins: i32,
    pub losses: i32,
    pub win_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct ViewerSummary {
    pub id: Uuid,
    pub name: String,
    pub rating: i32,
    pub matches: i32,
}

#[derive(Debug, Serialize)]
pub struct Leaderboard {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub total: i64,
    /// `1 + users with a strictly higher rating`. Ties on rating share a
    /// rank here even though the page orders them by wins.
    pub current_user_rank: i64,
    pub current_user: ViewerSummary,
}

/// Win percentage with one decimal; zero when nothing has been played.
pub fn win_rate(wins: i32, matches_played: i32) -> f64 {
    if matches_played <= 0 {
        return 0.0;
    }
    let pct = f64::from(wins) / f64::from(matches_played) * 100.0;
    (pct * 10.0).round() / 10.0
}

pub async fn leaderboard(
    store: &dyn Store,
    viewer: &User,
    offset: i64,
    limit: i64,
) -> Result<Leaderboard> {
    let offset = offset.max(0);
    let limit = limit.clamp(1, MAX_PAGE);

    let users = store.users_by_rating(offset, limit).await?;
    let leaderboard = users
        .into_iter()
        .zip(offset + 1..)
        .map(|(u, rank)| LeaderboardEntry {
            rank,
            id: u.id,
            win_rate: win_rate(u.wins, u.matches_played),
            name: u.first_name,
            username: u.username,
            rating: u.rating,
            matches: u.matches_played,
            wins: u.wins,
            losses: u.losses,
        })
        .collect();

    let total = store.count_users().await?;
    let current_user_rank = store.count_users_rated_above(viewer.rating).await? + 1;

    Ok(Leaderboard {
        leaderboard,
        total,
        current_user_rank,
        current_user: ViewerSummary {
            id: viewer.id,
            name: viewer.first_name.clone(),
            rating: viewer.rating,
            matches: viewer.matches_played,
        },
    })
}
