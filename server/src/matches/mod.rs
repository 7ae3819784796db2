//! Match lifecycle: create, join, leave and the read views around them.

pub mod lifecycle;

use serde::Serialize;
use uuid::Uuid;

use crate::db::models::{
    LeaveOutcome, Match, MatchFilter, MatchStatus, MatchSummary, Membership, NewMatch,
    PlayerProfile, PlayerResult, RosterEntry, User,
};
use crate::db::Store;
use crate::error::{AppError, Result};

/// Detail view of one match.
#[derive(Debug, Serialize)]
pub struct MatchDetail {
    #[serde(flatten)]
    pub details: Match,
    pub creator: Option<PlayerProfile>,
    pub players: Vec<RosterEntry>,
    pub players_count: usize,
}

/// Persist a new open match and auto-join its creator.
pub async fn create(store: &dyn Store, new: &NewMatch, creator: &User) -> Result<MatchSummary> {
    let game = store.create_match(new, creator.id).await?;
    log::info!("user {} created match {} ({})", creator.id, game.id, game.title);
    Ok(MatchSummary {
        details: game,
        players_count: 1,
    })
}

pub async fn join(
    store: &dyn Store,
    match_id: Uuid,
    user: &User,
    team: Option<String>,
) -> Result<Membership> {
    let membership = store.join_match(match_id, user.id, team).await?;
    log::info!("user {} joined match {match_id}", user.id);
    Ok(membership)
}

pub async fn leave(store: &dyn Store, match_id: Uuid, user: &User) -> Result<LeaveOutcome> {
    let outcome = store.leave_match(match_id, user.id).await?;
    match outcome {
        LeaveOutcome::MatchDeleted => {
            log::info!("creator {} left match {match_id}; match deleted", user.id)
        }
        LeaveOutcome::Left { reopened } => {
            log::info!("user {} left match {match_id} (reopened: {reopened})", user.id)
        }
    }
    Ok(outcome)
}

pub async fn get(store: &dyn Store, match_id: Uuid) -> Result<MatchDetail> {
    let game = store
        .get_match(match_id)
        .await?
        .ok_or(AppError::NotFound("Match"))?;
    let creator = store.user(game.created_by).await?.map(|u| u.profile());
    let players = store.roster(match_id).await?;
    Ok(MatchDetail {
        details: game,
        creator,
        players_count: players.len(),
        players,
    })
}

pub async fn list(store: &dyn Store, filter: &MatchFilter) -> Result<Vec<MatchSummary>> {
    store.list_matches(filter).await
}

/// Matches `user_id` is signed up for; `None` means every status.
pub async fn of_user(
    store: &dyn Store,
    user_id: Uuid,
    status: Option<MatchStatus>,
) -> Result<Vec<MatchSummary>> {
    if store.user(user_id).await?.is_none() {
        return Err(AppError::NotFound("User"));
    }
    store.user_matches(user_id, status).await
}

/// Close a match with per-player results. Rating deltas come from the
/// caller; this only applies them and keeps the win/loss tallies.
pub async fn record_outcome(
    store: &dyn Store,
    match_id: Uuid,
    results: &[PlayerResult],
) -> Result<Vec<User>> {
    let updated = store.record_outcome(match_id, results).await?;
    log::info!(
        "recorded outcome for match {match_id} ({} players)",
        updated.len()
    );
    Ok(updated)
}
