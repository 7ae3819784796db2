//! Membership rules for a match, shared by every store implementation.
//!
//! Status transitions:
//!
//! ```text
//!   open ──(roster reaches max_players)──▶ full
//!   full ──(a non-creator leaves)────────▶ open
//!   open | full ──(outcome recorded / admin)──▶ finished | cancelled
//!   any ──(creator leaves)──▶ deleted
//! ```
//!
//! The functions here only decide; the caller applies the decision inside
//! whatever atomic unit its storage provides, with the match row locked.

use std::collections::HashSet;
use uuid::Uuid;

use crate::db::models::{Match, MatchStatus, PlayerResult, User};
use crate::error::{AppError, Result};

/// What a join attempt should do once it is known to be allowed in principle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinDecision {
    /// Insert the membership; `fills` means the roster is now complete and
    /// the status must become `full`.
    Admit { fills: bool },
    /// No room left. `stale_status` is set when the stored status still says
    /// `open` and must be corrected to `full` before rejecting.
    Full { stale_status: bool },
}

/// Decide a join for `game`, which currently has `members` memberships.
pub fn decide_join(game: &Match, members: i64, already_member: bool) -> Result<JoinDecision> {
    if !game.status.is_joinable() {
        return Err(AppError::InvalidState(
            "Match is not available for joining".into(),
        ));
    }
    if already_member {
        return Err(AppError::AlreadyMember);
    }

    let capacity = i64::from(game.max_players);
    if members >= capacity {
        return Ok(JoinDecision::Full {
            stale_status: game.status != MatchStatus::Full,
        });
    }
    Ok(JoinDecision::Admit {
        fills: members + 1 >= capacity,
    })
}

/// What removing `user` from `game` does. The caller has already checked
/// that the membership exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveDecision {
    /// Leaving is destructive for the creator: the whole match goes.
    DeleteMatch,
    /// Drop the membership; a full match always reopens since the roster
    /// shrinks below capacity.
    RemoveMember { reopen: bool },
}

pub fn decide_leave(game: &Match, user: Uuid) -> LeaveDecision {
    if game.created_by == user {
        LeaveDecision::DeleteMatch
    } else {
        LeaveDecision::RemoveMember {
            reopen: game.status == MatchStatus::Full,
        }
    }
}

/// Outcomes can only be recorded once, for a live match, with at most one
/// result per player.
pub fn check_outcome(game: &Match, results: &[PlayerResult]) -> Result<()> {
    if !game.status.is_joinable() {
        return Err(AppError::InvalidState(format!(
            "Match is already {}",
            game.status
        )));
    }
    let mut seen = HashSet::with_capacity(results.len());
    if let Some(dup) = results.iter().find(|r| !seen.insert(r.user_id)) {
        return Err(AppError::InvalidState(format!(
            "Duplicate result for player {}",
            dup.user_id
        )));
    }
    Ok(())
}

/// Rating after applying `delta`: saturating, never below zero.
pub fn adjusted_rating(rating: i32, delta: i32) -> i32 {
    rating.saturating_add(delta).max(0)
}

/// `user`'s stats after one recorded result.
pub fn apply_result(user: &User, result: &PlayerResult) -> User {
    let mut next = user.clone();
    next.matches_played += 1;
    if result.won {
        next.wins += 1;
    } else {
        next.losses += 1;
    }
    next.rating = adjusted_rating(user.rating, result.rating_delta);
    next
}
