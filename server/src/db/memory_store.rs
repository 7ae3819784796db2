//! In-process [`Store`] for development mode and tests.
//!
//! The whole state sits behind one async mutex held for the full length of
//! every operation, so compound operations are trivially linearizable.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::models::{
    LeaveOutcome, Match, MatchFilter, MatchStatus, MatchSummary, Membership, NewMatch, NewUser,
    PlayerResult, RosterEntry, User,
};
use super::Store;
use crate::error::{AppError, Result};
use crate::matches::lifecycle::{self, JoinDecision, LeaveDecision};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    matches: HashMap<Uuid, Match>,
    /// Insertion order doubles as join order.
    memberships: Vec<Membership>,
}

impl State {
    fn is_member(&self, match_id: Uuid, user: Uuid) -> bool {
        self.memberships
            .iter()
            .any(|m| m.match_id == match_id && m.user_id == user)
    }

    fn head_count(&self, match_id: Uuid) -> i64 {
        self.memberships
            .iter()
            .filter(|m| m.match_id == match_id)
            .count() as i64
    }

    fn summary(&self, game: &Match) -> MatchSummary {
        MatchSummary {
            details: game.clone(),
            players_count: self.head_count(game.id),
        }
    }

    fn add_member(&mut self, match_id: Uuid, user: Uuid, team: Option<String>) -> Membership {
        let membership = Membership {
            id: Uuid::new_v4(),
            match_id,
            user_id: user,
            team,
            joined_at: Utc::now(),
        };
        self.memberships.push(membership.clone());
        membership
    }

    fn set_status(&mut self, match_id: Uuid, status: MatchStatus) {
        if let Some(game) = self.matches.get_mut(&match_id) {
            game.status = status;
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a user's stats. Only useful for seeding fixtures.
    pub async fn set_stats(&self, id: Uuid, rating: i32, wins: i32, losses: i32) -> Result<User> {
        let mut state = self.state.lock().await;
        let user = state.users.get_mut(&id).ok_or(AppError::NotFound("User"))?;
        user.rating = rating;
        user.wins = wins;
        user.losses = losses;
        user.matches_played = wins + losses;
        Ok(user.clone())
    }

    /// Force a match into `status`, standing in for administrative action.
    pub async fn set_match_status(&self, id: Uuid, status: MatchStatus) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.matches.contains_key(&id) {
            return Err(AppError::NotFound("Match"));
        }
        state.set_status(id, status);
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.telegram_id == telegram_id)
            .cloned())
    }

    async fn create_user(&self, new: &NewUser) -> Result<User> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.users.values().find(|u| u.telegram_id == new.telegram_id) {
            return Ok(existing.clone());
        }
        let user = User::from_new(new);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn create_match(&self, new: &NewMatch, creator: Uuid) -> Result<Match> {
        let mut state = self.state.lock().await;
        let game = Match {
            id: Uuid::new_v4(),
            title: new.title.clone(),
            stadium: new.stadium.clone(),
            city: new.city.clone(),
            date_time: new.date_time,
            format: new.format.clone(),
            max_players: new.max_players,
            status: MatchStatus::Open,
            created_by: creator,
            latitude: new.latitude,
            longitude: new.longitude,
            created_at: Utc::now(),
        };
        state.matches.insert(game.id, game.clone());
        state.add_member(game.id, creator, None);
        Ok(game)
    }

    async fn get_match(&self, id: Uuid) -> Result<Option<Match>> {
        Ok(self.state.lock().await.matches.get(&id).cloned())
    }

    async fn roster(&self, match_id: Uuid) -> Result<Vec<RosterEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.match_id == match_id)
            .filter_map(|m| {
                state.users.get(&m.user_id).map(|u| RosterEntry {
                    id: m.id,
                    user: u.profile(),
                    team: m.team.clone(),
                    joined_at: m.joined_at,
                })
            })
            .collect())
    }

    async fn join_match(
        &self,
        match_id: Uuid,
        user: Uuid,
        team: Option<String>,
    ) -> Result<Membership> {
        let mut state = self.state.lock().await;
        let game = state
            .matches
            .get(&match_id)
            .cloned()
            .ok_or(AppError::NotFound("Match"))?;
        let already = state.is_member(match_id, user);
        let members = state.head_count(match_id);

        match lifecycle::decide_join(&game, members, already)? {
            JoinDecision::Full { stale_status } => {
                if stale_status {
                    state.set_status(match_id, MatchStatus::Full);
                }
                Err(AppError::MatchFull)
            }
            JoinDecision::Admit { fills } => {
                let membership = state.add_member(match_id, user, team);
                if fills {
                    state.set_status(match_id, MatchStatus::Full);
                }
                Ok(membership)
            }
        }
    }

    async fn leave_match(&self, match_id: Uuid, user: Uuid) -> Result<LeaveOutcome> {
        let mut state = self.state.lock().await;
        let game = match state.matches.get(&match_id) {
            Some(g) if state.is_member(match_id, user) => g.clone(),
            _ => return Err(AppError::NotFound("Membership")),
        };

        match lifecycle::decide_leave(&game, user) {
            LeaveDecision::DeleteMatch => {
                state.matches.remove(&match_id);
                state.memberships.retain(|m| m.match_id != match_id);
                Ok(LeaveOutcome::MatchDeleted)
            }
            LeaveDecision::RemoveMember { reopen } => {
                state
                    .memberships
                    .retain(|m| !(m.match_id == match_id && m.user_id == user));
                if reopen {
                    state.set_status(match_id, MatchStatus::Open);
                }
                Ok(LeaveOutcome::Left { reopened: reopen })
            }
        }
    }

    async fn list_matches(&self, filter: &MatchFilter) -> Result<Vec<MatchSummary>> {
        let state = self.state.lock().await;
        let day = filter
            .date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|start| {
                let start = start.and_utc();
                (start, start + Duration::days(1))
            });

        let mut found: Vec<&Match> = state
            .matches
            .values()
            .filter(|m| filter.city.as_ref().map_or(true, |c| &m.city == c))
            .filter(|m| filter.format.as_ref().map_or(true, |f| &m.format == f))
            .filter(|m| filter.status.map_or(true, |s| m.status == s))
            .filter(|m| day.map_or(true, |(from, to)| m.date_time >= from && m.date_time < to))
            .collect();
        found.sort_by_key(|m| m.date_time);

        Ok(found
            .into_iter()
            .take(filter.limit.max(0) as usize)
            .map(|m| state.summary(m))
            .collect())
    }

    async fn user_matches(
        &self,
        user: Uuid,
        status: Option<MatchStatus>,
    ) -> Result<Vec<MatchSummary>> {
        let state = self.state.lock().await;
        let mut found: Vec<&Match> = state
            .memberships
            .iter()
            .filter(|m| m.user_id == user)
            .filter_map(|m| state.matches.get(&m.match_id))
            .filter(|m| status.map_or(true, |s| m.status == s))
            .collect();
        found.sort_by(|a, b| b.date_time.cmp(&a.date_time));

        Ok(found.into_iter().map(|m| state.summary(m)).collect())
    }

    async fn users_by_rating(&self, offset: i64, limit: i64) -> Result<Vec<User>> {
        let state = self.state.lock().await;
        let mut users: Vec<&User> = state.users.values().collect();
        users.sort_by(|a, b| {
            b.rating
                .cmp(&a.rating)
                .then(b.wins.cmp(&a.wins))
                .then(b.matches_played.cmp(&a.matches_played))
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });

        Ok(users
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_users(&self) -> Result<i64> {
        Ok(self.state.lock().await.users.len() as i64)
    }

    async fn count_users_rated_above(&self, rating: i32) -> Result<i64> {
        let state = self.state.lock().await;
        Ok(state.users.values().filter(|u| u.rating > rating).count() as i64)
    }

    async fn record_outcome(&self, match_id: Uuid, results: &[PlayerResult]) -> Result<Vec<User>> {
        let mut state = self.state.lock().await;
        let game = state
            .matches
            .get(&match_id)
            .cloned()
            .ok_or(AppError::NotFound("Match"))?;
        lifecycle::check_outcome(&game, results)?;

        // Validate everything before touching any row.
        if let Some(stranger) = results
            .iter()
            .find(|r| !state.is_member(match_id, r.user_id) || !state.users.contains_key(&r.user_id))
        {
            return Err(AppError::InvalidState(format!(
                "Player {} did not join this match",
                stranger.user_id
            )));
        }

        let updated: Vec<User> = results
            .iter()
            .filter_map(|r| state.users.get(&r.user_id).map(|u| lifecycle::apply_result(u, r)))
            .collect();
        for user in &updated {
            state.users.insert(user.id, user.clone());
        }
        state.set_status(match_id, MatchStatus::Finished);
        Ok(updated)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
