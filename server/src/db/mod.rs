//! Persistence seam. Everything the service needs from storage goes through
//! [`Store`]; compound operations are atomic within one implementation.

pub mod memory_store;
pub mod models;
pub mod pg_store;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use models::{
    LeaveOutcome, Match, MatchFilter, MatchStatus, MatchSummary, Membership, NewMatch, NewUser,
    PlayerResult, RosterEntry, User,
};

pub use memory_store::MemoryStore;
pub use pg_store::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn user(&self, id: Uuid) -> Result<Option<User>>;

    async fn user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>>;

    /// Insert a user, or return the existing one if the telegram id is
    /// already known (concurrent first requests converge on one row).
    async fn create_user(&self, new: &NewUser) -> Result<User>;

    /// Persist an `open` match owned by `creator` together with the
    /// creator's own membership.
    async fn create_match(&self, new: &NewMatch, creator: Uuid) -> Result<Match>;

    async fn get_match(&self, id: Uuid) -> Result<Option<Match>>;

    /// Memberships of a match with each member's public profile, oldest first.
    async fn roster(&self, match_id: Uuid) -> Result<Vec<RosterEntry>>;

    /// Atomically check capacity, status and uniqueness, then insert.
    async fn join_match(&self, match_id: Uuid, user: Uuid, team: Option<String>)
        -> Result<Membership>;

    async fn leave_match(&self, match_id: Uuid, user: Uuid) -> Result<LeaveOutcome>;

    /// Matches passing `filter`, soonest first.
    async fn list_matches(&self, filter: &MatchFilter) -> Result<Vec<MatchSummary>>;

    /// Matches `user` holds a membership in, latest first.
    async fn user_matches(&self, user: Uuid, status: Option<MatchStatus>)
        -> Result<Vec<MatchSummary>>;

    /// Users ordered by rating, wins, matches played (all descending).
    async fn users_by_rating(&self, offset: i64, limit: i64) -> Result<Vec<User>>;

    async fn count_users(&self) -> Result<i64>;

    async fn count_users_rated_above(&self, rating: i32) -> Result<i64>;

    /// Apply per-player results and mark the match finished.
    async fn record_outcome(&self, match_id: Uuid, results: &[PlayerResult]) -> Result<Vec<User>>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> Result<()>;
}
