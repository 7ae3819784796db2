use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub photo_url: Option<String>,
    pub rating: i32,
    pub matches_played: i32,
    pub wins: i32,
    pub losses: i32,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a user the first time an identity is seen.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub photo_url: Option<String>,
}

impl User {
    /// Fresh user with zeroed stats.
    pub fn from_new(new: &NewUser) -> Self {
        User {
            id: Uuid::new_v4(),
            telegram_id: new.telegram_id,
            username: new.username.clone(),
            first_name: new.first_name.clone(),
            photo_url: new.photo_url.clone(),
            rating: 0,
            matches_played: 0,
            wins: 0,
            losses: 0,
            created_at: Utc::now(),
        }
    }

    pub fn profile(&self) -> PlayerProfile {
        PlayerProfile {
            id: self.id,
            first_name: self.first_name.clone(),
            username: self.username.clone(),
            photo_url: self.photo_url.clone(),
            rating: self.rating,
        }
    }
}

/// Public snapshot of a user, as shown in rosters.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerProfile {
    pub id: Uuid,
    pub first_name: String,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub rating: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Open,
    Full,
    Finished,
    Cancelled,
}

impl MatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::Open => "open",
            MatchStatus::Full => "full",
            MatchStatus::Finished => "finished",
            MatchStatus::Cancelled => "cancelled",
        }
    }

    /// Joins are only considered while the match is live.
    pub fn is_joinable(self) -> bool {
        matches!(self, MatchStatus::Open | MatchStatus::Full)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(MatchStatus::Open),
            "full" => Ok(MatchStatus::Full),
            "finished" => Ok(MatchStatus::Finished),
            "cancelled" => Ok(MatchStatus::Cancelled),
            other => Err(format!("unknown match status {other:?}")),
        }
    }
}

impl TryFrom<String> for MatchStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Match {
    pub id: Uuid,
    pub title: String,
    pub stadium: String,
    pub city: String,
    pub date_time: DateTime<Utc>,
    /// Free-form size tag, e.g. "5x5".
    pub format: String,
    pub max_players: i32,
    #[sqlx(try_from = "String")]
    pub status: MatchStatus,
    pub created_by: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

/// A fully resolved match to persist; defaults are applied by the caller.
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub title: String,
    pub stadium: String,
    pub city: String,
    pub date_time: DateTime<Utc>,
    pub format: String,
    pub max_players: i32,
    pub latitude: f64,
    pub longitude: f64,
}

/// Match row plus its current head count, as returned by listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MatchSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub details: Match,
    pub players_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub team: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// One roster line of the match detail view.
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub id: Uuid,
    pub user: PlayerProfile,
    pub team: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// Filters for the public match listing.
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub city: Option<String>,
    pub format: Option<String>,
    /// Only matches scheduled on this calendar day (UTC).
    pub date: Option<NaiveDate>,
    pub status: Option<MatchStatus>,
    pub limit: i64,
}

/// Result of a successful leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The creator left; the match and its roster are gone.
    MatchDeleted,
    Left { reopened: bool },
}

/// One participant's result, reported when a match concludes.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerResult {
    pub user_id: Uuid,
    pub won: bool,
    /// Rating change decided by the caller; the store only applies it.
    pub rating_delta: i32,
}
