use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use super::models::{
    LeaveOutcome, Match, MatchFilter, MatchStatus, MatchSummary, Membership, NewMatch, NewUser,
    PlayerProfile, PlayerResult, RosterEntry, User,
};
use super::Store;
use crate::error::{AppError, Result};
use crate::matches::lifecycle::{self, JoinDecision, LeaveDecision};

const USER_COLUMNS: &str = "id, telegram_id, username, first_name, photo_url, rating, \
     matches_played, wins, losses, created_at";

const MATCH_COLUMNS: &str = "m.id, m.title, m.stadium, m.city, m.date_time, m.format, \
     m.max_players, m.status, m.created_by, m.latitude, m.longitude, m.created_at";

const PLAYERS_COUNT: &str =
    "(SELECT COUNT(*) FROM match_players c WHERE c.match_id = m.id) AS players_count";

/// Postgres-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool and bring the schema up to date.
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connecting to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("running migrations")?;

        Ok(PgStore { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct RosterRow {
    id: Uuid,
    team: Option<String>,
    joined_at: DateTime<Utc>,
    user_id: Uuid,
    first_name: String,
    username: Option<String>,
    photo_url: Option<String>,
    rating: i32,
}

impl From<RosterRow> for RosterEntry {
    fn from(r: RosterRow) -> Self {
        RosterEntry {
            id: r.id,
            user: PlayerProfile {
                id: r.user_id,
                first_name: r.first_name,
                username: r.username,
                photo_url: r.photo_url,
                rating: r.rating,
            },
            team: r.team,
            joined_at: r.joined_at,
        }
    }
}

/// Fetch a match and hold its row lock until the transaction ends. Joins,
/// leaves and outcome recording on one match serialise on this lock; a
/// caller that waited on a deleted row gets `None`.
async fn lock_match(conn: &mut PgConnection, id: Uuid) -> Result<Option<Match>> {
    let game = sqlx::query_as::<_, Match>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches m WHERE m.id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(game)
}

async fn is_member(conn: &mut PgConnection, match_id: Uuid, user: Uuid) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM match_players WHERE match_id = $1 AND user_id = $2)",
    )
    .bind(match_id)
    .bind(user)
    .fetch_one(conn)
    .await?;
    Ok(exists)
}

async fn set_status(conn: &mut PgConnection, id: Uuid, status: MatchStatus) -> Result<()> {
    sqlx::query("UPDATE matches SET status = $2 WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

async fn insert_membership(
    conn: &mut PgConnection,
    match_id: Uuid,
    user: Uuid,
    team: Option<String>,
) -> Result<Membership> {
    sqlx::query_as::<_, Membership>(
        r#"INSERT INTO match_players (id, match_id, user_id, team)
           VALUES ($1, $2, $3, $4)
           RETURNING id, match_id, user_id, team, joined_at"#,
    )
    .bind(Uuid::new_v4())
    .bind(match_id)
    .bind(user)
    .bind(team)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db_err) if db_err.code() == Some("23505".into()) => {
            AppError::AlreadyMember
        }
        e => AppError::Storage(e),
    })
}

/// `[start, end)` of one UTC calendar day.
fn day_bounds(filter: &MatchFilter) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    match filter.date.and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(start) => {
            let start = start.and_utc();
            (Some(start), Some(start + Duration::days(1)))
        }
        None => (None, None),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE telegram_id = $1"
        ))
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, new: &NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO users (id, telegram_id, username, first_name, photo_url)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(new.telegram_id)
        .bind(&new.username)
        .bind(&new.first_name)
        .bind(&new.photo_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_match(&self, new: &NewMatch, creator: Uuid) -> Result<Match> {
        let mut tx = self.pool.begin().await?;

        let game = sqlx::query_as::<_, Match>(
            r#"INSERT INTO matches AS m (id, title, stadium, city, date_time, format,
                                         max_players, status, created_by, latitude, longitude)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING m.id, m.title, m.stadium, m.city, m.date_time, m.format,
                         m.max_players, m.status, m.created_by, m.latitude, m.longitude,
                         m.created_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.stadium)
        .bind(&new.city)
        .bind(new.date_time)
        .bind(&new.format)
        .bind(new.max_players)
        .bind(MatchStatus::Open.as_str())
        .bind(creator)
        .bind(new.latitude)
        .bind(new.longitude)
        .fetch_one(&mut *tx)
        .await?;

        insert_membership(&mut *tx, game.id, creator, None).await?;
        tx.commit().await?;
        Ok(game)
    }

    async fn get_match(&self, id: Uuid) -> Result<Option<Match>> {
        let game = sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches m WHERE m.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(game)
    }

    async fn roster(&self, match_id: Uuid) -> Result<Vec<RosterEntry>> {
        let rows = sqlx::query_as::<_, RosterRow>(
            r#"SELECT mp.id, mp.team, mp.joined_at,
                      u.id AS user_id, u.first_name, u.username, u.photo_url, u.rating
                 FROM match_players mp
                 JOIN users u ON u.id = mp.user_id
                WHERE mp.match_id = $1
                ORDER BY mp.joined_at, mp.id"#,
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RosterEntry::from).collect())
    }

    async fn join_match(
        &self,
        match_id: Uuid,
        user: Uuid,
        team: Option<String>,
    ) -> Result<Membership> {
        let mut tx = self.pool.begin().await?;

        let game = lock_match(&mut *tx, match_id)
            .await?
            .ok_or(AppError::NotFound("Match"))?;
        let already = is_member(&mut *tx, match_id, user).await?;
        let members = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM match_players WHERE match_id = $1",
        )
        .bind(match_id)
        .fetch_one(&mut *tx)
        .await?;

        match lifecycle::decide_join(&game, members, already)? {
            JoinDecision::Full { stale_status } => {
                if stale_status {
                    set_status(&mut *tx, match_id, MatchStatus::Full).await?;
                    tx.commit().await?;
                }
                Err(AppError::MatchFull)
            }
            JoinDecision::Admit { fills } => {
                let membership = insert_membership(&mut *tx, match_id, user, team).await?;
                if fills {
                    set_status(&mut *tx, match_id, MatchStatus::Full).await?;
                }
                tx.commit().await?;
                Ok(membership)
            }
        }
    }

    async fn leave_match(&self, match_id: Uuid, user: Uuid) -> Result<LeaveOutcome> {
        let mut tx = self.pool.begin().await?;

        // Memberships cascade with their match, so a missing match is a
        // missing membership.
        let game = lock_match(&mut *tx, match_id)
            .await?
            .ok_or(AppError::NotFound("Membership"))?;
        if !is_member(&mut *tx, match_id, user).await? {
            return Err(AppError::NotFound("Membership"));
        }

        let outcome = match lifecycle::decide_leave(&game, user) {
            LeaveDecision::DeleteMatch => {
                sqlx::query("DELETE FROM matches WHERE id = $1")
                    .bind(match_id)
                    .execute(&mut *tx)
                    .await?;
                LeaveOutcome::MatchDeleted
            }
            LeaveDecision::RemoveMember { reopen } => {
                sqlx::query("DELETE FROM match_players WHERE match_id = $1 AND user_id = $2")
                    .bind(match_id)
                    .bind(user)
                    .execute(&mut *tx)
                    .await?;
                if reopen {
                    set_status(&mut *tx, match_id, MatchStatus::Open).await?;
                }
                LeaveOutcome::Left { reopened: reopen }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn list_matches(&self, filter: &MatchFilter) -> Result<Vec<MatchSummary>> {
        let (day_start, day_end) = day_bounds(filter);
        let rows = sqlx::query_as::<_, MatchSummary>(&format!(
            r#"SELECT {MATCH_COLUMNS}, {PLAYERS_COUNT}
                 FROM matches m
                WHERE ($1::text IS NULL OR m.city = $1)
                  AND ($2::text IS NULL OR m.format = $2)
                  AND ($3::timestamptz IS NULL OR (m.date_time >= $3 AND m.date_time < $4))
                  AND ($5::text IS NULL OR m.status = $5)
                ORDER BY m.date_time
                LIMIT $6"#
        ))
        .bind(&filter.city)
        .bind(&filter.format)
        .bind(day_start)
        .bind(day_end)
        .bind(filter.status.map(MatchStatus::as_str))
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn user_matches(
        &self,
        user: Uuid,
        status: Option<MatchStatus>,
    ) -> Result<Vec<MatchSummary>> {
        let rows = sqlx::query_as::<_, MatchSummary>(&format!(
            r#"SELECT {MATCH_COLUMNS}, {PLAYERS_COUNT}
                 FROM matches m
                 JOIN match_players me ON me.match_id = m.id AND me.user_id = $1
                WHERE ($2::text IS NULL OR m.status = $2)
                ORDER BY m.date_time DESC"#
        ))
        .bind(user)
        .bind(status.map(MatchStatus::as_str))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn users_by_rating(&self, offset: i64, limit: i64) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS}
                 FROM users
                ORDER BY rating DESC, wins DESC, matches_played DESC, created_at, id
               OFFSET $1
                LIMIT $2"#
        ))
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_users(&self) -> Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn count_users_rated_above(&self, rating: i32) -> Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE rating > $1")
            .bind(rating)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn record_outcome(&self, match_id: Uuid, results: &[PlayerResult]) -> Result<Vec<User>> {
        let mut tx = self.pool.begin().await?;

        let game = lock_match(&mut *tx, match_id)
            .await?
            .ok_or(AppError::NotFound("Match"))?;
        lifecycle::check_outcome(&game, results)?;

        let mut updated = Vec::with_capacity(results.len());
        for r in results {
            if !is_member(&mut *tx, match_id, r.user_id).await? {
                return Err(AppError::InvalidState(format!(
                    "Player {} did not join this match",
                    r.user_id
                )));
            }
            let user = sqlx::query_as::<_, User>(&format!(
                r#"UPDATE users
                      SET matches_played = matches_played + 1,
                          wins   = wins   + CASE WHEN $2 THEN 1 ELSE 0 END,
                          losses = losses + CASE WHEN $2 THEN 0 ELSE 1 END,
                          rating = GREATEST(0, LEAST(2147483647, rating::bigint + $3))::int
                    WHERE id = $1
                RETURNING {USER_COLUMNS}"#
            ))
            .bind(r.user_id)
            .bind(r.won)
            .bind(r.rating_delta)
            .fetch_one(&mut *tx)
            .await?;
            updated.push(user);
        }

        set_status(&mut *tx, match_id, MatchStatus::Finished).await?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
