// tests/pg_store.rs
//
// Runs against the database in DATABASE_URL (loaded from .env like the
// server does). Without one every test returns early.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use dotenvy::dotenv;
use dribbling_server::db::models::{MatchStatus, NewMatch, NewUser, PlayerResult, User};
use dribbling_server::db::{PgStore, Store};
use dribbling_server::error::AppError;
use uuid::Uuid;

async fn connect() -> Option<Arc<PgStore>> {
    dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres test");
        return None;
    };
    let store = PgStore::connect(&url, 5)
        .await
        .expect("DB connection failed");
    Some(Arc::new(store))
}

fn fresh_telegram_id() -> i64 {
    (Uuid::new_v4().as_u128() as i64) & i64::MAX
}

async fn user(store: &PgStore) -> User {
    let telegram_id = fresh_telegram_id();
    store
        .create_user(&NewUser {
            telegram_id,
            username: None,
            first_name: format!("player{telegram_id}"),
            photo_url: None,
        })
        .await
        .expect("create user")
}

fn new_match(max_players: i32) -> NewMatch {
    NewMatch {
        title: "Evening five-a-side".into(),
        stadium: "Central".into(),
        city: "Пенджикент".into(),
        date_time: Utc::now() + Duration::days(1),
        format: "5x5".into(),
        max_players,
        latitude: 39.4952,
        longitude: 67.6093,
    }
}

async fn cleanup(store: &PgStore, matches: &[Uuid], users: &[Uuid]) {
    sqlx::query("DELETE FROM matches WHERE id = ANY($1)")
        .bind(matches)
        .execute(store.pool())
        .await
        .expect("delete matches");
    sqlx::query("DELETE FROM users WHERE id = ANY($1)")
        .bind(users)
        .execute(store.pool())
        .await
        .expect("delete users");
}

#[tokio::test]
async fn racing_joins_for_last_slot_admit_one() {
    let Some(store) = connect().await else { return };
    let owner = user(&store).await;
    let game = store.create_match(&new_match(3), owner.id).await.unwrap();
    let second = user(&store).await;
    store.join_match(game.id, second.id, None).await.unwrap();

    let mut racers = Vec::new();
    for _ in 0..8 {
        racers.push(user(&store).await);
    }
    let handles: Vec<_> = racers
        .iter()
        .map(|p| {
            let store = Arc::clone(&store);
            let id = p.id;
            tokio::spawn(async move { store.join_match(game.id, id, None).await })
        })
        .collect();

    let mut joined = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => joined += 1,
            Err(AppError::MatchFull) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(joined, 1);
    assert_eq!(store.roster(game.id).await.unwrap().len(), 3);
    let status = store.get_match(game.id).await.unwrap().unwrap().status;
    assert_eq!(status, MatchStatus::Full);

    let mut users: Vec<Uuid> = racers.iter().map(|u| u.id).collect();
    users.extend([owner.id, second.id]);
    cleanup(&store, &[game.id], &users).await;
}

#[tokio::test]
async fn same_user_joining_twice_at_once_is_admitted_once() {
    let Some(store) = connect().await else { return };
    let owner = user(&store).await;
    let guest = user(&store).await;
    let game = store.create_match(&new_match(10), owner.id).await.unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let id = guest.id;
            tokio::spawn(async move { store.join_match(game.id, id, None).await })
        })
        .collect();

    let mut joined = 0;
    let mut duplicate = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => joined += 1,
            Err(AppError::AlreadyMember) => duplicate += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!((joined, duplicate), (1, 3));
    assert_eq!(store.roster(game.id).await.unwrap().len(), 2);

    cleanup(&store, &[game.id], &[owner.id, guest.id]).await;
}

#[tokio::test]
async fn duplicate_membership_row_violates_unique_index() {
    let Some(store) = connect().await else { return };
    let owner = user(&store).await;
    let game = store.create_match(&new_match(10), owner.id).await.unwrap();

    // The creator's membership already exists; a second row for the same
    // pair must fail with the code the store maps to AlreadyMember.
    let err = sqlx::query("INSERT INTO match_players (id, match_id, user_id) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(game.id)
        .bind(owner.id)
        .execute(store.pool())
        .await
        .unwrap_err();
    match err {
        sqlx::Error::Database(db_err) => assert_eq!(db_err.code().as_deref(), Some("23505")),
        e => panic!("unexpected error: {e}"),
    }
    assert!(matches!(
        store.join_match(game.id, owner.id, None).await,
        Err(AppError::AlreadyMember)
    ));

    cleanup(&store, &[game.id], &[owner.id]).await;
}

#[tokio::test]
async fn join_waiting_on_deleted_match_is_not_found() {
    let Some(store) = connect().await else { return };
    let owner = user(&store).await;
    let guest = user(&store).await;
    let game = store.create_match(&new_match(10), owner.id).await.unwrap();

    // Hold the row lock the way a creator's leave does, delete, and let the
    // join queue behind it.
    let mut tx = store.pool().begin().await.unwrap();
    sqlx::query("SELECT id FROM matches WHERE id = $1 FOR UPDATE")
        .bind(game.id)
        .execute(&mut *tx)
        .await
        .unwrap();
    sqlx::query("DELETE FROM matches WHERE id = $1")
        .bind(game.id)
        .execute(&mut *tx)
        .await
        .unwrap();

    let join = {
        let store = Arc::clone(&store);
        let id = guest.id;
        tokio::spawn(async move { store.join_match(game.id, id, None).await })
    };
    tokio::time::sleep(StdDuration::from_millis(200)).await;
    assert!(!join.is_finished());
    tx.commit().await.unwrap();

    assert!(matches!(join.await.unwrap(), Err(AppError::NotFound(_))));
    assert!(store.roster(game.id).await.unwrap().is_empty());

    cleanup(&store, &[], &[owner.id, guest.id]).await;
}

#[tokio::test]
async fn concurrent_first_logins_share_one_row() {
    let Some(store) = connect().await else { return };
    let telegram_id = fresh_telegram_id();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .create_user(&NewUser {
                        telegram_id,
                        username: Some("racer".into()),
                        first_name: "Racer".into(),
                        photo_url: None,
                    })
                    .await
            })
        })
        .collect();

    let mut ids = Vec::new();
    for h in handles {
        ids.push(h.await.unwrap().unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    let stored = store.user_by_telegram_id(telegram_id).await.unwrap().unwrap();
    assert_eq!(stored.id, ids[0]);

    cleanup(&store, &[], &ids).await;
}

#[tokio::test]
async fn outcome_rating_saturates_in_database() {
    let Some(store) = connect().await else { return };
    let owner = user(&store).await;
    let guest = user(&store).await;
    let game = store.create_match(&new_match(2), owner.id).await.unwrap();
    store.join_match(game.id, guest.id, None).await.unwrap();

    let results = [
        PlayerResult {
            user_id: owner.id,
            won: true,
            rating_delta: i32::MAX,
        },
        PlayerResult {
            user_id: guest.id,
            won: false,
            rating_delta: i32::MIN,
        },
    ];
    store.record_outcome(game.id, &results).await.unwrap();

    let owner_after = store.user(owner.id).await.unwrap().unwrap();
    assert_eq!((owner_after.rating, owner_after.wins, owner_after.matches_played), (i32::MAX, 1, 1));
    let guest_after = store.user(guest.id).await.unwrap().unwrap();
    assert_eq!((guest_after.rating, guest_after.losses, guest_after.matches_played), (0, 1, 1));
    let status = store.get_match(game.id).await.unwrap().unwrap().status;
    assert_eq!(status, MatchStatus::Finished);

    cleanup(&store, &[game.id], &[owner.id, guest.id]).await;
}
