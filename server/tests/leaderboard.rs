//! Leaderboard ordering, win rate and viewer rank.

use dribbling_server::db::models::{NewUser, User};
use dribbling_server::db::{MemoryStore, Store};
use dribbling_server::ranking::{self, win_rate};

async fn seeded(store: &MemoryStore, telegram_id: i64, rating: i32, wins: i32, losses: i32) -> User {
    let user = store
        .create_user(&NewUser {
            telegram_id,
            username: None,
            first_name: format!("p{telegram_id}"),
            photo_url: None,
        })
        .await
        .unwrap();
    store.set_stats(user.id, rating, wins, losses).await.unwrap()
}

#[test]
fn win_rate_is_zero_without_matches() {
    assert_eq!(win_rate(0, 0), 0.0);
}

#[test]
fn win_rate_rounds_to_one_decimal() {
    assert_eq!(win_rate(1, 3), 33.3);
    assert_eq!(win_rate(2, 3), 66.7);
    assert_eq!(win_rate(5, 5), 100.0);
}

#[tokio::test]
async fn orders_by_rating_then_wins() {
    let store = MemoryStore::new();
    let low = seeded(&store, 1, 30, 5, 0).await;
    let tied_few_wins = seeded(&store, 2, 50, 1, 2).await;
    let tied_more_wins = seeded(&store, 3, 50, 3, 0).await;

    let board = ranking::leaderboard(&store, &low, 0, 100).await.unwrap();
    let ids: Vec<_> = board.leaderboard.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![tied_more_wins.id, tied_few_wins.id, low.id]);
    assert_eq!(
        board.leaderboard.iter().map(|e| e.rank).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(board.total, 3);
    assert_eq!(board.current_user_rank, 3);
    assert_eq!(board.current_user.id, low.id);
}

#[tokio::test]
async fn matches_played_breaks_remaining_ties() {
    let store = MemoryStore::new();
    let fewer = seeded(&store, 1, 10, 2, 0).await;
    let more = seeded(&store, 2, 10, 2, 4).await;

    let board = ranking::leaderboard(&store, &fewer, 0, 10).await.unwrap();
    assert_eq!(board.leaderboard[0].id, more.id);
    assert_eq!(board.leaderboard[1].id, fewer.id);
}

#[tokio::test]
async fn tied_rating_shares_rank() {
    let store = MemoryStore::new();
    let a = seeded(&store, 1, 50, 3, 0).await;
    let b = seeded(&store, 2, 50, 1, 0).await;
    seeded(&store, 3, 70, 0, 0).await;

    // Rank only counts strictly higher ratings, so both 50s are second.
    let for_a = ranking::leaderboard(&store, &a, 0, 10).await.unwrap();
    let for_b = ranking::leaderboard(&store, &b, 0, 10).await.unwrap();
    assert_eq!(for_a.current_user_rank, 2);
    assert_eq!(for_b.current_user_rank, 2);
}

#[tokio::test]
async fn pages_continue_ranks() {
    let store = MemoryStore::new();
    let mut viewer = None;
    for i in 0..5 {
        viewer = Some(seeded(&store, i, 100 - i as i32, 0, 0).await);
    }
    let viewer = viewer.unwrap();

    let page = ranking::leaderboard(&store, &viewer, 2, 2).await.unwrap();
    assert_eq!(page.leaderboard.len(), 2);
    assert_eq!(page.leaderboard[0].rank, 3);
    assert_eq!(page.leaderboard[0].rating, 98);
    assert_eq!(page.leaderboard[1].rank, 4);
    assert_eq!(page.total, 5);
}

#[tokio::test]
async fn entry_carries_stats() {
    let store = MemoryStore::new();
    let u = seeded(&store, 1, 40, 3, 1).await;
    let board = ranking::leaderboard(&store, &u, 0, 0).await.unwrap();
    // A zero limit is raised to one entry.
    assert_eq!(board.leaderboard.len(), 1);
    let e = &board.leaderboard[0];
    assert_eq!((e.matches, e.wins, e.losses), (4, 3, 1));
    assert_eq!(e.win_rate, 75.0);
}
