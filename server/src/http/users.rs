//! User profiles and per-user match history.

use actix_web::{get, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::http::auth::CurrentUser;
use crate::http::{status_filter, AppState};
use crate::matches;

#[derive(Deserialize)]
pub struct UserMatchesQuery {
    /// A status, or `all` (the default).
    pub status: Option<String>,
}

/// GET /api/users/me
#[get("/users/me")]
pub async fn me(CurrentUser(user): CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(user)
}

/// GET /api/users/{user_id}
#[get("/users/{user_id}")]
pub async fn profile(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
    _user: CurrentUser,
) -> Result<HttpResponse> {
    let user = state
        .store
        .user(path.into_inner())
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(HttpResponse::Ok().json(user))
}

/// GET /api/users/{user_id}/matches
#[get("/users/{user_id}/matches")]
pub async fn user_matches(
    path: web::Path<Uuid>,
    query: web::Query<UserMatchesQuery>,
    state: web::Data<AppState>,
    _user: CurrentUser,
) -> Result<HttpResponse> {
    let status = status_filter(query.status.as_deref(), None)?;
    let rows = matches::of_user(state.store.as_ref(), path.into_inner(), status).await?;
    Ok(HttpResponse::Ok().json(rows))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(me).service(profile).service(user_matches);
}
