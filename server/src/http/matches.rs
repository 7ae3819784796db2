//! Match discovery and membership (list / create / detail / join / leave / cities)

use actix_web::{get, post, web, HttpResponse};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::models::{LeaveOutcome, MatchFilter, MatchStatus, NewMatch};
use crate::error::{AppError, Result};
use crate::http::auth::CurrentUser;
use crate::http::{status_filter, AppState};
use crate::matches;

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 100;

//////////////////////////////////////////////////
// Requests
//////////////////////////////////////////////////

#[derive(Deserialize)]
pub struct ListQuery {
    pub city: Option<String>,
    pub format: Option<String>,
    /// `YYYY-MM-DD`; anything else is ignored.
    pub date: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateReq {
    pub title: String,
    pub stadium: String,
    pub city: Option<String>,
    pub date_time: DateTime<Utc>,
    pub format: String,
    pub max_players: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Deserialize)]
pub struct JoinQuery {
    pub team: Option<String>,
}

impl CreateReq {
    /// Validate and fill in home-city defaults.
    fn into_new_match(self, state: &AppState) -> Result<NewMatch> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        if self.max_players < 1 {
            return Err(AppError::Validation("max_players must be positive".into()));
        }
        if self.date_time <= Utc::now() {
            return Err(AppError::Validation("date_time must be in the future".into()));
        }

        let home = &state.settings.home;
        Ok(NewMatch {
            title: self.title,
            stadium: self.stadium,
            city: self
                .city
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| home.name.clone()),
            date_time: self.date_time,
            format: self.format,
            max_players: self.max_players,
            latitude: self.latitude.unwrap_or(home.latitude),
            longitude: self.longitude.unwrap_or(home.longitude),
        })
    }
}

impl ListQuery {
    fn into_filter(self) -> Result<MatchFilter> {
        let date = self.date.as_deref().and_then(|d| {
            NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .map_err(|e| log::debug!("ignoring date filter {d:?}: {e}"))
                .ok()
        });
        Ok(MatchFilter {
            status: status_filter(self.status.as_deref(), Some(MatchStatus::Open))?,
            city: self.city.filter(|c| !c.is_empty()),
            format: self.format.filter(|f| !f.is_empty()),
            date,
            limit: self
                .limit
                .unwrap_or(DEFAULT_LIST_LIMIT)
                .clamp(1, MAX_LIST_LIMIT),
        })
    }
}

//////////////////////////////////////////////////
// Handlers
//////////////////////////////////////////////////

/// GET /api/matches
#[get("/matches")]
pub async fn list(
    query: web::Query<ListQuery>,
    state: web::Data<AppState>,
    _user: CurrentUser,
) -> Result<HttpResponse> {
    let filter = query.into_inner().into_filter()?;
    let rows = matches::list(state.store.as_ref(), &filter).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// POST /api/matches
#[post("/matches")]
pub async fn create(
    info: web::Json<CreateReq>,
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<HttpResponse> {
    let new = info.into_inner().into_new_match(&state)?;
    let summary = matches::create(state.store.as_ref(), &new, &user).await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// GET /api/matches/cities/list
#[get("/matches/cities/list")]
pub async fn cities(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "cities": state.settings.cities }))
}

/// GET /api/matches/{match_id}
#[get("/matches/{match_id}")]
pub async fn detail(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
    _user: CurrentUser,
) -> Result<HttpResponse> {
    let view = matches::get(state.store.as_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}

/// POST /api/matches/{match_id}/join
#[post("/matches/{match_id}/join")]
pub async fn join(
    path: web::Path<Uuid>,
    query: web::Query<JoinQuery>,
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<HttpResponse> {
    let team = query.into_inner().team.filter(|t| !t.is_empty());
    matches::join(state.store.as_ref(), path.into_inner(), &user, team).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Successfully joined the match",
        "success": true
    })))
}

/// POST /api/matches/{match_id}/leave
#[post("/matches/{match_id}/leave")]
pub async fn leave(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<HttpResponse> {
    let message = match matches::leave(state.store.as_ref(), path.into_inner(), &user).await? {
        LeaveOutcome::MatchDeleted => "Match deleted",
        LeaveOutcome::Left { .. } => "Successfully left the match",
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": message, "success": true })))
}

//////////////////////////////////////////////////
// Mount
//////////////////////////////////////////////////
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(cities)
        .service(list)
        .service(create)
        .service(detail)
        .service(join)
        .service(leave);
}
