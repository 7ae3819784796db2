//! Simple liveness / readiness probe

use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;

use crate::http::AppState;

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    if let Err(e) = state.store.ping().await {
        log::error!("health check failed: {e}");
        return HttpResponse::ServiceUnavailable().body("store");
    }

    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health);
}
