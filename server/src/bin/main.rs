use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use dribbling_server::config::Settings;
use dribbling_server::db::{MemoryStore, PgStore, Store};
use dribbling_server::http::{self, AppState};
use dribbling_server::metrics;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let settings = Settings::from_env()?;

    let store: Arc<dyn Store> = match (&settings.database_url, settings.dev_mode) {
        (Some(url), _) => Arc::new(PgStore::connect(url, settings.db_max_connections).await?),
        (None, true) => {
            log::warn!("DATABASE_URL not set; using in-memory store (development mode)");
            Arc::new(MemoryStore::new())
        }
        (None, false) => anyhow::bail!("DATABASE_URL must be set outside development mode"),
    };

    if settings.dev_mode {
        log::warn!("development mode: unauthenticated requests act as the placeholder user");
    }

    let server_addr = settings.server_addr.clone();
    let state = web::Data::new(AppState::new(settings, store));

    log::info!("listening on {server_addr}");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(metrics::METRICS.clone())
            .app_data(state.clone())
            .configure(http::routes::init_routes)
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
