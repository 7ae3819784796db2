//! Runtime configuration for the Dribbling server.

use anyhow::{anyhow, Result};
use std::env;

/// Everything the server reads from the environment, resolved once at
/// startup and handed to whoever needs it.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Bot token the init-data signatures are derived from.
    pub bot_token: String,
    /// Development mode: requests without valid init data act as a
    /// placeholder user.
    pub dev_mode: bool,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub server_addr: String,
    /// Cities offered by the client's city picker.
    pub cities: Vec<String>,
    pub home: HomeCity,
}

/// Defaults applied to matches created without a city or coordinates.
#[derive(Debug, Clone)]
pub struct HomeCity {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for HomeCity {
    fn default() -> Self {
        HomeCity {
            name: "Пенджикент".into(),
            latitude: 39.4952,
            longitude: 67.6093,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let bot_token = env::var("BOT_TOKEN").map_err(|_| anyhow!("BOT_TOKEN must be set"))?;

        let dev_mode = env::var("DEBUG")
            .ok()
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);

        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into());

        let defaults = HomeCity::default();

        let cities: Vec<String> = env::var("CITIES")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(String::from)
                    .collect()
            })
            .filter(|c: &Vec<String>| !c.is_empty())
            .unwrap_or_else(|| vec![defaults.name.clone()]);

        let home = HomeCity {
            name: env::var("DEFAULT_CITY").unwrap_or_else(|_| cities[0].clone()),
            latitude: env::var("DEFAULT_LAT")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(defaults.latitude),
            longitude: env::var("DEFAULT_LON")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(defaults.longitude),
        };

        Ok(Settings {
            bot_token,
            dev_mode,
            database_url,
            db_max_connections,
            server_addr,
            cities,
            home,
        })
    }

    /// Settings for tests and local tooling: no database, given token.
    pub fn for_token(bot_token: impl Into<String>, dev_mode: bool) -> Self {
        let home = HomeCity::default();
        Settings {
            bot_token: bot_token.into(),
            dev_mode,
            database_url: None,
            db_max_connections: 5,
            server_addr: "127.0.0.1:8080".into(),
            cities: vec![home.name.clone()],
            home,
        }
    }
}
