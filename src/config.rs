use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    /// How often a watcher re-polls the persisted trip record, in seconds.
    pub watcher_poll_secs: u64,
    /// Buffered events per trip relay channel before slow subscribers lag.
    pub relay_capacity: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "safewalk".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "safewalk".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "safewalk".to_string());

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let watcher_poll_secs = env::var("WATCHER_POLL_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);
        let relay_capacity = env::var("RELAY_CAPACITY")
            .unwrap_or_else(|_| "64".to_string())
            .parse()
            .unwrap_or(64);

        Ok(Self {
            database_url,
            log_level,
            watcher_poll_secs,
            relay_capacity,
        })
    }
}
