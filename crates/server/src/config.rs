use std::env;

use picomon_core::DEFAULT_LOG_INTERVAL_SECS;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: String,
    pub db_path: String,
    pub log_interval_secs: i64,
    pub history_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            db_path: "./data/picomon.db".to_string(),
            log_interval_secs: DEFAULT_LOG_INTERVAL_SECS,
            history_limit: 30,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let mut cfg = ServerConfig::default();

        if let Ok(v) = env::var("PICOMON_HTTP_ADDR") {
            if !v.is_empty() {
                cfg.http_addr = v;
            }
        }
        if let Ok(v) = env::var("PICOMON_DB_PATH") {
            if !v.is_empty() {
                cfg.db_path = v;
            }
        }
        if let Ok(v) = env::var("PICOMON_LOG_INTERVAL_SECS") {
            if let Ok(s) = v.parse::<i64>() {
                cfg.log_interval_secs = s;
            }
        }
        if let Ok(v) = env::var("PICOMON_HISTORY_LIMIT") {
            if let Ok(n) = v.parse::<u32>() {
                cfg.history_limit = n;
            }
        }

        cfg
    }
}
