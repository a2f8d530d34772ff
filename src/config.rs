// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : pos_client — async REST client & CLI for a point-of-sale backend
Module  : config.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Typed client for the POS REST API (auth, catalog CRUD, cash
          register sessions, sales, purchases, WhatsApp carts, presigned
          image upload), local preferences, JSONL cash journal and
          Prometheus request metrics.
=============================================================================
*/
use std::env;
use dotenvy::dotenv;

/// Backend used for the cash register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendMode {
    /// In-memory backend, same server-side rules, state lives for one process.
    Mock,
    Remote,
}

impl BackendMode {
    pub fn from_env(key: &str, default_mode: BackendMode) -> BackendMode {
        Self::parse(&env::var(key).unwrap_or_default()).unwrap_or(default_mode)
    }

    pub fn parse(s: &str) -> Option<BackendMode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" | "memory" => Some(BackendMode::Mock),
            "remote" | "http" => Some(BackendMode::Remote),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Mock => "mock",
            BackendMode::Remote => "remote",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    // backend
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub cashbox_mode: BackendMode,

    // files
    pub prefs_file: String,
    pub record_file: Option<String>,

    // defaults for commands that need a store / user
    pub store_id: Option<i64>,
    pub user_id: Option<i64>,
}

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_PREFS_FILE: &str = ".pos_prefs.json";

fn env_i64(key: &str) -> Option<i64> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn load() -> Settings {
    // .env is optional
    let _ = dotenv();

    let api_base_url = env_non_empty("API_BASE_URL")
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string();

    Settings {
        api_base_url,
        api_token: env_non_empty("API_TOKEN"),
        cashbox_mode: BackendMode::from_env("CASHBOX_MODE", BackendMode::Remote),
        prefs_file: env_non_empty("PREFS_FILE").unwrap_or_else(|| DEFAULT_PREFS_FILE.to_string()),
        record_file: env_non_empty("RECORD_FILE"),
        store_id: env_i64("STORE_ID"),
        user_id: env_i64("USER_ID"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_mode_parsing() {
        assert_eq!(BackendMode::parse("MOCK"), Some(BackendMode::Mock));
        assert_eq!(BackendMode::parse(" remote "), Some(BackendMode::Remote));
        assert_eq!(BackendMode::parse("http"), Some(BackendMode::Remote));
        assert_eq!(BackendMode::parse("binance"), None);
        assert_eq!(BackendMode::Mock.as_str(), "mock");
    }
}
