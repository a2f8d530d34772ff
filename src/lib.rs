// ===============================
// src/lib.rs
// ===============================
pub mod auth;
pub mod cashbox;
pub mod cashbox_mock;   // in-memory backend (same server-side rules)
pub mod cashbox_remote; // REST backend
pub mod catalog;
pub mod config;
pub mod crud;
pub mod domain;
pub mod error;
pub mod http;
pub mod metrics;
pub mod orders;
pub mod prefs;
pub mod recorder;
pub mod upload;

pub use cashbox::{CashRegister, CashboxBackend, CloseCashbox};
pub use error::{ApiError, Result};
pub use http::ApiClient;
