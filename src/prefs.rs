// ===============================
// src/prefs.rs
// ===============================
//
// Local key-value preferences (store id, user id, token, session flags).
// One JSON object on disk, rewritten atomically (tmp file + rename).
//
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::warn;

use crate::error::Result;

pub const STORE_ID: &str = "store_id";
pub const USER_ID: &str = "user_id";
pub const TOKEN: &str = "token";
pub const SESSION_OPEN: &str = "session_open";
pub const SESSION_ID: &str = "session_id";

#[derive(Debug, Clone)]
pub struct Prefs {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl Prefs {
    /// Load from `path`; a missing or unreadable file yields empty prefs.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|e| {
                warn!(?e, path = %path.display(), "prefs file unreadable, starting empty");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, values }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        self.values.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&self.values)?).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    pub fn store_id(&self) -> Option<i64> {
        self.get(STORE_ID)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.get(USER_ID)
    }

    pub fn token(&self) -> Option<String> {
        self.get(TOKEN)
    }

    pub fn session_open(&self) -> bool {
        self.get(SESSION_OPEN).unwrap_or(false)
    }

    /// Mirror the cash session state shown on the home screen.
    pub fn set_session(&mut self, session_id: Option<i64>) -> Result<()> {
        match session_id {
            Some(id) => {
                self.set(SESSION_OPEN, true)?;
                self.set(SESSION_ID, id)?;
            }
            None => {
                self.set(SESSION_OPEN, false)?;
                self.remove(SESSION_ID);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let mut p = Prefs::load(&path).await;
        assert_eq!(p.store_id(), None);
        p.set(STORE_ID, 3).unwrap();
        p.set(USER_ID, 11).unwrap();
        p.set(TOKEN, "t0k").unwrap();
        p.set_session(Some(42)).unwrap();
        p.save().await.unwrap();

        let p = Prefs::load(&path).await;
        assert_eq!(p.store_id(), Some(3));
        assert_eq!(p.user_id(), Some(11));
        assert_eq!(p.token().as_deref(), Some("t0k"));
        assert!(p.session_open());
        assert_eq!(p.get::<i64>(SESSION_ID), Some(42));
    }

    #[tokio::test]
    async fn closing_session_clears_flags() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = Prefs::load(dir.path().join("p.json")).await;
        p.set_session(Some(1)).unwrap();
        p.set_session(None).unwrap();
        assert!(!p.session_open());
        assert_eq!(p.get::<i64>(SESSION_ID), None);
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let p = Prefs::load(&path).await;
        assert_eq!(p.user_id(), None);
    }
}
