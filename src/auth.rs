// ===============================
// src/auth.rs
// ===============================
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::error::Result;
use crate::http::ApiClient;
use crate::prefs::{self, Prefs};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub store_id: Option<i64>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Login installs the bearer token on the shared client and remembers the
/// user (and store, when the backend assigns one) in the preferences.
#[derive(Clone)]
pub struct AuthService {
    api: ApiClient,
}

impl AuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn login(&self, req: &LoginRequest, prefs: &mut Prefs) -> Result<LoginResponse> {
        req.validate()?;
        let res: LoginResponse = self.api.post("/api/auth/login", req).await?;
        self.api.set_token(Some(res.token.clone()));

        prefs.set(prefs::TOKEN, &res.token)?;
        prefs.set(prefs::USER_ID, res.user_id)?;
        if let Some(store_id) = res.store_id {
            prefs.set(prefs::STORE_ID, store_id)?;
        }
        prefs.save().await?;

        info!(user_id = res.user_id, store_id = ?res.store_id, "logged in");
        Ok(res)
    }

    pub async fn logout(&self, prefs: &mut Prefs) -> Result<()> {
        self.api.set_token(None);
        prefs.remove(prefs::TOKEN);
        prefs.remove(prefs::USER_ID);
        prefs.set_session(None)?;
        prefs.save().await?;
        info!("logged out");
        Ok(())
    }
}
