// ===============================
// src/cashbox_remote.rs
// ===============================
use async_trait::async_trait;

use crate::cashbox::CashboxBackend;
use crate::domain::{
    CashMovement, CashMovementRequest, CashSession, CloseCashboxRequest, OpenCashboxRequest,
    SessionQuery,
};
use crate::error::Result;
use crate::http::ApiClient;

/// Cash register endpoints of the POS REST backend.
#[derive(Clone)]
pub struct RemoteCashbox {
    api: ApiClient,
}

impl RemoteCashbox {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CashboxBackend for RemoteCashbox {
    async fn open(&self, req: &OpenCashboxRequest) -> Result<CashSession> {
        self.api.post("/api/cashbox/open", req).await
    }

    async fn close(&self, req: &CloseCashboxRequest) -> Result<CashSession> {
        self.api.post("/api/cashbox/close", req).await
    }

    async fn create_movement(&self, req: &CashMovementRequest) -> Result<CashMovement> {
        self.api.post("/api/cashbox/movements", req).await
    }

    async fn current(&self, store_id: i64) -> Result<Option<CashSession>> {
        self.api
            .get_optional(&format!("/api/cashbox/current/{store_id}"))
            .await
    }

    async fn sessions(&self, query: &SessionQuery) -> Result<Vec<CashSession>> {
        Ok(self
            .api
            .get_query_optional("/api/cashbox/sessions", query)
            .await?
            .unwrap_or_default())
    }

    async fn session(&self, id: i64) -> Result<CashSession> {
        self.api.get(&format!("/api/cashbox/sessions/{id}")).await
    }

    async fn movements(&self, session_id: i64) -> Result<Vec<CashMovement>> {
        // some deployments answer 204 for an empty ledger
        Ok(self
            .api
            .get_optional(&format!("/api/cashbox/sessions/{session_id}/movements"))
            .await?
            .unwrap_or_default())
    }
}
