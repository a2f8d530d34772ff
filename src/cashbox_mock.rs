// ===============================
// src/cashbox_mock.rs (in-memory backend)
// ===============================
//
// Plays the server: one open session per store, movements only on open
// sessions, sequential ids. Errors use the status codes the REST backend
// answers with (404 / 409 / 400) so callers see the same shapes.
//
use std::sync::atomic::{AtomicUsize, Ordering};

use ahash::AHashMap as HashMap;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::{
    sync::Mutex,
    time::{sleep, Duration},
};

use crate::cashbox::CashboxBackend;
use crate::domain::{
    CashMovement, CashMovementRequest, CashSession, CloseCashboxRequest, OpenCashboxRequest,
    SessionQuery, SessionStatus,
};
use crate::error::{ApiError, Result};

#[derive(Default)]
struct State {
    next_id: i64,
    sessions: Vec<CashSession>,
    movements: HashMap<i64, Vec<CashMovement>>,
}

impl State {
    fn next(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn open_for(&mut self, store_id: i64) -> Option<&mut CashSession> {
        self.sessions
            .iter_mut()
            .find(|s| s.store_id == store_id && s.is_open())
    }
}

#[derive(Default)]
pub struct MockCashbox {
    state: Mutex<State>,
    latency: Duration,
    movement_calls: AtomicUsize,
}

fn http(status: u16, message: impl Into<String>) -> ApiError {
    ApiError::Http { status, message: message.into() }
}

impl MockCashbox {
    /// Simulated round-trip delay applied to every call.
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency, ..Default::default() }
    }

    /// Number of movement requests that reached the backend.
    pub fn movement_calls(&self) -> usize {
        self.movement_calls.load(Ordering::Relaxed)
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl CashboxBackend for MockCashbox {
    async fn open(&self, req: &OpenCashboxRequest) -> Result<CashSession> {
        self.delay().await;
        let mut st = self.state.lock().await;
        if st.open_for(req.store_id).is_some() {
            return Err(http(
                409,
                format!("cashbox already open for store {}", req.store_id),
            ));
        }
        if req.opening_amount < Decimal::ZERO {
            return Err(http(400, "openingAmount must be >= 0"));
        }
        let session = CashSession {
            id: st.next(),
            store_id: req.store_id,
            opening_amount: req.opening_amount,
            closing_amount: None,
            status: SessionStatus::Open,
            opened_at: Some(Utc::now()),
            closed_at: None,
            opened_by: req.user_id,
            closed_by: None,
            sales_cash: None,
            purchases_cash: None,
        };
        st.sessions.push(session.clone());
        Ok(session)
    }

    async fn close(&self, req: &CloseCashboxRequest) -> Result<CashSession> {
        self.delay().await;
        let mut st = self.state.lock().await;
        let session = st
            .open_for(req.store_id)
            .ok_or_else(|| http(404, format!("no open cashbox for store {}", req.store_id)))?;
        session.status = SessionStatus::Closed;
        session.closing_amount = req.closing_amount;
        session.closed_at = Some(Utc::now());
        session.closed_by = Some(req.user_id);
        Ok(session.clone())
    }

    async fn create_movement(&self, req: &CashMovementRequest) -> Result<CashMovement> {
        self.movement_calls.fetch_add(1, Ordering::Relaxed);
        self.delay().await;
        let mut st = self.state.lock().await;
        let session = st
            .sessions
            .iter()
            .find(|s| s.id == req.session_id)
            .ok_or_else(|| http(404, format!("cash session {} not found", req.session_id)))?;
        if !session.is_open() {
            return Err(http(409, format!("cash session {} is closed", req.session_id)));
        }
        if req.amount <= Decimal::ZERO {
            return Err(http(400, "amount must be > 0"));
        }
        let mv = CashMovement {
            id: st.next(),
            session_id: req.session_id,
            direction: req.direction,
            amount: req.amount,
            category: req.category.clone(),
            notes: req.notes.clone(),
            origin: req.origin,
            origin_id: req.origin_id,
            created_at: Some(Utc::now()),
        };
        st.movements.entry(req.session_id).or_default().push(mv.clone());
        Ok(mv)
    }

    async fn current(&self, store_id: i64) -> Result<Option<CashSession>> {
        self.delay().await;
        let mut st = self.state.lock().await;
        Ok(st.open_for(store_id).map(|s| s.clone()))
    }

    async fn sessions(&self, query: &SessionQuery) -> Result<Vec<CashSession>> {
        self.delay().await;
        let st = self.state.lock().await;
        Ok(st
            .sessions
            .iter()
            .filter(|s| query.matches(s))
            .cloned()
            .collect())
    }

    async fn session(&self, id: i64) -> Result<CashSession> {
        self.delay().await;
        let st = self.state.lock().await;
        st.sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| http(404, format!("cash session {id} not found")))
    }

    async fn movements(&self, session_id: i64) -> Result<Vec<CashMovement>> {
        self.delay().await;
        let st = self.state.lock().await;
        if !st.sessions.iter().any(|s| s.id == session_id) {
            return Err(http(404, format!("cash session {session_id} not found")));
        }
        Ok(st.movements.get(&session_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    #[tokio::test]
    async fn backend_rejects_movements_for_unknown_sessions() {
        let mock = MockCashbox::with_latency(Duration::from_millis(1));
        let err = mock
            .create_movement(&CashMovementRequest::manual(99, Direction::In, Decimal::ONE))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(mock.movement_calls(), 1);
    }

    #[tokio::test]
    async fn session_lookup_and_ledger() {
        let mock = MockCashbox::default();
        let s = mock
            .open(&OpenCashboxRequest { store_id: 4, opening_amount: Decimal::TEN, user_id: None })
            .await
            .unwrap();
        assert_eq!(mock.session(s.id).await.unwrap(), s);
        assert!(mock.movements(s.id).await.unwrap().is_empty());
        assert_eq!(mock.session(s.id + 1).await.unwrap_err().status(), Some(404));
    }
}
