// ===============================
// src/cashbox.rs
// ===============================
//
// Cash register lifecycle: NoSession -> Open -> Closed.
//
// Client-side rules live here (opening >= 0, movement amount > 0, closing
// defaults to the expected amount). Server-side rules (one open session per
// store, no movements on a closed session) are enforced by the backend and
// surfaced unchanged.
//
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::{
    CashCountLine, CashMovement, CashMovementRequest, CashSession, CashSnapshot,
    CloseCashboxRequest, Event, OpenCashboxRequest, SessionQuery,
};
use crate::error::{ApiError, Result};
use crate::metrics::cash_op;

/// Backend seam: the REST API (`cashbox_remote`) or an in-memory stand-in
/// (`cashbox_mock`).
#[async_trait]
pub trait CashboxBackend: Send + Sync {
    async fn open(&self, req: &OpenCashboxRequest) -> Result<CashSession>;
    async fn close(&self, req: &CloseCashboxRequest) -> Result<CashSession>;
    async fn create_movement(&self, req: &CashMovementRequest) -> Result<CashMovement>;
    /// `Ok(None)` when the store has no open session.
    async fn current(&self, store_id: i64) -> Result<Option<CashSession>>;
    async fn sessions(&self, query: &SessionQuery) -> Result<Vec<CashSession>>;
    async fn session(&self, id: i64) -> Result<CashSession>;
    async fn movements(&self, session_id: i64) -> Result<Vec<CashMovement>>;
}

/// Arguments of a close, before the client fills in the closing amount.
#[derive(Debug, Clone)]
pub struct CloseCashbox {
    pub store_id: i64,
    pub user_id: i64,
    pub date: chrono::NaiveDate,
    pub closing_amount: Option<Decimal>,
    pub cash_count: Option<Vec<CashCountLine>>,
}

impl CloseCashbox {
    /// Close for today with no declared amount.
    pub fn today(store_id: i64, user_id: i64) -> Self {
        Self {
            store_id,
            user_id,
            date: Local::now().date_naive(),
            closing_amount: None,
            cash_count: None,
        }
    }
}

#[derive(Clone)]
pub struct CashRegister {
    backend: Arc<dyn CashboxBackend>,
    journal: Option<mpsc::Sender<Event>>,
}

impl CashRegister {
    pub fn new(backend: Arc<dyn CashboxBackend>) -> Self {
        Self { backend, journal: None }
    }

    pub fn with_journal(mut self, tx: mpsc::Sender<Event>) -> Self {
        self.journal = Some(tx);
        self
    }

    fn record(&self, ev: Event) {
        if let Some(tx) = &self.journal {
            if let Err(e) = tx.try_send(ev) {
                warn!(?e, "journal full or closed, event dropped");
            }
        }
    }

    pub async fn open(
        &self,
        store_id: i64,
        opening_amount: Decimal,
        user_id: Option<i64>,
    ) -> Result<CashSession> {
        if opening_amount.is_sign_negative() {
            cash_op("open", false);
            return Err(ApiError::Validation(
                "opening amount must be zero or positive".to_string(),
            ));
        }
        let req = OpenCashboxRequest { store_id, opening_amount, user_id };
        let res = self.backend.open(&req).await;
        cash_op("open", res.is_ok());
        let session = res?;
        info!(store_id, session_id = session.id, %opening_amount, "cashbox opened");
        self.record(Event::Opened(session.clone()));
        Ok(session)
    }

    pub async fn create_movement(&self, req: CashMovementRequest) -> Result<CashMovement> {
        if req.amount <= Decimal::ZERO {
            cash_op("movement", false);
            return Err(ApiError::Validation(
                "movement amount must be greater than zero".to_string(),
            ));
        }
        let res = self.backend.create_movement(&req).await;
        cash_op("movement", res.is_ok());
        let mv = res?;
        info!(
            session_id = mv.session_id,
            direction = ?mv.direction,
            amount = %mv.amount,
            "cash movement recorded"
        );
        self.record(Event::Movement(mv.clone()));
        Ok(mv)
    }

    /// Open session of the store with its ledger and derived totals.
    pub async fn current(&self, store_id: i64) -> Result<Option<CashSnapshot>> {
        let Some(session) = self.backend.current(store_id).await? else {
            info!(store_id, "no open cash session");
            return Ok(None);
        };
        let movements = self.backend.movements(session.id).await?;
        Ok(Some(CashSnapshot::new(session, movements)))
    }

    /// Close the open session of `args.store_id`.
    ///
    /// Without a declared closing amount the expected closing is sent, so the
    /// reported difference is zero.
    pub async fn close(&self, args: CloseCashbox) -> Result<CashSnapshot> {
        let res = self.close_inner(args).await;
        cash_op("close", res.is_ok());
        res
    }

    async fn close_inner(&self, args: CloseCashbox) -> Result<CashSnapshot> {
        if args.closing_amount.is_some_and(|c| c.is_sign_negative()) {
            return Err(ApiError::Validation(
                "closing amount must be zero or positive".to_string(),
            ));
        }
        let open = self
            .current(args.store_id)
            .await?
            .ok_or(ApiError::NoOpenSession(args.store_id))?;

        let expected = open.totals.expected_closing;
        let closing = args.closing_amount.unwrap_or(expected);
        let req = CloseCashboxRequest {
            store_id: args.store_id,
            user_id: args.user_id,
            date: args.date,
            closing_amount: Some(closing),
            cash_count: args.cash_count,
        };

        let mut closed = self.backend.close(&req).await?;
        if closed.closing_amount.is_none() {
            closed.closing_amount = Some(closing);
        }
        let snapshot = CashSnapshot::new(closed, open.movements);
        info!(
            store_id = args.store_id,
            session_id = snapshot.session.id,
            expected = %snapshot.totals.expected_closing,
            closing = %closing,
            difference = ?snapshot.totals.difference,
            "cashbox closed"
        );
        self.record(Event::Closed {
            session: snapshot.session.clone(),
            totals: snapshot.totals.clone(),
        });
        Ok(snapshot)
    }

    pub async fn sessions(&self, query: &SessionQuery) -> Result<Vec<CashSession>> {
        self.backend.sessions(query).await
    }

    pub async fn session(&self, id: i64) -> Result<CashSession> {
        self.backend.session(id).await
    }

    pub async fn movements(&self, session_id: i64) -> Result<Vec<CashMovement>> {
        self.backend.movements(session_id).await
    }

    /// Totals for any session, open or closed.
    pub async fn report(&self, session_id: i64) -> Result<CashSnapshot> {
        let session = self.backend.session(session_id).await?;
        let movements = self.backend.movements(session_id).await?;
        Ok(CashSnapshot::new(session, movements))
    }
}
