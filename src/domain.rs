// ===============================
// src/domain.rs
// ===============================
//
// Cash register data model:
// - CashSession  : one drawer period per store (OPEN -> CLOSED)
// - CashMovement : ledger entry (IN / OUT / ADJUST) tied to a session
// - CashTotals   : derived reconciliation, never persisted
//
// Amounts are exact decimals on the client; on the wire they are JSON numbers.
//
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    #[serde(alias = "open")]
    Open,
    #[serde(alias = "closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashSession {
    pub id: i64,
    pub store_id: i64,
    pub opening_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_amount: Option<Decimal>,
    pub status: SessionStatus,
    #[serde(default, with = "lenient_ts")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default, with = "lenient_ts")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_by: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<i64>,
    /// Server-side aggregate of cash sales, when the backend provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_cash: Option<Decimal>,
    /// Server-side aggregate of cash purchases, when the backend provides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchases_cash: Option<Decimal>,
}

impl CashSession {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
    Adjust,
}

impl Direction {
    /// +1 for income, -1 for everything that takes cash out of the drawer.
    pub fn sign(&self) -> i64 {
        match self {
            Direction::In => 1,
            Direction::Out | Direction::Adjust => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Origin {
    #[default]
    Manual,
    Sale,
    Purchase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashMovement {
    pub id: i64,
    pub session_id: i64,
    pub direction: Direction,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<i64>,
    #[serde(default, with = "lenient_ts")]
    pub created_at: Option<DateTime<Utc>>,
}

impl CashMovement {
    /// Magnitude of the movement; older backends send OUT amounts negative.
    pub fn magnitude(&self) -> Decimal {
        self.amount.abs()
    }

    pub fn signed_amount(&self) -> Decimal {
        self.magnitude() * Decimal::from(self.direction.sign())
    }
}

// ----- Requests -----

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCashboxRequest {
    pub store_id: i64,
    pub opening_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashMovementRequest {
    pub session_id: i64,
    pub direction: Direction,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<i64>,
}

impl CashMovementRequest {
    pub fn manual(session_id: i64, direction: Direction, amount: Decimal) -> Self {
        Self {
            session_id,
            direction,
            amount,
            category: None,
            notes: None,
            origin: Origin::Manual,
            origin_id: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// One line of the physical cash count (denomination x quantity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashCountLine {
    pub denomination: Decimal,
    pub quantity: u32,
}

impl CashCountLine {
    pub fn subtotal(&self) -> Decimal {
        self.denomination * Decimal::from(self.quantity)
    }

    /// Parses `DENOMxQTY`, e.g. `50x3` or `0.5x10`.
    pub fn parse(s: &str) -> Option<Self> {
        let (d, q) = s.trim().split_once(|c: char| c == 'x' || c == 'X' || c == '*')?;
        Some(Self {
            denomination: d.trim().parse().ok()?,
            quantity: q.trim().parse().ok()?,
        })
    }
}

pub fn cash_count_total(lines: &[CashCountLine]) -> Decimal {
    lines.iter().map(CashCountLine::subtotal).sum()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseCashboxRequest {
    pub store_id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_count: Option<Vec<CashCountLine>>,
}

/// Filter for `GET /api/cashbox/sessions`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NaiveDate>,
}

impl SessionQuery {
    pub fn matches(&self, s: &CashSession) -> bool {
        if self.store_id.is_some_and(|id| id != s.store_id) {
            return false;
        }
        if self.status.is_some_and(|st| st != s.status) {
            return false;
        }
        let day = s.opened_at.map(|t| t.date_naive());
        match (self.from, day) {
            (Some(from), Some(d)) if d < from => return false,
            _ => {}
        }
        match (self.to, day) {
            (Some(to), Some(d)) if d > to => return false,
            _ => {}
        }
        true
    }
}

// ----- Reconciliation -----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashTotals {
    pub opening: Decimal,
    pub sales_cash: Decimal,
    pub manual_in: Decimal,
    pub purchases_cash: Decimal,
    pub manual_out: Decimal,
    pub expected_closing: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difference: Option<Decimal>,
}

impl CashTotals {
    /// Derive totals for `session` from its ledger.
    ///
    /// SALE-origin income and PURCHASE-origin outflow are replaced by the
    /// session aggregates when the backend supplies them.
    pub fn compute(session: &CashSession, movements: &[CashMovement]) -> Self {
        let mut sales = Decimal::ZERO;
        let mut manual_in = Decimal::ZERO;
        let mut purchases = Decimal::ZERO;
        let mut manual_out = Decimal::ZERO;

        for m in movements.iter().filter(|m| m.session_id == session.id) {
            let amount = m.magnitude();
            match (m.direction, m.origin) {
                (Direction::In, Origin::Sale) => sales += amount,
                (Direction::In, _) => manual_in += amount,
                (Direction::Out | Direction::Adjust, Origin::Purchase) => purchases += amount,
                (Direction::Out | Direction::Adjust, _) => manual_out += amount,
            }
        }

        if let Some(agg) = session.sales_cash {
            sales = agg;
        }
        if let Some(agg) = session.purchases_cash {
            purchases = agg;
        }

        let opening = session.opening_amount;
        let expected_closing = opening + sales + manual_in - purchases - manual_out;
        let difference = session.closing_amount.map(|c| c - expected_closing);

        Self {
            opening,
            sales_cash: sales,
            manual_in,
            purchases_cash: purchases,
            manual_out,
            expected_closing,
            closing_amount: session.closing_amount,
            difference,
        }
    }
}

/// Session + ledger + derived totals, as rendered by a cashbox screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashSnapshot {
    pub session: CashSession,
    pub movements: Vec<CashMovement>,
    pub totals: CashTotals,
}

impl CashSnapshot {
    pub fn new(session: CashSession, movements: Vec<CashMovement>) -> Self {
        let totals = CashTotals::compute(&session, &movements);
        Self { session, movements, totals }
    }
}

// ----- Journal -----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Opened(CashSession),
    Movement(CashMovement),
    Closed { session: CashSession, totals: CashTotals },
    Uploaded { key: String },
    Note(String),
}

/// Timestamps arrive as RFC 3339, as a zone-less local time (`T` or space
/// separated) or as epoch milliseconds.
pub mod lenient_ts {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(t) = DateTime::parse_from_rfc3339(s) {
            return Some(t.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
            .map(|n| Utc.from_utc_datetime(&n))
    }

    pub fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(ms).single()
    }

    pub fn serialize<S: Serializer>(v: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(t) => s.serialize_some(&t.to_rfc3339()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let parsed = match Value::deserialize(d)? {
            Value::Null => return Ok(None),
            Value::String(raw) => parse(&raw).ok_or(raw),
            Value::Number(n) => n.as_i64().and_then(from_millis).ok_or_else(|| n.to_string()),
            other => Err(other.to_string()),
        };
        parsed
            .map(Some)
            .map_err(|raw| de::Error::custom(format!("bad timestamp: {raw}")))
    }
}
