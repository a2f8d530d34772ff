// ===============================
// src/main.rs
// ===============================
/*
 # pakai backend lokal
 API_BASE_URL=http://localhost:8080 pos-client login -u admin -p secret
 pos-client use-store 1
 pos-client cashbox open --amount 100
 pos-client cashbox move --direction in --amount 50 --category manual
 pos-client cashbox current
 pos-client cashbox close --count 100x1 --count 10x3

 # tanpa backend (in-memory)
 pos-client --mock cashbox demo
*/
/*
=============================================================================
Project : pos_client — async REST client & CLI for a point-of-sale backend
Module  : main.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Typed client for the POS REST API (auth, catalog CRUD, cash
          register sessions, sales, purchases, WhatsApp carts, presigned
          image upload), local preferences, JSONL cash journal and
          Prometheus request metrics.
=============================================================================
*/
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use validator::Validate;

use pos_client::auth::{AuthService, LoginRequest};
use pos_client::cashbox_mock::MockCashbox;
use pos_client::cashbox_remote::RemoteCashbox;
use pos_client::config::{self, BackendMode, Settings};
use pos_client::crud::{self, Repository};
use pos_client::domain::{
    CashCountLine, CashMovementRequest, Direction, Event, SessionQuery, SessionStatus,
};
use pos_client::orders::{
    CartQuery, CartStatus, CartsRepository, PaymentMethod, PurchaseRequest, PurchasesRepository,
    SaleRequest, SalesRepository,
};
use pos_client::prefs::{self, Prefs};
use pos_client::upload::ImageUploader;
use pos_client::{metrics, recorder, ApiClient, ApiError, CashRegister, CashboxBackend, CloseCashbox, Result};

#[derive(Parser, Debug)]
#[command(name = "pos-client", version, about = "Point-of-sale back-office client")]
struct Cli {
    /// Backend base url (default: API_BASE_URL or http://localhost:8080)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Use the in-memory cash register backend
    #[arg(long, global = true)]
    mock: bool,

    /// Store to act on (default: selected store in prefs, then STORE_ID)
    #[arg(long, global = true)]
    store: Option<i64>,

    /// Dump Prometheus metrics to stderr on exit
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    Logout,
    /// Remember the store used by later commands
    UseStore { store_id: i64 },
    #[command(subcommand)]
    Cashbox(CashCmd),
    Catalog {
        #[arg(value_enum)]
        entity: Entity,
        #[command(subcommand)]
        action: CrudAction,
    },
    #[command(subcommand)]
    Sales(OrderCmd),
    #[command(subcommand)]
    Purchases(OrderCmd),
    #[command(subcommand)]
    Carts(CartCmd),
    /// Upload an image through a presigned url and print its key
    Upload {
        #[arg(long, default_value = "products")]
        folder: String,
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum CashCmd {
    Open {
        #[arg(long)]
        amount: Decimal,
    },
    Move {
        #[arg(long, value_enum)]
        direction: DirectionArg,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Defaults to the open session of the store
        #[arg(long)]
        session: Option<i64>,
    },
    Close {
        /// Counted cash; omitted means "expected closing"
        #[arg(long)]
        amount: Option<Decimal>,
        /// Cash count line, DENOMxQTY (repeatable)
        #[arg(long = "count")]
        count: Vec<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Current,
    Sessions {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        open_only: bool,
    },
    Session { id: i64 },
    Movements { session_id: i64 },
    Report { session_id: i64 },
    /// open 100 -> IN 50 -> OUT 20 -> current -> close
    Demo,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Entity {
    Categories,
    Products,
    Providers,
    Roles,
    Schedules,
    Stores,
    Workers,
    Users,
}

#[derive(Subcommand, Debug)]
enum CrudAction {
    List,
    Get { id: i64 },
    Create {
        #[arg(long)]
        json: PathBuf,
    },
    Update {
        id: i64,
        #[arg(long)]
        json: PathBuf,
    },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum OrderCmd {
    List,
    Get { id: i64 },
    Create {
        #[arg(long)]
        json: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum CartCmd {
    List {
        #[arg(long, value_enum)]
        status: Option<CartStatusArg>,
    },
    Get { id: i64 },
    Status {
        id: i64,
        #[arg(value_enum)]
        status: CartStatusArg,
    },
    Fulfill {
        id: i64,
        #[arg(long, value_enum, default_value = "cash")]
        payment: PaymentArg,
    },
}

// CLI spellings of the wire enums

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DirectionArg {
    In,
    Out,
    Adjust,
}

impl From<DirectionArg> for Direction {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::In => Direction::In,
            DirectionArg::Out => Direction::Out,
            DirectionArg::Adjust => Direction::Adjust,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PaymentArg {
    Cash,
    Card,
    Transfer,
    Yape,
    Other,
}

impl From<PaymentArg> for PaymentMethod {
    fn from(p: PaymentArg) -> Self {
        match p {
            PaymentArg::Cash => PaymentMethod::Cash,
            PaymentArg::Card => PaymentMethod::Card,
            PaymentArg::Transfer => PaymentMethod::Transfer,
            PaymentArg::Yape => PaymentMethod::Yape,
            PaymentArg::Other => PaymentMethod::Other,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CartStatusArg {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl From<CartStatusArg> for CartStatus {
    fn from(s: CartStatusArg) -> Self {
        match s {
            CartStatusArg::Pending => CartStatus::Pending,
            CartStatusArg::Confirmed => CartStatus::Confirmed,
            CartStatusArg::Completed => CartStatus::Completed,
            CartStatusArg::Cancelled => CartStatus::Cancelled,
        }
    }
}

struct App {
    settings: Settings,
    api: ApiClient,
    prefs: Prefs,
    mode: BackendMode,
    store: Option<i64>,
    journal: Option<mpsc::Sender<Event>>,
}

impl App {
    fn store_id(&self) -> Result<i64> {
        self.store
            .or(self.prefs.store_id())
            .or(self.settings.store_id)
            .ok_or_else(|| ApiError::Config("no store selected (use-store or --store)".into()))
    }

    fn user_id(&self) -> Result<i64> {
        self.prefs
            .user_id()
            .or(self.settings.user_id)
            .ok_or_else(|| ApiError::Config("no user (login first or set USER_ID)".into()))
    }

    fn register(&self) -> CashRegister {
        let backend: Arc<dyn CashboxBackend> = match self.mode {
            BackendMode::Mock => Arc::new(MockCashbox::default()),
            BackendMode::Remote => Arc::new(RemoteCashbox::new(self.api.clone())),
        };
        let reg = CashRegister::new(backend);
        match &self.journal {
            Some(tx) => reg.with_journal(tx.clone()),
            None => reg,
        }
    }

    async fn remember_session(&mut self, session_id: Option<i64>) -> Result<()> {
        remember_session(&mut self.prefs, &self.mode, session_id).await
    }
}

/// Mirror the open session into prefs. Mock sessions live only for one
/// invocation and never touch the saved state.
async fn remember_session(prefs: &mut Prefs, mode: &BackendMode, session_id: Option<i64>) -> Result<()> {
    if *mode == BackendMode::Mock {
        return Ok(());
    }
    prefs.set_session(session_id)?;
    prefs.save().await
}

fn to_json<T: Serialize>(v: &T) -> Result<Value> {
    Ok(serde_json::to_value(v)?)
}

async fn read_json<T: DeserializeOwned>(path: &PathBuf) -> Result<T> {
    let raw = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&raw)?)
}

async fn run_crud<Req, Res>(repo: Repository<Req, Res>, action: CrudAction) -> Result<Value>
where
    Req: DeserializeOwned + Serialize + Validate + Sync,
    Res: DeserializeOwned + Serialize,
{
    match action {
        CrudAction::List => to_json(&repo.list().await?),
        CrudAction::Get { id } => to_json(&repo.get(id).await?),
        CrudAction::Create { json } => {
            let req: Req = read_json(&json).await?;
            to_json(&repo.create(&req).await?)
        }
        CrudAction::Update { id, json } => {
            let req: Req = read_json(&json).await?;
            to_json(&repo.update(id, &req).await?)
        }
        CrudAction::Delete { id } => {
            repo.delete(id).await?;
            Ok(serde_json::json!({ "deleted": id }))
        }
    }
}

async fn run_cashbox(app: &mut App, cmd: CashCmd) -> Result<Value> {
    let reg = app.register();
    match cmd {
        CashCmd::Open { amount } => {
            let store_id = app.store_id()?;
            let user_id = app.user_id().ok();
            let session = reg.open(store_id, amount, user_id).await?;
            app.remember_session(Some(session.id)).await?;
            to_json(&session)
        }
        CashCmd::Move { direction, amount, category, notes, session } => {
            let session_id = match session {
                Some(id) => id,
                None => {
                    let store_id = app.store_id()?;
                    reg.current(store_id)
                        .await?
                        .ok_or(ApiError::NoOpenSession(store_id))?
                        .session
                        .id
                }
            };
            let req = CashMovementRequest { category, notes, ..CashMovementRequest::manual(session_id, direction.into(), amount) };
            to_json(&reg.create_movement(req).await?)
        }
        CashCmd::Close { amount, count, date } => {
            let mut cash_count = Vec::with_capacity(count.len());
            for raw in &count {
                let line = CashCountLine::parse(raw)
                    .ok_or_else(|| ApiError::Validation(format!("bad cash count line: {raw}")))?;
                cash_count.push(line);
            }
            let mut args = CloseCashbox::today(app.store_id()?, app.user_id()?);
            args.closing_amount = amount;
            args.cash_count = (!cash_count.is_empty()).then_some(cash_count);
            if let Some(d) = date {
                args.date = d;
            }
            let snapshot = reg.close(args).await?;
            app.remember_session(None).await?;
            to_json(&snapshot)
        }
        CashCmd::Current => {
            let current = reg.current(app.store_id()?).await?;
            app.remember_session(current.as_ref().map(|s| s.session.id)).await?;
            to_json(&current)
        }
        CashCmd::Sessions { from, to, open_only } => {
            let query = SessionQuery {
                store_id: app.store_id().ok(),
                status: open_only.then_some(SessionStatus::Open),
                from,
                to,
            };
            to_json(&reg.sessions(&query).await?)
        }
        CashCmd::Session { id } => to_json(&reg.session(id).await?),
        CashCmd::Movements { session_id } => to_json(&reg.movements(session_id).await?),
        CashCmd::Report { session_id } => to_json(&reg.report(session_id).await?),
        CashCmd::Demo => {
            let store_id = app.store_id().unwrap_or(1);
            let session = reg.open(store_id, Decimal::from(100), None).await?;
            reg.create_movement(
                CashMovementRequest::manual(session.id, Direction::In, Decimal::from(50))
                    .with_category("manual"),
            )
            .await?;
            reg.create_movement(CashMovementRequest::manual(session.id, Direction::Out, Decimal::from(20)))
                .await?;
            let current = reg
                .current(store_id)
                .await?
                .ok_or(ApiError::NoOpenSession(store_id))?;
            info!(expected = %current.totals.expected_closing, "demo: current totals");
            let closed = reg.close(CloseCashbox::today(store_id, app.user_id().unwrap_or(0))).await?;
            Ok(serde_json::json!({ "current": current, "closed": closed }))
        }
    }
}

/// Queue an upload event; returns false (and warns) when the journal is full or closed.
fn journal_upload(journal: Option<&mpsc::Sender<Event>>, key: &str) -> bool {
    let Some(tx) = journal else { return false };
    match tx.try_send(Event::Uploaded { key: key.to_string() }) {
        Ok(()) => true,
        Err(e) => {
            warn!(?e, "journal full or closed, upload event dropped");
            false
        }
    }
}

async fn run(app: &mut App, cmd: Command) -> Result<Value> {
    match cmd {
        Command::Login { username, password } => {
            let auth = AuthService::new(app.api.clone());
            let res = auth
                .login(&LoginRequest { username, password }, &mut app.prefs)
                .await?;
            Ok(serde_json::json!({ "userId": res.user_id, "storeId": res.store_id, "role": res.role }))
        }
        Command::Logout => {
            AuthService::new(app.api.clone()).logout(&mut app.prefs).await?;
            Ok(Value::Null)
        }
        Command::UseStore { store_id } => {
            app.prefs.set(prefs::STORE_ID, store_id)?;
            app.prefs.save().await?;
            Ok(serde_json::json!({ "storeId": store_id }))
        }
        Command::Cashbox(cmd) => run_cashbox(app, cmd).await,
        Command::Catalog { entity, action } => {
            let api = app.api.clone();
            match entity {
                Entity::Categories => run_crud(crud::categories(api), action).await,
                Entity::Products => run_crud(crud::products(api), action).await,
                Entity::Providers => run_crud(crud::providers(api), action).await,
                Entity::Roles => run_crud(crud::roles(api), action).await,
                Entity::Schedules => run_crud(crud::schedules(api), action).await,
                Entity::Stores => run_crud(crud::stores(api), action).await,
                Entity::Workers => run_crud(crud::workers(api), action).await,
                Entity::Users => run_crud(crud::users(api), action).await,
            }
        }
        Command::Sales(cmd) => {
            let repo = SalesRepository::new(app.api.clone());
            match cmd {
                OrderCmd::List => to_json(&repo.list().await?),
                OrderCmd::Get { id } => to_json(&repo.get(id).await?),
                OrderCmd::Create { json } => {
                    let req: SaleRequest = read_json(&json).await?;
                    to_json(&repo.create(&req).await?)
                }
            }
        }
        Command::Purchases(cmd) => {
            let repo = PurchasesRepository::new(app.api.clone());
            match cmd {
                OrderCmd::List => to_json(&repo.list().await?),
                OrderCmd::Get { id } => to_json(&repo.get(id).await?),
                OrderCmd::Create { json } => {
                    let req: PurchaseRequest = read_json(&json).await?;
                    to_json(&repo.create(&req).await?)
                }
            }
        }
        Command::Carts(cmd) => {
            let repo = CartsRepository::new(app.api.clone());
            match cmd {
                CartCmd::List { status } => {
                    let query = CartQuery { status: status.map(Into::into), store_id: app.store_id().ok() };
                    to_json(&repo.list(&query).await?)
                }
                CartCmd::Get { id } => to_json(&repo.get(id).await?),
                CartCmd::Status { id, status } => to_json(&repo.update_status(id, status.into()).await?),
                CartCmd::Fulfill { id, payment } => {
                    let session_id = app.prefs.get::<i64>(prefs::SESSION_ID);
                    let done = repo
                        .fulfill(id, app.user_id()?, app.store_id()?, session_id, payment.into())
                        .await?;
                    to_json(&done)
                }
            }
        }
        Command::Upload { folder, file } => {
            let key = ImageUploader::new(app.api.clone()).upload_file(&folder, &file).await?;
            journal_upload(app.journal.as_ref(), &key);
            Ok(serde_json::json!({ "key": key }))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // ---- Logging (stderr; stdout carries the JSON result) ----
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = config::load();
    metrics::init();

    let mode = if cli.mock { BackendMode::Mock } else { settings.cashbox_mode.clone() };
    let base_url = cli.base_url.clone().unwrap_or_else(|| settings.api_base_url.clone());
    info!(base_url = %base_url, cashbox = mode.as_str(), "startup config");

    // ---- Journal (optional) ----
    let (journal, recorder_task) = match settings.record_file.clone() {
        Some(path) => {
            let (tx, rx) = mpsc::channel::<Event>(1024);
            (Some(tx), Some(tokio::spawn(recorder::run(rx, path))))
        }
        None => (None, None),
    };

    let outcome = match ApiClient::new(&base_url) {
        Ok(api) => {
            let prefs = Prefs::load(&settings.prefs_file).await;
            let api = api.with_token(settings.api_token.clone().or_else(|| prefs.token()));
            let mut app = App {
                settings,
                api,
                prefs,
                mode,
                store: cli.store,
                journal,
            };
            let res = run(&mut app, cli.cmd).await;
            drop(app);
            res
        }
        Err(e) => {
            drop(journal);
            Err(e)
        }
    };

    if let Some(task) = recorder_task {
        let _ = task.await;
    }
    if cli.print_metrics {
        eprint!("{}", metrics::encode_metrics());
    }

    match outcome {
        Ok(v) => {
            match serde_json::to_string_pretty(&v) {
                Ok(s) => println!("{s}"),
                Err(e) => {
                    error!(?e, "cannot render result");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(status = ?e.status(), "{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_sessions_leave_saved_prefs_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let mut local = Prefs::load(&path).await;
        remember_session(&mut local, &BackendMode::Mock, Some(1)).await.unwrap();
        assert!(!local.session_open());
        assert!(!path.exists());

        remember_session(&mut local, &BackendMode::Remote, Some(7)).await.unwrap();
        let saved = Prefs::load(&path).await;
        assert!(saved.session_open());
        assert_eq!(saved.get::<i64>(prefs::SESSION_ID), Some(7));

        // a later mock close must not clear the real session either
        remember_session(&mut local, &BackendMode::Mock, None).await.unwrap();
        assert_eq!(Prefs::load(&path).await.get::<i64>(prefs::SESSION_ID), Some(7));
    }

    #[test]
    fn upload_journal_reports_dropped_events() {
        let (tx, mut rx) = mpsc::channel(1);
        assert!(journal_upload(Some(&tx), "products/a.png"));
        assert!(matches!(rx.try_recv(), Ok(Event::Uploaded { key }) if key == "products/a.png"));

        drop(rx);
        assert!(!journal_upload(Some(&tx), "products/b.png"));
        assert!(!journal_upload(None, "products/c.png"));
    }

    #[test]
    fn cli_enums_map_to_wire_values() {
        assert_eq!(Direction::from(DirectionArg::Adjust), Direction::Adjust);
        assert_eq!(PaymentMethod::from(PaymentArg::Yape), PaymentMethod::Yape);
        assert_eq!(CartStatus::from(CartStatusArg::Cancelled), CartStatus::Cancelled);
    }
}
