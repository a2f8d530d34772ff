use std::sync::Arc;

use pos_client::cashbox_remote::RemoteCashbox;
use pos_client::domain::{CashMovementRequest, Direction};
use pos_client::{ApiClient, ApiError, CashRegister, CloseCashbox};
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn register(server: &MockServer) -> CashRegister {
    let api = ApiClient::new(&server.uri()).unwrap().with_token(Some("tkn".into()));
    CashRegister::new(Arc::new(RemoteCashbox::new(api)))
}

fn open_session() -> serde_json::Value {
    json!({
        "id": 10, "storeId": 1, "openingAmount": 100.0, "status": "OPEN",
        "openedAt": "2025-03-01T08:00:00Z"
    })
}

#[tokio::test]
async fn current_with_no_content_is_empty_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cashbox/current/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let current = register(&server).current(1).await.expect("204 is not an error");
    assert!(current.is_none());
}

#[tokio::test]
async fn current_derives_totals_from_ledger() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cashbox/current/1"))
        .and(header("Authorization", "Bearer tkn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(open_session()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cashbox/sessions/10/movements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "sessionId": 10, "direction": "IN", "amount": 50, "category": "manual", "origin": "MANUAL"},
            {"id": 2, "sessionId": 10, "direction": "OUT", "amount": 20, "origin": "MANUAL"}
        ])))
        .mount(&server)
        .await;

    let snap = register(&server).current(1).await.unwrap().expect("open session");
    assert_eq!(snap.session.id, 10);
    assert_eq!(snap.totals.expected_closing, Decimal::from(130));
}

#[tokio::test]
async fn open_conflict_is_surfaced_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cashbox/open"))
        .and(body_json(json!({"storeId": 1, "openingAmount": 100.0})))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "Cashbox already open"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = register(&server)
        .open(1, Decimal::from(100), None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert_eq!(err.to_string(), "http 409: Cashbox already open");
}

#[tokio::test]
async fn zero_amount_movement_is_not_dispatched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cashbox/movements"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = register(&server)
        .create_movement(CashMovementRequest::manual(10, Direction::Out, Decimal::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
}

#[tokio::test]
async fn close_sends_expected_amount_when_none_declared() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cashbox/current/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(open_session()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cashbox/sessions/10/movements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "sessionId": 10, "direction": "IN", "amount": 25.5, "origin": "SALE", "originId": 3}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/cashbox/close"))
        .and(body_json(json!({
            "storeId": 1, "userId": 4, "date": "2025-03-01", "closingAmount": 125.5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 10, "storeId": 1, "openingAmount": 100.0, "closingAmount": 125.5,
            "status": "CLOSED", "closedAt": "2025-03-01T21:00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut args = CloseCashbox::today(1, 4);
    args.date = chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let snap = register(&server).close(args).await.unwrap();
    assert!(!snap.session.is_open());
    assert_eq!(snap.totals.sales_cash, "25.5".parse::<Decimal>().unwrap());
    assert_eq!(snap.totals.difference, Some(Decimal::ZERO));
}

#[tokio::test]
async fn close_without_open_session_fails_before_posting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cashbox/current/2"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/cashbox/close"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = register(&server).close(CloseCashbox::today(2, 1)).await.unwrap_err();
    assert!(matches!(err, ApiError::NoOpenSession(2)));
}

#[tokio::test]
async fn session_listing_passes_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cashbox/sessions"))
        .and(query_param("storeId", "1"))
        .and(query_param("status", "CLOSED"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 8, "storeId": 1, "openingAmount": 50, "closingAmount": 70, "status": "CLOSED"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = register(&server)
        .sessions(&pos_client::domain::SessionQuery {
            store_id: Some(1),
            status: Some(pos_client::domain::SessionStatus::Closed),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].closing_amount, Some(Decimal::from(70)));
}

#[tokio::test]
async fn session_listing_with_no_content_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/cashbox/sessions"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = register(&server)
        .sessions(&pos_client::domain::SessionQuery::default())
        .await
        .expect("204 is not an error");
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    // nothing listens on the discard port
    let api = ApiClient::new("http://127.0.0.1:9").unwrap();
    let reg = CashRegister::new(Arc::new(RemoteCashbox::new(api)));
    let err = reg.current(1).await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)), "got {err:?}");
}
