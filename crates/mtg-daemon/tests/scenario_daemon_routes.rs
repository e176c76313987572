//! In-process scenario tests for mtg-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket.
//! Each test builds the router over a paper terminal and drives it via
//! `tower::ServiceExt::oneshot`; no network I/O required.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use mtg_audit::{verify_hash_chain, AuditWriter, VerifyResult};
use mtg_broker_paper::PaperTerminal;
use mtg_daemon::{
    routes,
    state::{AppState, Engine},
};
use mtg_execution::{OrderPolicy, QuoteRetry};
use mtg_schemas::consts;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn zero_delay_policy() -> OrderPolicy {
    OrderPolicy {
        quote_retry: QuoteRetry {
            attempts: 5,
            interval: Duration::ZERO,
        },
        ..OrderPolicy::default()
    }
}

/// Fresh state over the demo paper terminal; the terminal handle is kept so
/// tests can move quotes and inspect what was sent.
fn paper_state() -> (PaperTerminal, Arc<AppState>) {
    let paper = PaperTerminal::demo();
    let engine = Engine::new(Box::new(paper.clone()), zero_delay_policy());
    (paper, Arc::new(AppState::new(engine)))
}

/// Drive the router with a single request and return (status, body_bytes).
async fn call(st: &Arc<AppState>, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let router = routes::build_router(Arc::clone(st));
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn post(uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

/// Parse body bytes as a `serde_json::Value`.
fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

// ---------------------------------------------------------------------------
// GET /ping, /check_balance, /positions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_returns_ok_without_touching_terminal() {
    let (paper, st) = paper_state();
    paper.set_offline(true);

    let (status, body) = call(&st, get("/ping")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "mtg-daemon");
    assert!(json.get("config_hash").is_none());
}

#[tokio::test]
async fn check_balance_reports_account_snapshot() {
    let (_paper, st) = paper_state();

    let (status, body) = call(&st, get("/check_balance")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["balance"], 10_000.0);
    assert_eq!(json["free_margin"], 10_000.0);
}

#[tokio::test]
async fn account_info_is_the_full_terminal_record() {
    let (_paper, st) = paper_state();

    let (status, body) = call(&st, get("/account_info")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["margin_free"], 10_000.0);
    assert_eq!(json["equity"], 10_000.0);
}

#[tokio::test]
async fn offline_terminal_is_500_broker_unavailable() {
    let (paper, st) = paper_state();
    paper.set_offline(true);

    let (status, body) = call(&st, get("/positions")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json = parse_json(body);
    assert_eq!(json["kind"], "broker_unavailable");
    assert!(json["error"].as_str().unwrap().contains("No IPC connection"));
}

#[tokio::test]
async fn empty_book_reads_are_empty_arrays() {
    let (_paper, st) = paper_state();

    for uri in ["/positions", "/current_orders", "/order_history"] {
        let (status, body) = call(&st, get(uri)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(parse_json(body), serde_json::json!([]), "{uri}");
    }
}

// ---------------------------------------------------------------------------
// Round trip by trade id
// ---------------------------------------------------------------------------

#[tokio::test]
async fn open_then_close_by_trade_id_crosses_the_spread() {
    let (paper, st) = paper_state();

    let (status, body) = call(
        &st,
        post(
            "/start_order",
            serde_json::json!({"symbol": "EURUSD", "volume": 1, "order_type": "buy", "trade_id": "T1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Whole volume leaves as a fractional literal.
    let text = std::str::from_utf8(&body).unwrap().to_string();
    assert!(text.contains("\"volume\":1.0"), "{text}");
    let json = parse_json(body);
    assert_eq!(json["request"]["type"], consts::ORDER_TYPE_BUY);
    assert_eq!(json["request"]["price"], 1.1);
    let ticket = json["result"]["order"].as_u64().unwrap();

    let (status, body) = call(&st, get("/trades")).await;
    assert_eq!(status, StatusCode::OK);
    let trades = parse_json(body);
    assert_eq!(trades["trades"][0]["trade_id"], "T1");
    assert_eq!(trades["trades"][0]["ticket"], ticket);

    assert!(paper.set_quote("EURUSD", 1.1008, 1.1010));
    let (status, body) = call(&st, post("/end_order", serde_json::json!({"trade_id": "T1"}))).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["request"]["type"], consts::ORDER_TYPE_SELL);
    assert_eq!(json["request"]["price"], 1.1008);
    assert_eq!(json["request"]["position"], ticket);
    assert!(paper.open_positions().is_empty());
}

#[tokio::test]
async fn unknown_trade_id_is_404_and_nothing_is_sent() {
    let (paper, st) = paper_state();

    let (status, body) = call(&st, post("/end_order", serde_json::json!({"trade_id": "nope"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["kind"], "trade_not_found");
    assert!(paper.sent_requests().is_empty());
}

#[tokio::test]
async fn end_order_without_target_is_400() {
    let (_paper, st) = paper_state();

    let (status, body) = call(&st, post("/end_order", serde_json::json!({"symbol": "EURUSD"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(body)["kind"], "invalid_request");
}

#[tokio::test]
async fn malformed_start_order_body_is_400() {
    let (paper, st) = paper_state();

    let (status, body) = call(&st, post("/start_order", serde_json::json!({"volume": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(body)["kind"], "invalid_request");
    assert!(paper.sent_requests().is_empty());
}

#[tokio::test]
async fn start_order_without_side_is_400_and_nothing_is_sent() {
    let (paper, st) = paper_state();

    let (status, body) = call(
        &st,
        post("/start_order", serde_json::json!({"symbol": "EURUSD", "volume": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json = parse_json(body);
    assert_eq!(json["kind"], "invalid_request");
    assert!(json["error"].as_str().unwrap().contains("order_type"));
    assert!(paper.sent_requests().is_empty());
    assert!(paper.open_positions().is_empty());
}

#[tokio::test]
async fn broker_rejection_is_422_with_verbatim_record() {
    let (paper, st) = paper_state();
    paper.script_rejection(consts::TRADE_RETCODE_REQUOTE);

    let (status, body) = call(
        &st,
        post("/start_order", serde_json::json!({"symbol": "EURUSD", "size": 0.1, "type": "sell", "trade_id": "R1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let json = parse_json(body);
    assert_eq!(json["kind"], "broker_rejected");
    assert_eq!(json["retcode"], consts::TRADE_RETCODE_REQUOTE);
    assert_eq!(json["result"]["retcode"], consts::TRADE_RETCODE_REQUOTE);

    let (_, body) = call(&st, get("/trades")).await;
    assert_eq!(parse_json(body)["trades"], serde_json::json!([]));
}

// ---------------------------------------------------------------------------
// POST /cancel_order
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancel_missing_order_is_404_without_submission() {
    let (paper, st) = paper_state();

    let (status, body) = call(&st, post("/cancel_order", serde_json::json!({"ticket": 999}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse_json(body)["kind"], "order_not_found");
    assert!(paper.sent_requests().is_empty());
}

#[tokio::test]
async fn cancel_pending_order_sends_removal() {
    let (paper, st) = paper_state();
    let ticket = paper.place_pending("EURUSD", consts::ORDER_TYPE_BUY_LIMIT, 0.1, 1.0900);

    let (status, body) = call(&st, post("/cancel_order", serde_json::json!({"ticket": ticket}))).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["request"]["action"], consts::TRADE_ACTION_REMOVE);
    assert_eq!(json["request"]["order"], ticket);
    assert_eq!(json["result"]["retcode"], consts::TRADE_RETCODE_DONE);
}

// ---------------------------------------------------------------------------
// POST /close_all
// ---------------------------------------------------------------------------

#[tokio::test]
async fn close_all_with_no_positions_reports_message() {
    let (paper, st) = paper_state();

    let (status, body) = call(&st, post("/close_all", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["message"], "No open positions");
    assert!(paper.sent_requests().is_empty());
}

#[tokio::test]
async fn close_all_closes_every_position() {
    let (paper, st) = paper_state();
    for (symbol, side) in [("EURUSD", "buy"), ("GBPUSD", "sell")] {
        let (status, _) = call(
            &st,
            post("/start_order", serde_json::json!({"symbol": symbol, "volume": 0.1, "order_type": side})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = call(&st, post("/close_all", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let closed = parse_json(body)["closed_positions"].as_array().unwrap().clone();
    assert_eq!(closed.len(), 2);
    assert!(closed.iter().all(|c| c["result"]["retcode"] == consts::TRADE_RETCODE_DONE));
    assert!(paper.open_positions().is_empty());
}

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

#[tokio::test]
async fn symbol_info_requires_symbol_parameter() {
    let (_paper, st) = paper_state();

    let (status, body) = call(&st, get("/symbol_info")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(body)["error"], "Missing symbol parameter");
}

#[tokio::test]
async fn symbol_info_unknown_symbol_is_404() {
    let (_paper, st) = paper_state();

    let (status, body) = call(&st, get("/symbol_info?symbol=NOPE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json = parse_json(body);
    assert_eq!(json["kind"], "symbol_not_found");
    assert!(json["error"].as_str().unwrap().starts_with("Symbol not found"));
}

#[tokio::test]
async fn symbol_info_settles_quote_and_releases_watch() {
    let (paper, st) = paper_state();

    let (status, body) = call(&st, get("/symbol_info?symbol=XAUUSD")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["name"], "XAUUSD");
    assert_eq!(json["quote_settled"], true);
    assert!(json["ask"].as_f64().unwrap() > 0.0);
    assert!(!paper.is_watched("XAUUSD"));
}

#[tokio::test]
async fn clear_all_watches_reports_message() {
    let (_paper, st) = paper_state();

    let (status, body) = call(&st, post("/clear_all_watches", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert!(json["removed"].is_array());
    assert_eq!(json["failed"], serde_json::json!([]));
    assert!(json["message"].as_str().unwrap().starts_with("Removed "));
}

// ---------------------------------------------------------------------------
// GET /order_history
// ---------------------------------------------------------------------------

#[tokio::test]
async fn order_history_rejects_malformed_dates() {
    let (_paper, st) = paper_state();

    let (status, _) = call(&st, get("/order_history?from_date=yesterday")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_history_rejects_inverted_range() {
    let (_paper, st) = paper_state();

    let (status, body) = call(
        &st,
        get("/order_history?from_date=2024-03-02&to_date=2024-03-01"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse_json(body)["kind"], "invalid_request");
}

// ---------------------------------------------------------------------------
// POST /webhook_log
// ---------------------------------------------------------------------------

#[tokio::test]
async fn webhook_log_echoes_payload_without_audit() {
    let (_paper, st) = paper_state();

    let payload = serde_json::json!({"alert": "cross", "symbol": "EURUSD"});
    let (status, body) = call(&st, post("/webhook_log", payload.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["status"], "logged");
    assert_eq!(json["data"], payload);
}

#[tokio::test]
async fn audit_log_records_webhooks_and_orders_as_valid_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");

    let paper = PaperTerminal::demo();
    let engine = Engine::new(Box::new(paper.clone()), zero_delay_policy());
    let st = Arc::new(AppState::new(engine).with_audit(AuditWriter::open(&path, true).unwrap()));

    let (status, _) = call(&st, post("/webhook_log", serde_json::json!({"n": 1}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(
        &st,
        post("/start_order", serde_json::json!({"symbol": "EURUSD", "volume": 0.2, "order_type": "buy", "trade_id": 42})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&st, post("/end_order", serde_json::json!({"trade_id": "42"}))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(verify_hash_chain(&path).unwrap(), VerifyResult::Valid { lines: 3 });
    let content = std::fs::read_to_string(&path).unwrap();
    let types: Vec<String> = content
        .lines()
        .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["event_type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(types, vec!["received", "position_opened", "position_closed"]);
}
