//! Axum router and all HTTP handlers for mtg-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Scenario tests drive the bare router.
//!
//! Every terminal-backed handler goes through [`AppState::blocking`]. Only
//! `/ping`, `/webhook_log` and `/trades` never touch the terminal.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use mtg_execution::CloseAllOutcome;
use mtg_schemas::{AccountInfo, TradeDeal, TradeOrder, TradePosition};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    api_types::{
        BalanceResponse, CancelOrderRequest, ClearWatchesResponse, CloseAllResponse,
        EndOrderRequest, HistoryQuery, OrderResponse, PingResponse, StartOrderRequest,
        SymbolInfoResponse, SymbolQuery, TradeEntry, TradesResponse, WebhookLogResponse,
    },
    error::ApiError,
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/check_balance", get(check_balance))
        .route("/account_info", get(account_info))
        .route("/current_orders", get(current_orders))
        .route("/positions", get(positions))
        .route("/symbol_info", get(symbol_info))
        .route("/order_history", get(order_history))
        .route("/start_order", post(start_order))
        .route("/end_order", post(end_order))
        .route("/cancel_order", post(cancel_order))
        .route("/close_all", post(close_all))
        .route("/clear_all_watches", post(clear_all_watches))
        .route("/webhook_log", post(webhook_log))
        .route("/trades", get(trades))
        .with_state(state)
}

fn bad_body(rej: JsonRejection) -> ApiError {
    ApiError::BadRequest(rej.body_text())
}

// ---------------------------------------------------------------------------
// GET /ping
// ---------------------------------------------------------------------------

pub(crate) async fn ping(State(st): State<Arc<AppState>>) -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        message: "gateway is running",
        service: st.build.service,
        version: st.build.version,
        config_hash: st.config_hash.clone(),
    })
}

// ---------------------------------------------------------------------------
// Account and book reads
// ---------------------------------------------------------------------------

pub(crate) async fn check_balance(
    State(st): State<Arc<AppState>>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let acct = st.blocking(|s| s.engine.account_info()).await?;
    Ok(Json(BalanceResponse::from(&acct)))
}

pub(crate) async fn account_info(
    State(st): State<Arc<AppState>>,
) -> Result<Json<AccountInfo>, ApiError> {
    Ok(Json(st.blocking(|s| s.engine.account_info()).await?))
}

pub(crate) async fn current_orders(
    State(st): State<Arc<AppState>>,
) -> Result<Json<Vec<TradeOrder>>, ApiError> {
    Ok(Json(st.blocking(|s| s.engine.orders()).await?))
}

pub(crate) async fn positions(
    State(st): State<Arc<AppState>>,
) -> Result<Json<Vec<TradePosition>>, ApiError> {
    Ok(Json(st.blocking(|s| s.engine.positions()).await?))
}

// ---------------------------------------------------------------------------
// GET /symbol_info?symbol=S
// ---------------------------------------------------------------------------

/// Subscribes, waits for a live quote (bounded), then unsubscribes. A quote
/// that never settles is still 200 with `quote_settled: false`.
pub(crate) async fn symbol_info(
    State(st): State<Arc<AppState>>,
    Query(q): Query<SymbolQuery>,
) -> Result<Json<SymbolInfoResponse>, ApiError> {
    let symbol = q
        .symbol
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing symbol parameter".to_string()))?;

    let quote = st.blocking(move |s| s.engine.symbol_quote(&symbol)).await?;
    Ok(Json(quote.into()))
}

// ---------------------------------------------------------------------------
// GET /order_history?from_date&to_date
// ---------------------------------------------------------------------------

pub(crate) async fn order_history(
    State(st): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> Result<Json<Vec<TradeDeal>>, ApiError> {
    let (from, to) = history_window(&q, Utc::now())?;
    Ok(Json(
        st.blocking(move |s| s.engine.history_deals(from, to)).await?,
    ))
}

/// `from_date` defaults to today 00:00 UTC and `to_date` to `now`. An
/// explicit `to_date` covers that whole day.
fn history_window(
    q: &HistoryQuery,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ApiError> {
    let from_day = match non_blank(&q.from_date) {
        Some(raw) => parse_day(raw, "from_date")?,
        None => now.date_naive(),
    };
    let from = at(from_day, 0, 0, 0)?;

    let to = match non_blank(&q.to_date) {
        Some(raw) => at(parse_day(raw, "to_date")?, 23, 59, 59)?,
        None => now,
    };
    Ok((from, to))
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_day(raw: &str, field: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("{field} '{raw}' is not YYYY-MM-DD")))
}

fn at(day: NaiveDate, h: u32, m: u32, s: u32) -> Result<DateTime<Utc>, ApiError> {
    day.and_hms_opt(h, m, s)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ApiError::BadRequest(format!("invalid time on {day}")))
}

// ---------------------------------------------------------------------------
// POST /start_order
// ---------------------------------------------------------------------------

pub(crate) async fn start_order(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<StartOrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Json(req) = payload.map_err(bad_body)?;
    let intent = req.into_intent();

    let sub = st
        .blocking(move |s| {
            let sub = s.engine.open_position(&intent)?;
            s.record(
                "orders",
                "position_opened",
                json!({
                    "ticket": sub.ticket,
                    "trade_id": intent.trade_id,
                    "request": sub.request,
                    "result": sub.result,
                }),
            );
            Ok(sub)
        })
        .await?;

    Ok(Json(OrderResponse {
        result: sub.result,
        request: sub.request,
    }))
}

// ---------------------------------------------------------------------------
// POST /end_order
// ---------------------------------------------------------------------------

pub(crate) async fn end_order(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<EndOrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Json(req) = payload.map_err(bad_body)?;
    let close = req.into_close().map_err(ApiError::BadRequest)?;

    let sub = st
        .blocking(move |s| {
            let sub = s.engine.close_position(&close)?;
            s.record(
                "orders",
                "position_closed",
                json!({
                    "ticket": sub.ticket,
                    "target": close.target.to_string(),
                    "request": sub.request,
                    "result": sub.result,
                }),
            );
            Ok(sub)
        })
        .await?;

    Ok(Json(OrderResponse {
        result: sub.result,
        request: sub.request,
    }))
}

// ---------------------------------------------------------------------------
// POST /cancel_order
// ---------------------------------------------------------------------------

pub(crate) async fn cancel_order(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<CancelOrderRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError> {
    let Json(req) = payload.map_err(bad_body)?;

    let sub = st
        .blocking(move |s| {
            let sub = s.engine.cancel_order(req.ticket)?;
            s.record(
                "orders",
                "order_cancelled",
                json!({ "ticket": sub.ticket, "result": sub.result }),
            );
            Ok(sub)
        })
        .await?;

    Ok(Json(OrderResponse {
        result: sub.result,
        request: sub.request,
    }))
}

// ---------------------------------------------------------------------------
// POST /close_all
// ---------------------------------------------------------------------------

/// Best effort: per-position failures are reported inside the 200 body.
pub(crate) async fn close_all(
    State(st): State<Arc<AppState>>,
) -> Result<Json<CloseAllResponse>, ApiError> {
    let outcome = st
        .blocking(|s| {
            let outcome = s.engine.close_all_positions()?;
            if let CloseAllOutcome::Closed(items) = &outcome {
                s.record("orders", "close_all", json!({ "items": items }));
            }
            Ok(outcome)
        })
        .await?;

    Ok(Json(match outcome {
        CloseAllOutcome::NoOpenPositions => CloseAllResponse::Empty {
            message: "No open positions",
        },
        CloseAllOutcome::Closed(items) => CloseAllResponse::Closed {
            closed_positions: items,
        },
    }))
}

// ---------------------------------------------------------------------------
// POST /clear_all_watches
// ---------------------------------------------------------------------------

pub(crate) async fn clear_all_watches(
    State(st): State<Arc<AppState>>,
) -> Result<Json<ClearWatchesResponse>, ApiError> {
    let report = st.blocking(|s| s.engine.clear_watches()).await?;
    let message = format!("Removed {} symbols from Market Watch.", report.removed.len());
    Ok(Json(ClearWatchesResponse {
        removed: report.removed,
        failed: report.failed,
        message,
    }))
}

// ---------------------------------------------------------------------------
// POST /webhook_log
// ---------------------------------------------------------------------------

pub(crate) async fn webhook_log(
    State(st): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<WebhookLogResponse>, ApiError> {
    let Json(data) = payload.map_err(bad_body)?;
    info!(payload = %data, "webhook received");

    if st.audit_enabled() {
        let event = data.clone();
        st.blocking(move |s| {
            s.record("webhook", "received", event);
            Ok(())
        })
        .await?;
    }

    Ok(Json(WebhookLogResponse {
        status: "logged",
        data,
    }))
}

// ---------------------------------------------------------------------------
// GET /trades
// ---------------------------------------------------------------------------

pub(crate) async fn trades(State(st): State<Arc<AppState>>) -> Json<TradesResponse> {
    let trades = st
        .engine
        .trade_ids()
        .into_iter()
        .map(|(trade_id, ticket)| TradeEntry { trade_id, ticket })
        .collect();
    Json(TradesResponse { trades })
}
