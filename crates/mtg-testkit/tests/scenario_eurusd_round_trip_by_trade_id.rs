//! Scenario: open EURUSD by trade id, move the market, close by trade id.
//!
//! # Invariants under test
//! - Open buy prices at the ask, close of a buy prices at the bid.
//! - The close references the exact ticket recorded by the open.
//! - Whole volumes leave the gateway as fractional literals.

use mtg_execution::{CloseRequest, GatewayError, OrderIntent, Side, TradeId};
use mtg_schemas::consts;
use mtg_testkit::paper_engine;

#[test]
fn round_trip_maps_trade_id_to_ticket_and_inverts_price() {
    let (paper, engine) = paper_engine();
    assert!(paper.set_quote("EURUSD", 1.0998, 1.1000));

    let opened = engine
        .open_position(&OrderIntent::market("EURUSD", Side::Buy, 1.0).with_trade_id("T1"))
        .unwrap();
    assert_eq!(opened.request.order_type, Some(consts::ORDER_TYPE_BUY));
    assert_eq!(opened.request.price.map(f64::from), Some(1.1000));
    assert_eq!(opened.request.volume.map(f64::from), Some(1.0));

    let wire = serde_json::to_string(&opened.request).unwrap();
    assert!(wire.contains("\"volume\":1.0"), "{wire}");
    assert_eq!(engine.trade_ids(), vec![(TradeId::new("T1"), opened.ticket)]);

    assert!(paper.set_quote("EURUSD", 1.1008, 1.1010));
    let closed = engine.close_position(&CloseRequest::trade_id("T1")).unwrap();
    assert_eq!(closed.ticket, opened.ticket);
    assert_eq!(closed.request.order_type, Some(consts::ORDER_TYPE_SELL));
    assert_eq!(closed.request.price.map(f64::from), Some(1.1008));
    assert_eq!(closed.request.position, Some(opened.ticket));
    assert!(paper.open_positions().is_empty());
}

#[test]
fn sell_round_trip_opens_at_bid_and_closes_at_ask() {
    let (paper, engine) = paper_engine();

    let opened = engine
        .open_position(&OrderIntent::market("EURUSD", Side::Sell, 0.5).with_trade_id("S1"))
        .unwrap();
    assert_eq!(opened.request.price.map(f64::from), Some(1.0998));

    assert!(paper.set_quote("EURUSD", 1.0990, 1.0992));
    let closed = engine.close_position(&CloseRequest::trade_id("S1")).unwrap();
    assert_eq!(closed.request.order_type, Some(consts::ORDER_TYPE_BUY));
    assert_eq!(closed.request.price.map(f64::from), Some(1.0992));
}

#[test]
fn reused_trade_id_points_at_latest_ticket() {
    let (_paper, engine) = paper_engine();

    let first = engine
        .open_position(&OrderIntent::market("EURUSD", Side::Buy, 0.1).with_trade_id("T1"))
        .unwrap();
    let second = engine
        .open_position(&OrderIntent::market("GBPUSD", Side::Buy, 0.1).with_trade_id("T1"))
        .unwrap();
    assert_ne!(first.ticket, second.ticket);

    let closed = engine.close_position(&CloseRequest::trade_id("T1")).unwrap();
    assert_eq!(closed.ticket, second.ticket);
    assert_eq!(closed.request.symbol.as_deref(), Some("GBPUSD"));
}

#[test]
fn closing_an_already_closed_ticket_is_trade_not_found() {
    let (_paper, engine) = paper_engine();

    let opened = engine
        .open_position(&OrderIntent::market("EURUSD", Side::Buy, 0.1))
        .unwrap();
    engine.close_position(&CloseRequest::ticket(opened.ticket)).unwrap();

    let err = engine
        .close_position(&CloseRequest::ticket(opened.ticket))
        .unwrap_err();
    assert!(matches!(err, GatewayError::TradeNotFound(_)));
}
