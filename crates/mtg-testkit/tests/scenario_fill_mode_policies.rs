//! Scenario: caller fill-mode values resolve through one configured rule.

use mtg_execution::{
    CallerNumbering, FillMode, FillModePolicy, GatewayError, OrderIntent, OrderPolicy, Side,
};
use mtg_schemas::consts;
use mtg_testkit::{paper_engine_with, zero_delay_policy};

fn policy(numbering: CallerNumbering) -> OrderPolicy {
    OrderPolicy {
        fill_mode: FillModePolicy {
            default: FillMode::Ioc,
            caller_numbering: numbering,
        },
        ..zero_delay_policy()
    }
}

fn intent(fill: Option<i64>) -> OrderIntent {
    OrderIntent {
        fill_mode: fill,
        ..OrderIntent::market("EURUSD", Side::Buy, 0.1)
    }
}

#[test]
fn ignore_numbering_always_uses_default() {
    let (_paper, engine) = paper_engine_with(policy(CallerNumbering::Ignore));
    let sub = engine.open_position(&intent(Some(0))).unwrap();
    assert_eq!(sub.request.type_filling, Some(consts::ORDER_FILLING_IOC));
}

#[test]
fn broker_numbering_passes_value_through() {
    let (_paper, engine) = paper_engine_with(policy(CallerNumbering::Broker));
    let sub = engine.open_position(&intent(Some(0))).unwrap();
    assert_eq!(sub.request.type_filling, Some(consts::ORDER_FILLING_FOK));
}

#[test]
fn one_based_numbering_subtracts_one() {
    let (_paper, engine) = paper_engine_with(policy(CallerNumbering::OneBased));
    let sub = engine.open_position(&intent(Some(3))).unwrap();
    assert_eq!(sub.request.type_filling, Some(consts::ORDER_FILLING_RETURN));
}

#[test]
fn out_of_range_value_is_refused_before_sending() {
    let (paper, engine) = paper_engine_with(policy(CallerNumbering::OneBased));
    let err = engine.open_position(&intent(Some(0))).unwrap_err();
    assert!(matches!(err, GatewayError::InvalidRequest(_)));
    assert!(paper.sent_requests().is_empty());
}

#[test]
fn close_all_uses_default_regardless_of_numbering() {
    let (paper, engine) = paper_engine_with(policy(CallerNumbering::Broker));
    engine.open_position(&intent(Some(2))).unwrap();
    engine.close_all_positions().unwrap();

    let sent = paper.sent_requests();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].type_filling, Some(consts::ORDER_FILLING_RETURN));
    assert_eq!(sent[1].type_filling, Some(consts::ORDER_FILLING_IOC));
}
