//! Scenario: concurrent requests share one terminal session.
//!
//! # Invariant under test
//! The engine never runs two terminal calls at once, however many threads
//! drive it, and every concurrent open still lands in the registry.

use std::thread;
use std::time::Duration;

use mtg_broker_paper::PaperTerminal;
use mtg_execution::{OrderEngine, OrderIntent, Side};
use mtg_testkit::{zero_delay_policy, CountingTerminal};

#[test]
fn concurrent_opens_never_overlap_on_the_terminal() {
    let paper = PaperTerminal::demo();
    let (terminal, log) = CountingTerminal::new(paper.clone());
    let engine = OrderEngine::new(terminal.with_delay(Duration::from_millis(1)), zero_delay_policy());

    thread::scope(|s| {
        for i in 0..8 {
            let engine = &engine;
            s.spawn(move || {
                let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                engine
                    .open_position(
                        &OrderIntent::market("EURUSD", side, 0.1).with_trade_id(format!("T{i}")),
                    )
                    .unwrap();
            });
        }
    });

    assert_eq!(log.max_in_flight(), 1);
    assert_eq!(log.count("order_send"), 8);
    assert_eq!(paper.open_positions().len(), 8);
    assert_eq!(engine.trade_ids().len(), 8);
}

#[test]
fn symbol_polling_and_trading_interleave_without_overlap() {
    let paper = PaperTerminal::demo();
    let (terminal, log) = CountingTerminal::new(paper);
    let engine = OrderEngine::new(terminal.with_delay(Duration::from_millis(1)), zero_delay_policy());

    thread::scope(|s| {
        let e = &engine;
        s.spawn(move || {
            for _ in 0..4 {
                e.symbol_quote("XAUUSD").unwrap();
            }
        });
        s.spawn(move || {
            for _ in 0..4 {
                e.open_position(&OrderIntent::market("GBPUSD", Side::Buy, 0.1))
                    .unwrap();
            }
        });
    });

    assert_eq!(log.max_in_flight(), 1);
    assert_eq!(log.count("order_send"), 4);
}
