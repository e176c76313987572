use std::time::Duration;

use anyhow::Result;
use mtg_broker_paper::{default_symbols, PaperTerminal};
use mtg_config::{load_layered_yaml_from_strings, GatewayConfig};
use mtg_execution::{OrderEngine, OrderPolicy, QuoteRetry};

/// Default order policy with the quote poll interval set to zero.
pub fn zero_delay_policy() -> OrderPolicy {
    OrderPolicy {
        quote_retry: QuoteRetry {
            attempts: 5,
            interval: Duration::ZERO,
        },
        ..OrderPolicy::default()
    }
}

/// Demo paper terminal and an engine over a shared handle to it.
pub fn paper_engine() -> (PaperTerminal, OrderEngine<PaperTerminal>) {
    paper_engine_with(zero_delay_policy())
}

pub fn paper_engine_with(policy: OrderPolicy) -> (PaperTerminal, OrderEngine<PaperTerminal>) {
    let paper = PaperTerminal::demo();
    let engine = OrderEngine::new(paper.clone(), policy);
    (paper, engine)
}

/// Engine configured from YAML layers the way the daemon builds it (paper
/// transport only), with quote polling forced to zero delay.
pub fn engine_from_yaml(layers: &[&str]) -> Result<(PaperTerminal, OrderEngine<PaperTerminal>)> {
    let loaded = load_layered_yaml_from_strings(layers)?;
    let cfg = GatewayConfig::from_json(&loaded.config_json)?;

    let paper = if cfg.terminal.paper.symbols.is_empty() {
        PaperTerminal::with_symbols(cfg.terminal.paper.balance, default_symbols())
    } else {
        PaperTerminal::with_symbols(
            cfg.terminal.paper.balance,
            cfg.terminal.paper.symbols.iter().cloned(),
        )
    };

    let mut policy = cfg.order_policy();
    policy.quote_retry.interval = Duration::ZERO;
    Ok((paper.clone(), OrderEngine::new(paper, policy)))
}
