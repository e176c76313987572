use serde::{Deserialize, Serialize};

/// Static description of a tradable paper symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaperSymbol {
    pub name: String,
    pub bid: f64,
    pub ask: f64,
    #[serde(default = "default_digits")]
    pub digits: u32,
    #[serde(default = "default_volume_min")]
    pub volume_min: f64,
    #[serde(default = "default_volume_max")]
    pub volume_max: f64,
    #[serde(default = "default_volume_min")]
    pub volume_step: f64,
    #[serde(default = "default_contract_size")]
    pub contract_size: f64,
    /// Number of `symbol_info` reads that report a zero quote after each
    /// subscribe, imitating a terminal that has not streamed the symbol yet.
    #[serde(default)]
    pub warmup_reads: u32,
    #[serde(default)]
    pub description: String,
}

fn default_digits() -> u32 {
    5
}

fn default_volume_min() -> f64 {
    0.01
}

fn default_volume_max() -> f64 {
    100.0
}

fn default_contract_size() -> f64 {
    100_000.0
}

impl PaperSymbol {
    pub fn new(name: impl Into<String>, bid: f64, ask: f64) -> Self {
        Self {
            name: name.into(),
            bid,
            ask,
            digits: default_digits(),
            volume_min: default_volume_min(),
            volume_max: default_volume_max(),
            volume_step: default_volume_min(),
            contract_size: default_contract_size(),
            warmup_reads: 0,
            description: String::new(),
        }
    }

    pub fn with_digits(mut self, digits: u32) -> Self {
        self.digits = digits;
        self
    }

    pub fn with_contract_size(mut self, contract_size: f64) -> Self {
        self.contract_size = contract_size;
        self
    }

    pub fn with_warmup_reads(mut self, reads: u32) -> Self {
        self.warmup_reads = reads;
        self
    }

    /// Smallest price increment.
    pub fn point(&self) -> f64 {
        10f64.powi(-(self.digits as i32))
    }

    /// Within `[volume_min, volume_max]` and on a `volume_step` boundary.
    pub fn accepts_volume(&self, volume: f64) -> bool {
        const EPS: f64 = 1e-9;
        if !volume.is_finite() || volume < self.volume_min - EPS || volume > self.volume_max + EPS {
            return false;
        }
        if self.volume_step <= 0.0 {
            return true;
        }
        let steps = volume / self.volume_step;
        (steps - steps.round()).abs() < 1e-6
    }
}

/// Symbols a fresh paper terminal offers when none are configured.
pub fn default_symbols() -> Vec<PaperSymbol> {
    vec![
        PaperSymbol::new("EURUSD", 1.0998, 1.1000),
        PaperSymbol::new("GBPUSD", 1.2650, 1.2652),
        PaperSymbol::new("USDJPY", 150.10, 150.12).with_digits(3),
        PaperSymbol::new("XAUUSD", 2400.00, 2400.50)
            .with_digits(2)
            .with_contract_size(100.0),
    ]
}
