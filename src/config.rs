// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Construction-time configuration.
//!
//! There is no process-wide setting: a [`Config`] is handed to a
//! [`Publisher`](crate::publisher::Publisher), and every list created
//! against that publisher builds its assembler from it.

/// How the assembler stores a transaction's changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Start every transaction on the linear fast path and move to the
    /// order-statistics tree the first time a change lands out of order.
    #[default]
    Adaptive,
    /// Record every transaction in the order-statistics tree.
    OrderStatisticsTree,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub strategy: Strategy,
    /// Maximum number of back-to-back publication passes started by
    /// listeners that write to subjects already fired in the current pass.
    pub max_passes: usize,
}

impl Config {
    pub const DEFAULT_MAX_PASSES: usize = 64;

    pub fn new() -> Config {
        return Config {
            strategy: Strategy::Adaptive,
            max_passes: Config::DEFAULT_MAX_PASSES,
        };
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Config {
        self.strategy = strategy;
        return self;
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Config {
        self.max_passes = max_passes.max(1);
        return self;
    }
}

impl Default for Config {
    fn default() -> Self {
        return Config::new();
    }
}
