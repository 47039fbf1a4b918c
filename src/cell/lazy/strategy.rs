//! Initialization strategies for [`LazySingleton`](super::LazySingleton).

use core::fmt;
use core::str::FromStr;
use std::error::Error;

use serde::{Deserialize, Serialize};

/// How a [`LazySingleton`](super::LazySingleton) constructs and publishes its value.
///
/// Fixed at construction. Deserializes from `"eager"`, `"double_checked"` and
/// `"once_guard"`, so a host can pick the strategy from its configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Value built when the cell is created; reads never synchronize beyond
    /// an acquire load.
    Eager,
    /// Lock-free check, then a re-check under the gate before initializing.
    /// Readers only pay for the gate while the value is missing.
    DoubleChecked,
    /// Every access goes through the gate. Simplest, never the fastest.
    OnceGuard,
}

impl Strategy {
    /// Every strategy, in declaration order.
    pub const ALL: [Strategy; 3] = [Strategy::Eager, Strategy::DoubleChecked, Strategy::OnceGuard];

    /// The configuration spelling of this strategy.
    pub const fn as_str(self) -> &'static str {
        match self {
            Strategy::Eager => "eager",
            Strategy::DoubleChecked => "double_checked",
            Strategy::OnceGuard => "once_guard",
        }
    }

    /// Returns `true` if the value is built on first demand rather than at
    /// construction.
    pub const fn is_lazy(self) -> bool {
        !matches!(self, Strategy::Eager)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known [`Strategy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStrategyError {
    input: String,
}

impl fmt::Display for ParseStrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown singleton strategy `{}` (expected eager, double_checked or once_guard)",
            self.input
        )
    }
}

impl Error for ParseStrategyError {}

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| ParseStrategyError { input: s.to_owned() })
    }
}
