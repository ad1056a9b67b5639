//! Configuration types for the roadmap scheduler.

use pyo3::prelude::*;
use std::fmt;
use std::str::FromStr;

use crate::SchedulerError;

/// Duration used when history is too thin to estimate from.
pub const DEFAULT_FALLBACK_DAYS: u32 = 2;

/// Runtime knobs for one scheduling run.
#[pyclass]
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Days assumed for an item when no estimator tier has enough samples
    #[pyo3(get, set)]
    pub fallback_days: u32,
    /// Logging verbosity (0=silent, 1=changes, 2=checks, 3=debug)
    #[pyo3(get, set)]
    pub verbosity: u8,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fallback_days: DEFAULT_FALLBACK_DAYS,
            verbosity: 0,
        }
    }
}

#[pymethods]
impl SchedulerConfig {
    #[new]
    #[pyo3(signature = (fallback_days=None, verbosity=None))]
    fn new(fallback_days: Option<u32>, verbosity: Option<u8>) -> Self {
        let defaults = Self::default();
        Self {
            fallback_days: fallback_days.unwrap_or(defaults.fallback_days).max(1),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "SchedulerConfig(fallback_days={}, verbosity={})",
            self.fallback_days, self.verbosity
        )
    }
}

/// How a target item is placed into the backlog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlacementStrategy {
    /// Full recompute by priority score.
    #[default]
    Auto,
    /// Put the target at the end.
    Append,
    /// Put the target right after the last item of its scope.
    ScopeBlock,
}

impl FromStr for PlacementStrategy {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(Self::Auto),
            "append" => Ok(Self::Append),
            "scope-block" | "scope_block" => Ok(Self::ScopeBlock),
            other => Err(SchedulerError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for PlacementStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Append => "append",
            Self::ScopeBlock => "scope-block",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.fallback_days, 2);
        assert_eq!(config.verbosity, 0);
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("auto".parse::<PlacementStrategy>().unwrap(), PlacementStrategy::Auto);
        assert_eq!(
            "append".parse::<PlacementStrategy>().unwrap(),
            PlacementStrategy::Append
        );
        assert_eq!(
            "scope-block".parse::<PlacementStrategy>().unwrap(),
            PlacementStrategy::ScopeBlock
        );
        assert_eq!(
            "scope_block".parse::<PlacementStrategy>().unwrap(),
            PlacementStrategy::ScopeBlock
        );
    }

    #[test]
    fn test_unknown_strategy_error() {
        let result = "priority".parse::<PlacementStrategy>();
        assert!(matches!(result, Err(SchedulerError::UnknownStrategy(s)) if s == "priority"));
    }

    #[test]
    fn test_strategy_display_roundtrip() {
        for strategy in [
            PlacementStrategy::Auto,
            PlacementStrategy::Append,
            PlacementStrategy::ScopeBlock,
        ] {
            assert_eq!(strategy.to_string().parse::<PlacementStrategy>().unwrap(), strategy);
        }
    }
}
