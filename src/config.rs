//! Cycler configuration.
//!
//! Defaults mirror a typical streaming stress run: a universe of 200
//! textures, 20–50 admitted per cycle, 100 display slots, and a full
//! evict/admit cycle every 60 ticks (about once a second at 60 fps).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fixed-at-construction parameters of a [`ResourceCycler`](crate::ResourceCycler).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CyclerConfig {
    /// Number of distinct keys; keys are drawn from `[0, universe_size)`.
    pub universe_size: u32,
    /// Inclusive `(low, high)` bounds on how many loads to issue per cycle.
    pub admission_range: (usize, usize),
    /// Number of display slots the resident set is projected onto.
    pub display_slot_count: usize,
    /// Ticks between evict/admit cycles. Projection runs every tick regardless.
    pub cycle_interval: u64,
    /// Seed for the default random source. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for CyclerConfig {
    fn default() -> Self {
        Self {
            universe_size: 200,
            admission_range: (20, 50),
            display_slot_count: 100,
            cycle_interval: 60,
            seed: None,
        }
    }
}

impl CyclerConfig {
    /// Reject values that would make a cycle impossible to run.
    ///
    /// A zero `display_slot_count` is allowed: the pool still churns, it just
    /// never publishes anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.universe_size == 0 {
            return Err(ConfigError::EmptyUniverse);
        }
        let (low, high) = self.admission_range;
        if low > high {
            return Err(ConfigError::InvertedAdmissionRange { low, high });
        }
        if self.cycle_interval == 0 {
            return Err(ConfigError::ZeroCycleInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert_eq!(CyclerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_empty_universe() {
        let config = CyclerConfig {
            universe_size: 0,
            ..CyclerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyUniverse));
    }

    #[test]
    fn rejects_inverted_range() {
        let config = CyclerConfig {
            admission_range: (5, 2),
            ..CyclerConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedAdmissionRange { low: 5, high: 2 })
        );
    }

    #[test]
    fn rejects_zero_interval() {
        let config = CyclerConfig {
            cycle_interval: 0,
            ..CyclerConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCycleInterval));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: CyclerConfig =
            serde_json::from_str(r#"{ "universe_size": 5, "admission_range": [2, 2] }"#)
                .unwrap();
        assert_eq!(config.universe_size, 5);
        assert_eq!(config.admission_range, (2, 2));
        assert_eq!(config.cycle_interval, 60);
        assert_eq!(config.seed, None);
    }
}
