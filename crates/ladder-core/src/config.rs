//! Engine configuration, resolved once at startup and injected into the
//! store.

use serde::{Deserialize, Serialize};

use crate::{priority::PriorityConfig, rating::RatingPolicy, select::SelectionWeights};

/// Every tunable the engine reads. All fields have defaults, so an empty
/// TOML table is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub rating:          RatingPolicy,
  pub selection:       SelectionWeights,
  pub priority:        PriorityConfig,
  /// How long a writer waits on a locked database before failing.
  pub busy_timeout_ms: u64,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      rating:          RatingPolicy::default(),
      selection:       SelectionWeights::default(),
      priority:        PriorityConfig::default(),
      busy_timeout_ms: 5_000,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_config_fills_defaults() {
    let config: EngineConfig = serde_json::from_value(serde_json::json!({
      "rating": { "max_change": 40.0 },
      "selection": { "jitter": 0.0, "category_weights": { "algebra": 1.5 } },
    }))
    .unwrap();

    assert_eq!(config.rating.max_change, Some(40.0));
    assert_eq!(config.rating.default_rating, crate::rating::DEFAULT_RATING);
    assert_eq!(config.selection.jitter, 0.0);
    assert_eq!(config.selection.tolerance, 200.0);
    assert_eq!(config.priority, PriorityConfig::default());
    assert_eq!(config.busy_timeout_ms, 5_000);
  }
}
