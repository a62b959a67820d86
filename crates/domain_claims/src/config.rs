//! Workflow configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use core_kernel::CoreError;

use crate::complexity::ComplexityConfig;
use crate::escalation::EscalationConfig;

const ENV_PREFIX: &str = "CLAIMS_WORKFLOW";

const LIST_KEYS: [&str; 3] = [
    "complexity.complex_keywords",
    "escalation.keywords",
    "escalation.severe_damage_labels",
];

/// Time limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on a single reasoning call
    pub analysis_call_ms: u64,
    /// Bound on a whole run, intake to terminal stage
    pub run_deadline_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            analysis_call_ms: 60_000,
            run_deadline_ms: 300_000,
        }
    }
}

impl TimeoutConfig {
    pub fn analysis_call(&self) -> Duration {
        Duration::from_millis(self.analysis_call_ms)
    }

    pub fn run_deadline(&self) -> Duration {
        Duration::from_millis(self.run_deadline_ms)
    }
}

/// Workflow configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub complexity: ComplexityConfig,
    pub escalation: EscalationConfig,
    pub timeouts: TimeoutConfig,
    /// Consult the reasoning capability for complexity and reconcile
    pub enhanced_complexity: bool,
}

impl WorkflowConfig {
    /// Loads configuration from `.env` and the process environment
    ///
    /// Variables use the `CLAIMS_WORKFLOW` prefix and `__` between levels,
    /// e.g. `CLAIMS_WORKFLOW__ESCALATION__CONFIDENCE_THRESHOLD=0.8`. List
    /// values are comma separated.
    pub fn from_env() -> Result<Self, CoreError> {
        dotenvy::dotenv().ok();
        Self::load(None)
    }

    /// Loads configuration from an explicit variable map instead of the
    /// process environment
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, CoreError> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<HashMap<String, String>>) -> Result<Self, CoreError> {
        let mut environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",");
        for key in LIST_KEYS {
            environment = environment.with_list_parse_key(key);
        }
        if vars.is_some() {
            environment = environment.source(vars);
        }

        let config: Self = config::Config::builder()
            .add_source(environment)
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| CoreError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges
    pub fn validate(&self) -> Result<(), CoreError> {
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(CoreError::configuration(format!(
                    "{name} must be between 0 and 1, got {value}"
                )))
            }
        };
        unit("escalation.confidence_threshold", self.escalation.confidence_threshold)?;
        unit(
            "escalation.image_relevance_threshold",
            self.escalation.image_relevance_threshold,
        )?;

        if self.timeouts.analysis_call_ms == 0 || self.timeouts.run_deadline_ms == 0 {
            return Err(CoreError::configuration("timeouts must be positive"));
        }
        if self.complexity.medium_score > self.complexity.high_score {
            return Err(CoreError::configuration(
                "complexity.medium_score must not exceed complexity.high_score",
            ));
        }
        Ok(())
    }
}
