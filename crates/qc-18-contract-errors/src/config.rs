//! Service configuration.

use serde::{Deserialize, Serialize};
use std::env;

/// Name used as `module_name` on fallback records.
pub const MODULE_NAME: &str = "cwerrors";

/// Gas ceiling for a single error callback.
pub const DEFAULT_CALLBACK_GAS_LIMIT: u64 = 150_000;

/// Governance module account.
pub const DEFAULT_AUTHORITY: &str = "0x0000000000000000000000000000000000000001";

/// Module account receiving subscription fees.
pub const DEFAULT_FEE_COLLECTOR: &str = "fee_collector";

/// Contract Errors service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Only address allowed to update params.
    pub authority: String,
    /// Gas ceiling for each error callback.
    pub callback_gas_limit: u64,
    /// Module account receiving subscription fees.
    pub fee_collector: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_string(),
            callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
            fee_collector: DEFAULT_FEE_COLLECTOR.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Create configuration from `QC18_*` environment variables, falling
    /// back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            authority: lookup("QC18_AUTHORITY").unwrap_or(defaults.authority),

            callback_gas_limit: lookup("QC18_CALLBACK_GAS_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.callback_gas_limit),

            fee_collector: lookup("QC18_FEE_COLLECTOR").unwrap_or(defaults.fee_collector),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Address;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.callback_gas_limit, 150_000);
        assert_eq!(config.fee_collector, "fee_collector");
        assert!(config.authority.parse::<Address>().is_ok());
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = ServiceConfig {
            authority: Address::new([0xAB; 20]).to_string(),
            ..ServiceConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: ServiceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_config_from_variables() {
        let vars: HashMap<&str, &str> = [
            ("QC18_AUTHORITY", "0x00000000000000000000000000000000000000aa"),
            ("QC18_CALLBACK_GAS_LIMIT", "200000"),
            ("QC18_FEE_COLLECTOR", "treasury"),
        ]
        .into_iter()
        .collect();
        let config = ServiceConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.authority, "0x00000000000000000000000000000000000000aa");
        assert_eq!(config.callback_gas_limit, 200_000);
        assert_eq!(config.fee_collector, "treasury");

        // Unparsable gas limit falls back; unset keys keep defaults
        let config = ServiceConfig::from_lookup(|key| {
            (key == "QC18_CALLBACK_GAS_LIMIT").then(|| "lots".to_string())
        });
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_config_from_env_without_variables() {
        // Nothing in the test environment sets QC18_* variables
        if std::env::vars().all(|(key, _)| !key.starts_with("QC18_")) {
            assert_eq!(ServiceConfig::from_env(), ServiceConfig::default());
        }
    }
}
