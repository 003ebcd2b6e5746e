//! Configuration management for the swap coordinator
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::timelock::DEFAULT_FAR_FUTURE_HORIZON_SECS;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub storage: StorageConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    pub chains: HashMap<String, ChainConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the append-only record store.
    pub record_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// How long a submission may wait for confirmation before the operation
    /// fails with a timeout.
    #[serde(default = "default_submission_timeout_secs")]
    pub submission_timeout_secs: u64,
    /// Horizon past which an initiator timelock is flagged as suspicious.
    #[serde(default = "default_far_future_horizon_secs")]
    pub far_future_horizon_secs: u64,
    /// Turn the far-future advisory into a hard rejection.
    #[serde(default)]
    pub reject_far_future: bool,
}

/// Per-chain configuration, keyed by chain family.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum ChainConfig {
    Evm {
        contract_address: String,
        owner_address: String,
        #[serde(default = "default_evm_gas_limit")]
        gas_limit: u64,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
    Sui {
        package_id: String,
        owner_address: String,
        #[serde(default = "default_sui_module")]
        module: String,
        #[serde(default = "default_sui_gas_budget")]
        gas_budget: u64,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
}

impl ChainConfig {
    pub fn enabled(&self) -> bool {
        match self {
            ChainConfig::Evm { enabled, .. } | ChainConfig::Sui { enabled, .. } => *enabled,
        }
    }
}

impl Settings {
    /// Load settings from configuration files
    pub fn load() -> Result<Self> {
        let config_path = env::var("HTLC_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        // Substitute environment variables
        let config_str = substitute_env_vars(&config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Load settings for a specific environment
    pub fn load_env(env_name: &str) -> Result<Self> {
        let config_path = PathBuf::from(format!("config/{}.toml", env_name));
        env::set_var("HTLC_CONFIG", config_path.to_str().unwrap());
        Self::load()
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.enabled_chains().is_empty() {
            anyhow::bail!("At least one chain must be enabled");
        }

        for (name, chain) in &self.chains {
            match chain {
                ChainConfig::Evm {
                    contract_address,
                    owner_address,
                    enabled,
                    ..
                } => {
                    if *enabled && (contract_address.is_empty() || owner_address.is_empty()) {
                        anyhow::bail!("Chain {} is missing contract or owner address", name);
                    }
                }
                ChainConfig::Sui {
                    package_id,
                    owner_address,
                    enabled,
                    ..
                } => {
                    if *enabled && (package_id.is_empty() || owner_address.is_empty()) {
                        anyhow::bail!("Chain {} is missing package id or owner address", name);
                    }
                }
            }
        }

        if self.policy.submission_timeout_secs == 0 {
            anyhow::bail!("submission_timeout_secs must be greater than zero");
        }

        Ok(())
    }

    /// Get list of enabled chains
    pub fn enabled_chains(&self) -> Vec<(&String, &ChainConfig)> {
        self.chains.iter().filter(|(_, c)| c.enabled()).collect()
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            submission_timeout_secs: default_submission_timeout_secs(),
            far_future_horizon_secs: default_far_future_horizon_secs(),
            reject_far_future: false,
        }
    }
}

fn default_submission_timeout_secs() -> u64 {
    120
}

fn default_far_future_horizon_secs() -> u64 {
    DEFAULT_FAR_FUTURE_HORIZON_SECS
}

fn default_evm_gas_limit() -> u64 {
    500_000
}

fn default_sui_module() -> String {
    "swap".to_string()
}

fn default_sui_gas_budget() -> u64 {
    10_000_000
}

fn default_enabled() -> bool {
    true
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("TEST_VAR", "test_value");
        let input = "record_dir = \"/var/lib/swaps/${TEST_VAR}\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "record_dir = \"/var/lib/swaps/test_value\"");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [storage]
            record_dir = "records"

            [policy]
            submission_timeout_secs = 60
            reject_far_future = true

            [chains.ethereum]
            family = "evm"
            contract_address = "0x00000000000000000000000000000000000000aa"
            owner_address = "0x00000000000000000000000000000000000000bb"

            [chains.sui]
            family = "sui"
            package_id = "0xabc123"
            owner_address = "0xdef456"
            gas_budget = 20000000
        "#;
        let settings: Settings = toml::from_str(toml).unwrap();
        settings.validate().unwrap();

        assert_eq!(settings.policy.submission_timeout_secs, 60);
        assert!(settings.policy.reject_far_future);
        assert_eq!(
            settings.policy.far_future_horizon_secs,
            DEFAULT_FAR_FUTURE_HORIZON_SECS
        );
        assert_eq!(settings.enabled_chains().len(), 2);

        match &settings.chains["ethereum"] {
            ChainConfig::Evm { gas_limit, .. } => assert_eq!(*gas_limit, 500_000),
            other => panic!("expected evm config, got {:?}", other),
        }
        match &settings.chains["sui"] {
            ChainConfig::Sui {
                module, gas_budget, ..
            } => {
                assert_eq!(module, "swap");
                assert_eq!(*gas_budget, 20_000_000);
            }
            other => panic!("expected sui config, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_chains_are_filtered() {
        let toml = r#"
            [storage]
            record_dir = "records"

            [chains.ethereum]
            family = "evm"
            contract_address = "0x00000000000000000000000000000000000000aa"
            owner_address = "0x00000000000000000000000000000000000000bb"

            [chains.sui]
            family = "sui"
            package_id = "0xabc123"
            owner_address = "0xdef456"
            enabled = false
        "#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.enabled_chains().len(), 1);
    }
}
