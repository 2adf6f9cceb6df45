use std::env;

use alloy::signers::local::PrivateKeySigner;
use url::Url;

use crate::error::ConfigError;
use crate::http_client::PaymentPolicy;
use crate::price::parse_usd_amount;
use crate::{NetworkConfig, BASE_SEPOLIA_NETWORK, DEFAULT_TIMEOUT_SECONDS};

const DEFAULT_MAX_AUTO_PAY_USD: &str = "1.00";

/// Payment settings, built once from the environment and passed by value.
#[derive(Clone)]
pub struct X402Config {
    /// Handle 402 responses by paying (false = surface them as errors)
    pub enabled: bool,
    /// Payer key, hex with optional 0x prefix
    pub private_key: Option<String>,
    pub network: NetworkConfig,
    pub policy: PaymentPolicy,
}

impl std::fmt::Debug for X402Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X402Config")
            .field("enabled", &self.enabled)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("network", &self.network)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Default for X402Config {
    fn default() -> Self {
        Self {
            enabled: false,
            private_key: None,
            network: NetworkConfig::default(),
            policy: PaymentPolicy::default(),
        }
    }
}

impl X402Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build from a variable lookup. Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let enabled = var("X402_ENABLED").map(|v| is_truthy(&v)).unwrap_or(false);

        let private_key = var("X402_PRIVATE_KEY").or_else(|| var("SWARM_X402_PRIVATE_KEY"));

        let network_name = var("X402_NETWORK").unwrap_or_else(|| BASE_SEPOLIA_NETWORK.to_string());
        let mut network = NetworkConfig::for_network(network_name.trim())?;

        if let Some(rpc_url) = var("X402_RPC_URL") {
            Url::parse(&rpc_url).map_err(|_| ConfigError::InvalidUrl(rpc_url.clone()))?;
            network = network.with_rpc_url(rpc_url);
        }

        let auto_pay = var("X402_AUTO_PAY").map(|v| is_truthy(&v)).unwrap_or(false);

        let max_auto_pay_usd =
            var("X402_MAX_AUTO_PAY_USD").unwrap_or_else(|| DEFAULT_MAX_AUTO_PAY_USD.to_string());
        let max_auto_pay = parse_usd_amount(&max_auto_pay_usd, network.token_decimals)?;

        let check_balance = var("X402_CHECK_BALANCE")
            .map(|v| is_truthy(&v))
            .unwrap_or(true);

        let timeout_seconds = var("X402_TIMEOUT_SECONDS")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

        if enabled && private_key.is_none() {
            return Err(ConfigError::MissingRequired("X402_PRIVATE_KEY"));
        }

        Ok(Self {
            enabled,
            private_key,
            network,
            policy: PaymentPolicy {
                auto_pay,
                max_auto_pay,
                check_balance,
                timeout_seconds,
            },
        })
    }

    /// Parse the configured payer key.
    pub fn signer(&self) -> Result<PrivateKeySigner, ConfigError> {
        let key = self
            .private_key
            .as_deref()
            .ok_or(ConfigError::MissingRequired("X402_PRIVATE_KEY"))?;
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        key.parse::<PrivateKeySigner>()
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<X402Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        X402Config::from_vars(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert!(!cfg.enabled);
        assert!(cfg.private_key.is_none());
        assert_eq!(cfg.network, NetworkConfig::base_sepolia());
        assert!(!cfg.policy.auto_pay);
        assert_eq!(cfg.policy.max_auto_pay, U256::from(1_000_000u64));
        assert!(cfg.policy.check_balance);
        assert_eq!(cfg.policy.timeout_seconds, 300);
    }

    #[test]
    fn test_full_environment() {
        let signer = PrivateKeySigner::random();
        let key = alloy::hex::encode(signer.to_bytes());
        let cfg = config(&[
            ("X402_ENABLED", "true"),
            ("SWARM_X402_PRIVATE_KEY", &key),
            ("X402_NETWORK", "base"),
            ("X402_RPC_URL", "http://localhost:8545"),
            ("X402_AUTO_PAY", "1"),
            ("X402_MAX_AUTO_PAY_USD", "$0.05"),
            ("X402_CHECK_BALANCE", "false"),
            ("X402_TIMEOUT_SECONDS", "120"),
        ])
        .unwrap();

        assert!(cfg.enabled);
        assert_eq!(cfg.network.chain_id, 8453);
        assert_eq!(cfg.network.rpc_url, "http://localhost:8545");
        assert!(cfg.policy.auto_pay);
        assert_eq!(cfg.policy.max_auto_pay, U256::from(50_000u64));
        assert!(!cfg.policy.check_balance);
        assert_eq!(cfg.policy.timeout_seconds, 120);
        assert_eq!(cfg.signer().unwrap().address(), signer.address());
    }

    #[test]
    fn test_enabled_without_key_is_an_error() {
        assert!(matches!(
            config(&[("X402_ENABLED", "true")]),
            Err(ConfigError::MissingRequired("X402_PRIVATE_KEY"))
        ));
        assert!(matches!(
            config(&[("X402_ENABLED", "true"), ("X402_PRIVATE_KEY", "  ")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config(&[("X402_NETWORK", "ethereum")]),
            Err(ConfigError::UnsupportedNetwork { .. })
        ));
        assert!(matches!(
            config(&[("X402_RPC_URL", "not a url")]),
            Err(ConfigError::InvalidUrl(_))
        ));
        assert!(matches!(
            config(&[("X402_MAX_AUTO_PAY_USD", "lots")]),
            Err(ConfigError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_unparseable_timeout_falls_back() {
        let cfg = config(&[("X402_TIMEOUT_SECONDS", "soon")]).unwrap();
        assert_eq!(cfg.policy.timeout_seconds, DEFAULT_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_bad_key_and_redacted_debug() {
        let cfg = X402Config {
            private_key: Some("0x1234".to_string()),
            ..X402Config::default()
        };
        assert!(matches!(
            cfg.signer(),
            Err(ConfigError::InvalidPrivateKey(_))
        ));

        let debug = format!("{cfg:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("1234"));
    }
}
