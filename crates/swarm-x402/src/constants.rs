use alloy::primitives::{address, Address};

use crate::error::ConfigError;

/// x402 protocol version written into payment payloads when the server does not state one.
pub const X402_VERSION: u32 = 1;

/// Scheme name for EIP-3009 `transferWithAuthorization` payments.
pub const SCHEME_EXACT: &str = "exact";

/// Request header carrying the base64-encoded signed payment payload.
pub const PAYMENT_HEADER: &str = "x-payment";

/// Response header carrying the base64-encoded settlement outcome.
pub const PAYMENT_RESPONSE_HEADER: &str = "x-payment-response";

/// Default authorization validity window.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

/// `validAfter` is backdated by this much to tolerate clock skew between payer and chain.
pub const CLOCK_SKEW_SECONDS: u64 = 60;

/// USDC has 6 decimal places on every supported network.
pub const USDC_DECIMALS: u32 = 6;

pub const BASE_SEPOLIA_NETWORK: &str = "base-sepolia";
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;
pub const BASE_SEPOLIA_USDC: Address = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");
pub const BASE_SEPOLIA_RPC_URL: &str = "https://sepolia.base.org";

pub const BASE_NETWORK: &str = "base";
pub const BASE_CHAIN_ID: u64 = 8453;
pub const BASE_USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const BASE_RPC_URL: &str = "https://mainnet.base.org";

/// Networks with a built-in [`NetworkConfig`].
pub const SUPPORTED_NETWORKS: &[&str] = &[BASE_SEPOLIA_NETWORK, BASE_NETWORK];

/// Per-network payment configuration, including the EIP-712 domain the
/// token contract enforces for `transferWithAuthorization`.
///
/// The domain name and version must match the deployed contract exactly;
/// [`crate::domain::DomainVerifier`] checks this against the chain before
/// the first signature is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub network: String,
    pub chain_id: u64,
    pub token: Address,
    pub token_decimals: u32,
    pub rpc_url: String,
    pub eip712_domain_name: String,
    pub eip712_domain_version: String,
}

impl NetworkConfig {
    /// USDC on Base Sepolia.
    pub fn base_sepolia() -> Self {
        Self {
            network: BASE_SEPOLIA_NETWORK.to_string(),
            chain_id: BASE_SEPOLIA_CHAIN_ID,
            token: BASE_SEPOLIA_USDC,
            token_decimals: USDC_DECIMALS,
            rpc_url: BASE_SEPOLIA_RPC_URL.to_string(),
            eip712_domain_name: "USDC".to_string(),
            eip712_domain_version: "2".to_string(),
        }
    }

    /// USDC on Base mainnet.
    pub fn base() -> Self {
        Self {
            network: BASE_NETWORK.to_string(),
            chain_id: BASE_CHAIN_ID,
            token: BASE_USDC,
            token_decimals: USDC_DECIMALS,
            rpc_url: BASE_RPC_URL.to_string(),
            eip712_domain_name: "USDC".to_string(),
            eip712_domain_version: "2".to_string(),
        }
    }

    /// Look up the built-in configuration for a network identifier.
    pub fn for_network(network: &str) -> Result<Self, ConfigError> {
        match network {
            BASE_SEPOLIA_NETWORK => Ok(Self::base_sepolia()),
            BASE_NETWORK => Ok(Self::base()),
            other => Err(ConfigError::UnsupportedNetwork {
                network: other.to_string(),
                supported: SUPPORTED_NETWORKS.join(", "),
            }),
        }
    }

    /// Override the RPC endpoint.
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }
}

impl Default for NetworkConfig {
    /// Defaults to Base Sepolia.
    fn default() -> Self {
        Self::base_sepolia()
    }
}
