use alloy::primitives::{B256, U256};
use thiserror::Error;

/// Errors returned by x402 payment operations.
///
/// Every variant except [`X402Error::HttpError`] and [`X402Error::ChainError`] is
/// fatal for the current request: callers should not retry without an explicit
/// decision, least of all after [`X402Error::SettlementFailed`], where a blind
/// retry can pay twice.
#[derive(Debug, Error)]
pub enum X402Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no payment option for network '{expected}' (offered: {})", .offered.join(", "))]
    NetworkMismatch {
        expected: String,
        offered: Vec<String>,
    },

    /// The server wants payment and this client will not pay without further input.
    /// `options` carries the raw offered terms so the caller can show them.
    #[error("{message}")]
    PaymentRequired {
        message: String,
        options: Vec<serde_json::Value>,
    },

    #[error("invalid payment requirements: {0}")]
    InvalidRequirements(String),

    #[error("payment of {amount} declined: {description}")]
    PaymentDeclined { amount: String, description: String },

    #[error("insufficient token balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("payment rejected: {0}")]
    PaymentRejected(String),

    /// The paid request was answered, but the server reports the on-chain
    /// transfer did not execute.
    #[error("payment settlement failed: {}", .reason.as_deref().unwrap_or("unknown error"))]
    SettlementFailed {
        reason: Option<String>,
        payer: Option<String>,
        transaction: Option<String>,
    },

    #[error("chain error: {0}")]
    ChainError(String),

    #[error("http error: {0}")]
    HttpError(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Configuration problems. Never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingRequired(&'static str),

    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("unsupported network '{network}' (supported: {supported})")]
    UnsupportedNetwork { network: String, supported: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error(
        "EIP-712 domain mismatch on {network}: name='{name}', version='{version}' gives \
         separator {computed}, but the contract reports {on_chain}; signatures would fail on-chain"
    )]
    DomainMismatch {
        network: String,
        name: String,
        version: String,
        computed: B256,
        on_chain: B256,
    },
}
