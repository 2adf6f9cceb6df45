//! Wiring for the x402 payment client and notary verifier.
//!
//! Turns an [`X402Config`] (usually from the environment) into a ready
//! [`PaidClient`]: a USDC signer for the configured network, an RPC-backed
//! chain reader for domain and balance checks, and a reqwest transport that
//! never follows redirects.
//!
//! # Quick Example
//!
//! ```no_run
//! use x402_client::{connect, X402Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = X402Config::from_env()?;
//! let client = connect(&config)?;
//!
//! let (resp, outcome) = client.get("https://gateway.example/api/v1/stamps/").await?;
//! if let Some(outcome) = outcome {
//!     println!("paid, tx: {:?}", outcome.transaction);
//! }
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use alloy::signers::local::PrivateKeySigner;
use serde_json::Value;

use x402::http_client::default_http_client;

// Re-export commonly needed types from core
pub use x402::notary::{
    verify_notary_json, verify_notary_signature, NotaryFailure, NotaryVerdict, SignedDocument,
};
pub use x402::{
    ConfigError, ExactSchemeClient, HttpRequest, HttpResponse, NetworkConfig, PaymentOutcome,
    PaymentPolicy, RpcChainReader, X402Client, X402Config, X402Error,
};

/// Client type produced by [`connect`].
pub type PaidClient = X402Client<ExactSchemeClient<PrivateKeySigner, RpcChainReader>>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    X402(#[from] X402Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// Build a client for `config`. With payments disabled the client still sends
/// requests but turns every 402 into [`X402Error::PaymentRequired`].
pub fn connect(config: &X402Config) -> Result<PaidClient, ClientError> {
    let http = default_http_client()?;
    if !config.enabled {
        return Ok(X402Client::disabled(http));
    }

    let signer = config.signer()?;
    let chain = RpcChainReader::connect(&config.network.rpc_url)?;
    tracing::info!(
        network = %config.network.network,
        payer = %signer.address(),
        auto_pay = config.policy.auto_pay,
        "x402 payments enabled"
    );

    let scheme = ExactSchemeClient::new(signer, chain, config.network.clone());
    Ok(X402Client::with_transport(
        scheme,
        config.policy.clone(),
        http,
    ))
}

/// Read a signed document from disk.
pub fn load_document(path: impl AsRef<Path>) -> Result<Value, ClientError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ClientError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ClientError::Json {
        path: display,
        source,
    })
}

/// Load a document and check its notary signature.
pub fn verify_document_file(
    path: impl AsRef<Path>,
    expected_signer: &str,
) -> Result<NotaryVerdict, ClientError> {
    let document = load_document(path)?;
    Ok(verify_notary_json(&document, expected_signer))
}
