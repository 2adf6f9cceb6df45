//! x402 pay-per-request client and notary signature verification for the
//! Swarm provenance gateway.
//!
//! Two independent pieces live here:
//!
//! - **Payments**: [`X402Client`] issues a request and, on HTTP 402, selects a
//!   payment option, checks the token's EIP-712 domain against the chain
//!   ([`DomainVerifier`]), signs an EIP-3009 `transferWithAuthorization`
//!   ([`ExactSchemeClient`]), retries once with an `X-PAYMENT` header and
//!   refuses to report success when the server says settlement failed.
//! - **Notary**: [`notary::verify_notary_signature`] recomputes the canonical hash
//!   of a signed document and recovers the EIP-191 signer offline.
//!
//! # Quick example (client)
//!
//! ```no_run
//! use alloy::signers::local::PrivateKeySigner;
//! use x402::{ExactSchemeClient, NetworkConfig, PaymentPolicy, RpcChainReader, X402Client};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), x402::X402Error> {
//! let config = NetworkConfig::base_sepolia();
//! let signer: PrivateKeySigner = "0xYOUR_KEY".parse().unwrap();
//! let chain = RpcChainReader::connect(&config.rpc_url)?;
//! let scheme = ExactSchemeClient::new(signer, chain, config);
//! let client = X402Client::new(scheme, PaymentPolicy::auto_pay_up_to(10_000u64))?;
//!
//! let (resp, outcome) = client.get("https://gateway.example/api/v1/stamps/").await?;
//! # Ok(())
//! # }
//! ```

// Core types and traits
pub mod constants;
pub mod error;
pub mod payment;
pub mod price;
pub mod response;
pub mod scheme;

// Payment flow
pub mod domain;
pub mod eip712;
pub mod erc20;
pub mod scheme_client;
pub mod selector;

// HTTP
pub mod http_client;
pub mod transport;

// Notary documents
pub mod canonical;
pub mod notary;

pub mod config;

use alloy::sol;

// EIP-3009 typed struct. Field order and types are fixed by the standard;
// FiatToken contracts reject signatures over any other layout.
sol! {
    #[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
}

// Read-only subset of the FiatToken (USDC) contract used before paying.
sol! {
    #[sol(rpc)]
    interface IFiatToken {
        function DOMAIN_SEPARATOR() external view returns (bytes32);
        function balanceOf(address account) external view returns (uint256);
    }
}

// Re-exports
pub use config::X402Config;
pub use constants::NetworkConfig;
pub use constants::*;
pub use domain::DomainVerifier;
pub use erc20::RpcChainReader;
pub use error::{ConfigError, X402Error};
pub use payment::*;
pub use response::*;
pub use scheme::*;
pub use scheme_client::ExactSchemeClient;
pub use selector::{parse_payment_requirements, select_payment_option};
pub use transport::{HttpRequest, HttpResponse, HttpTransport};

pub use http_client::{decode_payment, encode_payment, PaymentPolicy, X402Client};
