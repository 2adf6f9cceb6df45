//! Capability traits the payment flow depends on.
//!
//! - [`PayerSigner`]: holds the payer key and signs EIP-712 digests
//! - [`ChainReader`]: read-only contract calls (domain separator, balance)
//! - [`SchemeClient`]: builds signed payment payloads for a 402 option
//!
//! The orchestrator only sees these traits; concrete alloy-backed
//! implementations live in [`crate::erc20`] and [`crate::scheme_client`].

use std::future::Future;

use alloy::primitives::{Address, Signature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use crate::error::X402Error;
use crate::payment::{PaymentOption, PaymentPayload};
use crate::NetworkConfig;

/// Payer key material. The key is supplied by the caller, never generated here.
pub trait PayerSigner: Send + Sync {
    /// Address the signatures recover to.
    fn address(&self) -> Address;

    /// Sign a 32-byte EIP-712 signing hash.
    fn sign_typed_hash(&self, hash: &B256) -> Result<Signature, X402Error>;
}

impl PayerSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        PrivateKeySigner::address(self)
    }

    fn sign_typed_hash(&self, hash: &B256) -> Result<Signature, X402Error> {
        self.sign_hash_sync(hash)
            .map_err(|e| X402Error::PaymentRejected(format!("signing failed: {e}")))
    }
}

/// Read-only chain access needed before paying.
pub trait ChainReader: Send + Sync {
    /// The contract's own `DOMAIN_SEPARATOR()`.
    fn domain_separator(
        &self,
        contract: Address,
    ) -> impl Future<Output = Result<B256, X402Error>> + Send;

    /// ERC-20 `balanceOf(owner)` on `token`.
    fn balance_of(
        &self,
        token: Address,
        owner: Address,
    ) -> impl Future<Output = Result<U256, X402Error>> + Send;
}

/// Client-side scheme: creates signed payment payloads.
pub trait SchemeClient: Send + Sync {
    /// Address that pays.
    fn payer(&self) -> Address;

    /// The network this client signs for.
    fn network(&self) -> &NetworkConfig;

    /// Validate the signing domain, then build and sign a fresh authorization
    /// for `option`, valid for `timeout_seconds`.
    fn create_payment_payload(
        &self,
        x402_version: u32,
        option: &PaymentOption,
        timeout_seconds: u64,
    ) -> impl Future<Output = Result<PaymentPayload, X402Error>> + Send;

    /// Payer's token balance in smallest units.
    fn token_balance(&self) -> impl Future<Output = Result<U256, X402Error>> + Send;
}
