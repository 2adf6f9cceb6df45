//! EIP-712 typed-data helpers for EIP-3009 `transferWithAuthorization`.
//!
//! Provides functions for:
//! - Building the token's EIP-712 domain ([`payment_domain`])
//! - Computing the domain separator independently of the contract ([`compute_domain_separator`])
//! - Computing signing hashes ([`signing_hash`])
//! - Recovering the authorizer of a signed payload ([`recover_authorizer`])
//! - Generating cryptographically secure random nonces ([`random_nonce`])
//! - Encoding signatures to hex ([`encode_signature_hex`])

use std::borrow::Cow;

use alloy::primitives::{keccak256, Address, Signature, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct, SolValue};

use crate::payment::PaymentPayload;
use crate::{NetworkConfig, TransferWithAuthorization, X402Error};

/// Type string of the EIP-712 domain used by FiatToken (USDC) contracts.
pub const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Build the EIP-712 domain the network's token contract signs under.
pub fn payment_domain(config: &NetworkConfig) -> Eip712Domain {
    Eip712Domain {
        name: Some(Cow::Owned(config.eip712_domain_name.clone())),
        version: Some(Cow::Owned(config.eip712_domain_version.clone())),
        chain_id: Some(U256::from(config.chain_id)),
        verifying_contract: Some(config.token),
        salt: None,
    }
}

/// `keccak256(abi.encode(typehash, keccak256(name), keccak256(version), chainId, verifyingContract))`.
///
/// Computed by hand rather than through [`Eip712Domain::separator`] so the
/// value compared against the contract's `DOMAIN_SEPARATOR()` is derived
/// from exactly the fields that are configured.
pub fn compute_domain_separator(
    name: &str,
    version: &str,
    chain_id: u64,
    verifying_contract: Address,
) -> B256 {
    let encoded = (
        keccak256(EIP712_DOMAIN_TYPE.as_bytes()),
        keccak256(name.as_bytes()),
        keccak256(version.as_bytes()),
        U256::from(chain_id),
        verifying_contract,
    )
        .abi_encode();
    keccak256(encoded)
}

/// Domain separator for a network's configured domain.
pub fn domain_separator_for(config: &NetworkConfig) -> B256 {
    compute_domain_separator(
        &config.eip712_domain_name,
        &config.eip712_domain_version,
        config.chain_id,
        config.token,
    )
}

/// Compute the EIP-712 signing hash of an authorization on the given network.
pub fn signing_hash(auth: &TransferWithAuthorization, config: &NetworkConfig) -> B256 {
    auth.eip712_signing_hash(&payment_domain(config))
}

/// Generate a fresh 32-byte nonce from the OS-seeded CSPRNG.
///
/// Nonces are never derived from a counter or clock: independent clients
/// for the same payer must not collide.
pub fn random_nonce() -> B256 {
    let mut bytes = [0u8; 32];
    rand::fill(&mut bytes);
    B256::from(bytes)
}

/// Encode a Signature to a hex string with 0x prefix (65 bytes -> 0x + 130 hex).
/// Uses Electrum notation: v = 27 or 28 in the last byte.
pub fn encode_signature_hex(sig: &Signature) -> String {
    format!("0x{}", alloy::hex::encode(sig.as_bytes()))
}

/// Parse a 65-byte hex signature, with or without `0x` prefix.
pub fn decode_signature_hex(signature: &str) -> Result<Signature, X402Error> {
    let bytes = alloy::hex::decode(signature)
        .map_err(|e| X402Error::PaymentRejected(format!("invalid signature hex: {e}")))?;
    if bytes.len() != 65 {
        return Err(X402Error::PaymentRejected(format!(
            "signature must be 65 bytes, got {}",
            bytes.len()
        )));
    }
    Signature::from_raw(&bytes)
        .map_err(|e| X402Error::PaymentRejected(format!("invalid signature: {e}")))
}

/// Rebuild the typed authorization from its wire form.
pub fn authorization_from_payload(
    payload: &PaymentPayload,
) -> Result<TransferWithAuthorization, X402Error> {
    let auth = &payload.payload.authorization;
    let parse = |field: &str, value: &str| {
        value
            .parse::<U256>()
            .map_err(|e| X402Error::PaymentRejected(format!("invalid {field} '{value}': {e}")))
    };
    Ok(TransferWithAuthorization {
        from: auth.from,
        to: auth.to,
        value: parse("value", &auth.value)?,
        validAfter: parse("validAfter", &auth.valid_after)?,
        validBefore: parse("validBefore", &auth.valid_before)?,
        nonce: auth.nonce,
    })
}

/// Recover the address that signed a payment payload on the given network.
pub fn recover_authorizer(
    payload: &PaymentPayload,
    config: &NetworkConfig,
) -> Result<Address, X402Error> {
    let auth = authorization_from_payload(payload)?;
    let sig = decode_signature_hex(&payload.payload.signature)?;
    sig.recover_address_from_prehash(&signing_hash(&auth, config))
        .map_err(|e| X402Error::PaymentRejected(format!("recovery failed: {e}")))
}
