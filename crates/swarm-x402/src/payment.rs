use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::X402Error;

/// A single entry in the `accepts` array of a 402 response.
///
/// Required fields are not defaulted: a payment term with a missing amount,
/// payee, or resource is rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOption {
    pub scheme: String,
    pub network: String,
    /// Amount in the token's smallest unit, as a decimal string.
    pub max_amount_required: String,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub pay_to: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl PaymentOption {
    /// Parse `maxAmountRequired` as an integer amount.
    pub fn amount(&self) -> Result<U256, X402Error> {
        self.max_amount_required
            .parse::<U256>()
            .map_err(|e| {
                X402Error::InvalidRequirements(format!(
                    "invalid maxAmountRequired '{}': {e}",
                    self.max_amount_required
                ))
            })
    }

    /// Description shown when asking the user to confirm a payment.
    pub fn display_description(&self) -> String {
        self.description
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("API request to {}", self.resource))
    }
}

/// The 402 response body returned by a payment-gated endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub x402_version: u32,
    pub accepts: Vec<PaymentOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentRequirements {
    /// Networks offered across all options, in server order.
    pub fn offered_networks(&self) -> Vec<String> {
        self.accepts.iter().map(|o| o.network.clone()).collect()
    }
}

/// Wire form of an EIP-3009 authorization. Integers are decimal strings,
/// the nonce is 0x-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationData {
    pub from: Address,
    pub to: Address,
    pub value: String,
    pub valid_after: String,
    pub valid_before: String,
    pub nonce: B256,
}

/// Signature plus the authorization it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactPayload {
    pub signature: String,
    pub authorization: AuthorizationData,
}

/// Payment payload sent in the `X-PAYMENT` header (base64-encoded JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: ExactPayload,
}
