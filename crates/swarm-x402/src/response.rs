use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::X402Error;

/// Settlement outcome reported by the server in the `X-PAYMENT-RESPONSE`
/// header after a paid request.
///
/// `success == false` means the authorization was accepted for transport but
/// the on-chain transfer did not execute, even if the HTTP status was 2xx.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    /// Transaction hash, if settlement succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

/// Decode a settlement outcome header value: base64 JSON, or plain JSON
/// from gateways that skip the encoding.
pub fn decode_payment_outcome(value: &str) -> Result<PaymentOutcome, X402Error> {
    let value = value.trim();
    if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(value) {
        if let Ok(outcome) = serde_json::from_slice::<PaymentOutcome>(&bytes) {
            return Ok(outcome);
        }
    }
    serde_json::from_str::<PaymentOutcome>(value).map_err(|e| {
        X402Error::PaymentRejected(format!("undecodable settlement outcome header: {e}"))
    })
}
