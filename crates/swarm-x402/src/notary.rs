//! Offline verification of notary signatures on provenance documents.
//!
//! A signed document looks like:
//!
//! ```json
//! {
//!   "data": { ... },
//!   "signatures": [{
//!     "type": "notary",
//!     "signer": "0x...",
//!     "timestamp": "2026-01-20T12:00:00Z",
//!     "data_hash": "<sha256 of canonical data>",
//!     "signature": "0x...",
//!     "hashed_fields": ["data"],
//!     "signed_message_format": "{data_hash}|{timestamp}"
//!   }]
//! }
//! ```
//!
//! A signature is accepted only if both the data hash and the EIP-191
//! signer recovery check out. Failures are returned as a [`NotaryVerdict`],
//! not as errors.

use std::fmt;

use alloy::primitives::{Address, Signature};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::canonical_hash;

/// Signature type written by the gateway's notary service.
pub const NOTARY_SIGNATURE_TYPE: &str = "notary";

/// Message template used when a signature does not state one.
pub const DEFAULT_MESSAGE_FORMAT: &str = "{data_hash}|{timestamp}";

/// A detached signature over a document's `data` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachedSignature {
    #[serde(rename = "type")]
    pub kind: String,
    pub signer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub data_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default)]
    pub hashed_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_message_format: Option<String>,
}

impl DetachedSignature {
    pub fn is_notary(&self) -> bool {
        self.kind == NOTARY_SIGNATURE_TYPE
    }

    /// The signed message: the format template with `{data_hash}` and
    /// `{timestamp}` filled in.
    pub fn render_message(&self, timestamp: &str) -> String {
        self.signed_message_format
            .as_deref()
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_MESSAGE_FORMAT)
            .replace("{data_hash}", &self.data_hash)
            .replace("{timestamp}", timestamp)
    }
}

/// A document carrying detached signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedDocument {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub signatures: Vec<DetachedSignature>,
}

impl SignedDocument {
    /// First signature of type `"notary"`.
    pub fn notary_signature(&self) -> Option<&DetachedSignature> {
        self.signatures.iter().find(|s| s.is_notary())
    }
}

/// Why a notary signature was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotaryFailure {
    NoSignatures,
    NoNotarySignature,
    MalformedSignature(String),
    SignerMismatch { expected: String, actual: String },
    MissingData,
    DataHashMismatch { computed: String, expected: String },
    MissingTimestamp,
    MissingSignatureValue,
    RecoveryMismatch { recovered: Address, expected: String },
    VerificationError(String),
}

impl fmt::Display for NotaryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSignatures => write!(f, "No signatures found in document"),
            Self::NoNotarySignature => write!(f, "No notary signature found in document"),
            Self::MalformedSignature(e) => write!(f, "Malformed notary signature entry: {e}"),
            Self::SignerMismatch { expected, actual } => {
                write!(f, "Signer mismatch: expected {expected}, got {actual}")
            }
            Self::MissingData => write!(f, "Document missing 'data' field"),
            Self::DataHashMismatch { computed, expected } => {
                write!(f, "Data hash mismatch: computed {computed}, expected {expected}")
            }
            Self::MissingTimestamp => write!(f, "Signature missing timestamp"),
            Self::MissingSignatureValue => write!(f, "Signature missing signature value"),
            Self::RecoveryMismatch {
                recovered,
                expected,
            } => write!(
                f,
                "Signature recovery mismatch: recovered {recovered}, expected {expected}"
            ),
            Self::VerificationError(e) => write!(f, "Signature verification error: {e}"),
        }
    }
}

/// Result of verifying a notary signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotaryVerdict {
    pub is_valid: bool,
    pub failure: Option<NotaryFailure>,
}

impl NotaryVerdict {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            failure: None,
        }
    }

    pub fn invalid(failure: NotaryFailure) -> Self {
        Self {
            is_valid: false,
            failure: Some(failure),
        }
    }

    /// Human-readable failure reason, `None` when valid.
    pub fn reason(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

impl From<Result<(), NotaryFailure>> for NotaryVerdict {
    fn from(result: Result<(), NotaryFailure>) -> Self {
        match result {
            Ok(()) => Self::valid(),
            Err(failure) => Self::invalid(failure),
        }
    }
}

/// Verify the notary signature of a typed document against `expected_signer`.
pub fn verify_notary_signature(document: &SignedDocument, expected_signer: &str) -> NotaryVerdict {
    if document.signatures.is_empty() {
        return NotaryVerdict::invalid(NotaryFailure::NoSignatures);
    }
    let Some(entry) = document.notary_signature() else {
        return NotaryVerdict::invalid(NotaryFailure::NoNotarySignature);
    };
    verify_entry(document.data.as_ref(), entry, expected_signer).into()
}

/// Verify a document given as raw JSON.
///
/// Entries of other signature types are skipped without being parsed, so a
/// document may carry signatures this crate does not understand.
pub fn verify_notary_json(document: &Value, expected_signer: &str) -> NotaryVerdict {
    let signatures = signature_entries(document);
    if signatures.is_empty() {
        return NotaryVerdict::invalid(NotaryFailure::NoSignatures);
    }
    let Some(raw) = signatures.iter().find(|s| is_notary_entry(s)) else {
        return NotaryVerdict::invalid(NotaryFailure::NoNotarySignature);
    };
    let entry = match DetachedSignature::deserialize(raw) {
        Ok(entry) => entry,
        Err(e) => return NotaryVerdict::invalid(NotaryFailure::MalformedSignature(e.to_string())),
    };
    verify_entry(document.get("data"), &entry, expected_signer).into()
}

/// First notary signature entry of a raw document.
pub fn extract_notary_signature(document: &Value) -> Option<&Value> {
    signature_entries(document)
        .iter()
        .find(|s| is_notary_entry(s))
}

pub fn has_notary_signature(document: &Value) -> bool {
    extract_notary_signature(document).is_some()
}

fn signature_entries(document: &Value) -> &[Value] {
    document
        .get("signatures")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn is_notary_entry(entry: &Value) -> bool {
    entry.get("type").and_then(Value::as_str) == Some(NOTARY_SIGNATURE_TYPE)
}

fn verify_entry(
    data: Option<&Value>,
    entry: &DetachedSignature,
    expected_signer: &str,
) -> Result<(), NotaryFailure> {
    if !same_address(&entry.signer, expected_signer) {
        return Err(NotaryFailure::SignerMismatch {
            expected: expected_signer.to_string(),
            actual: entry.signer.clone(),
        });
    }

    // JSON null counts as missing, like an absent key.
    let data = data
        .filter(|d| !d.is_null())
        .ok_or(NotaryFailure::MissingData)?;
    let computed = canonical_hash(data);
    if computed != entry.data_hash {
        return Err(NotaryFailure::DataHashMismatch {
            computed,
            expected: entry.data_hash.clone(),
        });
    }

    let timestamp = entry
        .timestamp
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(NotaryFailure::MissingTimestamp)?;
    let message = entry.render_message(timestamp);

    let signature = entry
        .signature
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(NotaryFailure::MissingSignatureValue)?;
    let recovered = recover_personal_signer(&message, signature)
        .map_err(NotaryFailure::VerificationError)?;

    if !same_address(&recovered.to_string(), expected_signer) {
        return Err(NotaryFailure::RecoveryMismatch {
            recovered,
            expected: expected_signer.to_string(),
        });
    }
    Ok(())
}

/// EIP-191 personal-message signer recovery. The signature may omit `0x`.
fn recover_personal_signer(message: &str, signature: &str) -> Result<Address, String> {
    let bytes = alloy::hex::decode(strip_hex_prefix(signature.trim()))
        .map_err(|e| format!("invalid signature hex: {e}"))?;
    let sig = Signature::from_raw(&bytes).map_err(|e| e.to_string())?;
    sig.recover_address_from_msg(message.as_bytes())
        .map_err(|e| e.to_string())
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn same_address(a: &str, b: &str) -> bool {
    strip_hex_prefix(a.trim()).eq_ignore_ascii_case(strip_hex_prefix(b.trim()))
}
