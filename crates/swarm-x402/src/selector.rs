use crate::payment::{PaymentOption, PaymentRequirements};
use crate::{X402Error, SCHEME_EXACT};

/// Parse a 402 response body into payment requirements.
///
/// A body without `x402Version` or `accepts`, or with malformed options, is
/// [`X402Error::InvalidRequirements`]; an empty `accepts` list is rejected too.
pub fn parse_payment_requirements(body: &[u8]) -> Result<PaymentRequirements, X402Error> {
    let requirements: PaymentRequirements = serde_json::from_slice(body)
        .map_err(|e| X402Error::InvalidRequirements(format!("malformed 402 body: {e}")))?;
    if requirements.accepts.is_empty() {
        return Err(X402Error::InvalidRequirements(
            "402 body offers no payment options".to_string(),
        ));
    }
    Ok(requirements)
}

/// Pick the option to pay for on `network`.
///
/// Options for other networks are never chosen. Among compatible options the
/// first `"exact"` one wins regardless of position, otherwise the first
/// compatible one in server order.
pub fn select_payment_option<'a>(
    requirements: &'a PaymentRequirements,
    network: &str,
) -> Result<&'a PaymentOption, X402Error> {
    let mut compatible = requirements
        .accepts
        .iter()
        .filter(|option| option.network == network)
        .peekable();

    let Some(first) = compatible.peek().copied() else {
        return Err(X402Error::NetworkMismatch {
            expected: network.to_string(),
            offered: requirements.offered_networks(),
        });
    };

    Ok(compatible
        .find(|option| option.scheme == SCHEME_EXACT)
        .unwrap_or(first))
}
