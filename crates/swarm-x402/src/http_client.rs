use std::time::Duration;

use alloy::primitives::U256;
use base64::Engine;

use crate::price::format_usd_amount;
use crate::response::{decode_payment_outcome, PaymentOutcome};
use crate::scheme::SchemeClient;
use crate::selector::{parse_payment_requirements, select_payment_option};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::{
    PaymentPayload, X402Error, DEFAULT_TIMEOUT_SECONDS, PAYMENT_HEADER, PAYMENT_RESPONSE_HEADER,
};

/// Per-request timeout of the default reqwest transport.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const ENABLE_HINT: &str = "Enable x402 with --x402 flag or X402_ENABLED=true";

/// Confirmation callback: `(formatted amount, description) -> approve?`.
pub type ConfirmPayment = Box<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// When the client may pay without asking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPolicy {
    /// Pay without confirmation when the amount is at most `max_auto_pay`.
    pub auto_pay: bool,
    /// Per-request auto-pay ceiling in token base units.
    pub max_auto_pay: U256,
    /// Query the payer's token balance before signing.
    pub check_balance: bool,
    /// Authorization validity window in seconds.
    pub timeout_seconds: u64,
}

impl Default for PaymentPolicy {
    fn default() -> Self {
        Self {
            auto_pay: false,
            max_auto_pay: U256::from(1_000_000u64),
            check_balance: true,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

impl PaymentPolicy {
    /// Auto-pay anything up to `max` base units.
    pub fn auto_pay_up_to(max: u64) -> Self {
        Self {
            auto_pay: true,
            max_auto_pay: U256::from(max),
            ..Self::default()
        }
    }

    pub fn allows_auto_pay(&self, amount: U256) -> bool {
        self.auto_pay && amount <= self.max_auto_pay
    }
}

/// HTTP client that handles 402 Payment Required responses.
///
/// On a 402 it parses the requirements, selects an option for its network,
/// applies the [`PaymentPolicy`] (or the confirmation callback), checks the
/// payer's balance, signs via the [`SchemeClient`] and retries the request
/// exactly once with an `X-PAYMENT` header. The `X-PAYMENT-RESPONSE` header
/// of the retry is checked: a reported settlement failure is an error even
/// when the HTTP status is 2xx.
pub struct X402Client<S, T = reqwest::Client> {
    transport: T,
    scheme: Option<S>,
    policy: PaymentPolicy,
    confirm: Option<ConfirmPayment>,
}

impl<S: SchemeClient> X402Client<S> {
    /// Client over a reqwest transport that never follows redirects.
    pub fn new(scheme: S, policy: PaymentPolicy) -> Result<Self, X402Error> {
        Ok(Self::with_transport(scheme, policy, default_http_client()?))
    }
}

/// reqwest client used when no transport is supplied.
pub fn default_http_client() -> Result<reqwest::Client, X402Error> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| X402Error::HttpError(format!("failed to build HTTP client: {e}")))
}

impl<S: SchemeClient, T: HttpTransport> X402Client<S, T> {
    pub fn with_transport(scheme: S, policy: PaymentPolicy, transport: T) -> Self {
        Self {
            transport,
            scheme: Some(scheme),
            policy,
            confirm: None,
        }
    }

    /// Client with payments turned off: every 402 becomes
    /// [`X402Error::PaymentRequired`] listing what the server offered.
    pub fn disabled(transport: T) -> Self {
        Self {
            transport,
            scheme: None,
            policy: PaymentPolicy::default(),
            confirm: None,
        }
    }

    /// Ask `confirm` before paying amounts the policy does not auto-pay.
    pub fn with_confirmation(
        mut self,
        confirm: impl Fn(&str, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.confirm = Some(Box::new(confirm));
        self
    }

    pub fn policy(&self) -> &PaymentPolicy {
        &self.policy
    }

    pub fn scheme(&self) -> Option<&S> {
        self.scheme.as_ref()
    }

    pub fn payments_enabled(&self) -> bool {
        self.scheme.is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `url`, paying if required.
    pub async fn get(
        &self,
        url: &str,
    ) -> Result<(HttpResponse, Option<PaymentOutcome>), X402Error> {
        self.execute(HttpRequest::get(url)).await
    }

    /// Send `request`, paying if required.
    ///
    /// Returns the final response and the settlement outcome when the server
    /// reported one. Non-402 responses are returned unchanged.
    pub async fn execute(
        &self,
        request: HttpRequest,
    ) -> Result<(HttpResponse, Option<PaymentOutcome>), X402Error> {
        let url = request.url.clone();
        let resp = self
            .transport
            .send(request.clone())
            .await
            .map_err(|e| with_step("initial request", e))?;

        if resp.status != 402 {
            return Ok((resp, None));
        }
        tracing::debug!(%url, "received 402 Payment Required");

        let Some(scheme) = &self.scheme else {
            return Err(payments_disabled_error(&resp));
        };

        let requirements = parse_payment_requirements(&resp.body)?;
        let option = select_payment_option(&requirements, &scheme.network().network)?;
        let amount = option.amount()?;
        let amount_usd = format_usd_amount(amount, scheme.network().token_decimals);
        tracing::debug!(
            network = %option.network,
            scheme = %option.scheme,
            amount = %amount,
            pay_to = %option.pay_to,
            "selected payment option"
        );

        if !self.policy.allows_auto_pay(amount) {
            let options = vec![serde_json::to_value(option)?];
            match &self.confirm {
                Some(confirm) => {
                    let description = option.display_description();
                    if !confirm(&amount_usd, &description) {
                        tracing::debug!(amount = %amount_usd, "payment declined by callback");
                        return Err(X402Error::PaymentDeclined {
                            amount: amount_usd,
                            description,
                        });
                    }
                }
                None if self.policy.auto_pay => {
                    return Err(X402Error::PaymentRequired {
                        message: format!(
                            "Payment required: {amount_usd} exceeds the auto-pay limit of {}",
                            format_usd_amount(
                                self.policy.max_auto_pay,
                                scheme.network().token_decimals
                            )
                        ),
                        options,
                    });
                }
                None => {
                    return Err(X402Error::PaymentRequired {
                        message: format!(
                            "Payment required: {amount_usd}. Use --auto-pay or confirm payment."
                        ),
                        options,
                    });
                }
            }
        }

        if self.policy.check_balance {
            let available = scheme.token_balance().await?;
            if available < amount {
                return Err(X402Error::InsufficientBalance {
                    required: amount,
                    available,
                });
            }
        }

        let payload = scheme
            .create_payment_payload(
                requirements.x402_version,
                option,
                self.policy.timeout_seconds,
            )
            .await?;
        let encoded = encode_payment(&payload)?;

        let mut paid = request;
        paid.set_header(PAYMENT_HEADER, &encoded)?;
        tracing::debug!(%url, amount = %amount_usd, "retrying with X-PAYMENT header");

        let resp = self
            .transport
            .send(paid)
            .await
            .map_err(|e| with_step("paid retry", e))?;
        tracing::debug!(%url, status = resp.status, "paid request completed");

        let outcome = match resp.header(PAYMENT_RESPONSE_HEADER) {
            Some(raw) => match decode_payment_outcome(raw) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::warn!(%url, error = %e, "ignoring unparseable payment response header");
                    None
                }
            },
            None => None,
        };

        if let Some(outcome) = &outcome {
            if !outcome.success {
                tracing::warn!(
                    %url,
                    reason = outcome.error_reason.as_deref().unwrap_or("unknown error"),
                    payer = outcome.payer.as_deref().unwrap_or("unknown"),
                    "payment settlement failed"
                );
                return Err(X402Error::SettlementFailed {
                    reason: outcome.error_reason.clone(),
                    payer: outcome.payer.clone(),
                    transaction: outcome.transaction.clone(),
                });
            }
            tracing::info!(
                %url,
                amount = %amount_usd,
                transaction = outcome.transaction.as_deref().unwrap_or("pending"),
                "payment settled"
            );
        }

        if resp.status == 402 {
            return Err(X402Error::PaymentRejected(format!(
                "server answered the paid request to {url} with another 402"
            )));
        }

        Ok((resp, outcome))
    }
}

fn with_step(step: &str, err: X402Error) -> X402Error {
    match err {
        X402Error::HttpError(msg) => X402Error::HttpError(format!("{step} failed: {msg}")),
        other => other,
    }
}

/// The 402 error for a client that may not pay, naming the offered amounts when
/// the body is readable.
fn payments_disabled_error(resp: &HttpResponse) -> X402Error {
    let accepts = resp
        .json::<serde_json::Value>()
        .ok()
        .and_then(|body| body.get("accepts").and_then(|a| a.as_array()).cloned())
        .unwrap_or_default();

    if accepts.is_empty() {
        return X402Error::PaymentRequired {
            message: format!("Payment required. {ENABLE_HINT}"),
            options: Vec::new(),
        };
    }

    let amounts: Vec<&str> = accepts
        .iter()
        .map(|opt| {
            opt.get("maxAmountRequired")
                .and_then(|v| v.as_str())
                .unwrap_or("?")
        })
        .collect();
    X402Error::PaymentRequired {
        message: format!(
            "Payment required (amounts: [{}]). {ENABLE_HINT}",
            amounts.join(", ")
        ),
        options: accepts.clone(),
    }
}

/// Base64-encode a payment payload for the `X-PAYMENT` header.
pub fn encode_payment(payload: &PaymentPayload) -> Result<String, X402Error> {
    let json = serde_json::to_vec(payload)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(&json))
}

/// Decode an `X-PAYMENT` header value.
pub fn decode_payment(header: &str) -> Result<PaymentPayload, X402Error> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(header.trim())
        .map_err(|e| X402Error::PaymentRejected(format!("invalid base64 payment header: {e}")))?;
    Ok(serde_json::from_slice(&bytes)?)
}
