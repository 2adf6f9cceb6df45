use alloy::primitives::{Address, U256};

use crate::domain::DomainVerifier;
use crate::eip712::{encode_signature_hex, random_nonce, signing_hash};
use crate::payment::{AuthorizationData, ExactPayload, PaymentOption, PaymentPayload};
use crate::scheme::{ChainReader, PayerSigner, SchemeClient};
use crate::{NetworkConfig, TransferWithAuthorization, X402Error, CLOCK_SKEW_SECONDS};

/// `exact` scheme client: signs EIP-3009 `transferWithAuthorization`
/// payloads for one network's token.
///
/// Every signature is preceded by a domain check (cached per network after
/// the first success), so a misconfigured domain never reaches the signer.
pub struct ExactSchemeClient<S, C> {
    signer: S,
    config: NetworkConfig,
    domain: DomainVerifier<C>,
}

impl<S: PayerSigner, C: ChainReader> ExactSchemeClient<S, C> {
    pub fn new(signer: S, chain: C, config: NetworkConfig) -> Self {
        Self {
            signer,
            config,
            domain: DomainVerifier::new(chain),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn domain(&self) -> &DomainVerifier<C> {
        &self.domain
    }

    /// Build and sign an authorization for `option`.
    ///
    /// The authorization is valid from one clock-skew interval in the past until
    /// `min(timeout_seconds, option.maxTimeoutSeconds)` from now, and carries a
    /// fresh random nonce.
    pub async fn sign_payment(
        &self,
        x402_version: u32,
        option: &PaymentOption,
        timeout_seconds: u64,
    ) -> Result<PaymentPayload, X402Error> {
        if option.network != self.config.network {
            return Err(X402Error::NetworkMismatch {
                expected: self.config.network.clone(),
                offered: vec![option.network.clone()],
            });
        }
        if let Some(asset) = option.asset {
            if asset != self.config.token {
                return Err(X402Error::PaymentRejected(format!(
                    "option asset {asset} is not the {} token contract {}",
                    self.config.network, self.config.token
                )));
            }
        }
        let value = option.amount()?;

        // Domain check comes before any use of the key.
        self.domain
            .validate(&self.config)
            .await
            .map_err(|e| match e {
                X402Error::Config(_) => e,
                other => X402Error::PaymentRejected(format!(
                    "could not verify EIP-712 domain for {}: {other}",
                    self.config.network
                )),
            })?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| X402Error::PaymentRejected(format!("system time error: {e}")))?
            .as_secs();
        let window = option
            .max_timeout_seconds
            .map_or(timeout_seconds, |max| max.min(timeout_seconds));
        let valid_after = now.saturating_sub(CLOCK_SKEW_SECONDS);
        let valid_before = now.saturating_add(window);

        let from = self.signer.address();
        let nonce = random_nonce();
        let auth = TransferWithAuthorization {
            from,
            to: option.pay_to,
            value,
            validAfter: U256::from(valid_after),
            validBefore: U256::from(valid_before),
            nonce,
        };

        let sig = self
            .signer
            .sign_typed_hash(&signing_hash(&auth, &self.config))
            .map_err(|e| match e {
                X402Error::PaymentRejected(_) => e,
                other => X402Error::PaymentRejected(format!("signing failed: {other}")),
            })?;

        tracing::debug!(
            network = %self.config.network,
            payer = %from,
            pay_to = %option.pay_to,
            amount = %value,
            valid_before,
            "signed transfer authorization"
        );

        Ok(PaymentPayload {
            x402_version,
            scheme: option.scheme.clone(),
            network: self.config.network.clone(),
            payload: ExactPayload {
                signature: encode_signature_hex(&sig),
                authorization: AuthorizationData {
                    from,
                    to: option.pay_to,
                    value: value.to_string(),
                    valid_after: valid_after.to_string(),
                    valid_before: valid_before.to_string(),
                    nonce,
                },
            },
        })
    }
}

impl<S: PayerSigner, C: ChainReader> SchemeClient for ExactSchemeClient<S, C> {
    fn payer(&self) -> Address {
        self.signer.address()
    }

    fn network(&self) -> &NetworkConfig {
        &self.config
    }

    async fn create_payment_payload(
        &self,
        x402_version: u32,
        option: &PaymentOption,
        timeout_seconds: u64,
    ) -> Result<PaymentPayload, X402Error> {
        self.sign_payment(x402_version, option, timeout_seconds)
            .await
    }

    async fn token_balance(&self) -> Result<U256, X402Error> {
        self.domain
            .chain()
            .balance_of(self.config.token, self.signer.address())
            .await
    }
}
