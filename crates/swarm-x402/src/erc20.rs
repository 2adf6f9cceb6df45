use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, RootProvider};

use crate::error::ConfigError;
use crate::scheme::ChainReader;
use crate::{IFiatToken, X402Error};

/// Upper bound on a single read-only RPC call.
const RPC_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Query the token contract's `DOMAIN_SEPARATOR()`.
pub async fn domain_separator<P: Provider>(
    provider: &P,
    token: Address,
) -> Result<B256, X402Error> {
    let contract = IFiatToken::new(token, provider);
    tokio::time::timeout(RPC_CALL_TIMEOUT, contract.DOMAIN_SEPARATOR().call())
        .await
        .map_err(|_| {
            X402Error::ChainError(format!(
                "DOMAIN_SEPARATOR timed out after {}s",
                RPC_CALL_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| X402Error::ChainError(format!("DOMAIN_SEPARATOR failed: {e}")))
}

/// Query the ERC-20 balance of `owner`.
pub async fn balance_of<P: Provider>(
    provider: &P,
    token: Address,
    owner: Address,
) -> Result<U256, X402Error> {
    let contract = IFiatToken::new(token, provider);
    tokio::time::timeout(RPC_CALL_TIMEOUT, contract.balanceOf(owner).call())
        .await
        .map_err(|_| {
            X402Error::ChainError(format!(
                "balanceOf timed out after {}s",
                RPC_CALL_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| X402Error::ChainError(format!("balanceOf failed: {e}")))
}

/// [`ChainReader`] backed by an alloy provider.
#[derive(Debug, Clone)]
pub struct RpcChainReader<P = RootProvider> {
    provider: P,
}

impl<P: Provider> RpcChainReader<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl RpcChainReader<RootProvider> {
    /// Plain HTTP provider for `rpc_url`.
    pub fn connect(rpc_url: &str) -> Result<Self, ConfigError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| ConfigError::InvalidUrl(format!("{rpc_url}: {e}")))?;
        Ok(Self::new(RootProvider::new_http(url)))
    }
}

impl<P: Provider + Send + Sync> ChainReader for RpcChainReader<P> {
    async fn domain_separator(&self, contract: Address) -> Result<B256, X402Error> {
        domain_separator(&self.provider, contract).await
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, X402Error> {
        balance_of(&self.provider, token, owner).await
    }
}
