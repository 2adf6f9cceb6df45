//! EIP-712 domain validation against the token contract.
//!
//! A signature made under the wrong domain name or version is accepted by the
//! gateway for transport and then reverts at settlement. Comparing the locally
//! computed separator with the contract's own `DOMAIN_SEPARATOR()` catches that
//! before any key is used.

use dashmap::DashSet;

use crate::eip712::domain_separator_for;
use crate::error::ConfigError;
use crate::scheme::ChainReader;
use crate::{NetworkConfig, X402Error};

/// Checks a network's configured EIP-712 domain against the chain, once per network.
pub struct DomainVerifier<C> {
    chain: C,
    validated: DashSet<String>,
}

impl<C: ChainReader> DomainVerifier<C> {
    pub fn new(chain: C) -> Self {
        Self {
            chain,
            validated: DashSet::new(),
        }
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Whether `network` already passed validation in this process.
    pub fn is_validated(&self, network: &str) -> bool {
        self.validated.contains(network)
    }

    /// Validate `config` unless it already passed.
    ///
    /// Errors:
    /// - [`X402Error::ChainError`] if the contract could not be queried
    /// - [`X402Error::Config`] with [`ConfigError::DomainMismatch`] if the separators differ
    ///
    /// Failures are not cached; the next call queries again.
    pub async fn validate(&self, config: &NetworkConfig) -> Result<(), X402Error> {
        if self.is_validated(&config.network) {
            return Ok(());
        }
        self.revalidate(config).await
    }

    /// Query the contract and compare, ignoring any cached result.
    pub async fn revalidate(&self, config: &NetworkConfig) -> Result<(), X402Error> {
        let computed = domain_separator_for(config);
        let on_chain = self.chain.domain_separator(config.token).await?;

        if computed != on_chain {
            self.validated.remove(&config.network);
            tracing::error!(
                network = %config.network,
                name = %config.eip712_domain_name,
                version = %config.eip712_domain_version,
                %computed,
                %on_chain,
                "EIP-712 domain mismatch"
            );
            return Err(ConfigError::DomainMismatch {
                network: config.network.clone(),
                name: config.eip712_domain_name.clone(),
                version: config.eip712_domain_version.clone(),
                computed,
                on_chain,
            }
            .into());
        }

        tracing::info!(
            network = %config.network,
            token = %config.token,
            "EIP-712 domain validated against contract"
        );
        self.validated.insert(config.network.clone());
        Ok(())
    }
}
