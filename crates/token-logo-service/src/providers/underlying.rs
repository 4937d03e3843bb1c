//! Logos for principal tokens, borrowed from their underlying asset.
//!
//! A principal token rarely has its own logo. When the protocol registry (or
//! the configured exception list) marks an address as one, its underlying
//! asset is read on chain via `SY()` then `yieldToken()` and resolved through
//! the direct providers.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::protocol_registry::ProtocolAssetRegistry;
use super::rpc::RpcClient;
use super::{ImageProvider, ProviderChain, names};
use crate::errors::{AppError, AppResult, ProviderResult};
use crate::models::ImageArtifact;

const STANDARDIZED_YIELD_GETTER: &str = "SY()";
const YIELD_TOKEN_GETTER: &str = "yieldToken()";

pub struct UnderlyingAssetProvider {
    enabled: bool,
    registry: Arc<ProtocolAssetRegistry>,
    rpc: Arc<RpcClient>,
    exceptions: HashSet<(u64, String)>,
    delegate: Arc<ProviderChain>,
}

impl UnderlyingAssetProvider {
    /// `delegate` must not contain this provider.
    pub fn new(
        enabled: bool,
        registry: Arc<ProtocolAssetRegistry>,
        rpc: Arc<RpcClient>,
        exceptions: HashSet<(u64, String)>,
        delegate: Arc<ProviderChain>,
    ) -> AppResult<Self> {
        if delegate.provider_names().contains(&names::UNDERLYING) {
            return Err(AppError::configuration(
                "underlying asset provider cannot delegate to itself",
            ));
        }
        Ok(Self {
            enabled,
            registry,
            rpc,
            exceptions,
            delegate,
        })
    }

    async fn is_principal_token(&self, chain_id: u64, address: &str) -> ProviderResult<bool> {
        if self.exceptions.contains(&(chain_id, address.to_string())) {
            return Ok(true);
        }
        Ok(self
            .registry
            .lookup(chain_id, address)
            .await?
            .is_some_and(|asset| asset.is_principal_token()))
    }

    async fn underlying_address(
        &self,
        chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<String>> {
        let Some(sy) = self
            .rpc
            .call_address(chain_id, address, STANDARDIZED_YIELD_GETTER)
            .await?
        else {
            return Ok(None);
        };
        self.rpc
            .call_address(chain_id, &sy, YIELD_TOKEN_GETTER)
            .await
    }
}

#[async_trait]
impl ImageProvider for UnderlyingAssetProvider {
    fn name(&self) -> &str {
        names::UNDERLYING
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    async fn fetch_image(
        &self,
        chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<ImageArtifact>> {
        if !self.rpc.supports_chain(chain_id) {
            return Ok(None);
        }
        if !self.is_principal_token(chain_id, address).await? {
            return Ok(None);
        }

        let Some(underlying) = self.underlying_address(chain_id, address).await? else {
            return Ok(None);
        };
        if underlying == address {
            return Ok(None);
        }

        debug!("{}:{} wraps {}, resolving its logo", chain_id, address, underlying);
        Ok(self
            .delegate
            .resolve(chain_id, &underlying)
            .await
            .map(|artifact| artifact.with_provider(names::UNDERLYING)))
    }
}
