use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::ImageProvider;
use crate::models::ImageArtifact;

/// Ordered list of providers; earlier registration means higher priority.
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn ImageProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn ImageProvider>>) -> Self {
        Self { providers }
    }

    /// Queries every available provider concurrently, waits for all of them,
    /// then returns the first hit in registration order. Provider errors are
    /// logged and count as a miss.
    pub async fn resolve(&self, chain_id: u64, address: &str) -> Option<ImageArtifact> {
        let active: Vec<&Arc<dyn ImageProvider>> = self
            .providers
            .iter()
            .filter(|provider| provider.is_available())
            .collect();

        let attempts = active.iter().map(|provider| async move {
            match provider.fetch_image(chain_id, address).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(
                        "Provider {} failed for {}:{}: {}",
                        provider.name(),
                        chain_id,
                        address,
                        e
                    );
                    None
                }
            }
        });

        let outcomes = join_all(attempts).await;
        let winner = outcomes.into_iter().flatten().next();

        match &winner {
            Some(artifact) => debug!(
                "Resolved {}:{} via {}",
                chain_id, address, artifact.provider
            ),
            None => debug!(
                "No provider had an image for {}:{} ({} queried)",
                chain_id,
                address,
                active.len()
            ),
        }
        winner
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn available_providers(&self) -> Vec<&str> {
        self.providers
            .iter()
            .filter(|p| p.is_available())
            .map(|p| p.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
