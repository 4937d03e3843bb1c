use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ImageProvider, names};
use crate::errors::ProviderResult;
use crate::models::{ImageArtifact, ImageExtension, Token, is_valid_address};

const LOCAL_LOOKUP_CONCURRENCY: usize = 32;

/// A token image found in the local tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalImage {
    pub token: Token,
    pub path: PathBuf,
    pub extension: ImageExtension,
}

/// Serves images from a `{chainId}/{address}/image.{ext}` tree on disk.
#[derive(Debug, Clone)]
pub struct LocalImageProvider {
    root: PathBuf,
}

impl LocalImageProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Finds the first existing `image.{ext}` for a token, probing
    /// extensions in a fixed order.
    pub async fn find(&self, token: &Token) -> Option<LocalImage> {
        // Addresses become path segments; anything else is never looked up.
        if !is_valid_address(&token.address) {
            return None;
        }
        let dir = self
            .root
            .join(token.chain_id.to_string())
            .join(&token.address);

        for extension in ImageExtension::all() {
            let path = dir.join(format!("image.{extension}"));
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Some(LocalImage {
                    token: token.clone(),
                    path,
                    extension,
                });
            }
        }
        None
    }

    /// Looks up many tokens at once and returns the ones with a local copy.
    pub async fn find_many(&self, tokens: &[Token]) -> Vec<LocalImage> {
        let lookups: Vec<Option<LocalImage>> = stream::iter(tokens.to_vec())
            .map(|token| {
                let provider = self.clone();
                async move { provider.find(&token).await }
            })
            .buffered(LOCAL_LOOKUP_CONCURRENCY)
            .collect()
            .await;
        let found: Vec<LocalImage> = lookups.into_iter().flatten().collect();
        debug!(
            "Local lookup under {:?}: {}/{} tokens have a copy",
            self.root,
            found.len(),
            tokens.len()
        );
        found
    }

    pub async fn read(&self, image: &LocalImage) -> std::io::Result<Bytes> {
        tokio::fs::read(&image.path).await.map(Bytes::from)
    }
}

#[async_trait]
impl ImageProvider for LocalImageProvider {
    fn name(&self) -> &str {
        names::LOCAL
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch_image(
        &self,
        chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<ImageArtifact>> {
        let Some(image) = self.find(&Token::new(chain_id, address)).await else {
            return Ok(None);
        };
        let bytes = self.read(&image).await?;
        Ok(Some(ImageArtifact::from_buffer(
            names::LOCAL,
            bytes,
            image.extension,
            Some(image.path.to_string_lossy().into_owned()),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImagePayload;

    const DAI: &str = "0x6b175474e89094c44da98b954eedeac495271d0f";
    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    fn write_image(root: &Path, chain_id: u64, address: &str, ext: &str, bytes: &[u8]) {
        let dir = root.join(chain_id.to_string()).join(address);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("image.{ext}")), bytes).unwrap();
    }

    #[tokio::test]
    async fn test_fetch_returns_buffer_with_extension() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_image(temp_dir.path(), 1, DAI, "svg", b"<svg/>");
        let provider = LocalImageProvider::new(temp_dir.path());

        let artifact = provider
            .fetch_image(1, &DAI.to_uppercase().replace("0X", "0x"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(artifact.provider, names::LOCAL);
        assert_eq!(artifact.extension, ImageExtension::Svg);
        assert_eq!(artifact.payload, ImagePayload::Buffer(Bytes::from_static(b"<svg/>")));
        assert!(artifact.source_path.unwrap().ends_with("image.svg"));
    }

    #[tokio::test]
    async fn test_find_many_returns_only_hits() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_image(temp_dir.path(), 1, DAI, "png", b"png");
        let provider = LocalImageProvider::new(temp_dir.path());

        let found = provider
            .find_many(&[Token::new(1, USDC), Token::new(1, DAI), Token::new(10, DAI)])
            .await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].token, Token::new(1, DAI));
        assert_eq!(found[0].extension, ImageExtension::Png);
        assert_eq!(provider.read(&found[0]).await.unwrap(), Bytes::from_static(b"png"));
    }

    #[tokio::test]
    async fn test_find_many_runs_on_a_spawned_task() {
        let temp_dir = tempfile::tempdir().unwrap();
        write_image(temp_dir.path(), 1, USDC, "svg", b"<svg/>");
        let provider = LocalImageProvider::new(temp_dir.path());
        let tokens = vec![Token::new(1, USDC), Token::new(1, DAI)];

        let found = tokio::spawn(async move { provider.find_many(&tokens).await })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].extension, ImageExtension::Svg);
    }

    #[tokio::test]
    async fn test_malformed_address_is_never_looked_up() {
        let temp_dir = tempfile::tempdir().unwrap();
        let provider = LocalImageProvider::new(temp_dir.path());
        assert!(provider.fetch_image(1, "../../etc").await.unwrap().is_none());
    }
}
