use bytes::Bytes;
use rust_embed::RustEmbed;
use std::path::Path;

use crate::models::ImageExtension;

/// Images bundled into the binary
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct ImageAssets;

pub const DEFAULT_IMAGE_PATH: &str = "default-token.svg";

/// Placeholder served when no image is stored for a token.
#[derive(Debug, Clone)]
pub struct DefaultImage {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

impl ImageAssets {
    pub fn default_image() -> Option<DefaultImage> {
        let file = Self::get(DEFAULT_IMAGE_PATH)?;
        let content_type = ImageExtension::from_path(Path::new(DEFAULT_IMAGE_PATH))
            .unwrap_or(ImageExtension::Svg)
            .content_type();
        Some(DefaultImage {
            bytes: Bytes::from(file.data.into_owned()),
            content_type,
        })
    }
}
