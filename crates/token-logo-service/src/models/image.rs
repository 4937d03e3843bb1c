use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum::IntoEnumIterator;

/// Image formats the service stores and serves.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum ImageExtension {
    Png,
    Jpg,
    Webp,
    Svg,
    Gif,
    Bmp,
    Ico,
    Tiff,
}

impl ImageExtension {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpg => "image/jpeg",
            Self::Webp => "image/webp",
            Self::Svg => "image/svg+xml",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Ico => "image/x-icon",
            Self::Tiff => "image/tiff",
        }
    }

    /// Parses an extension, accepting common aliases (`jpeg`, `tif`) and a
    /// leading dot.
    pub fn parse_lenient(value: &str) -> Option<Self> {
        let value = value.trim().trim_start_matches('.');
        if value.eq_ignore_ascii_case("jpeg") {
            return Some(Self::Jpg);
        }
        if value.eq_ignore_ascii_case("tif") {
            return Some(Self::Tiff);
        }
        value.parse().ok()
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match mime.as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpg),
            "image/webp" => Some(Self::Webp),
            "image/svg+xml" => Some(Self::Svg),
            "image/gif" => Some(Self::Gif),
            "image/bmp" | "image/x-ms-bmp" => Some(Self::Bmp),
            "image/x-icon" | "image/vnd.microsoft.icon" => Some(Self::Ico),
            "image/tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::parse_lenient)
    }

    /// Extension of the last path segment of a URL, ignoring query and fragment.
    pub fn from_url(raw: &str) -> Option<Self> {
        let parsed = url::Url::parse(raw).ok()?;
        let segment = parsed.path_segments()?.next_back()?;
        let (_, ext) = segment.rsplit_once('.')?;
        Self::parse_lenient(ext)
    }

    /// Detects the format from magic bytes; SVG is recognised from its markup.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if let Some(kind) = infer::get(bytes)
            && let Some(ext) = Self::from_content_type(kind.mime_type())
        {
            return Some(ext);
        }
        looks_like_svg(bytes).then_some(Self::Svg)
    }

    /// Every supported extension, in lookup order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    let prolog = text.starts_with("<?xml") || text.starts_with("<!--");
    text.starts_with("<svg") || (prolog && text.contains("<svg"))
}

/// Where the bytes of a resolved image live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    /// Already in memory (local files, synthesized images)
    Buffer(Bytes),
    /// Must be downloaded by the caller
    Url(String),
}

/// An image resolved by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    pub payload: ImagePayload,
    /// Name of the provider that produced it
    pub provider: String,
    pub extension: ImageExtension,
    pub source_path: Option<String>,
}

impl ImageArtifact {
    pub fn from_buffer(
        provider: impl Into<String>,
        bytes: Bytes,
        extension: ImageExtension,
        source_path: Option<String>,
    ) -> Self {
        Self {
            payload: ImagePayload::Buffer(bytes),
            provider: provider.into(),
            extension,
            source_path,
        }
    }

    /// A remote image; the extension is guessed from the URL and defaults to png.
    pub fn from_url(provider: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let extension = ImageExtension::from_url(&url).unwrap_or(ImageExtension::Png);
        Self {
            payload: ImagePayload::Url(url),
            provider: provider.into(),
            extension,
            source_path: None,
        }
    }

    /// Re-tags the artifact as produced by another provider.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn url(&self) -> Option<&str> {
        match &self.payload {
            ImagePayload::Url(url) => Some(url),
            ImagePayload::Buffer(_) => None,
        }
    }
}
