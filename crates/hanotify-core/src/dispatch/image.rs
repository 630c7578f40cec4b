// ── Notification images ──
//
// Loads the optional payload image by reference. Any failure is logged
// and the notification goes out without an image.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::model::DecodedImage;
use crate::ports::ContentResolver;

/// Images larger than this are not decoded.
pub const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported image reference: {0}")]
    Unsupported(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered HTTP {0}")]
    Status(u16),

    #[error("invalid inline data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("no resolver for content references")]
    NoResolver,

    #[error("image is at least {0} bytes, limit is {MAX_IMAGE_BYTES}")]
    TooLarge(usize),

    #[error("cannot decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Where an image reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Remote(Url),
    /// Base64 text after the comma of a `data:` URI.
    Inline(String),
    File(PathBuf),
    Content(Url),
}

impl ImageSource {
    /// Classify a reference by scheme. Absolute paths count as files.
    pub fn classify(reference: &str) -> Result<Self, ImageError> {
        let reference = reference.trim();
        let unsupported = || ImageError::Unsupported(reference.to_string());

        if reference.starts_with('/') {
            return Ok(Self::File(PathBuf::from(reference)));
        }
        let url = Url::parse(reference).map_err(|_| unsupported())?;
        match url.scheme() {
            "http" | "https" => Ok(Self::Remote(url)),
            "data" => match reference.split_once(',') {
                Some((_, data)) if !data.is_empty() => Ok(Self::Inline(data.to_string())),
                _ => Err(unsupported()),
            },
            "file" => url.to_file_path().map(Self::File).map_err(|()| unsupported()),
            "content" => Ok(Self::Content(url)),
            _ => Err(unsupported()),
        }
    }
}

/// Fetches and decodes notification images.
#[derive(Clone)]
pub struct ImageLoader {
    http: reqwest::Client,
    timeout: Duration,
    content: Option<Arc<dyn ContentResolver>>,
}

impl ImageLoader {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            timeout: DEFAULT_TIMEOUT,
            content: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_content_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.content = Some(resolver);
        self
    }

    /// Load an image, or `None` if anything goes wrong.
    pub async fn load(&self, reference: &str) -> Option<DecodedImage> {
        match self.try_load(reference).await {
            Ok(image) => {
                debug!(width = image.width, height = image.height, "image loaded");
                Some(image)
            }
            Err(e) => {
                warn!(error = %e, "dropping notification image");
                None
            }
        }
    }

    pub async fn try_load(&self, reference: &str) -> Result<DecodedImage, ImageError> {
        let bytes = match ImageSource::classify(reference)? {
            ImageSource::Remote(url) => self.fetch(url).await?,
            ImageSource::Inline(data) => {
                let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
                Bytes::from(STANDARD.decode(compact)?)
            }
            ImageSource::File(path) => Bytes::from(tokio::fs::read(path).await?),
            ImageSource::Content(uri) => {
                let resolver = self.content.as_ref().ok_or(ImageError::NoResolver)?;
                Bytes::from(resolver.open(&uri).await?)
            }
        };
        decode(bytes)
    }

    /// Stream the body, giving up as soon as it outgrows the size limit.
    async fn fetch(&self, url: Url) -> Result<Bytes, ImageError> {
        let mut resp = self.http.get(url).timeout(self.timeout).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }
        let announced = resp.content_length().and_then(|l| usize::try_from(l).ok());
        if let Some(len) = announced {
            if len > MAX_IMAGE_BYTES {
                return Err(ImageError::TooLarge(len));
            }
        }

        let mut body = Vec::with_capacity(announced.unwrap_or(0));
        while let Some(chunk) = resp.chunk().await? {
            let total = body.len() + chunk.len();
            if total > MAX_IMAGE_BYTES {
                return Err(ImageError::TooLarge(total));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(body))
    }
}

/// Decode enough of the image to validate it and read its dimensions.
pub fn decode(bytes: Bytes) -> Result<DecodedImage, ImageError> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::TooLarge(bytes.len()));
    }
    let format = image::guess_format(&bytes)?;
    let decoded = image::load_from_memory_with_format(&bytes, format)?;
    Ok(DecodedImage {
        width: decoded.width(),
        height: decoded.height(),
        format: format.extensions_str().first().copied().unwrap_or("bin").to_string(),
        bytes,
    })
}
