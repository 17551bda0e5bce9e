use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use url::Url;

use crate::core::error::{FetchError, Unavailable};
use crate::core::sniff;

// Some image hosts refuse clients that do not look like a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const IMAGE_ACCEPT: &str = "image/avif,image/webp,image/apng,image/png,image/jpeg,image/*;q=0.8,*/*;q=0.5";

/// A raw upstream response.
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedBody, FetchError>;
}

/// An image body with a confirmed media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ResolvedImage {
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(IMAGE_ACCEPT));

        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, max_bytes })
    }
}

#[async_trait]
impl ImageFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedBody, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedBody {
            status,
            content_type,
            bytes,
        })
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err.to_string())
    }
}

/// Turns a background/avatar/icon source into an image or nothing.
#[derive(Clone)]
pub struct ImageResolver {
    fetcher: Arc<dyn ImageFetcher>,
    asset_dir: PathBuf,
    max_bytes: usize,
}

impl ImageResolver {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, asset_dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            fetcher,
            asset_dir: asset_dir.into(),
            max_bytes,
        }
    }

    /// Resolve one optional image slot. Every failure degrades to `None`.
    pub async fn resolve(&self, slot: &'static str, source: Option<&str>) -> Option<ResolvedImage> {
        let source = source?;
        match self.try_resolve(source).await {
            Ok(image) => {
                tracing::debug!(slot, mime = %image.mime, bytes = image.bytes.len(), "image resolved");
                Some(image)
            }
            Err(reason) => {
                tracing::debug!(slot, source, %reason, "image unavailable");
                None
            }
        }
    }

    pub async fn try_resolve(&self, source: &str) -> Result<ResolvedImage, Unavailable> {
        let body = match source.strip_prefix("//") {
            Some(rest) => self.fetch_remote(&format!("https://{rest}")).await?,
            None if source.starts_with('/') => self.read_asset(source).await?,
            None => self.fetch_remote(source).await?,
        };

        if !(200..300).contains(&body.status) {
            return Err(Unavailable::Status(body.status));
        }
        if body.bytes.is_empty() {
            return Err(Unavailable::Empty);
        }
        if sniff::looks_like_html(&body.bytes) {
            return Err(Unavailable::Html);
        }

        let mime = sniff::confirm_media_type(&body.bytes, body.content_type.as_deref())
            .ok_or(Unavailable::UnknownFormat)?;

        Ok(ResolvedImage {
            mime,
            bytes: body.bytes,
        })
    }

    async fn fetch_remote(&self, source: &str) -> Result<FetchedBody, Unavailable> {
        let url = Url::parse(source).map_err(|_| Unavailable::UnsupportedSource(source.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Unavailable::UnsupportedSource(source.to_string()));
        }
        Ok(self.fetcher.fetch(&url).await?)
    }

    async fn read_asset(&self, source: &str) -> Result<FetchedBody, Unavailable> {
        let path = asset_path(&self.asset_dir, source)
            .ok_or_else(|| Unavailable::AssetPath(source.to_string()))?;

        let metadata = tokio::fs::metadata(&path).await?;
        if metadata.len() > self.max_bytes as u64 {
            return Err(FetchError::TooLarge {
                limit: self.max_bytes,
            }
            .into());
        }

        Ok(FetchedBody {
            status: 200,
            content_type: None,
            bytes: tokio::fs::read(&path).await?,
        })
    }
}

/// Map `/img/bg.png` into `asset_dir/img/bg.png`, refusing anything that is
/// not a plain relative path once the leading separator is removed.
fn asset_path(asset_dir: &Path, source: &str) -> Option<PathBuf> {
    let relative = Path::new(source.trim_start_matches('/'));
    let mut components = relative.components().peekable();
    components.peek()?;

    if components.all(|c| matches!(c, Component::Normal(_))) {
        Some(asset_dir.join(relative))
    } else {
        None
    }
}
