use resvg::usvg;
use thiserror::Error;

/// Failures that abort a card render.
#[derive(Debug, Error)]
pub enum CardError {
    #[error("invalid card document: {0}")]
    Document(#[from] usvg::Error),

    #[error("could not allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    #[error("png encoding failed: {0}")]
    Encode(String),

    #[error("render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Errors raised by an [`ImageFetcher`](crate::core::fetch::ImageFetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Why an optional image slot was left empty. Never leaves the resolver.
#[derive(Debug, Error)]
pub enum Unavailable {
    #[error("source is neither an http(s) url nor an asset path: {0}")]
    UnsupportedSource(String),

    #[error("asset path escapes the asset root: {0}")]
    AssetPath(String),

    #[error("asset read failed: {0}")]
    AssetRead(#[from] std::io::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("upstream answered with status {0}")]
    Status(u16),

    #[error("empty body")]
    Empty,

    #[error("body is an html document")]
    Html,

    #[error("unrecognized image format")]
    UnknownFormat,
}
