use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

/// Errors a page fetcher can surface while navigating. Anything after
/// navigation (selector lookups, screenshots) degrades per element and
/// reports through `anyhow`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("navigation to {url} timed out")]
    NavigationTimeout { url: String },
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
}

/// Browser-automation collaborator. The real driver lives outside this
/// crate; everything here talks to these handles only.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Box<dyn PageHandle>, FetchError>;
}

#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn find_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>>;
    async fn scroll_to_bottom(&self) -> Result<()>;
    async fn scroll_to_top(&self) -> Result<()>;
}

#[async_trait]
pub trait ElementHandle: Send + Sync {
    async fn text(&self) -> Result<String>;
    async fn attribute(&self, name: &str) -> Result<Option<String>>;
    async fn find_first(&self, selector: &str) -> Result<Option<Box<dyn ElementHandle>>>;
    async fn screenshot(&self, path: &Path) -> Result<()>;
}
