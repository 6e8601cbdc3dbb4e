//! Fetch strategies.
//!
//! Both strategies sit behind [`PageFetcher`] so the selector can be driven
//! by test doubles.

pub mod browser;
pub mod http;

use async_trait::async_trait;
use url::Url;

use crate::error::FetchError;
use crate::types::RawPage;

pub use browser::ChromiumRenderer;
pub use http::StaticFetcher;

/// Produces the markup of a page. Each call is independent: no connection,
/// browser or storage survives it.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<RawPage, FetchError>;
}
