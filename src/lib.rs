pub mod api;
pub mod assemble;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod heuristics;
pub mod selector;
pub mod types;

use std::sync::Arc;
use config::Config;
use selector::Scraper;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scraper: Arc<Scraper>,
}

impl AppState {
    /// State backed by the real HTTP fetcher and Chromium renderer.
    pub fn from_config(config: Config) -> error::Result<Self> {
        let scraper = Scraper::from_settings(&config.scrape)?;
        Ok(Self {
            config: Arc::new(config),
            scraper: Arc::new(scraper),
        })
    }
}
