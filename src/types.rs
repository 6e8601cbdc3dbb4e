use serde::{Deserialize, Serialize};
use url::Url;

/// Fetch mode requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Auto,
    Static,
    Dynamic,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Static => "static",
            Mode::Dynamic => "dynamic",
        }
    }
}

/// The strategy whose output was adopted for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Static,
    Dynamic,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Static => "static",
            Strategy::Dynamic => "dynamic",
        }
    }
}

/// A validated scrape request. Only built once `url` is known to be an
/// absolute http(s) URL.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub mode: Mode,
    pub return_html: bool,
}

/// Markup as produced by one fetch strategy.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub markup: String,
    pub source_latency_ms: u64,
}

impl RawPage {
    /// Length in characters, matching the unit of the fallback thresholds.
    pub fn markup_length(&self) -> usize {
        self.markup.chars().count()
    }
}

/// Normalized text of a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub text: String,
    pub markup_length: usize,
}

/// Terminal response of a scrape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub url: String,
    pub mode_used: Strategy,
    pub title: String,
    pub lang: String,
    pub char_count: usize,
    pub word_count: usize,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}
