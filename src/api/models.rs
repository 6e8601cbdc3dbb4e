use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::types::{FetchRequest, Mode};

pub const MISSING_URL_MESSAGE: &str = r#"Provide JSON body: { "url": "https://..." }"#;

/// Body of `POST /scrape` as it arrives on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub return_html: Option<bool>,
}

impl ScrapeRequest {
    /// Checks the request before any network activity.
    pub fn validate(self) -> Result<FetchRequest> {
        let raw = self
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AppError::Validation(MISSING_URL_MESSAGE.to_string()))?;

        let url = Url::parse(raw.trim())
            .map_err(|e| AppError::Validation(format!("Invalid URL '{}': {}", raw, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "Unsupported URL scheme '{}': only http and https are allowed",
                url.scheme()
            )));
        }

        Ok(FetchRequest {
            url,
            mode: self.mode.unwrap_or_default(),
            return_html: self.return_html.unwrap_or(false),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub ts: i64,
}
