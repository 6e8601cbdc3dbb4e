use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124 Safari/537.36";

const DEFAULT_BLOCKED_PHRASES: &[&str] = &["enable javascript", "please enable javascript", "blocked by"];

/// Thresholds and deadlines shared by the fetchers and the strategy selector.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub min_text_threshold: usize,
    pub blocked_phrase_patterns: Vec<String>,
    pub placeholder_markup_threshold: usize,
    pub static_timeout: Duration,
    pub max_redirects: usize,
    pub dynamic_timeout: Duration,
    pub render_settle: Duration,
    pub network_idle_window: Duration,
    pub network_idle_connections: usize,
    pub user_agent: String,
    pub chrome_path: Option<PathBuf>,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            min_text_threshold: 1000,
            blocked_phrase_patterns: DEFAULT_BLOCKED_PHRASES.iter().map(|p| p.to_string()).collect(),
            placeholder_markup_threshold: 300,
            static_timeout: Duration::from_secs(30),
            max_redirects: 5,
            dynamic_timeout: Duration::from_secs(45),
            render_settle: Duration::from_millis(1200),
            network_idle_window: Duration::from_millis(500),
            network_idle_connections: 2,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome_path: None,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub request_timeout: Duration,
    pub scrape: ScrapeSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
        let ip = IpAddr::from_str(&host)
            .map_err(|e| AppError::Config(format!("Invalid host address: {}", e)))?;

        let defaults = ScrapeSettings::default();
        let blocked_phrase_patterns = match lookup("SCRAPER_BLOCKED_PHRASES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.blocked_phrase_patterns,
        };

        let scrape = ScrapeSettings {
            min_text_threshold: parse_or(&lookup, "SCRAPER_MIN_TEXT_CHARS", defaults.min_text_threshold)?,
            blocked_phrase_patterns,
            placeholder_markup_threshold: parse_or(
                &lookup,
                "SCRAPER_PLACEHOLDER_MARKUP_CHARS",
                defaults.placeholder_markup_threshold,
            )?,
            static_timeout: millis_or(&lookup, "SCRAPER_STATIC_TIMEOUT_MS", defaults.static_timeout)?,
            max_redirects: parse_or(&lookup, "SCRAPER_MAX_REDIRECTS", defaults.max_redirects)?,
            dynamic_timeout: millis_or(&lookup, "SCRAPER_DYNAMIC_TIMEOUT_MS", defaults.dynamic_timeout)?,
            render_settle: millis_or(&lookup, "SCRAPER_RENDER_SETTLE_MS", defaults.render_settle)?,
            network_idle_window: millis_or(&lookup, "SCRAPER_NETWORK_IDLE_MS", defaults.network_idle_window)?,
            network_idle_connections: parse_or(
                &lookup,
                "SCRAPER_NETWORK_IDLE_CONNECTIONS",
                defaults.network_idle_connections,
            )?,
            user_agent: lookup("SCRAPER_USER_AGENT").unwrap_or(defaults.user_agent),
            chrome_path: lookup("CHROME_PATH").map(PathBuf::from),
        };

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            request_timeout: millis_or(&lookup, "SCRAPER_REQUEST_TIMEOUT_MS", Duration::from_secs(90))?,
            scrape,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}

fn millis_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default.as_millis() as u64).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 3000);
        assert_eq!(config.scrape.min_text_threshold, 1000);
        assert_eq!(config.scrape.max_redirects, 5);
        assert_eq!(config.scrape.static_timeout, Duration::from_secs(30));
        assert_eq!(config.scrape.dynamic_timeout, Duration::from_secs(45));
        assert_eq!(config.scrape.blocked_phrase_patterns.len(), 3);
        assert!(config.scrape.chrome_path.is_none());
    }

    #[test]
    fn port_and_thresholds_come_from_environment() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("SCRAPER_MIN_TEXT_CHARS", "250"),
            ("SCRAPER_RENDER_SETTLE_MS", "0"),
            ("SCRAPER_BLOCKED_PHRASES", "captcha, access denied ,"),
        ])
        .unwrap();
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.scrape.min_text_threshold, 250);
        assert_eq!(config.scrape.render_settle, Duration::ZERO);
        assert_eq!(config.scrape.blocked_phrase_patterns, vec!["captcha", "access denied"]);
    }

    #[test]
    fn invalid_port_is_a_config_error() {
        let err = config_from(&[("PORT", "not-a-port")]).err().unwrap();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("PORT")));
    }
}
