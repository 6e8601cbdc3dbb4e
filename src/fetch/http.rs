use async_trait::async_trait;
use reqwest::{redirect, Client, ClientBuilder};
use std::time::{Duration, Instant};
use url::Url;

use super::PageFetcher;
use crate::config::ScrapeSettings;
use crate::error::FetchError;
use crate::types::RawPage;

/// Plain HTTP GET with a hard deadline and a bounded redirect chain.
pub struct StaticFetcher {
    timeout: Duration,
    max_redirects: usize,
    user_agent: String,
}

impl StaticFetcher {
    pub fn new(settings: &ScrapeSettings) -> Self {
        Self {
            timeout: settings.static_timeout,
            max_redirects: settings.max_redirects,
            user_agent: settings.user_agent.clone(),
        }
    }

    // A fresh client per call keeps connections request-scoped.
    fn client(&self) -> Result<Client, FetchError> {
        ClientBuilder::new()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .redirect(redirect::Policy::limited(self.max_redirects))
            .user_agent(self.user_agent.as_str())
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| FetchError::Network(format!("failed to build HTTP client: {}", e)))
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if err.is_redirect() {
            FetchError::Network(format!("more than {} redirects", self.max_redirects))
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &Url) -> Result<RawPage, FetchError> {
        let client = self.client()?;
        let start = Instant::now();

        let response = client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let markup = response.text().await.map_err(|e| self.classify(e))?;
        let source_latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(%url, status = status.as_u16(), source_latency_ms, "static fetch complete");

        Ok(RawPage { markup, source_latency_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> StaticFetcher {
        StaticFetcher::new(&ScrapeSettings::default())
    }

    fn url_for(server: &MockServer, route: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
    }

    #[tokio::test]
    async fn returns_markup_and_sends_browser_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", crate::config::DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .expect(1)
            .mount(&server)
            .await;

        let page = fetcher().fetch(&url_for(&server, "/page")).await.unwrap();
        assert_eq!(page.markup, "<p>hi</p>");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetcher().fetch(&url_for(&server, "/missing")).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn follows_redirects_within_bound() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved here"))
            .mount(&server)
            .await;

        let page = fetcher().fetch(&url_for(&server, "/old")).await.unwrap();
        assert_eq!(page.markup, "moved here");
    }

    #[tokio::test]
    async fn redirect_loop_is_a_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
            .mount(&server)
            .await;

        let err = fetcher().fetch(&url_for(&server, "/loop")).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(msg) if msg.contains("redirects")));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let settings = ScrapeSettings {
            static_timeout: Duration::from_millis(200),
            ..ScrapeSettings::default()
        };
        let err = StaticFetcher::new(&settings)
            .fetch(&url_for(&server, "/slow"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn refused_connection_is_a_network_error() {
        let url = Url::parse("http://127.0.0.1:9/unreachable").unwrap();
        let err = fetcher().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_) | FetchError::Timeout(_)));
    }
}
