//! Headless Chromium rendering via chromiumoxide.
//!
//! Every call launches its own browser with a throwaway profile and tears it
//! down before returning, whatever the outcome.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::error::CdpError;
use futures::StreamExt;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use url::Url;

use super::PageFetcher;
use crate::config::ScrapeSettings;
use crate::error::FetchError;
use crate::types::RawPage;

const CLOSE_GRACE: Duration = Duration::from_secs(5);
const BUSY_POLL: Duration = Duration::from_millis(100);

/// Locates a Chrome/Chromium binary: the configured path first, then PATH.
pub fn find_chrome(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"]
        .iter()
        .find_map(|name| which::which(name).ok())
}

/// Tracks in-flight requests by id and reports when the page has been quiet
/// (at most `max_in_flight` open requests) for a full window.
///
/// Redirect hops reuse their request id, so a chain counts as one request.
#[derive(Debug, Clone)]
pub struct NetworkIdle {
    max_in_flight: usize,
    window: Duration,
    in_flight: HashSet<String>,
    quiet_since: Option<Instant>,
}

impl NetworkIdle {
    pub fn new(max_in_flight: usize, window: Duration, now: Instant) -> Self {
        Self {
            max_in_flight,
            window,
            in_flight: HashSet::new(),
            quiet_since: Some(now),
        }
    }

    pub fn request_started(&mut self, request_id: &str, now: Instant) {
        self.in_flight.insert(request_id.to_string());
        self.refresh(now);
    }

    pub fn request_finished(&mut self, request_id: &str, now: Instant) {
        self.in_flight.remove(request_id);
        self.refresh(now);
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Time left until the quiet window completes, `None` while busy.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.quiet_since
            .map(|since| self.window.saturating_sub(now.saturating_duration_since(since)))
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        self.remaining(now) == Some(Duration::ZERO)
    }

    fn refresh(&mut self, now: Instant) {
        if self.in_flight.len() > self.max_in_flight {
            self.quiet_since = None;
        } else if self.quiet_since.is_none() {
            self.quiet_since = Some(now);
        }
    }
}

/// Classifies a failed `goto`: chromiumoxide's own request deadline is the
/// navigation deadline.
pub fn navigation_error(err: CdpError, deadline: Duration) -> FetchError {
    match err {
        CdpError::Timeout => FetchError::NavigationTimeout(deadline),
        other => FetchError::Render(format!("navigation failed: {}", other)),
    }
}

/// A launched browser owned by exactly one render.
///
/// `shutdown` closes it gracefully; if the owning future is dropped first
/// (request deadline), `Drop` stops the event loop and chromiumoxide kills
/// the child process when `Browser` drops.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    _profile: TempDir,
}

impl BrowserSession {
    pub async fn launch(
        executable: Option<&Path>,
        user_agent: &str,
        navigation_timeout: Duration,
    ) -> Result<Self, FetchError> {
        let profile = TempDir::new()
            .map_err(|e| FetchError::BrowserLaunch(format!("failed to create profile dir: {}", e)))?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .request_timeout(navigation_timeout)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .arg(format!("--user-agent={}", user_agent));
        if let Some(path) = find_chrome(executable) {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| FetchError::BrowserLaunch(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });

        Ok(Self {
            browser,
            handler,
            _profile: profile,
        })
    }

    /// Navigates, waits for the network to go quiet plus a fixed settle
    /// delay, and serializes the final DOM.
    pub async fn render(
        &self,
        url: &Url,
        mut idle: NetworkIdle,
        settle: Duration,
        navigation_timeout: Duration,
    ) -> Result<String, FetchError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::Render(format!("failed to open page: {}", e)))?;

        let mut started = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(|e| FetchError::Render(e.to_string()))?;
        let mut finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(|e| FetchError::Render(e.to_string()))?;
        let mut failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(|e| FetchError::Render(e.to_string()))?;

        page.goto(url.as_str())
            .await
            .map_err(|e| navigation_error(e, navigation_timeout))?;

        // Events buffered during navigation drain before the idle check.
        loop {
            let wait = idle.remaining(Instant::now()).unwrap_or(BUSY_POLL);
            tokio::select! {
                biased;
                Some(event) = started.next() => idle.request_started(event.request_id.inner(), Instant::now()),
                Some(event) = finished.next() => idle.request_finished(event.request_id.inner(), Instant::now()),
                Some(event) = failed.next() => idle.request_finished(event.request_id.inner(), Instant::now()),
                _ = tokio::time::sleep(wait) => {
                    if idle.is_settled(Instant::now()) {
                        break;
                    }
                }
            }
        }
        tracing::debug!(%url, in_flight = idle.in_flight(), "network idle");

        tokio::time::sleep(settle).await;

        page.content()
            .await
            .map_err(|e| FetchError::Render(format!("failed to serialize DOM: {}", e)))
    }

    /// Closes the browser and waits for the process to exit. Failures are
    /// logged and swallowed so they never replace the render outcome.
    pub async fn shutdown(mut self) {
        match tokio::time::timeout(CLOSE_GRACE, self.browser.close()).await {
            Ok(Ok(_)) => {
                if let Err(e) = self.browser.wait().await {
                    tracing::warn!(error = %e, "browser did not exit cleanly");
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "browser close failed, killing process");
                self.kill().await;
            }
            Err(_) => {
                tracing::warn!("browser close timed out, killing process");
                self.kill().await;
            }
        }
    }

    async fn kill(&mut self) {
        if let Some(Err(e)) = self.browser.kill().await {
            tracing::warn!(error = %e, "failed to kill browser process");
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Renders pages in a fresh, isolated headless browser per call.
pub struct ChromiumRenderer {
    timeout: Duration,
    settle: Duration,
    idle_window: Duration,
    idle_connections: usize,
    user_agent: String,
    executable: Option<PathBuf>,
}

impl ChromiumRenderer {
    pub fn new(settings: &ScrapeSettings) -> Self {
        Self {
            timeout: settings.dynamic_timeout,
            settle: settings.render_settle,
            idle_window: settings.network_idle_window,
            idle_connections: settings.network_idle_connections,
            user_agent: settings.user_agent.clone(),
            executable: settings.chrome_path.clone(),
        }
    }
}

#[async_trait]
impl PageFetcher for ChromiumRenderer {
    async fn fetch(&self, url: &Url) -> Result<RawPage, FetchError> {
        let start = Instant::now();
        let session =
            BrowserSession::launch(self.executable.as_deref(), &self.user_agent, self.timeout).await?;

        let idle = NetworkIdle::new(self.idle_connections, self.idle_window, Instant::now());
        let outcome = tokio::time::timeout(self.timeout, session.render(url, idle, self.settle, self.timeout)).await;
        session.shutdown().await;

        let markup = match outcome {
            Ok(result) => result?,
            Err(_) => return Err(FetchError::NavigationTimeout(self.timeout)),
        };
        let source_latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(%url, source_latency_ms, "dynamic render complete");

        Ok(RawPage { markup, source_latency_ms })
    }
}
