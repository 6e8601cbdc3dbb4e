//! Strategy selection.
//!
//! The fallback protocol is the pure [`transition`] function over [`Phase`];
//! [`Scraper`] drives it with real fetchers. Within one request the static
//! attempt always resolves before a dynamic attempt begins, and each
//! strategy runs at most once.

use std::sync::Arc;
use url::Url;

use crate::assemble::assemble;
use crate::config::ScrapeSettings;
use crate::error::{FetchError, Result};
use crate::extract::normalize;
use crate::fetch::{ChromiumRenderer, PageFetcher, StaticFetcher};
use crate::heuristics::FallbackPolicy;
use crate::types::{ExtractedContent, FetchRequest, Mode, RawPage, ScrapeResult, Strategy};

/// How a static attempt turned out, as far as the fallback policy cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticVerdict {
    Failed,
    NeedsDynamic,
    Sufficient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    StaticAttempted(StaticVerdict),
    DynamicAttempted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    RunStatic,
    RunDynamic,
    Done,
}

pub fn transition(mode: Mode, phase: Phase) -> Transition {
    match (mode, phase) {
        (Mode::Static | Mode::Auto, Phase::Idle) => Transition::RunStatic,
        (Mode::Dynamic, Phase::Idle) => Transition::RunDynamic,
        (Mode::Auto, Phase::StaticAttempted(StaticVerdict::Failed | StaticVerdict::NeedsDynamic)) => {
            Transition::RunDynamic
        }
        (_, Phase::StaticAttempted(_)) | (_, Phase::DynamicAttempted) => Transition::Done,
    }
}

/// The adopted output of one request.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub content: ExtractedContent,
    pub mode_used: Strategy,
    pub markup: String,
}

pub struct Scraper {
    static_fetcher: Arc<dyn PageFetcher>,
    dynamic_fetcher: Arc<dyn PageFetcher>,
    policy: FallbackPolicy,
}

impl Scraper {
    pub fn new(
        static_fetcher: Arc<dyn PageFetcher>,
        dynamic_fetcher: Arc<dyn PageFetcher>,
        policy: FallbackPolicy,
    ) -> Self {
        Self {
            static_fetcher,
            dynamic_fetcher,
            policy,
        }
    }

    /// Wires the HTTP fetcher and the Chromium renderer from settings.
    pub fn from_settings(settings: &ScrapeSettings) -> Result<Self> {
        Ok(Self::new(
            Arc::new(StaticFetcher::new(settings)),
            Arc::new(ChromiumRenderer::new(settings)),
            FallbackPolicy::new(settings)?,
        ))
    }

    /// Selects a strategy, fetches, and assembles the response.
    pub async fn handle(&self, request: &FetchRequest) -> std::result::Result<ScrapeResult, FetchError> {
        let extraction = self.scrape(&request.url, request.mode).await?;
        let mut result = assemble(&request.url, extraction.content, extraction.mode_used);
        if request.return_html {
            result.html = Some(extraction.markup);
        }
        Ok(result)
    }

    pub async fn scrape(&self, url: &Url, mode: Mode) -> std::result::Result<Extraction, FetchError> {
        let mut phase = Phase::Idle;
        let mut adopted: Option<std::result::Result<Extraction, FetchError>> = None;

        loop {
            match transition(mode, phase) {
                Transition::RunStatic => {
                    let outcome = self.static_fetcher.fetch(url).await;
                    let (verdict, attempt) = self.judge_static(url, mode, outcome);
                    adopted = attempt;
                    phase = Phase::StaticAttempted(verdict);
                }
                Transition::RunDynamic => {
                    let outcome = self.dynamic_fetcher.fetch(url).await;
                    adopted = Some(outcome.map(|page| {
                        log_attempt(url, Strategy::Dynamic, &page);
                        extraction(page, Strategy::Dynamic)
                    }));
                    phase = Phase::DynamicAttempted;
                }
                Transition::Done => break,
            }
        }

        match adopted {
            Some(Ok(extraction)) => {
                tracing::info!(%url, mode = mode.as_str(), mode_used = extraction.mode_used.as_str(), "scrape complete");
                Ok(extraction)
            }
            Some(Err(err)) => Err(err),
            None => Err(FetchError::Render("no fetch strategy produced a result".to_string())),
        }
    }

    // Heuristics only apply in auto mode; static mode adopts whatever came back.
    fn judge_static(
        &self,
        url: &Url,
        mode: Mode,
        outcome: std::result::Result<RawPage, FetchError>,
    ) -> (StaticVerdict, Option<std::result::Result<Extraction, FetchError>>) {
        let page = match outcome {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(%url, error_kind = err.kind(), error = %err, "static fetch failed");
                return (StaticVerdict::Failed, Some(Err(err)));
            }
        };
        log_attempt(url, Strategy::Static, &page);

        if mode == Mode::Auto && self.policy.is_placeholder_markup(&page.markup) {
            tracing::info!(%url, "static markup is a script placeholder, rendering");
            return (StaticVerdict::NeedsDynamic, None);
        }

        let attempt = extraction(page, Strategy::Static);
        let verdict = if mode == Mode::Auto
            && self
                .policy
                .needs_dynamic_fallback(&attempt.content, attempt.content.markup_length)
        {
            tracing::info!(%url, text_length = attempt.content.text.chars().count(), "static text insufficient, rendering");
            StaticVerdict::NeedsDynamic
        } else {
            StaticVerdict::Sufficient
        };
        (verdict, Some(Ok(attempt)))
    }
}

fn extraction(page: RawPage, mode_used: Strategy) -> Extraction {
    Extraction {
        content: normalize(&page.markup),
        mode_used,
        markup: page.markup,
    }
}

fn log_attempt(url: &Url, strategy: Strategy, page: &RawPage) {
    tracing::debug!(
        %url,
        strategy = strategy.as_str(),
        latency_ms = page.source_latency_ms,
        markup_length = page.markup_length(),
        "fetch attempt succeeded"
    );
}
