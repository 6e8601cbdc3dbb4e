//! Decides whether a successful static fetch should be replaced by a
//! browser render.

use regex::{Regex, RegexBuilder};

use crate::config::ScrapeSettings;
use crate::error::{AppError, Result};
use crate::types::ExtractedContent;

#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    min_text_threshold: usize,
    placeholder_markup_threshold: usize,
    blocked: Option<Regex>,
}

impl FallbackPolicy {
    pub fn new(settings: &ScrapeSettings) -> Result<Self> {
        let blocked = if settings.blocked_phrase_patterns.is_empty() {
            None
        } else {
            let alternation = settings
                .blocked_phrase_patterns
                .iter()
                .map(|p| format!("(?:{})", p))
                .collect::<Vec<_>>()
                .join("|");
            let regex = RegexBuilder::new(&alternation)
                .case_insensitive(true)
                .build()
                .map_err(|e| AppError::Config(format!("Invalid blocked phrase pattern: {}", e)))?;
            Some(regex)
        };

        Ok(Self {
            min_text_threshold: settings.min_text_threshold,
            placeholder_markup_threshold: settings.placeholder_markup_threshold,
            blocked,
        })
    }

    /// Text-level rule, first match wins: too little text, then a
    /// JavaScript-required phrase.
    pub fn needs_dynamic_fallback(&self, extracted: &ExtractedContent, raw_markup_length: usize) -> bool {
        let text_length = extracted.text.chars().count();
        if text_length < self.min_text_threshold {
            tracing::debug!(text_length, raw_markup_length, "extracted text below threshold");
            return true;
        }
        if let Some(phrase) = self.blocked.as_ref().and_then(|re| re.find(&extracted.text)) {
            tracing::debug!(phrase = phrase.as_str(), raw_markup_length, "page asks for javascript");
            return true;
        }
        false
    }

    /// Markup-level check: a tiny document carrying a script tag is a
    /// client-rendered shell.
    pub fn is_placeholder_markup(&self, markup: &str) -> bool {
        markup.chars().count() < self.placeholder_markup_threshold
            && markup.to_ascii_lowercase().contains("<script")
    }
}
