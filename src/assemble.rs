use url::Url;

use crate::types::{ExtractedContent, ScrapeResult, Strategy};

/// Builds the externally visible result from the adopted extraction.
pub fn assemble(url: &Url, extracted: ExtractedContent, mode_used: Strategy) -> ScrapeResult {
    let lang = guess_language(&extracted.text).to_string();
    let char_count = extracted.text.chars().count();
    let word_count = count_words(&extracted.text);

    ScrapeResult {
        url: url.to_string(),
        mode_used,
        title: extracted.title,
        lang,
        char_count,
        word_count,
        text: extracted.text,
        html: None,
    }
}

/// Coarse hint: Tamil if any character falls in U+0B80..=U+0BFF, English
/// otherwise.
pub fn guess_language(text: &str) -> &'static str {
    if text.chars().any(|c| ('\u{0B80}'..='\u{0BFF}').contains(&c)) {
        "ta"
    } else {
        "en"
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
