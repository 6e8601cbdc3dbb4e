//! Markup to readable text.
//!
//! Non-content subtrees are skipped, the `main`/`article` landmarks are
//! preferred over the whole body, and the collected text is cleaned so that
//! paragraphs are separated by at most one blank line.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::types::ExtractedContent;

/// Elements whose subtrees never contribute readable text.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe", "header", "nav", "footer"];

/// Preferred content roots.
const LANDMARK_ELEMENTS: &[&str] = &["main", "article"];

/// Elements followed by a line break in the extracted text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "aside", "blockquote", "dd", "details", "dialog", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "form", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main",
    "article", "ol", "p", "pre", "section", "summary", "table", "tr", "ul", "body",
];

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("title").expect("Failed to parse title selector")
});

static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("body").expect("Failed to parse body selector")
});

static LINE_ENDINGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").expect("valid regex"));
static HORIZONTAL_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\t \u{00A0}]{2,}|\t").expect("valid regex"));
static LINE_EDGES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \u{00A0}]+|[ \u{00A0}]+$").expect("valid regex"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Extracts the title and readable body text from `markup`.
///
/// Never fails: malformed markup is repaired by the HTML5 parser and yields
/// whatever text survives.
pub fn normalize(markup: &str) -> ExtractedContent {
    let document = Html::parse_document(markup);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let landmarks = find_landmarks(document.root_element());
    let mut raw = String::with_capacity(markup.len() / 2);
    if landmarks.is_empty() {
        let body = document
            .select(&BODY_SELECTOR)
            .next()
            .unwrap_or_else(|| document.root_element());
        collect_text(body, &mut raw);
    } else {
        for landmark in landmarks {
            collect_text(landmark, &mut raw);
        }
    }

    ExtractedContent {
        title,
        text: clean_text(&raw),
        markup_length: markup.chars().count(),
    }
}

/// Normalizes line endings, collapses horizontal whitespace and blank lines,
/// and trims the result.
pub fn clean_text(text: &str) -> String {
    let text = LINE_ENDINGS.replace_all(text, "\n");
    let text = HORIZONTAL_RUNS.replace_all(&text, " ");
    let text = LINE_EDGES.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

fn is_skipped(element: &ElementRef<'_>) -> bool {
    SKIPPED_ELEMENTS.contains(&element.value().name())
}

/// Outermost `main`/`article` elements outside skipped subtrees, in document
/// order. Nested landmarks are covered by their ancestor.
fn find_landmarks(root: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut found = Vec::new();
    let mut stack = vec![root];

    while let Some(element) = stack.pop() {
        if is_skipped(&element) {
            continue;
        }
        if LANDMARK_ELEMENTS.contains(&element.value().name()) {
            found.push(element);
            continue;
        }
        stack.extend(element.children().rev().filter_map(ElementRef::wrap));
    }

    found
}

enum Work<'a> {
    Open(ElementRef<'a>),
    Text(&'a str),
    Break,
}

// Iterative so that pathologically deep documents cannot exhaust the stack.
fn collect_text(root: ElementRef<'_>, out: &mut String) {
    let mut stack = vec![Work::Open(root)];

    while let Some(work) = stack.pop() {
        match work {
            Work::Text(text) => out.push_str(text),
            Work::Break => out.push('\n'),
            Work::Open(element) => {
                if is_skipped(&element) {
                    continue;
                }
                let name = element.value().name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if BLOCK_ELEMENTS.contains(&name) {
                    stack.push(Work::Break);
                }
                for child in element.children().rev() {
                    if let Some(text) = child.value().as_text() {
                        stack.push(Work::Text(&**text));
                    } else if let Some(child) = ElementRef::wrap(child) {
                        stack.push(Work::Open(child));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_landmark_wins_and_script_is_dropped() {
        let html = "<html><head><title>T</title></head>\
                    <body><main>Hello world.</main><script>x=1</script></body></html>";
        let content = normalize(html);
        assert_eq!(content.title, "T");
        assert_eq!(content.text, "Hello world.");
        assert_eq!(content.markup_length, html.chars().count());
    }

    #[test]
    fn script_and_style_contents_never_leak() {
        let html = r#"<body><p>Visible</p><script>var secret = "s3cr3t";</script>
                      <style>.x { color: red }</style><noscript>Turn on JS</noscript>
                      <iframe>frame text</iframe></body>"#;
        let content = normalize(html);
        assert_eq!(content.text, "Visible");
        assert!(!content.text.contains("s3cr3t"));
        assert!(!content.text.contains("color"));
    }

    #[test]
    fn landmark_chrome_is_removed_from_body_text() {
        let html = "<body><header>Site header</header><nav>Home | About</nav>\
                    <div>Body copy</div><footer>Copyright</footer></body>";
        assert_eq!(normalize(html).text, "Body copy");
    }

    #[test]
    fn article_inside_header_is_not_a_content_root() {
        let html = "<body><header><article>Teaser</article></header><p>Fallback body</p></body>";
        assert_eq!(normalize(html).text, "Fallback body");
    }

    #[test]
    fn nested_landmarks_are_not_duplicated() {
        let html = "<body><main><article><p>Once</p></article></main><p>Outside</p></body>";
        assert_eq!(normalize(html).text, "Once");
    }

    #[test]
    fn multiple_articles_are_concatenated_in_order() {
        let html = "<body><article><p>First</p></article><div>skip</div><article><p>Second</p></article></body>";
        assert_eq!(normalize(html).text, "First\n\nSecond");
    }

    #[test]
    fn block_elements_keep_paragraphs_apart() {
        let html = "<body><h1>Heading</h1><p>One<br>Two</p><ul><li>a</li><li>b</li></ul></body>";
        assert_eq!(normalize(html).text, "Heading\nOne\nTwo\na\nb");
    }

    #[test]
    fn missing_title_is_empty() {
        assert_eq!(normalize("<p>no head</p>").title, "");
    }

    #[test]
    fn malformed_markup_degrades_to_text() {
        let content = normalize("<div><p>unclosed <b>bold <i>text</div></span>>>");
        assert!(content.text.contains("unclosed bold text"));
        assert_eq!(normalize("").text, "");
        assert_eq!(normalize("just text, no tags").text, "just text, no tags");
    }

    #[test]
    fn deep_nesting_does_not_overflow() {
        let depth = 5_000;
        let html = format!("{}deep{}", "<div>".repeat(depth), "</div>".repeat(depth));
        assert_eq!(normalize(&html).text, "deep");
    }

    #[test]
    fn normalize_is_idempotent() {
        let html = "<title> Page </title><main><p>a  b</p>\n\n\n\n<p>c</p></main>";
        assert_eq!(normalize(html), normalize(html));
    }

    #[test]
    fn clean_text_collapses_blank_lines_to_one() {
        assert_eq!(clean_text("a\n\n\nb"), "a\n\nb");
        assert_eq!(clean_text("a\n\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(clean_text("a\r\n\r\n\r\nb"), "a\n\nb");
        assert_eq!(clean_text("a\r\r\rb"), "a\n\nb");
        assert_eq!(clean_text("a\n  \n \t \nb"), "a\n\nb");
    }

    #[test]
    fn clean_text_collapses_horizontal_runs() {
        assert_eq!(clean_text("a \u{00A0} b\t\tc\td"), "a b c d");
        assert_eq!(clean_text("  padded  "), "padded");
        assert_eq!(clean_text("keep\u{00A0}single"), "keep\u{00A0}single");
    }

    #[test]
    fn clean_text_is_a_fixed_point() {
        let once = clean_text(" x \r\n\r\n\r\n y\t\tz \n\n\n\n w ");
        assert_eq!(clean_text(&once), once);
    }
}
