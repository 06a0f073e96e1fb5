use scraper::{Html, Selector};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Pulls the canonical text of the monitored block out of a page.
///
/// `None` means the block is missing, which callers treat as "nothing to
/// report" rather than a failure. A present but empty block is `Some("")`.
pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str) -> Option<String>;
}

/// Returns the trimmed text of the first element matching a CSS selector.
#[derive(Debug, Clone)]
pub struct BlockExtractor {
    selector: Selector,
    source: String,
}

impl BlockExtractor {
    pub const DEFAULT_SELECTOR: &'static str = "div.post";

    pub fn new(selector: &str) -> Result<Self, ExtractError> {
        let parsed = Selector::parse(selector).map_err(|err| ExtractError::InvalidSelector {
            selector: selector.to_string(),
            message: err.to_string(),
        })?;
        Ok(Self {
            selector: parsed,
            source: selector.to_string(),
        })
    }

    pub fn selector(&self) -> &str {
        &self.source
    }
}

impl Default for BlockExtractor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SELECTOR).expect("default selector parses")
    }
}

impl Extractor for BlockExtractor {
    fn extract(&self, html: &str) -> Option<String> {
        // html5ever recovers from any malformed input, so this never fails.
        let doc = Html::parse_document(html);
        let node = doc.select(&self.selector).next()?;
        // An existing but empty block is a real state and is reported as "".
        let text = node.text().collect::<String>();
        Some(text.trim().to_string())
    }
}
