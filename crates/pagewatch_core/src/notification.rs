use crate::category::{categorize, Category};
use crate::diff::{render_diff_with, truncate_chars, DiffLimits};

/// A change report addressed to the subscribers of one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub url: String,
    pub category: Category,
    /// Rendered diff, or the opening excerpt on first observation.
    pub body: String,
}

impl Notification {
    /// Builds the report for `url` changing from `previous` to `current`.
    /// `previous` is `None` the first time the URL is seen.
    pub fn for_change(
        url: &str,
        previous: Option<&str>,
        current: &str,
        limits: &DiffLimits,
    ) -> Self {
        let rendered = render_diff_with(previous.unwrap_or(""), current, limits);
        Self {
            url: url.to_string(),
            category: categorize(current),
            body: truncate_chars(&rendered, limits.max_chars).to_string(),
        }
    }

    /// Plain-text message handed to the sink.
    pub fn text(&self) -> String {
        format!(
            "🆕 {} {} detected\n🔗 {}\n\n{}",
            self.category.icon(),
            self.category.label(),
            self.url,
            self.body
        )
    }
}
