//! Render themes.
//!
//! Opaque styling consumed only by the format hooks; the engine itself
//! never branches on a theme beyond the decimal precision handed to cell
//! evaluation.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderTheme {
    /// Decimal places for summaries and percentages.
    pub decimals: u8,
    /// Prefix for category and missing-count row labels.
    pub indent: String,
    /// Horizontal rules in text and LaTeX output.
    pub rules: bool,
}

impl Default for RenderTheme {
    fn default() -> Self {
        Self { decimals: 1, indent: "  ".into(), rules: true }
    }
}

impl RenderTheme {
    /// Dense variant: no indentation, no rules.
    pub fn compact() -> Self {
        Self { decimals: 1, indent: String::new(), rules: false }
    }
}
