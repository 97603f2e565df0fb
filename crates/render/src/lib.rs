//! `tabula-render` — output formats for populated blueprints.
//!
//! One shared traversal (title, header, body, footnotes) with per-format
//! hooks for setup, cleanup, and escaping. The renderer reads the blueprint
//! through its evaluation cache and never mutates its structure.

pub mod format;
pub mod html;
pub mod latex;
pub mod text;
pub mod theme;

pub use format::{render, OutputFormat};
pub use theme::RenderTheme;
