//! Shared render pipeline.
//!
//! Every format runs the same traversal: resolve all cells through the
//! blueprint's evaluator, then title, setup, header row, body rows,
//! footnote block, cleanup. Only setup/cleanup/escaping and row assembly
//! differ per target. Escaping happens exactly once, on already-resolved
//! strings at emission.

use std::str::FromStr;

use tabula_engine::{Blueprint, DataFrame, EngineError, RowKind};

use crate::html::HtmlFormat;
use crate::latex::LatexFormat;
use crate::text::TextFormat;
use crate::theme::RenderTheme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Html,
    Latex,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" | "txt" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            "latex" | "tex" => Ok(Self::Latex),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// An evaluated cell plus its footnote marker, ready for escaping.
#[derive(Debug, Clone, Default)]
pub struct ResolvedCell {
    pub text: String,
    pub marker: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ResolvedRow {
    pub label: ResolvedCell,
    pub cells: Vec<ResolvedCell>,
    pub kind: RowKind,
}

#[derive(Debug, Clone)]
pub struct ResolvedTable {
    pub title: Option<String>,
    pub columns: Vec<ResolvedCell>,
    pub rows: Vec<ResolvedRow>,
    /// Marked footnotes in marker order.
    pub footnotes: Vec<(usize, String)>,
    /// Unmarked general notes, emitted after the marked block.
    pub general: Vec<String>,
}

pub(crate) trait FormatHooks {
    fn setup(&self, out: &mut String, table: &ResolvedTable, theme: &RenderTheme);
    fn header_row(&self, out: &mut String, table: &ResolvedTable, theme: &RenderTheme);
    fn body_row(&self, out: &mut String, row: &ResolvedRow, theme: &RenderTheme);
    fn footnote_block(&self, out: &mut String, table: &ResolvedTable, theme: &RenderTheme);
    fn cleanup(&self, out: &mut String, table: &ResolvedTable, theme: &RenderTheme);
    fn escape(&self, s: &str) -> String;
}

/// Render a populated blueprint. Repeated calls (any formats) reuse the
/// blueprint's evaluation cache; the blueprint itself is never mutated.
pub fn render(
    blueprint: &Blueprint,
    frame: &DataFrame,
    format: OutputFormat,
    theme: &RenderTheme,
) -> Result<String, EngineError> {
    let table = resolve(blueprint, frame, theme)?;
    let hooks: Box<dyn FormatHooks> = match format {
        OutputFormat::Text => Box::new(TextFormat::new(&table, theme)),
        OutputFormat::Html => Box::new(HtmlFormat),
        OutputFormat::Latex => Box::new(LatexFormat),
    };

    let mut out = String::new();
    hooks.setup(&mut out, &table, theme);
    hooks.header_row(&mut out, &table, theme);
    for row in &table.rows {
        hooks.body_row(&mut out, row, theme);
    }
    hooks.footnote_block(&mut out, &table, theme);
    hooks.cleanup(&mut out, &table, theme);
    Ok(out)
}

/// Evaluate every populated cell once, attach footnote markers: column
/// markers on column labels, variable markers on the variable's header-row
/// label.
fn resolve(
    blueprint: &Blueprint,
    frame: &DataFrame,
    theme: &RenderTheme,
) -> Result<ResolvedTable, EngineError> {
    let footnotes = &blueprint.footnotes;

    let mut columns = Vec::with_capacity(blueprint.col_count() as usize);
    for c in 1..=blueprint.col_count() {
        columns.push(ResolvedCell {
            text: blueprint.col_label(c, frame)?,
            marker: footnotes.marker_for_column(c),
        });
    }

    let mut rows = Vec::with_capacity(blueprint.row_count() as usize);
    for r in 1..=blueprint.row_count() {
        let kind = blueprint.row_kinds[r as usize - 1];
        let variable = blueprint.row_variables[r as usize - 1].as_deref();
        let marker = match (kind, variable) {
            (RowKind::Header, Some(v)) => footnotes.marker_for_variable(v),
            _ => None,
        };
        let label = ResolvedCell { text: blueprint.row_label(r, frame)?, marker };

        let mut cells = Vec::with_capacity(blueprint.col_count() as usize);
        for c in 1..=blueprint.col_count() {
            let text = blueprint.value_at(r, c, frame, theme.decimals)?.unwrap_or_default();
            cells.push(ResolvedCell { text, marker: None });
        }
        rows.push(ResolvedRow { label, cells, kind });
    }

    Ok(ResolvedTable {
        title: blueprint.title.clone(),
        columns,
        rows,
        footnotes: footnotes
            .notes
            .iter()
            .enumerate()
            .map(|(i, text)| (i + 1, text.clone()))
            .collect(),
        general: footnotes.general.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_engine::{Blueprint, Column, DataFrame, Datum, Registry, TableOptions, TableSpec};

    fn demo() -> (Blueprint, DataFrame) {
        let age: Vec<Datum> = [40.0, 50.0, 60.0, 70.0, 45.0, 55.0, 65.0, 75.0]
            .iter()
            .map(|&v| Datum::Number(v))
            .collect();
        let sex: Vec<Datum> = ["M", "M", "F", "F", "M", "F", "F", "F"]
            .iter()
            .map(|s| Datum::Text(s.to_string()))
            .collect();
        let treatment: Vec<Datum> = ["A", "A", "A", "A", "B", "B", "B", "B"]
            .iter()
            .map(|s| Datum::Text(s.to_string()))
            .collect();
        let frame = DataFrame::new(vec![
            Column::new("age", age),
            Column::new("sex", sex),
            Column::new("treatment", treatment),
        ])
        .unwrap();

        let spec = TableSpec {
            group: vec!["treatment".into()],
            variables: vec!["age".into(), "sex".into()],
        };
        let options = TableOptions {
            show_pvalue: true,
            classify_threshold: 5,
            ..TableOptions::default()
        };
        let mut bp = Blueprint::build(&spec, &options, &frame, &Registry::with_builtins()).unwrap();
        bp.title = Some("Baseline characteristics".into());
        (bp, frame)
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("tex".parse::<OutputFormat>().unwrap(), OutputFormat::Latex);
        assert!("pdf".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn text_render_contains_values_and_footnotes() {
        let (bp, frame) = demo();
        let out = render(&bp, &frame, OutputFormat::Text, &RenderTheme::default()).unwrap();
        assert!(out.contains("Baseline characteristics"));
        assert!(out.contains("55.0 (12.9)"));
        assert!(out.contains("2 (50.0%)"));
        assert!(out.contains("1.0000"));
        assert!(out.contains("Two-sample t-test"));
        assert!(out.contains("p-value"));
    }

    #[test]
    fn formats_agree_modulo_escaping() {
        let (bp, frame) = demo();
        let theme = RenderTheme::default();
        let text = render(&bp, &frame, OutputFormat::Text, &theme).unwrap();
        let html = render(&bp, &frame, OutputFormat::Html, &theme).unwrap();
        let latex = render(&bp, &frame, OutputFormat::Latex, &theme).unwrap();
        // numeric cell values are textually identical in every format
        for value in ["55.0 (12.9)", "60.0 (12.9)", "1.0000"] {
            assert!(text.contains(value), "text missing {value}");
            assert!(html.contains(value), "html missing {value}");
            assert!(latex.contains(value), "latex missing {value}");
        }
        // identical modulo format-specific escaping only
        assert!(text.contains("3 (75.0%)"));
        assert!(html.contains("3 (75.0%)"));
        assert!(latex.contains("3 (75.0\\%)"));
        // three renders, one cache: second and third passes recompute nothing
        let (hits, misses) = bp.cache_stats();
        assert_eq!(misses, bp.populated_len());
        assert_eq!(hits, 2 * bp.populated_len());
    }

    #[test]
    fn html_escapes_once_at_emission() {
        let (mut bp, frame) = demo();
        bp.title = Some("A & B <trial>".into());
        let html = render(&bp, &frame, OutputFormat::Html, &RenderTheme::default()).unwrap();
        assert!(html.contains("A &amp; B &lt;trial&gt;"));
        let latex = render(&bp, &frame, OutputFormat::Latex, &RenderTheme::default()).unwrap();
        assert!(latex.contains("A \\& B <trial>"));
    }

    #[test]
    fn renderer_does_not_grow_the_grid() {
        let (bp, frame) = demo();
        let before = bp.populated_len();
        render(&bp, &frame, OutputFormat::Html, &RenderTheme::default()).unwrap();
        assert_eq!(bp.populated_len(), before);
    }
}
