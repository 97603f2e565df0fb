//! Plain-text output: aligned columns, optional rule lines.

use tabula_engine::RowKind;

use crate::format::{FormatHooks, ResolvedCell, ResolvedRow, ResolvedTable};
use crate::theme::RenderTheme;

pub(crate) struct TextFormat {
    label_width: usize,
    widths: Vec<usize>,
}

impl TextFormat {
    /// Column widths need the whole table, so they are measured up front.
    pub fn new(table: &ResolvedTable, theme: &RenderTheme) -> Self {
        let indent_width = theme.indent.chars().count();
        let mut label_width = 0;
        for row in &table.rows {
            let indent = if indented(row.kind) { indent_width } else { 0 };
            label_width = label_width.max(indent + decorate(&row.label).chars().count());
        }

        let mut widths: Vec<usize> = table
            .columns
            .iter()
            .map(|c| decorate(c).chars().count())
            .collect();
        for row in &table.rows {
            for (i, cell) in row.cells.iter().enumerate() {
                widths[i] = widths[i].max(decorate(cell).chars().count());
            }
        }
        Self { label_width, widths }
    }

    fn rule(&self) -> String {
        let total: usize = self.label_width + self.widths.iter().map(|w| w + 2).sum::<usize>();
        "-".repeat(total)
    }
}

impl FormatHooks for TextFormat {
    fn setup(&self, out: &mut String, table: &ResolvedTable, _theme: &RenderTheme) {
        if let Some(title) = &table.title {
            out.push_str(title);
            out.push_str("\n\n");
        }
    }

    fn header_row(&self, out: &mut String, table: &ResolvedTable, theme: &RenderTheme) {
        out.push_str(&" ".repeat(self.label_width));
        for (i, col) in table.columns.iter().enumerate() {
            let text = self.escape(&decorate(col));
            out.push_str("  ");
            out.push_str(&format!("{:>width$}", text, width = self.widths[i]));
        }
        out.push('\n');
        if theme.rules {
            out.push_str(&self.rule());
            out.push('\n');
        }
    }

    fn body_row(&self, out: &mut String, row: &ResolvedRow, theme: &RenderTheme) {
        let mut label = String::new();
        if indented(row.kind) {
            label.push_str(&theme.indent);
        }
        label.push_str(&self.escape(&decorate(&row.label)));
        out.push_str(&format!("{:<width$}", label, width = self.label_width));
        for (i, cell) in row.cells.iter().enumerate() {
            out.push_str("  ");
            out.push_str(&format!(
                "{:>width$}",
                self.escape(&decorate(cell)),
                width = self.widths[i]
            ));
        }
        // trailing alignment spaces add nothing
        while out.ends_with(' ') {
            out.pop();
        }
        out.push('\n');
    }

    fn footnote_block(&self, out: &mut String, table: &ResolvedTable, theme: &RenderTheme) {
        if table.footnotes.is_empty() && table.general.is_empty() {
            return;
        }
        if theme.rules {
            out.push_str(&self.rule());
            out.push('\n');
        }
        for (marker, text) in &table.footnotes {
            out.push_str(&format!("^{marker} {}\n", self.escape(text)));
        }
        for text in &table.general {
            out.push_str(&self.escape(text));
            out.push('\n');
        }
    }

    fn cleanup(&self, _out: &mut String, _table: &ResolvedTable, _theme: &RenderTheme) {}

    fn escape(&self, s: &str) -> String {
        s.to_string()
    }
}

fn indented(kind: RowKind) -> bool {
    matches!(kind, RowKind::Category | RowKind::Missing)
}

fn decorate(cell: &ResolvedCell) -> String {
    match cell.marker {
        Some(marker) => format!("{}^{marker}", cell.text),
        None => cell.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_cover_headers_and_cells() {
        let table = ResolvedTable {
            title: None,
            columns: vec![
                ResolvedCell { text: "A".into(), marker: None },
                ResolvedCell { text: "p-value".into(), marker: None },
            ],
            rows: vec![ResolvedRow {
                label: ResolvedCell { text: "age".into(), marker: Some(1) },
                cells: vec![
                    ResolvedCell { text: "55.0 (12.9)".into(), marker: None },
                    ResolvedCell { text: "0.3466".into(), marker: None },
                ],
                kind: RowKind::Header,
            }],
            footnotes: vec![(1, "Two-sample t-test.".into())],
            general: vec![],
        };
        let fmt = TextFormat::new(&table, &RenderTheme::default());
        assert_eq!(fmt.widths, vec![11, 7]);
        assert_eq!(fmt.label_width, "age^1".len());
    }

    #[test]
    fn markers_render_as_carets() {
        assert_eq!(
            decorate(&ResolvedCell { text: "age".into(), marker: Some(2) }),
            "age^2"
        );
    }
}
