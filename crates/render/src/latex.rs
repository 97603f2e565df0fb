//! LaTeX tabular output.

use tabula_engine::RowKind;

use crate::format::{FormatHooks, ResolvedCell, ResolvedRow, ResolvedTable};
use crate::theme::RenderTheme;

pub(crate) struct LatexFormat;

impl LatexFormat {
    fn decorate(&self, cell: &ResolvedCell) -> String {
        let text = self.escape(&cell.text);
        match cell.marker {
            Some(marker) => format!("{text}\\textsuperscript{{{marker}}}"),
            None => text,
        }
    }
}

impl FormatHooks for LatexFormat {
    fn setup(&self, out: &mut String, table: &ResolvedTable, theme: &RenderTheme) {
        out.push_str("\\begin{table}[ht]\n\\centering\n");
        if let Some(title) = &table.title {
            out.push_str(&format!("\\caption{{{}}}\n", self.escape(title)));
        }
        out.push_str(&format!("\\begin{{tabular}}{{l{}}}\n", "r".repeat(table.columns.len())));
        if theme.rules {
            out.push_str("\\hline\n");
        }
    }

    fn header_row(&self, out: &mut String, table: &ResolvedTable, theme: &RenderTheme) {
        for col in &table.columns {
            out.push_str(" & ");
            out.push_str(&self.decorate(col));
        }
        out.push_str(" \\\\\n");
        if theme.rules {
            out.push_str("\\hline\n");
        }
    }

    fn body_row(&self, out: &mut String, row: &ResolvedRow, _theme: &RenderTheme) {
        if row.kind == RowKind::Stratum {
            out.push_str(&format!(
                "\\multicolumn{{{}}}{{l}}{{\\textbf{{{}}}}} \\\\\n",
                row.cells.len() + 1,
                self.decorate(&row.label)
            ));
            return;
        }
        if matches!(row.kind, RowKind::Category | RowKind::Missing) {
            out.push_str("\\quad ");
        }
        out.push_str(&self.decorate(&row.label));
        for cell in &row.cells {
            out.push_str(" & ");
            out.push_str(&self.decorate(cell));
        }
        out.push_str(" \\\\\n");
    }

    fn footnote_block(&self, out: &mut String, table: &ResolvedTable, theme: &RenderTheme) {
        if theme.rules {
            out.push_str("\\hline\n");
        }
        out.push_str("\\end{tabular}\n");
        if table.footnotes.is_empty() && table.general.is_empty() {
            return;
        }
        out.push_str("\\par\\footnotesize\n");
        for (marker, text) in &table.footnotes {
            out.push_str(&format!(
                "\\textsuperscript{{{marker}}}~{}\\par\n",
                self.escape(text)
            ));
        }
        for text in &table.general {
            out.push_str(&format!("{}\\par\n", self.escape(text)));
        }
    }

    fn cleanup(&self, out: &mut String, _table: &ResolvedTable, _theme: &RenderTheme) {
        out.push_str("\\end{table}\n");
    }

    fn escape(&self, s: &str) -> String {
        s.replace('\\', "\\textbackslash{}")
            .replace('&', "\\&")
            .replace('%', "\\%")
            .replace('$', "\\$")
            .replace('#', "\\#")
            .replace('_', "\\_")
            .replace('{', "\\{")
            .replace('}', "\\}")
            .replace('~', "\\textasciitilde{}")
            .replace('^', "\\textasciicircum{}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_special_characters() {
        let fmt = LatexFormat;
        assert_eq!(fmt.escape("50%"), "50\\%");
        assert_eq!(fmt.escape("a_b & c"), "a\\_b \\& c");
        assert_eq!(fmt.escape("x^2"), "x\\textasciicircum{}2");
    }

    #[test]
    fn category_rows_are_indented_with_quad() {
        let fmt = LatexFormat;
        let row = ResolvedRow {
            label: ResolvedCell { text: "F".into(), marker: None },
            cells: vec![ResolvedCell { text: "2 (50.0%)".into(), marker: None }],
            kind: RowKind::Category,
        };
        let mut out = String::new();
        fmt.body_row(&mut out, &row, &RenderTheme::default());
        assert_eq!(out, "\\quad F & 2 (50.0\\%) \\\\\n");
    }
}
