//! HTML table output.

use tabula_engine::RowKind;

use crate::format::{FormatHooks, ResolvedCell, ResolvedRow, ResolvedTable};
use crate::theme::RenderTheme;

pub(crate) struct HtmlFormat;

impl HtmlFormat {
    fn decorate(&self, cell: &ResolvedCell) -> String {
        let text = self.escape(&cell.text);
        match cell.marker {
            Some(marker) => format!("{text}<sup>{marker}</sup>"),
            None => text,
        }
    }
}

impl FormatHooks for HtmlFormat {
    fn setup(&self, out: &mut String, table: &ResolvedTable, _theme: &RenderTheme) {
        out.push_str("<table>\n");
        if let Some(title) = &table.title {
            out.push_str(&format!("<caption>{}</caption>\n", self.escape(title)));
        }
    }

    fn header_row(&self, out: &mut String, table: &ResolvedTable, _theme: &RenderTheme) {
        out.push_str("<thead>\n<tr><th></th>");
        for col in &table.columns {
            out.push_str(&format!("<th>{}</th>", self.decorate(col)));
        }
        out.push_str("</tr>\n</thead>\n<tbody>\n");
    }

    fn body_row(&self, out: &mut String, row: &ResolvedRow, _theme: &RenderTheme) {
        if row.kind == RowKind::Stratum {
            out.push_str(&format!(
                "<tr class=\"stratum\"><td colspan=\"{}\">{}</td></tr>\n",
                row.cells.len() + 1,
                self.decorate(&row.label)
            ));
            return;
        }
        let label_class = match row.kind {
            RowKind::Category | RowKind::Missing => " class=\"indent\"",
            _ => "",
        };
        out.push_str(&format!("<tr><td{label_class}>{}</td>", self.decorate(&row.label)));
        for cell in &row.cells {
            out.push_str(&format!("<td>{}</td>", self.decorate(cell)));
        }
        out.push_str("</tr>\n");
    }

    fn footnote_block(&self, out: &mut String, table: &ResolvedTable, _theme: &RenderTheme) {
        out.push_str("</tbody>\n");
        if table.footnotes.is_empty() && table.general.is_empty() {
            return;
        }
        let span = table.columns.len() + 1;
        out.push_str("<tfoot>\n");
        for (marker, text) in &table.footnotes {
            out.push_str(&format!(
                "<tr><td colspan=\"{span}\"><sup>{marker}</sup> {}</td></tr>\n",
                self.escape(text)
            ));
        }
        for text in &table.general {
            out.push_str(&format!(
                "<tr><td colspan=\"{span}\">{}</td></tr>\n",
                self.escape(text)
            ));
        }
        out.push_str("</tfoot>\n");
    }

    fn cleanup(&self, out: &mut String, _table: &ResolvedTable, _theme: &RenderTheme) {
        out.push_str("</table>\n");
    }

    fn escape(&self, s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_markup_characters() {
        let fmt = HtmlFormat;
        assert_eq!(fmt.escape("a & b < c > \"d\""), "a &amp; b &lt; c &gt; &quot;d&quot;");
    }

    #[test]
    fn stratum_rows_span_the_table() {
        let fmt = HtmlFormat;
        let row = ResolvedRow {
            label: ResolvedCell { text: "Site 1".into(), marker: None },
            cells: vec![ResolvedCell::default(), ResolvedCell::default()],
            kind: RowKind::Stratum,
        };
        let mut out = String::new();
        fmt.body_row(&mut out, &row, &RenderTheme::default());
        assert_eq!(out, "<tr class=\"stratum\"><td colspan=\"3\">Site 1</td></tr>\n");
    }
}
