//! Plain-text tables for aggregate reports.

/// Border style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TableStyle {
    /// Boxed cells.
    #[default]
    Grid,
    /// Space-separated columns.
    Plain,
}

/// Layout of an aggregate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableFormat {
    pub style: TableStyle,
    /// One column per field instead of one row per field.
    pub transpose: bool,
}

/// Renders `fields` as a name/value table.
pub fn render_fields(fields: &[(String, String)], format: TableFormat) -> String {
    if format.transpose {
        let headers: Vec<String> = fields.iter().map(|(n, _)| n.clone()).collect();
        let row: Vec<String> = fields.iter().map(|(_, v)| v.clone()).collect();
        render(&headers, &[row], format.style)
    } else {
        let headers = vec!["Field".to_string(), "Value".to_string()];
        let rows: Vec<Vec<String>> = fields
            .iter()
            .map(|(n, v)| vec![n.clone(), v.clone()])
            .collect();
        render(&headers, &rows, format.style)
    }
}

/// Renders a table; cells may span several lines.
pub fn render(headers: &[String], rows: &[Vec<String>], style: TableStyle) -> String {
    let columns = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns) {
            let widest = cell.lines().map(|l| l.chars().count()).max().unwrap_or(0);
            widths[i] = widths[i].max(widest);
        }
    }

    let mut out = String::new();
    match style {
        TableStyle::Grid => {
            let rule = |fill: char| {
                let parts: Vec<String> = widths
                    .iter()
                    .map(|w| fill.to_string().repeat(w + 2))
                    .collect();
                format!("+{}+\n", parts.join("+"))
            };
            out.push_str(&rule('-'));
            push_row(&mut out, headers, &widths, "| ", " | ", " |");
            out.push_str(&rule('='));
            for row in rows {
                push_row(&mut out, row, &widths, "| ", " | ", " |");
                out.push_str(&rule('-'));
            }
        }
        TableStyle::Plain => {
            push_row(&mut out, headers, &widths, "", "  ", "");
            for row in rows {
                push_row(&mut out, row, &widths, "", "  ", "");
            }
        }
    }
    out.trim_end_matches('\n').to_string()
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize], lead: &str, sep: &str, tail: &str) {
    let lines: Vec<Vec<&str>> = (0..widths.len())
        .map(|i| cells.get(i).map(|c| c.lines().collect()).unwrap_or_default())
        .collect();
    let height = lines.iter().map(Vec::len).max().unwrap_or(0).max(1);
    for line in 0..height {
        let parts: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let text = lines[i].get(line).copied().unwrap_or("");
                format!("{text:<w$}")
            })
            .collect();
        let row = format!("{lead}{}{tail}", parts.join(sep));
        out.push_str(row.trim_end());
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<(String, String)> {
        vec![
            ("len".to_string(), "16".to_string()),
            ("payload".to_string(), "[1, 2]".to_string()),
        ]
    }

    #[test]
    fn test_grid() {
        let table = render_fields(&fields(), TableFormat::default());
        let expected = "\
+---------+--------+
| Field   | Value  |
+=========+========+
| len     | 16     |
+---------+--------+
| payload | [1, 2] |
+---------+--------+";
        assert_eq!(table, expected);
    }

    #[test]
    fn test_plain_transposed() {
        let format = TableFormat {
            style: TableStyle::Plain,
            transpose: true,
        };
        let table = render_fields(&fields(), format);
        assert_eq!(table, "len  payload\n16   [1, 2]");
    }

    #[test]
    fn test_multiline_cells() {
        let rows = vec![vec!["a".to_string(), "x\ny".to_string()]];
        let headers = vec!["k".to_string(), "v".to_string()];
        let table = render(&headers, &rows, TableStyle::Plain);
        assert_eq!(table, "k  v\na  x\n   y");
    }
}
