use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render rows under a header with columns padded to the widest cell.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![
        line(headers.iter().map(|h| h.to_string()).collect()),
        line(widths.iter().map(|&w| "-".repeat(w)).collect()),
    ];
    out.extend(rows.iter().map(|row| line(row.clone())));
    out.join("\n")
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    println!("{}", render_table(headers, rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_table_pads_columns() {
        let rows = vec![
            vec!["score".to_string(), "85".to_string()],
            vec!["approved".to_string(), "yes".to_string()],
        ];
        assert_eq!(
            render_table(&["FIELD", "VALUE"], &rows),
            "FIELD     VALUE\n--------  -----\nscore     85\napproved  yes"
        );
    }

    #[test]
    fn test_render_table_without_rows() {
        assert_eq!(render_table(&["MODEL"], &[]), "MODEL\n-----");
    }
}
