use unicode_width::UnicodeWidthStr;

use super::index_snapshot::{Constituent, IndexSnapshot};

pub const CONSTITUENT_COLUMNS: &[&str] = &[
    "Symbol",
    "Open",
    "High",
    "Low",
    "LTP",
    "Prev Close",
    "Change",
    "Change (%)",
    "Volume",
    "52W High",
    "52W Low",
];

fn row_cells(row: &Constituent) -> Vec<String> {
    vec![
        row.symbol.clone(),
        format!("{:.2}", row.open),
        format!("{:.2}", row.day_high),
        format!("{:.2}", row.day_low),
        format!("{:.2}", row.last_price),
        format!("{:.2}", row.previous_close),
        format!("{:.2}", row.change),
        format!("{:.2}", row.p_change),
        format!("{:.0}", row.total_traded_volume),
        format!("{:.2}", row.year_high),
        format!("{:.2}", row.year_low),
    ]
}

/// Bordered plain-text table of the snapshot's constituents, at most `limit` rows when given.
pub fn render_table(snapshot: &IndexSnapshot, limit: Option<usize>) -> String {
    let rows = snapshot
        .constituents()
        .take(limit.unwrap_or(usize::MAX))
        .map(row_cells);
    let all_rows: Vec<Vec<String>> =
        std::iter::once(CONSTITUENT_COLUMNS.iter().map(|h| h.to_string()).collect())
            .chain(rows)
            .collect();

    let mut col_widths = vec![0; CONSTITUENT_COLUMNS.len()];
    for row in &all_rows {
        for (i, cell) in row.iter().enumerate() {
            col_widths[i] = col_widths[i].max(cell.width());
        }
    }

    let border = format!(
        "+{}+",
        col_widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );

    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    for (row_idx, row) in all_rows.iter().enumerate() {
        let formatted = row
            .iter()
            .zip(&col_widths)
            .enumerate()
            .map(|(col, (cell, width))| {
                let padding = " ".repeat(width - cell.width());
                // Symbols read left-aligned, numbers right-aligned.
                if col == 0 {
                    format!(" {}{} ", cell, padding)
                } else {
                    format!(" {}{} ", padding, cell)
                }
            })
            .collect::<Vec<_>>()
            .join("|");
        out.push_str(&format!("|{}|\n", formatted));
        if row_idx == 0 {
            out.push_str(&border);
            out.push('\n');
        }
    }
    out.push_str(&border);
    out.push('\n');
    out
}
