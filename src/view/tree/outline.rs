//! Plain-text rendering of projected rows

use super::projector::{ProjectedRow, RowKind};

/// Render one row as an indented outline line
pub fn row_line(row: &ProjectedRow) -> String {
    let indent = "  ".repeat(row.depth);
    match row.kind {
        RowKind::LoadingPlaceholder(_) => format!("{indent}⟳ Loading..."),
        RowKind::Node(_) => {
            let indicator = if row.is_errored() {
                "! "
            } else if row.expanded {
                "▼ "
            } else {
                "> "
            };
            match &row.error {
                Some(error) => format!("{indent}{indicator}{} ({error})", row.label),
                None => format!("{indent}{indicator}{}", row.label),
            }
        }
    }
}

/// Render rows as an outline, one line per row
pub fn render_outline(rows: &[ProjectedRow]) -> String {
    rows.iter().map(row_line).collect::<Vec<_>>().join("\n")
}
