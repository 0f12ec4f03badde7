// Plain-text rendering of a session's current view

use parqview_engine::layout::{pad_left, pad_right};
use parqview_engine::sort::SortDirection;
use parqview_engine::{Alignment, EditSession};

const GUTTER_HEADER: &str = "#";
const SEPARATOR: &str = "  ";

#[derive(Debug, Clone, Copy)]
pub(crate) struct RenderOptions {
    /// Stop after this many view rows
    pub max_rows: Option<usize>,
    pub totals: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_rows: None,
            totals: true,
        }
    }
}

/// Header, rows in view order, optional totals footer, then a status line
pub(crate) fn render_table(session: &EditSession, opts: RenderOptions) -> String {
    let table = session.table();
    let widths = session.column_widths();
    let visible = session.visible_row_count();
    let shown = opts.max_rows.map_or(visible, |max| max.min(visible));
    let gutter = GUTTER_HEADER.len().max(visible.to_string().len());

    let mut lines: Vec<String> = Vec::with_capacity(shown + 5);

    let mut header = vec![pad_left(GUTTER_HEADER, gutter)];
    for (col, column) in table.columns().iter().enumerate() {
        header.push(align(&column.name, widths[col], session.alignment(col)));
    }
    lines.push(join(header));
    lines.push(rule(gutter, widths));

    for view_row in 0..shown {
        let mut line = vec![pad_left(&(view_row + 1).to_string(), gutter)];
        for col in 0..table.column_count() {
            line.push(align(&session.display(view_row, col), widths[col], session.alignment(col)));
        }
        lines.push(join(line));
    }

    if opts.totals && table.column_count() > 0 {
        lines.push(rule(gutter, widths));
        let mut footer = vec![pad_left("", gutter)];
        for (col, total) in session.totals_display().iter().enumerate() {
            footer.push(align(total, widths[col], session.alignment(col)));
        }
        lines.push(join(footer));
    }

    lines.push(status_line(session, shown));
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn align(text: &str, width: usize, alignment: Alignment) -> String {
    match alignment {
        Alignment::Left => pad_right(text, width),
        Alignment::Right => pad_left(text, width),
    }
}

fn join(cells: Vec<String>) -> String {
    cells.join(SEPARATOR).trim_end().to_string()
}

fn rule(gutter: usize, widths: &[usize]) -> String {
    let mut parts = vec!["-".repeat(gutter)];
    parts.extend(widths.iter().map(|&w| "-".repeat(w)));
    parts.join(SEPARATOR)
}

/// e.g. "2 of 5 rows | sorted by amount desc | filter region~north"
fn status_line(session: &EditSession, shown: usize) -> String {
    let table = session.table();
    let visible = session.visible_row_count();
    let mut parts = Vec::new();

    if shown < visible {
        parts.push(format!("showing {} of {} rows", shown, visible));
    } else if visible < table.row_count() {
        parts.push(format!("{} of {} rows", visible, table.row_count()));
    } else {
        parts.push(format!("{} rows", table.row_count()));
    }

    if let Some((col, direction)) = session.sort_state().get() {
        let dir = match direction {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        };
        if let Ok(column) = table.column(col) {
            parts.push(format!("sorted by {} {}", column.name, dir));
        }
    }

    for (col, pattern) in session.filters().iter() {
        if let Ok(column) = table.column(col) {
            parts.push(format!("filter {}~{}", column.name, pattern));
        }
    }

    parts.join(" | ")
}
