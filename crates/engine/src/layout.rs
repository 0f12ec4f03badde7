//! Column auto-fit and fixed-width text helpers.
//!
//! Widths are measured in terminal cells so CJK and emoji stay aligned.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::table::TableStore;
use crate::value::DisplayOptions;

/// Bounds applied to every auto-fit width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthLimits {
    pub min: usize,
    pub max: usize,
}

impl Default for WidthLimits {
    fn default() -> Self {
        Self { min: 4, max: 40 }
    }
}

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Auto-fit width per column: widest of the header, each visible cell and the total
pub fn column_widths(
    table: &TableStore,
    visible_rows: &[usize],
    totals_display: &[String],
    opts: &DisplayOptions,
    limits: WidthLimits,
) -> Vec<usize> {
    let max = limits.max.max(limits.min);
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(col, column)| {
            let mut width = display_width(&column.name);
            for &row in visible_rows {
                width = width.max(display_width(&table.display(row, col, opts)));
                // Nothing wider can matter once the cap is hit
                if width >= max {
                    break;
                }
            }
            if let Some(total) = totals_display.get(col) {
                width = width.max(display_width(total));
            }
            width.clamp(limits.min, max)
        })
        .collect()
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
pub fn truncate_display(s: &str, width: usize) -> String {
    if width < 3 {
        // Just return the first char if it fits, else empty
        for ch in s.chars() {
            let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
            if cw <= width {
                return ch.to_string();
            }
        }
        return String::new();
    }

    if display_width(s) <= width {
        return s.to_string();
    }

    // Stop at width - 2 to leave room for ".."
    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            end_byte = i;
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }

    format!("{}..", &s[..end_byte])
}

/// Pad or truncate to exactly `width` display columns, left-aligned
pub fn pad_right(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", s, " ".repeat(width - sw))
    }
}

/// Pad or truncate to exactly `width` display columns, right-aligned
pub fn pad_left(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", " ".repeat(width - sw), s)
    }
}
