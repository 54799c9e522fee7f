//! Output formatting helpers for human-readable and JSON output.

use std::time::Duration;

use serde::Serialize;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Print a table with aligned columns in human-readable format.
///
/// `headers` and each row in `rows` must have the same length.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    if rows.is_empty() {
        return;
    }

    let col_count = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    println!("{}", align(headers.iter().copied(), &widths));
    for row in rows {
        println!("{}", align(row.iter().map(String::as_str), &widths));
    }
}

/// Pad each cell to its column width; trailing padding is dropped.
fn align<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

/// Print one value as a single line of JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Milliseconds with three decimals, or `-` when there is nothing to show.
pub fn millis(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format!("{:.3}", d.as_secs_f64() * 1000.0),
        None => "-".to_string(),
    }
}
