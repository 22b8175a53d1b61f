//! Result rendering: aligned table, JSON, CSV

use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::HashSet;
use std::io::Write;

use sumoq::{OutputFormat, ResultEntry};

const MAX_CELL_CHARS: usize = 60;

pub fn render<W: Write>(entries: &[ResultEntry], format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Table => render_table(entries, out),
        OutputFormat::Json => render_json(entries, out),
        OutputFormat::Csv => render_csv(entries, out),
    }
}

/// Union of keys in first-seen order
fn columns(entries: &[ResultEntry]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();

    for entry in entries {
        for key in entry.map.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.as_str());
            }
        }
    }

    columns
}

fn render_table<W: Write>(entries: &[ResultEntry], out: &mut W) -> Result<()> {
    let columns = columns(entries);
    if columns.is_empty() {
        return Ok(());
    }

    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| {
            columns
                .iter()
                .map(|col| truncate_string(&flatten(entry.get(col).unwrap_or("")), MAX_CELL_CHARS))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(col, width)| format!("{:<width$}", col, width = width).bold().to_string())
        .collect();
    writeln!(out, "{}", header.join("  ").trim_end())?;

    for row in rows {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        writeln!(out, "{}", cells.join("  ").trim_end())?;
    }

    Ok(())
}

fn render_json<W: Write>(entries: &[ResultEntry], out: &mut W) -> Result<()> {
    let maps: Vec<_> = entries.iter().map(|e| &e.map).collect();
    serde_json::to_writer_pretty(&mut *out, &maps).context("Failed to write JSON")?;
    writeln!(out)?;
    Ok(())
}

fn render_csv<W: Write>(entries: &[ResultEntry], out: &mut W) -> Result<()> {
    let columns = columns(entries);
    let mut writer = csv::Writer::from_writer(out);

    if !columns.is_empty() {
        writer.write_record(&columns)?;
    }

    for entry in entries {
        writer.write_record(columns.iter().map(|col| entry.get(col).unwrap_or("")))?;
    }

    writer.flush().context("Failed to write CSV")?;
    Ok(())
}

/// Keep multi-line messages on one table row
fn flatten(value: &str) -> String {
    value.replace(['\r', '\n', '\t'], " ")
}

/// Truncate string safely for UTF-8 (by char count, not bytes)
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().take(max_chars).collect();
    if s.chars().count() > max_chars {
        format!("{}...", chars.into_iter().collect::<String>())
    } else {
        s.to_string()
    }
}
