//! CSV export and import of a project's tasks.
//!
//! The row layout is fixed:
//! `Task ID,Task Name,Resource,Workstream,Start Date,End Date,Completion %`.
//! Parsing only turns text into [`ImportRow`]s; applying them goes through
//! [`crate::plan::import_rows`] like any other edit.

use tracing::debug;

use crate::dates::parse_exchange_date;
use crate::error::{PlanError, Result};
use crate::ident;
use crate::plan::ImportRow;
use crate::task::Task;

pub const HEADER: &str = "Task ID,Task Name,Resource,Workstream,Start Date,End Date,Completion %";
const COLUMNS: usize = 7;

/// Render tasks as CSV in natural identifier order.
pub fn export_csv(tasks: &[Task]) -> String {
    let mut sorted: Vec<&Task> = tasks.iter().collect();
    sorted.sort_by_cached_key(|t| ident::sort_key(&t.identifier));

    let mut out = String::from(HEADER);
    out.push('\n');
    for t in sorted {
        let dates =
            [t.start_date, t.end_date].map(|d| d.map(|d| d.to_string()).unwrap_or_default());
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            escape_csv(&t.identifier),
            escape_csv(&t.name),
            escape_csv(&t.resource),
            escape_csv(&t.workstream),
            dates[0],
            dates[1],
            t.completion,
        ));
    }
    out
}

/// Header-only file for filling in by hand.
pub fn template_csv() -> String {
    format!("{HEADER}\n")
}

/// Quote a field if it contains a separator, quote or newline.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Split one CSV line, honouring quoted fields and doubled quotes.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

/// Parse a completion cell: `%` stripped, blank means 0, clamped to 0-100.
fn parse_completion(cell: &str, line: usize) -> Result<u8> {
    let cell = cell.trim().trim_end_matches('%').trim();
    if cell.is_empty() {
        return Ok(0);
    }
    let value: f64 = cell.parse().map_err(|_| PlanError::InvalidCsv {
        line,
        reason: format!("completion '{cell}' is not a number"),
    })?;
    Ok(value.round().clamp(0.0, 100.0) as u8)
}

/// Group physical lines into records. A quoted field may span line breaks;
/// each record carries the line number it starts on.
fn split_records(content: &str) -> Result<Vec<(usize, String)>> {
    let mut records = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (i, raw) in content.lines().enumerate() {
        let (_, record) = pending.get_or_insert_with(|| (i + 1, String::new()));
        if !record.is_empty() {
            record.push('\n');
        }
        record.push_str(raw);
        if record.matches('"').count() % 2 == 0 {
            records.extend(pending.take());
        }
    }

    if let Some((line, _)) = pending {
        return Err(PlanError::InvalidCsv {
            line,
            reason: "unterminated quoted field".to_string(),
        });
    }
    Ok(records)
}

/// Parse CSV text into import rows. Blank lines are skipped.
///
/// Unparsable dates become empty rather than failing the row.
pub fn parse_csv(content: &str) -> Result<Vec<ImportRow>> {
    let mut records = split_records(content)?.into_iter();
    let header = records
        .next()
        .map(|(_, h)| h.trim_start_matches('\u{feff}').trim().to_string())
        .unwrap_or_default();
    if header != HEADER {
        return Err(PlanError::InvalidCsv {
            line: 1,
            reason: format!("expected header '{HEADER}'"),
        });
    }

    let mut rows = Vec::new();
    for (line, raw) in records {
        if raw.trim().is_empty() {
            continue;
        }
        let fields = parse_csv_line(&raw);
        if fields.len() != COLUMNS {
            return Err(PlanError::InvalidCsv {
                line,
                reason: format!("expected {COLUMNS} fields, found {}", fields.len()),
            });
        }
        let cell = |n: usize| fields[n].trim().to_string();
        let identifier = Some(cell(0)).filter(|id| !id.is_empty());
        rows.push(ImportRow {
            line,
            identifier,
            name: cell(1),
            resource: cell(2),
            workstream: cell(3),
            start_date: parse_exchange_date(&fields[4]),
            end_date: parse_exchange_date(&fields[5]),
            completion: parse_completion(&fields[6], line)?,
        });
    }
    debug!(rows = rows.len(), "parsed csv");
    Ok(rows)
}
