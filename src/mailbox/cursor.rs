//! Cursor-based reads over append-only JSONL logs
//!
//! A cursor is a raw-line offset owned by the reader, never by the bus.
//! Reads take a full-file snapshot, so a concurrent append is either wholly
//! visible or wholly absent — a reader cannot observe a torn line that has
//! already been flushed.

use std::path::Path;

use crate::types::ReadPage;

/// Read records from `path` starting at raw-line offset `cursor`.
///
/// Returns at most `limit` raw lines' worth of records (all remaining lines
/// if `limit` is `None`). Lines that fail to parse are dropped from the
/// result but still counted toward `next_cursor`, so a malformed line is
/// consumed exactly once and never retried. A missing log is
/// indistinguishable from "no new data": it yields an empty page with the
/// cursor unchanged, as does a cursor at or beyond the end of the log.
pub async fn read_records(path: &Path, cursor: u64, limit: Option<usize>) -> ReadPage {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return ReadPage::empty(cursor);
        }
        Err(e) => {
            log::error!("read_records: unexpected error reading {}: {e}", path.display());
            return ReadPage::empty(cursor);
        }
    };

    let lines: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    let start = usize::try_from(cursor).unwrap_or(usize::MAX);
    if start >= lines.len() {
        return ReadPage::empty(cursor);
    }

    let end = match limit {
        Some(limit) => lines.len().min(start.saturating_add(limit)),
        None => lines.len(),
    };

    let window = &lines[start..end];
    let mut records = Vec::with_capacity(window.len());
    for raw in window {
        match serde_json::from_str(raw) {
            Ok(value) => records.push(value),
            Err(_) => {
                log::error!("read_records: skipping malformed JSONL line: {raw}");
            }
        }
    }

    // next_cursor counts raw lines consumed, including any malformed ones
    // that were skipped
    ReadPage {
        records,
        next_cursor: cursor + window.len() as u64,
    }
}
