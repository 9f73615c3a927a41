// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Offset-tracked tail reads over an append-only JSONL journal.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// Result of one incremental read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRead {
    /// Complete records, in file order, newline stripped.
    pub records: Vec<String>,
    /// Byte offset covering everything in `records` (plus separators).
    pub new_offset: u64,
    /// The file shrank below the caller's offset; state must be reset.
    pub truncated: bool,
}

impl JournalRead {
    fn empty(offset: u64) -> Self {
        Self {
            records: Vec::new(),
            new_offset: offset,
            truncated: false,
        }
    }
}

/// Read complete records appended after `offset`.
///
/// A trailing partial line (no terminating newline) is not yielded and its
/// bytes are not counted: re-reading from `new_offset` after the writer
/// finishes the line yields it exactly once. A missing file is a no-op read;
/// directory events will surface it again. A file shorter than `offset`
/// reports `truncated` so the caller can reset its state for the path.
pub fn read_records(path: &Path, offset: u64) -> std::io::Result<JournalRead> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(JournalRead::empty(offset))
        }
        Err(e) => return Err(e),
    };

    let len = file.metadata()?.len();
    if len < offset {
        return Ok(JournalRead {
            records: Vec::new(),
            new_offset: offset,
            truncated: true,
        });
    }
    if len == offset {
        return Ok(JournalRead::empty(offset));
    }

    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(offset))?;

    let mut records = Vec::new();
    let mut new_offset = offset;
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(n) => {
                if !line.ends_with('\n') {
                    // Incomplete tail; re-read next time
                    break;
                }
                new_offset += n as u64;
                let trimmed = line.trim_end_matches(['\n', '\r']);
                if !trimmed.trim().is_empty() {
                    records.push(trimmed.to_string());
                }
            }
            Err(e) => return Err(e),
        }
    }

    Ok(JournalRead {
        records,
        new_offset,
        truncated: false,
    })
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
