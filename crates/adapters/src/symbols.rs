// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort enclosing-symbol resolution.
//!
//! Given a file and an anchor substring (the text an edit replaces), find
//! the 1-indexed line range of the anchor and walk upward to the nearest
//! shallow declaration. No parser: a fixed ordered set of regexes covers
//! function/method/class declarations across common syntaxes.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Resolved location of an edit anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRegion {
    pub start_line: u32,
    pub end_line: u32,
    pub enclosing_symbol: Option<String>,
}

/// Shallow declaration patterns, checked in order per line. Each has one
/// capture group: the symbol name.
fn declaration_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Rust
            r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+([A-Za-z_][A-Za-z0-9_]*)",
            // JavaScript / TypeScript functions
            r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)",
            // Python / Ruby
            r"^\s*(?:async\s+)?def\s+([A-Za-z_][\w]*)",
            // Go (receiver optional)
            r"^\s*func\s+(?:\([^)]*\)\s*)?([A-Za-z_][\w]*)",
            // Classes (JS/TS/Python/Java/...)
            r"^\s*(?:export\s+)?(?:abstract\s+)?(?:final\s+)?class\s+([A-Za-z_$][\w$]*)",
            // Arrow functions bound to a const/let/var
            r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)\s*=>",
            // Class methods with an access/static modifier (TS/Java/C#)
            r"^\s*(?:public|private|protected|static)[\w\s]*\s([A-Za-z_$][\w$]*)\s*\([^)]*\)\s*\{?\s*$",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Locate `needle` in `path` and name its enclosing declaration.
///
/// Fail-soft: unreadable files, absent needles, and empty needles all
/// yield `None`; the caller emits its event without enrichment.
pub fn resolve_region(path: &Path, needle: &str) -> Option<ResolvedRegion> {
    if needle.is_empty() {
        return None;
    }
    let content = std::fs::read_to_string(path).ok()?;
    resolve_in(&content, needle)
}

/// Pure core of [`resolve_region`], split out for tests.
pub(crate) fn resolve_in(content: &str, needle: &str) -> Option<ResolvedRegion> {
    let index = content.find(needle)?;

    let start_line = 1 + count_newlines(&content[..index]);
    let end_line = start_line + count_newlines(needle);

    let lines: Vec<&str> = content.lines().collect();
    let enclosing_symbol = enclosing_symbol(&lines, start_line);

    Some(ResolvedRegion {
        start_line,
        end_line,
        enclosing_symbol,
    })
}

fn count_newlines(s: &str) -> u32 {
    s.bytes().filter(|b| *b == b'\n').count() as u32
}

/// Walk upward from the line above the anchor; the nearest matching
/// declaration wins. The anchor line itself is excluded so an edit that
/// replaces a declaration is attributed to its enclosing scope.
fn enclosing_symbol(lines: &[&str], start_line: u32) -> Option<String> {
    let from = (start_line as usize).saturating_sub(1).min(lines.len());
    for line in lines[..from].iter().rev() {
        for pattern in declaration_patterns() {
            if let Some(caps) = pattern.captures(line) {
                if let Some(name) = caps.get(1) {
                    return Some(name.as_str().to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "symbols_tests.rs"]
mod tests;
