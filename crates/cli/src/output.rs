// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output mode selection for `ovl check`.

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Bare JSON for tooling
    Json,
    /// Editor-hook protocol: payload on stdin, hook JSON on stdout
    Hook,
}
