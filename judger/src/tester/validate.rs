//! Static screening of submitted source text.
//!
//! The screen is a denylist of regular expressions over the raw text. It is
//! not a parser: comments and string literals are scanned like code, and a
//! banned identifier rebuilt at runtime (`this["glob" + "alThis"]`) slips
//! through. The engine context is the real boundary; this only turns the
//! obvious attempts into a readable rejection before anything runs.

use err_derive::Error;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Which family of escape primitive a rejected source reached for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum BlockedCategory {
    ModuleLoading,
    Network,
    SharedMemory,
    WorkerLoading,
    GlobalScope,
}

impl Display for BlockedCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BlockedCategory::ModuleLoading => "module loading",
            BlockedCategory::Network => "network access",
            BlockedCategory::SharedMemory => "shared memory",
            BlockedCategory::WorkerLoading => "worker scripts",
            BlockedCategory::GlobalScope => "global scope access",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(display = "Disallowed code ({}): `{}` is not allowed", category, token)]
pub struct ValidationError {
    pub category: BlockedCategory,
    /// The text that matched.
    pub token: String,
}

/// Checked in order; the first hit wins. Word boundaries are ASCII-only, as
/// `\b` is in a JavaScript regex, so `자self` still counts as `self`.
const DENYLIST: &[(BlockedCategory, &str)] = &[
    (BlockedCategory::WorkerLoading, r"(?-u:\b)importScripts(?-u:\b)"),
    (BlockedCategory::WorkerLoading, r"(?-u:\b)(?:Shared)?Worker\s*\("),
    (BlockedCategory::ModuleLoading, r"(?-u:\b)import(?-u:\b)"),
    (BlockedCategory::ModuleLoading, r"(?-u:\b)require\s*\("),
    (BlockedCategory::Network, r"(?-u:\b)fetch\s*\("),
    (BlockedCategory::Network, r"(?-u:\b)XMLHttpRequest(?-u:\b)"),
    (BlockedCategory::Network, r"(?-u:\b)WebSocket(?-u:\b)"),
    (BlockedCategory::SharedMemory, r"(?-u:\b)SharedArrayBuffer(?-u:\b)"),
    (BlockedCategory::SharedMemory, r"(?-u:\b)Atomics(?-u:\b)"),
    (BlockedCategory::GlobalScope, r"(?-u:\b)globalThis(?-u:\b)"),
    (BlockedCategory::GlobalScope, r"(?-u:\b)self(?-u:\b)"),
];

static RULES: Lazy<Vec<(BlockedCategory, Regex)>> = Lazy::new(|| {
    DENYLIST
        .iter()
        .filter_map(|&(category, pattern)| match Regex::new(pattern) {
            Ok(re) => Some((category, re)),
            Err(e) => {
                tracing::error!(%pattern, "Bad denylist pattern: {}", e);
                None
            }
        })
        .collect()
});

/// Reject `source` if it contains a denylisted pattern.
///
/// Stops at the first match. Has no side effects and never executes
/// anything.
pub fn validate(source: &str) -> Result<(), ValidationError> {
    for (category, re) in RULES.iter() {
        if let Some(m) = re.find(source) {
            return Err(ValidationError {
                category: *category,
                token: m.as_str().to_owned(),
            });
        }
    }
    Ok(())
}
