// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Classification history across review periods
//!
//! Read-only: the index opens every period store except the active one and
//! never writes to any of them.

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::period::{list_periods, period_start};
use crate::store::{latest_by_user, read_rows, ClassificationRecord};

/// A user's classification in one earlier period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub period_key: String,
    pub classification: String,
}

impl HistoryEntry {
    /// First date of the period
    pub fn period_start(&self) -> &str {
        period_start(&self.period_key)
    }
}

/// Lookup of prior-period classifications
pub struct HistoryIndex {
    /// Closed periods, newest first
    periods: Vec<(String, HashMap<String, ClassificationRecord>)>,
}

impl HistoryIndex {
    /// Open every period store under `history_dir` except `active_period`.
    /// Missing stores are ignored; unreadable or malformed ones are skipped
    /// with a warning.
    pub fn open(history_dir: &Path, active_period: Option<&str>) -> Self {
        let keys = match list_periods(history_dir) {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Cannot list periods under {:?}: {}", history_dir, e);
                Vec::new()
            }
        };

        let mut periods = Vec::new();
        for key in keys.into_iter().rev() {
            if Some(key.as_str()) == active_period {
                continue;
            }

            let store_path = history_dir.join(&key).join(format!("{}.jsonl", key));
            if !store_path.exists() {
                debug!("No store for period {}", key);
                continue;
            }

            match read_rows(&store_path) {
                Ok(rows) => periods.push((key, latest_by_user(rows))),
                Err(e) => warn!("Skipping period store {:?}: {}", store_path, e),
            }
        }

        Self { periods }
    }

    /// Classifications of `user_id` in earlier periods, most recent first
    pub fn lookup(&self, user_id: &str) -> Vec<HistoryEntry> {
        self.periods
            .iter()
            .filter_map(|(key, records)| {
                records.get(user_id).map(|record| HistoryEntry {
                    period_key: key.clone(),
                    classification: record.classification.clone(),
                })
            })
            .collect()
    }

    /// One-line summary of at most `limit` entries, e.g.
    /// `20240108: BLACK | 20240101: MALE`
    pub fn summary(&self, user_id: &str, limit: usize) -> Option<String> {
        let entries = self.lookup(user_id);
        if entries.is_empty() {
            return None;
        }
        let parts: Vec<String> = entries
            .iter()
            .take(limit)
            .map(|e| format!("{}: {}", e.period_start(), e.classification))
            .collect();
        Some(parts.join(" | "))
    }

    /// Number of closed periods that could be read
    pub fn period_count(&self) -> usize {
        self.periods.len()
    }
}
