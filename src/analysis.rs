// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Per-period statistics over the classification stores

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

use crate::period::list_periods;
use crate::store::{latest_by_user, read_rows};
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct LabelShare {
    pub label: String,
    pub count: usize,
    pub percent: f64,
}

/// Summary of one period's store
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodStats {
    pub period_key: String,
    pub users: usize,
    /// Sorted by label
    pub labels: Vec<LabelShare>,
    pub problem_dates: usize,
}

impl fmt::Display for PeriodStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {} users, {} problem dates", self.period_key, self.users, self.problem_dates)?;
        for share in &self.labels {
            writeln!(f, "  {:<10} {:>5} ({:.1}%)", share.label, share.count, share.percent)?;
        }
        Ok(())
    }
}

/// Statistics for the store at `path`
pub fn period_stats(period_key: &str, path: &Path) -> Result<PeriodStats> {
    let records = latest_by_user(read_rows(path)?);

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dates: BTreeSet<&str> = BTreeSet::new();
    for record in records.values() {
        *counts.entry(record.classification.as_str()).or_insert(0) += 1;
        dates.extend(record.problem_dates.iter().map(String::as_str));
    }

    let users = records.len();
    let labels = counts
        .into_iter()
        .map(|(label, count)| LabelShare {
            label: label.to_string(),
            count,
            percent: if users == 0 { 0.0 } else { count as f64 / users as f64 * 100.0 },
        })
        .collect();

    Ok(PeriodStats {
        period_key: period_key.to_string(),
        users,
        labels,
        problem_dates: dates.len(),
    })
}

/// Statistics for every period with a readable store, oldest first
pub fn analyze_history(history_dir: &Path) -> Result<Vec<PeriodStats>> {
    let mut stats = Vec::new();
    for key in list_periods(history_dir)? {
        let path = history_dir.join(&key).join(format!("{}.jsonl", key));
        if !path.exists() {
            debug!("Period {} has no store yet", key);
            continue;
        }
        match period_stats(&key, &path) {
            Ok(s) => stats.push(s),
            Err(e) => warn!("Skipping malformed store {:?}: {}", path, e),
        }
    }
    Ok(stats)
}
