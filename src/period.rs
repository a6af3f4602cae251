// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Review period directory layout
//!
//! ```text
//! history/
//!   20240101-20240107/
//!     data/<user-id>/<images>      review root
//!     classified/<user-id>/        archive of problem images
//!     20240101-20240107.jsonl      classification store
//! ```

use chrono::{Datelike, Duration, NaiveDate};
use std::path::{Path, PathBuf};

use crate::config::ReviewConfig;
use crate::{CullerError, Result};

/// Paths belonging to one review period
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodLayout {
    /// Period key, the period directory's name
    pub key: String,
    pub dir: PathBuf,
    /// Folder holding one sub-folder per user
    pub data_dir: PathBuf,
    pub archive_dir: PathBuf,
    pub store_path: PathBuf,
}

impl PeriodLayout {
    /// Layout of the period stored in `dir`
    pub fn new(dir: &Path, review: &ReviewConfig) -> Self {
        let key = dir_name(dir);
        Self {
            data_dir: dir.join(&review.data_dir_name),
            archive_dir: dir.join(&review.archive_dir_name),
            store_path: dir.join(format!("{}.jsonl", key)),
            dir: dir.to_path_buf(),
            key,
        }
    }

    /// Layout for a review root. A root named like the data folder belongs
    /// to its parent period; any other root is treated as a flat period of
    /// its own.
    pub fn for_root(root: &Path, review: &ReviewConfig) -> Result<Self> {
        if !root.is_dir() {
            return Err(CullerError::RootNotFound(root.to_path_buf()));
        }

        let is_data_dir = root
            .file_name()
            .map(|n| n == review.data_dir_name.as_str())
            .unwrap_or(false);

        match root.parent() {
            Some(parent) if is_data_dir && !parent.as_os_str().is_empty() => {
                Ok(Self::new(parent, review))
            }
            _ => {
                let mut layout = Self::new(root, review);
                layout.data_dir = root.to_path_buf();
                Ok(layout)
            }
        }
    }

    /// Archive folder for one user
    pub fn user_archive(&self, user_id: &str) -> PathBuf {
        self.archive_dir.join(user_id)
    }

    /// First date of the period key (`20240101` for `20240101-20240107`)
    pub fn start(&self) -> &str {
        period_start(&self.key)
    }
}

pub fn period_start(key: &str) -> &str {
    key.split('-').next().unwrap_or(key)
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.to_string_lossy().into_owned())
}

/// Period directory names under `history_dir`, oldest first. A period is
/// any directory whose name starts with an ASCII digit.
pub fn list_periods(history_dir: &Path) -> Result<Vec<String>> {
    let mut periods: Vec<String> = std::fs::read_dir(history_dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(|c: char| c.is_ascii_digit()))
        .collect();
    periods.sort();
    Ok(periods)
}

/// Most recent period under `history_dir`
pub fn latest_period(history_dir: &Path, review: &ReviewConfig) -> Option<PeriodLayout> {
    match list_periods(history_dir) {
        Ok(periods) => periods
            .last()
            .map(|key| PeriodLayout::new(&history_dir.join(key), review)),
        Err(e) => {
            tracing::debug!("No periods under {:?}: {}", history_dir, e);
            None
        }
    }
}

/// Key of the Monday-to-Sunday week before the one containing `today`
pub fn previous_week_key(today: NaiveDate) -> String {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64 + 7);
    let sunday = monday + Duration::days(6);
    format!("{}-{}", monday.format("%Y%m%d"), sunday.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_previous_week_key() {
        // Wednesday
        let today = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        assert_eq!(previous_week_key(today), "20240108-20240114");
        // Monday
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(previous_week_key(today), "20240108-20240114");
    }

    #[test]
    fn test_for_root_with_data_dir() {
        let dir = tempdir().unwrap();
        let period = dir.path().join("20240101-20240107");
        let data = period.join("data");
        std::fs::create_dir_all(&data).unwrap();

        let layout = PeriodLayout::for_root(&data, &ReviewConfig::default()).unwrap();
        assert_eq!(layout.key, "20240101-20240107");
        assert_eq!(layout.data_dir, data);
        assert_eq!(layout.archive_dir, period.join("classified"));
        assert_eq!(layout.store_path, period.join("20240101-20240107.jsonl"));
        assert_eq!(layout.start(), "20240101");
    }

    #[test]
    fn test_for_root_flat() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("batch");
        std::fs::create_dir_all(&root).unwrap();

        let layout = PeriodLayout::for_root(&root, &ReviewConfig::default()).unwrap();
        assert_eq!(layout.data_dir, root);
        assert_eq!(layout.archive_dir, root.join("classified"));
    }

    #[test]
    fn test_for_root_missing() {
        let dir = tempdir().unwrap();
        let err = PeriodLayout::for_root(&dir.path().join("gone"), &ReviewConfig::default());
        assert!(matches!(err, Err(CullerError::RootNotFound(_))));
    }

    #[test]
    fn test_list_and_latest_period() {
        let dir = tempdir().unwrap();
        for name in ["20240108-20240114", "20240101-20240107", "notes", ".hidden"] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("2024.txt"), "").unwrap();

        let periods = list_periods(dir.path()).unwrap();
        assert_eq!(periods, vec!["20240101-20240107", "20240108-20240114"]);

        let latest = latest_period(dir.path(), &ReviewConfig::default()).unwrap();
        assert_eq!(latest.key, "20240108-20240114");
    }
}
