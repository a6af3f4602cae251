// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Date tokens embedded in image filenames
//!
//! Two naming conventions exist in the collected data: `<id>_<date>.jpg`,
//! where the date follows the first underscore, and
//! `<prefix>_<more>_<date>.jpg`, where it follows the last one. The rule is
//! chosen by configuration; callers may also plug in their own extractor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cuts a date token out of an image filename
pub trait DateExtractor: Send + Sync {
    /// Returns `None` when the filename carries no recognisable token
    fn extract(&self, filename: &str) -> Option<String>;
}

impl<F> DateExtractor for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn extract(&self, filename: &str) -> Option<String> {
        self(filename)
    }
}

/// Built-in filename conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRule {
    /// Segment between the first `_` and the next `_`, cut at the first `.`
    FirstUnderscore,
    /// Segment after the last `_`, cut at the first `.`
    LastUnderscore,
}

impl DateExtractor for DateRule {
    fn extract(&self, filename: &str) -> Option<String> {
        let token = match self {
            DateRule::FirstUnderscore => {
                let (_, rest) = filename.split_once('_')?;
                let segment = rest.split('_').next().unwrap_or(rest);
                segment.split('.').next().unwrap_or(segment)
            }
            DateRule::LastUnderscore => {
                let (_, tail) = filename.rsplit_once('_')?;
                tail.split('.').next().unwrap_or(tail)
            }
        };

        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }
}

impl fmt::Display for DateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRule::FirstUnderscore => write!(f, "first_underscore"),
            DateRule::LastUnderscore => write!(f, "last_underscore"),
        }
    }
}

/// Extract dates from `filenames`, newest first. Names without a token are
/// logged and left out, as are tokens the store encoding cannot carry intact.
pub fn problem_dates<'a, I>(extractor: &dyn DateExtractor, filenames: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut dates: Vec<String> = filenames
        .into_iter()
        .filter_map(|name| {
            let date = match extractor.extract(name) {
                Some(date) => date,
                None => {
                    tracing::warn!("No date token in filename: {}", name);
                    return None;
                }
            };
            if !is_storable(&date) {
                tracing::warn!("Unstorable date token {:?} in filename: {}", date, name);
                return None;
            }
            Some(date)
        })
        .collect();
    dates.sort_unstable_by(|a, b| b.cmp(a));
    dates
}

/// Dates are stored comma-separated and trimmed on decode
fn is_storable(date: &str) -> bool {
    !date.contains(',') && date.trim() == date
}
