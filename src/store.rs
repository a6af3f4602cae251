// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Persistent user-id -> classification mapping for one review period
//!
//! The store is an append-only JSON Lines file. Each row carries the two
//! columns `ID` and `Classification_Dates`, the latter encoded as
//! `<label>_<date>,<date>,...`. Rows are never rewritten: a user reviewed
//! twice appears twice, and loading keeps the last row per user.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::{CullerError, Result};

/// Final decision for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub classification: String,
    /// Dates of the problem images, newest first
    pub problem_dates: Vec<String>,
}

impl ClassificationRecord {
    pub fn new(classification: impl Into<String>, problem_dates: Vec<String>) -> Self {
        Self {
            classification: classification.into(),
            problem_dates,
        }
    }

    /// Encode as `<label>_<comma-separated-dates>`
    pub fn encode(&self) -> String {
        format!("{}_{}", self.classification, self.problem_dates.join(","))
    }

    /// Decode `<label>_<dates>`, splitting on the first `_`. A value without
    /// `_` is a bare label with no dates.
    pub fn decode(value: &str) -> Self {
        match value.split_once('_') {
            Some((label, dates)) => Self {
                classification: label.to_string(),
                problem_dates: dates
                    .split(',')
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(String::from)
                    .collect(),
            },
            None => Self {
                classification: value.to_string(),
                problem_dates: Vec::new(),
            },
        }
    }
}

/// One persisted row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRow {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Classification_Dates")]
    pub classification_dates: String,
}

impl StoreRow {
    pub fn new(user_id: &str, record: &ClassificationRecord) -> Self {
        Self {
            id: user_id.to_string(),
            classification_dates: record.encode(),
        }
    }

    pub fn record(&self) -> ClassificationRecord {
        ClassificationRecord::decode(&self.classification_dates)
    }
}

/// Append one row to the store at `path`, creating the file if needed
pub fn append_row(path: &Path, user_id: &str, record: &ClassificationRecord) -> Result<()> {
    let persist = |source| CullerError::Persistence {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(persist)?;

    let json = serde_json::to_string(&StoreRow::new(user_id, record))?;
    writeln!(file, "{}", json).map_err(persist)?;

    Ok(())
}

/// Read every row, failing on the first malformed line
pub fn read_rows(path: &Path) -> Result<Vec<StoreRow>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        rows.push(serde_json::from_str(&line)?);
    }

    Ok(rows)
}

/// Collapse rows to one record per user, last row wins
pub fn latest_by_user(rows: Vec<StoreRow>) -> HashMap<String, ClassificationRecord> {
    rows.into_iter()
        .map(|row| {
            let record = row.record();
            (row.id, record)
        })
        .collect()
}

/// In-memory view of one period's store, written through on every insert
pub struct ClassificationStore {
    path: PathBuf,
    records: HashMap<String, ClassificationRecord>,
    /// Users whose latest record has not reached the file yet
    unsaved: Vec<String>,
}

impl ClassificationStore {
    /// Load the store at `path`. An absent or unreadable file yields an
    /// empty store; malformed lines are skipped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut records = HashMap::new();

        if !path.exists() {
            info!("No classification store at {:?}, starting empty", path);
            return Self::empty(path);
        }

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                error!("Cannot read classification store {:?}: {}", path, e);
                return Self::empty(path);
            }
        };

        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    error!("Classification store {:?} unreadable: {}", path, e);
                    return Self::empty(path);
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoreRow>(&line) {
                Ok(row) => {
                    let record = row.record();
                    records.insert(row.id, record);
                }
                Err(e) => warn!("Skipping malformed row {} in {:?}: {}", number + 1, path, e),
            }
        }

        info!("Loaded {} classified users from {:?}", records.len(), path);
        Self {
            path,
            records,
            unsaved: Vec::new(),
        }
    }

    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            records: HashMap::new(),
            unsaved: Vec::new(),
        }
    }

    /// Record a classification and append it to the file at once. The
    /// in-memory record is kept even when the write fails.
    pub fn append(&mut self, user_id: &str, record: ClassificationRecord) -> Result<()> {
        self.records.insert(user_id.to_string(), record);
        let record = &self.records[user_id];

        match append_row(&self.path, user_id, record) {
            Ok(()) => {
                debug!("Stored {} -> {}", user_id, record.encode());
                self.unsaved.retain(|u| u != user_id);
                Ok(())
            }
            Err(e) => {
                if !self.unsaved.iter().any(|u| u == user_id) {
                    self.unsaved.push(user_id.to_string());
                }
                Err(e)
            }
        }
    }

    /// Retry writing every record whose append failed. Returns how many
    /// were written.
    pub fn flush_unsaved(&mut self) -> Result<usize> {
        let pending = std::mem::take(&mut self.unsaved);
        let mut written = 0;

        for (i, user_id) in pending.iter().enumerate() {
            let Some(record) = self.records.get(user_id) else {
                continue;
            };
            if let Err(e) = append_row(&self.path, user_id, record) {
                self.unsaved.extend(pending[i..].iter().cloned());
                return Err(e);
            }
            written += 1;
        }

        Ok(written)
    }

    /// Write the whole in-memory mapping as pretty JSON
    pub fn export(&self, output: &Path) -> Result<usize> {
        let sorted: std::collections::BTreeMap<_, _> = self.records.iter().collect();
        let json = serde_json::to_string_pretty(&sorted)?;
        std::fs::write(output, json)?;
        Ok(sorted.len())
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.records.contains_key(user_id)
    }

    pub fn get(&self, user_id: &str) -> Option<&ClassificationRecord> {
        self.records.get(user_id)
    }

    pub fn records(&self) -> &HashMap<String, ClassificationRecord> {
        &self.records
    }

    pub fn unsaved(&self) -> &[String] {
        &self.unsaved
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
