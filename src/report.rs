// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! End-of-session summary

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::session::ReviewSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// Totals of one finished session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub completed_at: DateTime<Local>,
    pub total_images: usize,
    pub problem_images: usize,
    /// Percentage of problem images, 0 when no image was seen
    pub problem_ratio: f64,
    pub labels: Vec<LabelCount>,
}

impl SessionReport {
    pub fn ratio_display(&self) -> String {
        format!("{:.2}%", self.problem_ratio)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Completed: {}", self.completed_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Total images: {}", self.total_images);
        let _ = writeln!(out, "Problem images: {}", self.problem_images);
        let _ = writeln!(out, "Problem ratio: {}", self.ratio_display());
        out.push('\n');
        for entry in &self.labels {
            let _ = writeln!(out, "{}: {}", entry.label, entry.count);
        }
        out
    }

    pub fn count(&self, label: &str) -> usize {
        self.labels
            .iter()
            .find(|l| l.label == label)
            .map(|l| l.count)
            .unwrap_or(0)
    }
}

pub struct ReportGenerator {
    labels: Vec<String>,
    format: ReportFormat,
    file_prefix: String,
}

impl ReportGenerator {
    pub fn new(labels: Vec<String>, format: ReportFormat, file_prefix: impl Into<String>) -> Self {
        Self {
            labels,
            format,
            file_prefix: file_prefix.into(),
        }
    }

    /// Summarise `session`. Labels are counted over the users finalized in
    /// this session; configured labels always appear, in configured order.
    pub fn generate(&self, session: &ReviewSession) -> SessionReport {
        let totals = session.totals();

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for label in session.classified().values() {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }

        let mut labels: Vec<LabelCount> = self
            .labels
            .iter()
            .map(|label| LabelCount {
                label: label.clone(),
                count: counts.remove(label.as_str()).unwrap_or(0),
            })
            .collect();
        labels.extend(counts.into_iter().map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        }));

        let problem_ratio = if totals.images_seen == 0 {
            0.0
        } else {
            totals.problem_images as f64 / totals.images_seen as f64 * 100.0
        };

        SessionReport {
            completed_at: Local::now(),
            total_images: totals.images_seen,
            problem_images: totals.problem_images,
            problem_ratio,
            labels,
        }
    }

    /// Write `report` into `dir`. Best-effort: a failure is logged and
    /// `None` returned; the classifications are already persisted.
    pub fn write(&self, report: &SessionReport, dir: &Path) -> Option<PathBuf> {
        let (extension, content) = match self.format {
            ReportFormat::Text => ("txt", Ok(report.render_text())),
            ReportFormat::Json => ("json", serde_json::to_string_pretty(report)),
        };

        let content = match content {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to encode report: {}", e);
                return None;
            }
        };

        let path = dir.join(format!(
            "{}_{}.{}",
            self.file_prefix,
            report.completed_at.format("%Y%m%d_%H%M%S"),
            extension
        ));

        match std::fs::write(&path, content) {
            Ok(()) => {
                info!("Report written: {:?}", path);
                Some(path)
            }
            Err(e) => {
                error!("Failed to write report {:?}: {}", path, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn finished_session(root: &Path) -> ReviewSession {
        let mut session = ReviewSession::new(root, vec!["a".into(), "b".into(), "c".into()], vec!["jpg".into()]);
        session.enter(0, vec!["a_1.jpg".into(), "a_2.jpg".into()], 0);
        session.commit("a", 2, None);
        session.enter(1, vec!["b_1.jpg".into(), "b_2.jpg".into()], 0);
        session.toggle("b_1.jpg").unwrap();
        session.commit("b", 2, Some("MALE"));
        session.enter(2, vec!["c_1.jpg".into()], 0);
        session.toggle("c_1.jpg").unwrap();
        session.commit("c", 1, Some("OTHER"));
        session.set_complete();
        session
    }

    #[test]
    fn test_generate_counts_and_ratio() {
        let dir = tempdir().unwrap();
        let session = finished_session(dir.path());
        let generator = ReportGenerator::new(vec!["NOLOOK".into(), "MALE".into()], ReportFormat::Text, "report");

        let report = generator.generate(&session);
        assert_eq!(report.total_images, 5);
        assert_eq!(report.problem_images, 2);
        assert_eq!(report.ratio_display(), "40.00%");
        assert_eq!(report.count("MALE"), 1);
        assert_eq!(report.count("NOLOOK"), 0);
        assert_eq!(report.count("OTHER"), 1);
        let order: Vec<&str> = report.labels.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(order, vec!["NOLOOK", "MALE", "OTHER"]);
    }

    #[test]
    fn test_empty_session_ratio_is_zero() {
        let dir = tempdir().unwrap();
        let session = ReviewSession::new(dir.path(), vec![], vec!["jpg".into()]);
        let report = ReportGenerator::new(vec!["MALE".into()], ReportFormat::Text, "r").generate(&session);
        assert_eq!(report.ratio_display(), "0.00%");
    }

    #[test]
    fn test_write_text_and_json() {
        let dir = tempdir().unwrap();
        let session = finished_session(dir.path());

        let text = ReportGenerator::new(vec!["MALE".into()], ReportFormat::Text, "classification_report");
        let report = text.generate(&session);
        let path = text.write(&report, dir.path()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("Total images: 5"));
        assert!(content.contains("Problem ratio: 40.00%"));
        assert!(content.contains("MALE: 1"));

        let json = ReportGenerator::new(vec!["MALE".into()], ReportFormat::Json, "classification_report");
        let path = json.write(&report, dir.path()).unwrap();
        assert_eq!(path.extension().unwrap(), "json");
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["problem_images"], 2);
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let dir = tempdir().unwrap();
        let session = finished_session(dir.path());
        let generator = ReportGenerator::new(vec![], ReportFormat::Text, "r");
        let report = generator.generate(&session);
        assert!(generator.write(&report, &dir.path().join("missing")).is_none());
    }
}
