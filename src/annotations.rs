// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Per-image annotations from an external age-inference run
//!
//! Annotations are shown next to an image and have no effect on review.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub predicted_age: Option<f64>,
    pub age_range: Option<String>,
    pub confidence: Option<f64>,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(age) = self.predicted_age {
            parts.push(format!("age {:.0}", age));
        }
        if let Some(range) = &self.age_range {
            parts.push(format!("range {}", range));
        }
        if let Some(confidence) = self.confidence {
            parts.push(format!("confidence {:.2}", confidence));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Anything that can annotate an image of a user
pub trait AnnotationSource: Send + Sync {
    fn annotate(&self, user_id: &str, image: &str) -> Option<Annotation>;
}

#[derive(Debug, Deserialize)]
struct AnnotationRow {
    #[serde(alias = "fbUid")]
    user_id: String,
    image_name: String,
    #[serde(default)]
    predicted_age: Option<f64>,
    #[serde(default)]
    age_range: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Annotations read from a JSON array file
#[derive(Debug, Default)]
pub struct JsonAnnotations {
    entries: HashMap<(String, String), Annotation>,
}

impl JsonAnnotations {
    /// Load `path`. A missing or invalid file yields an empty source.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Annotations unavailable at {:?}: {}", path, e);
                return Self::default();
            }
        };

        let rows: Vec<AnnotationRow> = match serde_json::from_str(&content) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Invalid annotations file {:?}: {}", path, e);
                return Self::default();
            }
        };

        let entries: HashMap<_, _> = rows
            .into_iter()
            .map(|row| {
                (
                    (row.user_id, row.image_name),
                    Annotation {
                        predicted_age: row.predicted_age,
                        age_range: row.age_range,
                        confidence: row.confidence,
                    },
                )
            })
            .collect();

        info!("Loaded {} annotations from {:?}", entries.len(), path);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AnnotationSource for JsonAnnotations {
    fn annotate(&self, user_id: &str, image: &str) -> Option<Annotation> {
        let found = self
            .entries
            .get(&(user_id.to_string(), image.to_string()))
            .cloned();
        if found.is_none() {
            debug!("No annotation for {}/{}", user_id, image);
        }
        found
    }
}

/// Source used when no annotations file is configured
pub struct NoAnnotations;

impl AnnotationSource for NoAnnotations {
    fn annotate(&self, _user_id: &str, _image: &str) -> Option<Annotation> {
        None
    }
}
