// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Last review root, remembered between runs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeMarker {
    #[serde(default)]
    pub last_folder: Option<PathBuf>,
}

impl ResumeMarker {
    /// Read the marker. A missing or unreadable file gives an empty marker.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!("No resume marker at {:?}: {}", path, e);
                return Self::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring corrupt resume marker {:?}: {}", path, e);
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The remembered folder, if it still exists
    pub fn existing_folder(&self) -> Option<&Path> {
        self.last_folder.as_deref().filter(|p| p.is_dir())
    }
}
