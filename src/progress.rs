// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Background count of the files waiting under a review root

use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::enumerator::is_image;

/// Snapshot published by the scanner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanProgress {
    /// Files visited by the second pass
    pub scanned: usize,
    /// Files found by the first pass
    pub total: usize,
    /// Image files among `scanned`
    pub images: usize,
    pub done: bool,
}

impl ScanProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return if self.done { 100.0 } else { 0.0 };
        }
        self.scanned as f64 / self.total as f64 * 100.0
    }
}

/// Count files under `root` on a blocking worker. The scan never touches
/// the files and nobody waits for it; drop the receiver to stop caring.
pub fn spawn_progress_scan(root: PathBuf, extensions: Vec<String>) -> watch::Receiver<ScanProgress> {
    let (tx, rx) = watch::channel(ScanProgress::default());

    tokio::task::spawn_blocking(move || {
        let files = || {
            WalkDir::new(&root)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(e) => Some(e),
                    Err(e) => {
                        warn!("Scan error: {}", e);
                        None
                    }
                })
                .filter(|e| e.file_type().is_file())
        };

        let total = files().count();
        tx.send_replace(ScanProgress { total, ..Default::default() });

        let mut progress = ScanProgress { total, ..Default::default() };
        for entry in files() {
            progress.scanned += 1;
            if is_image(entry.path(), &extensions) {
                progress.images += 1;
            }
            if tx.send(progress).is_err() {
                debug!("Progress receiver dropped, stopping scan");
                return;
            }
        }

        progress.done = true;
        tx.send_replace(progress);
        debug!("Scan of {:?} done: {} images in {} files", root, progress.images, total);
    });

    rx
}
