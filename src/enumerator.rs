// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Discovery of user folders and their images

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::store::ClassificationStore;
use crate::{CullerError, Result};

/// Builds the work queue for a review session
pub struct FolderEnumerator {
    root: PathBuf,
    /// Folder names under the root that never hold a user (the archive in a
    /// flat layout)
    reserved: Vec<String>,
}

impl FolderEnumerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reserved: Vec::new(),
        }
    }

    /// Never enqueue a folder with this name
    pub fn reserve(mut self, name: impl Into<String>) -> Self {
        self.reserved.push(name.into());
        self
    }

    /// User ids under the root that the store does not know yet, sorted.
    /// An empty result means there is nothing left to review.
    pub fn enumerate(&self, store: &ClassificationStore) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(CullerError::RootNotFound(self.root.clone()));
        }

        let mut users: Vec<String> = std::fs::read_dir(&self.root)
            .map_err(|_| CullerError::RootNotFound(self.root.clone()))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.'))
            .filter(|name| !self.reserved.iter().any(|r| r == name))
            .filter(|name| {
                let known = store.contains(name);
                if known {
                    debug!("Already classified, skipping: {}", name);
                }
                !known
            })
            .collect();

        users.sort();
        Ok(users)
    }
}

/// Image filenames in `folder`, sorted. Names embed their capture date, so
/// lexicographic order is chronological.
pub fn list_images(folder: &Path, extensions: &[String]) -> std::io::Result<Vec<String>> {
    let mut images: Vec<String> = std::fs::read_dir(folder)?
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .filter_map(|e| e.file_name().to_str().map(String::from))
        .filter(|name| is_image(Path::new(name), extensions))
        .collect();
    images.sort();
    Ok(images)
}

/// Check if a file is a reviewable image
pub fn is_image(path: &Path, extensions: &[String]) -> bool {
    let filename = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n,
        None => return false,
    };

    // Skip hidden files
    if filename.starts_with('.') {
        return false;
    }

    // Skip partial downloads
    let temp_extensions = [".tmp", ".part", ".crdownload", ".partial", ".download"];
    if temp_extensions.iter().any(|ext| filename.ends_with(ext)) {
        return false;
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}
