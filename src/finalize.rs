// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Irreversible end-of-user step: archive problem images, delete the rest,
//! record the classification
//!
//! Every image is its own unit of failure. A failed move or delete is
//! logged and reported in the outcome; it never stops the remaining images
//! from being processed.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::dates::{problem_dates, DateExtractor};
use crate::period::PeriodLayout;
use crate::session::ReviewSession;
use crate::store::{ClassificationRecord, ClassificationStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    CreateArchive,
    Move,
    Delete,
    RemoveFolder,
}

/// A single file operation that did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub action: FileAction,
    pub path: PathBuf,
    pub error: String,
}

/// Whether the classification reached the store file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    /// No label was given, nothing to store
    NotRequired,
    Saved,
    /// Kept in memory only
    Failed(String),
}

/// Everything a finalize did, for display and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeOutcome {
    pub user_id: String,
    pub label: Option<String>,
    pub moved: Vec<String>,
    pub deleted: Vec<String>,
    pub failures: Vec<FileFailure>,
    pub folder_removed: bool,
    pub persistence: Persistence,
}

impl FinalizeOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !matches!(self.persistence, Persistence::Failed(_))
    }
}

/// Applies review decisions to the dataset and the period store
pub struct FinalizeEngine {
    store: ClassificationStore,
    layout: PeriodLayout,
    dates: Box<dyn DateExtractor>,
}

impl FinalizeEngine {
    pub fn new(store: ClassificationStore, layout: PeriodLayout, dates: Box<dyn DateExtractor>) -> Self {
        Self { store, layout, dates }
    }

    /// Finalize the session's current user and fold the result into the
    /// session totals. `None` when no user is current.
    pub fn finalize(&mut self, session: &mut ReviewSession, label: Option<&str>) -> Option<FinalizeOutcome> {
        let user_id = session.current_user()?.to_string();
        let folder = session.root().join(&user_id);
        let images = session.images().to_vec();

        let outcome = self.finalize_user(&folder, &user_id, &images, session.problems(), label);
        session.commit(&user_id, images.len(), label);
        Some(outcome)
    }

    /// Finalize one user folder. `images` is the listing taken when the
    /// user was entered; `problems` must be a subset of it.
    pub fn finalize_user(
        &mut self,
        folder: &Path,
        user_id: &str,
        images: &[String],
        problems: &BTreeSet<String>,
        label: Option<&str>,
    ) -> FinalizeOutcome {
        let mut outcome = FinalizeOutcome {
            user_id: user_id.to_string(),
            label: label.map(String::from),
            moved: Vec::new(),
            deleted: Vec::new(),
            failures: Vec::new(),
            folder_removed: false,
            persistence: Persistence::NotRequired,
        };

        // Archive problem images
        if label.is_some() && !problems.is_empty() {
            let archive = self.layout.user_archive(user_id);
            if let Err(e) = std::fs::create_dir_all(&archive) {
                error!("Cannot create archive folder {:?}: {}", archive, e);
                outcome.failures.push(failure(FileAction::CreateArchive, &archive, &e));
            }

            for image in problems {
                let source = folder.join(image);
                let target = archive.join(image);
                match std::fs::rename(&source, &target) {
                    Ok(()) => {
                        info!("Moved image: {:?} -> {:?}", source, target);
                        outcome.moved.push(image.clone());
                    }
                    Err(e) => {
                        error!("Failed to move {:?}: {}", source, e);
                        outcome.failures.push(failure(FileAction::Move, &source, &e));
                    }
                }
            }
        }

        // Delete everything that was not marked
        for image in images.iter().filter(|i| !problems.contains(*i)) {
            let path = folder.join(image);
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    info!("Deleted image: {:?}", path);
                    outcome.deleted.push(image.clone());
                }
                Err(e) => {
                    error!("Failed to delete {:?}: {}", path, e);
                    outcome.failures.push(failure(FileAction::Delete, &path, &e));
                }
            }
        }

        outcome.folder_removed = match remove_empty_folder(folder) {
            Ok(removed) => removed,
            Err(e) => {
                outcome.failures.push(failure(FileAction::RemoveFolder, folder, &e));
                false
            }
        };

        if let Some(label) = label {
            let dates = problem_dates(self.dates.as_ref(), problems);
            let record = ClassificationRecord::new(label, dates);
            outcome.persistence = match self.store.append(user_id, record) {
                Ok(()) => Persistence::Saved,
                Err(e) => {
                    error!("Classification for {} kept in memory only: {}", user_id, e);
                    Persistence::Failed(e.to_string())
                }
            };
        }

        outcome
    }

    pub fn store(&self) -> &ClassificationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ClassificationStore {
        &mut self.store
    }

    pub fn layout(&self) -> &PeriodLayout {
        &self.layout
    }
}

/// Remove `folder` if it holds nothing. `Ok(true)` when the folder is gone
/// afterwards, `Ok(false)` when it still has entries.
pub fn remove_empty_folder(folder: &Path) -> std::io::Result<bool> {
    let mut entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(true),
        Err(e) => {
            error!("Cannot inspect folder {:?}: {}", folder, e);
            return Err(e);
        }
    };

    if entries.next().is_some() {
        warn!("Folder not empty, keeping it: {:?}", folder);
        return Ok(false);
    }

    match std::fs::remove_dir(folder) {
        Ok(()) => {
            info!("Removed empty folder: {:?}", folder);
            Ok(true)
        }
        Err(e) => {
            error!("Failed to remove folder {:?}: {}", folder, e);
            Err(e)
        }
    }
}

fn failure(action: FileAction, path: &Path, error: &std::io::Error) -> FileFailure {
    FileFailure {
        action,
        path: path.to_path_buf(),
        error: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReviewConfig;
    use crate::dates::DateRule;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        _dir: TempDir,
        layout: PeriodLayout,
    }

    fn fixture(users: &[(&str, &[&str])]) -> Fixture {
        let dir = tempdir().unwrap();
        let period = dir.path().join("20240101-20240107");
        let data = period.join("data");
        for (user, images) in users {
            std::fs::create_dir_all(data.join(user)).unwrap();
            for image in *images {
                std::fs::write(data.join(user).join(image), b"img").unwrap();
            }
        }
        let layout = PeriodLayout::for_root(&data, &ReviewConfig::default()).unwrap();
        Fixture { _dir: dir, layout }
    }

    fn engine(layout: &PeriodLayout) -> FinalizeEngine {
        let store = ClassificationStore::load(&layout.store_path);
        FinalizeEngine::new(store, layout.clone(), Box::new(DateRule::FirstUnderscore))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classified_user_archives_problems_and_deletes_rest() {
        let fx = fixture(&[("B", &["B_20240101.jpg", "B_20240102.jpg", "B_20240103.jpg"])]);
        let mut engine = engine(&fx.layout);
        let folder = fx.layout.data_dir.join("B");
        let images = names(&["B_20240101.jpg", "B_20240102.jpg", "B_20240103.jpg"]);
        let problems: BTreeSet<String> = names(&["B_20240101.jpg", "B_20240103.jpg"]).into_iter().collect();

        let outcome = engine.finalize_user(&folder, "B", &images, &problems, Some("FLAGGED"));

        assert!(outcome.is_clean());
        assert_eq!(outcome.deleted, vec!["B_20240102.jpg"]);
        assert_eq!(outcome.moved.len(), 2);
        assert!(outcome.folder_removed);
        assert!(!folder.exists());

        let archive = fx.layout.user_archive("B");
        assert!(archive.join("B_20240101.jpg").exists());
        assert!(archive.join("B_20240103.jpg").exists());

        let record = engine.store().get("B").unwrap();
        assert_eq!(record.classification, "FLAGGED");
        assert_eq!(record.problem_dates, vec!["20240103", "20240101"]);
        assert_eq!(outcome.persistence, Persistence::Saved);
    }

    #[test]
    fn test_unclassified_user_deletes_everything() {
        let fx = fixture(&[("A", &["A_1.jpg", "A_2.jpg"])]);
        let mut engine = engine(&fx.layout);
        let folder = fx.layout.data_dir.join("A");

        let outcome = engine.finalize_user(&folder, "A", &names(&["A_1.jpg", "A_2.jpg"]), &BTreeSet::new(), None);

        assert_eq!(outcome.deleted.len(), 2);
        assert!(outcome.folder_removed);
        assert_eq!(outcome.persistence, Persistence::NotRequired);
        assert!(engine.store().is_empty());
        assert!(!fx.layout.archive_dir.join("A").exists());
    }

    #[test]
    fn test_missing_image_does_not_stop_the_rest() {
        let fx = fixture(&[("C", &["C_1.jpg", "C_3.jpg"])]);
        let mut engine = engine(&fx.layout);
        let folder = fx.layout.data_dir.join("C");
        // C_2.jpg vanished after the folder was listed
        let images = names(&["C_1.jpg", "C_2.jpg", "C_3.jpg"]);

        let outcome = engine.finalize_user(&folder, "C", &images, &BTreeSet::new(), None);

        assert_eq!(outcome.deleted, vec!["C_1.jpg", "C_3.jpg"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].action, FileAction::Delete);
        assert!(outcome.folder_removed);
    }

    #[test]
    fn test_failed_move_leaves_image_in_place() {
        let fx = fixture(&[("D", &["D_20240101.jpg", "D_20240102.jpg"])]);
        let mut engine = engine(&fx.layout);
        let folder = fx.layout.data_dir.join("D");
        let images = names(&["D_20240101.jpg", "D_20240102.jpg"]);
        // D_20240109.jpg is marked but no longer on disk
        let problems: BTreeSet<String> = names(&["D_20240101.jpg", "D_20240109.jpg"]).into_iter().collect();

        let outcome = engine.finalize_user(&folder, "D", &images, &problems, Some("BLACK"));

        assert_eq!(outcome.moved, vec!["D_20240101.jpg"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].action, FileAction::Move);
        assert_eq!(outcome.deleted, vec!["D_20240102.jpg"]);
        assert_eq!(engine.store().get("D").unwrap().problem_dates, vec!["20240109", "20240101"]);
    }

    #[test]
    fn test_folder_with_leftovers_is_kept() {
        let fx = fixture(&[("E", &["E_1.jpg"])]);
        let folder = fx.layout.data_dir.join("E");
        std::fs::write(folder.join("notes.txt"), "keep").unwrap();
        let mut engine = engine(&fx.layout);

        let outcome = engine.finalize_user(&folder, "E", &names(&["E_1.jpg"]), &BTreeSet::new(), None);

        assert!(!outcome.folder_removed);
        assert!(outcome.failures.is_empty());
        assert!(folder.join("notes.txt").exists());
    }
}
