// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! State of one review pass over a root folder
//!
//! The session is the in-memory record of what the reviewer has seen: the
//! work queue, the cursor, the problem set of the current user and the
//! running totals. What still exists on disk is probed lazily by the
//! navigator; the session never re-syncs itself from the file system.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::enumerator::list_images;
use crate::navigator::Prompt;
use crate::{CullerError, Result};

/// Running totals for the end-of-session report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTotals {
    /// Images present in finalized folders
    pub images_seen: usize,
    /// Problem images in finalized folders
    pub problem_images: usize,
    /// Live mark count: `problem_images` plus the current problem set
    pub marked: usize,
}

/// Where the reviewer currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub user_index: usize,
    pub user_count: usize,
    pub user_id: String,
    pub image_index: usize,
    pub image_count: usize,
    pub image: String,
    pub is_problem: bool,
}

/// On-disk state of a queued user folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderState {
    Missing,
    Empty,
    Images(Vec<String>),
}

pub struct ReviewSession {
    root: PathBuf,
    extensions: Vec<String>,
    queue: Vec<String>,
    user_index: usize,
    image_index: usize,
    /// Images of the current user, as listed when the user was entered
    images: Vec<String>,
    problems: BTreeSet<String>,
    totals: SessionTotals,
    /// Latest label per user finalized in this session
    classified: BTreeMap<String, String>,
    prompt: Option<Prompt>,
    entered: bool,
}

impl ReviewSession {
    pub fn new(root: impl Into<PathBuf>, queue: Vec<String>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions,
            queue,
            user_index: 0,
            image_index: 0,
            images: Vec::new(),
            problems: BTreeSet::new(),
            totals: SessionTotals::default(),
            classified: BTreeMap::new(),
            prompt: None,
            entered: false,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn queue(&self) -> &[String] {
        &self.queue
    }

    pub fn user_index(&self) -> usize {
        self.user_index
    }

    pub fn image_index(&self) -> usize {
        self.image_index
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn problems(&self) -> &BTreeSet<String> {
        &self.problems
    }

    pub fn totals(&self) -> SessionTotals {
        self.totals
    }

    pub fn classified(&self) -> &BTreeMap<String, String> {
        &self.classified
    }

    pub fn pending_prompt(&self) -> Option<&Prompt> {
        self.prompt.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.user_index >= self.queue.len()
    }

    /// Current user id, once the navigator has entered a folder
    pub fn current_user(&self) -> Option<&str> {
        if !self.entered || self.is_complete() {
            return None;
        }
        self.queue.get(self.user_index).map(String::as_str)
    }

    pub fn current_image(&self) -> Option<&str> {
        self.current_user()?;
        self.images.get(self.image_index).map(String::as_str)
    }

    pub fn current_folder(&self) -> Option<PathBuf> {
        self.current_user().map(|u| self.root.join(u))
    }

    pub fn position(&self) -> Option<Position> {
        let user_id = self.current_user()?;
        let image = self.images.get(self.image_index)?;
        Some(Position {
            user_index: self.user_index,
            user_count: self.queue.len(),
            user_id: user_id.to_string(),
            image_index: self.image_index,
            image_count: self.images.len(),
            image: image.clone(),
            is_problem: self.problems.contains(image),
        })
    }

    /// Probe what remains on disk for the queued user at `index`
    pub fn probe(&self, index: usize) -> FolderState {
        let Some(user_id) = self.queue.get(index) else {
            return FolderState::Missing;
        };
        let folder = self.root.join(user_id);
        if !folder.is_dir() {
            return FolderState::Missing;
        }
        match list_images(&folder, &self.extensions) {
            Ok(images) if images.is_empty() => FolderState::Empty,
            Ok(images) => FolderState::Images(images),
            Err(e) => {
                warn!("Cannot list {:?}: {}", folder, e);
                FolderState::Missing
            }
        }
    }

    /// Move the cursor to another user. The problem set belongs to the user
    /// being left and is discarded.
    pub(crate) fn enter(&mut self, index: usize, images: Vec<String>, image_index: usize) -> Position {
        self.discard_problems();
        self.user_index = index;
        self.image_index = image_index.min(images.len().saturating_sub(1));
        self.images = images;
        self.entered = true;

        Position {
            user_index: index,
            user_count: self.queue.len(),
            user_id: self.queue[index].clone(),
            image_index: self.image_index,
            image_count: self.images.len(),
            image: self.images.get(self.image_index).cloned().unwrap_or_default(),
            is_problem: false,
        }
    }

    pub(crate) fn set_image_index(&mut self, index: usize) {
        self.image_index = index;
    }

    pub(crate) fn set_complete(&mut self) {
        self.discard_problems();
        self.user_index = self.queue.len();
        self.image_index = 0;
        self.images.clear();
        self.entered = true;
    }

    pub(crate) fn set_prompt(&mut self, prompt: Prompt) {
        self.prompt = Some(prompt);
    }

    pub(crate) fn take_prompt(&mut self) -> Option<Prompt> {
        self.prompt.take()
    }

    /// Flip the problem mark of `image` in the current folder. Returns
    /// whether it is marked afterwards.
    pub(crate) fn toggle(&mut self, image: &str) -> Result<bool> {
        let user_id = self.current_user().unwrap_or_default().to_string();
        if user_id.is_empty() || !self.images.iter().any(|i| i == image) {
            return Err(CullerError::NotInFolder {
                user_id,
                image: image.to_string(),
            });
        }

        if self.problems.remove(image) {
            self.totals.marked -= 1;
            Ok(false)
        } else {
            self.problems.insert(image.to_string());
            self.totals.marked += 1;
            Ok(true)
        }
    }

    /// Fold a finalized user into the totals
    pub(crate) fn commit(&mut self, user_id: &str, image_count: usize, label: Option<&str>) {
        let problem_count = self.problems.len();
        self.totals.images_seen += image_count;
        // `marked` is unchanged: the marks move from the set into the total
        self.totals.problem_images += problem_count;
        self.problems.clear();
        if let Some(label) = label {
            self.classified.insert(user_id.to_string(), label.to_string());
        }
    }

    fn discard_problems(&mut self) {
        self.totals.marked -= self.problems.len();
        self.problems.clear();
    }
}
