// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Review navigation state machine
//!
//! The navigator moves a [`ReviewSession`] cursor over users and images and
//! triggers the finalize step when the reviewer leaves a user. Folders are
//! deleted while the session runs, so every move into another user probes
//! the disk first. A vanished folder met while moving backwards is never
//! skipped silently: the navigator returns [`Prompt::StaleFolder`] and waits
//! for the reviewer's answer.
//!
//! Calls are synchronous. Each returns a [`Step`] describing the new state,
//! or a [`Prompt`] the reviewer surface must answer via
//! [`ReviewNavigator::resolve`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::finalize::{remove_empty_folder, FinalizeEngine, FinalizeOutcome};
use crate::session::{FolderState, Position, ReviewSession};
use crate::{CullerError, Result};

/// What happens when the reviewer leaves a user with nothing marked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Ask first; the default answer is "yes, nothing to keep"
    #[default]
    Confirm,
    /// Discard the user's images without asking
    Silent,
}

/// A decision the reviewer has to make before the navigator continues
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Nothing was marked; discard all images of this user?
    ConfirmNoProblem { user_id: String },
    /// Images were marked; pick a label
    ChooseLabel {
        user_id: String,
        problem_count: usize,
        labels: Vec<String>,
    },
    /// The previous user's folder is gone (or has no images left); step
    /// past it?
    StaleFolder {
        user_id: String,
        user_index: usize,
        missing: bool,
    },
}

/// The reviewer's answer to a [`Prompt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Yes,
    No,
    Label(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StayReason {
    /// The reviewer answered no
    Declined,
    /// Already on the first image of the first user
    AtStart,
    /// No earlier folder with images exists
    NoEarlierFolder,
}

/// Result of a navigation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Moved {
        position: Position,
        /// Set when leaving the previous user finalized it
        finalized: Option<FinalizeOutcome>,
        /// Users passed over because their folder was gone or empty
        skipped: Vec<String>,
    },
    Prompt(Prompt),
    Stayed(StayReason),
    /// Queue exhausted
    Complete {
        finalized: Option<FinalizeOutcome>,
        skipped: Vec<String>,
    },
}

pub struct ReviewNavigator {
    policy: AdvancePolicy,
    labels: Vec<String>,
    engine: FinalizeEngine,
}

impl ReviewNavigator {
    pub fn new(policy: AdvancePolicy, labels: Vec<String>, engine: FinalizeEngine) -> Self {
        Self { policy, labels, engine }
    }

    /// Enter the first queued user that still has images
    pub fn begin(&mut self, session: &mut ReviewSession) -> Step {
        self.seek_forward(session, 0, None)
    }

    /// Next image, or leave the user after the last one
    pub fn advance_image(&mut self, session: &mut ReviewSession) -> Step {
        if let Some(step) = self.blocked(session) {
            return step;
        }

        let next = session.image_index() + 1;
        if next < session.images().len() {
            session.set_image_index(next);
            return self.moved(session);
        }

        self.advance_user(session)
    }

    /// Leave the current user, whatever image is shown
    pub fn advance_user(&mut self, session: &mut ReviewSession) -> Step {
        if let Some(step) = self.blocked(session) {
            return step;
        }
        let Some(user_id) = session.current_user().map(String::from) else {
            let from = session.user_index();
            return self.seek_forward(session, from, None);
        };

        let prompt = if session.problems().is_empty() {
            match self.policy {
                AdvancePolicy::Silent => return self.finalize_and_advance(session, None),
                AdvancePolicy::Confirm => Prompt::ConfirmNoProblem { user_id },
            }
        } else {
            Prompt::ChooseLabel {
                user_id,
                problem_count: session.problems().len(),
                labels: self.labels.clone(),
            }
        };

        session.set_prompt(prompt.clone());
        Step::Prompt(prompt)
    }

    /// Previous image, or the last image of the previous user
    pub fn retreat_image(&mut self, session: &mut ReviewSession) -> Step {
        if let Some(step) = self.blocked(session) {
            return step;
        }

        let image_index = session.image_index();
        if image_index > 0 {
            session.set_image_index(image_index - 1);
            return self.moved(session);
        }
        let user_index = session.user_index();
        if user_index == 0 {
            return Step::Stayed(StayReason::AtStart);
        }

        self.retreat_into(session, user_index - 1)
    }

    /// Flip the problem mark of `image` in the current user's folder
    pub fn toggle_problem(&mut self, session: &mut ReviewSession, image: &str) -> Result<bool> {
        if session.pending_prompt().is_some() {
            return Err(CullerError::PromptPending);
        }
        let marked = session.toggle(image)?;
        debug!("{} {}", if marked { "Marked" } else { "Unmarked" }, image);
        Ok(marked)
    }

    /// Flip the problem mark of the image currently shown
    pub fn toggle_current(&mut self, session: &mut ReviewSession) -> Result<bool> {
        let image = session.current_image().unwrap_or_default().to_string();
        self.toggle_problem(session, &image)
    }

    /// Answer the pending prompt
    pub fn resolve(&mut self, session: &mut ReviewSession, reply: Reply) -> Result<Step> {
        let prompt = session
            .take_prompt()
            .ok_or_else(|| CullerError::UnexpectedReply(format!("{:?} with no prompt pending", reply)))?;

        match (prompt, reply) {
            (Prompt::ConfirmNoProblem { .. }, Reply::Yes) => Ok(self.finalize_and_advance(session, None)),
            (prompt @ Prompt::ChooseLabel { .. }, Reply::Label(label)) => {
                if !self.labels.contains(&label) {
                    session.set_prompt(prompt);
                    return Err(CullerError::UnknownLabel(label));
                }
                Ok(self.finalize_and_advance(session, Some(&label)))
            }
            (Prompt::StaleFolder { user_index, .. }, Reply::Yes) => {
                if user_index == 0 {
                    return Ok(Step::Stayed(StayReason::NoEarlierFolder));
                }
                Ok(self.retreat_into(session, user_index - 1))
            }
            (_, Reply::No) => Ok(Step::Stayed(StayReason::Declined)),
            (prompt, reply) => {
                session.set_prompt(prompt);
                Err(CullerError::UnexpectedReply(format!("{:?}", reply)))
            }
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn engine_mut(&mut self) -> &mut FinalizeEngine {
        &mut self.engine
    }

    /// Pending prompt or finished queue short-circuits every move
    fn blocked(&self, session: &ReviewSession) -> Option<Step> {
        if let Some(prompt) = session.pending_prompt() {
            return Some(Step::Prompt(prompt.clone()));
        }
        if session.is_complete() {
            return Some(Step::Complete {
                finalized: None,
                skipped: Vec::new(),
            });
        }
        None
    }

    fn moved(&self, session: &ReviewSession) -> Step {
        match session.position() {
            Some(position) => Step::Moved {
                position,
                finalized: None,
                skipped: Vec::new(),
            },
            None => Step::Complete {
                finalized: None,
                skipped: Vec::new(),
            },
        }
    }

    fn finalize_and_advance(&mut self, session: &mut ReviewSession, label: Option<&str>) -> Step {
        let finalized = self.engine.finalize(session, label);
        if let Some(outcome) = &finalized {
            info!(
                "Finalized {} ({}): {} deleted, {} archived, {} failed",
                outcome.user_id,
                outcome.label.as_deref().unwrap_or("no problem"),
                outcome.deleted.len(),
                outcome.moved.len(),
                outcome.failures.len()
            );
        }
        let next = session.user_index() + 1;
        self.seek_forward(session, next, finalized)
    }

    /// Enter the first user at or after `from` with images on disk
    fn seek_forward(
        &mut self,
        session: &mut ReviewSession,
        from: usize,
        finalized: Option<FinalizeOutcome>,
    ) -> Step {
        let mut skipped = Vec::new();

        for index in from..session.queue().len() {
            let user_id = session.queue()[index].clone();
            match session.probe(index) {
                FolderState::Images(images) => {
                    let position = session.enter(index, images, 0);
                    return Step::Moved {
                        position,
                        finalized,
                        skipped,
                    };
                }
                FolderState::Empty => {
                    warn!("No images left for {}, skipping", user_id);
                    // Best-effort: failures are logged inside
                    let _ = remove_empty_folder(&session.root().join(&user_id));
                    skipped.push(user_id);
                }
                FolderState::Missing => {
                    warn!("Folder for {} no longer exists, skipping", user_id);
                    skipped.push(user_id);
                }
            }
        }

        info!("Review queue exhausted");
        session.set_complete();
        Step::Complete { finalized, skipped }
    }

    /// Move to the last image of the user at `target`, or ask before
    /// passing over a folder that is gone
    fn retreat_into(&mut self, session: &mut ReviewSession, target: usize) -> Step {
        let user_id = session.queue()[target].clone();
        match session.probe(target) {
            FolderState::Images(images) => {
                let last = images.len() - 1;
                let position = session.enter(target, images, last);
                Step::Moved {
                    position,
                    finalized: None,
                    skipped: Vec::new(),
                }
            }
            state => {
                let missing = state == FolderState::Missing;
                warn!(
                    "Previous folder {} is {}",
                    user_id,
                    if missing { "gone" } else { "empty" }
                );
                let prompt = Prompt::StaleFolder {
                    user_id,
                    user_index: target,
                    missing,
                };
                session.set_prompt(prompt.clone());
                Step::Prompt(prompt)
            }
        }
    }
}
