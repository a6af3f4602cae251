// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Culler: review navigator and classification store for per-user image folders
//!
//! A reviewer walks the image folders of one review period user by user,
//! marks problem images, and labels each user. Leaving a user is
//! irreversible: problem images are archived, everything else is deleted,
//! and the label is appended to the period's classification store.

pub mod analysis;
pub mod annotations;
pub mod config;
pub mod dates;
pub mod enumerator;
pub mod error;
pub mod finalize;
pub mod history;
pub mod navigator;
pub mod period;
pub mod progress;
pub mod report;
pub mod resume;
pub mod session;
pub mod store;

pub use config::AppConfig;
pub use error::{CullerError, Result};
