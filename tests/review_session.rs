// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! End-to-end review of a small period

use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

use culler::config::ReviewConfig;
use culler::enumerator::FolderEnumerator;
use culler::finalize::{FinalizeEngine, Persistence};
use culler::navigator::{AdvancePolicy, Prompt, Reply, ReviewNavigator, StayReason, Step};
use culler::period::PeriodLayout;
use culler::report::{ReportFormat, ReportGenerator};
use culler::session::ReviewSession;
use culler::store::ClassificationStore;

const LABELS: [&str; 3] = ["FLAGGED", "MALE", "NOLOOK"];

struct Period {
    _dir: TempDir,
    layout: PeriodLayout,
    review: ReviewConfig,
}

impl Period {
    fn new(users: &[(&str, &[&str])]) -> Self {
        let dir = tempdir().unwrap();
        let data = dir.path().join("20240101-20240107").join("data");
        std::fs::create_dir_all(&data).unwrap();
        for (user, images) in users {
            std::fs::create_dir_all(data.join(user)).unwrap();
            for image in *images {
                std::fs::write(data.join(user).join(image), b"jpeg").unwrap();
            }
        }

        let review = ReviewConfig {
            labels: LABELS.iter().map(|l| l.to_string()).collect(),
            ..ReviewConfig::default()
        };
        let layout = PeriodLayout::for_root(&data, &review).unwrap();
        Self { _dir: dir, layout, review }
    }

    fn root(&self) -> PathBuf {
        self.layout.data_dir.clone()
    }

    fn start(&self, policy: AdvancePolicy) -> (ReviewNavigator, ReviewSession) {
        let store = ClassificationStore::load(&self.layout.store_path);
        let queue = FolderEnumerator::new(self.root())
            .reserve(&self.review.archive_dir_name)
            .enumerate(&store)
            .unwrap();
        let engine = FinalizeEngine::new(store, self.layout.clone(), Box::new(self.review.date_rule));
        let navigator = ReviewNavigator::new(policy, self.review.labels.clone(), engine);
        let session = ReviewSession::new(self.root(), queue, self.review.image_extensions.clone());
        (navigator, session)
    }
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_full_review_of_two_users() {
    let period = Period::new(&[
        ("A", &["A_20240101.jpg", "A_20240102.jpg", "A_20240103.jpg"]),
        ("B", &["B_20240104.jpg", "B_20240105.jpg"]),
    ]);
    let (mut navigator, mut session) = period.start(AdvancePolicy::Confirm);

    let Step::Moved { position, .. } = navigator.begin(&mut session) else {
        panic!("expected to enter A");
    };
    assert_eq!(position.user_id, "A");

    // Leave A with nothing marked
    let step = navigator.advance_user(&mut session);
    assert_eq!(step, Step::Prompt(Prompt::ConfirmNoProblem { user_id: "A".into() }));
    let Step::Moved { position, finalized, .. } = navigator.resolve(&mut session, Reply::Yes).unwrap() else {
        panic!("expected to enter B");
    };
    assert_eq!(position.user_id, "B");
    assert_eq!(finalized.unwrap().deleted.len(), 3);
    assert!(!period.root().join("A").exists());

    // Mark B's first image, walk past the last one
    assert!(navigator.toggle_current(&mut session).unwrap());
    assert!(matches!(navigator.advance_image(&mut session), Step::Moved { .. }));
    let Step::Prompt(Prompt::ChooseLabel { problem_count, .. }) = navigator.advance_image(&mut session) else {
        panic!("expected a label prompt");
    };
    assert_eq!(problem_count, 1);

    let Step::Complete { finalized, skipped } = navigator
        .resolve(&mut session, Reply::Label("FLAGGED".into()))
        .unwrap()
    else {
        panic!("expected the queue to finish");
    };
    let outcome = finalized.unwrap();
    assert!(outcome.is_clean());
    assert_eq!(outcome.persistence, Persistence::Saved);
    assert!(skipped.is_empty());

    // Dataset
    assert!(!period.root().join("B").exists());
    assert_eq!(entries(&period.layout.user_archive("B")), vec!["B_20240104.jpg"]);

    // Store, as read back from disk
    let store = ClassificationStore::load(&period.layout.store_path);
    assert_eq!(store.len(), 1);
    assert!(!store.contains("A"));
    let record = store.get("B").unwrap();
    assert_eq!(record.classification, "FLAGGED");
    assert_eq!(record.problem_dates, vec!["20240104"]);

    // Report
    let generator = ReportGenerator::new(navigator.labels().to_vec(), ReportFormat::Text, "classification_report");
    let report = generator.generate(&session);
    assert_eq!(report.total_images, 5);
    assert_eq!(report.problem_images, 1);
    assert_eq!(report.ratio_display(), "20.00%");
    assert_eq!(report.count("FLAGGED"), 1);
    assert!(generator.write(&report, &period.layout.dir).is_some());

    // Nothing left to review
    let (_, session) = period.start(AdvancePolicy::Confirm);
    assert!(session.queue().is_empty());
}

#[test]
fn test_restart_skips_classified_users() {
    let period = Period::new(&[
        ("A", &["A_20240101.jpg"]),
        ("B", &["B_20240102.jpg"]),
        ("C", &["C_20240103.jpg"]),
    ]);

    let (mut navigator, mut session) = period.start(AdvancePolicy::Silent);
    navigator.begin(&mut session);
    navigator.toggle_current(&mut session).unwrap();
    navigator.advance_user(&mut session);
    navigator.resolve(&mut session, Reply::Label("MALE".into())).unwrap();
    // Reviewer quits while on B
    drop((navigator, session));

    let (mut navigator, mut session) = period.start(AdvancePolicy::Silent);
    assert_eq!(session.queue(), ["B".to_string(), "C".to_string()]);
    let Step::Moved { position, .. } = navigator.begin(&mut session) else {
        panic!("expected to enter B");
    };
    assert_eq!(position.user_id, "B");
}

#[test]
fn test_retreat_into_finalized_user_asks_first() {
    let period = Period::new(&[("A", &["A_20240101.jpg"]), ("B", &["B_20240102.jpg"])]);
    let (mut navigator, mut session) = period.start(AdvancePolicy::Silent);

    navigator.begin(&mut session);
    let Step::Moved { position, finalized, .. } = navigator.advance_image(&mut session) else {
        panic!("expected to enter B");
    };
    assert_eq!(position.user_id, "B");
    assert!(finalized.is_some());

    let step = navigator.retreat_image(&mut session);
    assert_eq!(
        step,
        Step::Prompt(Prompt::StaleFolder { user_id: "A".into(), user_index: 0, missing: true })
    );
    // Moves are blocked until the prompt is answered
    assert!(matches!(navigator.advance_image(&mut session), Step::Prompt(_)));

    let step = navigator.resolve(&mut session, Reply::Yes).unwrap();
    assert_eq!(step, Step::Stayed(StayReason::NoEarlierFolder));
    assert_eq!(session.current_user(), Some("B"));
}

#[test]
fn test_missing_store_loads_empty() {
    let dir = tempdir().unwrap();
    let store = ClassificationStore::load(dir.path().join("absent.jsonl"));
    assert!(store.is_empty());
    assert!(store.unsaved().is_empty());
}
