//! Spinners and grid search progress bars using indicatif

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::training::{CandidateOutcome, TuningCandidate, TuningResult};

/// Spinner for a single pipeline stage (loading, SMOTE, subset search, evaluation)
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("    {spinner:.red} {msg}")
            .unwrap()
            .tick_chars("♡♥♡♥ "),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// One bar per classifier family, one tick per grid candidate.
///
/// The family name sits in the prefix; the message shows the last scored candidate.
pub fn create_tuning_bar(family: &str, candidates: u64) -> ProgressBar {
    let pb = ProgressBar::new(candidates);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("    {prefix:.bold} [{bar:30.red/white}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    pb.set_prefix(family.to_string());
    pb
}

/// Tick the bar for a finished candidate
pub fn advance_tuning(pb: &ProgressBar, candidate: &TuningCandidate) {
    let status = match &candidate.outcome {
        CandidateOutcome::Scored { weighted_f1, .. } => format!("F1 {:.4}", weighted_f1),
        CandidateOutcome::Failed { .. } => "failed".to_string(),
    };
    pb.set_message(format!("{} ({})", candidate.configuration.name, status));
    pb.inc(1);
}

/// Close a tuning bar with the chosen configuration
pub fn finish_tuning(pb: &ProgressBar, family: &str, result: &TuningResult) {
    match result.best_score() {
        Some(score) => finish_with_success(
            pb,
            &format!("{}: best {} (F1 {:.4})", family, result.configuration, score),
        ),
        None => finish_with_warning(
            pb,
            &format!("{}: no candidate scored, using {}", family, result.configuration),
        ),
    }
}

pub fn finish_with_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✅ {}", message));
}

pub fn finish_with_warning(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("⚠️  {}", message));
}
