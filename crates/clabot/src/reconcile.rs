//! CLA reconciliation.
//!
//! One pass over the repository's open pull requests: classify each
//! candidate against the signer roster and issue the minimal mutation
//! sequence that converges its label state, at most one informational
//! comment per transition. PRs already carrying the signed label are
//! never re-verified.
//!
//! Ordering rules, per PR: the comment (when one is due) is posted
//! before any label mutation, and the new label is applied before the
//! old one is removed. A concurrent external reader therefore never
//! observes a candidate with zero CLA labels mid-transition, and a
//! crash between calls leaves the unsigned-label guard intact for the
//! next scheduled run.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::EngineError;
use crate::github::{PullRequest, PullRequestSource};
use crate::roster::SignerRoster;

/// Derived CLA classification of a candidate PR, computed fresh each
/// run from the author email and roster membership. Never persisted;
/// the provider's labels are the only durable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaStatus {
    Signed,
    Unsigned,
}

impl ClaStatus {
    fn classify(roster: &SignerRoster, email: &str) -> Self {
        if roster.contains_email(email) {
            Self::Signed
        } else {
            Self::Unsigned
        }
    }
}

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// When the pass started.
    pub run_time: DateTime<Utc>,
    /// Open PRs returned by the listing.
    pub prs_listed: usize,
    /// PRs selected for verification (signed label absent).
    pub candidates: usize,
    /// Candidates that converged to the signed label this pass.
    pub newly_signed: usize,
    /// Candidates whose author is still missing from the roster.
    pub still_missing: usize,
    /// Wall-clock duration of the pass in seconds.
    pub elapsed_secs: f64,
}

/// Run-scoped operator-facing trace, delivered alongside the summary.
///
/// Every line is mirrored to `tracing` as it is recorded; the collected
/// text is handed to the notification collaborator after the run.
#[derive(Debug, Default, Clone)]
pub struct RunTrace {
    lines: Vec<String>,
}

impl RunTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one trace line.
    pub fn record(&mut self, line: impl Into<String>) {
        let line = line.into();
        info!("{line}");
        self.lines.push(line);
    }

    /// The recorded lines, in order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Render the trace as one text block.
    #[must_use]
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Summary plus trace from one pass.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub trace: RunTrace,
}

/// Orchestrates one reconciliation pass over a [`PullRequestSource`].
///
/// Single-threaded and sequential: PRs are processed strictly one at a
/// time in listing order, each remote call a blocking round-trip. Any
/// `SourceUnavailable` or `EmailNotFound` aborts the remainder of the
/// run; there is no partial-run checkpointing and no retry.
pub struct Reconciler<'a, S: PullRequestSource> {
    source: &'a mut S,
    roster: &'a SignerRoster,
    config: &'a Config,
}

impl<'a, S: PullRequestSource> Reconciler<'a, S> {
    pub fn new(source: &'a mut S, roster: &'a SignerRoster, config: &'a Config) -> Self {
        Self {
            source,
            roster,
            config,
        }
    }

    /// Run one reconciliation pass.
    ///
    /// # Errors
    ///
    /// Propagates the first provider or patch-parsing failure; the
    /// partial trace up to that point is lost to the caller, who should
    /// report the error itself.
    pub async fn run(&mut self) -> Result<RunReport, EngineError> {
        let started = Instant::now();
        let run_time = Utc::now();
        let mut trace = RunTrace::new();

        trace.record(format!(
            "Reconciling CLA status for {} (roster: {} signers{})",
            self.config.repo_path(),
            self.roster.len(),
            if self.config.dry_run { ", dry run" } else { "" }
        ));

        let prs = self.source.list_open_pull_requests().await?;
        trace.record(format!("{} open pull requests", prs.len()));

        let signed = self.config.label_signed.clone();
        let unsigned = self.config.label_unsigned.clone();
        let comment_thanks = self.config.comment_thanks.clone();
        let comment_missing = self.config.comment_missing.clone();

        let mut candidates = 0;
        let mut newly_signed = 0;
        let mut still_missing = 0;

        for pr in &prs {
            let labels = self.source.get_labels(pr).await?;

            // Selection policy: a PR already labeled signed is skipped
            // entirely and never re-verified.
            if labels.iter().any(|l| *l == signed) {
                debug!(pr = pr.number, "Already labeled signed, skipping");
                continue;
            }

            candidates += 1;
            let was_unsigned = labels.iter().any(|l| *l == unsigned);
            let email = self.source.get_author_email(pr).await?;

            match ClaStatus::classify(self.roster, &email) {
                ClaStatus::Signed => {
                    // Thank the author only on the unsigned -> signed
                    // transition; a first observation that lands signed
                    // is labeled silently.
                    if was_unsigned {
                        self.post_comment(pr, &comment_thanks, &mut trace).await?;
                    }
                    self.apply_label(pr, &signed, &mut trace).await?;
                    if was_unsigned {
                        self.remove_label(pr, &unsigned, &mut trace).await?;
                    }
                    newly_signed += 1;
                    trace.record(format!(
                        "PR #{} ({}): signature on file, labeled signed",
                        pr.number, pr.title
                    ));
                }
                ClaStatus::Unsigned => {
                    if !was_unsigned {
                        self.post_comment(pr, &comment_missing, &mut trace).await?;
                        self.apply_label(pr, &unsigned, &mut trace).await?;
                        // The signed label is absent under the selection
                        // policy; this only fires if both labels were
                        // somehow observed together.
                        if labels.iter().any(|l| *l == signed) {
                            self.remove_label(pr, &signed, &mut trace).await?;
                        }
                        trace.record(format!(
                            "PR #{} ({}): no signature for {email}, labeled unsigned",
                            pr.number, pr.title
                        ));
                    } else {
                        trace.record(format!(
                            "PR #{} ({}): still no signature for {email}",
                            pr.number, pr.title
                        ));
                    }
                    still_missing += 1;
                }
            }
        }

        let summary = RunSummary {
            run_time,
            prs_listed: prs.len(),
            candidates,
            newly_signed,
            still_missing,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };

        trace.record(format!(
            "Run complete: {} listed, {} candidates, {} newly signed, {} still missing ({:.1}s)",
            summary.prs_listed,
            summary.candidates,
            summary.newly_signed,
            summary.still_missing,
            summary.elapsed_secs
        ));

        Ok(RunReport { summary, trace })
    }

    async fn post_comment(
        &mut self,
        pr: &PullRequest,
        body: &str,
        trace: &mut RunTrace,
    ) -> Result<(), EngineError> {
        if self.config.dry_run {
            trace.record(format!("PR #{}: would post comment (dry run)", pr.number));
            return Ok(());
        }
        self.source.post_comment(pr, body).await
    }

    async fn apply_label(
        &mut self,
        pr: &PullRequest,
        label: &str,
        trace: &mut RunTrace,
    ) -> Result<(), EngineError> {
        if self.config.dry_run {
            trace.record(format!(
                "PR #{}: would apply label '{label}' (dry run)",
                pr.number
            ));
            return Ok(());
        }
        self.source.apply_label(pr, label).await
    }

    async fn remove_label(
        &mut self,
        pr: &PullRequest,
        label: &str,
        trace: &mut RunTrace,
    ) -> Result<(), EngineError> {
        if self.config.dry_run {
            trace.record(format!(
                "PR #{}: would remove label '{label}' (dry run)",
                pr.number
            ));
            return Ok(());
        }
        self.source.remove_label(pr, label).await
    }
}
