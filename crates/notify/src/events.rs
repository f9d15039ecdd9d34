//! Run report events delivered to operators.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Severity of an event, used for payload styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Outcome of one reconciliation pass, as delivered to operators.
///
/// Fire-and-forget from the reconciler's point of view: the engine
/// produces the summary and trace, this crate delivers them.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A pass completed; carries the summary counts and the full run
    /// trace.
    RunCompleted {
        repository: String,
        prs_listed: usize,
        candidates: usize,
        newly_signed: usize,
        still_missing: usize,
        elapsed_secs: f64,
        trace: String,
        timestamp: DateTime<Utc>,
    },
    /// A pass aborted; carries the failure description.
    RunFailed {
        repository: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl RunEvent {
    /// Short title for the event.
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Self::RunCompleted { repository, .. } => {
                format!("CLA reconciliation complete: {repository}")
            }
            Self::RunFailed { repository, .. } => {
                format!("CLA reconciliation FAILED: {repository}")
            }
        }
    }

    /// Multi-line body text: the summary line followed by the trace.
    #[must_use]
    pub fn body(&self) -> String {
        match self {
            Self::RunCompleted {
                prs_listed,
                candidates,
                newly_signed,
                still_missing,
                elapsed_secs,
                trace,
                ..
            } => {
                format!(
                    "{prs_listed} open PRs, {candidates} candidates, \
                     {newly_signed} newly signed, {still_missing} still missing \
                     ({elapsed_secs:.1}s)\n\n{trace}"
                )
            }
            Self::RunFailed { error, .. } => error.clone(),
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::RunCompleted { .. } => Severity::Info,
            Self::RunFailed { .. } => Severity::Critical,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::RunCompleted { timestamp, .. } | Self::RunFailed { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_event_title_and_severity() {
        let event = RunEvent::RunCompleted {
            repository: "acme/widgets".to_string(),
            prs_listed: 5,
            candidates: 2,
            newly_signed: 1,
            still_missing: 1,
            elapsed_secs: 3.2,
            trace: "line one\nline two".to_string(),
            timestamp: Utc::now(),
        };

        assert_eq!(event.title(), "CLA reconciliation complete: acme/widgets");
        assert_eq!(event.severity(), Severity::Info);
        assert!(event.body().contains("1 newly signed"));
        assert!(event.body().contains("line two"));
    }

    #[test]
    fn failed_event_is_critical_and_carries_the_error() {
        let event = RunEvent::RunFailed {
            repository: "acme/widgets".to_string(),
            error: "signer roster unavailable: boom".to_string(),
            timestamp: Utc::now(),
        };

        assert_eq!(event.severity(), Severity::Critical);
        assert!(event.body().contains("boom"));
    }
}
