//! Signer roster.
//!
//! The roster is the authoritative set of email addresses belonging to
//! contributors with a signed CLA on file. It is read once per run from
//! a tabular file (a header row naming columns, one column headed
//! `email`) and is immutable for the run's duration.
//!
//! Membership is an exact string match. No case folding or other
//! normalization is applied to roster entries or to lookups; roster
//! hygiene is the operator's responsibility.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::error::EngineError;

/// Header cell that identifies the email column.
const EMAIL_COLUMN: &str = "email";

/// The set of email addresses known to have signed the agreement.
#[derive(Debug, Clone)]
pub struct SignerRoster {
    emails: HashSet<String>,
}

impl SignerRoster {
    /// Load the roster from a comma-separated file with a header row.
    ///
    /// The header row is scanned for a column named `email`
    /// (ASCII-case-insensitive); every subsequent row contributes that
    /// column's cell, trimmed, with empty cells skipped.
    ///
    /// # Errors
    ///
    /// Returns `RosterUnavailable` if the file cannot be read, is
    /// empty, or has no email column.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EngineError::RosterUnavailable(format!("failed to read {}: {e}", path.display()))
        })?;

        let mut lines = raw.lines();
        let header = lines
            .next()
            .ok_or_else(|| EngineError::RosterUnavailable("roster file is empty".to_string()))?;

        let column = header
            .split(',')
            .position(|cell| cell.trim().eq_ignore_ascii_case(EMAIL_COLUMN))
            .ok_or_else(|| {
                EngineError::RosterUnavailable(format!(
                    "roster header has no '{EMAIL_COLUMN}' column: {header}"
                ))
            })?;

        let emails: HashSet<String> = lines
            .filter_map(|line| line.split(',').nth(column))
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(String::from)
            .collect();

        debug!(signers = emails.len(), path = %path.display(), "Loaded signer roster");

        Ok(Self { emails })
    }

    /// Build a roster from an in-memory list of addresses.
    pub fn from_emails<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            emails: emails.into_iter().map(Into::into).collect(),
        }
    }

    /// Exact-match membership test. Pure; no I/O after `load`.
    #[must_use]
    pub fn contains_email(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    /// Number of known signers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.emails.len()
    }

    /// Whether the roster has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_roster(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_emails_from_named_column() {
        let file = write_roster("name,email,signed_at\nAda,ada@example.com,2024-01-01\nBob,bob@example.com,2024-02-02\n");
        let roster = SignerRoster::load(file.path()).unwrap();

        assert_eq!(roster.len(), 2);
        assert!(roster.contains_email("ada@example.com"));
        assert!(roster.contains_email("bob@example.com"));
    }

    #[test]
    fn header_match_is_case_insensitive() {
        let file = write_roster("Email\nada@example.com\n");
        let roster = SignerRoster::load(file.path()).unwrap();
        assert!(roster.contains_email("ada@example.com"));
    }

    #[test]
    fn membership_is_case_sensitive() {
        let file = write_roster("email\nAda@Example.com\n");
        let roster = SignerRoster::load(file.path()).unwrap();

        assert!(roster.contains_email("Ada@Example.com"));
        assert!(!roster.contains_email("ada@example.com"));
    }

    #[test]
    fn skips_blank_cells_and_trims_whitespace() {
        let file = write_roster("email\n ada@example.com \n\n,\n");
        let roster = SignerRoster::load(file.path()).unwrap();

        assert_eq!(roster.len(), 1);
        assert!(roster.contains_email("ada@example.com"));
    }

    #[test]
    fn missing_email_column_is_roster_unavailable() {
        let file = write_roster("name,signed_at\nAda,2024-01-01\n");
        let err = SignerRoster::load(file.path()).unwrap_err();
        assert!(matches!(err, EngineError::RosterUnavailable(_)));
    }

    #[test]
    fn empty_file_is_roster_unavailable() {
        let file = write_roster("");
        let err = SignerRoster::load(file.path()).unwrap_err();
        assert!(matches!(err, EngineError::RosterUnavailable(_)));
    }

    #[test]
    fn missing_file_is_roster_unavailable() {
        let err = SignerRoster::load(Path::new("/nonexistent/roster.csv")).unwrap_err();
        assert!(matches!(err, EngineError::RosterUnavailable(_)));
    }

    #[test]
    fn header_only_roster_is_empty_but_valid() {
        let file = write_roster("email\n");
        let roster = SignerRoster::load(file.path()).unwrap();
        assert!(roster.is_empty());
    }
}
