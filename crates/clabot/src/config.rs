//! Engine configuration.
//!
//! A single explicit `Config` is constructed at process start and passed
//! by reference into the roster, source, and reconciler. Nothing in the
//! engine reads the environment ambiently; a missing required value
//! fails fast with `ConfigurationMissing` before any remote call.

use std::path::PathBuf;

use crate::error::EngineError;

/// Default label applied to PRs whose author has signed the CLA.
pub const DEFAULT_LABEL_SIGNED: &str = "cla-signed";

/// Default label applied to PRs whose author has not signed.
pub const DEFAULT_LABEL_UNSIGNED: &str = "cla-missing";

/// Default GitHub REST API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Repository identifier in `owner/name` form.
const ENV_REPOSITORY: &str = "CLA_REPOSITORY";
/// Bearer credential with write access to issues/labels.
const ENV_TOKEN: &str = "GITHUB_TOKEN";
/// Path to the signer roster file.
const ENV_ROSTER_PATH: &str = "CLA_ROSTER_PATH";
/// Comment body posted when a signature is missing.
const ENV_COMMENT_MISSING: &str = "CLA_COMMENT_MISSING";
/// Comment body posted when a previously missing signature is found.
const ENV_COMMENT_THANKS: &str = "CLA_COMMENT_THANKS";
/// Optional override for the signed label name.
const ENV_LABEL_SIGNED: &str = "CLA_LABEL_SIGNED";
/// Optional override for the unsigned label name.
const ENV_LABEL_UNSIGNED: &str = "CLA_LABEL_UNSIGNED";
/// Optional override for the API base URL.
const ENV_API_BASE: &str = "CLA_API_BASE";

/// Configuration for one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Config {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Bearer token used for all provider calls.
    pub token: String,
    /// Path to the signer roster file.
    pub roster_path: PathBuf,
    /// Label marking a PR as covered by a signed CLA. Must match what
    /// is provisioned on the repository.
    pub label_signed: String,
    /// Label marking a PR as awaiting a signature. Must match what is
    /// provisioned on the repository.
    pub label_unsigned: String,
    /// Comment body posted on PRs whose author has not signed.
    pub comment_missing: String,
    /// Comment body posted when a previously unsigned PR's author has
    /// since signed.
    pub comment_thanks: String,
    /// GitHub REST API base URL.
    pub api_base: String,
    /// Evaluate transitions but issue no mutating call.
    pub dry_run: bool,
}

impl Config {
    /// Build a configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` naming the first absent required
    /// variable.
    pub fn from_env() -> Result<Self, EngineError> {
        let repository = require(ENV_REPOSITORY)?;
        let (owner, repo) = split_repository(&repository)?;

        Ok(Self {
            owner,
            repo,
            token: require(ENV_TOKEN)?,
            roster_path: PathBuf::from(require(ENV_ROSTER_PATH)?),
            label_signed: optional(ENV_LABEL_SIGNED)
                .unwrap_or_else(|| DEFAULT_LABEL_SIGNED.to_string()),
            label_unsigned: optional(ENV_LABEL_UNSIGNED)
                .unwrap_or_else(|| DEFAULT_LABEL_UNSIGNED.to_string()),
            comment_missing: require(ENV_COMMENT_MISSING)?,
            comment_thanks: require(ENV_COMMENT_THANKS)?,
            api_base: optional(ENV_API_BASE).unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            dry_run: false,
        })
    }

    /// Full repository path (`owner/repo`).
    #[must_use]
    pub fn repo_path(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

fn require(name: &'static str) -> Result<String, EngineError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(EngineError::ConfigurationMissing(name)),
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Split an `owner/name` repository identifier.
fn split_repository(repository: &str) -> Result<(String, String), EngineError> {
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(EngineError::ConfigurationMissing(ENV_REPOSITORY)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_repository_accepts_owner_slash_name() {
        let (owner, repo) = split_repository("acme/widgets").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "widgets");
    }

    #[test]
    fn split_repository_rejects_missing_slash() {
        assert!(matches!(
            split_repository("acme"),
            Err(EngineError::ConfigurationMissing(_))
        ));
    }

    #[test]
    fn split_repository_rejects_empty_parts() {
        assert!(split_repository("/widgets").is_err());
        assert!(split_repository("acme/").is_err());
    }

    #[test]
    fn from_env_names_the_missing_variable() {
        // The only test in the workspace that touches the environment.
        std::env::remove_var(ENV_REPOSITORY);
        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            EngineError::ConfigurationMissing(ENV_REPOSITORY)
        ));
    }
}
