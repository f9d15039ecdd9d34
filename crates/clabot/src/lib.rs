//! CLA signature reconciler for GitHub pull requests.
//!
//! One pass per invocation: load the signer roster, list the
//! repository's open pull requests, and converge each candidate's label
//! state (and at most one informational comment per transition) to
//! match the author's roster membership. Scheduling the pass, and
//! guaranteeing that passes never overlap, is the caller's job.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod github;
pub mod reconcile;
pub mod roster;

pub use config::Config;
pub use error::EngineError;
pub use github::{GitHubSource, PullRequest, PullRequestSource};
pub use reconcile::{ClaStatus, Reconciler, RunReport, RunSummary, RunTrace};
pub use roster::SignerRoster;
