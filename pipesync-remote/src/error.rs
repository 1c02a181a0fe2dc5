//! Error types for pipesync-remote.

use std::path::PathBuf;

use thiserror::Error;

/// Every failure a team client can report. All of them are fatal for the
/// invocation; none are retried here.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server rejected the team's credentials.
    #[error("authentication failed for team {team} on {target}: {message}")]
    Authentication {
        target: String,
        team: String,
        message: String,
    },

    /// The referenced team or pipeline does not exist remotely.
    #[error("{what} not found on {target}")]
    NotFound { target: String, what: String },

    /// The config changed since its version token was fetched.
    #[error(
        "pipeline {team}/{pipeline} was modified concurrently on {target}; re-run to pick up the latest config"
    )]
    ConcurrentModification {
        target: String,
        team: String,
        pipeline: String,
    },

    /// Network failure, unexpected status code or undecodable body.
    #[error("error from target: {target} - {message}")]
    Transport { target: String, message: String },

    /// The `fly` binary could not be started or its scratch files written.
    #[error("failed to run {binary}: {source}")]
    Process {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    pub(crate) fn transport(target: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            target: target.to_string(),
            message: message.into(),
        }
    }
}
