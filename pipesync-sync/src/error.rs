//! Error types for pipesync-sync.

use std::path::PathBuf;

use thiserror::Error;

use pipesync_core::ValidationError;
use pipesync_remote::RemoteError;
use pipesync_template::TemplateError;

/// All errors that can arise from a resource operation.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request was rejected before any network call.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// A team client failed; the message already names the target.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A pipeline config could not be rendered.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The `pipelines_file` named in `out` params is not a pipeline list.
    #[error("invalid pipelines file {path}: {source}")]
    PipelinesFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Two pipelines would be materialized to the same file.
    #[error("pipelines {first} and {second} both map to file {file}")]
    FileCollision {
        first: String,
        second: String,
        file: String,
    },

    /// The diff report could not be written to its sink.
    #[error("failed to write diff for pipeline {pipeline}: {source}")]
    DiffOutput {
        pipeline: String,
        #[source]
        source: std::io::Error,
    },

    /// A config could not be rendered as YAML for the diff.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A fan-out task panicked or was cancelled.
    #[error("concurrent task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
