//! Error types for pipesync-template.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading variables or rendering a config.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// One or more `${...}` placeholders had no matching variable.
    #[error("unresolved template variables: {}", names.join(", "))]
    Unresolved { names: Vec<String> },

    /// Filesystem error while reading a config or vars file.
    #[error("template io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse vars file {path}: {source}")]
    VarsParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("vars file {path} must contain a mapping of names to values")]
    VarsNotMapping { path: PathBuf },

    #[error("failed to parse pipeline config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("pipeline config {path} must be a mapping")]
    ConfigNotMapping { path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> TemplateError {
    TemplateError::Io {
        path: path.into(),
        source,
    }
}
