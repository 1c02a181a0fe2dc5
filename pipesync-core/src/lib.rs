//! pipesync core library - domain types, request envelopes, validation and
//! credential redaction.
//!
//! - [`types`]: newtypes, `Source`/`Team`, pipelines, versions, envelopes
//! - [`error`]: [`ValidationError`]
//! - [`validate`]: pre-network request validation
//! - [`redact`]: password scrubbing for anything written to logs or stderr

pub mod error;
pub mod redact;
pub mod types;
pub mod validate;

pub use error::ValidationError;
pub use redact::{RedactingWriter, Redactor, REDACTED_PASSWORD};
pub use types::{
    parse_pipelines_file, pipeline_key, Backend, CheckRequest, CheckResponse, ConfigVersion,
    InParams, InRequest, InResponse, Metadata, OutParams, OutRequest, OutResponse, Pipeline,
    PipelineConfig, PipelineName, PublishRequest, Source, Team, TeamName, Version, VersionMode,
    VersionedResponse,
};
