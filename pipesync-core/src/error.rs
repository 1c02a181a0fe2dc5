//! Error types for pipesync-core.

use thiserror::Error;

/// A malformed or incomplete request. Always detected before any network
/// activity and never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("teams must be provided in source")]
    MissingTeams,

    #[error("target must be provided in source or via ATC_EXTERNAL_URL")]
    MissingTarget,

    #[error("name must be provided for team: {index}")]
    MissingTeamName { index: usize },

    #[error("{field} must be provided for team: {team}")]
    MissingTeamField { field: &'static str, team: String },

    #[error("team {0} is configured more than once")]
    DuplicateTeam(String),

    #[error("pipelines must be provided via either pipelines or pipelines_file")]
    NoPipelines,

    #[error("pipelines must be provided via one of either pipelines or pipelines_file")]
    ConflictingPipelineSources,

    #[error("{field} must be provided for pipeline[{index}]")]
    MissingPipelineField { field: &'static str, index: usize },

    #[error("vars_files must be non-empty if provided for pipeline[{index}]")]
    EmptyVarsFiles { index: usize },

    #[error("vars file must be non-empty for pipeline[{index}].vars_files[{vars_index}]")]
    EmptyVarsFile { index: usize, vars_index: usize },

    #[error("team ({team}) configuration not found for pipeline ({pipeline})")]
    UnknownTeam { team: String, pipeline: String },
}
