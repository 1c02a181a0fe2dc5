//! Request validation.
//!
//! Every check here runs before any network call is made.

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::types::{CheckRequest, InRequest, OutParams, PublishRequest, Source};

/// Validate the connection configuration shared by all operations.
pub fn validate_source(source: &Source) -> Result<(), ValidationError> {
    if source.teams.is_empty() {
        return Err(ValidationError::MissingTeams);
    }

    let mut seen = HashSet::new();
    for (index, team) in source.teams.iter().enumerate() {
        if team.name.as_str().is_empty() {
            return Err(ValidationError::MissingTeamName { index });
        }
        if team.username.is_empty() {
            return Err(ValidationError::MissingTeamField {
                field: "username",
                team: team.name.to_string(),
            });
        }
        if team.password.is_empty() {
            return Err(ValidationError::MissingTeamField {
                field: "password",
                team: team.name.to_string(),
            });
        }
        if !seen.insert(&team.name) {
            return Err(ValidationError::DuplicateTeam(team.name.to_string()));
        }
    }

    if source.target.is_empty() {
        return Err(ValidationError::MissingTarget);
    }
    Ok(())
}

pub fn validate_check(request: &CheckRequest) -> Result<(), ValidationError> {
    validate_source(&request.source)
}

pub fn validate_in(request: &InRequest) -> Result<(), ValidationError> {
    validate_source(&request.source)
}

/// Exactly one of `pipelines` / `pipelines_file` must be supplied.
pub fn validate_out_params(params: &OutParams) -> Result<(), ValidationError> {
    let has_list = params.pipelines.as_ref().is_some_and(|p| !p.is_empty());
    let has_file = params.pipelines_file.as_ref().is_some_and(|f| !f.is_empty());
    match (has_list, has_file) {
        (false, false) => Err(ValidationError::NoPipelines),
        (true, true) => Err(ValidationError::ConflictingPipelineSources),
        _ => Ok(()),
    }
}

/// Validate the resolved pipeline list against the configured teams.
pub fn validate_publish_requests(
    requests: &[PublishRequest],
    source: &Source,
) -> Result<(), ValidationError> {
    if requests.is_empty() {
        return Err(ValidationError::NoPipelines);
    }

    for (index, p) in requests.iter().enumerate() {
        if p.name.as_str().is_empty() {
            return Err(ValidationError::MissingPipelineField { field: "name", index });
        }
        if p.config_file.is_empty() {
            return Err(ValidationError::MissingPipelineField {
                field: "config_file",
                index,
            });
        }
        if p.team_name.as_str().is_empty() {
            return Err(ValidationError::MissingPipelineField {
                field: "team_name",
                index,
            });
        }
        // Optional, but when present it must list at least one real path.
        if let Some(vars) = &p.vars_files {
            if vars.is_empty() {
                return Err(ValidationError::EmptyVarsFiles { index });
            }
            if let Some(vars_index) = vars.iter().position(|v| v.is_empty()) {
                return Err(ValidationError::EmptyVarsFile { index, vars_index });
            }
        }
        if source.team(&p.team_name).is_none() {
            return Err(ValidationError::UnknownTeam {
                team: p.team_name.to_string(),
                pipeline: p.name.to_string(),
            });
        }
    }
    Ok(())
}
