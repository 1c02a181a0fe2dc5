//! `out`: publish local pipeline definitions and report the new version.

use std::path::Path;
use std::sync::Arc;

use pipesync_core::{
    parse_pipelines_file,
    validate::{validate_out_params, validate_publish_requests, validate_source},
    Metadata, OutRequest, OutResponse, PublishRequest, ValidationError,
};
use pipesync_remote::Connector;

use crate::apply::{prepare, ConfigPublisher, PreparedPipeline};
use crate::diff::ConfigDiffer;
use crate::error::{io_err, SyncError};
use crate::fetch::TeamClients;
use crate::version::resolve;

/// The pipelines to publish: the inline list, or the contents of
/// `pipelines_file` relative to `sources_dir`.
pub fn publish_requests(
    request: &OutRequest,
    sources_dir: &Path,
) -> Result<Vec<PublishRequest>, SyncError> {
    validate_out_params(&request.params)?;

    if let Some(list) = request.params.pipelines.as_ref().filter(|l| !l.is_empty()) {
        return Ok(list.clone());
    }
    let file = request.params.pipelines_file.as_deref().unwrap_or_default();
    let path = sources_dir.join(file);
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    parse_pipelines_file(&contents).map_err(|source| SyncError::PipelinesFile { path, source })
}

/// Validate and render every pipeline, then publish them one at a time.
///
/// Nothing touches the network until every request has passed validation
/// and rendered cleanly. The returned version is computed after the last
/// write, over every configured team.
pub async fn put(
    request: &OutRequest,
    sources_dir: &Path,
    connector: Arc<dyn Connector>,
    differ: &ConfigDiffer,
) -> Result<OutResponse, SyncError> {
    let source = &request.source;
    validate_source(source)?;
    let requests = publish_requests(request, sources_dir)?;
    validate_publish_requests(&requests, source)?;

    let prepared = requests
        .iter()
        .map(|r| prepare(sources_dir, r))
        .collect::<Result<Vec<PreparedPipeline>, _>>()?;

    let clients = TeamClients::connect_all(connector, &source.teams).await?;
    let publisher = ConfigPublisher::new(differ);

    // Sequential, so two writes to one pipeline can never race.
    let mut metadata = Vec::with_capacity(prepared.len());
    for pipeline in &prepared {
        let client = clients.get(&pipeline.request.team_name).ok_or_else(|| {
            ValidationError::UnknownTeam {
                team: pipeline.request.team_name.to_string(),
                pipeline: pipeline.request.name.to_string(),
            }
        })?;
        let outcome = publisher.publish(client.as_ref(), pipeline).await?;
        metadata.push(Metadata::new(
            outcome.key,
            format!("{} changes", outcome.changes),
        ));
    }

    let fetched = clients.fetch_all().await?;
    let version = resolve(source.version_mode, &fetched);
    tracing::info!(published = metadata.len(), pipelines = fetched.len(), "out complete");

    Ok(OutResponse { version, metadata })
}
