//! `in`: materialize every pipeline into a directory.

use std::path::Path;
use std::sync::Arc;

use pipesync_core::{validate::validate_in, InRequest, InResponse, Metadata};
use pipesync_remote::Connector;

use crate::error::SyncError;
use crate::fetch::TeamClients;
use crate::version::resolve;
use crate::writer::write_pipelines;

/// Fetch all pipelines, write them under `dest` and report the version of
/// what was written. The requested version is not pinned; the remote only
/// serves its latest state.
pub async fn get(
    request: &InRequest,
    dest: &Path,
    connector: Arc<dyn Connector>,
) -> Result<InResponse, SyncError> {
    validate_in(request)?;
    let source = &request.source;

    let clients = TeamClients::connect_all(connector, &source.teams).await?;
    let fetched = clients.fetch_all().await?;
    let files = write_pipelines(dest, &fetched)?;

    let version = resolve(source.version_mode, &fetched);
    if let Some(requested) = &request.version {
        if requested != &version {
            tracing::warn!("requested version is no longer current; returning the latest");
        }
    }

    let metadata = fetched
        .iter()
        .zip(files)
        .map(|(pipeline, file)| Metadata::new(pipeline.key(), file))
        .collect();

    Ok(InResponse { version, metadata })
}
