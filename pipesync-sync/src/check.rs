//! `check`: report the current version if it differs from the known one.

use std::sync::Arc;

use pipesync_core::{validate::validate_check, CheckRequest, CheckResponse};
use pipesync_remote::Connector;

use crate::error::SyncError;
use crate::fetch::TeamClients;
use crate::version::resolve;

/// Fetch every pipeline of every team and compute the version.
///
/// Returns `[]` when the version equals `request.version`, or when no
/// pipelines exist and no non-empty version was known before. Losing every
/// pipeline after some existed is a change and is reported.
pub async fn check(
    request: &CheckRequest,
    connector: Arc<dyn Connector>,
) -> Result<CheckResponse, SyncError> {
    validate_check(request)?;
    let source = &request.source;
    let known = request.version.as_ref().filter(|v| !v.is_empty());

    let clients = TeamClients::connect_all(connector, &source.teams).await?;
    let fetched = clients.fetch_all().await?;
    if fetched.is_empty() && known.is_none() {
        tracing::info!("no pipelines found");
        return Ok(Vec::new());
    }

    let version = resolve(source.version_mode, &fetched);
    if known == Some(&version) {
        tracing::info!(pipelines = fetched.len(), "version unchanged");
        return Ok(Vec::new());
    }

    tracing::info!(pipelines = fetched.len(), "new version");
    Ok(vec![version])
}
