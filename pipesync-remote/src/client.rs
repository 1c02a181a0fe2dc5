//! The remote pipeline capability and backend selection.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use pipesync_core::{
    Backend, ConfigVersion, Pipeline, PipelineConfig, PipelineName, Source, Team, TeamName,
};

use crate::error::RemoteError;
use crate::fly::FlyConnector;
use crate::http::HttpConnector;

/// Authenticated, team-scoped access to pipelines.
///
/// Read operations may be issued concurrently. Writes (`set_config`,
/// `delete`) for one pipeline must be serialised by the caller.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Team this client is scoped to.
    fn team(&self) -> &TeamName;

    /// Target URL, for diagnostics.
    fn target(&self) -> &str;

    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, RemoteError>;

    async fn get_config(&self, pipeline: &PipelineName) -> Result<PipelineConfig, RemoteError>;

    /// Replace a pipeline's config.
    ///
    /// `version` must be the token from the most recent [`get_config`] of
    /// this pipeline, or `None` when it does not exist yet. A stale token
    /// fails with [`RemoteError::ConcurrentModification`]; the call is never
    /// retried here.
    ///
    /// [`get_config`]: RemoteClient::get_config
    async fn set_config(
        &self,
        pipeline: &PipelineName,
        version: Option<&ConfigVersion>,
        config: &Value,
    ) -> Result<(), RemoteError>;

    async fn delete(&self, pipeline: &PipelineName) -> Result<(), RemoteError>;
}

/// Produces team clients. Authentication happens once, in [`connect`];
/// the returned client reuses it for its whole lifetime.
///
/// [`connect`]: Connector::connect
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, team: &Team) -> Result<Arc<dyn RemoteClient>, RemoteError>;
}

/// Process-level knobs that are not part of the request.
#[derive(Debug, Clone)]
pub struct ConnectorOptions {
    /// Path to the `fly` binary for [`Backend::Fly`].
    pub fly_path: PathBuf,
    /// Per-request timeout for [`Backend::Api`]; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            fly_path: PathBuf::from("fly"),
            request_timeout: None,
        }
    }
}

/// Build the connector selected by `source.backend`. The `insecure` flag is
/// applied to every team client it produces.
pub fn connector_for(
    source: &Source,
    options: &ConnectorOptions,
) -> Result<Arc<dyn Connector>, RemoteError> {
    Ok(match source.backend {
        Backend::Api => Arc::new(HttpConnector::new(
            &source.target,
            source.insecure,
            options.request_timeout,
        )?),
        Backend::Fly => Arc::new(FlyConnector::new(
            &source.target,
            source.insecure,
            options.fly_path.clone(),
        )),
    })
}
