//! Config diff & apply: render a local pipeline, diff it against the remote
//! and write it back with the version token just fetched.

use std::path::{Path, PathBuf};

use serde_json::Value;

use pipesync_core::PublishRequest;
use pipesync_remote::RemoteClient;
use pipesync_template::{render_config_file, RenderedConfig};

use crate::diff::{diff_configs, ConfigDiffer};
use crate::error::SyncError;

/// A publish request whose config has been rendered from disk.
#[derive(Debug, Clone)]
pub struct PreparedPipeline {
    pub request: PublishRequest,
    pub rendered: RenderedConfig,
}

/// Result of publishing one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// `"<team>/<pipeline>"`.
    pub key: String,
    /// Number of added, removed and changed elements.
    pub changes: usize,
    /// The pipeline did not exist remotely before this write.
    pub created: bool,
}

/// Resolve the config and vars paths of `request` against `sources_dir`
/// and render it. Touches only the local filesystem.
pub fn prepare(
    sources_dir: &Path,
    request: &PublishRequest,
) -> Result<PreparedPipeline, SyncError> {
    let config_path = sources_dir.join(&request.config_file);
    let vars_paths: Vec<PathBuf> = request
        .vars_files()
        .iter()
        .map(|v| sources_dir.join(v))
        .collect();

    let rendered = render_config_file(&config_path, &vars_paths)?;
    tracing::debug!(pipeline = %request.key(), vars = vars_paths.len(), "rendered config");
    Ok(PreparedPipeline {
        request: request.clone(),
        rendered,
    })
}

/// Publishes rendered pipelines, reporting each diff through its differ.
pub struct ConfigPublisher<'a> {
    differ: &'a ConfigDiffer,
}

impl<'a> ConfigPublisher<'a> {
    pub fn new(differ: &'a ConfigDiffer) -> Self {
        Self { differ }
    }

    /// Fetch the current config, diff, then write.
    ///
    /// A pipeline that does not exist yet is created. A conflicting write is
    /// returned to the caller as is; it is never retried here.
    pub async fn publish(
        &self,
        client: &dyn RemoteClient,
        prepared: &PreparedPipeline,
    ) -> Result<PublishOutcome, SyncError> {
        let key = prepared.request.key();
        let name = &prepared.request.name;

        let current = match client.get_config(name).await {
            Ok(config) => Some(config),
            Err(e) if e.is_not_found() => {
                tracing::info!(pipeline = %key, "pipeline does not exist yet");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let empty = Value::Object(Default::default());
        let old = current.as_ref().map_or(&empty, |c| &c.config);
        let changes = diff_configs(old, &prepared.rendered.config);
        self.differ.render(&key, &changes)?;

        client
            .set_config(
                name,
                current.as_ref().map(|c| &c.version),
                &prepared.rendered.config,
            )
            .await?;
        tracing::info!(pipeline = %key, changes = changes.len(), "published");

        Ok(PublishOutcome {
            key,
            changes: changes.len(),
            created: current.is_none(),
        })
    }
}
