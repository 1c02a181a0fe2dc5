pub mod check;
pub mod in_;
pub mod out;

use std::future::Future;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::{de::DeserializeOwned, Serialize};

use pipesync_core::{Redactor, Source};
use pipesync_remote::{connector_for, Connector, ConnectorOptions};
use pipesync_sync::SyncError;

use crate::logging;

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Path to the `fly` binary used by the fly backend [default: `fly` next
    /// to this executable].
    #[arg(long, env = "PIPESYNC_FLY_PATH", global = true)]
    pub fly_path: Option<PathBuf>,

    /// Timeout in seconds for each HTTP request to the target.
    #[arg(long, env = "PIPESYNC_REQUEST_TIMEOUT", global = true)]
    pub request_timeout: Option<u64>,

    /// Directory for the per-run log file [default: the system temp dir].
    #[arg(long, env = "PIPESYNC_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,
}

impl GlobalOpts {
    fn connector_options(&self) -> ConnectorOptions {
        let fly_path = self.fly_path.clone().unwrap_or_else(|| {
            std::env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(|dir| dir.join("fly")))
                .unwrap_or_else(|| PathBuf::from("fly"))
        });
        ConnectorOptions {
            fly_path,
            request_timeout: self.request_timeout.map(Duration::from_secs),
        }
    }
}

/// Parse the JSON request envelope.
pub fn read_request<T: DeserializeOwned>(reader: impl Read) -> Result<T> {
    serde_json::from_reader(reader).context("failed to parse request from stdin")
}

/// Write the JSON response envelope followed by a newline.
pub fn write_response<T: Serialize>(mut writer: impl Write, response: &T) -> Result<()> {
    serde_json::to_writer(&mut writer, response).context("failed to write response")?;
    writeln!(writer).context("failed to write response")?;
    Ok(())
}

/// Use `ATC_EXTERNAL_URL` when the request names no target.
pub fn apply_target_fallback(source: &mut Source) {
    source.fill_target_from(std::env::var("ATC_EXTERNAL_URL").ok());
}

/// Run one resource operation.
///
/// Sets up the log file, builds the connector for `source`, and drives
/// `task` on a current-thread runtime so every spawned task shares the
/// scoped subscriber. Any error is returned with team passwords scrubbed.
pub fn execute<T, F, Fut>(op: &str, global: &GlobalOpts, source: &Source, task: F) -> Result<T>
where
    F: FnOnce(Arc<dyn Connector>) -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let redactor = Redactor::from_source(source);

    let result = (|| -> Result<T> {
        let log = logging::init(op, global.log_dir.as_deref(), redactor.clone())?;
        tracing::info!(
            op,
            target = %source.target,
            teams = source.teams.len(),
            log = %log.path.display(),
            "starting"
        );

        let outcome = (|| -> Result<T> {
            let connector = connector_for(source, &global.connector_options())?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            Ok(runtime.block_on(task(connector))?)
        })();

        match &outcome {
            Ok(_) => tracing::info!(op, "finished"),
            Err(err) => tracing::error!(op, error = %format!("{err:#}"), "failed"),
        }
        outcome
    })();

    result.map_err(|err| anyhow!(redactor.redact(&format!("{err:#}"))))
}
