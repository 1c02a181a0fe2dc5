//! Process-invocation backend driving the `fly` CLI.
//!
//! Each team gets its own fly target (`pipesync-<team>`). fly keeps every
//! target in one rc file that `login` rewrites whole, so logins through one
//! [`FlyConnector`] run one at a time; the commands after login only read it.
//!
//! `fly` does not surface the server's config version, so this backend uses
//! the SHA-256 of the YAML that `get-pipeline` prints as the version token.
//! [`RemoteClient::set_config`] re-fetches and compares it before writing;
//! that narrows the race window but cannot close it the way the server-side
//! check of the HTTP backend does.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::process::Command;

use pipesync_core::{ConfigVersion, Pipeline, PipelineConfig, PipelineName, Team, TeamName};

use crate::client::{Connector, RemoteClient};
use crate::error::RemoteError;

const TARGET_PREFIX: &str = "pipesync-";

/// Logs teams in through `fly login`.
#[derive(Debug, Clone)]
pub struct FlyConnector {
    target: String,
    insecure: bool,
    fly_path: PathBuf,
    login_lock: Arc<Mutex<()>>,
}

impl FlyConnector {
    pub fn new(target: &str, insecure: bool, fly_path: PathBuf) -> Self {
        Self {
            target: target.trim_end_matches('/').to_string(),
            insecure,
            fly_path,
            login_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[async_trait]
impl Connector for FlyConnector {
    async fn connect(&self, team: &Team) -> Result<Arc<dyn RemoteClient>, RemoteError> {
        let client = FlyClient {
            fly_path: self.fly_path.clone(),
            fly_target: format!("{TARGET_PREFIX}{}", team.name),
            target: self.target.clone(),
            team: team.name.clone(),
        };

        let mut args = vec![
            "login".to_string(),
            "-c".to_string(),
            self.target.clone(),
            "-n".to_string(),
            team.name.to_string(),
            "-u".to_string(),
            team.username.clone(),
            "-p".to_string(),
            team.password.clone(),
        ];
        if self.insecure {
            args.push("-k".to_string());
        }

        let login = {
            let _rc = self.login_lock.lock().await;
            client.run(&args).await?
        };
        if let Err(failure) = login {
            return Err(client.classify(failure, None));
        }
        tracing::info!(team = %team.name, target = %self.target, "logged in with fly");
        Ok(Arc::new(client))
    }
}

/// Non-zero exit of a fly command.
#[derive(Debug)]
struct FlyFailure {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl FlyFailure {
    fn message(&self) -> String {
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        match self.code {
            Some(code) => format!("fly exited with status {code}: {detail}"),
            None => format!("fly terminated by signal: {detail}"),
        }
    }

    fn mentions(&self, needles: &[&str]) -> bool {
        let haystack = format!("{}\n{}", self.stdout, self.stderr).to_ascii_lowercase();
        needles.iter().any(|n| haystack.contains(n))
    }
}

#[derive(Debug, Deserialize)]
struct FlyPipeline {
    name: String,
    #[serde(default)]
    team_name: Option<String>,
}

/// fly-backed client scoped to one logged-in team.
pub struct FlyClient {
    fly_path: PathBuf,
    fly_target: String,
    target: String,
    team: TeamName,
}

impl FlyClient {
    /// Run `fly -t <target> <args>`. The outer error means fly could not be
    /// run at all; the inner one is a non-zero exit.
    async fn run(&self, args: &[String]) -> Result<Result<String, FlyFailure>, RemoteError> {
        // Only the subcommand is logged; args may carry credentials.
        let subcommand = args.first().map(String::as_str).unwrap_or_default();
        tracing::debug!(team = %self.team, subcommand, "running fly");

        let output = Command::new(&self.fly_path)
            .arg("-t")
            .arg(&self.fly_target)
            .args(args)
            .output()
            .await
            .map_err(|source| RemoteError::Process {
                binary: self.fly_path.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(Ok(stdout));
        }
        Ok(Err(FlyFailure {
            code: output.status.code(),
            stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }))
    }

    fn classify(&self, failure: FlyFailure, pipeline: Option<&PipelineName>) -> RemoteError {
        if failure.mentions(&["not authorized", "unauthorized", "not logged in"]) {
            return RemoteError::Authentication {
                target: self.target.clone(),
                team: self.team.to_string(),
                message: failure.message(),
            };
        }
        if failure.mentions(&["not found", "does not exist"]) {
            return RemoteError::NotFound {
                target: self.target.clone(),
                what: match pipeline {
                    Some(p) => format!("pipeline {}/{p}", self.team),
                    None => format!("team {}", self.team),
                },
            };
        }
        RemoteError::transport(&self.target, failure.message())
    }

    fn conflict(&self, pipeline: &PipelineName) -> RemoteError {
        RemoteError::ConcurrentModification {
            target: self.target.clone(),
            team: self.team.to_string(),
            pipeline: pipeline.to_string(),
        }
    }

    fn write_scratch_config(&self, config: &Value) -> Result<tempfile::NamedTempFile, RemoteError> {
        let yaml = serde_yaml::to_string(config).map_err(|e| {
            RemoteError::transport(&self.target, format!("cannot render config: {e}"))
        })?;
        let process_err = |source: std::io::Error| RemoteError::Process {
            binary: self.fly_path.clone(),
            source,
        };
        let mut file = tempfile::Builder::new()
            .prefix("pipesync-config-")
            .suffix(".yml")
            .tempfile()
            .map_err(process_err)?;
        file.write_all(yaml.as_bytes()).map_err(process_err)?;
        file.flush().map_err(process_err)?;
        Ok(file)
    }
}

/// Version token for content served through fly.
pub fn content_version(raw: &str) -> ConfigVersion {
    let mut h = Sha256::new();
    h.update(raw.as_bytes());
    ConfigVersion(hex::encode(h.finalize()))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[async_trait]
impl RemoteClient for FlyClient {
    fn team(&self) -> &TeamName {
        &self.team
    }

    fn target(&self) -> &str {
        &self.target
    }

    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, RemoteError> {
        let out = self
            .run(&["pipelines".to_string(), "--json".to_string()])
            .await?
            .map_err(|f| self.classify(f, None))?;

        let listed: Vec<FlyPipeline> = serde_json::from_str(out.trim()).map_err(|e| {
            RemoteError::transport(&self.target, format!("invalid fly pipelines output: {e}"))
        })?;

        Ok(listed
            .into_iter()
            // `fly pipelines --all` would include other teams; keep ours.
            .filter(|p| p.team_name.as_deref().map_or(true, |t| t == self.team.as_str()))
            .map(|p| Pipeline {
                url: format!("{}/teams/{}/pipelines/{}", self.target, self.team, p.name),
                name: PipelineName(p.name),
                team_name: self.team.clone(),
            })
            .collect())
    }

    async fn get_config(&self, pipeline: &PipelineName) -> Result<PipelineConfig, RemoteError> {
        let raw = self
            .run(&[
                "get-pipeline".to_string(),
                "-p".to_string(),
                pipeline.to_string(),
            ])
            .await?
            .map_err(|f| self.classify(f, Some(pipeline)))?;

        let config: Value = serde_yaml::from_str(&raw).map_err(|e| {
            RemoteError::transport(&self.target, format!("invalid config for {pipeline}: {e}"))
        })?;
        if config.is_null() {
            return Err(RemoteError::NotFound {
                target: self.target.clone(),
                what: format!("pipeline {}/{pipeline}", self.team),
            });
        }

        Ok(PipelineConfig {
            version: content_version(&raw),
            config,
            raw,
        })
    }

    async fn set_config(
        &self,
        pipeline: &PipelineName,
        version: Option<&ConfigVersion>,
        config: &Value,
    ) -> Result<(), RemoteError> {
        match (self.get_config(pipeline).await, version) {
            (Ok(current), Some(expected)) if &current.version == expected => {}
            (Err(e), None) if e.is_not_found() => {}
            (Err(e), Some(_)) if !e.is_not_found() => return Err(e),
            (Err(e), None) => return Err(e),
            _ => return Err(self.conflict(pipeline)),
        }

        let scratch = self.write_scratch_config(config)?;
        self.run(&[
            "set-pipeline".to_string(),
            "-n".to_string(),
            "-p".to_string(),
            pipeline.to_string(),
            "-c".to_string(),
            path_arg(scratch.path()),
        ])
        .await?
        .map_err(|f| self.classify(f, Some(pipeline)))?;
        Ok(())
    }

    async fn delete(&self, pipeline: &PipelineName) -> Result<(), RemoteError> {
        let out = self
            .run(&[
                "destroy-pipeline".to_string(),
                "-n".to_string(),
                "-p".to_string(),
                pipeline.to_string(),
            ])
            .await?
            .map_err(|f| self.classify(f, Some(pipeline)))?;

        // fly exits 0 for a pipeline that is already gone.
        let lowered = out.to_ascii_lowercase();
        if lowered.contains("does not exist") || lowered.contains("already gone") {
            return Err(RemoteError::NotFound {
                target: self.target.clone(),
                what: format!("pipeline {}/{pipeline}", self.team),
            });
        }
        Ok(())
    }
}
