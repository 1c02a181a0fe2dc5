//! Domain types and the JSON envelopes exchanged with the orchestrator.
//!
//! Everything here is constructed once per invocation from the request on
//! stdin (or fetched fresh from the remote server) and is read-only after
//! that. Nothing is cached between runs; the [`Version`] handed back to the
//! caller is the only durable state.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Name of a credential scope on the remote server.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamName(pub String);

impl TeamName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TeamName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TeamName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Name of a pipeline, unique within its team.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineName(pub String);

impl PipelineName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PipelineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PipelineName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PipelineName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque, server-assigned token used for optimistic-concurrency writes.
///
/// Never computed from config content by the HTTP backend; only echoed back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigVersion(pub String);

impl ConfigVersion {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ConfigVersion {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConfigVersion {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Key identifying a pipeline across teams: `"<team>/<pipeline>"`.
pub fn pipeline_key(team: &TeamName, pipeline: &PipelineName) -> String {
    format!("{team}/{pipeline}")
}

// ---------------------------------------------------------------------------
// Source configuration
// ---------------------------------------------------------------------------

/// A named credential set.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub name: TeamName,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Team")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Which remote backend drives the team clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Talk to the server's HTTP API directly.
    #[default]
    Api,
    /// Shell out to the `fly` command-line binary.
    Fly,
}

/// How the resource version is represented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionMode {
    /// One opaque server token per `"<team>/<pipeline>"` key.
    #[default]
    PerPipeline,
    /// A single `pipelines_checksum` digest over every raw config.
    Checksum,
}

/// Connection configuration shared by every team client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(default)]
    pub target: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub insecure: bool,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub version_mode: VersionMode,
}

impl Source {
    /// Use `fallback` as the target when none was configured.
    pub fn fill_target_from(&mut self, fallback: Option<String>) {
        if self.target.is_empty() {
            if let Some(url) = fallback.filter(|u| !u.is_empty()) {
                self.target = url;
            }
        }
    }

    pub fn team(&self, name: &TeamName) -> Option<&Team> {
        self.teams.iter().find(|t| &t.name == name)
    }
}

/// Accepts a JSON bool, a bool-ish string (`"true"`, `"1"`, `"f"`, …) or null.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Option::<Flag>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Flag::Bool(b)) => Ok(b),
        Some(Flag::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "f" | "false" => Ok(false),
            "1" | "t" | "true" => Ok(true),
            _ => Err(D::Error::custom(format!("invalid value for insecure: {s}"))),
        },
    }
}

// ---------------------------------------------------------------------------
// Remote pipelines
// ---------------------------------------------------------------------------

/// Identity of a pipeline instance as enumerated by the remote server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: PipelineName,
    #[serde(default)]
    pub team_name: TeamName,
    #[serde(default)]
    pub url: String,
}

impl Pipeline {
    pub fn key(&self) -> String {
        pipeline_key(&self.team_name, &self.name)
    }
}

/// Full definition of one pipeline at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Structured config (`groups`, `resources`, `resource_types`, `jobs`, …).
    pub config: serde_json::Value,
    /// Raw textual config as served by the remote.
    pub raw: String,
    /// Token to hand back on the next write.
    pub version: ConfigVersion,
}

// ---------------------------------------------------------------------------
// Versions and envelopes
// ---------------------------------------------------------------------------

/// Resource version: pipeline key → version string.
///
/// A `BTreeMap` so that serialisation and equality never depend on the order
/// pipelines were listed or fetched in.
pub type Version = BTreeMap<String, String>;

/// `check` output: at most one version; empty means "no new version".
pub type CheckResponse = Vec<Version>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub value: String,
}

impl Metadata {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
}

/// `in` accepts no parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InParams {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InRequest {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub version: Option<Version>,
    #[serde(default)]
    pub params: InParams,
}

/// A local pipeline definition to push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    #[serde(default)]
    pub name: PipelineName,
    #[serde(default)]
    pub team_name: TeamName,
    #[serde(default)]
    pub config_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars_files: Option<Vec<String>>,
}

impl PublishRequest {
    pub fn key(&self) -> String {
        pipeline_key(&self.team_name, &self.name)
    }

    pub fn vars_files(&self) -> &[String] {
        self.vars_files.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipelines: Option<Vec<PublishRequest>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipelines_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutRequest {
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub params: OutParams,
}

/// Output of `in` and `out`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedResponse {
    pub version: Version,
    pub metadata: Vec<Metadata>,
}

pub type InResponse = VersionedResponse;
pub type OutResponse = VersionedResponse;

/// Contents of an `out` `pipelines_file`: a bare list, or `{pipelines: [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PipelinesFile {
    List(Vec<PublishRequest>),
    Wrapped { pipelines: Vec<PublishRequest> },
}

/// Parse the YAML body of a `pipelines_file`.
pub fn parse_pipelines_file(contents: &str) -> Result<Vec<PublishRequest>, serde_yaml::Error> {
    Ok(match serde_yaml::from_str::<PipelinesFile>(contents)? {
        PipelinesFile::List(list) => list,
        PipelinesFile::Wrapped { pipelines } => pipelines,
    })
}
