//! In-memory stand-in for a remote CI server.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use pipesync_core::{
    ConfigVersion, Pipeline, PipelineConfig, PipelineName, Source, Team, TeamName,
};
use pipesync_remote::{Connector, RemoteClient, RemoteError};

pub const TARGET: &str = "https://ci.example.com";

#[derive(Clone)]
struct Stored {
    name: String,
    config: Value,
    raw: String,
    version: u64,
    delay_ms: u64,
}

#[derive(Default)]
struct TeamState {
    password: String,
    pipelines: Vec<Stored>,
}

#[derive(Default)]
struct State {
    teams: BTreeMap<String, TeamState>,
    calls: usize,
    failing: HashSet<String>,
    reversed: bool,
}

/// Shared fake server; cheap to clone.
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(self, name: &str, password: &str) -> Self {
        self.state.lock().unwrap().teams.insert(
            name.into(),
            TeamState {
                password: password.into(),
                pipelines: Vec::new(),
            },
        );
        self
    }

    /// Add a pipeline whose raw config is `raw` (YAML).
    pub fn pipeline(self, team: &str, name: &str, raw: &str) -> Self {
        self.pipeline_with_delay(team, name, raw, 0)
    }

    /// Like [`pipeline`](Self::pipeline), but `get_config` sleeps first.
    pub fn pipeline_with_delay(self, team: &str, name: &str, raw: &str, delay_ms: u64) -> Self {
        {
            let mut s = self.state.lock().unwrap();
            let config: Value = serde_yaml::from_str(raw).unwrap();
            s.teams.get_mut(team).unwrap().pipelines.push(Stored {
                name: name.into(),
                config,
                raw: raw.into(),
                version: 1,
                delay_ms,
            });
        }
        self
    }

    /// Make `get_config` of `team/name` fail with a transport error.
    pub fn failing(self, key: &str) -> Self {
        self.state.lock().unwrap().failing.insert(key.into());
        self
    }

    /// List pipelines in reverse insertion order.
    pub fn set_reversed(&self, reversed: bool) {
        self.state.lock().unwrap().reversed = reversed;
    }

    /// Number of requests served, logins included.
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    pub fn config(&self, key: &str) -> Option<Value> {
        let (team, name) = key.split_once('/').unwrap();
        let s = self.state.lock().unwrap();
        s.teams[team]
            .pipelines
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.config.clone())
    }

    /// Simulate an edit made by someone else.
    pub fn edit(&self, key: &str, raw: &str) {
        let (team, name) = key.split_once('/').unwrap();
        let mut s = self.state.lock().unwrap();
        let stored = s
            .teams
            .get_mut(team)
            .unwrap()
            .pipelines
            .iter_mut()
            .find(|p| p.name == name)
            .unwrap();
        stored.config = serde_yaml::from_str(raw).unwrap();
        stored.raw = raw.into();
        stored.version += 1;
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(FakeConnector {
            server: self.clone(),
        })
    }
}

struct FakeConnector {
    server: FakeServer,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, team: &Team) -> Result<Arc<dyn RemoteClient>, RemoteError> {
        let mut s = self.server.state.lock().unwrap();
        s.calls += 1;
        let Some(state) = s.teams.get(team.name.as_str()) else {
            return Err(RemoteError::NotFound {
                target: TARGET.into(),
                what: format!("team {}", team.name),
            });
        };
        if state.password != team.password {
            return Err(RemoteError::Authentication {
                target: TARGET.into(),
                team: team.name.to_string(),
                message: "server responded 401 Unauthorized".into(),
            });
        }
        Ok(Arc::new(FakeClient {
            server: self.server.clone(),
            team: team.name.clone(),
        }))
    }
}

struct FakeClient {
    server: FakeServer,
    team: TeamName,
}

impl FakeClient {
    fn not_found(&self, pipeline: &PipelineName) -> RemoteError {
        RemoteError::NotFound {
            target: TARGET.into(),
            what: format!("pipeline {}/{pipeline}", self.team),
        }
    }
}

#[async_trait]
impl RemoteClient for FakeClient {
    fn team(&self) -> &TeamName {
        &self.team
    }

    fn target(&self) -> &str {
        TARGET
    }

    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, RemoteError> {
        let mut s = self.server.state.lock().unwrap();
        s.calls += 1;
        let mut listed: Vec<Pipeline> = s.teams[self.team.as_str()]
            .pipelines
            .iter()
            .map(|p| Pipeline {
                name: PipelineName::from(p.name.as_str()),
                team_name: self.team.clone(),
                url: format!("/teams/{}/pipelines/{}", self.team, p.name),
            })
            .collect();
        if s.reversed {
            listed.reverse();
        }
        Ok(listed)
    }

    async fn get_config(&self, pipeline: &PipelineName) -> Result<PipelineConfig, RemoteError> {
        let key = format!("{}/{pipeline}", self.team);
        let (found, delay) = {
            let mut s = self.server.state.lock().unwrap();
            s.calls += 1;
            if s.failing.contains(&key) {
                return Err(RemoteError::Transport {
                    target: TARGET.into(),
                    message: format!("connection reset fetching {key}"),
                });
            }
            let found = s.teams[self.team.as_str()]
                .pipelines
                .iter()
                .find(|p| p.name == pipeline.as_str())
                .cloned();
            let delay = found.as_ref().map_or(0, |p| p.delay_ms);
            (found, delay)
        };
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let stored = found.ok_or_else(|| self.not_found(pipeline))?;
        Ok(PipelineConfig {
            config: stored.config,
            raw: stored.raw,
            version: ConfigVersion(stored.version.to_string()),
        })
    }

    async fn set_config(
        &self,
        pipeline: &PipelineName,
        version: Option<&ConfigVersion>,
        config: &Value,
    ) -> Result<(), RemoteError> {
        let mut s = self.server.state.lock().unwrap();
        s.calls += 1;
        let team = s.teams.get_mut(self.team.as_str()).unwrap();
        let position = team.pipelines.iter().position(|p| p.name == pipeline.as_str());
        let raw = serde_yaml::to_string(config).unwrap();
        match (position, version) {
            (None, None) => {
                team.pipelines.push(Stored {
                    name: pipeline.to_string(),
                    config: config.clone(),
                    raw,
                    version: 1,
                    delay_ms: 0,
                });
                Ok(())
            }
            (Some(i), Some(v)) if v.as_str() == team.pipelines[i].version.to_string() => {
                let stored = &mut team.pipelines[i];
                stored.config = config.clone();
                stored.raw = raw;
                stored.version += 1;
                Ok(())
            }
            _ => Err(RemoteError::ConcurrentModification {
                target: TARGET.into(),
                team: self.team.to_string(),
                pipeline: pipeline.to_string(),
            }),
        }
    }

    async fn delete(&self, pipeline: &PipelineName) -> Result<(), RemoteError> {
        let mut s = self.server.state.lock().unwrap();
        s.calls += 1;
        let team = s.teams.get_mut(self.team.as_str()).unwrap();
        let before = team.pipelines.len();
        team.pipelines.retain(|p| p.name != pipeline.as_str());
        if team.pipelines.len() == before {
            return Err(self.not_found(pipeline));
        }
        Ok(())
    }
}

/// A source for the given `(team, password)` pairs.
pub fn source(teams: &[(&str, &str)]) -> Source {
    Source {
        target: TARGET.into(),
        teams: teams
            .iter()
            .map(|(name, password)| Team {
                name: TeamName::from(*name),
                username: format!("{name}-user"),
                password: (*password).into(),
            })
            .collect(),
        ..Source::default()
    }
}
