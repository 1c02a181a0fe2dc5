//! HTTP API backend.
//!
//! | Operation      | Request                                                  |
//! |----------------|----------------------------------------------------------|
//! | authenticate   | `GET  /api/v1/teams/{team}/auth/token` (basic auth)      |
//! | list           | `GET  /api/v1/teams/{team}/pipelines`                    |
//! | get config     | `GET  /api/v1/teams/{team}/pipelines/{name}/config`      |
//! | set config     | `PUT  /api/v1/teams/{team}/pipelines/{name}/config`      |
//! | delete         | `DELETE /api/v1/teams/{team}/pipelines/{name}`           |
//!
//! The config version travels in the `X-Concourse-Config-Version` header.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use pipesync_core::{ConfigVersion, Pipeline, PipelineConfig, PipelineName, Team, TeamName};

use crate::client::{Connector, RemoteClient};
use crate::error::RemoteError;

pub const CONFIG_VERSION_HEADER: &str = "X-Concourse-Config-Version";

/// Bearer token handed out by the auth endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    #[serde(rename = "type")]
    pub token_type: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct ConfigResponse {
    #[serde(default)]
    config: Value,
    #[serde(default)]
    raw_config: Option<String>,
}

/// Build `<target>/api/v1/teams/<team>/<rest...>`, escaping each segment.
fn endpoint(target: &str, team: &TeamName, rest: &[&str]) -> Result<Url, RemoteError> {
    let mut url = Url::parse(target)
        .map_err(|e| RemoteError::transport(target, format!("invalid target url: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| RemoteError::transport(target, "target url cannot be a base"))?
        .pop_if_empty()
        .extend(["api", "v1", "teams", team.as_str()])
        .extend(rest);
    Ok(url)
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Authenticates teams against the HTTP API.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    target: String,
    http: Client,
}

impl HttpConnector {
    pub fn new(
        target: &str,
        insecure: bool,
        timeout: Option<Duration>,
    ) -> Result<Self, RemoteError> {
        let mut builder = Client::builder().danger_accept_invalid_certs(insecure);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| RemoteError::transport(target, e.to_string()))?;
        Ok(Self::with_client(target, http))
    }

    /// Use a preconfigured reqwest client (proxies, custom roots, …).
    pub fn with_client(target: &str, http: Client) -> Self {
        Self {
            target: target.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    async fn fetch_token(&self, team: &Team) -> Result<AuthToken, RemoteError> {
        let url = endpoint(&self.target, &team.name, &["auth", "token"])?;
        tracing::debug!(team = %team.name, "requesting auth token");

        let response = self
            .http
            .get(url)
            .basic_auth(&team.username, Some(&team.password))
            .send()
            .await
            .map_err(|e| RemoteError::transport(&self.target, e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteError::Authentication {
                target: self.target.clone(),
                team: team.name.to_string(),
                message: format!("server responded {status}"),
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound {
                target: self.target.clone(),
                what: format!("team {}", team.name),
            });
        }
        if !status.is_success() {
            return Err(unexpected_status(&self.target, status, response).await);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::transport(&self.target, e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| {
            RemoteError::transport(&self.target, format!("invalid auth token response: {e}"))
        })
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, team: &Team) -> Result<Arc<dyn RemoteClient>, RemoteError> {
        let token = self.fetch_token(team).await?;
        tracing::info!(team = %team.name, target = %self.target, "authenticated");
        Ok(Arc::new(TeamApiClient {
            target: self.target.clone(),
            team: team.name.clone(),
            http: self.http.clone(),
            authorization: format!("{} {}", token.token_type, token.value),
        }))
    }
}

async fn unexpected_status(target: &str, status: StatusCode, response: Response) -> RemoteError {
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        RemoteError::transport(target, format!("unexpected status {status}"))
    } else {
        RemoteError::transport(target, format!("unexpected status {status}: {body}"))
    }
}

// ---------------------------------------------------------------------------
// Team client
// ---------------------------------------------------------------------------

/// HTTP client scoped to one authenticated team.
pub struct TeamApiClient {
    target: String,
    team: TeamName,
    http: Client,
    authorization: String,
}

impl TeamApiClient {
    /// Send `request` with the team's token and map error statuses.
    ///
    /// `pipeline` names the subject for 404/409 messages; `None` means the
    /// team itself.
    async fn send(
        &self,
        request: RequestBuilder,
        pipeline: Option<&PipelineName>,
    ) -> Result<Response, RemoteError> {
        let response = request
            .header(reqwest::header::AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(|e| RemoteError::transport(&self.target, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Authentication {
                target: self.target.clone(),
                team: self.team.to_string(),
                message: format!("server responded {status}"),
            },
            StatusCode::NOT_FOUND => RemoteError::NotFound {
                target: self.target.clone(),
                what: match pipeline {
                    Some(p) => format!("pipeline {}/{p}", self.team),
                    None => format!("team {}", self.team),
                },
            },
            StatusCode::CONFLICT => RemoteError::ConcurrentModification {
                target: self.target.clone(),
                team: self.team.to_string(),
                pipeline: pipeline.map(|p| p.to_string()).unwrap_or_default(),
            },
            _ => unexpected_status(&self.target, status, response).await,
        })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, RemoteError> {
        let body = response
            .bytes()
            .await
            .map_err(|e| RemoteError::transport(&self.target, e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| {
            RemoteError::transport(&self.target, format!("invalid response body: {e}"))
        })
    }
}

#[async_trait]
impl RemoteClient for TeamApiClient {
    fn team(&self) -> &TeamName {
        &self.team
    }

    fn target(&self) -> &str {
        &self.target
    }

    async fn list_pipelines(&self) -> Result<Vec<Pipeline>, RemoteError> {
        let url = endpoint(&self.target, &self.team, &["pipelines"])?;
        tracing::debug!(team = %self.team, "listing pipelines");

        let response = self.send(self.http.get(url), None).await?;
        let mut pipelines: Vec<Pipeline> = self.read_json(response).await?;
        for p in &mut pipelines {
            if p.team_name.as_str().is_empty() {
                p.team_name = self.team.clone();
            }
        }
        tracing::debug!(team = %self.team, count = pipelines.len(), "listed pipelines");
        Ok(pipelines)
    }

    async fn get_config(&self, pipeline: &PipelineName) -> Result<PipelineConfig, RemoteError> {
        let url = endpoint(&self.target, &self.team, &["pipelines", pipeline.as_str(), "config"])?;
        tracing::debug!(team = %self.team, %pipeline, "fetching config");

        let response = self.send(self.http.get(url), Some(pipeline)).await?;
        let version = response
            .headers()
            .get(CONFIG_VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ConfigVersion::from)
            .ok_or_else(|| {
                RemoteError::transport(
                    &self.target,
                    format!("config for {}/{pipeline} carried no {CONFIG_VERSION_HEADER}", self.team),
                )
            })?;

        let body: ConfigResponse = self.read_json(response).await?;
        let raw = match body.raw_config {
            Some(raw) => raw,
            None => serde_yaml::to_string(&body.config).map_err(|e| {
                RemoteError::transport(&self.target, format!("cannot render config: {e}"))
            })?,
        };

        Ok(PipelineConfig {
            config: body.config,
            raw,
            version,
        })
    }

    async fn set_config(
        &self,
        pipeline: &PipelineName,
        version: Option<&ConfigVersion>,
        config: &Value,
    ) -> Result<(), RemoteError> {
        let url = endpoint(&self.target, &self.team, &["pipelines", pipeline.as_str(), "config"])?;
        tracing::debug!(
            team = %self.team,
            %pipeline,
            version = ?version.map(ConfigVersion::as_str),
            "writing config"
        );

        let mut request = self.http.put(url).json(config);
        if let Some(version) = version {
            request = request.header(CONFIG_VERSION_HEADER, version.as_str());
        }
        self.send(request, Some(pipeline)).await?;
        Ok(())
    }

    async fn delete(&self, pipeline: &PipelineName) -> Result<(), RemoteError> {
        let url = endpoint(&self.target, &self.team, &["pipelines", pipeline.as_str()])?;
        tracing::debug!(team = %self.team, %pipeline, "deleting pipeline");

        self.send(self.http.delete(url), Some(pipeline)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_escapes_segments_and_keeps_base_path() {
        let url = endpoint(
            "https://ci.example.com/concourse/",
            &TeamName::from("main"),
            &["pipelines", "with space", "config"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://ci.example.com/concourse/api/v1/teams/main/pipelines/with%20space/config"
        );
    }

    #[test]
    fn endpoint_rejects_garbage_target() {
        let err = endpoint("not a url", &TeamName::from("main"), &[]).unwrap_err();
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn connector_trims_trailing_slash() {
        let c = HttpConnector::with_client("https://ci.example.com/", Client::new());
        assert_eq!(c.target(), "https://ci.example.com");
    }
}
