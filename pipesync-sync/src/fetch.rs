//! Team clients and the concurrent list/fetch passes built on [`run_for_all`].

use std::sync::Arc;

use pipesync_core::{pipeline_key, Pipeline, PipelineConfig, PipelineName, Team, TeamName};
use pipesync_remote::{Connector, RemoteClient};

use crate::error::SyncError;
use crate::fanout::run_for_all;

/// One authenticated client per configured team, in `source.teams` order.
pub struct TeamClients {
    clients: Vec<Arc<dyn RemoteClient>>,
}

/// A pipeline to fetch, paired with the client of the team that owns it.
#[derive(Clone)]
pub struct WorkItem {
    pub client: Arc<dyn RemoteClient>,
    pub pipeline: Pipeline,
}

/// A pipeline config fetched from the remote.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPipeline {
    pub team: TeamName,
    pub name: PipelineName,
    pub config: PipelineConfig,
}

impl FetchedPipeline {
    /// `"<team>/<pipeline>"`.
    pub fn key(&self) -> String {
        pipeline_key(&self.team, &self.name)
    }
}

impl TeamClients {
    /// Authenticate every team concurrently. Any failed login fails the call.
    pub async fn connect_all(
        connector: Arc<dyn Connector>,
        teams: &[Team],
    ) -> Result<Self, SyncError> {
        let clients = run_for_all(teams.to_vec(), |_, team| {
            let connector = connector.clone();
            async move { Ok::<_, SyncError>(connector.connect(&team).await?) }
        })
        .await?;
        tracing::info!(teams = clients.len(), "connected");
        Ok(Self { clients })
    }

    pub fn get(&self, team: &TeamName) -> Option<&Arc<dyn RemoteClient>> {
        self.clients.iter().find(|c| c.team() == team)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// List every team's pipelines concurrently and flatten them into one
    /// ordered work list: team order first, then the remote's listing order.
    pub async fn list_all(&self) -> Result<Vec<WorkItem>, SyncError> {
        let per_team = run_for_all(self.clients.clone(), |_, client| async move {
            let listed = client.list_pipelines().await?;
            let items: Vec<WorkItem> = listed
                .into_iter()
                .map(|pipeline| WorkItem {
                    // Listings are team-scoped; the client's team is authoritative.
                    pipeline: Pipeline {
                        team_name: client.team().clone(),
                        ..pipeline
                    },
                    client: client.clone(),
                })
                .collect();
            Ok::<_, SyncError>(items)
        })
        .await?;

        let work: Vec<WorkItem> = per_team.into_iter().flatten().collect();
        tracing::debug!(pipelines = work.len(), "listed pipelines");
        Ok(work)
    }

    /// Fetch the config of every pipeline of every team.
    ///
    /// All-or-nothing: one failed fetch fails the call and nothing is
    /// returned for the others.
    pub async fn fetch_all(&self) -> Result<Vec<FetchedPipeline>, SyncError> {
        let work = self.list_all().await?;
        let fetched = run_for_all(work, |_, item| async move {
            let config = item.client.get_config(&item.pipeline.name).await?;
            Ok::<_, SyncError>(FetchedPipeline {
                team: item.pipeline.team_name,
                name: item.pipeline.name,
                config,
            })
        })
        .await?;
        tracing::info!(pipelines = fetched.len(), "fetched pipeline configs");
        Ok(fetched)
    }
}
