use super::records::{owner_directory, DealRecord, OwnerRecord};
use super::{CrmError, DealScope, DealSource};
use crate::workflows::funnel::domain::{Deal, RepDirectory, StageTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Saved CRM export: owners and deal search results in HubSpot's own shapes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DealExport {
    #[serde(default)]
    pub owners: Vec<OwnerRecord>,
    #[serde(default)]
    pub deals: Vec<DealRecord>,
}

impl DealExport {
    pub fn from_json(raw: &str) -> Result<Self, CrmError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Replays a saved export instead of calling the API.
#[derive(Debug, Clone)]
pub struct FileDealSource {
    path: PathBuf,
    stages: StageTable,
}

impl FileDealSource {
    pub fn new(path: impl Into<PathBuf>, stages: StageTable) -> Self {
        Self {
            path: path.into(),
            stages,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<DealExport, CrmError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        DealExport::from_json(&raw)
    }
}

impl DealSource for FileDealSource {
    async fn owners(&self) -> Result<RepDirectory, CrmError> {
        let export = self.load().await?;
        Ok(owner_directory(&export.owners))
    }

    async fn deals(&self, scope: DealScope) -> Result<Vec<Deal>, CrmError> {
        let export = self.load().await?;
        let deals: Vec<Deal> = export
            .deals
            .into_iter()
            .map(|record| record.into_deal(&self.stages))
            .filter(|deal| scope.admits(deal))
            .collect();
        info!(deals = deals.len(), path = %self.path.display(), "loaded deals from export");
        Ok(deals)
    }
}
