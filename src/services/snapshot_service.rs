use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use super::export_service::ExportService;
use super::import_service::{ImportPlan, ImportService, ImportStrategy, ImportSummary};
use crate::confirm::{ConfirmScope, Confirmation};
use crate::errors::{ImportExportResult, StoreResult};
use crate::graph_store::GraphStore;
use crate::model::{Snapshot, SnapshotSummary};
use crate::store::{RemoteStore, SnapshotStore};

/// Preview of a snapshot restore.
#[derive(Clone, Debug)]
pub struct RestorePlan {
    pub snapshot: SnapshotSummary,
    pub import: ImportPlan,
}

impl RestorePlan {
    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.import.confirmation()
    }
}

/// Point-in-time captures of the whole graph.
#[derive(Clone)]
pub struct SnapshotService {
    store: Arc<RwLock<GraphStore>>,
    snapshots: Arc<dyn SnapshotStore>,
    importer: ImportService,
}

impl SnapshotService {
    pub fn new(
        store: Arc<RwLock<GraphStore>>,
        remote: Arc<dyn RemoteStore>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        Self {
            importer: ImportService::new(Arc::clone(&store), remote),
            store,
            snapshots,
        }
    }

    pub async fn create(&self, label: &str, created_by: &str) -> StoreResult<SnapshotSummary> {
        let data = {
            let store = self.store.read().await;
            ExportService::document(&store)
        };
        let snapshot = Snapshot {
            id: Uuid::new_v4().to_string(),
            label: label.to_string(),
            created_at: Utc::now(),
            created_by: created_by.to_string(),
            data,
        };
        self.snapshots.create_snapshot(&snapshot).await?;
        info!(snapshot_id = %snapshot.id, label, nodes = snapshot.data.nodes.len(), "Snapshot created");
        Ok(snapshot.summary())
    }

    pub async fn list(&self) -> StoreResult<Vec<SnapshotSummary>> {
        self.snapshots.list_snapshots().await
    }

    pub async fn get(&self, id: &str) -> StoreResult<Snapshot> {
        self.snapshots.get_snapshot(id).await
    }

    pub async fn plan_restore(&self, id: &str) -> ImportExportResult<RestorePlan> {
        let snapshot = self.snapshots.get_snapshot(id).await?;
        let summary = snapshot.summary();
        let import = self
            .importer
            .plan(snapshot.data, ImportStrategy::Overwrite)
            .await?
            .with_scope(ConfirmScope::RestoreSnapshot(id.to_string()));
        Ok(RestorePlan {
            snapshot: summary,
            import,
        })
    }

    /// Overwrites the live graph with the snapshot's nodes.
    pub async fn restore(
        &self,
        plan: &RestorePlan,
        confirmation: Option<&Confirmation>,
    ) -> ImportExportResult<ImportSummary> {
        let scope = ConfirmScope::RestoreSnapshot(plan.snapshot.id.clone());
        let summary = self
            .importer
            .apply_scoped(&plan.import, confirmation, &scope)
            .await?;
        info!(snapshot_id = %plan.snapshot.id, label = %plan.snapshot.label, "Snapshot restored");
        Ok(summary)
    }
}
