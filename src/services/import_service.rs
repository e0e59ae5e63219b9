use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::export_service::DocumentFormat;
use crate::confirm::{ConfirmScope, Confirmation, Impact};
use crate::errors::{ImportExportError, ImportExportResult, StoreError};
use crate::graph_store::GraphStore;
use crate::model::{Node, ScriptDocument};
use crate::store::RemoteStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStrategy {
    /// Upsert by id; nodes absent from the document are left alone
    #[default]
    Merge,
    /// Replace the whole graph with the document
    Overwrite,
}

/// Preview of an import. Nothing is written until it is applied.
#[derive(Clone, Debug, Serialize)]
pub struct ImportPlan {
    pub strategy: ImportStrategy,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
    /// Edges removed, replaced or added by the import
    pub affected_edges: usize,
    #[serde(skip)]
    nodes: Vec<Node>,
    confirmation: Option<Confirmation>,
}

impl ImportPlan {
    /// Token required to apply an overwrite.
    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_noop(&self) -> bool {
        match self.strategy {
            ImportStrategy::Merge => self.created.is_empty() && self.updated.is_empty(),
            ImportStrategy::Overwrite => false,
        }
    }

    /// Remote calls the plan will make.
    pub fn operation_count(&self) -> usize {
        match self.strategy {
            ImportStrategy::Merge => self.created.len() + self.updated.len(),
            ImportStrategy::Overwrite => {
                self.deleted.len() + self.updated.len() + self.unchanged.len() + self.nodes.len()
            }
        }
    }

    pub(crate) fn with_scope(mut self, scope: ConfirmScope) -> Self {
        let impact = self
            .confirmation
            .as_ref()
            .map(|c| c.impact().clone())
            .unwrap_or_default();
        self.confirmation = Some(Confirmation::new(scope, impact));
        self
    }
}

/// Counts of what an import actually wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Parses document text. Unknown node types and malformed shapes are
/// reported as [`ImportExportError::InvalidFormat`].
pub fn parse_document(
    text: &str,
    format: Option<DocumentFormat>,
) -> ImportExportResult<ScriptDocument> {
    let format = format.unwrap_or_else(|| DocumentFormat::detect(text));
    let document: ScriptDocument = match format {
        DocumentFormat::Json => serde_json::from_str(text)
            .map_err(|err| ImportExportError::InvalidFormat(err.to_string()))?,
        DocumentFormat::Yaml => serde_yaml::from_str(text)
            .map_err(|err| ImportExportError::InvalidFormat(err.to_string()))?,
    };
    validate_document(&document)?;
    Ok(document)
}

pub async fn read_document(
    path: impl AsRef<Path>,
    format: Option<DocumentFormat>,
) -> ImportExportResult<ScriptDocument> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await?;
    parse_document(&text, format.or_else(|| DocumentFormat::from_path(path)))
}

pub fn validate_document(document: &ScriptDocument) -> ImportExportResult<()> {
    let mut seen = HashSet::new();
    for (index, node) in document.nodes.iter().enumerate() {
        if node.id.trim().is_empty() {
            return Err(ImportExportError::InvalidFormat(format!(
                "node #{} has a blank id",
                index + 1
            )));
        }
        if !seen.insert(node.id.as_str()) {
            return Err(ImportExportError::DuplicateNode(node.id.clone()));
        }
    }
    Ok(())
}

/// Applies documents to the live graph and the remote store.
#[derive(Clone)]
pub struct ImportService {
    store: Arc<RwLock<GraphStore>>,
    remote: Arc<dyn RemoteStore>,
}

impl ImportService {
    pub fn new(store: Arc<RwLock<GraphStore>>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { store, remote }
    }

    pub async fn plan(
        &self,
        document: ScriptDocument,
        strategy: ImportStrategy,
    ) -> ImportExportResult<ImportPlan> {
        validate_document(&document)?;
        let store = self.store.read().await;
        Ok(Self::plan_against(&store, document.nodes, strategy))
    }

    fn plan_against(store: &GraphStore, nodes: Vec<Node>, strategy: ImportStrategy) -> ImportPlan {
        let mut created = Vec::new();
        let mut updated = Vec::new();
        let mut unchanged = Vec::new();
        let mut affected_edges = 0;

        for node in &nodes {
            match store.get(&node.id) {
                None => {
                    created.push(node.id.clone());
                    affected_edges += node.responses.len();
                }
                Some(current) if current == node => unchanged.push(node.id.clone()),
                Some(current) => {
                    updated.push(node.id.clone());
                    affected_edges += current.responses.len().max(node.responses.len());
                }
            }
        }

        let (deleted, confirmation) = match strategy {
            ImportStrategy::Merge => (Vec::new(), None),
            ImportStrategy::Overwrite => {
                let incoming: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
                let deleted: Vec<String> = store
                    .iter()
                    .filter(|n| !incoming.contains(n.id.as_str()))
                    .map(|n| n.id.clone())
                    .collect();
                affected_edges += deleted
                    .iter()
                    .filter_map(|id| store.get(id))
                    .map(|n| n.responses.len())
                    .sum::<usize>();
                let impact = Impact {
                    nodes: deleted.len() + updated.len(),
                    edges: affected_edges,
                };
                (
                    deleted,
                    Some(Confirmation::new(ConfirmScope::OverwriteImport, impact)),
                )
            }
        };

        ImportPlan {
            strategy,
            created,
            updated,
            unchanged,
            deleted,
            affected_edges,
            nodes,
            confirmation,
        }
    }

    /// Applies a plan. Overwrites need the confirmation issued with this
    /// very plan; a token from another preview is refused.
    pub async fn apply(
        &self,
        plan: &ImportPlan,
        confirmation: Option<&Confirmation>,
    ) -> ImportExportResult<ImportSummary> {
        self.apply_scoped(plan, confirmation, &ConfirmScope::OverwriteImport)
            .await
    }

    pub(crate) async fn apply_scoped(
        &self,
        plan: &ImportPlan,
        confirmation: Option<&Confirmation>,
        scope: &ConfirmScope,
    ) -> ImportExportResult<ImportSummary> {
        match plan.strategy {
            ImportStrategy::Merge => self.merge(plan).await,
            ImportStrategy::Overwrite => {
                let confirmed = match (plan.confirmation(), confirmation) {
                    (Some(required), Some(given)) => given == required && given.matches(scope),
                    _ => false,
                };
                if !confirmed {
                    return Err(ImportExportError::ConfirmationRequired(scope.to_string()));
                }
                self.overwrite(plan).await
            }
        }
    }

    async fn merge(&self, plan: &ImportPlan) -> ImportExportResult<ImportSummary> {
        let total = plan.operation_count();
        let created: HashSet<&str> = plan.created.iter().map(String::as_str).collect();
        let updated: HashSet<&str> = plan.updated.iter().map(String::as_str).collect();
        let mut summary = ImportSummary::default();

        for node in &plan.nodes {
            let stored = if created.contains(node.id.as_str()) {
                let stored = self
                    .remote
                    .create_node(node)
                    .await
                    .map_err(|err| interrupted(&summary, total, err))?;
                summary.created += 1;
                stored
            } else if updated.contains(node.id.as_str()) {
                let stored = self
                    .remote
                    .update_node(&node.id, node)
                    .await
                    .map_err(|err| interrupted(&summary, total, err))?;
                summary.updated += 1;
                stored
            } else {
                continue;
            };
            self.store.write().await.insert(stored);
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            unchanged = plan.unchanged.len(),
            "Merged import"
        );
        Ok(summary)
    }

    async fn overwrite(&self, plan: &ImportPlan) -> ImportExportResult<ImportSummary> {
        // everything live now, including nodes added after the preview
        let existing: Vec<String> = self.store.read().await.ids().map(str::to_string).collect();
        let planned = plan.operation_count() - plan.nodes.len();
        if existing.len() != planned {
            warn!(
                planned,
                actual = existing.len(),
                "Graph changed since the import was previewed"
            );
        }
        let total = existing.len() + plan.nodes.len();
        let mut summary = ImportSummary::default();

        for id in &existing {
            match self.remote.delete_node(id).await {
                Ok(()) => {}
                // already gone remotely; the local mirror was stale
                Err(StoreError::NotFound(_)) => debug!(node_id = %id, "Node already deleted"),
                Err(err) => return Err(interrupted(&summary, total, err)),
            }
            self.store.write().await.remove(id);
            summary.deleted += 1;
        }

        for node in &plan.nodes {
            let stored = self
                .remote
                .create_node(node)
                .await
                .map_err(|err| interrupted(&summary, total, err))?;
            self.store.write().await.insert(stored);
            summary.created += 1;
        }

        info!(
            deleted = summary.deleted,
            created = summary.created,
            "Overwrote graph from import"
        );
        Ok(summary)
    }
}

fn interrupted(summary: &ImportSummary, total: usize, source: StoreError) -> ImportExportError {
    let completed = summary.created + summary.updated + summary.deleted;
    if completed == 0 {
        return ImportExportError::Store(source);
    }
    warn!(completed, total, "Import interrupted: {}", source);
    ImportExportError::Interrupted {
        completed,
        total,
        source,
    }
}
