use std::path::{Path, PathBuf};

use tracing::info;

use super::EditorContext;
use crate::confirm::Confirmation;
use crate::errors::{EditorResult, ImportExportError};
use crate::model::{ScriptDocument, SnapshotSummary};
use crate::services::{
    parse_document, read_document, DocumentFormat, ExportService, ImportPlan, ImportStrategy,
    ImportSummary, RestorePlan,
};

impl EditorContext {
    pub async fn export(&self, format: DocumentFormat) -> EditorResult<String> {
        let store = self.store.read().await;
        Ok(ExportService::new(format).export(&store)?)
    }

    pub async fn export_to_file(&self, path: impl AsRef<Path>) -> EditorResult<PathBuf> {
        let store = self.store.read().await;
        Ok(ExportService::default().export_to_file(&store, path).await?)
    }

    pub async fn plan_import(
        &self,
        document: ScriptDocument,
        strategy: ImportStrategy,
    ) -> EditorResult<ImportPlan> {
        Ok(self.importer.plan(document, strategy).await?)
    }

    /// Parses `text` (format sniffed when `None`) and previews the import.
    pub async fn plan_import_text(
        &self,
        text: &str,
        format: Option<DocumentFormat>,
        strategy: ImportStrategy,
    ) -> EditorResult<ImportPlan> {
        self.plan_import(parse_document(text, format)?, strategy).await
    }

    pub async fn plan_import_file(
        &self,
        path: impl AsRef<Path>,
        strategy: ImportStrategy,
    ) -> EditorResult<ImportPlan> {
        self.plan_import(read_document(path, None).await?, strategy).await
    }

    /// Applies an import and clears history. An interrupted import still
    /// clears it, since part of the graph was replaced.
    pub async fn apply_import(
        &self,
        plan: &ImportPlan,
        confirmation: Option<&Confirmation>,
    ) -> EditorResult<ImportSummary> {
        let result = self.importer.apply(plan, confirmation).await;
        self.after_bulk_write(&result);
        Ok(result?)
    }

    pub async fn create_snapshot(&self, label: &str) -> EditorResult<SnapshotSummary> {
        Ok(self.snapshots.create(label, self.holder()).await?)
    }

    pub async fn list_snapshots(&self) -> EditorResult<Vec<SnapshotSummary>> {
        Ok(self.snapshots.list().await?)
    }

    pub async fn plan_restore(&self, snapshot_id: &str) -> EditorResult<RestorePlan> {
        Ok(self.snapshots.plan_restore(snapshot_id).await?)
    }

    pub async fn restore_snapshot(
        &self,
        plan: &RestorePlan,
        confirmation: Option<&Confirmation>,
    ) -> EditorResult<ImportSummary> {
        let result = self.snapshots.restore(plan, confirmation).await;
        self.after_bulk_write(&result);
        Ok(result?)
    }

    fn after_bulk_write(&self, result: &Result<ImportSummary, ImportExportError>) {
        let wrote = match result {
            Ok(summary) => summary.created + summary.updated + summary.deleted > 0,
            Err(ImportExportError::Interrupted { .. }) => true,
            Err(_) => false,
        };
        if wrote {
            self.history.clear();
            info!("History cleared after bulk write");
        }
    }
}
