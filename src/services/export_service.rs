use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{ImportExportError, ImportExportResult};
use crate::graph_store::GraphStore;
use crate::model::ScriptDocument;

/// On-disk encoding of a [`ScriptDocument`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Format implied by a file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }

    /// Sniffs the format of raw document text.
    pub fn detect(text: &str) -> Self {
        match text.trim_start().chars().next() {
            Some('{') | Some('[') => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Json => "json",
            DocumentFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for DocumentFormat {
    type Err = ImportExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            other => Err(ImportExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Serializes the live graph into export documents.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExportService {
    format: DocumentFormat,
}

impl ExportService {
    pub fn new(format: DocumentFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Every node in store order, positions and groups included.
    pub fn document(store: &GraphStore) -> ScriptDocument {
        ScriptDocument::new(store.to_vec())
    }

    pub fn render(&self, document: &ScriptDocument) -> ImportExportResult<String> {
        match self.format {
            DocumentFormat::Json => Ok(serde_json::to_string_pretty(document)?),
            DocumentFormat::Yaml => Ok(serde_yaml::to_string(document)?),
        }
    }

    pub fn export(&self, store: &GraphStore) -> ImportExportResult<String> {
        self.render(&Self::document(store))
    }

    /// Writes the graph to `path`. The file extension wins over the
    /// configured format when it names one.
    pub async fn export_to_file(
        &self,
        store: &GraphStore,
        path: impl AsRef<Path>,
    ) -> ImportExportResult<PathBuf> {
        let path = path.as_ref();
        let service = DocumentFormat::from_path(path)
            .map(Self::new)
            .unwrap_or(*self);
        let text = service.export(store)?;
        tokio::fs::write(path, text).await?;
        info!(path = %path.display(), format = %service.format, nodes = store.len(), "Exported script");
        Ok(path.to_path_buf())
    }
}
