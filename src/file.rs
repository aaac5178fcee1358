//! A single source file and the extraction of its resources.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::diagnostics::{Diagnostic, DiagnosticsSink, TracingDiagnostics};
use crate::document::parse_documents;
use crate::factory::{ResourceFactory, KUSTOMIZATION_KIND};
use crate::helm;
use crate::ids::{IdGenerator, RandomIds};
use crate::models::{Resource, TextRange};

/// One file read by a repository. Immutable once built; an edited file is
/// a new `File`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct File {
    path: String,
    content: String,
    extension: String,
    is_helm_template: bool,
    is_helm_values: bool,
}

impl File {
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let is_helm_template = helm::is_template_path(&path);
        let is_helm_values = helm::is_values_file_name(file_name(&path));
        Self {
            path,
            content: content.into(),
            extension: extension.into(),
            is_helm_template,
            is_helm_values,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Extension including the leading dot (`.yaml`), or empty.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn is_helm_template(&self) -> bool {
        self.is_helm_template
    }

    pub fn is_helm_values(&self) -> bool {
        self.is_helm_values
    }

    /// Last path segment.
    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    /// A copy of this file with different content.
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..self.clone()
        }
    }

    /// Every resource declared in this file, in document order.
    ///
    /// Malformed documents are skipped and reported to the extractor's
    /// diagnostics sink; this never fails.
    pub fn get_resources(&self, extractor: &Extractor) -> Vec<Resource> {
        let factory = ResourceFactory::new(extractor.ids.as_ref());
        let mut result = Vec::new();

        for doc in parse_documents(&self.content) {
            if doc.has_errors() {
                extractor.diagnostics.report(Diagnostic::DocumentSkipped {
                    file_path: self.path.clone(),
                    file_name: file_stem(&self.path).to_string(),
                    document_index: doc.index,
                    error_count: doc.errors.len(),
                    first_error: doc.errors.first().cloned(),
                });
                continue;
            }

            if !doc.warnings.is_empty() {
                extractor.diagnostics.report(Diagnostic::DocumentWarnings {
                    file_path: self.path.clone(),
                    document_index: doc.index,
                    warnings: doc.warnings.clone(),
                });
            }

            let Some(content) = doc.content.clone() else {
                continue;
            };
            if !is_manifest(&content) {
                continue;
            }

            let text = doc.text(&self.content);
            let range = TextRange::new(doc.range.start, doc.range.len());
            result.push(factory.classify_at(content, text, &self.path, Some(range)));
        }

        result
    }
}

/// A mapping with a string `kind` and a string `apiVersion`; Kustomizations
/// may omit the latter.
fn is_manifest(content: &Value) -> bool {
    let Some(kind) = content.get("kind").and_then(Value::as_str) else {
        return false;
    };
    let has_api_version = content
        .get("apiVersion")
        .and_then(Value::as_str)
        .is_some_and(|v| !v.is_empty());
    !kind.is_empty() && (has_api_version || kind == KUSTOMIZATION_KIND)
}

pub(crate) fn file_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(ix) => &path[ix + 1..],
        None => path,
    }
}

fn file_stem(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(ix) if ix > 0 => &name[..ix],
        _ => name,
    }
}

/// Extension of the last path segment with its leading dot, or empty.
pub fn extension_of(path: &str) -> &str {
    let name = file_name(path);
    match name.rfind('.') {
        Some(ix) if ix > 0 => &name[ix..],
        _ => "",
    }
}

/// The collaborators extraction needs: where ids come from and where
/// diagnostics go.
#[derive(Clone)]
pub struct Extractor {
    ids: Arc<dyn IdGenerator>,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl Extractor {
    pub fn new(ids: Arc<dyn IdGenerator>, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        Self { ids, diagnostics }
    }

    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    pub fn diagnostics(&self) -> &dyn DiagnosticsSink {
        self.diagnostics.as_ref()
    }

    pub fn extract(&self, file: &File) -> Vec<Resource> {
        file.get_resources(self)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(Arc::new(RandomIds), Arc::new(TracingDiagnostics))
    }
}
