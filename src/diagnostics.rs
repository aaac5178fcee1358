//! Extraction diagnostics.
//!
//! Parse problems never fail an aggregation pass; they are reported to a
//! [`DiagnosticsSink`] handed to the extractor. The CLI picks a sink with
//! [`DiagnosticsMode`]; tests use [`CollectingDiagnostics`].

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::document::YamlIssue;

/// Something worth telling the user about that did not stop the pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A document had parse errors and produced no resource.
    DocumentSkipped {
        file_path: String,
        file_name: String,
        document_index: usize,
        error_count: usize,
        first_error: Option<YamlIssue>,
    },
    /// A document parsed with warnings; its resource was still produced.
    DocumentWarnings {
        file_path: String,
        document_index: usize,
        warnings: Vec<YamlIssue>,
    },
    /// A remote blob could not be fetched and was replaced by the sentinel text.
    BlobUnavailable { path: String, reason: String },
    /// Two resources of one pass share an id; the first one was kept.
    DuplicateId { id: String, file_path: String },
}

pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Emits diagnostics as `tracing` warnings.
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::DocumentSkipped {
                file_name,
                document_index,
                error_count,
                first_error,
                ..
            } => {
                let detail = first_error
                    .map(|e| format!(" (line {}: {})", e.line, e.message))
                    .unwrap_or_default();
                tracing::warn!(
                    "Ignoring document {} in {} due to {} error(s){}",
                    document_index,
                    file_name,
                    error_count,
                    detail
                );
            }
            Diagnostic::DocumentWarnings {
                file_path,
                document_index,
                warnings,
            } => {
                for w in warnings {
                    tracing::warn!(
                        file = %file_path,
                        document = document_index,
                        line = w.line,
                        "{}",
                        w.message
                    );
                }
            }
            Diagnostic::BlobUnavailable { path, reason } => {
                tracing::warn!(path = %path, "blob unavailable: {}", reason);
            }
            Diagnostic::DuplicateId { id, file_path } => {
                tracing::warn!(file = %file_path, "duplicate resource id {}", id);
            }
        }
    }
}

/// One JSON object per line on stderr.
pub struct JsonDiagnostics;

impl DiagnosticsSink for JsonDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        if let Ok(line) = serde_json::to_string(&diagnostic) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

pub struct NoDiagnostics;

impl DiagnosticsSink for NoDiagnostics {
    fn report(&self, _diagnostic: Diagnostic) {}
}

/// Keeps every diagnostic in memory.
#[derive(Default)]
pub struct CollectingDiagnostics {
    seen: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.seen.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.seen.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for CollectingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(diagnostic);
        }
    }
}

/// Diagnostics mode for the CLI: off, log (tracing) or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticsMode {
    Off,
    Log,
    Json,
}

impl DiagnosticsMode {
    /// Log when stderr is a TTY, otherwise JSON lines for tooling.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            DiagnosticsMode::Log
        } else {
            DiagnosticsMode::Json
        }
    }

    pub fn sink(&self) -> Arc<dyn DiagnosticsSink> {
        match self {
            DiagnosticsMode::Off => Arc::new(NoDiagnostics),
            DiagnosticsMode::Log => Arc::new(TracingDiagnostics),
            DiagnosticsMode::Json => Arc::new(JsonDiagnostics),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingDiagnostics::new();
        assert!(sink.is_empty());
        sink.report(Diagnostic::BlobUnavailable {
            path: "a".to_string(),
            reason: "404".to_string(),
        });
        sink.report(Diagnostic::DuplicateId {
            id: "x".to_string(),
            file_path: "b".to_string(),
        });
        let seen = sink.snapshot();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0], Diagnostic::BlobUnavailable { .. }));
    }

    #[test]
    fn test_json_shape() {
        let d = Diagnostic::DocumentSkipped {
            file_path: "/p/a.yaml".to_string(),
            file_name: "a".to_string(),
            document_index: 2,
            error_count: 1,
            first_error: None,
        };
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["event"], "document_skipped");
        assert_eq!(v["document_index"], 2);
    }
}
