//! Turns parsed manifest documents into typed [`Resource`]s.
//!
//! The factory decides a resource's name, namespace, identity and variant
//! from its content and the path of the file it came from. Identity comes
//! from `metadata.uid` when the document declares one, otherwise from the
//! injected [`IdGenerator`].

use serde_json::Value;

use crate::ids::{IdGenerator, IdScope, IdSeed};
use crate::models::{K8sResource, Resource, TextRange};

pub const KUSTOMIZATION_KIND: &str = "Kustomization";
pub const KUSTOMIZATION_API_GROUP: &str = "kustomize.config.k8s.io";
pub const KUSTOMIZATION_API_VERSION: &str = "kustomize.config.k8s.io/v1beta1";

/// True for Kustomize's own `Kustomization` kind (not, say, Flux's).
pub fn is_kustomization(content: &Value) -> bool {
    content.get("kind").and_then(Value::as_str) == Some(KUSTOMIZATION_KIND)
        && match content.get("apiVersion").and_then(Value::as_str) {
            None | Some("") => true,
            Some(v) => v.starts_with(KUSTOMIZATION_API_GROUP),
        }
}

/// Display name for a document.
///
/// Kustomizations are named after their folder (`base`, `staging`, ...);
/// everything else uses `metadata.name`, falling back to the file name.
pub fn create_resource_name(file_path: &str, content: &Value) -> String {
    if is_kustomization(content) {
        return parent_folder_name(file_path)
            .unwrap_or(file_path)
            .to_string();
    }

    if let Some(name) = content.pointer("/metadata/name").filter(|v| is_truthy(v)) {
        // templated names arrive as objects, e.g. {{ .Release.Name }}
        return match name {
            Value::String(s) => s.clone(),
            other => other.to_string().trim().to_string(),
        };
    }

    match last_separator(file_path) {
        Some(ix) if ix > 0 => file_path[ix + 1..].to_string(),
        _ => file_path.to_string(),
    }
}

/// `metadata.namespace` when it is a plain string.
pub fn extract_namespace(content: &Value) -> Option<String> {
    content
        .pointer("/metadata/namespace")
        .and_then(Value::as_str)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string)
}

fn declared_uid(content: &Value) -> Option<String> {
    content
        .pointer("/metadata/uid")
        .and_then(Value::as_str)
        .filter(|uid| !uid.is_empty())
        .map(str::to_string)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn last_separator(path: &str) -> Option<usize> {
    path.rfind(['/', '\\'])
}

/// Basename of the directory holding `file_path`.
fn parent_folder_name(file_path: &str) -> Option<&str> {
    let ix = last_separator(file_path).filter(|ix| *ix > 0)?;
    let parent = &file_path[..ix];
    Some(match last_separator(parent) {
        Some(p) => &parent[p + 1..],
        None => parent,
    })
}

/// Builds resources, drawing fresh ids from an injected generator.
pub struct ResourceFactory<'a> {
    ids: &'a dyn IdGenerator,
}

impl<'a> ResourceFactory<'a> {
    pub fn new(ids: &'a dyn IdGenerator) -> Self {
        Self { ids }
    }

    /// Classify a document that has no known position in its file.
    pub fn classify(&self, content: Value, text: &str, file_path: &str) -> Resource {
        self.classify_at(content, text, file_path, None)
    }

    /// Classify a document; `range` locates `text` inside the owning file.
    pub fn classify_at(
        &self,
        content: Value,
        text: &str,
        file_path: &str,
        range: Option<TextRange>,
    ) -> Resource {
        let kustomization = is_kustomization(&content);
        let name = create_resource_name(file_path, &content);
        let namespace = extract_namespace(&content);
        let id = declared_uid(&content).unwrap_or_else(|| {
            self.ids.generate(&IdSeed {
                scope: IdScope::Document,
                file_path,
                offset: range.map(|r| r.start).unwrap_or(0),
                text,
            })
        });

        let kind = content
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let api_version = match content.get("apiVersion").and_then(Value::as_str) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ if kustomization => KUSTOMIZATION_API_VERSION.to_string(),
            _ => String::new(),
        };

        let resource = K8sResource {
            id,
            name,
            file_path: file_path.to_string(),
            namespace,
            kind,
            api_version,
            content,
            text: text.to_string(),
            is_cluster_scoped: false,
            refs: None,
            range,
            validation: None,
            issues: None,
        };

        if kustomization {
            Resource::Kustomization(resource)
        } else {
            Resource::Standard(resource)
        }
    }
}
