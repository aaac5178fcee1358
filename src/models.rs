//! Core data models produced by the extraction pipeline.
//!
//! A [`Resource`] is the unit handed to the rest of the application. Every
//! variant carries an `id`, a display `name` and the `file_path` of the file
//! it was extracted from; the variants differ in what else they know.

use serde::Serialize;
use serde_json::Value;

/// Byte range of a document inside its owning file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextRange {
    pub start: usize,
    pub length: usize,
}

impl TextRange {
    pub fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RefType {
    Incoming,
    Outgoing,
    Unsatisfied,
}

/// A link from one resource to another, filled in by the ref mapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub ref_type: RefType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceValidation {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
}

/// A Kubernetes object or Kustomization extracted from a manifest document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct K8sResource {
    pub id: String,
    pub name: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub kind: String,
    pub api_version: String,
    pub content: Value,
    /// Verbatim slice of the owning file; used for edits, never re-serialized.
    pub text: String,
    /// Provisional; resolved later against the kind registry.
    pub is_cluster_scoped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refs: Option<Vec<ResourceRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ResourceValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<ResourceValidation>,
}

/// A `.Values.*` reference found inside a template action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeAndValue {
    /// Dotted key path, e.g. `image.tag`.
    pub value: String,
    pub range: TextRange,
}

/// A values-file entry that some template of the same chart references.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmValueMatch {
    pub key_path: String,
    pub value: Value,
    pub template_id: String,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmValuesResource {
    pub id: String,
    pub name: String,
    pub file_path: String,
    pub helm_chart_id: String,
    pub values: Vec<HelmValueMatch>,
    pub is_selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmTemplateResource {
    pub id: String,
    pub name: String,
    pub file_path: String,
    pub helm_chart_id: String,
    pub values: Vec<RangeAndValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmChartResource {
    pub id: String,
    pub name: String,
    pub file_path: String,
    pub value_file_ids: Vec<String>,
    pub template_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Resource {
    Standard(K8sResource),
    /// Same shape as a standard resource; kind is always `Kustomization`
    /// and the name comes from the containing folder.
    Kustomization(K8sResource),
    HelmValues(HelmValuesResource),
    HelmTemplate(HelmTemplateResource),
    HelmChart(HelmChartResource),
}

impl Resource {
    pub fn id(&self) -> &str {
        match self {
            Resource::Standard(r) | Resource::Kustomization(r) => &r.id,
            Resource::HelmValues(r) => &r.id,
            Resource::HelmTemplate(r) => &r.id,
            Resource::HelmChart(r) => &r.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Resource::Standard(r) | Resource::Kustomization(r) => &r.name,
            Resource::HelmValues(r) => &r.name,
            Resource::HelmTemplate(r) => &r.name,
            Resource::HelmChart(r) => &r.name,
        }
    }

    pub fn file_path(&self) -> &str {
        match self {
            Resource::Standard(r) | Resource::Kustomization(r) => &r.file_path,
            Resource::HelmValues(r) => &r.file_path,
            Resource::HelmTemplate(r) => &r.file_path,
            Resource::HelmChart(r) => &r.file_path,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.as_k8s().and_then(|r| r.namespace.as_deref())
    }

    /// The Kubernetes kind, or a synthetic label for Helm variants.
    pub fn kind(&self) -> &str {
        match self {
            Resource::Standard(r) | Resource::Kustomization(r) => &r.kind,
            Resource::HelmValues(_) => "HelmValues",
            Resource::HelmTemplate(_) => "HelmTemplate",
            Resource::HelmChart(_) => "HelmChart",
        }
    }

    pub fn variant(&self) -> &'static str {
        match self {
            Resource::Standard(_) => "standard",
            Resource::Kustomization(_) => "kustomization",
            Resource::HelmValues(_) => "helmValues",
            Resource::HelmTemplate(_) => "helmTemplate",
            Resource::HelmChart(_) => "helmChart",
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.as_k8s().map(|r| r.text.as_str())
    }

    pub fn range(&self) -> Option<TextRange> {
        self.as_k8s().and_then(|r| r.range)
    }

    pub fn as_k8s(&self) -> Option<&K8sResource> {
        match self {
            Resource::Standard(r) | Resource::Kustomization(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_kustomization(&self) -> bool {
        matches!(self, Resource::Kustomization(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k8s(kind: &str) -> K8sResource {
        K8sResource {
            id: "abc".to_string(),
            name: "web".to_string(),
            file_path: "/p/web.yaml".to_string(),
            namespace: Some("prod".to_string()),
            kind: kind.to_string(),
            api_version: "apps/v1".to_string(),
            content: serde_json::json!({"kind": kind}),
            text: "kind: Deployment\n".to_string(),
            is_cluster_scoped: false,
            refs: None,
            range: Some(TextRange::new(4, 17)),
            validation: None,
            issues: None,
        }
    }

    #[test]
    fn test_accessors_on_standard() {
        let r = Resource::Standard(k8s("Deployment"));
        assert_eq!(r.id(), "abc");
        assert_eq!(r.kind(), "Deployment");
        assert_eq!(r.namespace(), Some("prod"));
        assert_eq!(r.range().map(|r| r.end()), Some(21));
        assert!(!r.is_kustomization());
    }

    #[test]
    fn test_serialized_shape_is_tagged_camel_case() {
        let r = Resource::Kustomization(k8s("Kustomization"));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["type"], "kustomization");
        assert_eq!(json["filePath"], "/p/web.yaml");
        assert_eq!(json["apiVersion"], "apps/v1");
        assert_eq!(json["isClusterScoped"], false);
        assert!(json.get("refs").is_none());
    }

    #[test]
    fn test_helm_variants_have_no_text() {
        let r = Resource::HelmChart(HelmChartResource {
            id: "c".to_string(),
            name: "demo".to_string(),
            file_path: "/p/Chart.yaml".to_string(),
            value_file_ids: vec![],
            template_ids: vec![],
        });
        assert_eq!(r.kind(), "HelmChart");
        assert!(r.text().is_none());
        assert!(r.namespace().is_none());
    }
}
