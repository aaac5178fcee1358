//! Helm chart classification.
//!
//! Plain manifest extraction treats chart files like any other YAML. This
//! module adds the chart-level view on top: one [`HelmChartResource`] per
//! folder holding a `Chart.yaml`, one [`HelmValuesResource`] per values
//! file next to it, and one [`HelmTemplateResource`] per file under its
//! `templates/` directory. Templates record every `.Values.<path>`
//! reference found inside a `{{ ... }}` action; values resources list the
//! references of the same chart that resolve in them.

use serde_json::Value;

use crate::document::parse_documents;
use crate::folder::Folder;
use crate::ids::{IdGenerator, IdScope, IdSeed};
use crate::models::{
    HelmChartResource, HelmTemplateResource, HelmValueMatch, HelmValuesResource, RangeAndValue,
    Resource, TextRange,
};

const TEMPLATES_DIR: &str = "templates";
const TEMPLATE_EXTENSIONS: [&str; 3] = [".yaml", ".yml", ".tpl"];

/// `values.yaml`, `values-prod.yml`, ...
pub fn is_values_file_name(name: &str) -> bool {
    name.starts_with("values") && (name.ends_with(".yaml") || name.ends_with(".yml"))
}

/// True when a directory segment of `path` is `templates`.
pub fn is_template_path(path: &str) -> bool {
    let mut segments: Vec<&str> = path.split(['/', '\\']).collect();
    segments.pop();
    segments.iter().any(|s| *s == TEMPLATES_DIR)
}

/// Every `.Values.<key.path>` reference inside a template action. The range
/// covers the whole `{{ ... }}` action.
pub fn find_value_placeholders(text: &str) -> Vec<RangeAndValue> {
    const MARKER: &str = ".Values.";
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(open) = text[cursor..].find("{{") {
        let start = cursor + open;
        let Some(close) = text[start + 2..].find("}}") else {
            break;
        };
        let end = start + 2 + close + 2;
        let action = &text[start..end];

        let mut offset = 0;
        while let Some(ix) = action[offset..].find(MARKER) {
            let key_start = offset + ix + MARKER.len();
            let key: &str = action[key_start..]
                .split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
                .next()
                .unwrap_or_default();
            let key = key.trim_end_matches('.');
            if !key.is_empty() {
                found.push(RangeAndValue {
                    value: key.to_string(),
                    range: TextRange::new(start, end - start),
                });
            }
            offset = key_start;
        }

        cursor = end;
    }

    found
}

/// Look a dotted key path up in parsed values.
pub fn lookup_key_path<'v>(values: &'v Value, key_path: &str) -> Option<&'v Value> {
    key_path
        .split('.')
        .try_fold(values, |node, key| node.as_object()?.get(key))
}

/// Chart, values and template resources for every chart in `folder`'s
/// subtree, in tree order.
pub fn extract_helm_resources(folder: &Folder, ids: &dyn IdGenerator) -> Vec<Resource> {
    let mut out = Vec::new();
    collect(folder, ids, &mut out);
    out
}

fn collect(folder: &Folder, ids: &dyn IdGenerator, out: &mut Vec<Resource>) {
    if let Some(chart_file) = folder.chart_entry() {
        let chart_id = ids.generate(&IdSeed {
            scope: IdScope::HelmChart,
            file_path: chart_file.path(),
            offset: 0,
            text: chart_file.content(),
        });
        let chart_name = first_document(chart_file.content())
            .and_then(|v| v.get("name").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| folder.name().to_string());

        let mut templates = Vec::new();
        if let Some(dir) = folder.folders().iter().find(|f| f.name() == TEMPLATES_DIR) {
            collect_templates(dir, &chart_id, ids, &mut templates);
        }

        let values: Vec<HelmValuesResource> = folder
            .files()
            .iter()
            .filter(|f| is_values_file_name(f.name()))
            .map(|f| {
                let parsed = first_document(f.content()).unwrap_or(Value::Null);
                let mut matches = Vec::new();
                for template in &templates {
                    for placeholder in &template.values {
                        if let Some(v) = lookup_key_path(&parsed, &placeholder.value) {
                            matches.push(HelmValueMatch {
                                key_path: placeholder.value.clone(),
                                value: v.clone(),
                                template_id: template.id.clone(),
                                range: placeholder.range,
                            });
                        }
                    }
                }
                HelmValuesResource {
                    id: ids.generate(&IdSeed {
                        scope: IdScope::HelmValues,
                        file_path: f.path(),
                        offset: 0,
                        text: f.content(),
                    }),
                    name: f.name().to_string(),
                    file_path: f.path().to_string(),
                    helm_chart_id: chart_id.clone(),
                    values: matches,
                    is_selected: false,
                }
            })
            .collect();

        tracing::debug!(
            chart = %chart_name,
            values = values.len(),
            templates = templates.len(),
            "classified helm chart"
        );

        out.push(Resource::HelmChart(HelmChartResource {
            id: chart_id,
            name: chart_name,
            file_path: chart_file.path().to_string(),
            value_file_ids: values.iter().map(|v| v.id.clone()).collect(),
            template_ids: templates.iter().map(|t| t.id.clone()).collect(),
        }));
        out.extend(values.into_iter().map(Resource::HelmValues));
        out.extend(templates.into_iter().map(Resource::HelmTemplate));
    }

    for child in folder.folders() {
        collect(child, ids, out);
    }
}

fn collect_templates(
    folder: &Folder,
    chart_id: &str,
    ids: &dyn IdGenerator,
    out: &mut Vec<HelmTemplateResource>,
) {
    for file in folder.files() {
        if !TEMPLATE_EXTENSIONS.contains(&file.extension()) {
            continue;
        }
        out.push(HelmTemplateResource {
            id: ids.generate(&IdSeed {
                scope: IdScope::HelmTemplate,
                file_path: file.path(),
                offset: 0,
                text: file.content(),
            }),
            name: file.name().to_string(),
            file_path: file.path().to_string(),
            helm_chart_id: chart_id.to_string(),
            values: find_value_placeholders(file.content()),
        });
    }
    for child in folder.folders() {
        collect_templates(child, chart_id, ids, out);
    }
}

fn first_document(text: &str) -> Option<Value> {
    parse_documents(text).find_map(|doc| doc.content)
}
