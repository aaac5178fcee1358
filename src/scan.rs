//! Command bodies for the `mh` binary.
//!
//! Each `run_*` function performs one aggregation pass through an
//! [`AggregationService`] and prints its result to stdout.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

use crate::aggregate::{AggregationService, ResourceMap, SourceKind};
use crate::config::Config;
use crate::error::RepositoryError;
use crate::folder::Folder;
use crate::models::Resource;

/// Pick the root from the command line or `[project] root`, and check that a
/// local root is an existing directory before any walk starts.
pub fn resolve_root(arg: Option<&str>, config: &Config, source: SourceKind) -> Result<String> {
    let root = match (arg, &config.project.root) {
        (Some(root), _) => root.to_string(),
        (None, Some(root)) => root.to_string_lossy().to_string(),
        (None, None) => return Err(RepositoryError::InvalidRoot(String::new()).into()),
    };

    if source == SourceKind::Local {
        if !Path::new(&root).is_dir() {
            return Err(RepositoryError::InvalidRoot(root).into());
        }
        let trimmed = root.trim_end_matches(['/', '\\']);
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    Ok(root)
}

pub async fn run_files(service: &AggregationService, root: &str) -> Result<()> {
    let folder = service.get_folder(root).await?;

    println!("{:<10} {:<6} FILE", "EXTENSION", "HELM");
    for file in service.get_all_files(&folder) {
        let helm = match (file.is_helm_template(), file.is_helm_values()) {
            (true, _) => "tpl",
            (_, true) => "values",
            _ => "-",
        };
        let extension = if file.extension().is_empty() {
            "-"
        } else {
            file.extension()
        };
        println!("{:<10} {:<6} {}", extension, helm, relative(file.path(), root));
    }
    Ok(())
}

pub async fn run_resources(
    service: &AggregationService,
    root: &str,
    json: bool,
    kind: Option<&str>,
) -> Result<()> {
    let folder = service.get_folder(root).await?;
    let mut map = service.get_resource_map(&folder).await;
    if let Some(kind) = kind {
        map.retain(|_, r| r.kind().eq_ignore_ascii_case(kind));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    if map.is_empty() {
        println!("No resources found.");
        return Ok(());
    }

    println!("{:<24} {:<32} {:<16} FILE", "KIND", "NAME", "NAMESPACE");
    for resource in map.values() {
        println!(
            "{:<24} {:<32} {:<16} {}",
            resource.kind(),
            resource.name(),
            resource.namespace().unwrap_or("-"),
            relative(resource.file_path(), root)
        );
    }
    Ok(())
}

pub async fn run_tree(service: &AggregationService, root: &str) -> Result<()> {
    let folder = service.get_folder(root).await?;
    let map = service.get_file_map(&folder);
    println!("{}", serde_json::to_string_pretty(&map)?);
    Ok(())
}

/// Counts reported by `mh scan`.
#[derive(Debug, Default, PartialEq)]
pub struct ScanSummary {
    pub folders: usize,
    pub files: usize,
    pub resources: usize,
    pub by_variant: BTreeMap<&'static str, usize>,
    pub helm_charts: usize,
}

impl ScanSummary {
    pub fn new(folder: &Folder, map: &ResourceMap) -> Self {
        let mut by_variant = BTreeMap::new();
        for resource in map.values() {
            *by_variant.entry(resource.variant()).or_insert(0) += 1;
        }
        Self {
            folders: folder.folder_count(),
            files: folder.file_count(),
            resources: map.len(),
            helm_charts: map
                .values()
                .filter(|r| matches!(r, Resource::HelmChart(_)))
                .count(),
            by_variant,
        }
    }
}

pub async fn run_scan(service: &AggregationService, root: &str) -> Result<()> {
    let folder = service.get_folder(root).await?;
    let map = service.get_resource_map(&folder).await;
    let summary = ScanSummary::new(&folder, &map);

    println!("scan {} ({})", root, service.repository().repository_type());
    println!("  folders:     {}", summary.folders);
    println!("  files:       {}", summary.files);
    println!("  resources:   {}", summary.resources);
    for (variant, count) in &summary.by_variant {
        println!("    {:<14} {}", variant, count);
    }
    println!("  helm charts: {}", summary.helm_charts);
    Ok(())
}

fn relative<'a>(path: &'a str, root: &str) -> &'a str {
    path.strip_prefix(root)
        .map(|p| p.trim_start_matches(['/', '\\']))
        .unwrap_or(path)
}
