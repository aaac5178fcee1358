//! Aggregation service: the composition root.
//!
//! Ties a [`FileRepository`] to the walk-and-extract pass the rest of an
//! application consumes:
//!
//! ```text
//! root path ─▶ get_folder ─▶ Folder tree ─▶ get_all_files ─▶ File::get_resources
//!                                                   │
//!                         resources in file order ◀─┘
//! ```
//!
//! Extraction fans out one future per file and fans the results back in by
//! position, so completion order never leaks into the output.

use anyhow::Result;
use futures::future::join_all;
use indexmap::IndexMap;
use std::sync::Arc;

use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticsSink};
use crate::file::{Extractor, File};
use crate::filemap::{build_file_map, FileMap};
use crate::folder::Folder;
use crate::helm;
use crate::models::Resource;
use crate::repo_github::{GithubApi, RemoteRepository};
use crate::repo_local::LocalFileRepository;
use crate::traits::FileRepository;

/// Which repository implementation to open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceKind {
    #[default]
    Local,
    Github,
}

/// Resources keyed by id, in aggregation order.
pub type ResourceMap = IndexMap<String, Resource>;

pub struct AggregationService {
    repository: Arc<dyn FileRepository>,
}

/// Wrap a repository in an aggregation service.
pub fn get_service(repository: Arc<dyn FileRepository>) -> AggregationService {
    AggregationService { repository }
}

/// Build the repository named by `kind` from configuration.
pub fn open_repository(
    config: &Config,
    kind: SourceKind,
    diagnostics: Arc<dyn DiagnosticsSink>,
) -> Result<Arc<dyn FileRepository>> {
    let extractor = Extractor::new(config.extraction.ids.generator(), diagnostics);
    Ok(match kind {
        SourceKind::Local => Arc::new(LocalFileRepository::new(&config.local, extractor)?),
        SourceKind::Github => {
            let api = GithubApi::new(&config.remote)?;
            Arc::new(RemoteRepository::new(
                api,
                extractor,
                config.remote.max_concurrent_fetches,
            ))
        }
    })
}

impl AggregationService {
    pub fn repository(&self) -> &dyn FileRepository {
        self.repository.as_ref()
    }

    pub async fn get_folder(&self, base_path: &str) -> Result<Folder> {
        self.repository.get_folder(base_path, None).await
    }

    /// Continue a walk into an already built tree.
    pub async fn resume_folder(&self, base_path: &str, existing: Folder) -> Result<Folder> {
        self.repository.get_folder(base_path, Some(existing)).await
    }

    /// Depth-first: a folder's own files, then each subfolder in order.
    pub fn get_all_files<'f>(&self, folder: &'f Folder) -> Vec<&'f File> {
        let mut files = Vec::new();
        collect_files(folder, &mut files);
        files
    }

    /// Every standard and Kustomization resource, in file order.
    pub async fn get_all_resources(&self, folder: &Folder) -> Vec<Resource> {
        let files = self.get_all_files(folder);
        let per_file = join_all(
            files
                .iter()
                .map(|file| self.repository.extract_resources(file)),
        )
        .await;

        let resources: Vec<Resource> = per_file.into_iter().flatten().collect();
        tracing::debug!(
            root = %folder.path(),
            files = files.len(),
            resources = resources.len(),
            "aggregation pass complete"
        );
        resources
    }

    /// Chart, values and template resources for every chart in the tree.
    pub async fn get_helm_resources(&self, folder: &Folder) -> Vec<Resource> {
        helm::extract_helm_resources(folder, self.repository.extractor().ids())
    }

    /// All resources keyed by id. On an id collision the first resource is
    /// kept and the collision reported.
    pub async fn get_resource_map(&self, folder: &Folder) -> ResourceMap {
        let mut resources = self.get_all_resources(folder).await;
        resources.extend(self.get_helm_resources(folder).await);

        let diagnostics = self.repository.extractor().diagnostics();
        let mut map = IndexMap::with_capacity(resources.len());
        for resource in resources {
            if map.contains_key(resource.id()) {
                diagnostics.report(Diagnostic::DuplicateId {
                    id: resource.id().to_string(),
                    file_path: resource.file_path().to_string(),
                });
                continue;
            }
            map.insert(resource.id().to_string(), resource);
        }
        map
    }

    pub fn get_file_map(&self, folder: &Folder) -> FileMap {
        build_file_map(folder)
    }
}

fn collect_files<'f>(folder: &'f Folder, out: &mut Vec<&'f File>) {
    out.extend(folder.files());
    for child in folder.folders() {
        collect_files(child, out);
    }
}
