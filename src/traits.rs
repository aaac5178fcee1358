//! The repository contract.
//!
//! A [`FileRepository`] is where files come from. The aggregation service is
//! written against this trait only; the local filesystem
//! ([`LocalFileRepository`](crate::repo_local::LocalFileRepository)) and a
//! hosted Git API ([`RemoteRepository`](crate::repo_github::RemoteRepository))
//! are two independent implementations that share no state.
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │            AggregationService             │
//! └──────────────────┬────────────────────────┘
//!                    ▼
//!          dyn FileRepository
//!        ┌───────────┴────────────┐
//!        ▼                        ▼
//!  LocalFileRepository    RemoteRepository<A>
//!  (tokio::fs walk)       (tree listing + blobs)
//! ```
//!
//! # Mutations
//!
//! `update_file`, `delete_file` and `remove_resource` are part of the
//! contract so editing flows can stay source-agnostic. Read-only sources
//! must fail them with [`RepositoryError::Unsupported`](crate::error::RepositoryError)
//! rather than silently succeed.

use anyhow::Result;
use async_trait::async_trait;

use crate::file::{Extractor, File};
use crate::folder::Folder;
use crate::models::Resource;

// ═══════════════════════════════════════════════════════════════════════
// FileRepository Trait
// ═══════════════════════════════════════════════════════════════════════

#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Short identifier used in logs and errors (`"local"`, `"github"`).
    fn repository_type(&self) -> &'static str;

    /// Collaborators used by [`extract_resources`](FileRepository::extract_resources).
    fn extractor(&self) -> &Extractor;

    /// Walk the source rooted at `base_path` and return the populated tree,
    /// every file's content loaded.
    ///
    /// When `existing` is given, the walk resumes into it: files already
    /// present are not reloaded and known folders are not duplicated.
    async fn get_folder(&self, base_path: &str, existing: Option<Folder>) -> Result<Folder>;

    /// Content of a single file.
    async fn get_file_content(&self, path: &str) -> Result<String>;

    /// Resources declared in `file`. Never fails on malformed YAML.
    async fn extract_resources(&self, file: &File) -> Vec<Resource> {
        file.get_resources(self.extractor())
    }

    /// Persist `file`'s content at its path.
    async fn update_file(&self, file: &File) -> Result<bool>;

    /// Remove `file` from the source.
    async fn delete_file(&self, file: &File) -> Result<bool>;

    /// Cut `resource`'s document out of `file`, returning the replacement.
    async fn remove_resource(&self, file: &File, resource: &Resource) -> Result<File>;
}
