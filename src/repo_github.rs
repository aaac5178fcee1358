//! Remote repository backed by a hosted Git tree API.
//!
//! The whole tree is listed in one recursive call, every blob is fetched
//! with bounded concurrency, and the folder hierarchy is rebuilt by
//! inserting each entry path segment by segment through a [`FolderArena`].
//! The source is read-only: every mutation fails with
//! [`RepositoryError::Unsupported`].
//!
//! # Configuration
//!
//! ```toml
//! [remote]
//! api_url = "https://api.github.com"
//! branch = "master"
//! token_env = "GITHUB_TOKEN"
//! max_concurrent_fetches = 8
//! timeout_secs = 30
//! ```
//!
//! The base path has the form `/owner/repo`. File paths in the resulting
//! tree are `{base_path}/{entry path}`.
//!
//! # Unreadable blobs
//!
//! A blob that cannot be fetched gets the content [`NOT_FOUND_CONTENT`] and
//! a [`Diagnostic::BlobUnavailable`] is reported; the walk carries on.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::diagnostics::Diagnostic;
use crate::error::RepositoryError;
use crate::file::{extension_of, Extractor, File};
use crate::folder::{Folder, FolderArena};
use crate::models::Resource;
use crate::traits::FileRepository;

/// Content substituted for a blob that could not be fetched.
pub const NOT_FOUND_CONTENT: &str = "NOT FOUND";

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TreeEntry {
    pub path: String,
    /// `blob`, `tree` or `commit` (submodule).
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sha: Option<String>,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.kind == "blob"
    }

    pub fn is_tree(&self) -> bool {
        self.kind == "tree"
    }
}

/// The two calls a remote source needs.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Every entry under `base_path`, recursively.
    async fn list_tree(&self, base_path: &str) -> Result<Vec<TreeEntry>>;

    /// Decoded text of the blob at `url`.
    async fn fetch_blob(&self, url: &str) -> Result<String>;
}

// ============ GitHub REST API ============

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    #[serde(default)]
    encoding: String,
}

pub struct GithubApi {
    client: reqwest::Client,
    api_url: String,
    branch: String,
    token: Option<String>,
}

impl GithubApi {
    /// Build a client from `[remote]`. The token is read from the configured
    /// environment variable now; an unset variable means anonymous access.
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("manifest-harness/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            branch: config.branch.clone(),
            token,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl RemoteApi for GithubApi {
    async fn list_tree(&self, base_path: &str) -> Result<Vec<TreeEntry>> {
        let url = format!(
            "{}/repos{}/git/trees/{}?recursive=1",
            self.api_url, base_path, self.branch
        );

        let resp = self
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to list tree for {}", base_path))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!(
                "Tree listing failed (HTTP {}): {}",
                status,
                body.chars().take(500).collect::<String>()
            );
        }

        let listing: TreeResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse tree listing for {}", base_path))?;
        if listing.truncated {
            tracing::warn!(
                repo = %base_path,
                entries = listing.tree.len(),
                "tree listing was truncated by the API"
            );
        }
        Ok(listing.tree)
    }

    async fn fetch_blob(&self, url: &str) -> Result<String> {
        let resp = self.get(url).send().await?;
        if !resp.status().is_success() {
            bail!("HTTP {}", resp.status());
        }
        let blob: BlobResponse = resp.json().await?;
        decode_blob(&blob)
    }
}

fn decode_blob(blob: &BlobResponse) -> Result<String> {
    if blob.encoding != "base64" {
        return Ok(blob.content.clone());
    }
    let compact: String = blob
        .content
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .context("Invalid base64 blob content")?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ============ Repository ============

pub struct RemoteRepository<A: RemoteApi> {
    api: A,
    extractor: Extractor,
    max_concurrent_fetches: usize,
}

pub type GithubRepository = RemoteRepository<GithubApi>;

impl<A: RemoteApi> RemoteRepository<A> {
    pub fn new(api: A, extractor: Extractor, max_concurrent_fetches: usize) -> Self {
        Self {
            api,
            extractor,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
        }
    }

    async fn blob_content(&self, base_path: &str, entry: &TreeEntry) -> String {
        let path = format!("{}/{}", base_path, entry.path);
        let result = match &entry.url {
            Some(url) => self.api.fetch_blob(url).await,
            None => Err(anyhow::anyhow!("tree entry has no blob url")),
        };
        match result {
            Ok(content) => content,
            Err(e) => {
                self.extractor.diagnostics().report(Diagnostic::BlobUnavailable {
                    path,
                    reason: format!("{:#}", e),
                });
                NOT_FOUND_CONTENT.to_string()
            }
        }
    }
}

#[async_trait]
impl<A: RemoteApi> FileRepository for RemoteRepository<A> {
    fn repository_type(&self) -> &'static str {
        "github"
    }

    fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    async fn get_folder(&self, base_path: &str, existing: Option<Folder>) -> Result<Folder> {
        let entries = self.api.list_tree(base_path).await?;
        let mut arena = match existing {
            Some(folder) => FolderArena::from_folder(folder),
            None => FolderArena::new(base_path),
        };

        let pending: Vec<&TreeEntry> = entries
            .iter()
            .filter(|e| e.is_blob())
            .filter(|e| !arena.contains_file(&format!("{}/{}", base_path, e.path)))
            .collect();

        tracing::debug!(
            repo = %base_path,
            entries = entries.len(),
            blobs = pending.len(),
            "fetching blobs"
        );

        let fetches: Vec<_> = pending
            .iter()
            .map(|entry| self.blob_content(base_path, entry))
            .collect();
        let contents: Vec<String> = stream::iter(fetches)
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await;
        let mut contents: HashMap<&str, String> = pending
            .iter()
            .map(|e| e.path.as_str())
            .zip(contents)
            .collect();

        for entry in &entries {
            if entry.is_tree() {
                arena.insert_folder(&entry.path);
            } else if let Some(content) = contents.remove(entry.path.as_str()) {
                let file = File::new(
                    format!("{}/{}", base_path, entry.path),
                    content,
                    extension_of(&entry.path),
                );
                arena.insert_file(&entry.path, file);
            }
        }

        Ok(arena.into_folder())
    }

    async fn get_file_content(&self, path: &str) -> Result<String> {
        match self.api.fetch_blob(path).await {
            Ok(content) => Ok(content),
            Err(e) => {
                self.extractor.diagnostics().report(Diagnostic::BlobUnavailable {
                    path: path.to_string(),
                    reason: format!("{:#}", e),
                });
                Ok(NOT_FOUND_CONTENT.to_string())
            }
        }
    }

    async fn update_file(&self, _file: &File) -> Result<bool> {
        Err(RepositoryError::unsupported("update_file", self.repository_type()).into())
    }

    async fn delete_file(&self, _file: &File) -> Result<bool> {
        Err(RepositoryError::unsupported("delete_file", self.repository_type()).into())
    }

    async fn remove_resource(&self, _file: &File, _resource: &Resource) -> Result<File> {
        Err(RepositoryError::unsupported("remove_resource", self.repository_type()).into())
    }
}
