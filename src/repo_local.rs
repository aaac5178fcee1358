//! Local filesystem repository.
//!
//! Walks a directory recursively with `tokio::fs`, loading every file that
//! is not excluded into the tree. Directory entries are visited in name
//! order so repeated walks produce the same tree.
//!
//! # Configuration
//!
//! ```toml
//! [local]
//! exclude_globs = ["**/vendor/**"]
//! follow_symlinks = false
//! ```
//!
//! `**/.git/**` and `**/node_modules/**` are always excluded. Patterns are
//! matched against the path relative to the walk root.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

use crate::config::LocalConfig;
use crate::error::RepositoryError;
use crate::file::{extension_of, Extractor, File};
use crate::folder::Folder;
use crate::models::{Resource, TextRange};
use crate::traits::FileRepository;

pub struct LocalFileRepository {
    excludes: GlobSet,
    follow_symlinks: bool,
    extractor: Extractor,
}

impl LocalFileRepository {
    pub fn new(config: &LocalConfig, extractor: Extractor) -> Result<Self> {
        Ok(Self {
            excludes: build_globset(&config.all_excludes())?,
            follow_symlinks: config.follow_symlinks,
            extractor,
        })
    }

    pub fn is_excluded(&self, relative: &str) -> bool {
        self.excludes.is_match(relative)
    }

    fn walk<'a>(
        &'a self,
        root: &'a Path,
        dir: &'a Path,
        folder: &'a mut Folder,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let mut read_dir = tokio::fs::read_dir(dir)
                .await
                .with_context(|| format!("Failed to list directory: {}", dir.display()))?;

            let mut entries: Vec<PathBuf> = Vec::new();
            while let Some(entry) = read_dir.next_entry().await? {
                entries.push(entry.path());
            }
            entries.sort();

            for path in entries {
                let relative = path
                    .strip_prefix(root)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");
                let path_str = path.to_string_lossy().to_string();

                let is_symlink = tokio::fs::symlink_metadata(&path)
                    .await
                    .map(|m| m.file_type().is_symlink())
                    .unwrap_or(false);
                let metadata = match tokio::fs::metadata(&path).await {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(path = %path_str, "skipping unreadable entry: {}", e);
                        continue;
                    }
                };

                if metadata.is_dir() {
                    if is_symlink && !self.follow_symlinks {
                        tracing::debug!(path = %path_str, "not following symlinked directory");
                        continue;
                    }
                    if self.is_excluded(&format!("{}/", relative)) {
                        continue;
                    }
                    if let Some(child) = folder.folder_mut(&path_str) {
                        self.walk(root, &path, child).await?;
                    } else {
                        let mut child = Folder::new(path_str);
                        self.walk(root, &path, &mut child).await?;
                        folder.add_folder(child);
                    }
                } else {
                    if self.is_excluded(&relative) || folder.has_file(&path_str) {
                        continue;
                    }
                    let content = self.get_file_content(&path_str).await?;
                    let extension = extension_of(&path_str).to_string();
                    folder.add_file(File::new(path_str, content, extension));
                }
            }

            Ok(())
        }
        .boxed()
    }
}

#[async_trait]
impl FileRepository for LocalFileRepository {
    fn repository_type(&self) -> &'static str {
        "local"
    }

    fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    async fn get_folder(&self, base_path: &str, existing: Option<Folder>) -> Result<Folder> {
        let root = PathBuf::from(base_path);
        let mut folder = existing.unwrap_or_else(|| Folder::new(base_path));
        self.walk(&root, &root, &mut folder).await?;
        tracing::debug!(
            root = %base_path,
            folders = folder.folder_count(),
            files = folder.file_count(),
            "local walk complete"
        );
        Ok(folder)
    }

    async fn get_file_content(&self, path: &str) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn update_file(&self, file: &File) -> Result<bool> {
        tokio::fs::write(file.path(), file.content())
            .await
            .with_context(|| format!("Failed to write file: {}", file.path()))?;
        Ok(true)
    }

    async fn delete_file(&self, file: &File) -> Result<bool> {
        tokio::fs::remove_file(file.path())
            .await
            .with_context(|| format!("Failed to delete file: {}", file.path()))?;
        Ok(true)
    }

    async fn remove_resource(&self, file: &File, resource: &Resource) -> Result<File> {
        if resource.file_path() != file.path() {
            return Err(RepositoryError::ForeignResource {
                id: resource.id().to_string(),
                file_path: file.path().to_string(),
            }
            .into());
        }
        let range = resource.range().ok_or_else(|| RepositoryError::MissingRange {
            id: resource.id().to_string(),
        })?;
        if file.content().get(range.start..range.end()) != resource.text() {
            return Err(RepositoryError::StaleRange {
                id: resource.id().to_string(),
                file_path: file.path().to_string(),
            }
            .into());
        }

        let updated = file.with_content(remove_range(file.content(), range));
        self.update_file(&updated).await?;
        Ok(updated)
    }
}

/// Cut `range` out of `content` along with one adjoining `---` line,
/// preferring the separator before the range.
pub(crate) fn remove_range(content: &str, range: TextRange) -> String {
    let start = floor_char_boundary(content, range.start);
    let end = floor_char_boundary(content, range.end()).max(start);
    let before = &content[..start];
    let after = &content[end..];

    if let Some(before) = strip_trailing_separator(before) {
        return format!("{}{}", before, after);
    }
    if let Some(after) = strip_leading_separator(after) {
        return format!("{}{}", before, after);
    }
    format!("{}{}", before, after)
}

fn floor_char_boundary(s: &str, mut ix: usize) -> usize {
    if ix >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn is_separator_line(line: &str) -> bool {
    let line = line.trim_end_matches(['\n', '\r']);
    match line.strip_prefix("---") {
        Some(rest) => {
            let rest = rest.trim();
            rest.is_empty() || rest.starts_with('#')
        }
        None => false,
    }
}

fn strip_trailing_separator(before: &str) -> Option<&str> {
    let body = before.strip_suffix('\n')?;
    let line_start = body.rfind('\n').map(|ix| ix + 1).unwrap_or(0);
    is_separator_line(&before[line_start..]).then(|| &before[..line_start])
}

fn strip_leading_separator(after: &str) -> Option<&str> {
    let line_end = after.find('\n').map(|ix| ix + 1).unwrap_or(after.len());
    if line_end == 0 {
        return None;
    }
    is_separator_line(&after[..line_end]).then(|| &after[line_end..])
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NoDiagnostics;
    use crate::ids::ContentIds;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn repo(config: &LocalConfig) -> LocalFileRepository {
        let extractor = Extractor::new(Arc::new(ContentIds), Arc::new(NoDiagnostics));
        LocalFileRepository::new(config, extractor).unwrap()
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_walk_loads_tree_in_name_order() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b.yaml", "kind: B\n");
        write(tmp.path(), "a.yml", "kind: A\n");
        write(tmp.path(), "base/kustomization.yaml", "kind: Kustomization\n");
        write(tmp.path(), "chart/Chart.yaml", "name: demo\n");

        let root = tmp.path().to_string_lossy().to_string();
        let folder = repo(&LocalConfig::default())
            .get_folder(&root, None)
            .await
            .unwrap();

        let names: Vec<&str> = folder.files().iter().map(File::name).collect();
        assert_eq!(names, vec!["a.yml", "b.yaml"]);
        assert_eq!(folder.files()[0].extension(), ".yml");
        assert_eq!(folder.files()[1].content(), "kind: B\n");
        let sub: Vec<&str> = folder.folders().iter().map(Folder::name).collect();
        assert_eq!(sub, vec!["base", "chart"]);
        assert!(folder.folders()[1].contains_helm_chart());
        assert!(!folder.contains_helm_chart());
    }

    #[tokio::test]
    async fn test_excludes() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ".git/config", "x");
        write(tmp.path(), "node_modules/pkg/a.yaml", "kind: A\n");
        write(tmp.path(), "vendor/v.yaml", "kind: V\n");
        write(tmp.path(), "keep.yaml", "kind: K\n");

        let config = LocalConfig {
            exclude_globs: vec!["vendor/**".to_string()],
            follow_symlinks: false,
        };
        let root = tmp.path().to_string_lossy().to_string();
        let folder = repo(&config).get_folder(&root, None).await.unwrap();
        assert_eq!(folder.file_count(), 1);
        assert!(folder.folders().is_empty());
    }

    #[tokio::test]
    async fn test_resume_does_not_duplicate() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.yaml", "kind: A\n");
        write(tmp.path(), "sub/b.yaml", "kind: B\n");
        let root = tmp.path().to_string_lossy().to_string();
        let repo = repo(&LocalConfig::default());

        let first = repo.get_folder(&root, None).await.unwrap();
        write(tmp.path(), "sub/c.yaml", "kind: C\n");
        let second = repo.get_folder(&root, Some(first)).await.unwrap();

        assert_eq!(second.files().len(), 1);
        assert_eq!(second.folders().len(), 1);
        assert_eq!(second.folders()[0].files().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_root_fails() {
        let err = repo(&LocalConfig::default())
            .get_folder("/definitely/not/a/dir", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to list directory"));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.yaml", "kind: A\n");
        let path = tmp.path().join("a.yaml").to_string_lossy().to_string();
        let repo = repo(&LocalConfig::default());

        let file = File::new(path.clone(), "kind: Changed\n", ".yaml");
        assert!(repo.update_file(&file).await.unwrap());
        assert_eq!(repo.get_file_content(&path).await.unwrap(), "kind: Changed\n");

        assert!(repo.delete_file(&file).await.unwrap());
        assert!(!tmp.path().join("a.yaml").exists());
    }

    #[tokio::test]
    async fn test_remove_resource_splices_document() {
        let tmp = TempDir::new().unwrap();
        let content = "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: b\n";
        write(tmp.path(), "cms.yaml", content);
        let path = tmp.path().join("cms.yaml").to_string_lossy().to_string();
        let repo = repo(&LocalConfig::default());

        let file = File::new(path.clone(), content, ".yaml");
        let resources = repo.extract_resources(&file).await;
        assert_eq!(resources.len(), 2);

        let updated = repo.remove_resource(&file, &resources[1]).await.unwrap();
        assert_eq!(
            updated.content(),
            "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: a\n"
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), updated.content());

        let left = repo.extract_resources(&updated).await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name(), "a");
    }

    #[tokio::test]
    async fn test_remove_resource_rejects_foreign_resource() {
        let repo = repo(&LocalConfig::default());
        let owner = File::new("/p/a.yaml", "apiVersion: v1\nkind: A\n", ".yaml");
        let other = File::new("/p/b.yaml", "apiVersion: v1\nkind: B\n", ".yaml");
        let resource = repo.extract_resources(&owner).await.remove(0);

        let err = repo.remove_resource(&other, &resource).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::ForeignResource { .. })
        ));
    }

    #[tokio::test]
    async fn test_remove_resource_rejects_stale_range() {
        let tmp = TempDir::new().unwrap();
        let v1 = "apiVersion: v1\nkind: A\n---\napiVersion: v1\nkind: B\n";
        let v2 = format!("# header comment added\n{}", v1);
        write(tmp.path(), "ab.yaml", &v2);
        let path = tmp.path().join("ab.yaml").to_string_lossy().to_string();
        let repo = repo(&LocalConfig::default());

        let old = File::new(path.clone(), v1, ".yaml");
        let resources = repo.extract_resources(&old).await;
        let current = File::new(path.clone(), v2.clone(), ".yaml");

        let err = repo
            .remove_resource(&current, &resources[1])
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepositoryError>(),
            Some(RepositoryError::StaleRange { file_path, .. }) if *file_path == path
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), v2);
    }

    #[test]
    fn test_remove_range_first_document_takes_following_separator() {
        let content = "kind: A\n---\nkind: B\n";
        assert_eq!(remove_range(content, TextRange::new(0, 8)), "kind: B\n");
    }

    #[test]
    fn test_remove_range_later_document_takes_preceding_separator() {
        let content = "kind: A\n--- # two\nkind: B\n---\nkind: C\n";
        let start = content.find("kind: B").unwrap();
        assert_eq!(
            remove_range(content, TextRange::new(start, 8)),
            "kind: A\n---\nkind: C\n"
        );
    }

    #[test]
    fn test_remove_range_single_document() {
        assert_eq!(remove_range("kind: A\n", TextRange::new(0, 8)), "");
    }

    #[test]
    fn test_remove_range_clamps() {
        assert_eq!(remove_range("kind: A\n", TextRange::new(4, 100)), "kind");
    }
}
