//! Directory trees.
//!
//! A [`Folder`] owns its files and subfolders exclusively. Repositories build
//! trees top-down with [`Folder::add_file`] / [`Folder::add_folder`]; the
//! remote repository, whose listing arrives as a flat list of paths, goes
//! through [`FolderArena`] instead and converts the result at the end.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::file::{file_name, File};

/// File whose presence marks a directory as a Helm chart root.
pub const HELM_CHART_ENTRY_FILE: &str = "Chart.yaml";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    path: String,
    folders: Vec<Folder>,
    files: Vec<File>,
    contains_helm_chart: bool,
}

impl Folder {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            folders: Vec::new(),
            files: Vec::new(),
            contains_helm_chart: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        file_name(&self.path)
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    /// True iff one of this folder's own files is `Chart.yaml`.
    pub fn contains_helm_chart(&self) -> bool {
        self.contains_helm_chart
    }

    pub fn add_folder(&mut self, folder: Folder) {
        self.folders.push(folder);
    }

    pub fn add_file(&mut self, file: File) {
        if file.name() == HELM_CHART_ENTRY_FILE {
            self.contains_helm_chart = true;
        }
        self.files.push(file);
    }

    /// Direct child folder with the given path.
    pub fn folder_mut(&mut self, path: &str) -> Option<&mut Folder> {
        self.folders.iter_mut().find(|f| f.path == path)
    }

    /// Whether a direct child file has the given path.
    pub fn has_file(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.path() == path)
    }

    pub fn chart_entry(&self) -> Option<&File> {
        self.files.iter().find(|f| f.name() == HELM_CHART_ENTRY_FILE)
    }

    /// Number of folders in this subtree, excluding itself.
    pub fn folder_count(&self) -> usize {
        self.folders.iter().map(|f| 1 + f.folder_count()).sum()
    }

    /// Number of files in this subtree.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.folders.iter().map(Folder::file_count).sum::<usize>()
    }
}

struct Node {
    path: String,
    files: Vec<File>,
    children: Vec<usize>,
}

/// Path-indexed tree builder.
///
/// Nodes live in one vector and are looked up by path, so inserting a deep
/// entry never scans sibling lists. Entries may arrive in any order.
pub struct FolderArena {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    file_paths: HashSet<String>,
}

impl FolderArena {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut index = HashMap::new();
        index.insert(root.clone(), 0);
        Self {
            nodes: vec![Node {
                path: root,
                files: Vec::new(),
                children: Vec::new(),
            }],
            index,
            file_paths: HashSet::new(),
        }
    }

    /// Seed an arena with an already built tree, so a later walk only adds
    /// what is missing.
    pub fn from_folder(folder: Folder) -> Self {
        let mut arena = Self::new(folder.path.clone());
        arena.absorb(0, folder);
        arena
    }

    fn absorb(&mut self, ix: usize, folder: Folder) {
        for file in folder.files {
            self.file_paths.insert(file.path().to_string());
            self.nodes[ix].files.push(file);
        }
        for child in folder.folders {
            let child_ix = self.push_node(ix, child.path.clone());
            self.absorb(child_ix, child);
        }
    }

    fn push_node(&mut self, parent: usize, path: String) -> usize {
        let ix = self.nodes.len();
        self.index.insert(path.clone(), ix);
        self.nodes.push(Node {
            path,
            files: Vec::new(),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(ix);
        ix
    }

    pub fn root_path(&self) -> &str {
        &self.nodes[0].path
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.file_paths.contains(path)
    }

    /// Ensure the folders named by `relative` (slash separated, relative to
    /// the root) exist.
    pub fn insert_folder(&mut self, relative: &str) {
        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        self.descend(0, &segments);
    }

    /// Place `file` at `relative`, creating intermediate folders on demand.
    /// Returns false when a file with the same path is already present.
    pub fn insert_file(&mut self, relative: &str, file: File) -> bool {
        if self.file_paths.contains(file.path()) {
            return false;
        }
        let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
        let Some((_, parents)) = segments.split_last() else {
            return false;
        };
        let ix = self.descend(0, parents);
        self.file_paths.insert(file.path().to_string());
        self.nodes[ix].files.push(file);
        true
    }

    fn descend(&mut self, ix: usize, segments: &[&str]) -> usize {
        let Some((first, rest)) = segments.split_first() else {
            return ix;
        };
        let path = format!("{}/{}", self.nodes[ix].path, first);
        let child = match self.index.get(&path) {
            Some(&child) => child,
            None => self.push_node(ix, path),
        };
        self.descend(child, rest)
    }

    pub fn into_folder(mut self) -> Folder {
        build(&mut self.nodes, 0)
    }
}

fn build(nodes: &mut [Node], ix: usize) -> Folder {
    let mut folder = Folder::new(std::mem::take(&mut nodes[ix].path));
    for file in std::mem::take(&mut nodes[ix].files) {
        folder.add_file(file);
    }
    for child in std::mem::take(&mut nodes[ix].children) {
        let sub = build(nodes, child);
        folder.add_folder(sub);
    }
    folder
}
