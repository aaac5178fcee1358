//! Flat file-tree map keyed by root-relative path.
//!
//! The root folder is stored under `<root>`; every other entry under its
//! path relative to the root, leading separator included (`/base/app.yaml`).
//! Folder entries list the names of their files first, then their folders.

use indexmap::IndexMap;
use serde::Serialize;

use crate::folder::Folder;

pub const ROOT_KEY: &str = "<root>";

const SUPPORTED_EXTENSIONS: [&str; 2] = [".yaml", ".yml"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTreeEntry {
    pub name: String,
    pub file_path: String,
    pub is_excluded: bool,
    pub is_supported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

pub type FileMap = IndexMap<String, FileTreeEntry>;

pub fn build_file_map(root: &Folder) -> FileMap {
    let mut map = IndexMap::new();
    insert_folder(root, root.path(), &mut map);
    map
}

fn relative<'a>(path: &'a str, root_path: &str) -> &'a str {
    path.strip_prefix(root_path).unwrap_or(path)
}

fn insert_folder(folder: &Folder, root_path: &str, map: &mut FileMap) {
    let is_root = folder.path() == root_path;
    let children = folder
        .files()
        .iter()
        .map(|f| f.name().to_string())
        .chain(folder.folders().iter().map(|f| f.name().to_string()))
        .collect();

    let (key, name, file_path) = if is_root {
        (ROOT_KEY.to_string(), ROOT_KEY.to_string(), root_path.to_string())
    } else {
        let rel = relative(folder.path(), root_path).to_string();
        (rel.clone(), folder.name().to_string(), rel)
    };

    map.insert(
        key,
        FileTreeEntry {
            name,
            file_path,
            is_excluded: false,
            is_supported: false,
            extension: None,
            children: Some(children),
            text: None,
        },
    );

    for file in folder.files() {
        let rel = relative(file.path(), root_path).to_string();
        map.insert(
            rel.clone(),
            FileTreeEntry {
                name: file.name().to_string(),
                file_path: rel,
                is_excluded: false,
                is_supported: SUPPORTED_EXTENSIONS.contains(&file.extension()),
                extension: Some(file.extension().to_string()),
                children: None,
                text: Some(file.content().to_string()),
            },
        );
    }

    for child in folder.folders() {
        insert_folder(child, root_path, map);
    }
}
