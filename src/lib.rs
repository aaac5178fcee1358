//! # Manifest Harness
//!
//! Walks a tree of Kubernetes manifests, from a local directory or a hosted
//! Git repository, and aggregates every resource declared in it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌────────────────┐   ┌─────────────┐
//! │ Repository   │──▶│  Folder  │──▶│ File           │──▶│  Resources  │
//! │ local/github │   │  tree    │   │ parse+classify │   │  by id      │
//! └──────────────┘   └──────────┘   └────────────────┘   └─────────────┘
//! ```
//!
//! Malformed YAML never fails a pass: the offending document is skipped and
//! reported to the [`diagnostics`] sink handed to the [`file::Extractor`].
//!
//! ## Quick Start
//!
//! ```bash
//! mh scan ./deploy                      # summary counts
//! mh resources ./deploy --kind Service  # resource table
//! mh tree ./deploy                      # file map as JSON
//! mh files /acme/deploy --source github
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`document`] | Lenient multi-document YAML parsing |
//! | [`factory`] | Resource naming, identity and classification |
//! | [`file`] | Source files and per-file extraction |
//! | [`folder`] | Directory trees and the path-indexed builder |
//! | [`traits`] | The `FileRepository` contract |
//! | [`repo_local`] | Local filesystem repository |
//! | [`repo_github`] | Hosted Git tree API repository |
//! | [`aggregate`] | Aggregation service and repository factory |
//! | [`helm`] | Helm chart, values and template resources |
//! | [`filemap`] | Flat file-tree map |
//! | [`models`] | Resource data types |
//! | [`ids`] | Identifier generators |
//! | [`diagnostics`] | Diagnostics sinks |
//! | [`config`] | TOML configuration parsing |

pub mod aggregate;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod factory;
pub mod file;
pub mod filemap;
pub mod folder;
pub mod helm;
pub mod ids;
pub mod logging;
pub mod models;
pub mod repo_github;
pub mod repo_local;
pub mod scan;
pub mod traits;
