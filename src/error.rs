//! Typed failures for repository contract violations.
//!
//! Everything else in the crate reports through `anyhow`; these variants
//! exist so callers can `downcast_ref` the cases they are expected to
//! present to the user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A mutation was requested from a read-only repository.
    #[error("{operation} is not implemented for the {repository} repository")]
    Unsupported {
        operation: &'static str,
        repository: &'static str,
    },

    #[error("root path does not exist or is not a directory: {0}")]
    InvalidRoot(String),

    #[error("resource {id} does not belong to {file_path}")]
    ForeignResource { id: String, file_path: String },

    /// The resource carries no source range, so it cannot be spliced out.
    #[error("resource {id} has no source range")]
    MissingRange { id: String },

    /// The file changed since the resource was extracted.
    #[error("resource {id} no longer matches its range in {file_path}")]
    StaleRange { id: String, file_path: String },
}

impl RepositoryError {
    pub fn unsupported(operation: &'static str, repository: &'static str) -> Self {
        Self::Unsupported {
            operation,
            repository,
        }
    }
}
