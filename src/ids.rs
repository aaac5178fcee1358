//! Resource identifier generation.
//!
//! Extraction never calls a random source directly; it asks the
//! [`IdGenerator`] it was given. [`RandomIds`] keeps the historical
//! behavior (a fresh UUID per pass), [`ContentIds`] derives a stable UUID
//! from where the document lives and what it says.

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Which kind of resource an id is minted for. Helm resources are built
/// from the same files as plain documents and must not share their ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScope {
    Document,
    HelmChart,
    HelmValues,
    HelmTemplate,
}

impl IdScope {
    fn tag(&self) -> &'static [u8] {
        match self {
            IdScope::Document => b"document",
            IdScope::HelmChart => b"helmChart",
            IdScope::HelmValues => b"helmValues",
            IdScope::HelmTemplate => b"helmTemplate",
        }
    }
}

/// What a generator may use to derive an id for one document.
#[derive(Debug, Clone, Copy)]
pub struct IdSeed<'a> {
    pub scope: IdScope,
    pub file_path: &'a str,
    /// Byte offset of the document in its file.
    pub offset: usize,
    pub text: &'a str,
}

pub trait IdGenerator: Send + Sync {
    fn generate(&self, seed: &IdSeed<'_>) -> String;
}

/// UUID v4 per call; ids change between passes.
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn generate(&self, _seed: &IdSeed<'_>) -> String {
        Uuid::new_v4().to_string()
    }
}

/// UUID built from the SHA-256 of scope, path, offset and text.
pub struct ContentIds;

impl IdGenerator for ContentIds {
    fn generate(&self, seed: &IdSeed<'_>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(seed.scope.tag());
        hasher.update([0u8]);
        hasher.update(seed.file_path.as_bytes());
        hasher.update(seed.offset.to_le_bytes());
        hasher.update(seed.text.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Uuid::from_bytes(bytes).to_string()
    }
}

/// `<prefix>-1`, `<prefix>-2`, ... in call order.
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn generate(&self, _seed: &IdSeed<'_>) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// `[extraction] ids` setting.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    #[default]
    Random,
    Content,
}

impl IdStrategy {
    pub fn generator(&self) -> Arc<dyn IdGenerator> {
        match self {
            IdStrategy::Random => Arc::new(RandomIds),
            IdStrategy::Content => Arc::new(ContentIds),
        }
    }
}
