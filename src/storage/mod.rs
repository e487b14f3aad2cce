// src/storage/mod.rs

//! Content stores used by components: blobs (package archives, results) and
//! secrets.
//!
//! Both are traits so that a cloud-backed implementation can be slotted in;
//! the crate ships a local-directory blob store and an environment-backed
//! secret store.

use std::fmt::Debug;

use thiserror::Error;

use crate::types::BoxFuture;

pub mod blob;
pub mod retry;
pub mod secrets;

pub use blob::FsBlobStore;
pub use retry::RetryPolicy;
pub use secrets::EnvSecretStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid blob address: {0}")]
    InvalidName(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    /// Missing content will not appear by retrying, nor will a bad address.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, StorageError::NotFound(_) | StorageError::InvalidName(_))
    }
}

/// Address of a blob: a container plus a (possibly `/`-separated) name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobDescriptor {
    pub container: String,
    pub name: String,
}

impl BlobDescriptor {
    pub fn new(container: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for BlobDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.container, self.name)
    }
}

pub trait BlobStore: Send + Sync + Debug {
    fn upload<'a>(
        &'a self,
        blob: &'a BlobDescriptor,
        content: &'a [u8],
    ) -> BoxFuture<'a, Result<(), StorageError>>;

    fn download<'a>(&'a self, blob: &'a BlobDescriptor)
    -> BoxFuture<'a, Result<Vec<u8>, StorageError>>;
}

pub trait SecretStore: Send + Sync + Debug {
    fn get_secret<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<String, StorageError>>;
}
