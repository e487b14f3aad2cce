// src/storage/blob.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use super::{BlobDescriptor, BlobStore, StorageError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::BoxFuture;

/// Blob store backed by a local directory: `<root>/<container>/<name>`.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_fs(root, Arc::new(RealFileSystem))
    }

    pub fn with_fs(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of `blob` below the root. Names that would leave the
    /// container are rejected.
    fn blob_path(&self, blob: &BlobDescriptor) -> Result<PathBuf, StorageError> {
        if !is_plain_segment(&blob.container) {
            return Err(StorageError::InvalidName(blob.to_string()));
        }
        let mut path = self.root.join(&blob.container);
        let mut segments = 0;
        for segment in blob.name.split('/').filter(|s| !s.is_empty()) {
            if !is_plain_segment(segment) {
                return Err(StorageError::InvalidName(blob.to_string()));
            }
            path.push(segment);
            segments += 1;
        }
        if segments == 0 {
            return Err(StorageError::InvalidName(blob.to_string()));
        }
        Ok(path)
    }
}

impl BlobStore for FsBlobStore {
    fn upload<'a>(
        &'a self,
        blob: &'a BlobDescriptor,
        content: &'a [u8],
    ) -> BoxFuture<'a, Result<(), StorageError>> {
        Box::pin(async move {
            let path = self.blob_path(blob)?;
            debug!(blob = %blob, path = %path.display(), bytes = content.len(), "uploading blob");
            self.fs.write(&path, content)?;
            Ok(())
        })
    }

    fn download<'a>(
        &'a self,
        blob: &'a BlobDescriptor,
    ) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        Box::pin(async move {
            let path = self.blob_path(blob)?;
            if !self.fs.is_file(&path) {
                return Err(StorageError::NotFound(blob.to_string()));
            }
            debug!(blob = %blob, path = %path.display(), "downloading blob");
            Ok(self.fs.read(&path)?)
        })
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', ':'])
}
