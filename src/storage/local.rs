//! Filesystem-backed object store

use super::{ObjectLocation, ObjectStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Object store rooted at a local directory.
///
/// Buckets are directories directly below the root and keys are relative
/// paths inside them.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a location to a path below the root, rejecting anything that
    /// could step outside of it
    fn object_path(&self, location: &ObjectLocation) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for part in [location.bucket.as_str(), location.key.as_str()] {
            let relative = Path::new(part);
            let only_normal = relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
            if part.is_empty() || !only_normal {
                return Err(Error::PathAccessDenied {
                    path: location.to_string(),
                });
            }
            path.push(relative);
        }
        Ok(path)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn fetch(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        let path = self.object_path(location)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ObjectNotFound {
                bucket: location.bucket.clone(),
                key: location.key.clone(),
            }),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn store(&self, location: &ObjectLocation, data: Vec<u8>) -> Result<()> {
        let path = self.object_path(location)?;
        tokio::task::spawn_blocking(move || write_atomically(&path, &data))
            .await
            .map_err(|e| Error::Task {
                reason: format!("Task join error: {}", e),
            })?
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}

/// Write through a sibling temporary file so readers never see a partial object
fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".upload-")
        .tempfile_in(parent)?;
    staged.write_all(data)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
