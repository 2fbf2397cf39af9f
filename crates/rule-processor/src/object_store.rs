//! Object storage abstraction for archive-batch sources.
//!
//! S3 notification records only point at an object; the [`ObjectStore`] trait
//! fetches its bytes. Production deployments plug in their own store, the CLI
//! uses [`FsObjectStore`], and tests use in-memory doubles.
//!
//! # Key Validation
//!
//! [`FsObjectStore`] maps `<root>/<bucket>/<key>` onto the local filesystem and
//! rejects bucket names and keys that could escape the root:
//! - empty bucket or key
//! - bucket containing a path separator
//! - absolute keys or keys with `..` segments

use std::future::Future;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;

use crate::error::RuleProcessorError;

/// Trait abstracting object retrieval.
///
/// The trait is `Send + Sync + 'static`, allowing the processor to hold it in an `Arc`
/// and share it across concurrent invocations.
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetches the full content of an object.
    ///
    /// # Errors
    ///
    /// Returns `RuleProcessorError::ObjectFetch` if the object cannot be read.
    fn get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> impl Future<Output = Result<Bytes, RuleProcessorError>> + Send;
}

/// Local filesystem object store.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    /// Creates a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `bucket`/`key` to a path under the root.
    fn resolve(&self, bucket: &str, key: &str) -> Result<PathBuf, RuleProcessorError> {
        let reject = |reason: &str| RuleProcessorError::ObjectFetch {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            reason: reason.to_owned(),
        };

        if bucket.is_empty() || key.is_empty() {
            return Err(reject("bucket and key must not be empty"));
        }
        if bucket.contains(['/', '\\']) || bucket == "." || bucket == ".." {
            return Err(reject("invalid bucket name"));
        }

        let key_path = Path::new(key);
        if !key_path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(reject("key must be a relative path without '..'"));
        }

        Ok(self.root.join(bucket).join(key_path))
    }
}

impl ObjectStore for FsObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, RuleProcessorError> {
        let path = self.resolve(bucket, key)?;
        tracing::debug!(bucket, key, path = %path.display(), "reading object from filesystem");

        let content =
            tokio::fs::read(&path)
                .await
                .map_err(|e| RuleProcessorError::ObjectFetch {
                    bucket: bucket.to_owned(),
                    key: key.to_owned(),
                    reason: e.to_string(),
                })?;

        Ok(Bytes::from(content))
    }
}
