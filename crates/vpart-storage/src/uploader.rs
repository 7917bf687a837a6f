//! Uploader contract and the R2 implementation.

use async_trait::async_trait;
use std::path::Path;

use vpart_models::{RemoteDestination, RemoteObject};

use crate::client::R2Client;
use crate::error::StorageError;

/// Sends one local file to remote storage.
///
/// A single call is one attempt; retrying is the caller's concern
/// (see [`crate::upload_with_retry`]).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        path: &Path,
        destination: &RemoteDestination,
    ) -> Result<RemoteObject, StorageError>;

    /// Verify credentials and destination before any work is scheduled.
    async fn check_access(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Object key for a destination: `{collection}/{display_name}`.
pub fn object_key(destination: &RemoteDestination) -> String {
    let collection = destination.collection_id.trim_matches('/');
    if collection.is_empty() {
        destination.display_name.clone()
    } else {
        format!("{}/{}", collection, destination.display_name)
    }
}

/// [`Uploader`] writing to an R2 bucket.
#[derive(Clone)]
pub struct R2Uploader {
    client: R2Client,
}

impl R2Uploader {
    pub fn new(client: R2Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Uploader for R2Uploader {
    async fn upload(
        &self,
        path: &Path,
        destination: &RemoteDestination,
    ) -> Result<RemoteObject, StorageError> {
        let key = object_key(destination);
        self.client
            .upload_file(path, &key, &destination.mime_type)
            .await?;

        Ok(RemoteObject {
            public_url: self.client.public_url(&key),
            id: key,
        })
    }

    async fn check_access(&self) -> Result<(), StorageError> {
        self.client.check_connectivity().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key() {
        let dest = RemoteDestination::new("shows/ep1/", "part_001.mp4", "video/mp4");
        assert_eq!(object_key(&dest), "shows/ep1/part_001.mp4");

        let bare = RemoteDestination::new("", "part_002.mp4", "video/mp4");
        assert_eq!(object_key(&bare), "part_002.mp4");
    }
}
