use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

use crate::providers::{BlobStore, ProviderError};

/// Content-addressed image storage on the local filesystem, served from
/// `public_base_url`. Identical bytes always map to the same URL.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn content_hash(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    fn file_name(bytes: &[u8], extension: &str) -> String {
        let ext = extension.trim_start_matches('.').trim().to_ascii_lowercase();
        let ext = if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            "bin".to_string()
        } else {
            ext
        };
        format!("{}.{}", Self::content_hash(bytes), ext)
    }
}

fn storage_error(action: &str, path: &Path, err: std::io::Error) -> ProviderError {
    ProviderError::Storage(format!("{} {}: {}", action, path.display(), err))
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, bytes: Vec<u8>, extension: &str) -> Result<String, ProviderError> {
        let file_name = Self::file_name(&bytes, extension);
        let target = self.root.join(&file_name);
        let url = format!("{}/{}", self.public_base_url, file_name);

        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| storage_error("creating", &self.root, e))?;

        if fs::try_exists(&target)
            .await
            .map_err(|e| storage_error("checking", &target, e))?
        {
            return Ok(url);
        }

        let temp_path = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .map_err(|e| storage_error("opening", &temp_path, e))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| storage_error("writing", &temp_path, e))?;
        file.flush()
            .await
            .map_err(|e| storage_error("flushing", &temp_path, e))?;
        drop(file);

        if let Err(err) = fs::rename(&temp_path, &target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(storage_error("renaming into", &target, err));
        }

        log::debug!("Stored image {} ({} bytes)", file_name, bytes.len());
        Ok(url)
    }
}
