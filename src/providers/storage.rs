use anyhow::Context;
use camino::Utf8PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::infra::StorageSettings;

/// Product images kept on local disk and served under `public_base_url`.
#[derive(Clone)]
pub struct ImageStore {
    directory: Utf8PathBuf,
    public_base_url: String,
}

impl ImageStore {
    pub fn new(settings: &StorageSettings) -> Self {
        Self {
            directory: Utf8PathBuf::from(&settings.directory),
            public_base_url: settings.public_base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn directory(&self) -> &Utf8PathBuf {
        &self.directory
    }

    /// Stores the bytes under a fresh key and returns the public URL.
    pub async fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<String, anyhow::Error> {
        let key = format!("{}-{}", Uuid::new_v4(), sanitize(file_name));
        tokio::fs::create_dir_all(&self.directory)
            .await
            .with_context(|| format!("Could not create image directory {}.", self.directory))?;
        let path = self.directory.join(&key);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Could not write image {path}."))?;
        info!("Stored image {key} ({} bytes)", bytes.len());
        Ok(format!("{}/{key}", self.public_base_url))
    }

    /// Best-effort: failures are logged and never reported to the caller.
    pub async fn delete(&self, url: &str) {
        let Some(key) = self.key_from_url(url) else {
            warn!("Not deleting {url}: it is not an uploaded image.");
            return;
        };
        if let Err(e) = tokio::fs::remove_file(self.directory.join(key)).await {
            warn!("Failed to delete image {key}: {e}");
        }
    }

    pub fn key_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_base_url.as_str())?
            .strip_prefix('/')
            .filter(|key| !key.is_empty() && !key.contains('/') && !key.contains(".."))
    }
}

fn sanitize(file_name: &str) -> String {
    let cleaned: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_owned()
    } else {
        cleaned.to_owned()
    }
}
