//! Scratch storage for uploaded request assets.

use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

/// A transient file materialized from an inbound upload.
///
/// Owned exclusively by the request that created it and deleted on
/// every exit path: call [`remove`](Self::remove) once the asset is no
/// longer needed; the `Drop` impl is a backstop for paths that never
/// reach it (panics, dropped streams).
#[derive(Debug)]
pub struct UploadedAsset {
    path: PathBuf,
    removed: bool,
}

impl UploadedAsset {
    /// Write `bytes` to scratch storage under a generated unique name,
    /// keeping the extension of `original_name` so the content type
    /// stays inferable. A failed write leaves nothing behind.
    pub async fn materialize(
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<Self, std::io::Error> {
        let extension = original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        let path = std::env::temp_dir().join(format!("{}{}", Uuid::new_v4(), extension));

        match tokio::fs::write(&path, bytes).await {
            Ok(()) => Ok(UploadedAsset {
                path,
                removed: false,
            }),
            Err(e) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the asset. Consumes the guard, so deletion happens at
    /// most once per asset.
    pub async fn remove(mut self) {
        self.removed = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "failed to remove uploaded asset");
            }
        }
    }
}

impl Drop for UploadedAsset {
    fn drop(&mut self) {
        if !self.removed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
