//! Local-filesystem-backed `ArtifactStore` (spec §6's write-once,
//! URL-addressed object store seam — see `DESIGN.md` Open Question
//! resolutions for why this is a local stand-in rather than a named
//! bucket API).

use async_trait::async_trait;
use briefwave_core::ArtifactStore;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

pub struct FsArtifactStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self { root: root.into(), public_base_url: public_base_url.into() }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> anyhow::Result<String> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        Ok(format!("{}/{}", self.public_base_url.trim_end_matches('/'), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_file_and_returns_url() {
        let dir = std::env::temp_dir().join(format!("briefwave-artifact-test-{}", uuid::Uuid::new_v4()));
        let store = FsArtifactStore::new(&dir, "https://cdn.example.com");

        let url = store.put("audio/ep1.mp3", vec![1, 2, 3], "audio/mpeg").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/audio/ep1.mp3");

        let contents = tokio::fs::read(dir.join("audio/ep1.mp3")).await.unwrap();
        assert_eq!(contents, vec![1, 2, 3]);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
