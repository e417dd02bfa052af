use std::path::PathBuf;

use tokio::fs;

/// Writes uploaded files under a local root directory and hands back
/// the public URL they are served from (see the `/uploads` static
/// service in the router).
#[derive(Debug, Clone)]
pub struct StorageClient {
    root: PathBuf,
    public_base: String,
}

impl StorageClient {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        StorageClient {
            root: root.into(),
            public_base: public_base.into(),
        }
    }

    /// Store `bytes` under `key` (a relative path like
    /// "contents/{id}/{filename}") and return the URL to reach it.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, std::io::Error> {
        let path = self.root.join(key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, bytes).await?;

        Ok(format!(
            "{}/uploads/{}",
            self.public_base.trim_end_matches('/'),
            key
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_the_file_and_returns_a_public_url() {
        let dir = std::env::temp_dir().join(format!("storage-test-{}", uuid::Uuid::new_v4()));
        let storage = StorageClient::new(&dir, "http://localhost:8000/");

        let url = storage
            .put("contents/abc/handout.pdf", b"%PDF-1.4")
            .await
            .unwrap();

        assert_eq!(url, "http://localhost:8000/uploads/contents/abc/handout.pdf");
        let written = tokio::fs::read(dir.join("contents/abc/handout.pdf"))
            .await
            .unwrap();
        assert_eq!(written, b"%PDF-1.4");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
