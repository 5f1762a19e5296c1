//! Company logo retrieval

use crate::Result;
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Streams logos into a directory, one `<listing id>.jpg` file per listing
#[derive(Debug, Clone)]
pub struct LogoStore {
    client: Client,
    dir: PathBuf,
}

impl LogoStore {
    pub fn new(client: Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, listing_id: i64) -> PathBuf {
        self.dir.join(format!("{}.jpg", listing_id))
    }

    /// Downloads `url` to the listing's logo file
    ///
    /// The body is written chunk by chunk as it arrives. A failed download
    /// may leave a partial file behind; the next successful save overwrites
    /// it.
    pub async fn save(&self, listing_id: i64, url: &str) -> Result<PathBuf> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(listing_id);
        let mut file = tokio::fs::File::create(&path).await?;

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!("Saved logo of {} to {}", listing_id, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrawlError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_save_streams_body_to_file() {
        let server = MockServer::start().await;
        let body: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
        Mock::given(method("GET"))
            .and(path("/logo.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = LogoStore::new(Client::new(), dir.path().join("logos"));

        let saved = store
            .save(42, &format!("{}/logo.jpg", server.uri()))
            .await
            .unwrap();

        assert_eq!(saved, dir.path().join("logos").join("42.jpg"));
        assert_eq!(std::fs::read(&saved).unwrap(), body);
    }

    #[tokio::test]
    async fn test_save_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let store = LogoStore::new(Client::new(), dir.path());

        let result = store.save(42, &server.uri()).await;

        assert!(matches!(result, Err(TrawlError::Reqwest(_))));
        assert!(!store.path_for(42).exists());
    }
}
