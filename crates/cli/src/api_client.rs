use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

/// A stored package as reported by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub size: u64,
    pub modified_at: String,
    pub checksum: String,
}

/// One downloadable asset inside a release descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetInfo {
    pub name: String,
    pub size: u64,
    pub browser_download_url: String,
}

/// Release descriptor returned by /latest.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    pub assets: Vec<AssetInfo>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url).context("invalid server URL")?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("failed to build API URL")
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let response = self.authorized(req).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            anyhow::bail!("API error ({}): {}", status, body);
        }
        serde_json::from_str(&body).context("failed to parse API response")
    }

    /// Upload a local file as a package, streaming it to the server.
    pub async fn upload(&self, path: &Path, name: &str, overwrite: bool) -> Result<PackageInfo> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        let size = file.metadata().await?.len();

        let mut url = self.url(&format!("/assets/{name}"))?;
        if overwrite {
            url.query_pairs_mut().append_pair("overwrite", "true");
        }

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        self.send_json(
            self.http
                .put(url)
                .header(reqwest::header::CONTENT_LENGTH, size)
                .body(body),
        )
        .await
    }

    /// List all packages, newest first.
    pub async fn list(&self) -> Result<Vec<PackageInfo>> {
        let url = self.url("/packages")?;
        self.send_json(self.http.get(url)).await
    }

    /// Fetch the latest-release descriptor.
    pub async fn latest(&self) -> Result<ReleaseInfo> {
        let url = self.url("/latest")?;
        self.send_json(self.http.get(url)).await
    }

    /// Delete a package by name.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let url = self.url(&format!("/assets/{name}"))?;
        let response = self.authorized(self.http.delete(url)).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            anyhow::bail!("package not found: {name}");
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }
        Ok(())
    }

    /// Download a package to a local file, returning the bytes written.
    pub async fn download(&self, name: &str, dest: &Path) -> Result<u64> {
        let url = self.url(&format!("/assets/{name}"))?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            anyhow::bail!("package not found: {name}");
        }
        if !status.is_success() {
            anyhow::bail!("API error ({})", status);
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("failed to create {}", dest.display()))?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("download stream failed")?;
            written += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(written)
    }
}
