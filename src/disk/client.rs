//! Yandex Disk REST client
//!
//! Thin wrapper over `https://cloud-api.yandex.net/v1/disk` with OAuth
//! token authentication. Paths are normalised to the `disk:/` form the
//! API reports back.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::types::{ApiErrorBody, DirectoryListing, Link, Resource};
use crate::config::DiskConfig;
use crate::error::DiskError;

/// Default page size for directory listings
pub const DEFAULT_LIST_LIMIT: u32 = 100;

const FOLDER_EXISTS_ERROR: &str = "DiskPathPointsToExistentDirectoryError";

pub struct YandexDiskClient {
    client: Client,
    base_url: String,
    token: String,
}

impl YandexDiskClient {
    pub fn new(config: &DiskConfig) -> Result<Self, DiskError> {
        let token = config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(DiskError::NotConfigured)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Directory page (`GET /resources`)
    pub async fn list(
        &self,
        path: &str,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<DirectoryListing, DiskError> {
        let path = normalize_path(path);
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let offset = offset.unwrap_or(0);
        let (limit_param, offset_param) = (limit.to_string(), offset.to_string());
        let url = self.url(
            "resources",
            &[
                ("path", path.as_str()),
                ("limit", limit_param.as_str()),
                ("offset", offset_param.as_str()),
            ],
        )?;

        let response = self.send(self.request(Method::GET, url), &path).await?;
        let resource: Resource = response.json().await?;
        let listing = DirectoryListing::from_resource(resource, limit, offset);
        debug!(path = %listing.path, items = listing.items.len(), "Listed Yandex Disk directory");
        Ok(listing)
    }

    /// Metadata of a single file or directory
    pub async fn metadata(&self, path: &str) -> Result<Resource, DiskError> {
        let path = normalize_path(path);
        let url = self.url("resources", &[("path", path.as_str()), ("limit", "0")])?;
        let response = self.send(self.request(Method::GET, url), &path).await?;
        Ok(response.json().await?)
    }

    /// Pre-signed download URL
    pub async fn download_link(&self, path: &str) -> Result<Link, DiskError> {
        let path = normalize_path(path);
        let url = self.url("resources/download", &[("path", path.as_str())])?;
        let response = self.send(self.request(Method::GET, url), &path).await?;
        Ok(response.json().await?)
    }

    /// File contents, fetched through the download link
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, DiskError> {
        let link = self.download_link(path).await?;
        let href = Url::parse(&link.href)?;
        let response = self.send(self.client.get(href), path).await?;
        let bytes = response.bytes().await?;
        info!(path = %normalize_path(path), bytes = bytes.len(), "Downloaded from Yandex Disk");
        Ok(bytes.to_vec())
    }

    /// Request an upload link, then PUT the bytes to it
    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        overwrite: bool,
    ) -> Result<(), DiskError> {
        let path = normalize_path(path);
        let url = self.url(
            "resources/upload",
            &[
                ("path", path.as_str()),
                ("overwrite", if overwrite { "true" } else { "false" }),
            ],
        )?;
        let response = self.send(self.request(Method::GET, url), &path).await?;
        let link: Link = response.json().await?;

        let size = bytes.len();
        let href = Url::parse(&link.href)?;
        self.send(self.client.put(href).body(bytes), &path).await?;
        info!(path = %path, bytes = size, "Uploaded to Yandex Disk");
        Ok(())
    }

    /// Create a directory. Returns `false` when it already exists.
    pub async fn create_folder(&self, path: &str) -> Result<bool, DiskError> {
        let path = normalize_path(path);
        let url = self.url("resources", &[("path", path.as_str())])?;
        match self.send(self.request(Method::PUT, url), &path).await {
            Ok(_) => {
                info!(path = %path, "Created Yandex Disk folder");
                Ok(true)
            }
            Err(DiskError::Api { status: 409, error, .. }) if error == FOLDER_EXISTS_ERROR => {
                debug!(path = %path, "Yandex Disk folder already exists");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Create a directory and any missing parents
    pub async fn create_folder_all(&self, path: &str) -> Result<(), DiskError> {
        let path = normalize_path(path);
        let (root, relative) = path.split_once(":/").unwrap_or(("disk", path.as_str()));
        let mut current = format!("{}:", root);
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            self.create_folder(&current).await?;
        }
        Ok(())
    }

    fn url(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Url, DiskError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, endpoint))?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Authorization", format!("OAuth {}", self.token))
            .header("Accept", "application/json")
    }

    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response, DiskError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(DiskError::Unauthorized),
            StatusCode::NOT_FOUND => Err(DiskError::NotFound {
                path: normalize_path(path),
            }),
            _ => {
                let text = response.text().await.unwrap_or_default();
                let body: ApiErrorBody = serde_json::from_str(&text).unwrap_or_default();
                let message = [body.message, body.description, text]
                    .into_iter()
                    .find(|m| !m.is_empty())
                    .unwrap_or_else(|| status.to_string());
                Err(DiskError::Api {
                    status: status.as_u16(),
                    error: body.error,
                    message,
                })
            }
        }
    }
}

/// `Документы/акт.docx`, `/Документы/акт.docx` and `disk:/Документы/акт.docx`
/// all become `disk:/Документы/акт.docx`
pub fn normalize_path(path: &str) -> String {
    let path = path.trim();
    if path.starts_with("disk:") || path.starts_with("app:") || path.starts_with("trash:") {
        return path.to_string();
    }
    format!("disk:/{}", path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "disk:/");
        assert_eq!(normalize_path("/"), "disk:/");
        assert_eq!(normalize_path("Документы/акт.docx"), "disk:/Документы/акт.docx");
        assert_eq!(normalize_path(" /Сканы "), "disk:/Сканы");
        assert_eq!(normalize_path("disk:/Сканы"), "disk:/Сканы");
        assert_eq!(normalize_path("app:/backup"), "app:/backup");
    }

    #[test]
    fn test_requires_token() {
        let config = DiskConfig {
            token: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            YandexDiskClient::new(&config),
            Err(DiskError::NotConfigured)
        ));
    }

    #[test]
    fn test_url_encodes_query() {
        let config = DiskConfig {
            token: Some("t".into()),
            base_url: "http://localhost:9/v1/disk/".into(),
            ..Default::default()
        };
        let client = YandexDiskClient::new(&config).unwrap();
        let url = client
            .url("resources", &[("path", "disk:/Мои документы")])
            .unwrap();
        assert!(url.as_str().starts_with("http://localhost:9/v1/disk/resources?path="));
        let (_, value) = url.query_pairs().next().unwrap();
        assert_eq!(value, "disk:/Мои документы");
    }
}
