use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::model::{Project, User, Version};
use crate::core::config::Config;
use crate::core::error::{SyncError, SyncResult};
use crate::core::http::build_http_client;
use crate::core::platform::Category;

pub const MODRINTH_API_URL: &str = "https://api.modrinth.com/v2";

/// Chunked body of a downloaded file.
pub type ByteStream = BoxStream<'static, SyncResult<Vec<u8>>>;

/// Everything the sync core needs from the package registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Projects the authenticated user follows.
    async fn list_followed_projects(&self) -> SyncResult<Vec<Project>>;

    /// Versions of `slug` compatible with the target, newest first as the
    /// registry orders them. The loader filter only applies to mods.
    async fn list_compatible_versions(
        &self,
        slug: &str,
        category: Category,
        game_version: &str,
        loader: &str,
    ) -> SyncResult<Vec<Version>>;

    async fn get_project(&self, id_or_slug: &str) -> SyncResult<Project>;

    async fn get_version_by_hash(&self, sha1: &str) -> SyncResult<Version>;

    async fn download_file(&self, url: &str) -> SyncResult<ByteStream>;
}

/// Modrinth v2 API client.
pub struct ModrinthClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
    download_timeout: Duration,
}

impl ModrinthClient {
    pub fn new(config: &Config) -> SyncResult<Self> {
        let client = build_http_client(&config.user_agent)?;
        Ok(Self {
            client,
            base_url: MODRINTH_API_URL.to_string(),
            api_key: config.api_key.clone(),
            request_timeout: config.request_timeout,
            download_timeout: config.download_timeout,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn authorize(&self, request: RequestBuilder, required: bool) -> SyncResult<RequestBuilder> {
        match (&self.api_key, required) {
            (Some(key), _) => Ok(request.header(AUTHORIZATION, key.as_str())),
            (None, true) => Err(SyncError::Config(
                "authentication required, but MODRINTH_API_KEY is not set".into(),
            )),
            (None, false) => Ok(request),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        requires_auth: bool,
    ) -> SyncResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .timeout(self.request_timeout);
        if !query.is_empty() {
            request = request.query(query);
        }
        let request = self.authorize(request, requires_auth)?;

        debug!("GET {}", url);
        let response = ensure_success(&url, request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RegistryClient for ModrinthClient {
    async fn list_followed_projects(&self) -> SyncResult<Vec<Project>> {
        let user: User = self.get_json("/user", &[], true).await?;
        if user.id.is_empty() {
            return Err(SyncError::RegistryResponse(
                "could not determine user ID from API key".into(),
            ));
        }

        self.get_json(&format!("/user/{}/follows", user.id), &[], true)
            .await
    }

    async fn list_compatible_versions(
        &self,
        slug: &str,
        category: Category,
        game_version: &str,
        loader: &str,
    ) -> SyncResult<Vec<Version>> {
        let query = version_query(category, game_version, loader)?;
        self.get_json(&format!("/project/{}/version", slug), &query, false)
            .await
    }

    async fn get_project(&self, id_or_slug: &str) -> SyncResult<Project> {
        self.get_json(&format!("/project/{}", id_or_slug), &[], false)
            .await
    }

    async fn get_version_by_hash(&self, sha1: &str) -> SyncResult<Version> {
        self.get_json(
            &format!("/version_file/{}", sha1),
            &[("algorithm", "sha1".to_string())],
            false,
        )
        .await
    }

    async fn download_file(&self, url: &str) -> SyncResult<ByteStream> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/octet-stream")
            .timeout(self.download_timeout)
            .send()
            .await?;
        let response = ensure_success(url, response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(SyncError::from))
            .boxed())
    }
}

/// Query parameters for the version listing. Modrinth expects JSON arrays.
fn version_query(
    category: Category,
    game_version: &str,
    loader: &str,
) -> SyncResult<Vec<(&'static str, String)>> {
    let mut query = vec![("game_versions", serde_json::to_string(&[game_version])?)];
    if category.filters_by_loader() {
        query.push(("loaders", serde_json::to_string(&[loader])?));
    }
    Ok(query)
}

async fn ensure_success(url: &str, response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SyncError::RegistryStatus {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}
