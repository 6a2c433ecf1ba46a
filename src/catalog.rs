//!
//! src/catalog.rs
//!
//! The authenticated catalog surface the matcher and playlist
//! builder consume, and its Spotify implementation over reqwest
//!

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, header, redirect};
use serde_json::{Value, json};
use url::Url;

use crate::config::{HttpConfig, SpotifyConfig};
use crate::errors::PipelineError;

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, PipelineError> {
    let mut h = header::HeaderMap::new();
    h.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/json"),
    );
    client_helper(http)
        .default_headers(h)
        .build()
        .map_err(|e| PipelineError::Http(format!("build client: {e}")))
}

/// Everything the pipeline asks of the authenticated session: track
/// search, the caller's identity, playlist creation, and batched
/// track addition.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn search_track(&self, query: &str, limit: u32) -> Result<Value, PipelineError>;
    async fn current_user_id(&self) -> Result<String, PipelineError>;
    async fn playlist_create(
        &self,
        user_id: &str,
        name: &str,
        public: bool,
        description: &str,
    ) -> Result<Value, PipelineError>;
    async fn playlist_add_items(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), PipelineError>;
}

#[derive(Clone, Debug)]
pub struct SpotifyApi {
    http: Client,
    api_base: Url,
    bearer: String,
}

impl SpotifyApi {
    pub fn new(
        http_config: &HttpConfig,
        cfg: &SpotifyConfig,
        bearer: String,
    ) -> Result<Self, PipelineError> {
        let http = base_client(http_config)?;
        Ok(Self {
            http,
            api_base: cfg.api_base.clone(),
            bearer,
        })
    }

    fn endpoint(&self, path: &str) -> Url {
        self.api_base.join(path).unwrap()
    }

    async fn execute_json(&self, request: RequestBuilder) -> Result<Value, PipelineError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Api(format!("status {status}: {body}")));
        }
        Ok(response.json::<Value>().await?)
    }

    async fn execute_ok(&self, request: RequestBuilder) -> Result<(), PipelineError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Api(format!("status {status}: {body}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogApi for SpotifyApi {
    /// GET /v1/search?type=track&q=...&limit=...
    async fn search_track(&self, query: &str, limit: u32) -> Result<Value, PipelineError> {
        let request = self
            .http
            .get(self.endpoint("search"))
            .bearer_auth(&self.bearer)
            .query(&[
                ("type", "track"),
                ("q", query),
                ("limit", &limit.to_string()),
            ]);
        self.execute_json(request).await
    }

    /// GET /v1/me
    async fn current_user_id(&self) -> Result<String, PipelineError> {
        let request = self.http.get(self.endpoint("me")).bearer_auth(&self.bearer);
        let user = self.execute_json(request).await?;
        user.get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Parse("user profile missing id".to_string()))
    }

    /// POST /v1/users/{id}/playlists
    async fn playlist_create(
        &self,
        user_id: &str,
        name: &str,
        public: bool,
        description: &str,
    ) -> Result<Value, PipelineError> {
        let request = self
            .http
            .post(self.endpoint(&format!("users/{user_id}/playlists")))
            .bearer_auth(&self.bearer)
            .json(&json!({
                "name": name,
                "public": public,
                "description": description,
            }));
        self.execute_json(request).await
    }

    /// POST /v1/playlists/{id}/tracks
    async fn playlist_add_items(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), PipelineError> {
        let request = self
            .http
            .post(self.endpoint(&format!("playlists/{playlist_id}/tracks")))
            .bearer_auth(&self.bearer)
            .json(&json!({ "uris": uris }));
        self.execute_ok(request).await
    }
}
