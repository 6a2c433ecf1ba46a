//!
//! src/session.rs
//!
//! Establishes the authenticated Spotify session: cached token,
//! refresh exchange, or a pasted authorization code, in that order
//!

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use tracing::{debug, warn};
use url::Url;

use crate::catalog::base_client;
use crate::config::{HttpConfig, SpotifyConfig};
use crate::errors::PipelineError;

/// Leeway subtracted from the expiry so a token about to lapse is
/// refreshed rather than used.
const EXPIRY_LEEWAY_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub scope: String,
    pub expires_at: i64,
}

impl CachedToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - EXPIRY_LEEWAY_SECS <= now.timestamp()
    }

    fn from_response(
        value: &Value,
        previous_refresh: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, PipelineError> {
        let access_token = value
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                PipelineError::Auth("token response missing access_token".to_string())
            })?
            .to_string();
        let expires_in = value.get("expires_in").and_then(Value::as_i64).unwrap_or(3600);
        // refresh responses may omit the refresh token; keep the old one
        let refresh_token = value
            .get("refresh_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| previous_refresh.map(str::to_string));
        let scope = value
            .get("scope")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            access_token,
            refresh_token,
            scope,
            expires_at: now.timestamp() + expires_in,
        })
    }
}

/// Pull the `code` query parameter out of a pasted redirect URL.
pub fn extract_code(redirect: &str) -> Result<String, PipelineError> {
    let url = Url::parse(redirect)
        .map_err(|e| PipelineError::Auth(format!("invalid redirect url: {e}")))?;
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| PipelineError::Auth("redirect url missing code parameter".to_string()))
}

pub struct SpotifySession {
    http: reqwest::Client,
    cfg: SpotifyConfig,
}

impl SpotifySession {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) -> Result<Self, PipelineError> {
        let http = base_client(http_config)?;
        Ok(Self {
            http,
            cfg: cfg.clone(),
        })
    }

    /// Produce a bearer token: cached while valid, refreshed when
    /// expired, otherwise obtained interactively. Any failure here is
    /// fatal to the run; there is no useful work without a session.
    pub async fn establish(&self) -> Result<String, PipelineError> {
        let now = Utc::now();
        if let Some(cached) = self.load_cache() {
            if !cached.is_expired(now) {
                debug!("session.cache.hit");
                return Ok(cached.access_token);
            }
            if let Some(refresh_token) = cached.refresh_token.as_deref() {
                match self.refresh(refresh_token).await {
                    Ok(token) => {
                        self.store_cache(&token)?;
                        debug!("session.refreshed");
                        return Ok(token.access_token);
                    }
                    Err(e) => warn!(error = %e, "session.refresh.failed"),
                }
            }
        }

        let code = self.prompt_for_code()?;
        let token = self.exchange_code(&code).await?;
        self.store_cache(&token)?;
        Ok(token.access_token)
    }

    pub fn authorize_url(&self) -> Url {
        let mut url = self.cfg.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.cfg.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.cfg.redirect_uri)
            .append_pair("scope", &self.cfg.scope);
        url
    }

    fn prompt_for_code(&self) -> Result<String, PipelineError> {
        println!("Open this URL in your browser and authorize the app:");
        println!("{}", self.authorize_url());
        println!("Paste the URL you were redirected to:");
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        extract_code(line.trim())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<CachedToken, PipelineError> {
        let value = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        CachedToken::from_response(&value, Some(refresh_token), Utc::now())
    }

    async fn exchange_code(&self, code: &str) -> Result<CachedToken, PipelineError> {
        let value = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", &self.cfg.redirect_uri),
            ])
            .await?;
        CachedToken::from_response(&value, None, Utc::now())
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<Value, PipelineError> {
        let response = self
            .http
            .post(self.cfg.token_url.clone())
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .form(params)
            .send()
            .await
            .map_err(|e| PipelineError::Auth(format!("token request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Auth(format!(
                "token endpoint status {status}: {body}"
            )));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| PipelineError::Auth(format!("token response: {e}")))
    }

    fn load_cache(&self) -> Option<CachedToken> {
        let raw = fs::read_to_string(&self.cfg.cache_path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn store_cache(&self, token: &CachedToken) -> Result<(), PipelineError> {
        fs::write(&self.cfg.cache_path, serde_json::to_string_pretty(token)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpConfig, SPOTIFY_SCOPE, SpotifyConfig};
    use serde_json::json;
    use std::path::PathBuf;

    fn spotify_config(cache_path: PathBuf) -> SpotifyConfig {
        SpotifyConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            redirect_uri: "http://127.0.0.1:8000/callback".to_string(),
            scope: SPOTIFY_SCOPE.to_string(),
            token_url: Url::parse("https://accounts.spotify.com/api/token").unwrap(),
            auth_url: Url::parse("https://accounts.spotify.com/authorize").unwrap(),
            api_base: Url::parse("https://api.spotify.com/v1/").unwrap(),
            cache_path,
        }
    }

    #[test]
    fn token_expiry_honors_the_leeway() {
        let now = Utc::now();
        let fresh = CachedToken {
            access_token: "token".to_string(),
            refresh_token: None,
            scope: String::new(),
            expires_at: now.timestamp() + 3600,
        };
        assert!(!fresh.is_expired(now));

        let lapsing = CachedToken {
            expires_at: now.timestamp() + 30,
            ..fresh.clone()
        };
        assert!(lapsing.is_expired(now));

        let stale = CachedToken {
            expires_at: now.timestamp() - 1,
            ..fresh
        };
        assert!(stale.is_expired(now));
    }

    #[test]
    fn refresh_response_keeps_the_previous_refresh_token() {
        let now = Utc::now();
        let value = json!({
            "access_token": "new-access",
            "expires_in": 3600,
            "scope": SPOTIFY_SCOPE,
        });
        let token = CachedToken::from_response(&value, Some("old-refresh"), now).unwrap();
        assert_eq!(token.access_token, "new-access");
        assert_eq!(token.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(token.expires_at, now.timestamp() + 3600);
    }

    #[test]
    fn response_without_access_token_is_an_auth_error() {
        let value = json!({ "error": "invalid_grant" });
        assert!(CachedToken::from_response(&value, None, Utc::now()).is_err());
    }

    #[test]
    fn cache_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = spotify_config(dir.path().join(".spotify_cache"));
        let session = SpotifySession::new(&HttpConfig::default(), &cfg).unwrap();

        assert!(session.load_cache().is_none());

        let token = CachedToken {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            scope: SPOTIFY_SCOPE.to_string(),
            expires_at: 1_700_000_000,
        };
        session.store_cache(&token).unwrap();

        let loaded = session.load_cache().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(loaded.expires_at, 1_700_000_000);
    }

    #[test]
    fn corrupt_cache_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = spotify_config(dir.path().join(".spotify_cache"));
        fs::write(&cfg.cache_path, "not json").unwrap();

        let session = SpotifySession::new(&HttpConfig::default(), &cfg).unwrap();
        assert!(session.load_cache().is_none());
    }

    #[test]
    fn authorize_url_carries_the_oauth_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = spotify_config(dir.path().join(".spotify_cache"));
        let session = SpotifySession::new(&HttpConfig::default(), &cfg).unwrap();

        let url = session.authorize_url();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "client-id".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://127.0.0.1:8000/callback".to_string()
        )));
        assert!(pairs.contains(&("scope".to_string(), SPOTIFY_SCOPE.to_string())));
    }

    #[test]
    fn code_extraction_from_pasted_redirects() {
        let code =
            extract_code("http://127.0.0.1:8000/callback?code=AQD-abc123&state=xyz").unwrap();
        assert_eq!(code, "AQD-abc123");

        assert!(extract_code("http://127.0.0.1:8000/callback?error=access_denied").is_err());
        assert!(extract_code("not a url").is_err());
    }
}
