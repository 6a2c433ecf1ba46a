//!
//! src/config.rs
//!
//! Env-driven configuration for the chart scraper, the Spotify
//! session and API clients, and logging
//!

use serde::Deserialize;
use std::path::PathBuf;
use std::time;
use url::Url;

use crate::errors::PipelineError;

/// Chart page defaults
pub const CHART_BASE_URL: &str = "https://www.billboard.com/charts/hot-100/";
pub const CHART_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:131.0) Gecko/20100101 Firefox/131.0";
pub const CHART_TIMEOUT_MS: u64 = 10_000;

/// Spotify endpoint and OAuth defaults
pub const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1/";
pub const SPOTIFY_SCOPE: &str = "user-read-private playlist-modify-public";
pub const SPOTIFY_REDIRECT_URI: &str = "http://127.0.0.1:8000/callback";
pub const SPOTIFY_CACHE_PATH: &str = ".spotify_cache";

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

/// Wrapper over env::var to return an invalid environment var error
fn env_check(s: &str) -> Result<String, PipelineError> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PipelineError::Config(format!("{s} was not set"))),
    }
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(format!(
            "Unexpected host for {url} (got {h}, expected {expected_host})"
        )),
        None => Err(format!("URL missing host: {url}")),
    }
}

fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

/// Configuration for the chart page fetch
#[derive(Debug, Clone)]
pub struct ChartConfig {
    pub base_url: Url,
    pub user_agent: String,
    pub timeout: time::Duration,
}

fn build_chart() -> Result<ChartConfig, PipelineError> {
    let base_url = std::env::var("CHART_BASE_URL")
        .unwrap_or_else(|_| CHART_BASE_URL.to_string());

    let mut base_url = Url::parse(&base_url)
        .map_err(|e| PipelineError::Config(format!("CHART_BASE_URL invalid: {e}")))?;

    ensure_https(&base_url).map_err(PipelineError::Config)?;
    ensure_trailing_slash(&mut base_url);

    let user_agent = std::env::var("CHART_USER_AGENT")
        .unwrap_or_else(|_| CHART_USER_AGENT.to_string());

    Ok(ChartConfig {
        base_url,
        user_agent,
        timeout: time::Duration::from_millis(CHART_TIMEOUT_MS),
    })
}

/// Configuration Spotify expects for the OAuth exchange and when
/// hitting endpoints
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub token_url: Url,
    pub auth_url: Url,
    pub api_base: Url,
    pub cache_path: PathBuf,
}

fn build_spotify() -> Result<SpotifyConfig, PipelineError> {
    let client_id     = env_check("SPOTIFY_CLIENT_ID")?;
    let client_secret = env_check("SPOTIFY_CLIENT_SECRET")?;

    let redirect_uri = std::env::var("SPOTIFY_REDIRECT_URI")
        .unwrap_or_else(|_| SPOTIFY_REDIRECT_URI.to_string());

    // form urls
    let token_url = std::env::var("SPOTIFY_TOKEN_URL")
        .unwrap_or_else(|_| SPOTIFY_TOKEN_URL.to_string());
    let auth_url = std::env::var("SPOTIFY_AUTH_URL")
        .unwrap_or_else(|_| SPOTIFY_AUTH_URL.to_string());
    let api_base = std::env::var("SPOTIFY_API_BASE")
        .unwrap_or_else(|_| SPOTIFY_API_BASE.to_string());

    let token_url = Url::parse(&token_url)
        .map_err(|_| PipelineError::Config("SPOTIFY_TOKEN_URL invalid".to_string()))?;
    let auth_url = Url::parse(&auth_url)
        .map_err(|_| PipelineError::Config("SPOTIFY_AUTH_URL invalid".to_string()))?;
    let mut api_base = Url::parse(&api_base)
        .map_err(|_| PipelineError::Config("SPOTIFY_API_BASE invalid".to_string()))?;

    // ensure valid https and hostname for all three urls
    ensure_https(&token_url).map_err(PipelineError::Config)?;
    ensure_https(&auth_url).map_err(PipelineError::Config)?;
    ensure_https(&api_base).map_err(PipelineError::Config)?;
    ensure_host(&token_url, "accounts.spotify.com").map_err(PipelineError::Config)?;
    ensure_host(&auth_url, "accounts.spotify.com").map_err(PipelineError::Config)?;
    ensure_host(&api_base, "api.spotify.com").map_err(PipelineError::Config)?;

    ensure_trailing_slash(&mut api_base);

    let cache_path = std::env::var("SPOTIFY_CACHE_PATH")
        .unwrap_or_else(|_| SPOTIFY_CACHE_PATH.to_string());

    Ok(SpotifyConfig {
        client_id,
        client_secret,
        redirect_uri,
        scope: SPOTIFY_SCOPE.to_string(),
        token_url,
        auth_url,
        api_base,
        cache_path: PathBuf::from(cache_path),
    })
}

///
/// Configuration for Http timeouts, pooling, etc.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

///
/// Configuration for Logger
///
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,hot100_playlist=debug,reqwest=warn".to_string(),
            include_file_line: false,
            include_target: true,
        }
    }
}

///
/// AppConfig which holds everything the pipeline components need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub chart: ChartConfig,
    pub spotify: SpotifyConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, PipelineError> {
    dotenvy::dotenv().ok();

    let chart   = build_chart()?;
    let spotify = build_spotify()?;
    let http    = HttpConfig::default();
    let logging = LoggingConfig::default();

    Ok(AppConfig { chart, spotify, http, logging })
}
