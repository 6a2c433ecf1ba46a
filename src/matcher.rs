//!
//! src/matcher.rs
//!
//! Resolves scraped titles against the catalog search endpoint,
//! collapsing every failure mode to "no match"
//!

use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::CatalogApi;
use crate::types::TrackMatch;

pub struct CatalogMatcher<'a> {
    api: &'a dyn CatalogApi,
}

impl<'a> CatalogMatcher<'a> {
    pub fn new(api: &'a dyn CatalogApi) -> Self {
        Self { api }
    }

    /// Search for a track by title, optionally narrowed by an artist
    /// hint. Zero hits and capability failures both come back as
    /// `None`; the caller only ever branches on matched vs not.
    pub async fn search(&self, title: &str, artist: Option<&str>) -> Option<TrackMatch> {
        let query = build_query(title, artist);
        let results = match self.api.search_track(&query, 1).await {
            Ok(v) => v,
            Err(e) => {
                warn!(title, error = %e, "search.failed");
                return None;
            }
        };

        match first_item(&results) {
            Some(hit) => Some(hit),
            None => {
                info!(title, "search.miss");
                None
            }
        }
    }
}

fn build_query(title: &str, artist: Option<&str>) -> String {
    match artist {
        Some(artist) => format!("track:{title} artist:{artist}"),
        None => format!("track:{title}"),
    }
}

/// Map the first entry of `tracks.items` to a TrackMatch. Any missing
/// field in the response shape means no usable hit.
fn first_item(results: &Value) -> Option<TrackMatch> {
    let item = results.get("tracks")?.get("items")?.as_array()?.first()?;
    Some(TrackMatch {
        uri: item.get("uri")?.as_str()?.to_string(),
        name: item.get("name")?.as_str()?.to_string(),
        artist: item
            .get("artists")?
            .as_array()?
            .first()?
            .get("name")?
            .as_str()?
            .to_string(),
    })
}
