//!
//! src/playlist.rs
//!
//! Creates the playlist and adds the matched tracks in bounded
//! batches, accepting partial failure once creation has succeeded
//!

use tracing::{error, info, warn};

use crate::catalog::CatalogApi;
use crate::errors::PipelineError;
use crate::types::TitleMatch;

/// Documented per-call limit of the add-items endpoint.
pub const BATCH_LIMIT: usize = 100;

pub struct PlaylistBuilder<'a> {
    api: &'a dyn CatalogApi,
}

impl<'a> PlaylistBuilder<'a> {
    pub fn new(api: &'a dyn CatalogApi) -> Self {
        Self { api }
    }

    /// Create a public playlist and add every matched track from
    /// `results`, in order, in batches of at most [`BATCH_LIMIT`].
    ///
    /// `None` signals creation failure only. Once the playlist
    /// exists its id is always returned: a failed batch is logged
    /// with its index and skipped, and later batches are still
    /// attempted. An all-absent input yields an empty playlist
    /// without touching the add-items endpoint.
    pub async fn create_and_populate(
        &self,
        results: &[TitleMatch],
        name: &str,
        description: &str,
    ) -> Option<String> {
        let playlist_id = match self.create(name, description).await {
            Ok(id) => id,
            Err(e) => {
                error!(name, error = %e, "playlist.create.failed");
                return None;
            }
        };
        info!(id = %playlist_id, name, "playlist.created");

        let uris: Vec<String> = results
            .iter()
            .filter_map(|result| result.matched.as_ref())
            .map(|hit| hit.uri.clone())
            .collect();

        if uris.is_empty() {
            warn!(id = %playlist_id, "playlist.no_valid_tracks");
            return Some(playlist_id);
        }

        for (index, batch) in uris.chunks(BATCH_LIMIT).enumerate() {
            if let Err(e) = self.api.playlist_add_items(&playlist_id, batch).await {
                warn!(batch = index + 1, error = %e, "playlist.add.failed");
            }
        }

        info!(
            id = %playlist_id,
            requested = uris.len(),
            url = %format!("https://open.spotify.com/playlist/{playlist_id}"),
            "playlist.done",
        );
        Some(playlist_id)
    }

    async fn create(&self, name: &str, description: &str) -> Result<String, PipelineError> {
        let user_id = self.api.current_user_id().await?;
        let playlist = self
            .api
            .playlist_create(&user_id, name, true, description)
            .await?;
        playlist
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| PipelineError::Parse("playlist response missing id".to_string()))
    }
}
