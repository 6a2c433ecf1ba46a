//!
//! src/types.rs
//!
//! Domain records shared by the scrape, match, and playlist stages
//!

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::PipelineError;

/// Calendar date identifying one weekly chart, kept as the
/// `YYYY-MM-DD` string used in the chart URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartDate(pub String);

impl ChartDate {
    pub fn parse(s: &str) -> Result<Self, PipelineError> {
        chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| PipelineError::Config(format!("invalid chart date {s:?}: {e}")))?;
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for ChartDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A confirmed catalog hit for one scraped title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackMatch {
    pub uri: String,
    pub name: String,
    pub artist: String,
}

/// One scraped title paired with its search outcome. `matched` is
/// `None` when the catalog had no hit; the pairing keeps the
/// title-to-result correspondence structural.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleMatch {
    pub title: String,
    pub matched: Option<TrackMatch>,
}
