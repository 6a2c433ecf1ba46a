//!
//! src/main.rs
//!
//! Orchestrates the pipeline: scrape the Billboard Hot 100 for a
//! date, match each title against Spotify, build the playlist
//!

mod catalog;
mod config;
mod errors;
mod logging;
mod matcher;
mod playlist;
mod scrape;
mod session;
mod types;

use crate::catalog::{CatalogApi, SpotifyApi};
use crate::config::AppConfig;
use crate::errors::PipelineError;
use crate::matcher::CatalogMatcher;
use crate::playlist::PlaylistBuilder;
use crate::scrape::ChartScraper;
use crate::session::SpotifySession;
use crate::types::{ChartDate, TitleMatch};

const DEFAULT_CHART_DATE: &str = "2016-07-12";

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    let cfgs = config::load_config()?;
    let _guard = logging::init_logging(&cfgs.logging)?;

    tracing::info!(version = %env!("CARGO_PKG_VERSION"), "starting");

    let date = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CHART_DATE.to_string());
    let date = ChartDate::parse(&date)?;

    run(&cfgs, &date).await
}

async fn run(cfgs: &AppConfig, date: &ChartDate) -> Result<(), PipelineError> {
    println!("Fetching Billboard Hot 100 for {date}...");

    let scraper = ChartScraper::new(&cfgs.chart)?;
    let titles = scraper.scrape(date).await;
    if titles.is_empty() {
        println!("No songs found. Check the URL or HTML structure.");
        return Ok(());
    }
    println!("Found {} songs.", titles.len());

    let session = SpotifySession::new(&cfgs.http, &cfgs.spotify)?;
    let bearer = session.establish().await?;
    let api = SpotifyApi::new(&cfgs.http, &cfgs.spotify, bearer)?;

    let results = match_titles(&api, titles).await;
    let matched = results.iter().filter(|r| r.matched.is_some()).count();
    println!(
        "\nSearch complete. Matched {matched} out of {} songs.",
        results.len()
    );

    let builder = PlaylistBuilder::new(&api);
    let name = format!("Billboard Hot 100 - {date}");
    let description = format!("Top songs from Billboard on {date}");
    match builder.create_and_populate(&results, &name, &description).await {
        Some(id) => println!("Playlist ready: https://open.spotify.com/playlist/{id}"),
        None => println!("Playlist creation failed."),
    }
    Ok(())
}

/// Resolve every scraped title in order, pairing each with its
/// search outcome.
async fn match_titles(api: &dyn CatalogApi, titles: Vec<String>) -> Vec<TitleMatch> {
    let matcher = CatalogMatcher::new(api);
    let total = titles.len();
    let mut results = Vec::with_capacity(total);

    for (i, title) in titles.into_iter().enumerate() {
        println!("[{}/{total}] Searching: {title}", i + 1);
        let matched = matcher.search(&title, None).await;
        match &matched {
            Some(hit) => println!("    -> Found: {} by {}", hit.name, hit.artist),
            None => println!("    -> Not found on Spotify."),
        }
        results.push(TitleMatch { title, matched });
    }
    results
}
