//!
//! src/scrape.rs
//!
//! Fetches one Billboard Hot 100 page and extracts the song titles
//! in document order
//!

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::config::ChartConfig;
use crate::errors::PipelineError;
use crate::types::ChartDate;

const ROW_SELECTOR: &str = "div.o-chart-results-list-row-container";
const TITLE_SELECTOR: &str = "h3#title-of-a-story";

pub struct ChartScraper {
    http: Client,
    cfg: ChartConfig,
}

impl ChartScraper {
    pub fn new(cfg: &ChartConfig) -> Result<Self, PipelineError> {
        let http = Client::builder()
            .timeout(cfg.timeout)
            .user_agent(&cfg.user_agent)
            .build()
            .map_err(|e| PipelineError::Http(format!("build client: {e}")))?;
        Ok(Self {
            http,
            cfg: cfg.clone(),
        })
    }

    fn chart_url(&self, date: &ChartDate) -> Result<url::Url, PipelineError> {
        self.cfg
            .base_url
            .join(&format!("{date}/"))
            .map_err(|e| PipelineError::Config(format!("chart url for {date}: {e}")))
    }

    /// Fetch the chart page for `date` and return its titles.
    ///
    /// Every failure mode (bad url, transport error, timeout, non-2xx
    /// status, unreadable body) logs and collapses to an empty vec so
    /// the caller only has to check for zero songs.
    pub async fn scrape(&self, date: &ChartDate) -> Vec<String> {
        let url = match self.chart_url(date) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "chart.url.invalid");
                return Vec::new();
            }
        };

        debug!(url = %url, "chart.fetch");
        let response = match self.http.get(url.clone()).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(url = %url, error = %e, "chart.fetch.failed");
                return Vec::new();
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "chart.fetch.status");
            return Vec::new();
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => {
                warn!(url = %url, error = %e, "chart.fetch.body");
                return Vec::new();
            }
        };

        let titles = parse_titles(&body);
        debug!(count = titles.len(), "chart.parsed");
        titles
    }
}

/// Extract one title per chart-entry container, in document order.
///
/// Internal whitespace and newlines collapse to single spaces. A
/// container with a missing or blank title element still contributes
/// an empty string at its position; blanks are forwarded downstream,
/// not filtered here.
pub fn parse_titles(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let row = Selector::parse(ROW_SELECTOR).unwrap();
    let title = Selector::parse(TITLE_SELECTOR).unwrap();

    document
        .select(&row)
        .map(|container| {
            container
                .select(&title)
                .next()
                .map(|h| {
                    h.text()
                        .collect::<Vec<_>>()
                        .join(" ")
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use url::Url;

    fn chart_page(entries: &[&str]) -> String {
        let rows: String = entries
            .iter()
            .map(|title| {
                format!(
                    "<div class=\"o-chart-results-list-row-container\">\
                     <h3 id=\"title-of-a-story\">{title}</h3></div>"
                )
            })
            .collect();
        format!("<html><body><div class=\"chart\">{rows}</div></body></html>")
    }

    #[test]
    fn titles_come_back_in_document_order() {
        let html = chart_page(&["First Song", "Second Song", "Third Song"]);
        assert_eq!(
            parse_titles(&html),
            vec!["First Song", "Second Song", "Third Song"]
        );
    }

    #[test]
    fn whitespace_and_newlines_collapse() {
        let html = chart_page(&["\n\t  A   Song\n   With \t Spaces  \n"]);
        assert_eq!(parse_titles(&html), vec!["A Song With Spaces"]);
    }

    #[test]
    fn blank_title_elements_are_kept_as_empty_strings() {
        let html = chart_page(&["Song Title 1", "   \n  ", "Final Song Title"]);
        assert_eq!(
            parse_titles(&html),
            vec!["Song Title 1", "", "Final Song Title"]
        );
    }

    #[test]
    fn container_without_title_element_yields_empty_string() {
        let html = "<html><body>\
            <div class=\"o-chart-results-list-row-container\">\
            <h3 id=\"title-of-a-story\">Kept</h3></div>\
            <div class=\"o-chart-results-list-row-container\">\
            <span>no title here</span></div>\
            </body></html>";
        assert_eq!(parse_titles(html), vec!["Kept", ""]);
    }

    #[test]
    fn nested_markup_inside_the_title_is_flattened() {
        let html = "<html><body>\
            <div class=\"o-chart-results-list-row-container\">\
            <h3 id=\"title-of-a-story\">Like a <i>Rolling</i>\nStone</h3></div>\
            </body></html>";
        assert_eq!(parse_titles(html), vec!["Like a Rolling Stone"]);
    }

    #[test]
    fn page_without_chart_rows_parses_to_nothing() {
        assert!(parse_titles("<html><body><p>maintenance</p></body></html>").is_empty());
        assert!(parse_titles("").is_empty());
    }

    #[tokio::test]
    async fn unreachable_host_collapses_to_empty() {
        let cfg = ChartConfig {
            base_url: Url::parse("http://127.0.0.1:9/charts/hot-100/").unwrap(),
            user_agent: "test-agent".to_string(),
            timeout: Duration::from_millis(500),
        };
        let scraper = ChartScraper::new(&cfg).unwrap();
        let date = ChartDate::parse("2016-07-12").unwrap();
        assert!(scraper.scrape(&date).await.is_empty());
    }
}
