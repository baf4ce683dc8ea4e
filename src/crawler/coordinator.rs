//! Scrape coordinator - main scrape orchestration logic
//!
//! Walks the crag one request at a time: route list → sector pages → route
//! pages (plus overflow listings), folding every parsed ascent into the crag
//! tree as it goes. Per-sector and per-route failures are recorded in the
//! [`ScrapeReport`] and the walk continues; an authentication failure or a
//! failed route list aborts the scrape. The coordinator can also read the
//! crag's activity feed to decide whether a scrape is needed at all.

use crate::config::{Config, Credentials};
use crate::crawler::auth::login;
use crate::crawler::fetcher::{build_http_client, FetchError, Fetcher};
use crate::crawler::parser::{
    parse_ascent_entries, parse_feed, parse_route_page, parse_route_table, parse_sector_list,
    ParsedAscents, RouteLink, SectorLink,
};
use crate::crawler::updates::{updates_since, UpdateCheck};
use crate::model::{Crag, CragBuilder, Discipline, Progress};
use crate::CragError;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use url::Url;

/// A page that could not be fetched
#[derive(Debug, Clone, PartialEq)]
pub struct FailedPage {
    /// Sector or route name
    pub name: String,
    pub url: String,
    pub reason: String,
}

impl FailedPage {
    fn new(name: &str, error: &FetchError) -> Self {
        Self {
            name: name.to_string(),
            url: error.url().to_string(),
            reason: error.to_string(),
        }
    }
}

/// A route whose parsed ascent count differs from the total the site shows
#[derive(Debug, Clone, PartialEq)]
pub struct CountMismatch {
    pub boulder: String,
    pub route: String,
    pub reported: u32,
    pub parsed: usize,
}

/// What happened during one scrape
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub boulders_seen: usize,
    pub routes_seen: usize,
    pub ascents_parsed: usize,
    /// To-do items and malformed entries
    pub entries_skipped: usize,
    pub boulder_failures: Vec<FailedPage>,
    pub route_failures: Vec<FailedPage>,
    pub mismatches: Vec<CountMismatch>,
    /// Requests sent, retries included
    pub requests: u64,
    pub duration: Duration,
}

impl ScrapeReport {
    /// Returns true if every page was fetched and every count reconciled
    pub fn is_complete(&self) -> bool {
        self.boulder_failures.is_empty() && self.route_failures.is_empty() && self.mismatches.is_empty()
    }
}

/// A freshly built crag and the report of how it was built
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub crag: Crag,
    pub report: ScrapeReport,
}

/// Main scrape coordinator structure
pub struct Coordinator {
    fetcher: Fetcher,
    crag_url: Url,
    crag_name: String,
    discipline: Discipline,
}

impl Coordinator {
    /// Creates a coordinator for the crag at `crag_url`
    pub fn new(fetcher: Fetcher, crag_url: &str, discipline: Discipline) -> Result<Self, CragError> {
        // Relative links on the route list resolve against the crag directory
        let mut normalized = crag_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let crag_url = Url::parse(&normalized)?;

        let crag_name = crag_url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .unwrap_or("crag")
            .to_string();

        Ok(Self {
            fetcher,
            crag_url,
            crag_name,
            discipline,
        })
    }

    /// Creates a coordinator with a fresh session from the configuration
    pub fn from_config(config: &Config) -> Result<Self, CragError> {
        let client = build_http_client(&config.user_agent).map_err(|source| {
            FetchError::Network {
                url: config.source.crag_url.clone(),
                source,
            }
        })?;
        let fetcher = Fetcher::new(client, &config.crawler);
        Self::new(fetcher, &config.source.crag_url, config.scoring.discipline)
    }

    pub fn crag_name(&self) -> &str {
        &self.crag_name
    }

    /// Authenticates this coordinator's session
    pub async fn login(&mut self, login_url: &str, credentials: &Credentials) -> Result<(), CragError> {
        let login_url = Url::parse(login_url)?;
        login(&mut self.fetcher, &login_url, credentials).await
    }

    /// Reads the crag page's activity feed for changes since `last_updated`
    ///
    /// The feed is public, so this works before logging in.
    pub async fn check_for_updates(
        &mut self,
        last_updated: Option<DateTime<Utc>>,
    ) -> Result<UpdateCheck, CragError> {
        tracing::info!("Checking {} for updates", self.crag_url);

        let html = self.fetcher.get_text(&self.crag_url).await?;
        let check = updates_since(parse_feed(&html), last_updated, Utc::now());

        for item in &check.updates {
            tracing::debug!("Update: {}", item.describe());
        }
        tracing::info!(
            "{} of {} feed items are new since the last scrape",
            check.updates.len(),
            check.items_seen
        );

        Ok(check)
    }

    /// Logs in, then scrapes the whole crag
    pub async fn login_and_scrape(
        &mut self,
        login_url: &str,
        credentials: &Credentials,
        progress: &mut dyn Progress,
    ) -> Result<ScrapeOutcome, CragError> {
        self.login(login_url, credentials).await?;
        self.scrape(progress).await
    }

    /// Scrapes the whole crag
    ///
    /// `progress` is advanced once per sector, whether or not the sector page
    /// could be fetched.
    pub async fn scrape(&mut self, progress: &mut dyn Progress) -> Result<ScrapeOutcome, CragError> {
        let started = Instant::now();
        let requests_before = self.fetcher.requests_made();

        let routelist_url = self.crag_url.join("routelist")?;
        tracing::info!("Scraping sector list from {}", routelist_url);

        let html = self.fetcher.get_text(&routelist_url).await?;
        let sectors = parse_sector_list(&html, &self.crag_url);
        if sectors.is_empty() {
            tracing::warn!("No sectors found on {}", routelist_url);
        } else {
            tracing::info!("Found {} sectors", sectors.len());
        }

        let mut report = ScrapeReport::default();
        let mut builder = CragBuilder::new(
            self.crag_name.clone(),
            self.discipline,
            sectors.len(),
            progress,
        );

        for sector in &sectors {
            self.scrape_boulder(&mut builder, sector, &mut report).await?;
            builder.complete_boulder();
        }

        let crag = builder.finish();
        report.requests = self.fetcher.requests_made() - requests_before;
        report.duration = started.elapsed();

        tracing::info!(
            "Scrape completed: {} boulders, {} routes, {} ascents in {:?} ({} route failures)",
            crag.boulders.len(),
            crag.route_count(),
            crag.ascent_count(),
            report.duration,
            report.route_failures.len()
        );

        Ok(ScrapeOutcome { crag, report })
    }

    /// Scrapes one sector page and every route on it
    async fn scrape_boulder(
        &mut self,
        builder: &mut CragBuilder<'_>,
        sector: &SectorLink,
        report: &mut ScrapeReport,
    ) -> Result<(), CragError> {
        report.boulders_seen += 1;
        builder.ensure_boulder(&sector.name);
        tracing::debug!("Scraping sector '{}' from {}", sector.name, sector.url);

        let html = match self.fetcher.get_text(&sector.url).await {
            Ok(html) => html,
            Err(e) if e.is_auth() => return Err(e.into()),
            Err(e) => {
                tracing::warn!("Skipping sector '{}': {}", sector.name, e);
                report.boulder_failures.push(FailedPage::new(&sector.name, &e));
                return Ok(());
            }
        };

        for route in parse_route_table(&html, &sector.url) {
            if builder.linked_route(route.url.as_str()).is_some() {
                tracing::warn!(
                    "Route '{}' ({}) is listed more than once; skipping the repeat",
                    route.name,
                    route.url
                );
                continue;
            }
            report.routes_seen += 1;

            let entries = match self.fetch_route(&route).await {
                Ok(entries) => entries,
                Err(e) if e.is_auth() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("Skipping route '{}': {}", route.name, e);
                    report.route_failures.push(FailedPage::new(&route.name, &e));
                    continue;
                }
            };

            let id = builder.ensure_linked_route(
                &sector.name,
                &route.name,
                &route.grade,
                route.url.as_str(),
            );
            builder.annotate_route(id, route.rating, route.reported_ascents);

            let parsed = entries.ascents.len();
            report.entries_skipped += entries.skipped.len();
            report.ascents_parsed += parsed;

            if let Some(reported) = route.reported_ascents {
                if reported as usize != parsed {
                    tracing::warn!(
                        "Route '{}' on '{}' shows {} ascents but {} were parsed",
                        route.name,
                        sector.name,
                        reported,
                        parsed
                    );
                    report.mismatches.push(CountMismatch {
                        boulder: sector.name.clone(),
                        route: route.name.clone(),
                        reported,
                        parsed,
                    });
                }
            }

            for ascent in entries.ascents {
                builder.push_ascent(id, ascent);
            }
        }

        Ok(())
    }

    /// Fetches a route's ascent listing, following the overflow link if present
    async fn fetch_route(&mut self, route: &RouteLink) -> Result<ParsedAscents, FetchError> {
        let html = self.fetcher.get_text(&route.url).await?;
        let page = parse_route_page(&html, &route.url);
        let mut entries = page.entries;

        if let Some(overflow_url) = page.overflow_url {
            tracing::debug!("Route '{}' listing is truncated, fetching {}", route.name, overflow_url);
            let fragment = self.fetcher.get_overflow_html(&overflow_url).await?;
            entries.extend(parse_ascent_entries(&fragment));
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, UserAgentConfig};

    fn test_fetcher() -> Fetcher {
        let client = build_http_client(&UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        })
        .unwrap();
        let crawler = CrawlerConfig {
            min_request_interval: 10,
            max_retries: 1,
            retry_delay: 10,
            pipeline_retry_delay: 10,
        };
        Fetcher::new(client, &crawler)
    }

    #[test]
    fn test_crag_url_gets_trailing_slash() {
        let coordinator = Coordinator::new(
            test_fetcher(),
            "https://example.com/crags/inia-droushia",
            Discipline::Bouldering,
        )
        .unwrap();

        assert_eq!(coordinator.crag_url.as_str(), "https://example.com/crags/inia-droushia/");
        assert_eq!(coordinator.crag_name(), "inia-droushia");
        assert_eq!(
            coordinator.crag_url.join("routelist").unwrap().as_str(),
            "https://example.com/crags/inia-droushia/routelist"
        );
    }

    #[test]
    fn test_invalid_crag_url() {
        let result = Coordinator::new(test_fetcher(), "not a url", Discipline::Bouldering);
        assert!(matches!(result, Err(CragError::UrlParse(_))));
    }

    #[test]
    fn test_report_completeness() {
        let mut report = ScrapeReport::default();
        assert!(report.is_complete());

        report.mismatches.push(CountMismatch {
            boulder: "North".to_string(),
            route: "Arete".to_string(),
            reported: 12,
            parsed: 10,
        });
        assert!(!report.is_complete());
    }
}
