//! Crawler module for scraping a crag's ascent log
//!
//! This module contains the scraping side of the pipeline:
//! - HTTP fetching with throttling and retry logic
//! - Login to the remote site
//! - HTML parsing of sector, route and overflow listings
//! - Update detection from the crag's activity feed
//! - Overall scrape coordination

mod auth;
mod coordinator;
mod fetcher;
mod parser;
mod throttle;
mod updates;

pub use auth::login;
pub use coordinator::{Coordinator, CountMismatch, FailedPage, ScrapeOutcome, ScrapeReport};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher};
pub use parser::{
    extract_csrf_token, is_logged_in, parse_age, parse_ascent_entries, parse_feed,
    parse_overflow_payload, parse_route_page, parse_route_table, parse_sector_list, FeedItem,
    ParsedAscents, RecordParseError, RouteLink, RoutePage, SectorLink,
};
pub use throttle::Throttle;
pub use updates::{updates_since, UpdateCheck};
