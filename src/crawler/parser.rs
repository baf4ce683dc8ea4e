//! HTML parser for the crag, sector and route pages
//!
//! This module turns fetched pages into structured data:
//! - Sector links from the crag route list
//! - Route rows (name, link, grade, reported ascent total, rating) from a sector page
//! - Ascent entries from a route page or overflow fragment
//! - The login form's CSRF token and the logged-in markers
//! - Activity feed items from the crag page
//!
//! Malformed entries are skipped with a warning; a page never fails as a whole.

use crate::model::{Ascent, AscentType, Grade, DATE_FORMAT};
use chrono::{Duration, NaiveDate};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Why a single ascent entry was discarded
#[derive(Debug, Error)]
pub enum RecordParseError {
    #[error("entry has no ascent type (to-do list item)")]
    NotAnAscent,

    #[error("entry has no {0}")]
    MissingField(&'static str),

    #[error("invalid date {value:?}: {source}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("unknown ascent type {0:?}")]
    UnknownAscentType(String),
}

/// A sector (boulder) entry from the crag route list
#[derive(Debug, Clone, PartialEq)]
pub struct SectorLink {
    pub name: String,
    pub url: Url,
}

/// A route row from a sector page
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLink {
    pub name: String,
    pub url: Url,
    pub grade: Grade,
    /// Ascent total the site displays for the route
    pub reported_ascents: Option<u32>,
    pub rating: Option<f32>,
}

/// Ascent entries parsed from one page or fragment
#[derive(Debug, Default)]
pub struct ParsedAscents {
    pub ascents: Vec<Ascent>,
    /// Entries that were not logged climbs or could not be read
    pub skipped: Vec<RecordParseError>,
}

impl ParsedAscents {
    /// Appends another page's entries after this one's
    pub fn extend(&mut self, other: ParsedAscents) {
        self.ascents.extend(other.ascents);
        self.skipped.extend(other.skipped);
    }
}

/// A parsed route page
#[derive(Debug)]
pub struct RoutePage {
    pub entries: ParsedAscents,
    /// Present when the visible listing is truncated
    pub overflow_url: Option<Url>,
}

/// An item from the activity feed on the crag page
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub climber: Option<String>,
    pub description: String,
    /// Age label as shown, e.g. "3 hours ago"
    pub ago_label: String,
    /// Age read from the label; `None` if the label is not understood
    pub age: Option<Duration>,
}

impl FeedItem {
    /// True for new ticks and new routes, the items that change the dataset
    pub fn changes_dataset(&self) -> bool {
        let title = self.title.to_lowercase();
        title.contains("tick list") || title.contains("new route")
    }

    /// One-line summary for logs and run records
    pub fn describe(&self) -> String {
        let line = format!(
            "{} {} {}",
            self.climber.as_deref().unwrap_or("Unknown"),
            self.title,
            self.ago_label
        );
        if self.description.is_empty() {
            line
        } else {
            format!("{} - {}", line, self.description)
        }
    }
}

#[derive(Deserialize)]
struct OverflowPayload {
    ticks: String,
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn first_in<'a>(element: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    element.select(&sel).next()
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Extracts the CSRF token from the login page
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let sel = selector(r#"meta[name="csrf-token"]"#)?;

    document
        .select(&sel)
        .next()
        .and_then(|meta| meta.value().attr("content"))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Returns true if the page shows a logged-in session
pub fn is_logged_in(html: &str) -> bool {
    let document = Html::parse_document(html);

    ["body.user-logged", "div.user-menu", r#"a[href="/logout"]"#]
        .iter()
        .filter_map(|css| selector(css))
        .any(|sel| document.select(&sel).next().is_some())
}

/// Extracts the sector links from the crag route list
///
/// The first `a.sector-item` is the combined "all routes" list and is skipped.
pub fn parse_sector_list(html: &str, base_url: &Url) -> Vec<SectorLink> {
    let document = Html::parse_document(html);
    let Some(sel) = selector("a.sector-item") else {
        return Vec::new();
    };

    let mut sectors = Vec::new();
    for element in document.select(&sel).skip(1) {
        let name = first_in(element, "div.name").map(text_of);
        let href = element.value().attr("href");

        match (name, href) {
            (Some(name), Some(href)) if !name.is_empty() => match base_url.join(href) {
                Ok(url) => sectors.push(SectorLink { name, url }),
                Err(e) => tracing::warn!("Skipping sector {:?} with bad link {:?}: {}", name, href, e),
            },
            _ => tracing::warn!("Skipping sector entry without a name or link"),
        }
    }

    sectors
}

/// Extracts the route rows from a sector page
pub fn parse_route_table(html: &str, base_url: &Url) -> Vec<RouteLink> {
    let document = Html::parse_document(html);
    let Some(row_sel) = selector("tbody tr") else {
        return Vec::new();
    };
    let Some(td_sel) = selector("td") else {
        return Vec::new();
    };

    let mut routes = Vec::new();
    for row in document.select(&row_sel) {
        let Some(anchor) = first_in(row, "a[href]") else {
            tracing::warn!("Skipping route row without a link");
            continue;
        };
        let name = text_of(anchor);
        let href = anchor.value().attr("href").unwrap_or_default();

        let url = match base_url.join(href) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Skipping route {:?} with bad link {:?}: {}", name, href, e);
                continue;
            }
        };

        let grade = match first_in(row, "span.grade").map(text_of) {
            Some(label) if !label.is_empty() => Grade::new(label),
            _ => {
                tracing::warn!("Skipping route {:?} without a grade", name);
                continue;
            }
        };

        let reported_ascents = row
            .select(&td_sel)
            .nth(3)
            .map(text_of)
            .and_then(|count| count.parse::<u32>().ok());

        let rating = first_in(row, "div.rating")
            .map(text_of)
            .and_then(|rating| rating.parse::<f32>().ok());

        routes.push(RouteLink {
            name,
            url,
            grade,
            reported_ascents,
            rating,
        });
    }

    routes
}

/// Parses one ascent entry
fn parse_entry(entry: ElementRef<'_>) -> Result<Ascent, RecordParseError> {
    // To-do items share the row layout but carry no ascent type
    let raw_type = first_in(entry, "span.ascent-type")
        .map(text_of)
        .ok_or(RecordParseError::NotAnAscent)?;

    let climber = first_in(entry, "a.action")
        .map(text_of)
        .filter(|name| !name.is_empty())
        .ok_or(RecordParseError::MissingField("climber"))?;

    let ascent_type = AscentType::from_db_string(&raw_type)
        .ok_or(RecordParseError::UnknownAscentType(raw_type))?;

    let date_div = first_in(entry, "div.date").ok_or(RecordParseError::MissingField("date"))?;
    let date_text = date_div
        .children()
        .filter_map(ElementRef::wrap)
        .last()
        .map(text_of)
        .unwrap_or_else(|| text_of(date_div));
    let date = NaiveDate::parse_from_str(&date_text, DATE_FORMAT).map_err(|source| {
        RecordParseError::InvalidDate {
            value: date_text.clone(),
            source,
        }
    })?;

    Ok(Ascent::new(climber, date, ascent_type))
}

/// Extracts every ascent entry (`div.result-row`) from a page or fragment
pub fn parse_ascent_entries(html: &str) -> ParsedAscents {
    let fragment = Html::parse_fragment(html);
    collect_entries(&fragment)
}

fn collect_entries(document: &Html) -> ParsedAscents {
    let mut parsed = ParsedAscents::default();
    let Some(sel) = selector("div.result-row") else {
        return parsed;
    };

    for entry in document.select(&sel) {
        match parse_entry(entry) {
            Ok(ascent) => parsed.ascents.push(ascent),
            Err(RecordParseError::NotAnAscent) => {
                tracing::debug!("Skipping to-do entry");
                parsed.skipped.push(RecordParseError::NotAnAscent);
            }
            Err(e) => {
                tracing::warn!("Skipping ascent entry: {}", e);
                parsed.skipped.push(e);
            }
        }
    }

    parsed
}

/// Parses a route page: its visible ascents and the overflow link, if any
pub fn parse_route_page(html: &str, page_url: &Url) -> RoutePage {
    let document = Html::parse_document(html);
    let entries = collect_entries(&document);

    let overflow_url = selector("div.js-more.ticks a[href]")
        .and_then(|sel| document.select(&sel).next())
        .and_then(|anchor| anchor.value().attr("href"))
        .filter(|href| !href.trim().is_empty())
        .and_then(|href| match page_url.join(href) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("Ignoring bad overflow link {:?}: {}", href, e);
                None
            }
        });

    RoutePage {
        entries,
        overflow_url,
    }
}

/// Extracts the HTML fragment from an overflow JSON payload
pub fn parse_overflow_payload(json: &str) -> Result<String, serde_json::Error> {
    serde_json::from_str::<OverflowPayload>(json).map(|payload| payload.ticks)
}

/// Reads a relative age label such as "5 minutes ago" or "an hour ago"
///
/// Only minutes, hours and days are understood.
pub fn parse_age(label: &str) -> Option<Duration> {
    let mut words = label.split_whitespace();
    let count = match words.next()? {
        "a" | "an" => 1,
        n => i64::from(n.parse::<u32>().ok()?),
    };

    match words.next()?.trim_end_matches('s') {
        "minute" => Duration::try_minutes(count),
        "hour" => Duration::try_hours(count),
        "day" => Duration::try_days(count),
        _ => None,
    }
}

/// Extracts the activity feed items (`li.item`) from the crag page
///
/// Items without an age link are skipped.
pub fn parse_feed(html: &str) -> Vec<FeedItem> {
    let document = Html::parse_document(html);
    let Some(sel) = selector("li.item") else {
        return Vec::new();
    };

    let mut items = Vec::new();
    for item in document.select(&sel) {
        let Some(ago_label) = first_in(item, "a.ago").map(text_of) else {
            tracing::debug!("Skipping feed item without a timestamp");
            continue;
        };

        let age = parse_age(&ago_label);
        if age.is_none() {
            tracing::warn!("Unreadable feed timestamp {:?}", ago_label);
        }

        items.push(FeedItem {
            title: first_in(item, "div.title").map(text_of).unwrap_or_default(),
            climber: first_in(item, "a.climber-name")
                .map(text_of)
                .filter(|name| !name.is_empty()),
            description: first_in(item, "div.description").map(text_of).unwrap_or_default(),
            ago_label,
            age,
        });
    }

    items
}
