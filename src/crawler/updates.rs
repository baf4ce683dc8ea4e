//! Update check against the crag's activity feed
//!
//! The crag page lists recent activity with relative ages ("3 hours ago").
//! New ticks and new routes posted after the last stored scrape mean the
//! dataset is stale.

use crate::crawler::parser::FeedItem;
use chrono::{DateTime, Utc};

/// Result of reading the feed
#[derive(Debug, Clone, Default)]
pub struct UpdateCheck {
    /// Feed items with a timestamp
    pub items_seen: usize,
    /// New ticks and routes posted since the last scrape, in feed order
    pub updates: Vec<FeedItem>,
}

impl UpdateCheck {
    pub fn has_updates(&self) -> bool {
        !self.updates.is_empty()
    }

    /// Why a scrape is warranted, for the run record
    pub fn reason(&self) -> String {
        let shown: Vec<String> = self.updates.iter().take(3).map(FeedItem::describe).collect();
        let mut reason = format!("{} new routes or ascents detected: {}", self.updates.len(), shown.join("; "));
        if self.updates.len() > shown.len() {
            reason.push_str("; ...");
        }
        reason
    }
}

/// Keeps the dataset-changing items posted after `last_updated`
///
/// Without a previous scrape every dataset-changing item counts. Items whose
/// age could not be read are ignored.
pub fn updates_since(
    items: Vec<FeedItem>,
    last_updated: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> UpdateCheck {
    let items_seen = items.len();
    let since_scrape = last_updated.map(|t| now - t);

    let updates = items
        .into_iter()
        .filter(FeedItem::changes_dataset)
        .filter(|item| match (item.age, since_scrape) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(age), Some(elapsed)) => age < elapsed,
        })
        .collect();

    UpdateCheck { items_seen, updates }
}
