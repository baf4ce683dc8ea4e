//! Flattened ascent rows exchanged with the dataset store

use crate::model::{Ascent, AscentType, Crag, CragBuilder, Discipline, Grade, Progress};
use crate::CragError;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Date format used for persisted rows
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One ascent with its full path in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AscentRow {
    pub boulder: String,
    pub route: String,
    pub grade: Grade,
    /// Page of the route, when known
    pub route_url: Option<String>,
    pub climber: String,
    pub date: NaiveDate,
    pub ascent_type: AscentType,
}

/// A row as read back from storage, before any field is trusted
#[derive(Debug, Clone, Default)]
pub struct RawAscentRow {
    pub boulder: Option<String>,
    pub route: Option<String>,
    pub grade: Option<String>,
    pub route_url: Option<String>,
    pub climber: Option<String>,
    pub date: Option<String>,
    pub ascent_type: Option<String>,
}

impl RawAscentRow {
    /// Validates every field; a missing or unreadable field is a consistency error
    pub fn into_row(self, index: usize) -> Result<AscentRow, CragError> {
        let required = |value: Option<String>, field: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    CragError::DataConsistency(format!("row {} is missing {}", index, field))
                })
        };

        let boulder = required(self.boulder, "boulder")?;
        let route = required(self.route, "route")?;
        let grade = Grade::new(required(self.grade, "grade")?);
        let climber = required(self.climber, "climber")?;

        let date_str = required(self.date, "date")?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
            CragError::DataConsistency(format!("row {} has invalid date '{}': {}", index, date_str, e))
        })?;

        let type_str = required(self.ascent_type, "ascent type")?;
        let ascent_type = AscentType::from_db_string(&type_str).ok_or_else(|| {
            CragError::DataConsistency(format!(
                "row {} has unknown ascent type '{}'",
                index, type_str
            ))
        })?;

        let route_url = self
            .route_url
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(AscentRow {
            boulder,
            route,
            grade,
            route_url,
            climber,
            date,
            ascent_type,
        })
    }
}

impl Crag {
    /// Flattens the tree into rows, in tree order
    pub fn to_rows(&self) -> Vec<AscentRow> {
        self.ascents()
            .map(|view| AscentRow {
                boulder: view.boulder.name.clone(),
                route: view.route.name.clone(),
                grade: view.route.grade.clone(),
                route_url: view.route.url.clone(),
                climber: view.ascent.climber.clone(),
                date: view.ascent.date,
                ascent_type: view.ascent.ascent_type,
            })
            .collect()
    }

    /// Rebuilds a tree from persisted rows
    ///
    /// Boulders keep the order in which they first appear in `rows`; progress
    /// advances once per boulder.
    pub fn from_rows(
        name: impl Into<String>,
        discipline: Discipline,
        rows: Vec<AscentRow>,
        progress: &mut dyn Progress,
    ) -> Crag {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<AscentRow>> = HashMap::new();

        for row in rows {
            if !groups.contains_key(&row.boulder) {
                order.push(row.boulder.clone());
            }
            groups.entry(row.boulder.clone()).or_default().push(row);
        }

        let mut builder = CragBuilder::new(name, discipline, order.len(), progress);

        for boulder in order {
            for row in groups.remove(&boulder).unwrap_or_default() {
                let id = match &row.route_url {
                    Some(url) => builder.ensure_linked_route(&row.boulder, &row.route, &row.grade, url),
                    None => builder.ensure_route(&row.boulder, &row.route, &row.grade),
                };
                builder.push_ascent(id, Ascent::new(row.climber, row.date, row.ascent_type));
            }
            builder.complete_boulder();
        }

        builder.finish()
    }
}
