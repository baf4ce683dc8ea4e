//! Domain model for a crag's ascent log
//!
//! The model is a strict containment tree: a [`Crag`] owns its [`Boulder`]s,
//! each boulder owns its [`Route`]s and each route owns its [`Ascent`]s.
//! Nothing is shared between branches, so a route is identified by its
//! position in the tree ([`RouteId`]).
//!
//! # Components
//!
//! - `Crag`, `Boulder`, `Route`, `Ascent`: the tree itself
//! - `Grade`: opaque difficulty label, only ever compared as a string
//! - `AscentType`: fixed enumeration of logged ascent styles
//! - `CragBuilder`: incremental construction with progress reporting
//! - `AscentRow`: the flattened form exchanged with the dataset store

mod builder;
mod rows;

pub use builder::{CragBuilder, NullProgress, Progress};
pub use rows::{AscentRow, RawAscentRow, DATE_FORMAT};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Route difficulty label
///
/// Grades are labels, not numbers: "5" and "5.0" are different grades and a
/// grade is never converted to a numeric type. Labels are trimmed and
/// upper-cased on construction so "6a" and "6A" name the same grade.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Grade(String);

impl Grade {
    pub fn new(label: impl AsRef<str>) -> Self {
        Self(label.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Grade {
    fn from(label: String) -> Self {
        Self::new(label)
    }
}

impl From<&str> for Grade {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<Grade> for String {
    fn from(grade: Grade) -> Self {
        grade.0
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Style in which an ascent was logged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AscentType {
    Onsight,
    Flash,
    Redpoint,
    TopRope,
    Repeat,
}

impl AscentType {
    pub const ALL: [AscentType; 5] = [
        Self::Onsight,
        Self::Flash,
        Self::Redpoint,
        Self::TopRope,
        Self::Repeat,
    ];

    /// Converts the ascent type to its stored string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Onsight => "onsight",
            Self::Flash => "flash",
            Self::Redpoint => "redpoint",
            Self::TopRope => "toprope",
            Self::Repeat => "repeat",
        }
    }

    /// Parses a label as shown on the site or as stored ("Red point", "redpoint")
    pub fn from_db_string(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        Self::ALL
            .into_iter()
            .find(|t| t.to_db_string() == normalized)
    }
}

impl fmt::Display for AscentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Climbing discipline of a crag; selects the scoring strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    #[default]
    Bouldering,
}

/// One logged climb of a route. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ascent {
    pub climber: String,
    pub date: NaiveDate,
    pub ascent_type: AscentType,
}

impl Ascent {
    pub fn new(climber: impl Into<String>, date: NaiveDate, ascent_type: AscentType) -> Self {
        Self {
            climber: climber.into(),
            date,
            ascent_type,
        }
    }
}

/// A single climbable line with a fixed grade
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub grade: Grade,
    /// The route's page, when scraped; tells apart routes that share a name
    pub url: Option<String>,
    /// Star rating shown on the sector page, when scraped
    pub rating: Option<f32>,
    /// Ascent total the site displays for this route, when scraped
    pub reported_ascents: Option<u32>,
    pub ascents: Vec<Ascent>,
}

/// A sector or rock feature within a crag
#[derive(Debug, Clone)]
pub struct Boulder {
    pub name: String,
    pub routes: Vec<Route>,
}

/// Position of a route in the crag tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteId {
    pub boulder: usize,
    pub route: usize,
}

/// An ascent together with its place in the tree
#[derive(Debug, Clone, Copy)]
pub struct AscentView<'a> {
    pub route_id: RouteId,
    pub boulder: &'a Boulder,
    pub route: &'a Route,
    pub ascent: &'a Ascent,
}

/// Top-level climbing area
#[derive(Debug, Clone)]
pub struct Crag {
    pub name: String,
    pub discipline: Discipline,
    pub boulders: Vec<Boulder>,
    /// When this tree was assembled
    pub built_at: DateTime<Utc>,
}

impl Crag {
    /// Iterates over every ascent in tree order
    pub fn ascents(&self) -> impl Iterator<Item = AscentView<'_>> {
        self.boulders.iter().enumerate().flat_map(|(b, boulder)| {
            boulder.routes.iter().enumerate().flat_map(move |(r, route)| {
                route.ascents.iter().map(move |ascent| AscentView {
                    route_id: RouteId {
                        boulder: b,
                        route: r,
                    },
                    boulder,
                    route,
                    ascent,
                })
            })
        })
    }

    pub fn route(&self, id: RouteId) -> Option<&Route> {
        self.boulders.get(id.boulder)?.routes.get(id.route)
    }

    pub fn route_count(&self) -> usize {
        self.boulders.iter().map(|b| b.routes.len()).sum()
    }

    pub fn ascent_count(&self) -> usize {
        self.boulders
            .iter()
            .flat_map(|b| &b.routes)
            .map(|r| r.ascents.len())
            .sum()
    }

    /// Distinct grades of all routes in the crag
    pub fn grades(&self) -> Vec<Grade> {
        self.boulders
            .iter()
            .flat_map(|b| &b.routes)
            .map(|r| r.grade.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_grade_is_normalized_string() {
        assert_eq!(Grade::new(" 6a "), Grade::new("6A"));
        assert_eq!(Grade::new("5").as_str(), "5");
        assert_ne!(Grade::new("5"), Grade::new("5.0"));
        assert_ne!(Grade::new("5"), Grade::new("05"));
    }

    #[test]
    fn test_ascent_type_roundtrip() {
        for t in AscentType::ALL {
            assert_eq!(AscentType::from_db_string(t.to_db_string()), Some(t));
        }
    }

    #[test]
    fn test_ascent_type_site_labels() {
        assert_eq!(AscentType::from_db_string("Red point"), Some(AscentType::Redpoint));
        assert_eq!(AscentType::from_db_string("Top rope"), Some(AscentType::TopRope));
        assert_eq!(AscentType::from_db_string("FLASH"), Some(AscentType::Flash));
        assert_eq!(AscentType::from_db_string("project"), None);
    }

    #[test]
    fn test_tree_queries() {
        let crag = Crag {
            name: "test".to_string(),
            discipline: Discipline::Bouldering,
            built_at: Utc::now(),
            boulders: vec![
                Boulder {
                    name: "North".to_string(),
                    routes: vec![Route {
                        name: "Arete".to_string(),
                        grade: Grade::new("6B"),
                        url: None,
                        rating: None,
                        reported_ascents: None,
                        ascents: vec![
                            Ascent::new("alice", date("2024-01-02"), AscentType::Flash),
                            Ascent::new("bob", date("2024-01-03"), AscentType::Redpoint),
                        ],
                    }],
                },
                Boulder {
                    name: "South".to_string(),
                    routes: vec![
                        Route {
                            name: "Crack".to_string(),
                            grade: Grade::new("5"),
                            url: None,
                            rating: None,
                            reported_ascents: None,
                            ascents: vec![Ascent::new("alice", date("2024-02-01"), AscentType::Onsight)],
                        },
                        Route {
                            name: "Slab".to_string(),
                            grade: Grade::new("6B"),
                            url: None,
                            rating: None,
                            reported_ascents: None,
                            ascents: vec![],
                        },
                    ],
                },
            ],
        };

        assert_eq!(crag.route_count(), 3);
        assert_eq!(crag.ascent_count(), 3);
        assert_eq!(crag.grades(), vec![Grade::new("5"), Grade::new("6B")]);

        let ids: Vec<RouteId> = crag.ascents().map(|a| a.route_id).collect();
        assert_eq!(
            ids,
            vec![
                RouteId { boulder: 0, route: 0 },
                RouteId { boulder: 0, route: 0 },
                RouteId { boulder: 1, route: 0 },
            ]
        );
        assert_eq!(crag.route(RouteId { boulder: 1, route: 1 }).unwrap().name, "Slab");
        assert!(crag.route(RouteId { boulder: 2, route: 0 }).is_none());
    }
}
