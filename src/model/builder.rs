//! Incremental construction of the crag tree
//!
//! Ascents arrive one route at a time from the scraper (or one row at a time
//! from the dataset store). The builder creates boulders and routes on first
//! encounter and appends ascents to the matching route.

use crate::model::{Ascent, Boulder, Crag, Discipline, Grade, Route, RouteId};
use chrono::Utc;
use std::collections::HashMap;

/// Progress sink for tree construction
///
/// Called synchronously from the pipeline, so implementations must return
/// quickly and must not block on I/O.
pub trait Progress {
    /// Called once with the number of boulders expected.
    fn begin(&mut self, _total: usize) {}

    /// Called after each boulder is fully processed.
    fn advance(&mut self, _completed: usize, _total: usize) {}

    /// Called once the tree is complete.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl Progress for NullProgress {}

/// How a route is recognised when it is seen again
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RouteKey {
    /// The route's own page on the site
    Url(String),
    /// Boulder position, route name and grade
    Label(usize, String, Grade),
}

/// Folds (boulder, route, grade, ascent) tuples into a [`Crag`]
pub struct CragBuilder<'p> {
    crag: Crag,
    boulder_index: HashMap<String, usize>,
    route_index: HashMap<RouteKey, RouteId>,
    completed: usize,
    total: usize,
    progress: &'p mut dyn Progress,
}

impl<'p> CragBuilder<'p> {
    /// Starts an empty tree that expects `total_boulders` boulders
    pub fn new(
        name: impl Into<String>,
        discipline: Discipline,
        total_boulders: usize,
        progress: &'p mut dyn Progress,
    ) -> Self {
        progress.begin(total_boulders);

        Self {
            crag: Crag {
                name: name.into(),
                discipline,
                boulders: Vec::new(),
                built_at: Utc::now(),
            },
            boulder_index: HashMap::new(),
            route_index: HashMap::new(),
            completed: 0,
            total: total_boulders,
            progress,
        }
    }

    /// Returns the boulder's position, creating it on first encounter
    pub fn ensure_boulder(&mut self, boulder: &str) -> usize {
        if let Some(&idx) = self.boulder_index.get(boulder) {
            return idx;
        }

        let idx = self.crag.boulders.len();
        self.crag.boulders.push(Boulder {
            name: boulder.to_string(),
            routes: Vec::new(),
        });
        self.boulder_index.insert(boulder.to_string(), idx);
        idx
    }

    /// Returns the route's id, creating the boulder and route on first encounter
    ///
    /// Routes without a page URL are told apart by name and grade, so two
    /// "Project"s of different grades on one boulder stay separate.
    pub fn ensure_route(&mut self, boulder: &str, route: &str, grade: &Grade) -> RouteId {
        let b = self.ensure_boulder(boulder);
        let key = RouteKey::Label(b, route.to_string(), grade.clone());
        self.lookup_or_create(key, b, route, grade, None)
    }

    /// Like [`ensure_route`](Self::ensure_route), but identifies the route by its page URL
    pub fn ensure_linked_route(&mut self, boulder: &str, route: &str, grade: &Grade, url: &str) -> RouteId {
        let b = self.ensure_boulder(boulder);
        self.lookup_or_create(RouteKey::Url(url.to_string()), b, route, grade, Some(url))
    }

    /// Returns the id of the route with this page URL, if it was already added
    pub fn linked_route(&self, url: &str) -> Option<RouteId> {
        self.route_index.get(&RouteKey::Url(url.to_string())).copied()
    }

    fn lookup_or_create(
        &mut self,
        key: RouteKey,
        b: usize,
        route: &str,
        grade: &Grade,
        url: Option<&str>,
    ) -> RouteId {
        if let Some(&id) = self.route_index.get(&key) {
            return id;
        }

        let routes = &mut self.crag.boulders[b].routes;
        let id = RouteId {
            boulder: b,
            route: routes.len(),
        };
        routes.push(Route {
            name: route.to_string(),
            grade: grade.clone(),
            url: url.map(str::to_string),
            rating: None,
            reported_ascents: None,
            ascents: Vec::new(),
        });
        self.route_index.insert(key, id);
        id
    }

    /// Records what the sector page says about a route
    pub fn annotate_route(&mut self, id: RouteId, rating: Option<f32>, reported_ascents: Option<u32>) {
        if let Some(route) = self
            .crag
            .boulders
            .get_mut(id.boulder)
            .and_then(|b| b.routes.get_mut(id.route))
        {
            route.rating = rating;
            route.reported_ascents = reported_ascents;
        }
    }

    /// Appends one ascent to its route
    pub fn insert(&mut self, boulder: &str, route: &str, grade: &Grade, ascent: Ascent) -> RouteId {
        let id = self.ensure_route(boulder, route, grade);
        self.push_ascent(id, ascent);
        id
    }

    /// Appends one ascent to a route created earlier by this builder
    pub fn push_ascent(&mut self, id: RouteId, ascent: Ascent) {
        if let Some(route) = self
            .crag
            .boulders
            .get_mut(id.boulder)
            .and_then(|b| b.routes.get_mut(id.route))
        {
            route.ascents.push(ascent);
        }
    }

    /// Marks the current boulder as fully processed and reports progress
    pub fn complete_boulder(&mut self) {
        self.completed += 1;
        self.total = self.total.max(self.completed);
        self.progress.advance(self.completed, self.total);
    }

    /// Finishes construction and stamps the build time
    pub fn finish(mut self) -> Crag {
        self.crag.built_at = Utc::now();
        self.progress.finish();
        self.crag
    }
}
