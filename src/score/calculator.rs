//! Per-ascent scoring and per-climber aggregation
//!
//! Every scoring pass computes one table of [`ScoredAscent`]s. All four
//! leaderboards are reduced from that same table, so an ascent is worth the
//! same on every leaderboard that counts it.

use crate::model::{AscentType, Crag, Grade, RouteId};
use crate::rank::{rank, RankedEntry};
use crate::score::table::{strategy_for, ScoringStrategy, ScoringTable};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// One ascent with its computed score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAscent {
    pub climber: String,
    pub route_id: RouteId,
    pub grade: Grade,
    pub date: NaiveDate,
    pub ascent_type: AscentType,
    /// Points from the grade/type table
    pub points: f64,
    /// Climber's cumulative volume reading as of this ascent
    pub volume: f64,
}

/// Aggregated standing of one climber
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub climber: String,
    pub total_score: f64,
    pub volume_score: f64,
    pub unique_ascents: usize,
    pub grade_scores: BTreeMap<Grade, f64>,
}

/// Which metric a leaderboard ranks by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardKind {
    Total,
    Volume,
    UniqueAscents,
    MasterGrade(Grade),
}

impl fmt::Display for LeaderboardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Total => f.write_str("Total Score"),
            Self::Volume => f.write_str("Volume"),
            Self::UniqueAscents => f.write_str("Unique Ascents"),
            Self::MasterGrade(grade) => write!(f, "Master Grade {}", grade),
        }
    }
}

/// Scores every ascent of a crag with a discipline strategy
pub struct ScoreCalculator<'a> {
    strategy: Box<dyn ScoringStrategy + 'a>,
}

impl<'a> ScoreCalculator<'a> {
    pub fn new(strategy: Box<dyn ScoringStrategy + 'a>) -> Self {
        Self { strategy }
    }

    /// Calculator using the strategy for the crag's discipline
    pub fn for_crag(crag: &Crag, table: &'a ScoringTable) -> Self {
        Self::new(strategy_for(crag.discipline, table))
    }

    /// Computes the shared per-ascent score table, in tree order
    pub fn score_ascents(&self, crag: &Crag) -> Vec<ScoredAscent> {
        let mut unscored: HashSet<&Grade> = HashSet::new();

        let mut entries: Vec<ScoredAscent> = crag
            .ascents()
            .map(|view| {
                let grade = &view.route.grade;
                let points = match self.strategy.ascent_points(grade, view.ascent.ascent_type) {
                    Some(points) => points,
                    None => {
                        if unscored.insert(grade) {
                            tracing::warn!("Grade {} has no base points; scoring it as 0", grade);
                        }
                        0.0
                    }
                };

                ScoredAscent {
                    climber: view.ascent.climber.clone(),
                    route_id: view.route_id,
                    grade: grade.clone(),
                    date: view.ascent.date,
                    ascent_type: view.ascent.ascent_type,
                    points,
                    volume: 0.0,
                }
            })
            .collect();

        // Cumulative volume per climber in chronological order; same-day
        // ascents keep tree order.
        let mut by_climber: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_climber.entry(entry.climber.as_str()).or_default().push(idx);
        }

        let mut readings = vec![0.0; entries.len()];
        for mut indices in by_climber.into_values() {
            indices.sort_by_key(|&idx| entries[idx].date);
            for (n, idx) in indices.into_iter().enumerate() {
                readings[idx] = self.strategy.volume_reading(n + 1);
            }
        }

        for (entry, reading) in entries.iter_mut().zip(readings) {
            entry.volume = reading;
        }

        entries
    }

    /// Runs a full scoring pass
    pub fn calculate(&self, crag: &Crag) -> Scoreboard {
        let scoreboard = Scoreboard::from_entries(self.score_ascents(crag));
        tracing::info!(
            "Scored {} ascents for {} climbers",
            scoreboard.entries().len(),
            scoreboard.records().len()
        );
        scoreboard
    }
}

/// Sums a per-ascent value per climber
fn sum_by_climber<'e>(
    entries: impl Iterator<Item = &'e ScoredAscent>,
    value: impl Fn(&ScoredAscent) -> f64,
) -> BTreeMap<String, f64> {
    let mut sums = BTreeMap::new();
    for entry in entries {
        *sums.entry(entry.climber.clone()).or_insert(0.0) += value(entry);
    }
    sums
}

/// Takes the maximum of a per-ascent value per climber
fn max_by_climber<'e>(
    entries: impl Iterator<Item = &'e ScoredAscent>,
    value: impl Fn(&ScoredAscent) -> f64,
) -> BTreeMap<String, f64> {
    let mut maxima: BTreeMap<String, f64> = BTreeMap::new();
    for entry in entries {
        let v = value(entry);
        maxima
            .entry(entry.climber.clone())
            .and_modify(|m| *m = m.max(v))
            .or_insert(v);
    }
    maxima
}

/// Counts distinct routes per climber
fn distinct_routes_by_climber<'e>(
    entries: impl Iterator<Item = &'e ScoredAscent>,
) -> BTreeMap<String, usize> {
    let mut routes: BTreeMap<String, HashSet<RouteId>> = BTreeMap::new();
    for entry in entries {
        routes
            .entry(entry.climber.clone())
            .or_default()
            .insert(entry.route_id);
    }
    routes
        .into_iter()
        .map(|(climber, set)| (climber, set.len()))
        .collect()
}

/// Climber standings derived from one per-ascent score table
#[derive(Debug, Clone)]
pub struct Scoreboard {
    entries: Vec<ScoredAscent>,
    records: BTreeMap<String, ScoreRecord>,
}

impl Scoreboard {
    /// Reduces a per-ascent score table into climber records
    pub fn from_entries(entries: Vec<ScoredAscent>) -> Self {
        let totals = sum_by_climber(entries.iter(), |e| e.points);
        let volumes = max_by_climber(entries.iter(), |e| e.volume);
        let uniques = distinct_routes_by_climber(entries.iter());

        let mut grade_scores: BTreeMap<String, BTreeMap<Grade, f64>> = BTreeMap::new();
        for entry in &entries {
            *grade_scores
                .entry(entry.climber.clone())
                .or_default()
                .entry(entry.grade.clone())
                .or_insert(0.0) += entry.points;
        }

        let records = totals
            .into_iter()
            .map(|(climber, total_score)| {
                let record = ScoreRecord {
                    total_score,
                    volume_score: volumes.get(&climber).copied().unwrap_or(0.0),
                    unique_ascents: uniques.get(&climber).copied().unwrap_or(0),
                    grade_scores: grade_scores.remove(&climber).unwrap_or_default(),
                    climber: climber.clone(),
                };
                (climber, record)
            })
            .collect();

        Self { entries, records }
    }

    pub fn entries(&self) -> &[ScoredAscent] {
        &self.entries
    }

    pub fn records(&self) -> &BTreeMap<String, ScoreRecord> {
        &self.records
    }

    pub fn record(&self, climber: &str) -> Option<&ScoreRecord> {
        self.records.get(climber)
    }

    pub fn total_scores(&self) -> BTreeMap<String, f64> {
        self.metric(|r| r.total_score)
    }

    pub fn volume_scores(&self) -> BTreeMap<String, f64> {
        self.metric(|r| r.volume_score)
    }

    pub fn unique_ascents(&self) -> BTreeMap<String, usize> {
        self.records
            .iter()
            .map(|(climber, r)| (climber.clone(), r.unique_ascents))
            .collect()
    }

    /// Total score counting only ascents of routes graded exactly `grade`
    ///
    /// Climbers with no ascent at that grade are absent.
    pub fn master_grade(&self, grade: &Grade) -> BTreeMap<String, f64> {
        sum_by_climber(
            self.entries.iter().filter(|e| e.grade == *grade),
            |e| e.points,
        )
    }

    /// Ranked leaderboard for one metric
    pub fn leaderboard(&self, kind: &LeaderboardKind) -> Vec<RankedEntry<f64>> {
        match kind {
            LeaderboardKind::Total => rank(&self.total_scores()),
            LeaderboardKind::Volume => rank(&self.volume_scores()),
            LeaderboardKind::UniqueAscents => rank(
                &self
                    .unique_ascents()
                    .into_iter()
                    .map(|(c, n)| (c, n as f64))
                    .collect::<BTreeMap<_, _>>(),
            ),
            LeaderboardKind::MasterGrade(grade) => rank(&self.master_grade(grade)),
        }
    }

    fn metric(&self, value: impl Fn(&ScoreRecord) -> f64) -> BTreeMap<String, f64> {
        self.records
            .iter()
            .map(|(climber, r)| (climber.clone(), value(r)))
            .collect()
    }
}
