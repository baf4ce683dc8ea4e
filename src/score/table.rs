use crate::model::{AscentType, Discipline, Grade};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// How a grade's base points and an ascent type's modifier combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combine {
    /// points = base * modifier
    #[default]
    Multiply,
    /// points = base + modifier
    Add,
}

impl Combine {
    /// Modifier that leaves the base points unchanged
    pub fn identity(&self) -> f64 {
        match self {
            Self::Multiply => 1.0,
            Self::Add => 0.0,
        }
    }

    pub fn apply(&self, base: f64, modifier: f64) -> f64 {
        match self {
            Self::Multiply => base * modifier,
            Self::Add => base + modifier,
        }
    }
}

/// Volume bonus parameters
///
/// A climber earns `points-per-increment` for every `bonus-increment`
/// ascents logged so far.
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeBonus {
    #[serde(rename = "bonus-increment")]
    pub bonus_increment: u32,

    #[serde(rename = "points-per-increment")]
    pub points_per_increment: u32,
}

/// Scoring table loaded once per run and treated as read-only
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringTable {
    #[serde(default)]
    pub discipline: Discipline,

    #[serde(default)]
    pub combine: Combine,

    /// Grade label -> base points
    #[serde(rename = "base-points", deserialize_with = "deserialize_base_points")]
    pub base_points: BTreeMap<Grade, u32>,

    /// Ascent type -> modifier; types not listed use the identity modifier
    #[serde(default, deserialize_with = "deserialize_modifiers")]
    pub modifiers: BTreeMap<AscentType, f64>,

    pub volume: VolumeBonus,
}

fn deserialize_base_points<'de, D>(deserializer: D) -> Result<BTreeMap<Grade, u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, u32>::deserialize(deserializer)?;
    collect_unique(raw.into_iter().map(|(label, points)| {
        let grade = Grade::new(&label);
        Ok((label, grade, points))
    }))
}

fn deserialize_modifiers<'de, D>(deserializer: D) -> Result<BTreeMap<AscentType, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, f64>::deserialize(deserializer)?;
    collect_unique(raw.into_iter().map(|(label, modifier)| {
        AscentType::from_db_string(&label)
            .map(|t| (label.clone(), t, modifier))
            .ok_or_else(|| format!("unknown ascent type '{}'", label))
    }))
}

/// Builds a map from normalized keys, rejecting two labels that normalize alike
fn collect_unique<K, V, E>(
    entries: impl Iterator<Item = Result<(String, K, V), String>>,
) -> Result<BTreeMap<K, V>, E>
where
    K: Ord + std::fmt::Display,
    E: serde::de::Error,
{
    let mut map = BTreeMap::new();
    let mut labels: BTreeMap<String, String> = BTreeMap::new();

    for entry in entries {
        let (label, key, value) = entry.map_err(E::custom)?;
        let normalized = key.to_string();
        if let Some(previous) = labels.insert(normalized.clone(), label.clone()) {
            return Err(E::custom(format!(
                "'{}' and '{}' both name {}",
                previous, label, normalized
            )));
        }
        map.insert(key, value);
    }

    Ok(map)
}

impl ScoringTable {
    pub fn base_points(&self, grade: &Grade) -> Option<u32> {
        self.base_points.get(grade).copied()
    }

    pub fn modifier(&self, ascent_type: AscentType) -> f64 {
        self.modifiers
            .get(&ascent_type)
            .copied()
            .unwrap_or_else(|| self.combine.identity())
    }

    /// Orders grades by base points, then by label; unknown grades go last
    pub fn order_grades(&self, mut grades: Vec<Grade>) -> Vec<Grade> {
        grades.sort_by(|a, b| {
            let pa = self.base_points(a).unwrap_or(u32::MAX);
            let pb = self.base_points(b).unwrap_or(u32::MAX);
            pa.cmp(&pb).then_with(|| a.cmp(b))
        });
        grades
    }
}

/// Per-discipline scoring rules
pub trait ScoringStrategy {
    /// Points for one ascent, or `None` if the grade is not scored
    fn ascent_points(&self, grade: &Grade, ascent_type: AscentType) -> Option<f64>;

    /// Volume reading after a climber's `cumulative_ascents`-th ascent
    ///
    /// Must be non-decreasing in `cumulative_ascents`.
    fn volume_reading(&self, cumulative_ascents: usize) -> f64;
}

/// Table-driven scoring for bouldering crags
pub struct BoulderingStrategy<'a> {
    table: &'a ScoringTable,
}

impl<'a> BoulderingStrategy<'a> {
    pub fn new(table: &'a ScoringTable) -> Self {
        Self { table }
    }
}

impl ScoringStrategy for BoulderingStrategy<'_> {
    fn ascent_points(&self, grade: &Grade, ascent_type: AscentType) -> Option<f64> {
        let base = self.table.base_points(grade)? as f64;
        Some(self.table.combine.apply(base, self.table.modifier(ascent_type)))
    }

    fn volume_reading(&self, cumulative_ascents: usize) -> f64 {
        let volume = &self.table.volume;
        let increments = cumulative_ascents / volume.bonus_increment.max(1) as usize;
        (increments as u64 * volume.points_per_increment as u64) as f64
    }
}

/// Selects the scoring strategy for a discipline
pub fn strategy_for<'a>(discipline: Discipline, table: &'a ScoringTable) -> Box<dyn ScoringStrategy + 'a> {
    if discipline != table.discipline {
        tracing::warn!(
            "Scoring table is for {:?} but crag is {:?}; using the crag's discipline",
            table.discipline,
            discipline
        );
    }

    match discipline {
        Discipline::Bouldering => Box::new(BoulderingStrategy::new(table)),
    }
}
