//! Domain types persisted by the colony inspector.
//!
//! `Totals` serializes straight into the fields of the `statistics`
//! document, and each `Metric` names one `time-series-data` document.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A stored document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, serde_json::Value>;

// ── Metrics ────────────────────────────────────────────────────────

/// A counter tracked by the crawler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    ColonyCount,
    TaskCount,
    DomainCount,
    SkillCount,
}

impl Metric {
    /// Every tracked metric, in commit order.
    pub const ALL: [Metric; 4] = [
        Metric::ColonyCount,
        Metric::TaskCount,
        Metric::DomainCount,
        Metric::SkillCount,
    ];

    /// Persisted name: statistics field and time-series document name.
    pub fn name(self) -> &'static str {
        match self {
            Metric::ColonyCount => "total-colony-count",
            Metric::TaskCount => "total-task-count",
            Metric::DomainCount => "total-domain-count",
            Metric::SkillCount => "total-skill-count",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Metric::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Totals ─────────────────────────────────────────────────────────

/// Latest value of every tracked metric.
///
/// Fields missing from a stored document read back as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Totals {
    #[serde(rename = "total-colony-count")]
    pub colony_count: u64,
    #[serde(rename = "total-skill-count")]
    pub skill_count: u64,
    #[serde(rename = "total-domain-count")]
    pub domain_count: u64,
    #[serde(rename = "total-task-count")]
    pub task_count: u64,
}

impl Totals {
    /// Value produced for a metric.
    pub fn get(&self, metric: Metric) -> u64 {
        match metric {
            Metric::ColonyCount => self.colony_count,
            Metric::TaskCount => self.task_count,
            Metric::DomainCount => self.domain_count,
            Metric::SkillCount => self.skill_count,
        }
    }

    /// Field updates for the `statistics` document.
    pub fn to_fields(&self) -> Document {
        Metric::ALL
            .into_iter()
            .map(|m| (m.name().to_string(), self.get(m).into()))
            .collect()
    }
}

// ── Date keys ──────────────────────────────────────────────────────

/// A calendar day, persisted as `MMDDYY`.
///
/// Comparison is by date, so `today < last` detects a clock that moved
/// backwards even though the string form does not sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// strftime pattern of the persisted form.
    pub const FORMAT: &'static str = "%m%d%y";

    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

/// Error returned when a string is not a valid `MMDDYY` date.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date key {0:?}: expected MMDDYY")]
pub struct ParseDateKeyError(pub String);

impl FromStr for DateKey {
    type Err = ParseDateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseDateKeyError(s.to_string()));
        }
        NaiveDate::parse_from_str(s, Self::FORMAT)
            .map(Self)
            .map_err(|_| ParseDateKeyError(s.to_string()))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
