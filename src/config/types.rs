//! Configuration types for contribution calculation.
//!
//! This module contains the strongly-typed configuration structures that
//! are deserialized from YAML configuration files.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::models::{PolicyPeriod, PolicyRule};

/// Largest allowed commit chunk.
pub const MAX_CHUNK_SIZE: usize = 5000;

/// Default commit chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_true() -> bool {
    true
}

/// Batch recompute settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchSettings {
    /// Number of result rows per insert (and employee ids per delete).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Whether a category A employee with no usable year average falls back
    /// to their first-month wage.
    #[serde(default = "default_true")]
    pub category_a_first_month_fallback: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            category_a_first_month_fallback: true,
        }
    }
}

impl BatchSettings {
    /// Rejects chunk sizes outside `1..=MAX_CHUNK_SIZE`.
    pub fn validate(&self, source: &str) -> EngineResult<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(EngineError::ConfigParseError {
                path: source.to_string(),
                message: format!(
                    "chunk_size must be between 1 and {MAX_CHUNK_SIZE}, got {}",
                    self.chunk_size
                ),
            });
        }
        Ok(())
    }
}

/// Engine settings from `engine.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// The jurisdiction whose policy rules are configured.
    pub jurisdiction: String,
    /// Batch recompute settings.
    #[serde(default)]
    pub batch: BatchSettings,
}

/// One row of `reference_years.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceYearEntry {
    /// The period the entry applies to.
    pub period: PolicyPeriod,
    /// Candidate average years, most preferred first.
    pub years: Vec<i32>,
}

/// File layout of `reference_years.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceYearsFile {
    /// Years back from the social-security year used when a period has no entry.
    #[serde(default = "ReferenceYearTable::default_offset")]
    pub default_offset: i32,
    /// Per-period overrides.
    #[serde(default)]
    pub periods: Vec<ReferenceYearEntry>,
}

/// Which calendar year(s) a category A employee's reference average comes from.
///
/// Published average-wage data lags the calendar, so for some periods the
/// newest year is not usable yet and an older year stands in. Each period maps
/// to an ordered candidate list; the resolver takes the first year that has
/// salary records.
///
/// # Example
///
/// ```
/// use contribution_engine::config::ReferenceYearTable;
/// use contribution_engine::models::{Half, PolicyPeriod};
///
/// let table = ReferenceYearTable::new(1, vec![(PolicyPeriod::new(2023, Half::H2), vec![2021])]).unwrap();
///
/// // Listed period: the configured substitute year.
/// assert_eq!(table.candidate_years(PolicyPeriod::new(2023, Half::H2)), vec![2021]);
/// // Unlisted period: social-security year minus the default offset.
/// assert_eq!(table.candidate_years(PolicyPeriod::new(2024, Half::H2)), vec![2023]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceYearTable {
    default_offset: i32,
    entries: BTreeMap<PolicyPeriod, Vec<i32>>,
}

impl Default for ReferenceYearTable {
    fn default() -> Self {
        Self {
            default_offset: Self::default_offset(),
            entries: BTreeMap::new(),
        }
    }
}

impl ReferenceYearTable {
    fn default_offset() -> i32 {
        1
    }

    /// Builds a table, rejecting empty candidate lists and repeated periods.
    pub fn new(
        default_offset: i32,
        entries: impl IntoIterator<Item = (PolicyPeriod, Vec<i32>)>,
    ) -> EngineResult<Self> {
        let mut table = BTreeMap::new();
        for (period, years) in entries {
            if years.is_empty() {
                return Err(EngineError::InvalidPeriod {
                    value: period.to_string(),
                    message: "reference year entry lists no years".to_string(),
                });
            }
            if let Some(later) = years.iter().find(|y| **y > period.social_security_year()) {
                return Err(EngineError::InvalidPeriod {
                    value: period.to_string(),
                    message: format!(
                        "reference year {later} is after social-security year {}",
                        period.social_security_year()
                    ),
                });
            }
            if table.insert(period, years).is_some() {
                return Err(EngineError::InvalidPeriod {
                    value: period.to_string(),
                    message: "period listed more than once".to_string(),
                });
            }
        }
        Ok(Self {
            default_offset,
            entries: table,
        })
    }

    /// Builds a table from the parsed file contents.
    pub fn from_file(file: ReferenceYearsFile) -> EngineResult<Self> {
        Self::new(
            file.default_offset,
            file.periods.into_iter().map(|e| (e.period, e.years)),
        )
    }

    /// Candidate years for a period, most preferred first.
    pub fn candidate_years(&self, period: PolicyPeriod) -> Vec<i32> {
        self.entries
            .get(&period)
            .cloned()
            .unwrap_or_else(|| vec![period.social_security_year() - self.default_offset])
    }

    /// Returns true if the period has an explicit entry.
    pub fn has_entry(&self, period: PolicyPeriod) -> bool {
        self.entries.contains_key(&period)
    }
}

/// The complete engine configuration loaded from YAML files.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    settings: EngineSettings,
    reference_years: ReferenceYearTable,
    policies: BTreeMap<PolicyPeriod, PolicyRule>,
}

impl EngineConfig {
    /// Creates a new EngineConfig from its component parts.
    pub fn new(
        settings: EngineSettings,
        reference_years: ReferenceYearTable,
        policies: BTreeMap<PolicyPeriod, PolicyRule>,
    ) -> Self {
        Self {
            settings,
            reference_years,
            policies,
        }
    }

    /// Returns the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Returns the reference year table.
    pub fn reference_years(&self) -> &ReferenceYearTable {
        &self.reference_years
    }

    /// Returns all policy rules keyed by period.
    pub fn policies(&self) -> &BTreeMap<PolicyPeriod, PolicyRule> {
        &self.policies
    }
}
