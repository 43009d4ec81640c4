use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::warn;

use super::tiering::{ScoredProgram, Tier, TierPartition};
use crate::workflows::catalog::domain::{ProgramId, ProgramRecord, YesNo};
use crate::workflows::catalog::schema::{Column, SchemaCapabilities};
use crate::workflows::catalog::taxonomy::CategoryTaxonomy;

/// Criterion keys understood by the cascading filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKey {
    CompetitionIntensity,
    CompetitionRising,
    CompetitionRisePct,
    EntryScore70Declining,
    EntryScore70DiffPct,
    EntryScore50DiffPct,
    FillRate,
    FillRateAverage3y,
    NewlyEstablished,
}

impl CriterionKey {
    pub fn parse(key: &str) -> Option<Self> {
        let key = match key.trim() {
            "competition_intensity" | "2024년_경쟁강도" => Self::CompetitionIntensity,
            "competition_rising" | "2024년_경쟁률상승여부" => Self::CompetitionRising,
            "competition_rise_pct" | "2024년_경쟁률상승정도(%)" => Self::CompetitionRisePct,
            "entry_score_70_declining" | "2024년_입결70%하락여부" => Self::EntryScore70Declining,
            "entry_score_70_diff_pct" | "2024년_입결70%차이(%)" => Self::EntryScore70DiffPct,
            "entry_score_50_diff_pct" | "2024년_입결50%차이(%)" => Self::EntryScore50DiffPct,
            "fill_rate" | "2024년_충원율(%)" | "2024년_충원률(%)" => Self::FillRate,
            "fill_rate_average_3y" | "3개년_충원율_평균" | "3개년_평균_충원률" => {
                Self::FillRateAverage3y
            }
            "newly_established" | "신설" => Self::NewlyEstablished,
            _ => return None,
        };
        Some(key)
    }

    const fn is_flag(self) -> bool {
        matches!(
            self,
            Self::CompetitionRising | Self::EntryScore70Declining | Self::NewlyEstablished
        )
    }
}

/// Values applied when a criterion is not supplied.
const DEFAULT_CRITERIA: [(CriterionKey, CriterionValue); 5] = [
    (CriterionKey::EntryScore50DiffPct, CriterionValue::Number(0.0)),
    (CriterionKey::EntryScore70DiffPct, CriterionValue::Number(0.0)),
    (CriterionKey::CompetitionRising, CriterionValue::Flag(YesNo::No)),
    (CriterionKey::EntryScore70Declining, CriterionValue::Flag(YesNo::No)),
    (CriterionKey::NewlyEstablished, CriterionValue::Flag(YesNo::No)),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CriterionValue {
    Number(f64),
    Flag(YesNo),
}

/// Criterion value as supplied by a caller, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCriterionValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Normalized criteria: booleans and strings become [`YesNo`], defaults are
/// filled in and unrecognized keys are set aside.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, RawCriterionValue>",
    into = "BTreeMap<CriterionKey, CriterionValue>"
)]
pub struct FilterCriteria {
    values: BTreeMap<CriterionKey, CriterionValue>,
    ignored: Vec<String>,
}

impl FilterCriteria {
    pub fn normalize<K: AsRef<str>>(raw: impl IntoIterator<Item = (K, RawCriterionValue)>) -> Self {
        let mut values = BTreeMap::new();
        let mut ignored = Vec::new();

        for (key, value) in raw {
            let key = key.as_ref();
            let Some(criterion) = CriterionKey::parse(key) else {
                ignored.push(key.to_string());
                continue;
            };
            match normalize_value(criterion, &value) {
                Some(normalized) => {
                    values.insert(criterion, normalized);
                }
                None => {
                    warn!(criterion = key, ?value, "ignoring criterion with unusable value");
                    ignored.push(key.to_string());
                }
            }
        }

        for (key, value) in DEFAULT_CRITERIA {
            values.entry(key).or_insert(value);
        }

        Self { values, ignored }
    }

    pub fn with_number(mut self, key: CriterionKey, value: f64) -> Self {
        self.values.insert(key, CriterionValue::Number(value));
        self
    }

    pub fn with_flag(mut self, key: CriterionKey, value: YesNo) -> Self {
        self.values.insert(key, CriterionValue::Flag(value));
        self
    }

    pub fn get(&self, key: CriterionKey) -> Option<CriterionValue> {
        self.values.get(&key).copied()
    }

    /// Numeric criterion, `0` when unset.
    pub fn number(&self, key: CriterionKey) -> f64 {
        match self.get(key) {
            Some(CriterionValue::Number(value)) => value,
            _ => 0.0,
        }
    }

    /// Flag criterion, `NO` when unset.
    pub fn flag(&self, key: CriterionKey) -> YesNo {
        match self.get(key) {
            Some(CriterionValue::Flag(value)) => value,
            _ => YesNo::No,
        }
    }

    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }
}

impl<K: AsRef<str>> From<BTreeMap<K, RawCriterionValue>> for FilterCriteria {
    fn from(raw: BTreeMap<K, RawCriterionValue>) -> Self {
        Self::normalize(raw)
    }
}

impl From<FilterCriteria> for BTreeMap<CriterionKey, CriterionValue> {
    fn from(criteria: FilterCriteria) -> Self {
        criteria.values
    }
}

fn normalize_value(key: CriterionKey, value: &RawCriterionValue) -> Option<CriterionValue> {
    if key.is_flag() {
        let flag = match value {
            RawCriterionValue::Bool(flag) => YesNo::from(*flag),
            RawCriterionValue::Number(number) => YesNo::from(*number != 0.0),
            RawCriterionValue::Text(text) => YesNo::parse(text)?,
        };
        Some(CriterionValue::Flag(flag))
    } else {
        let number = match value {
            RawCriterionValue::Number(number) => *number,
            RawCriterionValue::Text(text) => text.trim().trim_end_matches('%').parse().ok()?,
            RawCriterionValue::Bool(_) => return None,
        };
        number.is_finite().then_some(CriterionValue::Number(number))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("{filter} filter requires column '{column}', which the catalog does not provide")]
    MissingColumn { filter: &'static str, column: Column },
}

/// Inputs shared by every filter in one cascade.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    pub capabilities: &'a SchemaCapabilities,
    /// Student's unadjusted score; the decline filter compares against it.
    pub student_score: f64,
    pub adjusted_score: f64,
}

/// Predicate filters that narrow a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaFilter {
    CompetitionStrength,
    EntryScoreDecline,
    FillRate,
}

impl CriteriaFilter {
    pub const fn name(self) -> &'static str {
        match self {
            Self::CompetitionStrength => "competition strength",
            Self::EntryScoreDecline => "entry score decline",
            Self::FillRate => "fill rate",
        }
    }

    pub const fn required_columns(self) -> &'static [Column] {
        match self {
            Self::CompetitionStrength => &[
                Column::CompetitionIntensity,
                Column::CompetitionRising,
                Column::CompetitionRisePct,
            ],
            Self::EntryScoreDecline => &[
                Column::EntryScore70,
                Column::EntryScore70Average3y,
                Column::EntryScore70Declining,
                Column::EntryScore70DiffPct,
            ],
            Self::FillRate => &[Column::FillRate2024, Column::FillRateAverage3y],
        }
    }

    pub fn check(self, capabilities: &SchemaCapabilities) -> Result<(), FilterError> {
        match capabilities.first_missing(self.required_columns()) {
            Some(column) => Err(FilterError::MissingColumn {
                filter: self.name(),
                column,
            }),
            None => Ok(()),
        }
    }

    /// Keep the programs satisfying this filter. A structurally missing
    /// column yields an error instead of an empty match.
    pub fn apply(
        self,
        programs: &[ScoredProgram],
        criteria: &FilterCriteria,
        context: &FilterContext<'_>,
    ) -> Result<Vec<ScoredProgram>, FilterError> {
        self.check(context.capabilities)?;
        Ok(programs
            .iter()
            .filter(|program| self.keeps(&program.record, criteria, context))
            .cloned()
            .collect())
    }

    fn keeps(
        self,
        record: &ProgramRecord,
        criteria: &FilterCriteria,
        context: &FilterContext<'_>,
    ) -> bool {
        match self {
            Self::CompetitionStrength => {
                let max_intensity = criteria.number(CriterionKey::CompetitionIntensity);
                let expected = criteria.flag(CriterionKey::CompetitionRising);
                let min_rise = criteria.number(CriterionKey::CompetitionRisePct);
                record.competition.intensity.is_some_and(|value| value < max_intensity)
                    && record.competition.rising == Some(expected)
                    && record.competition.rise_pct.is_some_and(|value| value >= min_rise)
            }
            Self::EntryScoreDecline => {
                let expected = criteria.flag(CriterionKey::EntryScore70Declining);
                let min_diff = criteria.number(CriterionKey::EntryScore70DiffPct);
                let score = context.student_score;
                record.entry.p70.latest().is_some_and(|value| value > score)
                    && record.entry.p70_average_3y.is_some_and(|value| value > score)
                    && record.entry.p70_declining == Some(expected)
                    && record.entry.p70_diff_pct.is_some_and(|value| value >= min_diff)
            }
            Self::FillRate => {
                let min_rate = criteria.number(CriterionKey::FillRate);
                let min_average = criteria.number(CriterionKey::FillRateAverage3y);
                record.fill.rate.latest().is_some_and(|value| value >= min_rate)
                    && record.fill.average_3y.is_some_and(|value| value >= min_average)
            }
        }
    }
}

impl fmt::Display for CriteriaFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Single-threshold options keyed by source column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdOption {
    /// Keep percentile `<` threshold.
    CompetitionPercentile,
    /// Keep change `<` threshold.
    EntryScore70ChangePct,
    /// Keep change `>` threshold.
    CompetitionChangePct,
    /// Keep rate `>` threshold.
    FillRate,
    /// Keep average `>` threshold.
    FillRateAverage3y,
    /// Keep average `>` adjusted score × threshold.
    EntryScore70Average3y,
}

impl ThresholdOption {
    pub fn parse(key: &str) -> Option<Self> {
        let option = match key.trim() {
            "competition_percentile" | "2024년_경쟁률백분위" => Self::CompetitionPercentile,
            "entry_score_70_change_pct" | "2024년_입결70%변동(%)" => Self::EntryScore70ChangePct,
            "competition_change_pct" | "2024년_경쟁률변동(%)" => Self::CompetitionChangePct,
            "fill_rate" | "2024년_충원율(%)" | "2024년_충원률(%)" => Self::FillRate,
            "fill_rate_average_3y" | "3개년_충원율_평균" | "3개년_평균_충원률" => {
                Self::FillRateAverage3y
            }
            "entry_score_70_average_3y" | "3개년_입결70%_평균" => Self::EntryScore70Average3y,
            _ => return None,
        };
        Some(option)
    }

    pub const fn column(self) -> Column {
        match self {
            Self::CompetitionPercentile => Column::CompetitionPercentile,
            Self::EntryScore70ChangePct => Column::EntryScore70ChangePct,
            Self::CompetitionChangePct => Column::CompetitionChangePct,
            Self::FillRate => Column::FillRate2024,
            Self::FillRateAverage3y => Column::FillRateAverage3y,
            Self::EntryScore70Average3y => Column::EntryScore70Average3y,
        }
    }

    fn keeps(self, record: &ProgramRecord, threshold: f64, adjusted_score: f64) -> bool {
        match self {
            Self::CompetitionPercentile => {
                record.competition.percentile.is_some_and(|v| v < threshold)
            }
            Self::EntryScore70ChangePct => {
                record.entry.p70_change_pct.is_some_and(|v| v < threshold)
            }
            Self::CompetitionChangePct => {
                record.competition.change_pct.is_some_and(|v| v > threshold)
            }
            Self::FillRate => record.fill.rate.latest().is_some_and(|v| v > threshold),
            Self::FillRateAverage3y => record.fill.average_3y.is_some_and(|v| v > threshold),
            Self::EntryScore70Average3y => record
                .entry
                .p70_average_3y
                .is_some_and(|v| v > adjusted_score * threshold),
        }
    }
}

/// Ordered threshold options; unrecognized keys have no effect.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdOptions(pub Vec<(String, f64)>);

impl ThresholdOptions {
    pub fn apply(
        &self,
        programs: &[ScoredProgram],
        context: &FilterContext<'_>,
    ) -> Result<Vec<ScoredProgram>, FilterError> {
        let mut kept = programs.to_vec();
        for (key, threshold) in &self.0 {
            let Some(option) = ThresholdOption::parse(key) else {
                continue;
            };
            if !context.capabilities.has(option.column()) {
                return Err(FilterError::MissingColumn {
                    filter: "threshold option",
                    column: option.column(),
                });
            }
            kept.retain(|program| {
                option.keeps(&program.record, *threshold, context.adjusted_score)
            });
        }
        Ok(kept)
    }
}

/// Unit-name filter applied ahead of the criteria.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "keywords", rename_all = "snake_case")]
pub enum MajorFilter {
    #[default]
    Any,
    /// Units whose name contains one of the keywords.
    Keywords(Vec<String>),
    /// Units whose name contains any detail category in the same mid
    /// category as a detail matching one of the keywords.
    Related(Vec<String>),
}

impl MajorFilter {
    pub fn apply(
        &self,
        programs: &[ScoredProgram],
        taxonomy: &CategoryTaxonomy,
    ) -> Vec<ScoredProgram> {
        let (keywords, related) = match self {
            MajorFilter::Any => return programs.to_vec(),
            MajorFilter::Keywords(keywords) => (keywords, false),
            MajorFilter::Related(keywords) => (keywords, true),
        };
        let keywords: Vec<&str> = keywords
            .iter()
            .map(|keyword| keyword.trim())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        if keywords.is_empty() {
            return programs.to_vec();
        }
        let needles: Vec<&str> = if related {
            taxonomy.related_details(&keywords).into_iter().collect()
        } else {
            keywords
        };
        programs
            .iter()
            .filter(|program| {
                needles
                    .iter()
                    .any(|needle| program.record.unit.contains(needle))
            })
            .cloned()
            .collect()
    }
}

/// Criteria for each tier; the reach, match and safe tiers are tuned separately.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TierCriteria {
    #[serde(default)]
    pub reach: FilterCriteria,
    #[serde(default, rename = "match")]
    pub matched: FilterCriteria,
    #[serde(default)]
    pub safe: FilterCriteria,
}

impl TierCriteria {
    pub fn uniform(criteria: FilterCriteria) -> Self {
        Self {
            reach: criteria.clone(),
            matched: criteria.clone(),
            safe: criteria,
        }
    }

    pub fn for_tier(&self, tier: Tier) -> &FilterCriteria {
        match tier {
            Tier::Reach => &self.reach,
            Tier::Match => &self.matched,
            Tier::Safe => &self.safe,
        }
    }
}

/// Everything the second screening stage needs besides the tiers themselves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CascadePlan {
    #[serde(default)]
    pub major: MajorFilter,
    #[serde(default)]
    pub filters: Vec<CriteriaFilter>,
    #[serde(default)]
    pub criteria: TierCriteria,
    #[serde(default)]
    pub thresholds: ThresholdOptions,
    /// Re-admit newly established programs the criteria dropped.
    #[serde(default)]
    pub include_newly_established: bool,
}

/// Structural filter failure reported alongside the narrowed tiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterWarning {
    pub filter: String,
    pub tiers: Vec<Tier>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeOutcome {
    pub partition: TierPartition,
    pub warnings: Vec<FilterWarning>,
}

/// Run the plan over every tier. Each step only narrows; a filter that
/// cannot run empties the tier and is reported as a warning.
pub fn run_cascade(
    partition: &TierPartition,
    plan: &CascadePlan,
    capabilities: &SchemaCapabilities,
    taxonomy: &CategoryTaxonomy,
) -> CascadeOutcome {
    let context = FilterContext {
        capabilities,
        student_score: partition.thresholds.raw,
        adjusted_score: partition.thresholds.adjusted,
    };
    let mut failures: BTreeMap<String, (String, Vec<Tier>)> = BTreeMap::new();

    let narrowed = partition.map_tiers(|tier, programs| {
        let criteria = plan.criteria.for_tier(tier);
        let mut current = plan.major.apply(programs, taxonomy);

        for filter in &plan.filters {
            match filter.apply(&current, criteria, &context) {
                Ok(kept) => current = kept,
                Err(error) => {
                    record_failure(&mut failures, filter.name(), &error, tier);
                    current = Vec::new();
                }
            }
        }

        match plan.thresholds.apply(&current, &context) {
            Ok(kept) => current = kept,
            Err(error) => {
                record_failure(&mut failures, "threshold option", &error, tier);
                current = Vec::new();
            }
        }

        if plan.include_newly_established {
            current = readmit_newly_established(programs, &current);
        }
        current
    });

    let warnings: Vec<FilterWarning> = failures
        .into_iter()
        .map(|(filter, (message, tiers))| FilterWarning {
            filter,
            tiers,
            message,
        })
        .collect();

    for warning in &warnings {
        warn!(
            filter = %warning.filter,
            message = %warning.message,
            "criteria filter could not run"
        );
    }

    CascadeOutcome {
        partition: narrowed,
        warnings,
    }
}

fn record_failure(
    failures: &mut BTreeMap<String, (String, Vec<Tier>)>,
    filter: &str,
    error: &FilterError,
    tier: Tier,
) {
    let entry = failures
        .entry(filter.to_string())
        .or_insert_with(|| (error.to_string(), Vec::new()));
    if !entry.1.contains(&tier) {
        entry.1.push(tier);
    }
}

/// Programs of `tier` that survived filtering or are newly established,
/// in the tier's original order.
fn readmit_newly_established(
    tier: &[ScoredProgram],
    filtered: &[ScoredProgram],
) -> Vec<ScoredProgram> {
    let kept: HashSet<ProgramId> = filtered.iter().map(|program| program.record.id).collect();
    tier.iter()
        .filter(|program| {
            kept.contains(&program.record.id)
                || program.record.eligibility.newly_established == Some(YesNo::Yes)
        })
        .cloned()
        .collect()
}
