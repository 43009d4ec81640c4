use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::tiering::ScoredProgram;
use crate::workflows::catalog::domain::{ProgramRecord, YesNo};

/// Shortlists never exceed this many programs per tier.
pub const SHORTLIST_LIMIT: usize = 10;

/// Institutions in descending order of preference for the final ranking.
pub const PRESTIGE_ORDER: [&str; 30] = [
    "서울대학교",
    "연세대학교",
    "고려대학교",
    "KAIST",
    "POSTECH",
    "서강대학교",
    "성균관대학교",
    "한양대학교",
    "중앙대학교",
    "경희대학교",
    "한국외국어대학교",
    "서울시립대학교",
    "건국대학교",
    "동국대학교",
    "홍익대학교",
    "국민대학교",
    "숭실대학교",
    "세종대학교",
    "단국대학교",
    "DGIST",
    "UNIST",
    "GIST",
    "이화여자대학교",
    "성신여자대학교",
    "숙명여자대학교",
    "광운대학교",
    "명지대학교",
    "상명대학교",
    "가천대학교",
    "가톨릭대학교",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "asc" | "ascending" | "오름차순" => Some(Self::Ascending),
            "desc" | "descending" | "내림차순" => Some(Self::Descending),
            _ => None,
        }
    }
}

/// Numeric columns a shortlist can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMetric {
    QuotaCurrent,
    Competition2024,
    FillRate2024,
    EntryScore50,
    EntryScore70,
    CompetitionAverage3y,
    CompetitionIntensity,
    CompetitionPercentile,
    CompetitionChangePct,
    CompetitionPercentileAverage3y,
    EntryScore70ChangePct,
    EntryScore70Average3y,
    FillRateAverage3y,
    /// Minimum-test code; `0` means no requirement.
    MinTestCode,
}

impl SortMetric {
    fn value(self, record: &ProgramRecord) -> Option<f64> {
        match self {
            Self::QuotaCurrent => record.quota_current,
            Self::Competition2024 => record.competition.ratio.latest(),
            Self::FillRate2024 => record.fill.rate.latest(),
            Self::EntryScore50 => record.entry.p50.latest(),
            Self::EntryScore70 => record.entry.p70.latest(),
            Self::CompetitionAverage3y => record.competition.average_3y,
            Self::CompetitionIntensity => record.competition.intensity,
            Self::CompetitionPercentile => record.competition.percentile,
            Self::CompetitionChangePct => record.competition.change_pct,
            Self::CompetitionPercentileAverage3y => record.competition.percentile_average_3y,
            Self::EntryScore70ChangePct => record.entry.p70_change_pct,
            Self::EntryScore70Average3y => record.entry.p70_average_3y,
            Self::FillRateAverage3y => record.fill.average_3y,
            Self::MinTestCode => record.eligibility.min_test_code.map(f64::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SortCriterion {
    Metric(SortMetric),
    /// Programs without a minimum-test requirement first.
    NoMinimumFirst,
    /// Keep only programs whose newly-established flag equals the value.
    /// Programs without a flag are dropped for either value.
    NewlyEstablished(YesNo),
}

impl SortCriterion {
    /// Resolve the labels used in exports and the consultant UI.
    /// Unknown keys resolve to `None`.
    pub fn from_key(key: &str, option: Option<&str>) -> Option<Self> {
        let metric = match key.trim() {
            "2025년_모집인원" | "quota_current" => SortMetric::QuotaCurrent,
            "2024년_경쟁률" | "competition_2024" => SortMetric::Competition2024,
            "충원율(%)" | "2024년_충원률(%)" | "2024년_충원율(%)" | "fill_rate_2024" => {
                SortMetric::FillRate2024
            }
            "2024년_입결50%" | "entry_score_50" => SortMetric::EntryScore50,
            "2024년 입결 70%" | "2024년_입결70%" | "entry_score_70" => SortMetric::EntryScore70,
            "3개년 경쟁률 평균" | "3개년_경쟁률_평균" | "competition_average_3y" => {
                SortMetric::CompetitionAverage3y
            }
            "2024년 경쟁강도" | "2024년_경쟁강도" | "competition_intensity" => {
                SortMetric::CompetitionIntensity
            }
            "경쟁률 백분위" | "2024년_경쟁률백분위" | "competition_percentile" => {
                SortMetric::CompetitionPercentile
            }
            "경쟁률 변동(%)" | "2024년_경쟁률변동(%)" | "competition_change_pct" => {
                SortMetric::CompetitionChangePct
            }
            "3개년 경쟁률 백분위 평균"
            | "3개년_경쟁률백분위_평균"
            | "competition_percentile_average_3y" => SortMetric::CompetitionPercentileAverage3y,
            "입결70% 변동(%)" | "2024년_입결70%변동(%)" | "entry_score_70_change_pct" => {
                SortMetric::EntryScore70ChangePct
            }
            "3개년 입결70% 평균" | "3개년_입결70%_평균" | "entry_score_70_average_3y" => {
                SortMetric::EntryScore70Average3y
            }
            "3개년 충원율 평균" | "3개년_충원율_평균" | "fill_rate_average_3y" => {
                SortMetric::FillRateAverage3y
            }
            "수능최저" | "2025년_수능최저코드" | "min_test_code" => SortMetric::MinTestCode,
            "수능 최저 없음 우선" | "no_minimum_first" => return Some(Self::NoMinimumFirst),
            "신설" | "newly_established" => {
                let flag = option.and_then(YesNo::parse).unwrap_or(YesNo::Yes);
                return Some(Self::NewlyEstablished(flag));
            }
            _ => return None,
        };
        Some(Self::Metric(metric))
    }
}

/// Order or filter `programs` by `criterion` and keep at most
/// [`SHORTLIST_LIMIT`] of them. Sorting is stable and programs missing
/// the sorted value always come last.
pub fn sort_and_truncate(
    programs: &[ScoredProgram],
    criterion: SortCriterion,
    order: SortOrder,
) -> Vec<ScoredProgram> {
    let mut ranked: Vec<ScoredProgram> = match criterion {
        SortCriterion::Metric(metric) => {
            let mut sorted = programs.to_vec();
            sorted.sort_by(|a, b| {
                compare_missing_last(metric.value(&a.record), metric.value(&b.record), order)
            });
            sorted
        }
        SortCriterion::NoMinimumFirst => {
            let mut sorted = programs.to_vec();
            sorted.sort_by_key(|program| !program.record.eligibility.has_no_min_test());
            sorted
        }
        SortCriterion::NewlyEstablished(flag) => programs
            .iter()
            .filter(|program| program.record.eligibility.newly_established == Some(flag))
            .cloned()
            .collect(),
    };
    ranked.truncate(SHORTLIST_LIMIT);
    ranked
}

/// String-keyed entry point: an unrecognized key leaves the input untouched.
pub fn sort_by_key(
    programs: &[ScoredProgram],
    key: &str,
    option: Option<&str>,
) -> Vec<ScoredProgram> {
    match SortCriterion::from_key(key, option) {
        Some(criterion) => {
            let order = option.and_then(SortOrder::parse).unwrap_or_default();
            sort_and_truncate(programs, criterion, order)
        }
        None => programs.to_vec(),
    }
}

fn compare_missing_last(a: Option<f64>, b: Option<f64>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Ascending => a.total_cmp(&b),
            SortOrder::Descending => b.total_cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Position in [`PRESTIGE_ORDER`]; unlisted institutions share the last rank.
pub fn prestige_rank(university: &str) -> usize {
    PRESTIGE_ORDER
        .iter()
        .position(|name| *name == university.trim())
        .unwrap_or(PRESTIGE_ORDER.len())
}

/// Stable reorder by institutional preference.
pub fn order_by_prestige(programs: &[ScoredProgram]) -> Vec<ScoredProgram> {
    let mut ordered = programs.to_vec();
    ordered.sort_by_key(|program| prestige_rank(&program.record.university));
    ordered
}
