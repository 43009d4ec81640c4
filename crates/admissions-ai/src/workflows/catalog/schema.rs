use super::normalizer::normalize_header;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Catalog columns whose presence changes what the screening engine can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    University,
    AdmissionTrack,
    Unit,
    MainCategory,
    MidCategory,
    DetailCategory,
    QuotaCurrent,
    Competition2024,
    EntryScore50,
    EntryScore70,
    FillRate2024,
    CompetitionPercentile,
    CompetitionChangePct,
    CompetitionIntensity,
    CompetitionRising,
    CompetitionRisePct,
    CompetitionAverage3y,
    CompetitionPercentileAverage3y,
    EntryScore70ChangePct,
    EntryScore70DiffPct,
    EntryScore50DiffPct,
    EntryScore70Declining,
    EntryScore70Average3y,
    FillRateAverage3y,
    ScienceHighSchool,
    BoardingHighSchool,
    ForeignLanguageHighSchool,
    NewlyEstablished,
    MinTestCode,
    MinTestRequirement,
}

impl Column {
    pub const ALL: [Column; 30] = [
        Column::University,
        Column::AdmissionTrack,
        Column::Unit,
        Column::MainCategory,
        Column::MidCategory,
        Column::DetailCategory,
        Column::QuotaCurrent,
        Column::Competition2024,
        Column::EntryScore50,
        Column::EntryScore70,
        Column::FillRate2024,
        Column::CompetitionPercentile,
        Column::CompetitionChangePct,
        Column::CompetitionIntensity,
        Column::CompetitionRising,
        Column::CompetitionRisePct,
        Column::CompetitionAverage3y,
        Column::CompetitionPercentileAverage3y,
        Column::EntryScore70ChangePct,
        Column::EntryScore70DiffPct,
        Column::EntryScore50DiffPct,
        Column::EntryScore70Declining,
        Column::EntryScore70Average3y,
        Column::FillRateAverage3y,
        Column::ScienceHighSchool,
        Column::BoardingHighSchool,
        Column::ForeignLanguageHighSchool,
        Column::NewlyEstablished,
        Column::MinTestCode,
        Column::MinTestRequirement,
    ];

    /// Columns without which a row cannot be identified at all.
    pub const REQUIRED: [Column; 3] = [Column::University, Column::AdmissionTrack, Column::Unit];

    /// Canonical (source) header names; the first entry is used in messages.
    pub const fn headers(self) -> &'static [&'static str] {
        match self {
            Column::University => &["대학명", "university"],
            Column::AdmissionTrack => &["전형구분", "admission_track"],
            Column::Unit => &["모집단위", "전공", "unit"],
            Column::MainCategory => &["계열", "main_category"],
            Column::MidCategory => &["계열구분", "mid_category"],
            Column::DetailCategory => &["계열상세명", "detail_category"],
            Column::QuotaCurrent => &["2025년_모집인원", "quota_2025"],
            Column::Competition2024 => &["2024년_경쟁률", "competition_ratio_2024"],
            Column::EntryScore50 => &["2024년_입결50%", "entry_score_50_2024"],
            Column::EntryScore70 => &["2024년_입결70%", "entry_score_70_2024"],
            Column::FillRate2024 => &["2024년_충원율(%)", "2024년_충원률(%)", "fill_rate_2024"],
            Column::CompetitionPercentile => &["2024년_경쟁률백분위", "competition_percentile"],
            Column::CompetitionChangePct => &["2024년_경쟁률변동(%)", "competition_change_pct"],
            Column::CompetitionIntensity => &["2024년_경쟁강도", "competition_intensity"],
            Column::CompetitionRising => &["2024년_경쟁률상승여부", "competition_rising"],
            Column::CompetitionRisePct => &["2024년_경쟁률상승정도(%)", "competition_rise_pct"],
            Column::CompetitionAverage3y => &["3개년_경쟁률_평균", "competition_average_3y"],
            Column::CompetitionPercentileAverage3y => &[
                "3개년_경쟁률백분위_평균",
                "competition_percentile_average_3y",
            ],
            Column::EntryScore70ChangePct => &["2024년_입결70%변동(%)", "entry_score_70_change_pct"],
            Column::EntryScore70DiffPct => &["2024년_입결70%차이(%)", "entry_score_70_diff_pct"],
            Column::EntryScore50DiffPct => &["2024년_입결50%차이(%)", "entry_score_50_diff_pct"],
            Column::EntryScore70Declining => &["2024년_입결70%하락여부", "entry_score_70_declining"],
            Column::EntryScore70Average3y => &[
                "3개년_입결70%_평균",
                "3개년_평균_입결70%",
                "entry_score_70_average_3y",
            ],
            Column::FillRateAverage3y => &[
                "3개년_충원율_평균",
                "3개년_평균_충원률",
                "fill_rate_average_3y",
            ],
            Column::ScienceHighSchool => &["과학고", "science_high_school"],
            Column::BoardingHighSchool => &["전사고", "boarding_high_school"],
            Column::ForeignLanguageHighSchool => &["외고", "foreign_language_high_school"],
            Column::NewlyEstablished => &["신설", "newly_established"],
            Column::MinTestCode => &["2025년_수능최저코드", "min_test_code"],
            Column::MinTestRequirement => &["2025년_수능최저", "min_test_requirement"],
        }
    }

    pub const fn header(self) -> &'static str {
        self.headers()[0]
    }

    fn matches(self, normalized_header: &str) -> bool {
        self.headers()
            .iter()
            .any(|candidate| normalize_header(candidate) == normalized_header)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Which capability-relevant columns a loaded catalog actually carries.
///
/// Built once per load from the header row; filters and sorts consult it
/// instead of probing individual rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaCapabilities {
    present: BTreeSet<Column>,
}

impl SchemaCapabilities {
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let normalized: Vec<String> = headers.into_iter().map(normalize_header).collect();
        let present = Column::ALL
            .into_iter()
            .filter(|column| normalized.iter().any(|header| column.matches(header)))
            .collect();
        Self { present }
    }

    /// Every column present; used for catalogs assembled in memory.
    pub fn complete() -> Self {
        Self {
            present: Column::ALL.into_iter().collect(),
        }
    }

    pub fn without(mut self, column: Column) -> Self {
        self.present.remove(&column);
        self
    }

    pub fn has(&self, column: Column) -> bool {
        self.present.contains(&column)
    }

    /// First column of `required` that is absent, if any.
    pub fn first_missing(&self, required: &[Column]) -> Option<Column> {
        required.iter().copied().find(|column| !self.has(*column))
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.present.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_recognize_source_and_alias_headers() {
        let capabilities = SchemaCapabilities::from_headers([
            "\u{feff}대학명",
            "admission_track",
            "모집단위",
            "2024년_충원률(%)",
            " 3개년_평균_충원률 ",
        ]);

        assert!(capabilities.has(Column::University));
        assert!(capabilities.has(Column::AdmissionTrack));
        assert!(capabilities.has(Column::FillRate2024));
        assert!(capabilities.has(Column::FillRateAverage3y));
        assert!(!capabilities.has(Column::CompetitionIntensity));
        assert_eq!(
            capabilities.first_missing(&[Column::FillRate2024, Column::EntryScore70]),
            Some(Column::EntryScore70)
        );
    }

    #[test]
    fn complete_capabilities_can_drop_columns() {
        let capabilities = SchemaCapabilities::complete().without(Column::FillRate2024);
        assert!(!capabilities.has(Column::FillRate2024));
        assert!(capabilities.has(Column::FillRateAverage3y));
        assert_eq!(capabilities.columns().count(), Column::ALL.len() - 1);
    }
}
