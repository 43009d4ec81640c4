use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Admission cycles covered by the historical columns, oldest first.
pub const HISTORY_YEARS: [u16; 3] = [2022, 2023, 2024];
/// The cycle students are applying for.
pub const CURRENT_CYCLE: u16 = 2025;

/// Stable identifier of a program row inside one loaded catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub u32);

/// Admission track (전형구분) a program is offered under.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdmissionTrack {
    Comprehensive,
    SubjectGrade,
    Essay,
    Other(String),
}

impl AdmissionTrack {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "종합" | "학종" | "학생부종합" | "comprehensive" => Self::Comprehensive,
            "교과" | "학생부교과" | "subject_grade" | "subject-grade" => Self::SubjectGrade,
            "논술" | "essay" => Self::Essay,
            other => Self::Other(other.to_string()),
        }
    }

    /// Label as it appears in the source data and in reports.
    pub fn label(&self) -> &str {
        match self {
            Self::Comprehensive => "종합",
            Self::SubjectGrade => "교과",
            Self::Essay => "논술",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for AdmissionTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for AdmissionTrack {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Comprehensive => serializer.serialize_str("comprehensive"),
            Self::SubjectGrade => serializer.serialize_str("subject_grade"),
            Self::Essay => serializer.serialize_str("essay"),
            Self::Other(label) => serializer.serialize_str(label),
        }
    }
}

impl<'de> Deserialize<'de> for AdmissionTrack {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Two-valued flag used for every YES/NO column and criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum YesNo {
    Yes,
    #[default]
    No,
}

impl YesNo {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "YES" | "Y" | "TRUE" | "1" => Some(Self::Yes),
            "NO" | "N" | "FALSE" | "0" => Some(Self::No),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }

    pub const fn is_yes(self) -> bool {
        matches!(self, Self::Yes)
    }
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        if value {
            Self::Yes
        } else {
            Self::No
        }
    }
}

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for YesNo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for YesNo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(value) => Ok(Self::from(value)),
            Raw::Text(text) => Self::parse(&text).ok_or_else(|| {
                serde::de::Error::custom(format!("expected YES or NO, found '{text}'"))
            }),
        }
    }
}

/// One metric across [`HISTORY_YEARS`], oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HistoricalSeries(pub [Option<f64>; 3]);

impl HistoricalSeries {
    pub fn latest(&self) -> Option<f64> {
        self.0[2]
    }

    pub fn previous(&self) -> Option<f64> {
        self.0[1]
    }

    pub fn by_year(&self) -> impl Iterator<Item = (u16, Option<f64>)> + '_ {
        HISTORY_YEARS.into_iter().zip(self.0.iter().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompetitionMetrics {
    pub ratio: HistoricalSeries,
    pub percentile: Option<f64>,
    pub change_pct: Option<f64>,
    pub intensity: Option<f64>,
    pub rising: Option<YesNo>,
    pub rise_pct: Option<f64>,
    pub average_3y: Option<f64>,
    pub percentile_average_3y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryScoreMetrics {
    pub p50: HistoricalSeries,
    pub p70: HistoricalSeries,
    pub p70_change_pct: Option<f64>,
    pub p70_diff_pct: Option<f64>,
    pub p50_diff_pct: Option<f64>,
    pub p70_declining: Option<YesNo>,
    pub p70_average_3y: Option<f64>,
    pub p50_average_3y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FillRateMetrics {
    pub rate: HistoricalSeries,
    pub waitlist_admits: HistoricalSeries,
    pub percentile: Option<f64>,
    pub change_pct: Option<f64>,
    pub average_3y: Option<f64>,
}

/// Averages over programs of the same category, used as report context.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PeerMetrics {
    pub competition: Option<f64>,
    pub competition_average_3y: Option<f64>,
    pub competition_change_pct: Option<f64>,
    pub entry_p70: Option<f64>,
    pub entry_p70_average_3y: Option<f64>,
    pub entry_p70_change_pct: Option<f64>,
    pub fill_rate: Option<f64>,
    pub fill_rate_average_3y: Option<f64>,
    pub fill_rate_change_pct: Option<f64>,
}

/// School-type eligibility and test requirements for the current cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Eligibility {
    pub science_high_school: bool,
    pub boarding_high_school: bool,
    pub foreign_language_high_school: bool,
    pub newly_established: Option<YesNo>,
    pub min_test_code: Option<u8>,
    pub min_test_summary: Option<String>,
    pub min_test_requirement: Option<String>,
}

impl Eligibility {
    /// True when the program sets no minimum standardized-test requirement.
    pub fn has_no_min_test(&self) -> bool {
        match self.min_test_requirement.as_deref().map(str::trim) {
            Some("없음") => true,
            Some(_) => false,
            None => self.min_test_code == Some(0),
        }
    }
}

/// One (university, admission track, unit) row of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramRecord {
    pub id: ProgramId,
    pub university: String,
    pub track: AdmissionTrack,
    pub track_name: Option<String>,
    pub unit: String,
    pub main_category: Option<String>,
    pub mid_category: Option<String>,
    pub detail_category: Option<String>,
    pub quota: HistoricalSeries,
    pub quota_current: Option<f64>,
    pub competition: CompetitionMetrics,
    pub entry: EntryScoreMetrics,
    pub fill: FillRateMetrics,
    pub peer: PeerMetrics,
    pub eligibility: Eligibility,
}

impl ProgramRecord {
    /// Minimal record used by fixtures and demos; every metric starts empty.
    pub fn new(id: u32, university: &str, track: AdmissionTrack, unit: &str) -> Self {
        Self {
            id: ProgramId(id),
            university: university.to_string(),
            track,
            track_name: None,
            unit: unit.to_string(),
            main_category: None,
            mid_category: None,
            detail_category: None,
            quota: HistoricalSeries::default(),
            quota_current: None,
            competition: CompetitionMetrics::default(),
            entry: EntryScoreMetrics::default(),
            fill: FillRateMetrics::default(),
            peer: PeerMetrics::default(),
            eligibility: Eligibility::default(),
        }
    }

    /// Display label used in shortlists, e.g. `한양대학교 신소재공학과`.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.university, self.unit)
    }

    pub fn is_womens_university(&self) -> bool {
        self.university.contains("여자") || self.university.contains("여대")
    }
}
