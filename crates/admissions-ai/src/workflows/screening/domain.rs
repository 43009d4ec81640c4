use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::workflows::catalog::bands::BandGroup;
use crate::workflows::catalog::domain::AdmissionTrack;

/// High-school type; drives the grading-rigor multiplier and eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchoolType {
    General,
    CompetitiveDistrictGeneral,
    RegionalAutonomous,
    NationalAutonomous,
    Science,
    ForeignLanguage,
    Other(String),
}

impl SchoolType {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "일반고" | "general" => Self::General,
            "학군지 일반고" | "학군지일반고" | "competitive_district_general" => {
                Self::CompetitiveDistrictGeneral
            }
            "지역자사고" | "regional_autonomous" => Self::RegionalAutonomous,
            "전사고" | "national_autonomous" => Self::NationalAutonomous,
            "과학고" | "science" => Self::Science,
            "외고" | "foreign_language" => Self::ForeignLanguage,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::General => "일반고",
            Self::CompetitiveDistrictGeneral => "학군지 일반고",
            Self::RegionalAutonomous => "지역자사고",
            Self::NationalAutonomous => "전사고",
            Self::Science => "과학고",
            Self::ForeignLanguage => "외고",
            Self::Other(label) => label,
        }
    }

    /// Unrecognized school types are scored like a general high school.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::General => 1.0,
            Self::CompetitiveDistrictGeneral => 0.9,
            Self::RegionalAutonomous => 0.9,
            Self::NationalAutonomous => 0.7,
            Self::Science => 0.7,
            Self::ForeignLanguage => 0.8,
            Self::Other(_) => 1.0,
        }
    }

    pub fn band_group(&self) -> BandGroup {
        match self {
            Self::General => BandGroup::General,
            _ => BandGroup::SpecialPurpose,
        }
    }
}

impl fmt::Display for SchoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for SchoolType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for SchoolType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[serde(alias = "남", alias = "남자")]
    Male,
    #[serde(alias = "여", alias = "여자")]
    Female,
    #[default]
    Unspecified,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "남",
            Self::Female => "여",
            Self::Unspecified => "-",
        }
    }
}

/// How widely the student's category interests are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Main category (인문/자연) only.
    #[default]
    Broad,
    /// Mid category of each detail interest.
    Mid,
    /// Detail category name contains one of the interests.
    Detail,
}

fn default_high_factor() -> f64 {
    0.7
}

fn default_low_factor() -> f64 {
    1.3
}

/// Session-scoped description of the student being advised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub score: f64,
    pub school_type: SchoolType,
    #[serde(default)]
    pub gender: Gender,
    /// Main categories (계열), empty means any.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub detail_interests: Vec<String>,
    #[serde(default)]
    pub scope: SearchScope,
    /// Admission tracks to consider, empty means any.
    #[serde(default)]
    pub tracks: Vec<AdmissionTrack>,
    #[serde(default = "default_high_factor")]
    pub high_factor: f64,
    #[serde(default = "default_low_factor")]
    pub low_factor: f64,
    /// Highest acceptable minimum-test code, `None` disables the filter.
    #[serde(default)]
    pub max_min_test_code: Option<u8>,
    #[serde(default)]
    pub include_womens_universities: bool,
}

impl StudentProfile {
    pub fn new(score: f64, school_type: SchoolType) -> Self {
        Self {
            score,
            school_type,
            gender: Gender::default(),
            categories: Vec::new(),
            detail_interests: Vec::new(),
            scope: SearchScope::default(),
            tracks: Vec::new(),
            high_factor: default_high_factor(),
            low_factor: default_low_factor(),
            max_min_test_code: None,
            include_womens_universities: false,
        }
    }

    pub fn with_tracks(mut self, tracks: impl IntoIterator<Item = AdmissionTrack>) -> Self {
        self.tracks = tracks.into_iter().collect();
        self
    }

    pub fn with_categories<S: Into<String>>(
        mut self,
        categories: impl IntoIterator<Item = S>,
    ) -> Self {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_factors(mut self, high_factor: f64, low_factor: f64) -> Self {
        self.high_factor = high_factor;
        self.low_factor = low_factor;
        self
    }
}
