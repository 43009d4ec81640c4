use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoreBandError {
    #[error("failed to read score bands: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid score band JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("score band '{0}' is not of the form 'lower-upper'")]
    MalformedBand(String),
}

/// Which band table applies to a student: general high schools use their
/// own table, every other school type uses the special-purpose one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandGroup {
    General,
    SpecialPurpose,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBand {
    pub lower: f64,
    pub upper: f64,
    pub institutions: Vec<String>,
}

impl ScoreBand {
    /// Bands are half-open: `[lower, upper)`.
    pub fn contains(&self, score: f64) -> bool {
        self.lower <= score && score < self.upper
    }
}

/// Score band → institution mapping used to seed the candidate set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBandTable {
    general: Vec<ScoreBand>,
    special_purpose: Vec<ScoreBand>,
}

#[derive(Debug, Deserialize)]
struct RawBandTable {
    #[serde(default)]
    general: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    special_purpose: BTreeMap<String, Vec<String>>,
}

impl ScoreBandTable {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ScoreBandError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ScoreBandError> {
        let raw: RawBandTable = serde_json::from_reader(reader)?;
        Ok(Self {
            general: parse_bands(raw.general)?,
            special_purpose: parse_bands(raw.special_purpose)?,
        })
    }

    pub fn bands(&self, group: BandGroup) -> &[ScoreBand] {
        match group {
            BandGroup::General => &self.general,
            BandGroup::SpecialPurpose => &self.special_purpose,
        }
    }

    /// Institutions listed in every band that contains `score`.
    pub fn institutions_for(&self, group: BandGroup, score: f64) -> BTreeSet<String> {
        self.bands(group)
            .iter()
            .filter(|band| band.contains(score))
            .flat_map(|band| band.institutions.iter().cloned())
            .collect()
    }

    /// Union of the institutions reachable from each of `scores`.
    pub fn seed(&self, group: BandGroup, scores: &[f64]) -> BTreeSet<String> {
        scores
            .iter()
            .flat_map(|score| self.institutions_for(group, *score))
            .collect()
    }
}

fn parse_bands(raw: BTreeMap<String, Vec<String>>) -> Result<Vec<ScoreBand>, ScoreBandError> {
    let mut bands = raw
        .into_iter()
        .map(|(range, institutions)| {
            let (lower, upper) = parse_range(&range)?;
            Ok(ScoreBand {
                lower,
                upper,
                institutions: institutions
                    .into_iter()
                    .map(|name| name.trim().to_string())
                    .filter(|name| !name.is_empty())
                    .collect(),
            })
        })
        .collect::<Result<Vec<_>, ScoreBandError>>()?;

    bands.sort_by(|a, b| a.lower.total_cmp(&b.lower));
    Ok(bands)
}

fn parse_range(range: &str) -> Result<(f64, f64), ScoreBandError> {
    let malformed = || ScoreBandError::MalformedBand(range.to_string());
    let (lower, upper) = range.split_once('-').ok_or_else(malformed)?;
    let lower = lower.trim().parse::<f64>().map_err(|_| malformed())?;
    let upper = upper.trim().parse::<f64>().map_err(|_| malformed())?;
    if !(lower.is_finite() && upper.is_finite()) || lower >= upper {
        return Err(malformed());
    }
    Ok((lower, upper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TABLE: &str = r#"{
        "general": {
            "1.0-1.5": ["서울대학교", "연세대학교"],
            "1.5-2.0": ["한양대학교", "중앙대학교"]
        },
        "special_purpose": {
            "1.0-3.0": ["KAIST"]
        }
    }"#;

    #[test]
    fn bands_are_half_open() {
        let table = ScoreBandTable::from_reader(Cursor::new(TABLE)).expect("table parses");

        let at_boundary = table.institutions_for(BandGroup::General, 1.5);
        assert!(at_boundary.contains("한양대학교"));
        assert!(!at_boundary.contains("서울대학교"));

        assert!(table.institutions_for(BandGroup::General, 2.0).is_empty());
        assert!(table
            .institutions_for(BandGroup::SpecialPurpose, 2.4)
            .contains("KAIST"));
    }

    #[test]
    fn seed_unions_each_threshold() {
        let table = ScoreBandTable::from_reader(Cursor::new(TABLE)).expect("table parses");
        let seed = table.seed(BandGroup::General, &[1.05, 1.5, 1.95]);
        assert_eq!(seed.len(), 4);
    }

    #[test]
    fn malformed_band_keys_are_rejected() {
        let json = r#"{ "general": { "1.5": ["서울대학교"] } }"#;
        let error = ScoreBandTable::from_reader(Cursor::new(json)).expect_err("malformed");
        assert!(matches!(error, ScoreBandError::MalformedBand(ref band) if band == "1.5"));
    }
}
