use super::domain::{AdmissionTrack, ProgramRecord};
use super::normalizer::normalize_text;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummaryImportError {
    #[error("failed to read university summaries: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid university summary CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SummaryKey {
    university: String,
    track: AdmissionTrack,
    track_name: String,
}

/// Per-university notes for the current admissions cycle, keyed by
/// university, admission track and track name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniversitySummaries {
    entries: HashMap<SummaryKey, String>,
}

#[derive(Debug, Deserialize)]
struct SummaryRow {
    #[serde(rename = "대학명", alias = "university", default)]
    university: String,
    #[serde(rename = "전형구분", alias = "admission_track", default)]
    track: String,
    #[serde(rename = "전형명", alias = "track_name", default)]
    track_name: String,
    #[serde(rename = "2025학년도_핵심정리", alias = "summary", default)]
    summary: String,
}

impl UniversitySummaries {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SummaryImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Rows missing any key column or the summary text are skipped. A later
    /// row for the same key replaces an earlier one.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SummaryImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(reader);

        let mut entries = HashMap::new();
        for row in csv_reader.deserialize::<SummaryRow>() {
            let row = row?;
            let summary = row.summary.trim();
            let key = SummaryKey {
                university: normalize_text(&row.university),
                track: AdmissionTrack::parse(&row.track),
                track_name: normalize_text(&row.track_name),
            };
            if key.university.is_empty() || key.track_name.is_empty() || summary.is_empty() {
                continue;
            }
            entries.insert(key, summary.to_string());
        }
        Ok(Self { entries })
    }

    /// Summary for the program's university and track. Programs without a
    /// track name never match.
    pub fn lookup(&self, record: &ProgramRecord) -> Option<&str> {
        let track_name = record.track_name.as_deref()?;
        let key = SummaryKey {
            university: normalize_text(&record.university),
            track: record.track.clone(),
            track_name: normalize_text(track_name),
        };
        self.entries.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
