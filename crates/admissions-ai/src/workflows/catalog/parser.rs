use super::domain::{
    AdmissionTrack, CompetitionMetrics, Eligibility, EntryScoreMetrics, FillRateMetrics,
    HistoricalSeries, PeerMetrics, ProgramId, ProgramRecord, YesNo,
};
use super::normalizer::{normalize_text, parse_indicator, parse_number};
use super::schema::SchemaCapabilities;
use serde::{Deserialize, Deserializer};
use std::io::Read;

pub(crate) struct ParsedCatalog {
    pub(crate) capabilities: SchemaCapabilities,
    pub(crate) records: Vec<ProgramRecord>,
    pub(crate) skipped_rows: usize,
}

pub(crate) fn parse_catalog<R: Read>(reader: R) -> Result<ParsedCatalog, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let capabilities = SchemaCapabilities::from_headers(csv_reader.headers()?.iter());
    let mut records = Vec::new();
    let mut skipped_rows = 0;

    for row in csv_reader.deserialize::<CatalogRow>() {
        let row = row?;
        if row.university.trim().is_empty() || row.unit.trim().is_empty() {
            skipped_rows += 1;
            continue;
        }
        let id = ProgramId(records.len() as u32);
        records.push(row.into_record(id));
    }

    Ok(ParsedCatalog {
        capabilities,
        records,
        skipped_rows,
    })
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "대학명", alias = "university")]
    university: String,
    #[serde(rename = "전형구분", alias = "admission_track")]
    track: String,
    #[serde(rename = "전형명", alias = "track_name", default, deserialize_with = "text")]
    track_name: Option<String>,
    #[serde(rename = "모집단위", alias = "전공", alias = "unit")]
    unit: String,
    #[serde(rename = "계열", alias = "main_category", default, deserialize_with = "text")]
    main_category: Option<String>,
    #[serde(rename = "계열구분", alias = "mid_category", default, deserialize_with = "text")]
    mid_category: Option<String>,
    #[serde(rename = "계열상세명", alias = "detail_category", default, deserialize_with = "text")]
    detail_category: Option<String>,

    #[serde(rename = "2025년_모집인원", alias = "quota_2025", default, deserialize_with = "number")]
    quota_2025: Option<f64>,
    #[serde(rename = "2024년_모집인원", alias = "quota_2024", default, deserialize_with = "number")]
    quota_2024: Option<f64>,
    #[serde(rename = "2023년_모집인원", alias = "quota_2023", default, deserialize_with = "number")]
    quota_2023: Option<f64>,
    #[serde(rename = "2022년_모집인원", alias = "quota_2022", default, deserialize_with = "number")]
    quota_2022: Option<f64>,

    #[serde(
        rename = "2024년_경쟁률",
        alias = "competition_ratio_2024",
        default,
        deserialize_with = "number"
    )]
    competition_2024: Option<f64>,
    #[serde(
        rename = "2023년_경쟁률",
        alias = "competition_ratio_2023",
        default,
        deserialize_with = "number"
    )]
    competition_2023: Option<f64>,
    #[serde(
        rename = "2022년_경쟁률",
        alias = "competition_ratio_2022",
        default,
        deserialize_with = "number"
    )]
    competition_2022: Option<f64>,

    #[serde(
        rename = "2024년_입결70%",
        alias = "entry_score_70_2024",
        default,
        deserialize_with = "number"
    )]
    entry70_2024: Option<f64>,
    #[serde(
        rename = "2023년_입결70%",
        alias = "entry_score_70_2023",
        default,
        deserialize_with = "number"
    )]
    entry70_2023: Option<f64>,
    #[serde(
        rename = "2022년_입결70%",
        alias = "entry_score_70_2022",
        default,
        deserialize_with = "number"
    )]
    entry70_2022: Option<f64>,
    #[serde(
        rename = "2024년_입결50%",
        alias = "entry_score_50_2024",
        default,
        deserialize_with = "number"
    )]
    entry50_2024: Option<f64>,
    #[serde(
        rename = "2023년_입결50%",
        alias = "entry_score_50_2023",
        default,
        deserialize_with = "number"
    )]
    entry50_2023: Option<f64>,
    #[serde(
        rename = "2022년_입결50%",
        alias = "entry_score_50_2022",
        default,
        deserialize_with = "number"
    )]
    entry50_2022: Option<f64>,

    #[serde(
        rename = "2024년_충원율(%)",
        alias = "2024년_충원률(%)",
        alias = "fill_rate_2024",
        default,
        deserialize_with = "number"
    )]
    fill_2024: Option<f64>,
    #[serde(
        rename = "2023년_충원율(%)",
        alias = "2023년_충원률(%)",
        alias = "fill_rate_2023",
        default,
        deserialize_with = "number"
    )]
    fill_2023: Option<f64>,
    #[serde(
        rename = "2022년_충원율(%)",
        alias = "2022년_충원률(%)",
        alias = "fill_rate_2022",
        default,
        deserialize_with = "number"
    )]
    fill_2022: Option<f64>,
    #[serde(
        rename = "2024년_추가합격자수",
        alias = "waitlist_admits_2024",
        default,
        deserialize_with = "number"
    )]
    waitlist_2024: Option<f64>,
    #[serde(
        rename = "2023년_추가합격자수",
        alias = "waitlist_admits_2023",
        default,
        deserialize_with = "number"
    )]
    waitlist_2023: Option<f64>,
    #[serde(
        rename = "2022년_추가합격자수",
        alias = "waitlist_admits_2022",
        default,
        deserialize_with = "number"
    )]
    waitlist_2022: Option<f64>,

    #[serde(
        rename = "2024년_경쟁률백분위",
        alias = "competition_percentile",
        default,
        deserialize_with = "number"
    )]
    competition_percentile: Option<f64>,
    #[serde(
        rename = "2024년_경쟁률변동(%)",
        alias = "competition_change_pct",
        default,
        deserialize_with = "number"
    )]
    competition_change_pct: Option<f64>,
    #[serde(
        rename = "2024년_경쟁강도",
        alias = "competition_intensity",
        default,
        deserialize_with = "number"
    )]
    competition_intensity: Option<f64>,
    #[serde(
        rename = "2024년_경쟁률상승여부",
        alias = "competition_rising",
        default,
        deserialize_with = "flag"
    )]
    competition_rising: Option<YesNo>,
    #[serde(
        rename = "2024년_경쟁률상승정도(%)",
        alias = "competition_rise_pct",
        default,
        deserialize_with = "number"
    )]
    competition_rise_pct: Option<f64>,
    #[serde(
        rename = "3개년_경쟁률_평균",
        alias = "competition_average_3y",
        default,
        deserialize_with = "number"
    )]
    competition_average_3y: Option<f64>,
    #[serde(
        rename = "3개년_경쟁률백분위_평균",
        alias = "competition_percentile_average_3y",
        default,
        deserialize_with = "number"
    )]
    competition_percentile_average_3y: Option<f64>,

    #[serde(
        rename = "2024년_입결70%변동(%)",
        alias = "entry_score_70_change_pct",
        default,
        deserialize_with = "number"
    )]
    entry70_change_pct: Option<f64>,
    #[serde(
        rename = "2024년_입결70%차이(%)",
        alias = "entry_score_70_diff_pct",
        default,
        deserialize_with = "number"
    )]
    entry70_diff_pct: Option<f64>,
    #[serde(
        rename = "2024년_입결50%차이(%)",
        alias = "entry_score_50_diff_pct",
        default,
        deserialize_with = "number"
    )]
    entry50_diff_pct: Option<f64>,
    #[serde(
        rename = "2024년_입결70%하락여부",
        alias = "entry_score_70_declining",
        default,
        deserialize_with = "flag"
    )]
    entry70_declining: Option<YesNo>,
    #[serde(
        rename = "3개년_입결70%_평균",
        alias = "3개년_평균_입결70%",
        alias = "entry_score_70_average_3y",
        default,
        deserialize_with = "number"
    )]
    entry70_average_3y: Option<f64>,
    #[serde(
        rename = "3개년_입결50%_평균",
        alias = "3개년_평균_입결50%",
        alias = "entry_score_50_average_3y",
        default,
        deserialize_with = "number"
    )]
    entry50_average_3y: Option<f64>,

    #[serde(
        rename = "2024년_충원율백분위",
        alias = "fill_rate_percentile",
        default,
        deserialize_with = "number"
    )]
    fill_percentile: Option<f64>,
    #[serde(
        rename = "2024년_충원율변동(%)",
        alias = "2024년_충원률변화(%)",
        alias = "fill_rate_change_pct",
        default,
        deserialize_with = "number"
    )]
    fill_change_pct: Option<f64>,
    #[serde(
        rename = "3개년_충원율_평균",
        alias = "3개년_평균_충원률",
        alias = "fill_rate_average_3y",
        default,
        deserialize_with = "number"
    )]
    fill_average_3y: Option<f64>,

    #[serde(
        rename = "2024년_계열경쟁률",
        alias = "peer_competition_2024",
        default,
        deserialize_with = "number"
    )]
    peer_competition: Option<f64>,
    #[serde(
        rename = "3개년_계열경쟁률_평균",
        alias = "peer_competition_average_3y",
        default,
        deserialize_with = "number"
    )]
    peer_competition_average_3y: Option<f64>,
    #[serde(
        rename = "2024년_계열경쟁률변동(%)",
        alias = "peer_competition_change_pct",
        default,
        deserialize_with = "number"
    )]
    peer_competition_change_pct: Option<f64>,
    #[serde(
        rename = "2024년_계열입결70%",
        alias = "peer_entry_score_70_2024",
        default,
        deserialize_with = "number"
    )]
    peer_entry70: Option<f64>,
    #[serde(
        rename = "3개년_계열입결70%_평균",
        alias = "peer_entry_score_70_average_3y",
        default,
        deserialize_with = "number"
    )]
    peer_entry70_average_3y: Option<f64>,
    #[serde(
        rename = "2024년_계열입결70%변동(%)",
        alias = "peer_entry_score_70_change_pct",
        default,
        deserialize_with = "number"
    )]
    peer_entry70_change_pct: Option<f64>,
    #[serde(
        rename = "2024년_계열충원율(%)",
        alias = "peer_fill_rate_2024",
        default,
        deserialize_with = "number"
    )]
    peer_fill: Option<f64>,
    #[serde(
        rename = "3개년_계열충원율_평균",
        alias = "peer_fill_rate_average_3y",
        default,
        deserialize_with = "number"
    )]
    peer_fill_average_3y: Option<f64>,
    #[serde(
        rename = "2024년_계열충원율변동(%)",
        alias = "peer_fill_rate_change_pct",
        default,
        deserialize_with = "number"
    )]
    peer_fill_change_pct: Option<f64>,

    #[serde(rename = "과학고", alias = "science_high_school", default, deserialize_with = "indicator")]
    science_high_school: bool,
    #[serde(
        rename = "전사고",
        alias = "boarding_high_school",
        default,
        deserialize_with = "indicator"
    )]
    boarding_high_school: bool,
    #[serde(
        rename = "외고",
        alias = "foreign_language_high_school",
        default,
        deserialize_with = "indicator"
    )]
    foreign_language_high_school: bool,
    #[serde(rename = "신설", alias = "newly_established", default, deserialize_with = "flag")]
    newly_established: Option<YesNo>,
    #[serde(rename = "2025년_수능최저코드", alias = "min_test_code", default, deserialize_with = "number")]
    min_test_code: Option<f64>,
    #[serde(rename = "2025년_최저요약", alias = "min_test_summary", default, deserialize_with = "text")]
    min_test_summary: Option<String>,
    #[serde(
        rename = "2025년_수능최저",
        alias = "min_test_requirement",
        default,
        deserialize_with = "text"
    )]
    min_test_requirement: Option<String>,
}

impl CatalogRow {
    fn into_record(self, id: ProgramId) -> ProgramRecord {
        ProgramRecord {
            id,
            university: normalize_text(&self.university),
            track: AdmissionTrack::parse(&self.track),
            track_name: self.track_name,
            unit: normalize_text(&self.unit),
            main_category: self.main_category,
            mid_category: self.mid_category,
            detail_category: self.detail_category,
            quota: HistoricalSeries([self.quota_2022, self.quota_2023, self.quota_2024]),
            quota_current: self.quota_2025,
            competition: CompetitionMetrics {
                ratio: HistoricalSeries([
                    self.competition_2022,
                    self.competition_2023,
                    self.competition_2024,
                ]),
                percentile: self.competition_percentile,
                change_pct: self.competition_change_pct,
                intensity: self.competition_intensity,
                rising: self.competition_rising,
                rise_pct: self.competition_rise_pct,
                average_3y: self.competition_average_3y,
                percentile_average_3y: self.competition_percentile_average_3y,
            },
            entry: EntryScoreMetrics {
                p50: HistoricalSeries([self.entry50_2022, self.entry50_2023, self.entry50_2024]),
                p70: HistoricalSeries([self.entry70_2022, self.entry70_2023, self.entry70_2024]),
                p70_change_pct: self.entry70_change_pct,
                p70_diff_pct: self.entry70_diff_pct,
                p50_diff_pct: self.entry50_diff_pct,
                p70_declining: self.entry70_declining,
                p70_average_3y: self.entry70_average_3y,
                p50_average_3y: self.entry50_average_3y,
            },
            fill: FillRateMetrics {
                rate: HistoricalSeries([self.fill_2022, self.fill_2023, self.fill_2024]),
                waitlist_admits: HistoricalSeries([
                    self.waitlist_2022,
                    self.waitlist_2023,
                    self.waitlist_2024,
                ]),
                percentile: self.fill_percentile,
                change_pct: self.fill_change_pct,
                average_3y: self.fill_average_3y,
            },
            peer: PeerMetrics {
                competition: self.peer_competition,
                competition_average_3y: self.peer_competition_average_3y,
                competition_change_pct: self.peer_competition_change_pct,
                entry_p70: self.peer_entry70,
                entry_p70_average_3y: self.peer_entry70_average_3y,
                entry_p70_change_pct: self.peer_entry70_change_pct,
                fill_rate: self.peer_fill,
                fill_rate_average_3y: self.peer_fill_average_3y,
                fill_rate_change_pct: self.peer_fill_change_pct,
            },
            eligibility: Eligibility {
                science_high_school: self.science_high_school,
                boarding_high_school: self.boarding_high_school,
                foreign_language_high_school: self.foreign_language_high_school,
                newly_established: self.newly_established,
                min_test_code: self
                    .min_test_code
                    .filter(|code| *code >= 0.0 && *code <= f64::from(u8::MAX))
                    .map(|code| code.round() as u8),
                min_test_summary: self.min_test_summary,
                min_test_requirement: self.min_test_requirement,
            },
        }
    }
}

fn raw_cell<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(raw_cell(deserializer)?.map(|value| normalize_text(&value)))
}

fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(raw_cell(deserializer)?.and_then(|value| parse_number(&value)))
}

fn indicator<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(raw_cell(deserializer)?
        .map(|value| parse_indicator(&value))
        .unwrap_or(false))
}

fn flag<'de, D>(deserializer: D) -> Result<Option<YesNo>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(raw_cell(deserializer)?.and_then(|value| YesNo::parse(&value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::catalog::schema::Column;
    use std::io::Cursor;

    #[test]
    fn parses_korean_headers_into_nested_record() {
        let csv = "대학명,전형구분,모집단위,계열,2024년_입결70%,2024년_입결50%,2024년_충원율(%),신설,과학고,2025년_수능최저코드\n\
한양대학교,교과,신소재공학과,자연,1.42,1.3,55.5%,YES,1,3\n";
        let parsed = parse_catalog(Cursor::new(csv)).expect("catalog parses");

        assert_eq!(parsed.records.len(), 1);
        let record = &parsed.records[0];
        assert_eq!(record.id, ProgramId(0));
        assert_eq!(record.track, AdmissionTrack::SubjectGrade);
        assert_eq!(record.entry.p70.latest(), Some(1.42));
        assert_eq!(record.entry.p50.latest(), Some(1.3));
        assert_eq!(record.fill.rate.latest(), Some(55.5));
        assert_eq!(record.eligibility.newly_established, Some(YesNo::Yes));
        assert!(record.eligibility.science_high_school);
        assert_eq!(record.eligibility.min_test_code, Some(3));
        assert!(parsed.capabilities.has(Column::FillRate2024));
        assert!(!parsed.capabilities.has(Column::CompetitionIntensity));
    }

    #[test]
    fn english_aliases_and_blank_cells_are_accepted() {
        let csv = "university,admission_track,unit,entry_score_70_2024,competition_rising\n\
Korea University,comprehensive,Economics,,no\n\
,comprehensive,Orphan,2.0,YES\n";
        let parsed = parse_catalog(Cursor::new(csv)).expect("catalog parses");

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.skipped_rows, 1);
        let record = &parsed.records[0];
        assert_eq!(record.track, AdmissionTrack::Comprehensive);
        assert_eq!(record.entry.p70.latest(), None);
        assert_eq!(record.competition.rising, Some(YesNo::No));
    }
}
