use super::format_value;
use super::narrative::{NarrativeError, NarrativeGenerator, NarrativeRequest};
use super::prompts;
use super::views::{
    CandidateLineView, DetailRowView, DetailTableView, MetricLineView, ProfileSummaryView,
    ReachAnalysisView, ReportSections, TrackCandidatesView, UniversitySummaryGroupView,
    UniversitySummaryView,
};
use crate::workflows::catalog::domain::{AdmissionTrack, ProgramRecord};
use crate::workflows::catalog::summaries::UniversitySummaries;
use crate::workflows::screening::criteria::FilterWarning;
use crate::workflows::screening::domain::StudentProfile;
use crate::workflows::screening::scoring::adjust;
use crate::workflows::screening::tiering::{ScoredProgram, Tier, TierPartition};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

const CANDIDATE_LINE_LIMIT: usize = 5;
const REACH_ANALYSIS_LIMIT: usize = 3;

const NARRATIVE_PLACEHOLDER: &str =
    "_자동 분석을 생성하지 못했습니다. 아래 데이터 표를 참고해 주세요._";
const NO_REACH_MESSAGE: &str = "상향지원 정보가 없는 상태입니다.";
const REACH_INTRO: &str = "경쟁률과 입결은 해마다 오르내림이 크지만 학과별로 길게 보면 일정한 흐름이 있고, \
충원율은 비교적 안정적인 편입니다.\n\n\
상향 지원은 적정이나 안정 지원보다 합격 가능성이 낮지만, 경쟁 강도와 입결 상승률, 충원 강도를 함께 \
살펴 전략적으로 접근하면 충분히 의미 있는 선택이 됩니다. 아래는 경쟁률, 입결, 충원율을 바탕으로 \
고른 상향 지원 BEST 3입니다.";

/// Tracks covered by the per-university summary section, in display order.
const SUMMARY_TRACKS: [(AdmissionTrack, &str); 2] = [
    (AdmissionTrack::SubjectGrade, "교과"),
    (AdmissionTrack::Comprehensive, "종합"),
];

/// Track columns of the report, in display order.
fn report_tracks() -> [(AdmissionTrack, &'static str); 3] {
    [
        (AdmissionTrack::Comprehensive, "학생부 종합"),
        (AdmissionTrack::SubjectGrade, "교과"),
        (AdmissionTrack::Essay, "논술"),
    ]
}

#[derive(Debug, Clone, Serialize)]
pub struct ScreeningReport {
    pub markdown: String,
    pub sections: ReportSections,
    pub warnings: Vec<String>,
}

/// Builds the consultant-facing report from a finalized (or any) partition.
pub struct ReportAssembler<'a> {
    narrator: &'a dyn NarrativeGenerator,
    expert_notes: Option<&'a str>,
    summaries: Option<&'a UniversitySummaries>,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(narrator: &'a dyn NarrativeGenerator) -> Self {
        Self {
            narrator,
            expert_notes: None,
            summaries: None,
        }
    }

    pub fn with_expert_notes(mut self, notes: Option<&'a str>) -> Self {
        self.expert_notes = notes;
        self
    }

    pub fn with_university_summaries(
        mut self,
        summaries: Option<&'a UniversitySummaries>,
    ) -> Self {
        self.summaries = summaries;
        self
    }

    pub fn assemble(
        &self,
        profile: &StudentProfile,
        partition: &TierPartition,
        filter_warnings: &[FilterWarning],
    ) -> ScreeningReport {
        let mut warnings: Vec<String> =
            filter_warnings.iter().map(describe_filter_warning).collect();

        let overall_opinion = self.narrate(
            prompts::overall_opinion(profile, partition, self.expert_notes),
            &mut warnings,
        );

        let best: Vec<ScoredProgram> = partition
            .tier(Tier::Reach)
            .iter()
            .take(REACH_ANALYSIS_LIMIT)
            .cloned()
            .collect();
        let reach_strategy = if best.is_empty() {
            NO_REACH_MESSAGE.to_string()
        } else {
            self.narrate(prompts::reach_strategy(&best, self.expert_notes), &mut warnings)
        };

        let reach_analyses = report_tracks()
            .into_iter()
            .flat_map(|(track, track_label)| {
                partition
                    .tier(Tier::Reach)
                    .iter()
                    .filter(move |program| program.record.track == track)
                    .take(REACH_ANALYSIS_LIMIT)
                    .enumerate()
                    .map(move |(index, program)| (index + 1, track_label, program))
            })
            .map(|(rank, track_label, program)| {
                let narrative = self.narrate(
                    prompts::program_analysis(&program.record, self.expert_notes),
                    &mut warnings,
                );
                reach_analysis(rank, track_label, &program.record, narrative)
            })
            .collect();

        let sections = ReportSections {
            profile: profile_summary(profile),
            candidate_lines: candidate_lines(partition),
            overall_opinion,
            reach_strategy,
            reach_analyses,
            detail_tables: detail_tables(partition),
            university_summaries: self
                .summaries
                .map(|summaries| university_summaries(partition, summaries))
                .unwrap_or_default(),
        };

        debug!(
            programs = partition.len(),
            warnings = warnings.len(),
            "assembled screening report"
        );

        ScreeningReport {
            markdown: render_markdown(&sections),
            sections,
            warnings,
        }
    }

    fn narrate(&self, request: NarrativeRequest, warnings: &mut Vec<String>) -> String {
        let outcome = self.narrator.generate(&request).and_then(|text| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Err(NarrativeError::Empty)
            } else {
                Ok(trimmed.to_string())
            }
        });

        match outcome {
            Ok(text) => text,
            Err(error) => {
                warn!(kind = request.kind.label(), error = %error, "narrative generation failed");
                warnings.push(format!("{}: {error}", request.kind.label()));
                NARRATIVE_PLACEHOLDER.to_string()
            }
        }
    }
}

fn describe_filter_warning(warning: &FilterWarning) -> String {
    let tiers: Vec<&str> = warning.tiers.iter().map(|tier| tier.label()).collect();
    format!("{} ({}): {}", warning.filter, tiers.join(", "), warning.message)
}

fn profile_summary(profile: &StudentProfile) -> ProfileSummaryView {
    ProfileSummaryView {
        school_type: profile.school_type.label().to_string(),
        categories: profile.categories.clone(),
        detail_interests: profile.detail_interests.clone(),
        score: profile.score,
        adjusted_score: adjust(profile.score, &profile.school_type),
    }
}

fn candidate_lines(partition: &TierPartition) -> Vec<CandidateLineView> {
    Tier::ALL
        .into_iter()
        .map(|tier| CandidateLineView {
            tier,
            tier_label: tier.label(),
            tracks: report_tracks()
                .into_iter()
                .map(|(track, track_label)| TrackCandidatesView {
                    track_label,
                    programs: partition
                        .tier(tier)
                        .iter()
                        .filter(|program| program.record.track == track)
                        .take(CANDIDATE_LINE_LIMIT)
                        .map(|program| program.record.display_name())
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

fn reach_analysis(
    rank: usize,
    track_label: &'static str,
    record: &ProgramRecord,
    narrative: String,
) -> ReachAnalysisView {
    let line = |label, value, peer_average, unit| MetricLineView {
        label,
        value,
        peer_average,
        unit,
    };

    ReachAnalysisView {
        rank,
        program_id: record.id,
        title: format!("{} {} {}", record.university, record.unit, record.track),
        track_label,
        competition: vec![
            line("2024학년도 경쟁률", record.competition.ratio.latest(), record.peer.competition, ""),
            line(
                "2024학년도 경쟁률 변동(%)",
                record.competition.change_pct,
                record.peer.competition_change_pct,
                "",
            ),
            line(
                "3개년 평균 경쟁률",
                record.competition.average_3y,
                record.peer.competition_average_3y,
                "",
            ),
        ],
        entry_score: vec![
            line("2024학년도 50% 입결", record.entry.p50.latest(), None, ""),
            line("2024학년도 70% 입결", record.entry.p70.latest(), record.peer.entry_p70, ""),
            line(
                "2024학년도 70% 입결 변동(%)",
                record.entry.p70_change_pct,
                record.peer.entry_p70_change_pct,
                "",
            ),
            line(
                "3개년 평균 70% 입결",
                record.entry.p70_average_3y,
                record.peer.entry_p70_average_3y,
                "",
            ),
        ],
        fill_rate: vec![
            line("2024학년도 충원율", record.fill.rate.latest(), record.peer.fill_rate, "%"),
            line(
                "2024학년도 충원율 변동(%)",
                record.fill.change_pct,
                record.peer.fill_rate_change_pct,
                "",
            ),
            line(
                "3개년 평균 충원율",
                record.fill.average_3y,
                record.peer.fill_rate_average_3y,
                "%",
            ),
            line("2024학년도 추가합격자수", record.fill.waitlist_admits.latest(), None, ""),
        ],
        narrative,
    }
}

/// One block per distinct (university, track, track name) across the tiers,
/// in tier order, for programs with a loaded summary.
fn university_summaries(
    partition: &TierPartition,
    summaries: &UniversitySummaries,
) -> Vec<UniversitySummaryGroupView> {
    SUMMARY_TRACKS
        .into_iter()
        .map(|(track, track_label)| {
            let mut seen: HashSet<(&str, &str)> = HashSet::new();
            let entries = Tier::ALL
                .into_iter()
                .flat_map(|tier| partition.tier(tier).iter())
                .map(|program| program.record.as_ref())
                .filter(|record| record.track == track)
                .filter_map(|record| {
                    let track_name = record.track_name.as_deref()?;
                    if !seen.insert((record.university.as_str(), track_name)) {
                        return None;
                    }
                    let summary = summaries.lookup(record)?;
                    Some(UniversitySummaryView {
                        university: record.university.clone(),
                        track_name: track_name.to_string(),
                        summary: summary.to_string(),
                    })
                })
                .collect();
            UniversitySummaryGroupView {
                track_label,
                entries,
            }
        })
        .collect()
}

fn detail_tables(partition: &TierPartition) -> Vec<DetailTableView> {
    report_tracks()
        .into_iter()
        .map(|(track, track_label)| DetailTableView {
            track_label,
            rows: partition
                .iter()
                .flat_map(|(tier, programs)| programs.iter().map(move |program| (tier, program)))
                .filter(|(_, program)| program.record.track == track)
                .map(|(tier, program)| detail_row(tier, &program.record))
                .collect(),
        })
        .collect()
}

fn detail_row(tier: Tier, record: &ProgramRecord) -> DetailRowView {
    DetailRowView {
        program_id: record.id,
        tier_label: tier.label(),
        university: record.university.clone(),
        track_label: record.track.label().to_string(),
        track_name: record.track_name.clone(),
        unit: record.unit.clone(),
        quota: record.quota_current,
        min_test_summary: record
            .eligibility
            .min_test_summary
            .clone()
            .or_else(|| record.eligibility.min_test_requirement.clone()),
        competition_2024: record.competition.ratio.latest(),
        competition_2023: record.competition.ratio.previous(),
        entry_score_70: record.entry.p70.latest(),
        fill_rate: record.fill.rate.latest(),
    }
}

fn render_markdown(sections: &ReportSections) -> String {
    let mut out = String::new();
    let profile = &sections.profile;

    out.push_str("### 기본 정보\n\n");
    out.push_str("| 학교유형 | 희망계열 | 희망전공 | 내신성적 | 보정 내신 |\n");
    out.push_str("|---|---|---|---|---|\n");
    out.push_str(&format!(
        "| {} | {} | {} | {:.2} | {:.2} |\n\n",
        cell(&profile.school_type),
        cell(&join_or_dash(&profile.categories)),
        cell(&join_or_dash(&profile.detail_interests)),
        profile.score,
        profile.adjusted_score,
    ));

    out.push_str("### 지원 가능선\n\n|  |");
    for (_, track_label) in report_tracks() {
        out.push_str(&format!(" {track_label} |"));
    }
    out.push_str("\n|---|---|---|---|\n");
    for line in &sections.candidate_lines {
        out.push_str(&format!("| {} |", line.tier_label));
        for track in &line.tracks {
            out.push_str(&format!(" {} |", cell(&track.programs.join(", "))));
        }
        out.push('\n');
    }
    out.push('\n');

    out.push_str(&format!("### 종합 의견\n\n{}\n\n---\n\n", sections.overall_opinion));

    out.push_str(&format!(
        "### 상향 지원 BEST 3\n\n{REACH_INTRO}\n\n{}\n\n---\n\n",
        sections.reach_strategy
    ));

    if !sections.reach_analyses.is_empty() {
        out.push_str("각 상향 지원안을 자세히 살펴보겠습니다.\n\n");
    }
    let mut current_track = None;
    for analysis in &sections.reach_analyses {
        if current_track != Some(analysis.track_label) {
            out.push_str(&format!("### {} 전형 분석\n\n", analysis.track_label));
            current_track = Some(analysis.track_label);
        }
        out.push_str(&format!("#### {}. {}\n\n", analysis.rank, analysis.title));
        for (heading, lines) in [
            ("경쟁률 분석", &analysis.competition),
            ("입결 분석", &analysis.entry_score),
            ("충원율 분석", &analysis.fill_rate),
        ] {
            out.push_str(&format!("**{heading}**\n\n"));
            for line in lines {
                out.push_str(&format!(
                    "- {}: {} (계열 평균: {})\n",
                    line.label,
                    with_unit(line.value, line.unit),
                    with_unit(line.peer_average, line.unit),
                ));
            }
            out.push('\n');
        }
        out.push_str(&format!("**심층 분석**\n\n{}\n\n---\n\n", analysis.narrative));
    }

    out.push_str("### 지원 가능안 상세\n\n");
    for table in &sections.detail_tables {
        out.push_str(&format!("#### {} 전형\n\n", table.track_label));
        if table.rows.is_empty() {
            out.push_str("해당 전형의 지원 가능안이 없습니다.\n\n");
            continue;
        }
        out.push_str(
            "| 구분 | 대학명 | 전형구분 | 전형명 | 모집단위 | 2025 모집인원 | 수능최저 | 2024 경쟁률 | 2023 경쟁률 | 2024 입결70% | 2024 충원율(%) |\n",
        );
        out.push_str("|---|---|---|---|---|---|---|---|---|---|---|\n");
        for row in &table.rows {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                row.tier_label,
                cell(&row.university),
                cell(&row.track_label),
                cell(row.track_name.as_deref().unwrap_or("-")),
                cell(&row.unit),
                format_value(row.quota),
                cell(row.min_test_summary.as_deref().unwrap_or("-")),
                format_value(row.competition_2024),
                format_value(row.competition_2023),
                format_value(row.entry_score_70),
                format_value(row.fill_rate),
            ));
        }
        out.push('\n');
    }

    if !sections.university_summaries.is_empty() {
        out.push_str("---\n\n### 대학별 2025학년도 핵심정리\n\n");
        for group in &sections.university_summaries {
            out.push_str(&format!("#### {} 전형\n\n", group.track_label));
            for entry in &group.entries {
                out.push_str(&format!("**{} - {}**\n\n", entry.university, entry.track_name));
                for line in entry.summary.lines() {
                    out.push_str(&format!("> {}\n", line.trim_end()));
                }
                out.push_str("\n---\n\n");
            }
        }
    }

    out
}

fn with_unit(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(_) => format!("{}{unit}", format_value(value)),
        None => format_value(value),
    }
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn join_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}
