use super::narrative::{NarrativeKind, NarrativeRequest};
use crate::workflows::catalog::domain::{ProgramRecord, CURRENT_CYCLE};
use crate::workflows::screening::domain::StudentProfile;
use crate::workflows::screening::scoring::adjust;
use crate::workflows::screening::tiering::{ScoredProgram, Tier, TierPartition};

pub(crate) const SYSTEM_PROMPT: &str = "You write admissions consulting reports from university admission \
statistics. Use the consultant guidance included in the prompt when it is present. Answer in Korean.";

pub(crate) fn overall_opinion(
    profile: &StudentProfile,
    partition: &TierPartition,
    expert_notes: Option<&str>,
) -> NarrativeRequest {
    let mut prompt = String::new();
    prompt.push_str(&format!(
        "{CURRENT_CYCLE}학년도 수시 지원을 준비하는 학생의 종합 의견을 작성해 주세요.\n\n"
    ));
    push_notes(&mut prompt, expert_notes);
    prompt.push_str("학생 정보:\n");
    prompt.push_str(&student_summary(profile));
    prompt.push_str("\n지원 가능 목록:\n");
    prompt.push_str(&candidate_list(partition));
    prompt.push_str(
        "\n작성 기준:\n\
         1. 현재 내신과 각 구간 대학의 입결 차이를 짚어 주세요.\n\
         2. 상향, 적정, 안정 구간의 균형을 제안하고 구간별로 한두 곳을 추천해 주세요.\n\
         3. 추천 대학의 3개년 경쟁률, 입결, 충원율 흐름을 짧게 언급해 주세요.\n\
         4. 두세 문단, 200단어 이내로 작성해 주세요.\n",
    );
    request(NarrativeKind::OverallOpinion, prompt)
}

pub(crate) fn reach_strategy(
    reach: &[ScoredProgram],
    expert_notes: Option<&str>,
) -> NarrativeRequest {
    let mut prompt = String::from("아래 상향 지원 후보에 대한 전략 분석을 작성해 주세요.\n\n");
    push_notes(&mut prompt, expert_notes);
    prompt.push_str("상향 지원 후보:\n");
    for program in reach {
        prompt.push_str(&program_facts(&program.record));
    }
    prompt.push_str(
        "\n작성 기준:\n\
         1. 3개년 경쟁률, 입결, 충원율 추이와 격년 변동 여부를 요약해 주세요.\n\
         2. 경쟁률이 6대 1 이하인 곳은 따로 언급해 주세요.\n\
         3. 모집인원이 40% 이상 변한 곳은 그 영향을 설명해 주세요.\n\
         4. 50% 컷과 70% 컷의 차이가 큰 곳은 그 의미를 설명해 주세요.\n\
         5. 대학별로 한 문단씩, 100단어 이내로 작성해 주세요.\n",
    );
    request(NarrativeKind::ReachStrategy, prompt)
}

pub(crate) fn program_analysis(
    record: &ProgramRecord,
    expert_notes: Option<&str>,
) -> NarrativeRequest {
    let mut prompt = format!(
        "{} {} {} 전형의 상세 분석을 작성해 주세요.\n\n",
        record.university, record.unit, record.track
    );
    push_notes(&mut prompt, expert_notes);
    prompt.push_str("입시 데이터:\n");
    prompt.push_str(&program_facts(record));
    prompt.push_str(
        "\n작성 기준:\n\
         1. 경쟁률, 입결, 충원율의 3개년 추이와 주기적 변동을 분석해 주세요.\n\
         2. 경쟁률이 6대 1 이하이거나 10대 1 이상이면 다음 해 변동 가능성을 예측해 주세요.\n\
         3. 모집인원 변화와 수능 최저 기준 변화의 영향을 설명해 주세요.\n\
         4. 한 문단, 300단어 이내로 작성해 주세요.\n",
    );
    request(NarrativeKind::ProgramAnalysis, prompt)
}

fn request(kind: NarrativeKind, prompt: String) -> NarrativeRequest {
    NarrativeRequest {
        kind,
        system: SYSTEM_PROMPT.to_string(),
        prompt,
    }
}

fn push_notes(prompt: &mut String, expert_notes: Option<&str>) {
    if let Some(notes) = expert_notes.map(str::trim).filter(|notes| !notes.is_empty()) {
        prompt.push_str("컨설턴트 참고 자료:\n");
        prompt.push_str(notes);
        prompt.push_str("\n\n");
    }
}

fn student_summary(profile: &StudentProfile) -> String {
    let adjusted = adjust(profile.score, &profile.school_type);
    format!(
        "- 학교유형: {}\n- 희망계열: {}\n- 희망전공: {}\n- 내신: {:.2} (보정 {:.2})\n",
        profile.school_type,
        join_or_dash(&profile.categories),
        join_or_dash(&profile.detail_interests),
        profile.score,
        adjusted,
    )
}

fn candidate_list(partition: &TierPartition) -> String {
    let mut list = String::new();
    for tier in Tier::ALL {
        list.push_str(&format!("{}:\n", tier.label()));
        for program in partition.tier(tier) {
            list.push_str(&format!(
                "- {} ({})\n",
                program.record.display_name(),
                program.record.track
            ));
        }
    }
    list
}

fn program_facts(record: &ProgramRecord) -> String {
    let series = |values: &[Option<f64>; 3]| {
        values
            .iter()
            .map(|value| super::format_value(*value))
            .collect::<Vec<_>>()
            .join(" / ")
    };
    format!(
        "- {} ({})\n  모집인원(2022/2023/2024 → {CURRENT_CYCLE}): {} → {}\n  경쟁률: {}\n  입결50%: {}\n  입결70%: {}\n  충원율: {}\n  수능최저: {}\n",
        record.display_name(),
        record.track,
        series(&record.quota.0),
        super::format_value(record.quota_current),
        series(&record.competition.ratio.0),
        series(&record.entry.p50.0),
        series(&record.entry.p70.0),
        series(&record.fill.rate.0),
        record
            .eligibility
            .min_test_summary
            .as_deref()
            .or(record.eligibility.min_test_requirement.as_deref())
            .unwrap_or("-"),
    )
}

fn join_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}
