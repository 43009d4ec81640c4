use super::common::*;
use crate::workflows::catalog::domain::ProgramId;
use crate::workflows::screening::criteria::{
    CascadePlan, CriteriaFilter, CriterionKey, FilterCriteria, TierCriteria,
};
use crate::workflows::screening::pipeline::{SelectionRequest, SortSpec, Stage, TierSorts};
use crate::workflows::screening::ranking::{SortCriterion, SortMetric, SortOrder};
use crate::workflows::screening::repository::{RepositoryError, SessionId, SessionRepository};
use crate::workflows::screening::service::{ReportRequest, ScreeningServiceError};
use crate::workflows::screening::tiering::ScoredProgram;

fn ids(programs: &[ScoredProgram]) -> Vec<u32> {
    programs.iter().map(|program| program.record.id.0).collect()
}

fn fill_rate_plan() -> CascadePlan {
    let criteria = FilterCriteria::default()
        .with_number(CriterionKey::FillRate, 40.0)
        .with_number(CriterionKey::FillRateAverage3y, 30.0);
    CascadePlan {
        filters: vec![CriteriaFilter::FillRate],
        criteria: TierCriteria::uniform(criteria),
        ..CascadePlan::default()
    }
}

#[test]
fn start_tiers_catalog_and_stores_session() {
    let (service, repository) = build_service();

    let session = service.start(profile()).expect("session starts");

    assert!(session.id.0.starts_with("scr-"));
    let partition = session.pipeline.current_partition();
    assert_eq!(ids(&partition.reach), vec![0, 1]);
    assert_eq!(ids(&partition.matched), vec![2]);
    assert_eq!(ids(&partition.safe), vec![3]);
    assert!(repository
        .fetch(&session.id)
        .expect("fetch succeeds")
        .is_some());
}

#[test]
fn start_rejects_out_of_range_scores() {
    let (service, _) = build_service();
    let mut profile = profile();
    profile.score = 0.4;

    match service.start(profile) {
        Err(ScreeningServiceError::InvalidProfile(message)) => assert!(message.contains("score")),
        other => panic!("expected invalid profile, got {other:?}"),
    }
}

#[test]
fn stages_advance_and_persist() {
    let (service, _) = build_service();
    let session = service.start(profile()).expect("session starts");

    let filtered = service
        .apply_criteria(&session.id, fill_rate_plan())
        .expect("criteria apply");
    assert_eq!(filtered.pipeline.stage(), Stage::Filtered);
    assert_eq!(ids(&filtered.pipeline.current_partition().reach), vec![0]);
    assert_eq!(ids(&filtered.pipeline.current_partition().matched), vec![2]);
    assert!(filtered.pipeline.current_partition().safe.is_empty());

    let sorts = TierSorts::uniform(SortSpec::Typed {
        criterion: SortCriterion::Metric(SortMetric::FillRate2024),
        order: SortOrder::Descending,
    });
    let shortlisted = service.shortlist(&session.id, sorts).expect("shortlist");
    assert_eq!(shortlisted.pipeline.stage(), Stage::Shortlisted);

    let selection = SelectionRequest {
        reach: Some(vec![ProgramId(0)]),
        ..SelectionRequest::default()
    };
    let finalized = service.select(&session.id, &selection).expect("selection");
    assert_eq!(finalized.pipeline.stage(), Stage::Finalized);
    assert!(finalized.updated_at >= finalized.created_at);

    let stored = service.get(&session.id).expect("session stored");
    assert_eq!(stored.pipeline.stage(), Stage::Finalized);
}

#[test]
fn unknown_selection_leaves_session_unchanged() {
    let (service, _) = build_service();
    let session = service.start(profile()).expect("session starts");
    service
        .apply_criteria(&session.id, fill_rate_plan())
        .expect("criteria apply");

    let selection = SelectionRequest {
        reach: Some(vec![ProgramId(1)]),
        ..SelectionRequest::default()
    };
    match service.select(&session.id, &selection) {
        Err(ScreeningServiceError::Pipeline(_)) => {}
        other => panic!("expected pipeline error, got {other:?}"),
    }

    let stored = service.get(&session.id).expect("session stored");
    assert_eq!(stored.pipeline.stage(), Stage::Filtered);
}

#[test]
fn missing_session_is_not_found() {
    let (service, _) = build_service();

    match service.get(&SessionId("scr-missing".to_string())) {
        Err(ScreeningServiceError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn one_shot_report_runs_every_requested_stage() {
    let (service, _) = build_service();
    let request = ReportRequest {
        profile: profile(),
        plan: Some(fill_rate_plan()),
        sorts: None,
        selection: None,
    };

    let response = service.report(&request).expect("report builds");

    assert_eq!(response.stage, Stage::Filtered);
    assert_eq!(response.tiers.reach.len(), 1);
    assert!(response.report.markdown.contains("연세대학교 경영학과"));
    assert!(response.report.markdown.contains("종합 의견 초안"));
    assert!(response.report.warnings.is_empty());
}

#[test]
fn session_report_covers_latest_stage() {
    let (service, _) = build_service();
    let session = service.start(profile()).expect("session starts");

    let report = service.session_report(&session.id).expect("report builds");

    assert!(report.markdown.contains("고려대학교 경제학과"));
    assert_eq!(report.sections.reach_analyses.len(), 2);
}
