use super::common::*;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::screening::router::{screening_router, start_handler};
use crate::workflows::screening::service::ScreeningService;

fn router() -> axum::Router {
    let (service, _) = build_service();
    screening_router(Arc::new(service))
}

async fn start_session(router: &axum::Router) -> String {
    let response = router
        .clone()
        .oneshot(json_post(
            "/api/v1/screening/sessions",
            &json!({ "score": 1.5, "school_type": "일반고" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    payload["session_id"]
        .as_str()
        .expect("session id")
        .to_string()
}

#[tokio::test]
async fn start_route_returns_tiered_session() {
    let router = router();
    let response = router
        .oneshot(json_post(
            "/api/v1/screening/sessions",
            &json!({ "score": 1.5, "school_type": "일반고", "gender": "여" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["stage"], "tiered");
    assert_eq!(payload["tiers"]["reach"].as_array().expect("reach").len(), 2);
    assert_eq!(payload["tiers"]["match"][0]["university"], "한양대학교");
    assert!(payload.get("warnings").is_none());
}

#[tokio::test]
async fn start_handler_rejects_invalid_profiles() {
    let (service, _) = build_service();
    let response = start_handler(
        State(Arc::new(service)),
        axum::Json(crate::workflows::screening::domain::StudentProfile::new(
            12.0,
            crate::workflows::screening::domain::SchoolType::General,
        )),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn start_handler_returns_internal_error_when_store_is_down() {
    let service = Arc::new(ScreeningService::new(
        Arc::new(UnavailableRepository),
        Arc::new(StubNarrator),
        datasets(),
    ));

    let response = start_handler::<UnavailableRepository, StubNarrator>(
        State(service),
        axum::Json(profile()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .contains("store offline"));
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (service, _) = build_service();
    let response = crate::workflows::screening::router::session_handler(
        State(Arc::new(service)),
        Path("scr-404".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn criteria_and_selection_routes_follow_the_session() {
    let router = router();
    let session_id = start_session(&router).await;

    let response = router
        .clone()
        .oneshot(json_post(
            &format!("/api/v1/screening/sessions/{session_id}/criteria"),
            &json!({
                "filters": ["fill_rate"],
                "criteria": {
                    "reach": { "2024년_충원율(%)": 40, "3개년_충원율_평균": "30" },
                    "match": { "fill_rate": 40, "fill_rate_average_3y": 30 },
                    "safe": { "fill_rate": 40, "fill_rate_average_3y": 30 }
                }
            }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["stage"], "filtered");
    assert_eq!(payload["tiers"]["reach"][0]["id"], 0);
    assert_eq!(payload["tiers"]["reach"].as_array().expect("reach").len(), 1);

    let response = router
        .clone()
        .oneshot(json_post(
            &format!("/api/v1/screening/sessions/{session_id}/selection"),
            &json!({ "reach": [1] }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = router
        .clone()
        .oneshot(json_post(
            &format!("/api/v1/screening/sessions/{session_id}/selection"),
            &json!({ "reach": [0] }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["stage"], "finalized");

    let response = router
        .oneshot(
            Request::get(format!("/api/v1/screening/sessions/{session_id}"))
                .body(axum::body::Body::empty())
                .expect("build request"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["stage_label"], "최종 선택");
}

#[tokio::test]
async fn report_route_returns_markdown_and_sections() {
    let router = router();
    let response = router
        .oneshot(json_post(
            "/api/v1/screening/report",
            &json!({
                "profile": { "score": 1.5, "school_type": "일반고" },
                "sorts": {
                    "reach": { "key": "2024년_경쟁률", "option": "내림차순" }
                }
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["stage"], "shortlisted");
    let markdown = payload["report"]["markdown"].as_str().expect("markdown");
    assert!(markdown.contains("### 지원 가능선"));
    assert!(markdown.contains("건국대학교 화학과"));
    assert_eq!(
        payload["report"]["sections"]["candidate_lines"][0]["tier_label"],
        "상향"
    );
}
