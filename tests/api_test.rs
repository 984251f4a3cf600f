use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use recruitment_scheduler::{
    config::Environment,
    database::MemoryStore,
    routes,
    services::{
        calendar_service::DisabledCalendar,
        notification_service::{NotificationService, UnconfiguredTransport},
    },
    AppState,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

fn app() -> Router {
    let state = AppState::with_integrations(
        Arc::new(MemoryStore::new()),
        Arc::new(DisabledCalendar),
        NotificationService::new(
            Arc::new(UnconfiguredTransport),
            Environment::Development,
            false,
        ),
        "https://meet.google.com".to_string(),
        60,
    );
    routes::router().with_state(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}

fn id_of(value: &JsonValue) -> String {
    value["id"].as_str().expect("id field").to_string()
}

async fn create_position(app: &Router, title: &str, requirements: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/positions",
        Some(json!({
            "title": title,
            "department": "Engineering",
            "description": "Remote friendly team",
            "requirements": requirements,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "OPEN");
    id_of(&body)
}

async fn apply(app: &Router, position_id: &str, email: &str, skills: JsonValue) -> JsonValue {
    let (status, body) = send(
        app,
        "POST",
        "/api/applications",
        Some(json!({
            "position_id": position_id,
            "resume_url": "https://files.example.com/cv.pdf",
            "name": "Applicant",
            "email": email,
            "skills": skills,
            "tenth": { "percentage": "82%" },
            "twelfth": { "percentage": "76" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn recruitment_flow_end_to_end() {
    let app = app();
    let position_id =
        create_position(&app, "Platform Engineer", "Senior engineer, Rust, SQL, Docker").await;

    let first = apply(&app, &position_id, "ana@example.com", json!(["Rust", "SQL"])).await;
    let second = apply(&app, &position_id, "ben@example.com", json!(["Docker"])).await;
    assert_eq!(first["status"], "PENDING");
    assert_eq!(first["match_score"], 67);
    let first_id = id_of(&first);
    let second_id = id_of(&second);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/applications/{}/shortlist", first_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SHORTLISTED");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/applications/{}/shortlist", first_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let schedule = json!({
        "application_ids": [first_id, second_id],
        "scheduled_for": "2026-11-03T15:00:00Z",
        "use_google_calendar": false,
        "send_notification": false,
        "scheduled_by": "recruiter@example.com",
    });
    let (status, body) = send(&app, "POST", "/api/interviews/schedule", Some(schedule.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let interviews = body["interviews"].as_array().expect("interviews array");
    assert_eq!(interviews.len(), 2);
    assert_eq!(interviews[0]["duration_minutes"], 60);
    assert_eq!(interviews[0]["status"], "Scheduled");
    assert_eq!(body["location"]["kind"], "synthesized");
    let url = body["location"]["url"].as_str().unwrap();
    assert!(url.starts_with("https://meet.google.com/mock-"));
    let interview_id = id_of(&interviews[0]);

    let (status, body) = send(&app, "POST", "/api/interviews/schedule", Some(schedule)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["invalid_count"], 2);
    assert_eq!(body["application_ids"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", "/api/interviews?status=Scheduled", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = send(&app, "GET", "/api/interviews?date=2026-11-03", None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);
    let (_, body) = send(&app, "GET", "/api/interviews?date=2026-11-04", None).await;
    assert!(body.as_array().unwrap().is_empty());
    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/interviews?position_id={}", position_id),
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", &format!("/api/interviews/{}", interview_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["application"]["status"], "INTERVIEW_SCHEDULED");
    assert!(body["candidate"]["email"].is_string());

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/interviews/{}", interview_id),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No updates provided");

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/interviews/{}", interview_id),
        Some(json!({ "status": "No Show", "notes": "Did not join" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "No Show");
    assert_eq!(body["notes"], "Did not join");

    let (status, body) = send(&app, "GET", "/api/applications/pipeline", None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    for entry in entries {
        assert_eq!(entry["status"], "Interview Scheduled");
        assert_eq!(entry["position"], "Platform Engineer");
    }

    let (status, body) = send(&app, "GET", "/api/candidates/rankings", None).await;
    assert_eq!(status, StatusCode::OK);
    let ranked = body.as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    let top = ranked[0]["ranking_score"].as_f64().unwrap();
    let bottom = ranked[1]["ranking_score"].as_f64().unwrap();
    assert!(top >= bottom);

    let candidate_id = first["candidate_id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/candidates/{}/ranking", candidate_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/positions/{}/candidates", position_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[0]["match_score"], 67);
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/positions",
        Some(json!({ "title": "", "requirements": "Rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/api/positions",
        Some(json!({ "title": "Dev\r\nBcc: someone@example.net", "requirements": "Rust" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let position_id = create_position(&app, "Analyst", "SQL").await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/applications",
        Some(json!({
            "position_id": position_id,
            "resume_url": "https://files.example.com/cv.pdf",
            "name": "Someone",
            "email": "not-an-email",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/applications",
        Some(json!({
            "position_id": Uuid::new_v4(),
            "resume_url": "https://files.example.com/cv.pdf",
            "name": "Someone",
            "email": "someone@example.com",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        "POST",
        "/api/interviews/schedule",
        Some(json!({
            "application_ids": [],
            "scheduled_for": "2026-11-03T15:00:00Z",
            "scheduled_by": "recruiter@example.com",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No applications selected");

    let application = apply(&app, &position_id, "c@example.com", json!(["SQL"])).await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/interviews/schedule",
        Some(json!({
            "application_ids": [id_of(&application)],
            "scheduled_for": "2026-11-03T15:00:00Z",
            "duration_minutes": 0,
            "scheduled_by": "recruiter@example.com",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/interviews/schedule",
        Some(json!({
            "application_ids": [Uuid::new_v4()],
            "scheduled_for": "2026-11-03T15:00:00Z",
            "scheduled_by": "recruiter@example.com",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_resources_are_not_found() {
    let app = app();
    let missing = Uuid::new_v4();

    for uri in [
        format!("/api/interviews/{}", missing),
        format!("/api/candidates/{}/ranking", missing),
        format!("/api/positions/{}/candidates", missing),
        format!("/api/positions/{}/analysis", missing),
    ] {
        let (status, body) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/applications/{}/reject", missing),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn position_analysis_with_comparison() {
    let app = app();
    let backend = create_position(&app, "Backend Engineer", "Senior engineer, Rust, SQL, Docker").await;
    let data = create_position(&app, "Data Engineer", "Lead role, Python, SQL, Docker").await;

    let (status, body) = send(&app, "GET", &format!("/api/positions/{}/analysis", backend), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analysis"]["experience_level"], "Senior");
    assert_eq!(body["analysis"]["remote_option"], true);
    assert!(body["comparison"].is_null());

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/positions/{}/analysis?compare_with={}", backend, data),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let common: Vec<&str> = body["comparison"]["common_skills"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert!(common.contains(&"sql"));
    assert!(common.contains(&"docker"));

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/positions/{}/analysis?compare_with={}", backend, Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
