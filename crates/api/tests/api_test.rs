// End-to-end tests against a live ApiServer on an ephemeral port.

use api::ApiServer;
use reqwest::StatusCode;
use serde_json::{Value, json};
use services::{AppServices, Clock};
use storage::sqlite::StoreOptions;
use tactile_core::time::fixed_now;

async fn start() -> (ApiServer, reqwest::Client) {
    let services = AppServices::in_memory(Clock::fixed(fixed_now()));
    let server = ApiServer::start("127.0.0.1:0", services).await.unwrap();
    (server, reqwest::Client::new())
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let resp = client.post(url).json(&body).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

async fn get(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let resp = client.get(url).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

async fn transition(
    server: &ApiServer,
    client: &reqwest::Client,
    action: &str,
    id: &str,
) -> (StatusCode, Value) {
    let url = server.url(&format!("/assessment/{action}"));
    post(client, url, json!({ "studentId": id })).await
}

async fn register(server: &ApiServer, client: &reqwest::Client, id: &str, first: &str) {
    let (status, _) = post(
        client,
        server.url("/students"),
        json!({ "studentId": id, "firstName": first, "lastName": "Lee" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn registered_student_reads_back_with_zero_metrics() {
    let (server, client) = start().await;

    let (status, body) = post(
        &client,
        server.url("/students"),
        json!({ "firstName": "Ana", "lastName": "Lee", "studentId": "STU9" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["student_id"], "STU9");

    let (status, body) = get(&client, server.url("/students/STU9")).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["first_name"], "Ana");
    assert_eq!(data["last_name"], "Lee");
    assert_eq!(data["total_sessions"], 0);
    assert_eq!(data["average_score"], 0);
    assert_eq!(data["shape_progress"].as_object().unwrap().len(), 4);

    let (status, body) = post(
        &client,
        server.url("/students"),
        json!({ "firstName": "Ana", "lastName": "Lee", "studentId": "STU9" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("STU9"));

    server.shutdown().await;
}

#[tokio::test]
async fn registration_without_names_is_rejected() {
    let (server, client) = start().await;

    let (status, body) =
        post(&client, server.url("/students"), json!({ "studentId": "STU1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let resp = client
        .post(server.url("/students"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    server.shutdown().await;
}

#[tokio::test]
async fn update_with_only_email_keeps_other_fields() {
    let (server, client) = start().await;
    register(&server, &client, "STU1", "Ana").await;

    let resp = client
        .put(server.url("/students/STU1"))
        .json(&json!({ "email": "ana@example.org" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["email"], "ana@example.org");
    assert_eq!(body["data"]["first_name"], "Ana");
    assert_eq!(body["data"]["last_name"], "Lee");

    let resp = client
        .put(server.url("/students/GHOST"))
        .json(&json!({ "email": "x@example.org" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    server.shutdown().await;
}

#[tokio::test]
async fn session_listing_filters_and_limits() {
    let (server, client) = start().await;
    register(&server, &client, "STU1", "Ana").await;
    register(&server, &client, "STU2", "Ben").await;

    for (id, shape, text) in [
        ("STU1", "circle", "First."),
        ("STU1", "square", "Second."),
        ("STU1", "circle", "Third."),
        ("STU2", "circle", "Other."),
    ] {
        let (status, body) = post(
            &client,
            server.url("/sessions"),
            json!({ "studentId": id, "shape": shape, "explanation": text }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["shape"], shape);
    }

    let (status, body) = get(
        &client,
        server.url("/sessions?studentId=STU1&shape=circle&limit=1"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["explanation"], "Third.");
    assert_eq!(body["data"][0]["student_id"], "STU1");

    let (status, _) = get(&client, server.url("/sessions?shape=hexagon")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(
        &client,
        server.url("/sessions"),
        json!({ "studentId": "GHOST", "shape": "circle", "explanation": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.shutdown().await;
}

#[tokio::test]
async fn assessment_lifecycle_over_http() {
    let (server, client) = start().await;
    register(&server, &client, "STU1", "Ana").await;

    let (status, body) = transition(&server, &client, "start", "STU1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "active");

    let (status, body) = transition(&server, &client, "start", "STU1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, body) = get(&client, server.url("/assessment/current")).await;
    assert_eq!(body["data"]["current_student"]["student_name"], "Ana Lee");

    for outcome in ["Correct", "Correct", "Incorrect"] {
        let (status, body) = post(
            &client,
            server.url("/assessment/questions"),
            json!({
                "studentId": "STU1",
                "question": "Which shape is this?",
                "answer": "circle",
                "assessment": outcome
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["is_correct"], outcome == "Correct");
    }

    let (status, body) = transition(&server, &client, "complete", "STU1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["questions_asked"], 3);
    assert_eq!(body["data"]["accuracy"], 67);

    let (_, body) = get(&client, server.url("/assessment/current")).await;
    assert!(body["data"]["current_student"].is_null());

    let (_, body) = get(&client, server.url("/assessment/status/STU1")).await;
    assert_eq!(body["data"]["assessed_today"], true);
    assert!(body["data"]["current_session"].is_null());

    let (status, _) = transition(&server, &client, "start", "STU1").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) =
        get(&client, server.url("/assessment/sessions?studentId=STU1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);

    let (_, body) = get(&client, server.url("/students/STU1")).await;
    assert_eq!(body["data"]["average_score"], 67);
    assert_eq!(body["data"]["status"], "needs_attention");

    server.shutdown().await;
}

#[tokio::test]
async fn missing_targets_and_inputs_map_to_4xx() {
    let (server, client) = start().await;
    register(&server, &client, "STU1", "Ana").await;

    let (status, body) = get(&client, server.url("/students/GHOST")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let resp = client.delete(server.url("/students/GHOST")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let (status, _) = transition(&server, &client, "start", "GHOST").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = transition(&server, &client, "complete", "STU1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&client, server.url("/assessment/sessions")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "studentId is required");

    let (status, _) = get(&client, server.url("/students?sort=shuffle")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(&client, server.url("/reports/overview?period=decade")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    server.shutdown().await;
}

#[tokio::test]
async fn unknown_student_progress_is_all_zero() {
    let (server, client) = start().await;

    let (status, body) = get(&client, server.url("/students/GHOST/progress")).await;
    assert_eq!(status, StatusCode::OK);
    let shapes = body["data"].as_object().unwrap();
    assert_eq!(shapes.len(), 4);
    for shape in ["circle", "square", "triangle", "rectangle"] {
        assert_eq!(shapes[shape]["sessions"], 0);
        assert_eq!(shapes[shape]["progress"], 0);
    }

    server.shutdown().await;
}

#[tokio::test]
async fn deleting_a_student_removes_their_history() {
    let (server, client) = start().await;
    register(&server, &client, "STU1", "Ana").await;
    post(
        &client,
        server.url("/sessions"),
        json!({ "studentId": "STU1", "shape": "square", "explanation": "Four sides." }),
    )
    .await;

    let resp = client.delete(server.url("/students/STU1")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["deleted"], true);

    let (_, body) = get(&client, server.url("/sessions?studentId=STU1")).await;
    assert_eq!(body["total"], 0);
    let (_, body) = get(&client, server.url("/students")).await;
    assert_eq!(body["total"], 0);

    server.shutdown().await;
}

#[tokio::test]
async fn overview_report_defaults_to_month() {
    let (server, client) = start().await;
    register(&server, &client, "STU1", "Ana").await;

    let (status, body) = get(&client, server.url("/reports/overview")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["period"], "month");
    assert_eq!(body["data"]["total_students"], 1);
    assert_eq!(body["data"]["active_students"], 0);

    server.shutdown().await;
}

#[tokio::test]
async fn init_db_reports_and_creates_tables() {
    let services = AppServices::new_sqlite(
        "sqlite:file:memdb_api_init?mode=memory&cache=shared",
        StoreOptions::default(),
        Clock::fixed(fixed_now()),
    )
    .await
    .unwrap();
    let server = ApiServer::start("127.0.0.1:0", services).await.unwrap();
    let client = reqwest::Client::new();

    let (status, body) = get(&client, server.url("/init-db")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["ready"], true);

    let (status, body) = post(&client, server.url("/init-db"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["students"], true);
    assert_eq!(body["data"]["active_sessions"], true);

    server.shutdown().await;
}
