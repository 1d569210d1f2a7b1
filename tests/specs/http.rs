// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box HTTP specs against a served registry.

use crate::prelude::*;
use serde_json::{json, Value};

fn create_body(id: &str) -> Value {
    json!({
        "id": id,
        "owner": "u1",
        "source_ref": format!("/incoming/{id}.flac"),
        "display_name": format!("{id}.flac"),
    })
}

async fn create_job(client: &reqwest::Client, server: &TestServer, id: &str) -> Value {
    let response = client
        .post(server.url("/api/jobs"))
        .json(&create_body(id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn create_get_and_list_round_trip() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let created = create_job(&client, &server, "j1").await;
    assert_eq!(created["stage"], "submitted");
    assert_eq!(created["owner"], "u1");

    let fetched: Value = client
        .get(server.url("/api/jobs/j1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["id"], "j1");

    let listed: Value = client
        .get(server.url("/api/jobs?owner=u1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_create_conflicts_and_missing_job_is_404() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    create_job(&client, &server, "j1").await;
    let duplicate = client
        .post(server.url("/api/jobs"))
        .json(&create_body("j1"))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);
    let body: Value = duplicate.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    let missing = client
        .get(server.url("/api/jobs/ghost"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn transition_via_put_enforces_the_state_machine() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();
    create_job(&client, &server, "j1").await;

    let advanced = client
        .put(server.url("/api/jobs/j1"))
        .json(&json!({"stage": "categorizing", "bag": {"genre": "jazz"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(advanced.status(), 200);
    let job: Value = advanced.json().await.unwrap();
    assert_eq!(job["stage"], "categorizing");
    assert_eq!(job["bag"]["genre"], "jazz");

    let illegal = client
        .put(server.url("/api/jobs/j1"))
        .json(&json!({"stage": "splitting"}))
        .send()
        .await
        .unwrap();
    assert_eq!(illegal.status(), 409);
    let body: Value = illegal.json().await.unwrap();
    assert_eq!(body["error"], "illegal_transition");

    let unknown_stage = client
        .put(server.url("/api/jobs/j1"))
        .json(&json!({"stage": "warp"}))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_stage.status(), 400);
}

#[tokio::test]
async fn claim_and_candidates_drive_the_worker_loop() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();
    create_job(&client, &server, "j1").await;

    let candidates: Value = client
        .get(server.url("/api/jobs/candidates?stage=submitted"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(candidates.as_array().unwrap().len(), 1);

    let claim = json!({"from_stage": "submitted", "to_stage": "categorizing"});
    let won = client
        .post(server.url("/api/jobs/j1/claim"))
        .json(&claim)
        .send()
        .await
        .unwrap();
    assert_eq!(won.status(), 200);

    let lost = client
        .post(server.url("/api/jobs/j1/claim"))
        .json(&claim)
        .send()
        .await
        .unwrap();
    assert_eq!(lost.status(), 409);
    let body: Value = lost.json().await.unwrap();
    assert_eq!(body["error"], "contended");
}

#[tokio::test]
async fn retry_and_cancel_endpoints() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();
    create_job(&client, &server, "j1").await;

    // Retry of an active job is a 400
    let premature = client
        .post(server.url("/api/jobs/j1/retry"))
        .send()
        .await
        .unwrap();
    assert_eq!(premature.status(), 400);

    client
        .put(server.url("/api/jobs/j1"))
        .json(&json!({"stage": "failed", "error": "decoder crashed"}))
        .send()
        .await
        .unwrap();

    let retried = client
        .post(server.url("/api/jobs/j1/retry"))
        .send()
        .await
        .unwrap();
    assert_eq!(retried.status(), 200);
    let job: Value = retried.json().await.unwrap();
    assert_eq!(job["stage"], "submitted");

    let canceled = client
        .post(server.url("/api/jobs/j1/cancel"))
        .send()
        .await
        .unwrap();
    assert_eq!(canceled.status(), 200);

    // Idempotent second cancel
    let again = client
        .post(server.url("/api/jobs/j1/cancel"))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 200);

    let history: Value = client
        .get(server.url("/api/jobs/j1/history"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    // submitted, failed, submitted (retry), canceled
    assert_eq!(history.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn pause_gates_the_surface_until_resume() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();
    create_job(&client, &server, "j1").await;

    let paused = client
        .post(server.url("/api/pause"))
        .send()
        .await
        .unwrap();
    assert_eq!(paused.status(), 200);

    let refused = client
        .post(server.url("/api/jobs"))
        .json(&create_body("j2"))
        .send()
        .await
        .unwrap();
    assert_eq!(refused.status(), 503);
    let body: Value = refused.json().await.unwrap();
    assert_eq!(body["error"], "pipeline_paused");

    // Cancel drains while paused
    let canceled = client
        .post(server.url("/api/jobs/j1/cancel"))
        .send()
        .await
        .unwrap();
    assert_eq!(canceled.status(), 200);

    client
        .post(server.url("/api/resume"))
        .send()
        .await
        .unwrap();
    create_job(&client, &server, "j2").await;
}

#[tokio::test]
async fn stats_and_health_report_the_registry() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();
    create_job(&client, &server, "j1").await;

    let stats: Value = client
        .get(server.url("/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["active"], 1);
    assert_eq!(stats["by_stage"]["submitted"], 1);

    let health: Value = client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["poll_interval_secs"], 5);
}

#[tokio::test]
async fn trace_id_is_echoed_or_generated() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/jobs"))
        .header("X-Trace-ID", "trace-123")
        .json(&create_body("j1"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("x-trace-id").unwrap(),
        "trace-123"
    );
    // The supplied trace becomes the job's correlation id
    let job: Value = response.json().await.unwrap();
    assert_eq!(job["trace_id"], "trace-123");

    let bare = client
        .get(server.url("/api/jobs/j1"))
        .send()
        .await
        .unwrap();
    assert!(!bare
        .headers()
        .get("x-trace-id")
        .unwrap()
        .to_str()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/jobs"))
        .json(&json!({"owner": "u1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
}
