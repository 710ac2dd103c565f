//! HTTP control-surface tests, driving the router in-process.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use driftjack::config::Config;
use driftjack::server::{router, AppState};
use driftjack::vehicle::{
    SimConnector, SimVehicle, Vehicle, Waypoint, GLITCH_EAST_PARAM, GLITCH_NORTH_PARAM,
};

fn test_config() -> Config {
    let mut config = Config::default();
    config.attack.drift_step_interval_ms = 2;
    config.attack.monitor_interval_ms = 5;
    config
}

fn app_with_vehicle(sim: Arc<SimVehicle>) -> Router {
    let connector = Arc::new(SimConnector::with_vehicle(sim));
    router(Arc::new(AppState::new(test_config(), connector)))
}

fn app() -> Router {
    let connector = Arc::new(SimConnector::new());
    router(Arc::new(AppState::new(test_config(), connector)))
}

async fn get(app: &Router, path: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::post(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Polls `GET /status` until `check` passes or the deadline expires.
async fn wait_for_status<F: Fn(&Value) -> bool>(app: &Router, check: F, what: &str) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let (_, body) = get(app, "/status").await;
        if check(&body) {
            return body;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}; last status: {body}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn status_reports_disconnected_before_connect() {
    let app = app();
    let (status, body) = get(&app, "/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "connected": false }));
}

#[tokio::test]
async fn connect_defaults_to_local_sitl_address() {
    let app = app();
    let (status, body) = post(&app, "/connect", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert!(
        body["message"].as_str().unwrap().contains("127.0.0.1:14550"),
        "message: {}",
        body["message"]
    );

    let (_, status_body) = get(&app, "/status").await;
    assert_eq!(status_body["connected"], json!(true));
    assert_eq!(status_body["armed"], json!(false));
    assert_eq!(status_body["gps_fix"], json!(3));
}

#[tokio::test]
async fn connect_rejects_blank_address() {
    let app = app();
    let (status, body) = post(&app, "/connect", json!({ "ip": "  " })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "error");

    let (_, status_body) = get(&app, "/status").await;
    assert_eq!(status_body, json!({ "connected": false }));
}

#[tokio::test]
async fn start_requires_connection() {
    let app = app();
    let (_, body) = post(&app, "/start", json!({ "strategy": "A", "param": 10.0 })).await;
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn takeoff_requires_connection() {
    let app = app();
    let (_, body) = post(&app, "/takeoff", json!({})).await;
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn takeoff_arms_and_climbs_to_target_altitude() {
    let sim = Arc::new(SimVehicle::new());
    let app = app_with_vehicle(Arc::clone(&sim));

    post(&app, "/connect", json!({})).await;
    let (_, body) = post(&app, "/takeoff", json!({})).await;
    assert_eq!(body["status"], "success");

    let status = wait_for_status(
        &app,
        |s| s["mode"] == json!("POSHOLD"),
        "takeoff to reach position hold",
    )
    .await;
    assert_eq!(status["armed"], json!(true));
    assert_eq!(status["alt"], json!(15.0));
}

#[tokio::test]
async fn takeoff_rejected_when_not_armable() {
    let sim = Arc::new(SimVehicle::new());
    sim.set_armable(false);
    let app = app_with_vehicle(sim);

    post(&app, "/connect", json!({})).await;
    let (_, body) = post(&app, "/takeoff", json!({})).await;
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn invalid_drift_step_count_is_reported() {
    let app = app();
    post(&app, "/connect", json!({})).await;

    let (_, body) = post(
        &app,
        "/start",
        json!({ "strategy": "A", "n_offset": 5.0, "param": 0.0 }),
    )
    .await;
    assert_eq!(body["status"], "error");

    let (_, body) = post(
        &app,
        "/start",
        json!({ "strategy": "A", "n_offset": 5.0, "param": 2.5 }),
    )
    .await;
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn hijack_cycle_over_http_clears_glitch_on_stop() {
    let sim = Arc::new(SimVehicle::new());
    sim.set_mission(
        vec![Waypoint {
            seq: 1,
            lat: -35.36,
            lon: 149.17,
            alt: 20.0,
        }],
        1,
    );
    let app = app_with_vehicle(Arc::clone(&sim));

    post(&app, "/connect", json!({})).await;
    let (_, body) = post(
        &app,
        "/start",
        json!({ "strategy": "B", "n_offset": -35.37, "e_offset": 149.18, "param": 1.0 }),
    )
    .await;
    assert_eq!(body["status"], "success", "message: {}", body["message"]);

    let status = wait_for_status(
        &app,
        |s| s["attack_data"]["phase"] == json!("HIJACKING"),
        "hijacking phase",
    )
    .await;
    assert_eq!(status["attack_data"]["active"], json!(true));
    assert_eq!(status["attack_data"]["strategy"], json!("B"));
    assert_eq!(status["mode"], json!("AUTO"));

    let (_, body) = post(&app, "/stop", json!({})).await;
    assert_eq!(body["status"], "success");

    assert_eq!(sim.param_now(GLITCH_NORTH_PARAM), Some(0.0));
    assert_eq!(sim.param_now(GLITCH_EAST_PARAM), Some(0.0));

    let (_, status_body) = get(&app, "/status").await;
    assert_eq!(status_body["attack_data"]["active"], json!(false));
    assert_eq!(status_body["attack_data"]["phase"], json!("IDLE"));
}

#[tokio::test]
async fn second_start_rejected_while_session_active() {
    let sim = Arc::new(SimVehicle::new());
    let app = app_with_vehicle(sim);

    post(&app, "/connect", json!({})).await;
    let (_, first) = post(
        &app,
        "/start",
        json!({ "strategy": "A", "n_offset": 20.0, "param": 1000000.0 }),
    )
    .await;
    assert_eq!(first["status"], "success");

    let (_, second) = post(
        &app,
        "/start",
        json!({ "strategy": "A", "n_offset": 5.0, "param": 10.0 }),
    )
    .await;
    assert_eq!(second["status"], "error");

    let (_, stopped) = post(&app, "/stop", json!({})).await;
    assert_eq!(stopped["status"], "success");
}

#[tokio::test]
async fn stop_without_session_clears_leftover_glitch() {
    let sim = Arc::new(SimVehicle::new());
    sim.set_param(GLITCH_NORTH_PARAM, 0.5).await.unwrap();
    sim.set_param(GLITCH_EAST_PARAM, -0.5).await.unwrap();
    let app = app_with_vehicle(Arc::clone(&sim));

    post(&app, "/connect", json!({})).await;
    let (_, body) = post(&app, "/stop", json!({})).await;
    assert_eq!(body["status"], "success");

    assert_eq!(sim.param_now(GLITCH_NORTH_PARAM), Some(0.0));
    assert_eq!(sim.param_now(GLITCH_EAST_PARAM), Some(0.0));
}
