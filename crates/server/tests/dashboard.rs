use axum::body::to_bytes;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use picomon_core::StatusSample;
use picomon_device::mocks::ScriptedDevice;
use picomon_device::DeviceError;
use picomon_server::api::{self, ActionForm, ActionQuery, AppState, Metrics};
use picomon_server::service::{DashboardService, SendError};
use picomon_server::store::{ensure_schema, HistoryStore};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap()
}

fn sample_at(ts: DateTime<Utc>, temperature: f64, led: u8) -> StatusSample {
    StatusSample {
        raw: (temperature * 100.0) as i64,
        temperature,
        led,
        timestamp: ts,
    }
}

async fn memory_pool() -> SqlitePool {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    ensure_schema(&pool).await.unwrap();
    pool
}

async fn service_over(device: ScriptedDevice) -> (SqlitePool, DashboardService<ScriptedDevice>) {
    let pool = memory_pool().await;
    let service = DashboardService::new(device, HistoryStore::new(pool.clone()), 60);
    (pool, service)
}

async fn state_over(device: ScriptedDevice) -> (SqlitePool, AppState<ScriptedDevice>) {
    let pool = memory_pool().await;
    let service = DashboardService::new(device, HistoryStore::new(pool.clone()), 60);
    let state = AppState {
        service,
        db: pool.clone(),
        metrics: Metrics::new(),
        history_limit: 30,
    };
    (pool, state)
}

async fn row_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM log")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn first_read_logs_then_interval_throttles() {
    let device = ScriptedDevice::new();
    device.push_status(sample_at(t0(), 20.0, 0));
    device.push_status(sample_at(t0() + Duration::seconds(10), 20.5, 0));
    let (pool, service) = service_over(device).await;

    let first = service.read().await.unwrap();
    assert!(first.logged);

    let second = service.read().await.unwrap();
    assert!(!second.logged);
    assert_eq!(second.sample.temperature, 20.5);

    assert_eq!(row_count(&pool).await, 1);
}

#[tokio::test]
async fn stale_log_admits_a_new_row() {
    let device = ScriptedDevice::new();
    device.push_status(sample_at(t0(), 20.0, 0));
    device.push_status(sample_at(t0() + Duration::seconds(61), 21.0, 0));
    let (pool, service) = service_over(device).await;

    assert!(service.read().await.unwrap().logged);
    assert!(service.read().await.unwrap().logged);
    assert_eq!(row_count(&pool).await, 2);
}

#[tokio::test]
async fn unreachable_device_leaves_log_untouched() {
    let device = ScriptedDevice::new();
    device.push_error(DeviceError::Unreachable("connection refused".to_string()));
    let (pool, service) = service_over(device).await;

    let err = service.read().await.unwrap_err();
    assert!(matches!(err, DeviceError::Unreachable(_)));
    assert_eq!(row_count(&pool).await, 0);
}

#[tokio::test]
async fn closed_store_still_serves_live_reading() {
    let device = ScriptedDevice::new();
    device.push_status(sample_at(t0(), 23.4, 0b0101));
    let (pool, service) = service_over(device).await;
    pool.close().await;

    let outcome = service.read().await.unwrap();
    assert!(!outcome.logged);
    assert_eq!(outcome.sample.temperature, 23.4);
    assert_eq!(outcome.sample.led, 0b0101);
}

#[tokio::test]
async fn history_returns_newest_window_in_ascending_order() {
    let (pool, service) = service_over(ScriptedDevice::new()).await;
    let store = HistoryStore::new(pool.clone());

    // Insert out of chronological order on purpose.
    store
        .append(&sample_at(t0() + Duration::seconds(120), 22.0, 0))
        .await
        .unwrap();
    store.append(&sample_at(t0(), 20.0, 0)).await.unwrap();
    store
        .append(&sample_at(t0() + Duration::seconds(60), 21.0, 0))
        .await
        .unwrap();

    let window = service.history(2).await.unwrap();
    let temps: Vec<f64> = window.iter().map(|r| r.temperature).collect();
    assert_eq!(temps, vec![21.0, 22.0]);

    let all = service.history(30).await.unwrap();
    let temps: Vec<f64> = all.iter().map(|r| r.temperature).collect();
    assert_eq!(temps, vec![20.0, 21.0, 22.0]);
}

#[tokio::test]
async fn led_buttons_map_to_exact_bytes() {
    let device = ScriptedDevice::new();
    let (_pool, service) = service_over(device.clone()).await;

    for cmd in [8, 4, 2, 1] {
        service.send_led(cmd).await.unwrap();
    }
    assert_eq!(device.sent_leds(), vec![0x08, 0x04, 0x02, 0x01]);

    let err = service.send_led(3).await.unwrap_err();
    assert!(matches!(err, SendError::UnknownCommand(3)));
    assert_eq!(device.sent_leds().len(), 4);
}

#[tokio::test]
async fn text_is_clamped_to_display_width() {
    let device = ScriptedDevice::new();
    let (_pool, service) = service_over(device.clone()).await;

    let long = "abcdefghij".repeat(4);
    let sent = service.send_text(&long).await.unwrap();
    assert_eq!(sent.chars().count(), 32);

    let recorded = device.sent_texts();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0], long[..32]);
}

#[tokio::test]
async fn led_poll_reports_all_off_when_unreachable() {
    let device = ScriptedDevice::new();
    device.push_error(DeviceError::Unreachable("timed out".to_string()));
    device.push_status(sample_at(t0(), 20.0, 0b0101));
    let (_pool, service) = service_over(device).await;

    assert_eq!(service.led_state().await, 0);
    assert_eq!(service.led_state().await, 0b0101);
}

#[tokio::test]
async fn read_action_maps_unreachable_to_gateway_timeout() {
    let device = ScriptedDevice::new();
    device.push_error(DeviceError::Unreachable("connection refused".to_string()));
    let (_pool, state) = state_over(device).await;

    let resp = api::dashboard_get(
        State(state),
        Query(ActionQuery {
            action: Some("read".to_string()),
            limit: None,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["error"], "device unreachable");
}

#[tokio::test]
async fn read_action_maps_malformed_to_internal_error() {
    let device = ScriptedDevice::new();
    device.push_error(DeviceError::Malformed("missing led field".to_string()));
    let (_pool, state) = state_over(device).await;

    let resp = api::dashboard_get(
        State(state),
        Query(ActionQuery {
            action: Some("read".to_string()),
            limit: None,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["error"], "bad device response");
}

#[tokio::test]
async fn read_action_reports_the_logged_flag() {
    let device = ScriptedDevice::new();
    device.push_status(sample_at(t0(), 19.5, 0));
    let (_pool, state) = state_over(device).await;

    let resp = api::dashboard_get(
        State(state),
        Query(ActionQuery {
            action: Some("read".to_string()),
            limit: None,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["temperature"], 19.5);
    assert_eq!(v["logged"], true);
}

#[tokio::test]
async fn page_is_served_without_an_action() {
    let (_pool, state) = state_over(ScriptedDevice::new()).await;

    let resp = api::dashboard_get(
        State(state),
        Query(ActionQuery {
            action: None,
            limit: None,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let page = String::from_utf8_lossy(&body);
    assert!(page.contains("Pico Monitor"));
}

#[tokio::test]
async fn unknown_actions_are_rejected() {
    let (_pool, state) = state_over(ScriptedDevice::new()).await;

    let resp = api::dashboard_get(
        State(state.clone()),
        Query(ActionQuery {
            action: Some("reboot".to_string()),
            limit: None,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = api::dashboard_post(
        State(state),
        Query(ActionQuery {
            action: None,
            limit: None,
        }),
        Form(ActionForm {
            cmd: Some(8),
            text: None,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_action_maps_unknown_command_to_bad_request() {
    let device = ScriptedDevice::new();
    let (_pool, state) = state_over(device.clone()).await;

    let resp = api::dashboard_post(
        State(state),
        Query(ActionQuery {
            action: Some("send".to_string()),
            limit: None,
        }),
        Form(ActionForm {
            cmd: Some(7),
            text: None,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["ok"], false);
    assert!(device.sent_leds().is_empty());
}

#[tokio::test]
async fn send_action_acks_the_byte_sent() {
    let device = ScriptedDevice::new();
    let (_pool, state) = state_over(device.clone()).await;

    let resp = api::dashboard_post(
        State(state),
        Query(ActionQuery {
            action: Some("send".to_string()),
            limit: None,
        }),
        Form(ActionForm {
            cmd: Some(4),
            text: None,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["ok"], true);
    assert_eq!(v["cmd"], 4);
    assert_eq!(device.sent_leds(), vec![0x04]);
}

#[tokio::test]
async fn history_action_serves_chart_points() {
    let (pool, state) = state_over(ScriptedDevice::new()).await;
    let store = HistoryStore::new(pool);
    store.append(&sample_at(t0(), 20.0, 1)).await.unwrap();
    store
        .append(&sample_at(t0() + Duration::seconds(60), 21.0, 2))
        .await
        .unwrap();

    let resp = api::dashboard_get(
        State(state),
        Query(ActionQuery {
            action: Some("history".to_string()),
            limit: None,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["count"], 2);
    assert_eq!(v["items"][0]["temperature"], 20.0);
    assert_eq!(v["items"][1]["temperature"], 21.0);
    assert!(v["items"][0].get("timestamp").is_some());
    assert!(v["items"][0].get("led").is_none());
}

#[tokio::test]
async fn send_action_maps_transport_failure_to_bad_gateway() {
    let device = ScriptedDevice::new();
    device.fail_sends(DeviceError::Unreachable("connection refused".to_string()));
    let (_pool, state) = state_over(device).await;

    let resp = api::dashboard_post(
        State(state),
        Query(ActionQuery {
            action: Some("send".to_string()),
            limit: None,
        }),
        Form(ActionForm {
            cmd: Some(8),
            text: None,
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn text_action_relays_the_clamped_line() {
    let device = ScriptedDevice::new();
    let (_pool, state) = state_over(device.clone()).await;

    let resp = api::dashboard_post(
        State(state),
        Query(ActionQuery {
            action: Some("text".to_string()),
            limit: None,
        }),
        Form(ActionForm {
            cmd: None,
            text: Some("hello pico".to_string()),
        }),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(device.sent_texts(), vec!["hello pico".to_string()]);
}

#[tokio::test]
async fn readyz_follows_database_health() {
    let (pool, state) = state_over(ScriptedDevice::new()).await;

    assert_eq!(api::readyz(State(state.clone())).await, StatusCode::OK);

    pool.close().await;
    assert_eq!(
        api::readyz(State(state)).await,
        StatusCode::SERVICE_UNAVAILABLE
    );
}
