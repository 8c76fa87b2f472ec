use std::sync::Arc;

use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use picomon_core::StatusSample;
use picomon_device::{DeviceApi, DeviceError};

use crate::service::{DashboardService, SendError};
use crate::store::LogRecord;

static DASHBOARD_HTML: &str = include_str!("static/dashboard.html");

#[derive(Clone)]
pub struct AppState<D> {
    pub service: DashboardService<D>,
    pub db: SqlitePool,
    pub metrics: Arc<Metrics>,
    pub history_limit: u32,
}

pub struct Metrics {
    device_up: IntGauge,
    device_reads_total: IntCounter,
    device_unreachable_total: IntCounter,
    device_malformed_total: IntCounter,
    readings_logged_total: IntCounter,
    led_commands_total: IntCounter,
    texts_sent_total: IntCounter,
    last_temperature: Gauge,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        let device_up = IntGauge::new("picomon_device_up", "Whether the last status read succeeded (1 yes, 0 no)").unwrap();
        let device_reads_total = IntCounter::new("picomon_device_reads_total", "Dashboard status reads attempted").unwrap();
        let device_unreachable_total = IntCounter::new("picomon_device_unreachable_total", "Status reads that found the device unreachable").unwrap();
        let device_malformed_total = IntCounter::new("picomon_device_malformed_total", "Status reads that returned an undecodable body").unwrap();
        let readings_logged_total = IntCounter::new("picomon_readings_logged_total", "Temperature readings persisted to the log").unwrap();
        let led_commands_total = IntCounter::new("picomon_led_commands_total", "LED state bytes relayed to the device").unwrap();
        let texts_sent_total = IntCounter::new("picomon_texts_sent_total", "Display text lines relayed to the device").unwrap();
        let last_temperature = Gauge::new("picomon_last_temperature_celsius", "Temperature from the most recent successful read").unwrap();

        let registry = prometheus::default_registry();
        let _ = registry.register(Box::new(device_up.clone()));
        let _ = registry.register(Box::new(device_reads_total.clone()));
        let _ = registry.register(Box::new(device_unreachable_total.clone()));
        let _ = registry.register(Box::new(device_malformed_total.clone()));
        let _ = registry.register(Box::new(readings_logged_total.clone()));
        let _ = registry.register(Box::new(led_commands_total.clone()));
        let _ = registry.register(Box::new(texts_sent_total.clone()));
        let _ = registry.register(Box::new(last_temperature.clone()));

        Arc::new(Self {
            device_up,
            device_reads_total,
            device_unreachable_total,
            device_malformed_total,
            readings_logged_total,
            led_commands_total,
            texts_sent_total,
            last_temperature,
        })
    }
}

pub fn router<D>(state: AppState<D>) -> Router
where
    D: DeviceApi + Clone + 'static,
{
    Router::new()
        .route("/", get(dashboard_get::<D>).post(dashboard_post::<D>))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz::<D>))
        .route("/version", get(version))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct ActionForm {
    pub cmd: Option<i64>,
    pub text: Option<String>,
}

#[derive(Serialize)]
struct ReadResponse {
    #[serde(flatten)]
    sample: StatusSample,
    logged: bool,
}

/// What the chart consumes; the wider [`LogRecord`] stays internal.
#[derive(Serialize)]
struct HistoryPoint {
    temperature: f64,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<LogRecord> for HistoryPoint {
    fn from(r: LogRecord) -> Self {
        Self {
            temperature: r.temperature,
            timestamp: r.timestamp,
        }
    }
}

#[derive(Serialize)]
struct HistoryResponse {
    count: usize,
    items: Vec<HistoryPoint>,
}

/// Single dashboard endpoint. Without an `action` query it serves the page;
/// with one it dispatches the matching read-side operation.
pub async fn dashboard_get<D>(
    State(state): State<AppState<D>>,
    Query(q): Query<ActionQuery>,
) -> Response
where
    D: DeviceApi + Clone + 'static,
{
    match q.action.as_deref() {
        None => Html(DASHBOARD_HTML).into_response(),
        Some("read") => read_action(&state).await,
        Some("history") => history_action(&state, q.limit).await,
        Some("led") => led_action(&state).await,
        Some(other) => {
            tracing::warn!(action = other, "unknown dashboard action");
            (StatusCode::BAD_REQUEST, Json(json!({"error": "unknown action"}))).into_response()
        }
    }
}

/// Write-side actions arrive as form posts with the action in the query.
pub async fn dashboard_post<D>(
    State(state): State<AppState<D>>,
    Query(q): Query<ActionQuery>,
    Form(form): Form<ActionForm>,
) -> Response
where
    D: DeviceApi + Clone + 'static,
{
    match q.action.as_deref() {
        Some("send") => send_action(&state, form.cmd).await,
        Some("text") => text_action(&state, form.text.unwrap_or_default()).await,
        _ => (StatusCode::BAD_REQUEST, Json(json!({"error": "unknown action"}))).into_response(),
    }
}

async fn read_action<D: DeviceApi>(state: &AppState<D>) -> Response {
    state.metrics.device_reads_total.inc();
    match state.service.read().await {
        Ok(outcome) => {
            state.metrics.device_up.set(1);
            state.metrics.last_temperature.set(outcome.sample.temperature);
            if outcome.logged {
                state.metrics.readings_logged_total.inc();
            }
            Json(ReadResponse {
                sample: outcome.sample,
                logged: outcome.logged,
            })
            .into_response()
        }
        Err(DeviceError::Unreachable(e)) => {
            state.metrics.device_up.set(0);
            state.metrics.device_unreachable_total.inc();
            tracing::warn!(error = %e, "status read failed");
            (StatusCode::GATEWAY_TIMEOUT, Json(json!({"error": "device unreachable"}))).into_response()
        }
        Err(DeviceError::Malformed(e)) => {
            state.metrics.device_malformed_total.inc();
            tracing::error!(error = %e, "device returned an undecodable status");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "bad device response"}))).into_response()
        }
    }
}

async fn history_action<D: DeviceApi>(state: &AppState<D>, limit: Option<u32>) -> Response {
    let limit = limit.unwrap_or(state.history_limit).min(1000);
    match state.service.history(limit).await {
        Ok(rows) => {
            let items: Vec<HistoryPoint> = rows.into_iter().map(HistoryPoint::from).collect();
            Json(HistoryResponse {
                count: items.len(),
                items,
            })
            .into_response()
        }
        Err(e) => {
            tracing::error!(?e, "history query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "history unavailable"}))).into_response()
        }
    }
}

async fn led_action<D: DeviceApi>(state: &AppState<D>) -> Response {
    let led = state.service.led_state().await;
    Json(json!({"led": led})).into_response()
}

async fn send_action<D: DeviceApi>(state: &AppState<D>, cmd: Option<i64>) -> Response {
    let Some(cmd) = cmd else {
        return (StatusCode::BAD_REQUEST, Json(json!({"ok": false, "error": "missing cmd"}))).into_response();
    };
    match state.service.send_led(cmd).await {
        Ok(mask) => {
            state.metrics.led_commands_total.inc();
            Json(json!({"ok": true, "cmd": mask})).into_response()
        }
        Err(SendError::UnknownCommand(c)) => {
            tracing::warn!(cmd = c, "rejected unknown led command");
            (StatusCode::BAD_REQUEST, Json(json!({"ok": false, "error": "unknown command"}))).into_response()
        }
        Err(SendError::Device(e)) => {
            tracing::warn!(error = %e, "led send failed");
            (StatusCode::BAD_GATEWAY, Json(json!({"ok": false, "error": "device send failed"}))).into_response()
        }
    }
}

async fn text_action<D: DeviceApi>(state: &AppState<D>, text: String) -> Response {
    match state.service.send_text(&text).await {
        Ok(line) => {
            state.metrics.texts_sent_total.inc();
            Json(json!({"ok": true, "text": line})).into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "text send failed");
            (StatusCode::BAD_GATEWAY, Json(json!({"ok": false, "error": "device send failed"}))).into_response()
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

pub async fn readyz<D>(State(state): State<AppState<D>>) -> StatusCode
where
    D: DeviceApi + Clone + 'static,
{
    let db_ok = sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();
    if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn version() -> Json<serde_json::Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    encoder.encode(&metric_families, &mut buf).unwrap();
    Response::builder()
        .status(StatusCode::OK)
        .header(axum::http::header::CONTENT_TYPE, encoder.format_type())
        .body(axum::body::Body::from(buf))
        .unwrap()
}
