use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

#[derive(Clone)]
struct SimState {
    led: Arc<AtomicU8>,
    started: Instant,
    packed: bool,
}

#[tokio::main]
async fn main() {
    let addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9090".to_string())
        .parse()
        .expect("invalid listen address");
    // PICOSIM_PACKED=1 answers with the packed single-integer format
    let packed = std::env::var("PICOSIM_PACKED").ok().as_deref() == Some("1");

    let state = SimState {
        led: Arc::new(AtomicU8::new(0)),
        started: Instant::now(),
        packed,
    };

    let app = Router::new()
        .route("/api/status", get(status))
        .route("/api/control", post(control))
        .route("/api/text", post(text))
        .with_state(state);

    eprintln!("Simulated device on http://{addr} (packed={packed})");
    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind failed");
    axum::serve(listener, app).await.expect("serve failed");
}

// Slow sine around room temperature so the chart has some shape.
fn synth_raw(elapsed_secs: f64) -> i64 {
    let temp = 21.0 + 4.0 * (elapsed_secs / 120.0).sin();
    (temp * 100.0) as i64
}

async fn status(State(s): State<SimState>) -> Json<Value> {
    let raw = synth_raw(s.started.elapsed().as_secs_f64());
    let led = s.led.load(Ordering::Relaxed);
    if s.packed {
        Json(json!({ "value": ((led as u32) << 16) | (raw as u32 & 0xFFFF) }))
    } else {
        Json(json!({
            "ledState": led,
            "raw": raw,
            "temperature": raw as f64 / 100.0,
        }))
    }
}

async fn control(State(s): State<SimState>, Json(body): Json<Value>) -> Json<Value> {
    let led = body.get("led").and_then(Value::as_u64).unwrap_or(0) as u8;
    s.led.store(led, Ordering::Relaxed);
    println!("led byte set to {led:#04x}");
    Json(json!({ "ok": true }))
}

async fn text(Json(body): Json<Value>) -> Json<Value> {
    let line = body.get("text").and_then(Value::as_str).unwrap_or_default();
    println!("display text: {line:?}");
    Json(json!({ "ok": true }))
}
