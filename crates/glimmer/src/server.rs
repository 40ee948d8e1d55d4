//! HTTP/WebSocket ingress for the dispatcher.
//!
//! REST endpoints cover one-shot state changes; `/api/stream` upgrades to
//! a WebSocket that accepts either JSON color messages (forwarded straight
//! to the dispatcher) or binary RGBA frames (reduced by the sampler first).
//! Both paths funnel into the same admission gate, so a flood of frames
//! can never queue up behind the strip.

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use glimmer_core::{
    CoreError, DispatchConfig, Dispatcher, Frame, Intent, Outcome, Rgb, Sampler, SamplerConfig,
    Strip, WatchFrameSource,
};

// ── State ───────────────────────────────────────────────────────────

pub struct AppState<S: Strip> {
    pub dispatcher: Dispatcher<S>,
    pub sampler_config: SamplerConfig,
    pub device: String,
    pub started: std::time::Instant,
}

impl<S: Strip> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            sampler_config: self.sampler_config,
            device: self.device.clone(),
            started: self.started,
        }
    }
}

pub fn router<S: Strip>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api/color", post(set_color))
        .route("/api/power", post(set_power))
        .route("/api/brightness", post(set_brightness))
        .route("/api/status", get(status))
        .route("/api/stream", get(stream))
        .with_state(state)
}

// ── Request / response bodies ───────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ColorRequest {
    r: i32,
    g: i32,
    b: i32,
}

impl ColorRequest {
    fn rgb(&self) -> Rgb {
        Rgb::from_unclamped(self.r, self.g, self.b)
    }
}

#[derive(Debug, Deserialize)]
struct PowerRequest {
    on: bool,
}

#[derive(Debug, Deserialize)]
struct BrightnessRequest {
    level: u8,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    outcome: Outcome,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    device: String,
    uptime_secs: u64,
    command_timeout_ms: u64,
    staleness_threshold_ms: u64,
}

// ── Error mapping ───────────────────────────────────────────────────

struct ApiError(CoreError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::CommandTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            CoreError::SourceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

// ── REST handlers ───────────────────────────────────────────────────

async fn set_color<S: Strip>(
    State(state): State<AppState<S>>,
    Json(request): Json<ColorRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let outcome = state
        .dispatcher
        .submit(Intent::SetColor(request.rgb()))
        .await?;
    Ok(Json(SubmitResponse { outcome }))
}

async fn set_power<S: Strip>(
    State(state): State<AppState<S>>,
    Json(request): Json<PowerRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let outcome = state
        .dispatcher
        .submit(Intent::SetPower { on: request.on })
        .await?;
    Ok(Json(SubmitResponse { outcome }))
}

async fn set_brightness<S: Strip>(
    State(state): State<AppState<S>>,
    Json(request): Json<BrightnessRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let outcome = state
        .dispatcher
        .submit(Intent::SetBrightness {
            level: request.level,
        })
        .await?;
    Ok(Json(SubmitResponse { outcome }))
}

async fn status<S: Strip>(State(state): State<AppState<S>>) -> Json<StatusResponse> {
    let DispatchConfig {
        command_timeout,
        staleness_threshold,
    } = *state.dispatcher.config();
    Json(StatusResponse {
        device: state.device.clone(),
        uptime_secs: state.started.elapsed().as_secs(),
        command_timeout_ms: u64::try_from(command_timeout.as_millis()).unwrap_or(u64::MAX),
        staleness_threshold_ms: u64::try_from(staleness_threshold.as_millis()).unwrap_or(u64::MAX),
    })
}

// ── WebSocket stream ────────────────────────────────────────────────

async fn stream<S: Strip>(
    State(state): State<AppState<S>>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn handle_stream<S: Strip>(mut socket: WebSocket, state: AppState<S>) {
    debug!("stream client connected");

    let (frame_tx, frame_rx) = watch::channel(None);
    let sampler = Sampler::new(state.sampler_config);
    let handle = match sampler.start(WatchFrameSource::new(frame_rx)).await {
        Ok(handle) => handle,
        Err(err) => {
            warn!(error = %err, "sampler failed to start; closing stream");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    // Samples drain into the dispatcher independently of socket reads;
    // skipped outcomes are expected whenever frames outrun the strip.
    let mut samples = handle.samples();
    let dispatcher = state.dispatcher.clone();
    let forwarder = tokio::spawn(async move {
        while samples.changed().await.is_ok() {
            let sample = *samples.borrow_and_update();
            if let Some(color) = sample {
                if let Err(err) = dispatcher.submit(Intent::SetColor(color)).await {
                    debug!(error = %err, "streamed color not delivered");
                }
            }
        }
    });

    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Binary(bytes) => {
                trace!(len = bytes.len(), "frame received");
                let _ = frame_tx.send(Some(Frame::new(bytes.to_vec())));
            }
            Message::Text(text) => match serde_json::from_str::<ColorRequest>(&text) {
                Ok(request) => {
                    if let Err(err) = state.dispatcher.submit(Intent::SetColor(request.rgb())).await
                    {
                        debug!(error = %err, "streamed color not delivered");
                    }
                }
                Err(err) => debug!(error = %err, "malformed stream message ignored"),
            },
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    debug!("stream client disconnected");
    drop(frame_tx);
    handle.join().await;
    forwarder.abort();
}
