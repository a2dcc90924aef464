pub mod config;
pub mod error;
pub mod metrics;
pub mod validation;

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use dual_tts_core::{DualTts, Segment, SegmentReport, VoiceCatalog, VoiceReference};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::metrics::{AppMetrics, DetailedMetricsResponse, EndpointMetricsResponse, SystemMetrics};
use crate::validation::{
    resolve_reference_path, validate_tts_request, validate_voice_selection, VoiceChoice,
};

#[derive(Clone)]
pub struct AppState {
    pub tts: Arc<DualTts>,
    pub voices: Arc<VoiceCatalog>,
    pub metrics: AppMetrics,
    pub config: ServerConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(tts: Arc<DualTts>, voices: VoiceCatalog, config: ServerConfig) -> Self {
        Self {
            tts,
            voices: Arc::new(voices),
            metrics: AppMetrics::new(),
            config,
            started_at: Instant::now(),
        }
    }
}

#[derive(Deserialize)]
pub struct TtsRequest {
    pub text: String,
    pub voice: Option<String>,
    pub ref_audio_path: Option<String>,
    pub ref_text: Option<String>,
}

#[derive(Serialize)]
pub struct TtsResponse {
    pub audio_base64: String,
    pub sample_rate: u32,
    pub duration_ms: u64,
    pub processing_ms: u64,
    pub segments: Vec<SegmentReport>,
}

#[derive(Deserialize)]
pub struct SegmentsRequest {
    pub text: String,
}

#[derive(Serialize)]
pub struct VoiceInfo {
    pub name: String,
    pub gender: Option<String>,
    pub region: Option<String>,
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let methods = [axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::OPTIONS];
    let base = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(tower_http::cors::Any)
        .allow_credentials(false);

    match config.cors_allowed_origins {
        Some(ref allowed_origins) => {
            let origins: Vec<axum::http::HeaderValue> = allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<axum::http::HeaderValue>().ok())
                .collect();
            if origins.is_empty() {
                warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
                base.allow_origin(tower_http::cors::Any)
            } else {
                info!("CORS configured for {} origin(s)", origins.len());
                base.allow_origin(tower_http::cors::AllowOrigin::list(origins))
            }
        }
        None => {
            warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
            base.allow_origin(tower_http::cors::Any)
        }
    }
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let header = axum::http::HeaderValue::from_str(&request_id).ok();
    if let Some(ref value) = header {
        request.headers_mut().insert("x-request-id", value.clone());
    }
    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Routes only, without the middleware stack.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/voices", get(list_voices))
        .route("/segments", post(segments_endpoint))
        .route("/tts", post(tts_endpoint))
        .route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(api.clone()) // root paths
        .nest("/api", api) // /api prefix
}

/// Full application: routes, rate limiting, timeout, CORS and tracing.
pub fn build_app(state: AppState) -> anyhow::Result<Router> {
    let config = state.config.clone();

    // Global key: every client shares one budget, which behaves well behind proxies
    let per_second = (config.rate_limit_per_minute / 60).max(1) as u64;
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(per_second)
            .burst_size(config.rate_limit_per_minute.max(1))
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );
    info!("Rate limiting: {} requests per minute", config.rate_limit_per_minute);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(&config))
        .into_inner();

    Ok(routes()
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state))
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_voices(State(state): State<AppState>) -> Json<Vec<VoiceInfo>> {
    let voices = state
        .voices
        .iter()
        .map(|(name, entry)| VoiceInfo {
            name: name.clone(),
            gender: entry.gender.clone(),
            region: entry.region.clone(),
        })
        .collect();
    Json(voices)
}

pub async fn segments_endpoint(
    State(state): State<AppState>,
    Json(req): Json<SegmentsRequest>,
) -> Result<Json<Vec<Segment>>, ApiError> {
    let start = Instant::now();
    if let Err(e) = validate_tts_request(&req.text, state.config.max_text_chars) {
        state.metrics.segments.record_error();
        return Err(e);
    }
    let segments = state.tts.segments(&req.text);
    state
        .metrics
        .segments
        .record_request(start.elapsed().as_millis() as u64);
    Ok(Json(segments))
}

fn resolve_voice(state: &AppState, req: &TtsRequest) -> Result<VoiceReference, ApiError> {
    let choice = validate_voice_selection(
        req.voice.as_deref(),
        req.ref_audio_path.as_deref(),
        req.ref_text.as_deref(),
    )?;

    match choice {
        VoiceChoice::Custom { audio, transcript } => {
            let audio = resolve_reference_path(&state.config.reference_dir, &audio)?;
            Ok(VoiceReference::new(audio, transcript))
        }
        VoiceChoice::Preset(name) => {
            if state.voices.entry(&name).is_none() {
                return Err(ApiError::NotFound(format!(
                    "Unknown voice '{}'. Use /voices to list.",
                    name
                )));
            }
            state
                .voices
                .load_reference(&name)
                .map_err(|e| ApiError::InternalError(format!("{e:#}")))
        }
    }
}

pub async fn tts_endpoint(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Result<Json<TtsResponse>, ApiError> {
    let start = Instant::now();
    let result = synthesize(&state, req).await;
    match result {
        Ok(response) => {
            state
                .metrics
                .tts
                .record_request(start.elapsed().as_millis() as u64);
            Ok(Json(response))
        }
        Err(e) => {
            state.metrics.tts.record_error();
            Err(e)
        }
    }
}

async fn synthesize(state: &AppState, req: TtsRequest) -> Result<TtsResponse, ApiError> {
    validate_tts_request(&req.text, state.config.max_text_chars)?;
    let voice = resolve_voice(state, &req)?;

    info!(
        "TTS request: {} chars, reference {}",
        req.text.chars().count(),
        voice.audio_path.display()
    );

    // Backends block, keep them off the async workers
    let tts = state.tts.clone();
    let text = req.text;
    let report = tokio::task::spawn_blocking(move || tts.synthesize_report(&text, &voice))
        .await
        .map_err(|e| ApiError::InternalError(format!("Task join error: {e}")))??;

    let processing_ms = report.elapsed.as_millis() as u64;
    let duration_ms = report.waveform.duration_ms(report.sample_rate);
    state
        .metrics
        .synthesis
        .record_synthesis(processing_ms, report.waveform.len(), &report.segments);

    let audio_base64 = dual_tts_core::wav::encode_wav_base64(report.waveform.samples(), report.sample_rate)
        .map_err(|e| ApiError::InternalError(format!("WAV encoding error: {e}")))?;

    Ok(TtsResponse {
        audio_base64,
        sample_rate: report.sample_rate,
        duration_ms,
        processing_ms,
        segments: report.segments,
    })
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<DetailedMetricsResponse> {
    let mut system = sysinfo::System::new();
    system.refresh_cpu();
    system.refresh_memory();

    let cpu_usage = system.global_cpu_info().cpu_usage();
    let memory_used = system.used_memory();
    let memory_total = system.total_memory();
    let memory_usage_percent = if memory_total > 0 {
        (memory_used as f64 / memory_total as f64 * 100.0) as f32
    } else {
        0.0
    };

    Json(DetailedMetricsResponse {
        timestamp: chrono::Utc::now(),
        system: SystemMetrics {
            cpu_usage_percent: cpu_usage,
            memory_used_mb: memory_used / 1024 / 1024,
            memory_total_mb: memory_total / 1024 / 1024,
            memory_usage_percent,
            uptime_seconds: state.started_at.elapsed().as_secs(),
        },
        endpoints: EndpointMetricsResponse {
            tts: state.metrics.tts.stats(),
            segments: state.metrics.segments.stats(),
        },
        synthesis: state.metrics.synthesis.stats(),
        english_backend_available: state.tts.secondary_available(),
        english_model: state.tts.config().secondary_model.clone(),
    })
}
