//! Common utilities for integration tests

use std::{fs, path::Path, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use dual_tts_core::{
    Availability, DualTts, DualTtsConfig, PrimaryCapability, RawAudio, ReferenceCodes,
    SecondaryCapability, VoiceCatalog,
};
use server::{build_app, config::ServerConfig, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

pub const PRESET: &str = "Ly (nữ miền Bắc)";

/// 100 samples of 0.5 per Vietnamese segment; fails on the word "lỗi".
pub struct FakeVieNeu;

impl PrimaryCapability for FakeVieNeu {
    fn encode_reference(&self, reference_audio: &Path) -> anyhow::Result<ReferenceCodes> {
        if !reference_audio.exists() {
            anyhow::bail!("missing reference");
        }
        Ok(ReferenceCodes(vec![1, 2, 3]))
    }

    fn infer(
        &self,
        text: &str,
        _codes: Option<&ReferenceCodes>,
        _reference_transcript: &str,
    ) -> anyhow::Result<RawAudio> {
        if text.contains("lỗi") {
            anyhow::bail!("backbone out of memory");
        }
        Ok(RawAudio::mono(vec![0.5; 100], 24_000))
    }
}

/// 50 samples per English segment at 12 kHz (100 once normalized).
pub struct FakeEnglish;

impl SecondaryCapability for FakeEnglish {
    fn synthesize(&self, _text: &str) -> anyhow::Result<RawAudio> {
        Ok(RawAudio::mono(vec![0.25; 50], 12_000))
    }
}

pub struct TestApp {
    pub router: Router,
    pub dir: TempDir,
}

impl TestApp {
    pub fn reference_wav(&self) -> String {
        self.dir.path().join("ly.wav").to_string_lossy().to_string()
    }
}

fn write_voices(dir: &Path) -> VoiceCatalog {
    dual_tts_core::wav::write_wav(dir.join("ly.wav"), &[0.0; 240], 24_000).unwrap();
    fs::write(dir.join("ly.txt"), "Xin chào, tôi là Ly.\n").unwrap();
    let map = serde_json::json!({
        PRESET: { "audio": "ly.wav", "text": "ly.txt", "gender": "female", "region": "north" },
        "Bình (nam miền Bắc)": { "audio": "binh.wav", "text": "binh.txt", "gender": "male" }
    });
    let map_path = dir.join("map.json");
    fs::write(&map_path, map.to_string()).unwrap();
    VoiceCatalog::from_mapfile(map_path).unwrap()
}

/// Create a test app instance
pub fn create_test_app(english_available: bool) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let voices = write_voices(dir.path());

    let secondary: Availability<Arc<dyn SecondaryCapability>> = if english_available {
        Availability::Available(Arc::new(FakeEnglish) as Arc<dyn SecondaryCapability>)
    } else {
        Availability::Unavailable("not installed".into())
    };
    let tts_config = DualTtsConfig {
        secondary_model: "fake-english".to_string(),
        ..DualTtsConfig::default()
    };
    let tts = DualTts::new(tts_config, Arc::new(FakeVieNeu), secondary);

    let config = ServerConfig {
        rate_limit_per_minute: 6_000,
        reference_dir: dir.path().to_path_buf(),
        ..ServerConfig::default()
    };
    let state = AppState::new(Arc::new(tts), voices, config);
    TestApp {
        router: build_app(state).unwrap(),
        dir,
    }
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
}
