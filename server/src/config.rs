// Configuration for the server, read from the environment

use std::{path::PathBuf, str::FromStr, time::Duration};

use dual_tts_core::DualTtsConfig;

/// Which English backend to wire into the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EnglishBackend {
    /// Local Piper voice, given its `.onnx.json` config.
    Piper(PathBuf),
    /// Remote Coqui `tts-server`.
    Coqui { url: String, speaker: Option<String> },
    /// English segments always fall back to silence.
    Disabled,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub max_text_chars: usize,
    pub voices_map: PathBuf,
    /// Custom reference clips must resolve to a file under this directory.
    pub reference_dir: PathBuf,
    pub vieneu_url: String,
    pub english_backend: EnglishBackend,
    pub tts: DualTtsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let english_backend = EnglishBackend::Piper(PathBuf::from(
            "models/en_US/en_US-lessac-medium.onnx.json",
        ));
        let tts = DualTtsConfig {
            secondary_model: english_backend.model_label(),
            ..DualTtsConfig::default()
        };
        Self {
            port: 8085,
            rate_limit_per_minute: 60,
            request_timeout_secs: 120,
            cors_allowed_origins: None,
            max_text_chars: 250,
            voices_map: PathBuf::from("voices/map.json"),
            reference_dir: PathBuf::from("voices"),
            vieneu_url: "http://127.0.0.1:8001".to_string(),
            english_backend,
            tts,
        }
    }
}

impl EnglishBackend {
    /// Model label for this backend when `ENGLISH_MODEL` is not set.
    pub fn model_label(&self) -> String {
        match self {
            EnglishBackend::Piper(config) => config
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.trim_end_matches(".json").trim_end_matches(".onnx").to_string())
                .unwrap_or_else(|| config.display().to_string()),
            EnglishBackend::Coqui { .. } => DualTtsConfig::default().secondary_model,
            EnglishBackend::Disabled => "none".to_string(),
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect()
            });

        let english_backend = match std::env::var("ENGLISH_BACKEND")
            .unwrap_or_else(|_| "piper".into())
            .to_lowercase()
            .as_str()
        {
            "coqui" => EnglishBackend::Coqui {
                url: std::env::var("COQUI_URL").unwrap_or_else(|_| "http://127.0.0.1:5002".into()),
                speaker: std::env::var("COQUI_SPEAKER").ok().filter(|s| !s.trim().is_empty()),
            },
            "none" | "off" | "disabled" => EnglishBackend::Disabled,
            _ => EnglishBackend::Piper(env_or(
                "PIPER_CONFIG",
                PathBuf::from("models/en_US/en_US-lessac-medium.onnx.json"),
            )),
        };

        let tts = DualTtsConfig {
            sample_rate: env_or("TTS_SAMPLE_RATE", defaults.tts.sample_rate),
            gap_seconds: env_or("TTS_GAP_SECONDS", defaults.tts.gap_seconds),
            secondary_model: std::env::var("ENGLISH_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| english_backend.model_label()),
            ..defaults.tts
        };

        Self {
            port: env_or("PORT", defaults.port),
            rate_limit_per_minute: env_or("RATE_LIMIT_PER_MINUTE", defaults.rate_limit_per_minute),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            cors_allowed_origins,
            max_text_chars: env_or("MAX_TEXT_CHARS", defaults.max_text_chars),
            voices_map: env_or("VOICES_MAP", defaults.voices_map),
            reference_dir: env_or("REFERENCE_DIR", defaults.reference_dir),
            vieneu_url: std::env::var("VIENEU_URL").unwrap_or(defaults.vieneu_url),
            english_backend,
            tts,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
