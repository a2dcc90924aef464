//! Backend capabilities and the adapters that put them behind one interface.
//!
//! The two synthesis backends have different shapes: the Vietnamese one
//! clones a voice from a reference clip and needs a two-step
//! encode/infer dance, the English one just turns text into audio. Each is
//! wrapped in an adapter implementing [`SegmentSynthesizer`], so the
//! orchestrator only ever asks "synthesize this text in this language".

use std::{fmt, path::Path, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    audio::{normalize, RawAudio, Waveform},
    config::DualTtsConfig,
    error::{Result, TtsError},
    segment::Language,
    voices::VoiceReference,
};

/// Opaque speaker encoding produced by the Vietnamese backend from a
/// reference clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceCodes(pub Vec<i64>);

/// Voice-cloning synthesis capability (Vietnamese).
pub trait PrimaryCapability: Send + Sync {
    fn encode_reference(&self, reference_audio: &Path) -> anyhow::Result<ReferenceCodes>;

    fn infer(
        &self,
        text: &str,
        codes: Option<&ReferenceCodes>,
        reference_transcript: &str,
    ) -> anyhow::Result<RawAudio>;
}

/// Plain text-to-audio capability (English).
pub trait SecondaryCapability: Send + Sync {
    fn synthesize(&self, text: &str) -> anyhow::Result<RawAudio>;
}

/// Outcome of probing a backend at construction time.
#[derive(Debug, Clone)]
pub enum Availability<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Availability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Availability<U> {
        match self {
            Availability::Available(t) => Availability::Available(f(t)),
            Availability::Unavailable(reason) => Availability::Unavailable(reason),
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            Availability::Available(_) => None,
            Availability::Unavailable(reason) => Some(reason),
        }
    }
}

impl<T, E: fmt::Display> From<std::result::Result<T, E>> for Availability<T> {
    fn from(res: std::result::Result<T, E>) -> Self {
        match res {
            Ok(t) => Availability::Available(t),
            Err(e) => Availability::Unavailable(e.to_string()),
        }
    }
}

/// Uniform per-language synthesis entry point used by the orchestrator.
pub trait SegmentSynthesizer: Send + Sync {
    fn language(&self) -> Language;

    /// Synthesize one segment into a normalized waveform. `voice` is only
    /// consulted by backends that clone a voice.
    fn synthesize(&self, text: &str, voice: Option<&VoiceReference>) -> Result<Waveform>;
}

/// Fail-fast adapter over the Vietnamese backend.
pub struct PrimaryAdapter {
    backend: Arc<dyn PrimaryCapability>,
    sample_rate: u32,
}

impl PrimaryAdapter {
    pub fn new(backend: Arc<dyn PrimaryCapability>, sample_rate: u32) -> Self {
        Self { backend, sample_rate }
    }
}

impl SegmentSynthesizer for PrimaryAdapter {
    fn language(&self) -> Language {
        Language::Vietnamese
    }

    fn synthesize(&self, text: &str, voice: Option<&VoiceReference>) -> Result<Waveform> {
        let voice = voice.ok_or_else(|| TtsError::MissingVoiceReference {
            segment: text.to_string(),
        })?;

        // A bad reference clip degrades timbre but should not cost the call.
        let codes = match self.backend.encode_reference(&voice.audio_path) {
            Ok(codes) => Some(codes),
            Err(e) => {
                warn!(
                    "Reference encoding failed for {}: {e:#}; continuing without codes",
                    voice.audio_path.display()
                );
                None
            }
        };

        let raw = self
            .backend
            .infer(text, codes.as_ref(), &voice.transcript)
            .map_err(|source| TtsError::PrimaryInference {
                segment: text.to_string(),
                source,
            })?;

        normalize(raw, self.sample_rate).map_err(TtsError::Audio)
    }
}

/// Best-effort adapter over the English backend. Never returns an error.
pub struct SecondaryAdapter {
    backend: Availability<Arc<dyn SecondaryCapability>>,
    config: DualTtsConfig,
}

impl SecondaryAdapter {
    pub fn new(backend: Availability<Arc<dyn SecondaryCapability>>, config: DualTtsConfig) -> Self {
        if let Some(reason) = backend.unavailable_reason() {
            warn!(
                "English backend '{}' unavailable ({reason}); English segments will be rendered as silence",
                config.secondary_model
            );
        }
        Self { backend, config }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Infallible variant used directly by callers that do not need the
    /// trait object.
    pub fn synthesize_text(&self, text: &str) -> Waveform {
        if text.trim().is_empty() {
            return Waveform::empty();
        }

        let backend = match &self.backend {
            Availability::Available(backend) => backend,
            Availability::Unavailable(_) => {
                let words = text.split_whitespace().count();
                let secs = self.config.fallback_duration_secs(words);
                warn!("English backend unavailable, emitting {secs:.2}s of silence for {text:?}");
                return Waveform::silence(secs, self.config.sample_rate);
            }
        };

        let result = backend
            .synthesize(text)
            .and_then(|raw| normalize(raw, self.config.sample_rate));

        match result {
            Ok(waveform) => {
                debug!("English segment {text:?} -> {} samples", waveform.len());
                waveform
            }
            Err(e) => {
                warn!("English synthesis failed for {text:?}: {e:#}; dropping segment");
                Waveform::empty()
            }
        }
    }
}

impl SegmentSynthesizer for SecondaryAdapter {
    fn language(&self) -> Language {
        Language::English
    }

    fn synthesize(&self, text: &str, _voice: Option<&VoiceReference>) -> Result<Waveform> {
        Ok(self.synthesize_text(text))
    }
}
