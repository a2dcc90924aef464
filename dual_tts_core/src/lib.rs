//! Bilingual Vietnamese/English text-to-speech orchestration.
//!
//! Mixed text is split into language runs, Vietnamese runs go to a
//! voice-cloning backend, English runs to a second backend, and the results
//! are normalized to one format and joined with short pauses.
//!
//! ```no_run
//! use std::sync::Arc;
//! use dual_tts_core::{DualTts, DualTtsConfig, PiperEnglish};
//! # fn vieneu() -> Arc<dyn dual_tts_core::PrimaryCapability> { unimplemented!() }
//!
//! let tts = DualTts::new(
//!     DualTtsConfig::default(),
//!     vieneu(),
//!     PiperEnglish::probe("models/en_US/en_US-lessac-medium.onnx.json"),
//! );
//! let (wav, sr) = tts.synthesize_dual("Xin chào hello world nhé", "ref.wav", "câu mẫu")?;
//! dual_tts_core::wav::write_wav("out.wav", wav.samples(), sr)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod audio;
pub mod backend;
pub mod config;
pub mod dual;
pub mod error;
pub mod piper;
pub mod segment;
pub mod voices;
pub mod wav;

pub use audio::{concat_with_gap, normalize, RawAudio, SampleData, Waveform};
pub use backend::{
    Availability, PrimaryAdapter, PrimaryCapability, ReferenceCodes, SecondaryAdapter,
    SecondaryCapability, SegmentSynthesizer,
};
pub use config::DualTtsConfig;
pub use dual::{DualTts, SegmentReport, SynthesisReport};
pub use error::TtsError;
pub use piper::PiperEnglish;
pub use segment::{split_segments, Language, Segment};
pub use voices::{VoiceCatalog, VoiceEntry, VoiceReference};
