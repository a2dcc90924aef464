use thiserror::Error;

/// Errors that terminate a dual synthesis call.
///
/// Degraded English paths never show up here; they are logged and absorbed
/// by the secondary adapter.
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Vietnamese synthesis needs a voice reference (segment {segment:?})")]
    MissingVoiceReference { segment: String },

    #[error("Vietnamese inference failed for segment {segment:?}: {source}")]
    PrimaryInference {
        segment: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Audio normalization failed: {0}")]
    Audio(#[source] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TtsError>;
