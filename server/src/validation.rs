use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::ApiError;

/// Where the Vietnamese reference voice comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceChoice {
    Preset(String),
    Custom { audio: PathBuf, transcript: String },
}

/// Validate TTS text. Length is counted in characters, not bytes, since
/// Vietnamese diacritics are multi-byte.
pub fn validate_tts_request(text: &str, max_chars: usize) -> Result<(), ApiError> {
    if text.trim().is_empty() {
        return Err(ApiError::InvalidInput("Text cannot be empty".to_string()));
    }
    let chars = text.chars().count();
    if chars > max_chars {
        return Err(ApiError::InvalidInput(format!(
            "Text too long ({}/{} characters)",
            chars, max_chars
        )));
    }
    Ok(())
}

/// A custom reference (audio + transcript) wins over a preset; one of the
/// two must be given.
pub fn validate_voice_selection(
    voice: Option<&str>,
    ref_audio_path: Option<&str>,
    ref_text: Option<&str>,
) -> Result<VoiceChoice, ApiError> {
    let ref_audio_path = ref_audio_path.map(str::trim).filter(|s| !s.is_empty());
    let ref_text = ref_text.map(str::trim).filter(|s| !s.is_empty());

    match (ref_audio_path, ref_text) {
        (Some(audio), Some(transcript)) => Ok(VoiceChoice::Custom {
            audio: PathBuf::from(audio),
            transcript: transcript.to_string(),
        }),
        (Some(_), None) | (None, Some(_)) => Err(ApiError::InvalidInput(
            "Custom voice needs both ref_audio_path and ref_text".to_string(),
        )),
        (None, None) => match voice.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => Ok(VoiceChoice::Preset(name.to_string())),
            None => Err(ApiError::InvalidInput(
                "Select a preset voice or provide a custom reference".to_string(),
            )),
        },
    }
}

/// Resolve a client-supplied reference clip to a file under `reference_dir`.
///
/// Relative paths are taken from `reference_dir`. Absolute paths and `..`
/// components that leave the directory are rejected before the filesystem
/// is consulted, and symlinks are checked after canonicalization.
pub fn resolve_reference_path(reference_dir: &Path, requested: &Path) -> Result<PathBuf, ApiError> {
    let outside = || {
        ApiError::InvalidInput(
            "Reference audio must be a file inside the reference directory".to_string(),
        )
    };

    let root = reference_dir.canonicalize().map_err(|e| {
        warn!("Reference directory {} unusable: {}", reference_dir.display(), e);
        ApiError::InvalidInput("Custom reference voices are not available".to_string())
    })?;

    if requested.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(outside());
    }
    let candidate = if requested.is_absolute() {
        if !requested.starts_with(reference_dir) && !requested.starts_with(&root) {
            return Err(outside());
        }
        requested.to_path_buf()
    } else {
        root.join(requested)
    };

    let resolved = candidate.canonicalize().map_err(|_| {
        ApiError::NotFound(format!("Reference audio not found: {}", requested.display()))
    })?;
    if !resolved.starts_with(&root) || !resolved.is_file() {
        return Err(outside());
    }
    Ok(resolved)
}
