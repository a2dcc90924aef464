use serde::{Deserialize, Serialize};

/// Engine settings handed to [`crate::DualTts`] at construction.
///
/// Nothing here is read from process-wide state; callers build one (usually
/// via `Default`) and the orchestrator keeps it immutable for its lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DualTtsConfig {
    /// Canonical output rate every segment is normalized to.
    pub sample_rate: u32,
    /// Silence inserted between consecutive segments, in seconds.
    pub gap_seconds: f32,
    /// Label of the English model, used in logs and status output. The
    /// backend itself is picked by whoever builds the [`crate::DualTts`].
    pub secondary_model: String,
    /// Shortest placeholder emitted when the English backend is unavailable.
    pub fallback_min_secs: f32,
    /// Placeholder length per English word when the backend is unavailable.
    pub fallback_secs_per_word: f32,
}

impl Default for DualTtsConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24_000,
            gap_seconds: 0.06,
            secondary_model: "tts_models/en/vctk/vits".to_string(),
            fallback_min_secs: 0.25,
            fallback_secs_per_word: 0.12,
        }
    }
}

impl DualTtsConfig {
    /// Placeholder duration for an English segment of `word_count` words.
    pub fn fallback_duration_secs(&self, word_count: usize) -> f32 {
        (self.fallback_secs_per_word * word_count as f32).max(self.fallback_min_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = DualTtsConfig::default();
        assert_eq!(cfg.sample_rate, 24_000);
        assert!((cfg.gap_seconds - 0.06).abs() < 1e-6);
        assert_eq!(cfg.secondary_model, "tts_models/en/vctk/vits");
    }

    #[test]
    fn test_fallback_duration_scales_with_words() {
        let cfg = DualTtsConfig::default();
        assert!((cfg.fallback_duration_secs(1) - 0.25).abs() < 1e-6);
        assert!((cfg.fallback_duration_secs(4) - 0.48).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: DualTtsConfig = serde_json::from_str(r#"{"gap_seconds": 0.1}"#).unwrap();
        assert!((cfg.gap_seconds - 0.1).abs() < 1e-6);
        assert_eq!(cfg.sample_rate, 24_000);
    }
}
