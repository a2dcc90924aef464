//! The dual-backend pipeline: segment, dispatch, normalize, concatenate.

use std::{
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    audio::{concat_with_gap, Waveform},
    backend::{
        Availability, PrimaryAdapter, PrimaryCapability, SecondaryAdapter, SecondaryCapability,
        SegmentSynthesizer,
    },
    config::DualTtsConfig,
    error::Result,
    segment::{split_segments, Language, Segment},
    voices::VoiceReference,
};

/// Per-segment detail of a finished synthesis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    pub language: Language,
    pub text: String,
    pub samples: usize,
}

/// Output of [`DualTts::synthesize_report`].
#[derive(Debug, Clone)]
pub struct SynthesisReport {
    pub waveform: Waveform,
    pub sample_rate: u32,
    pub segments: Vec<SegmentReport>,
    pub elapsed: Duration,
}

/// Bilingual synthesizer. Holds no per-call state, so one instance can
/// serve concurrent callers; only the backends themselves are shared.
pub struct DualTts {
    config: DualTtsConfig,
    primary: PrimaryAdapter,
    secondary: SecondaryAdapter,
}

impl DualTts {
    pub fn new(
        config: DualTtsConfig,
        primary: Arc<dyn PrimaryCapability>,
        secondary: Availability<Arc<dyn SecondaryCapability>>,
    ) -> Self {
        let primary = PrimaryAdapter::new(primary, config.sample_rate);
        let secondary = SecondaryAdapter::new(secondary, config.clone());
        Self {
            config,
            primary,
            secondary,
        }
    }

    pub fn config(&self) -> &DualTtsConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn secondary_available(&self) -> bool {
        self.secondary.is_available()
    }

    /// Segmentation preview without synthesizing anything.
    pub fn segments(&self, full_text: &str) -> Vec<Segment> {
        split_segments(full_text)
    }

    fn backend_for(&self, language: Language) -> &dyn SegmentSynthesizer {
        match language {
            Language::Vietnamese => &self.primary,
            Language::English => &self.secondary,
        }
    }

    /// Synthesize mixed text with the given reference clip and transcript.
    pub fn synthesize_dual(
        &self,
        full_text: &str,
        reference_audio_path: impl AsRef<Path>,
        reference_transcript: &str,
    ) -> Result<(Waveform, u32)> {
        let voice = VoiceReference::new(reference_audio_path.as_ref(), reference_transcript);
        self.synthesize(full_text, &voice)
    }

    pub fn synthesize(&self, full_text: &str, voice: &VoiceReference) -> Result<(Waveform, u32)> {
        let report = self.synthesize_report(full_text, voice)?;
        Ok((report.waveform, report.sample_rate))
    }

    /// Full pipeline, keeping per-segment sizes and wall-clock time.
    pub fn synthesize_report(&self, full_text: &str, voice: &VoiceReference) -> Result<SynthesisReport> {
        let start = Instant::now();
        let segments = split_segments(full_text);
        debug!("Split input into {} segment(s)", segments.len());

        let mut waveforms = Vec::with_capacity(segments.len());
        let mut reports = Vec::with_capacity(segments.len());

        for segment in segments {
            if segment.is_blank() {
                continue;
            }
            info!("Synth {} segment: {}", segment.language, segment.text);
            let waveform = self
                .backend_for(segment.language)
                .synthesize(&segment.text, Some(voice))?;

            reports.push(SegmentReport {
                language: segment.language,
                text: segment.text,
                samples: waveform.len(),
            });
            waveforms.push(waveform);
        }

        let waveform = concat_with_gap(&waveforms, self.config.sample_rate, self.config.gap_seconds);
        let elapsed = start.elapsed();
        info!(
            "Synthesized {} segment(s), {} samples in {:.2}s",
            reports.len(),
            waveform.len(),
            elapsed.as_secs_f64()
        );

        Ok(SynthesisReport {
            waveform,
            sample_rate: self.config.sample_rate,
            segments: reports,
            elapsed,
        })
    }
}
