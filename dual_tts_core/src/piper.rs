//! Local English backend on top of piper-rs.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use anyhow::Context;
use piper_rs::synth::{PiperSpeechStreamParallel, PiperSpeechSynthesizer};
use tracing::info;

use crate::{
    audio::RawAudio,
    backend::{Availability, SecondaryCapability},
};

pub struct PiperEnglish {
    // RwLock so concurrent requests only take read locks
    synth: RwLock<PiperSpeechSynthesizer>,
    sample_rate: u32,
    config_path: PathBuf,
}

// PiperSpeechSynthesizer doesn't implement Debug
impl std::fmt::Debug for PiperEnglish {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PiperEnglish")
            .field("synth", &"<PiperSpeechSynthesizer>")
            .field("sample_rate", &self.sample_rate)
            .field("config_path", &self.config_path)
            .finish()
    }
}

impl PiperEnglish {
    /// Load a Piper voice from its `.onnx.json` config.
    pub fn load<P: AsRef<Path>>(cfg_path: P) -> anyhow::Result<Self> {
        let cfg_path = cfg_path.as_ref();
        let sample_rate = read_sample_rate(cfg_path)?;
        let model = piper_rs::from_config_path(cfg_path)
            .map_err(|e| anyhow::anyhow!("piper load error: {e}"))?;
        let synth = PiperSpeechSynthesizer::new(model)
            .map_err(|e| anyhow::anyhow!("piper synthesizer error: {e}"))?;

        info!("Loaded Piper English voice {} ({} Hz)", cfg_path.display(), sample_rate);
        Ok(Self {
            synth: RwLock::new(synth),
            sample_rate,
            config_path: cfg_path.to_path_buf(),
        })
    }

    /// Constructor-time probe: a missing or broken model is reported as
    /// `Unavailable` instead of an error.
    pub fn probe<P: AsRef<Path>>(cfg_path: P) -> Availability<Arc<dyn SecondaryCapability>> {
        Availability::from(Self::load(cfg_path).map_err(|e| format!("{e:#}")))
            .map(|piper| Arc::new(piper) as Arc<dyn SecondaryCapability>)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl SecondaryCapability for PiperEnglish {
    fn synthesize(&self, text: &str) -> anyhow::Result<RawAudio> {
        let synth = self
            .synth
            .read()
            .map_err(|_| anyhow::anyhow!("Piper synthesizer lock poisoned"))?;

        let iter: PiperSpeechStreamParallel = synth
            .synthesize_parallel(text.to_string(), None)
            .map_err(|e| anyhow::anyhow!("piper synth error: {e}"))?;

        let mut samples: Vec<f32> = Vec::new();
        for part in iter {
            samples.extend(part.map_err(|e| anyhow::anyhow!("chunk error: {e}"))?.into_vec());
        }
        Ok(RawAudio::mono(samples, self.sample_rate))
    }
}

/// Read `audio.sample_rate` from a Piper model config.
pub fn read_sample_rate<P: AsRef<Path>>(cfg_path: P) -> anyhow::Result<u32> {
    let text = fs::read_to_string(cfg_path.as_ref())
        .with_context(|| format!("Failed to read config file: {}", cfg_path.as_ref().display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| "Config file is not valid JSON")?;

    let sample_rate = json
        .get("audio")
        .and_then(|a| a.get("sample_rate"))
        .and_then(|sr| sr.as_u64())
        .ok_or_else(|| anyhow::anyhow!("Missing or invalid 'audio.sample_rate' in config"))?;

    Ok(sample_rate as u32)
}
