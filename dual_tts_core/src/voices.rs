use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// A reference clip and its exact transcript, conditioning the Vietnamese
/// voice. Borrowed by the engine, never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceReference {
    pub audio_path: PathBuf,
    pub transcript: String,
}

impl VoiceReference {
    pub fn new(audio_path: impl Into<PathBuf>, transcript: impl Into<String>) -> Self {
        Self {
            audio_path: audio_path.into(),
            transcript: transcript.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceEntry {
    /// Reference WAV.
    pub audio: PathBuf,
    /// Text file holding the transcript of `audio`.
    pub text: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// Preset voices keyed by display name, e.g. `"Ly (nữ miền Bắc)"`.
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    voices: BTreeMap<String, VoiceEntry>,
}

impl VoiceCatalog {
    pub fn new(voices: BTreeMap<String, VoiceEntry>) -> Self {
        Self { voices }
    }

    /// Load `voices/map.json`. Relative paths inside the map resolve
    /// against the map's own directory.
    pub fn from_mapfile<P: AsRef<Path>>(p: P) -> anyhow::Result<Self> {
        let path = p.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        let mut voices: BTreeMap<String, VoiceEntry> = serde_json::from_str(&text)
            .with_context(|| format!("{} is not a valid voice map", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        for entry in voices.values_mut() {
            if entry.audio.is_relative() {
                entry.audio = base.join(&entry.audio);
            }
            if entry.text.is_relative() {
                entry.text = base.join(&entry.text);
            }
        }

        Ok(Self { voices })
    }

    /// Voice names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.voices.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn entry(&self, name: &str) -> Option<&VoiceEntry> {
        self.voices.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VoiceEntry)> {
        self.voices.iter()
    }

    /// Resolve a preset into a [`VoiceReference`], reading its transcript.
    pub fn load_reference(&self, name: &str) -> anyhow::Result<VoiceReference> {
        let entry = self.voices.get(name).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown voice '{}'. Available voices: {}",
                name,
                self.names().join(", ")
            )
        })?;

        if !entry.audio.exists() {
            anyhow::bail!("Reference audio not found: {}", entry.audio.display());
        }
        let transcript = fs::read_to_string(&entry.text)
            .with_context(|| format!("Failed to read transcript {}", entry.text.display()))?;

        Ok(VoiceReference::new(entry.audio.clone(), transcript.trim()))
    }
}
