//! HTTP clients for model servers that host the synthesis backends.
//!
//! The Vietnamese voice-cloning model and the Coqui English models are
//! Python-hosted; these clients speak to them over plain JSON/WAV HTTP and
//! expose them as the engine's backend capabilities.

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dual_tts_core::{Availability, PrimaryCapability, RawAudio, ReferenceCodes, SecondaryCapability};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

#[derive(Serialize)]
struct EncodeRequest<'a> {
    path: &'a str,
}

#[derive(Deserialize)]
struct EncodeResponse {
    codes: Vec<i64>,
}

#[derive(Serialize)]
struct InferRequest<'a> {
    text: &'a str,
    ref_codes: Option<&'a [i64]>,
    ref_text: &'a str,
}

#[derive(Deserialize)]
struct InferResponse {
    audio: Vec<f32>,
    #[serde(default = "default_vieneu_rate")]
    sample_rate: u32,
}

fn default_vieneu_rate() -> u32 {
    24_000
}

/// Client for a VieNeu-TTS inference server (Vietnamese, voice cloning).
pub struct VieNeuClient {
    base_url: String,
    client: Client,
}

impl VieNeuClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl PrimaryCapability for VieNeuClient {
    fn encode_reference(&self, reference_audio: &Path) -> Result<ReferenceCodes> {
        let path = reference_audio.to_string_lossy();
        let response = self
            .client
            .post(format!("{}/encode_reference", self.base_url))
            .json(&EncodeRequest { path: &path })
            .send()?
            .error_for_status()?
            .json::<EncodeResponse>()
            .context("Invalid encode_reference response")?;

        debug!("Encoded reference {} into {} codes", path, response.codes.len());
        Ok(ReferenceCodes(response.codes))
    }

    fn infer(
        &self,
        text: &str,
        codes: Option<&ReferenceCodes>,
        reference_transcript: &str,
    ) -> Result<RawAudio> {
        let req_body = InferRequest {
            text,
            ref_codes: codes.map(|c| c.0.as_slice()),
            ref_text: reference_transcript,
        };

        let response = self
            .client
            .post(format!("{}/infer", self.base_url))
            .json(&req_body)
            .send()?
            .error_for_status()? // convert non-200 into error
            .json::<InferResponse>()
            .context("Invalid infer response")?;

        Ok(RawAudio::mono(response.audio, response.sample_rate))
    }
}

/// Client for Coqui TTS's bundled `tts-server` (English, no cloning).
pub struct CoquiClient {
    base_url: String,
    client: Client,
    speaker_id: Option<String>,
}

impl CoquiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(DEFAULT_TIMEOUT)?,
            speaker_id: None,
        })
    }

    /// Multi-speaker models (e.g. VCTK) need a speaker.
    pub fn with_speaker(mut self, speaker_id: impl Into<String>) -> Self {
        self.speaker_id = Some(speaker_id.into());
        self
    }

    /// Check that the server answers before handing it to the engine.
    pub fn probe(base_url: &str, speaker_id: Option<&str>) -> Availability<Arc<dyn SecondaryCapability>> {
        let check = || -> Result<Self> {
            let mut client = Self::new(base_url)?;
            if let Some(speaker) = speaker_id {
                client = client.with_speaker(speaker);
            }
            client
                .client
                .get(format!("{}/", client.base_url))
                .timeout(Duration::from_secs(5))
                .send()
                .with_context(|| format!("Coqui server not reachable at {}", client.base_url))?
                .error_for_status()?;
            Ok(client)
        };

        match check() {
            Ok(client) => {
                info!("Coqui TTS server available at {}", client.base_url);
                Availability::Available(Arc::new(client) as Arc<dyn SecondaryCapability>)
            }
            Err(e) => Availability::Unavailable(format!("{e:#}")),
        }
    }
}

impl SecondaryCapability for CoquiClient {
    fn synthesize(&self, text: &str) -> Result<RawAudio> {
        let mut query = vec![("text", text)];
        if let Some(speaker) = self.speaker_id.as_deref() {
            query.push(("speaker_id", speaker));
        }

        let bytes = self
            .client
            .get(format!("{}/api/tts", self.base_url))
            .query(&query)
            .send()?
            .error_for_status()?
            .bytes()?;

        Ok(RawAudio::Encoded(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn wav_bytes(samples: &[i16], sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_vieneu_encode_and_infer() {
        let mut server = mockito::Server::new();
        let encode = server
            .mock("POST", "/encode_reference")
            .match_body(Matcher::Json(serde_json::json!({ "path": "voices/ly.wav" })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"codes": [4, 8, 15]}"#)
            .create();
        let infer = server
            .mock("POST", "/infer")
            .match_body(Matcher::Json(serde_json::json!({
                "text": "xin chào",
                "ref_codes": [4, 8, 15],
                "ref_text": "câu mẫu"
            })))
            .with_header("content-type", "application/json")
            .with_body(r#"{"audio": [0.1, 0.2], "sample_rate": 24000}"#)
            .create();

        let client = VieNeuClient::new(&format!("{}/", server.url())).unwrap();
        let codes = client.encode_reference(Path::new("voices/ly.wav")).unwrap();
        assert_eq!(codes, ReferenceCodes(vec![4, 8, 15]));

        let audio = client.infer("xin chào", Some(&codes), "câu mẫu").unwrap();
        assert_eq!(audio, RawAudio::mono(vec![0.1, 0.2], 24_000));

        encode.assert();
        infer.assert();
    }

    #[test]
    fn test_vieneu_infer_without_codes_sends_null() {
        let mut server = mockito::Server::new();
        let infer = server
            .mock("POST", "/infer")
            .match_body(Matcher::PartialJson(serde_json::json!({ "ref_codes": null })))
            .with_body(r#"{"audio": []}"#)
            .create();

        let client = VieNeuClient::new(&server.url()).unwrap();
        let audio = client.infer("chào", None, "câu mẫu").unwrap();
        assert_eq!(audio, RawAudio::mono(Vec::new(), 24_000));
        infer.assert();
    }

    #[test]
    fn test_vieneu_server_error_propagates() {
        let mut server = mockito::Server::new();
        let _infer = server.mock("POST", "/infer").with_status(500).create();

        let client = VieNeuClient::new(&server.url()).unwrap();
        assert!(client.infer("chào", None, "câu mẫu").is_err());
    }

    #[test]
    fn test_coqui_synthesize_returns_wav() {
        let mut server = mockito::Server::new();
        let body = wav_bytes(&[0, 100, -100], 22_050);
        let tts = server
            .mock("GET", "/api/tts")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("text".into(), "hello world".into()),
                Matcher::UrlEncoded("speaker_id".into(), "p225".into()),
            ]))
            .with_header("content-type", "audio/wav")
            .with_body(body.clone())
            .create();

        let client = CoquiClient::new(&server.url()).unwrap().with_speaker("p225");
        let audio = client.synthesize("hello world").unwrap();
        assert_eq!(audio, RawAudio::Encoded(body));
        tts.assert();
    }

    #[test]
    fn test_coqui_probe() {
        let mut server = mockito::Server::new();
        let _root = server.mock("GET", "/").with_body("ok").create();
        assert!(CoquiClient::probe(&server.url(), None).is_available());

        let down = CoquiClient::probe("http://127.0.0.1:9", None);
        assert!(!down.is_available());
        assert!(down.unavailable_reason().unwrap().contains("not reachable"));
    }
}
