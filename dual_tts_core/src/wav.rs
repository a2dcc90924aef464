//! WAV output for callers that persist or ship the final waveform.

use std::{io::Cursor, path::Path};

use anyhow::Context;
use base64::Engine;

fn pcm16_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

const I16_MAX_F32: f32 = i16::MAX as f32;

fn write_samples<W: std::io::Write + std::io::Seek>(
    writer: &mut hound::WavWriter<W>,
    samples: &[f32],
) -> anyhow::Result<()> {
    for &s in samples {
        // Clamp and convert f32 [-1.0, 1.0] -> i16
        let v = (s.clamp(-1.0, 1.0) * I16_MAX_F32) as i16;
        writer
            .write_sample(v)
            .map_err(|e| anyhow::anyhow!("wav sample err: {e}"))?;
    }
    Ok(())
}

/// Encode mono PCM f32 samples as a 16-bit PCM WAV container.
pub fn encode_wav_bytes(samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    // WAV header (44 bytes) + 2 bytes per sample
    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, pcm16_spec(sample_rate))
            .map_err(|e| anyhow::anyhow!("wav write err: {e}"))?;
        write_samples(&mut writer, samples)?;
        writer
            .finalize()
            .map_err(|e| anyhow::anyhow!("wav finalize err: {e}"))?;
    }
    Ok(cursor.into_inner())
}

/// Same as [`encode_wav_bytes`], Base64 encoded for JSON transport.
pub fn encode_wav_base64(samples: &[f32], sample_rate: u32) -> anyhow::Result<String> {
    let bytes = encode_wav_bytes(samples, sample_rate)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Write a 16-bit PCM WAV file to `path`.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f32], sample_rate: u32) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut writer = hound::WavWriter::create(path, pcm16_spec(sample_rate))
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_samples(&mut writer, samples)?;
    writer
        .finalize()
        .with_context(|| format!("Failed to finalize {}", path.display()))
}
