//! Waveform normalization and concatenation.
//!
//! Backends hand back audio in whatever shape they like: a WAV on disk, WAV
//! bytes off the wire, or interleaved samples of some numeric type at their
//! native rate. Everything is coerced here into mono `f32` at the engine's
//! canonical rate before it is stitched together.

use std::{
    io::{Cursor, Read},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use hound::{SampleFormat, WavReader};

/// Interleaved samples as produced by a backend, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I16(Vec<i16>),
    I32(Vec<i32>),
}

impl SampleData {
    pub fn len(&self) -> usize {
        match self {
            SampleData::F32(v) => v.len(),
            SampleData::F64(v) => v.len(),
            SampleData::I16(v) => v.len(),
            SampleData::I32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cast to `f32`. Integer PCM is scaled into [-1, 1].
    pub fn into_f32(self) -> Vec<f32> {
        match self {
            SampleData::F32(v) => v,
            SampleData::F64(v) => v.into_iter().map(|s| s as f32).collect(),
            SampleData::I16(v) => v.into_iter().map(|s| s as f32 / 32_768.0).collect(),
            SampleData::I32(v) => v.into_iter().map(|s| s as f32 / 2_147_483_648.0).collect(),
        }
    }
}

/// Backend output before normalization. Never stored past a single call.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAudio {
    /// WAV file on disk.
    File(PathBuf),
    /// WAV container held in memory.
    Encoded(Vec<u8>),
    /// Interleaved samples with their channel count and rate.
    Samples {
        data: SampleData,
        channels: u16,
        sample_rate: u32,
    },
}

impl RawAudio {
    /// Mono `f32` samples at `sample_rate`.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        RawAudio::Samples {
            data: SampleData::F32(samples),
            channels: 1,
            sample_rate,
        }
    }
}

/// Mono `f32` samples at the canonical rate of the pipeline that made it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform(Vec<f32>);

impl Waveform {
    pub fn new(samples: Vec<f32>) -> Self {
        Self(samples)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// `seconds` of zeros at `sample_rate`, rounded to whole samples.
    pub fn silence(seconds: f32, sample_rate: u32) -> Self {
        Self(vec![0.0; samples_for(seconds, sample_rate)])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn samples(&self) -> &[f32] {
        &self.0
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.0
    }

    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.0.len() as f32 / sample_rate as f32
    }

    pub fn duration_ms(&self, sample_rate: u32) -> u64 {
        if sample_rate == 0 {
            return 0;
        }
        self.0.len() as u64 * 1000 / sample_rate as u64
    }
}

impl From<Vec<f32>> for Waveform {
    fn from(samples: Vec<f32>) -> Self {
        Self(samples)
    }
}

fn samples_for(seconds: f32, sample_rate: u32) -> usize {
    (seconds.max(0.0) as f64 * sample_rate as f64).round() as usize
}

/// Coerce any backend output into a mono waveform at `target_rate`.
pub fn normalize(raw: RawAudio, target_rate: u32) -> anyhow::Result<Waveform> {
    let (data, channels, source_rate) = match raw {
        RawAudio::File(path) => read_wav_file(&path)?,
        RawAudio::Encoded(bytes) => decode_wav(Cursor::new(bytes)).context("Failed to decode WAV bytes")?,
        RawAudio::Samples {
            data,
            channels,
            sample_rate,
        } => (data, channels, sample_rate),
    };

    let mono = downmix(data.into_f32(), channels)?;
    let samples = resample_linear(&mono, source_rate, target_rate)?;
    Ok(Waveform(samples))
}

fn read_wav_file(path: &Path) -> anyhow::Result<(SampleData, u16, u32)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open audio file {}", path.display()))?;
    decode_wav(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to decode audio file {}", path.display()))
}

/// Decode a WAV container, returning interleaved samples, channels and rate.
pub fn decode_wav<R: Read>(reader: R) -> anyhow::Result<(SampleData, u16, u32)> {
    let mut reader = WavReader::new(reader)?;
    let spec = reader.spec();

    let data = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => SampleData::F32(reader.samples::<f32>().collect::<Result<_, _>>()?),
        (SampleFormat::Int, 16) => SampleData::I16(reader.samples::<i16>().collect::<Result<_, _>>()?),
        (SampleFormat::Int, bits @ (8 | 24 | 32)) => {
            // Shift up so every width shares the i32 full-scale range.
            let shift = 32 - bits as u32;
            let samples = reader
                .samples::<i32>()
                .map(|s| s.map(|v| v << shift))
                .collect::<Result<_, _>>()?;
            SampleData::I32(samples)
        }
        (format, bits) => bail!("Unsupported WAV format: {format:?} {bits}-bit"),
    };

    Ok((data, spec.channels, spec.sample_rate))
}

/// Average interleaved frames down to one channel.
pub fn downmix(interleaved: Vec<f32>, channels: u16) -> anyhow::Result<Vec<f32>> {
    match channels {
        0 => bail!("Audio reports zero channels"),
        1 => Ok(interleaved),
        n => {
            let n = n as usize;
            Ok(interleaved
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect())
        }
    }
}

/// Piecewise-linear resampling from `source_rate` to `target_rate`.
///
/// Output length is `ceil(len * target / source)`; positions past the last
/// source sample hold its value. Not band-limited.
pub fn resample_linear(samples: &[f32], source_rate: u32, target_rate: u32) -> anyhow::Result<Vec<f32>> {
    if source_rate == 0 || target_rate == 0 {
        bail!("Cannot resample from {source_rate} Hz to {target_rate} Hz");
    }
    if source_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let step = source_rate as f64 / target_rate as f64;
    let out_len = (samples.len() as f64 * target_rate as f64 / source_rate as f64).ceil() as usize;
    let last = samples.len() - 1;

    let out = (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let lo = pos.floor() as usize;
            if lo >= last {
                return samples[last];
            }
            let frac = (pos - lo as f64) as f32;
            samples[lo] * (1.0 - frac) + samples[lo + 1] * frac
        })
        .collect();
    Ok(out)
}

/// Join waveforms in order with `gap_seconds` of silence between neighbours.
pub fn concat_with_gap(waveforms: &[Waveform], sample_rate: u32, gap_seconds: f32) -> Waveform {
    if waveforms.is_empty() {
        return Waveform::empty();
    }

    let gap = samples_for(gap_seconds, sample_rate);
    let total = waveforms.iter().map(Waveform::len).sum::<usize>() + gap * (waveforms.len() - 1);

    let mut out = Vec::with_capacity(total);
    for (i, w) in waveforms.iter().enumerate() {
        if i > 0 {
            out.resize(out.len() + gap, 0.0);
        }
        out.extend_from_slice(w.samples());
    }
    Waveform(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f32], b: &[f32]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-6, "{x} != {y}");
        }
    }

    #[test]
    fn test_stereo_downmix_averages_frames() {
        let raw = RawAudio::Samples {
            data: SampleData::F32(vec![1.0, 0.0, 0.5, 0.5, -1.0, 0.2]),
            channels: 2,
            sample_rate: 24_000,
        };
        let wav = normalize(raw, 24_000).unwrap();
        assert_close(wav.samples(), &[0.5, 0.5, -0.4]);
    }

    #[test]
    fn test_zero_channels_rejected() {
        let raw = RawAudio::Samples {
            data: SampleData::F32(vec![0.1]),
            channels: 0,
            sample_rate: 24_000,
        };
        assert!(normalize(raw, 24_000).is_err());
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let input: Vec<f32> = (0..100).map(|i| (i as f32 * 0.1).sin()).collect();
        let out = resample_linear(&input, 24_000, 24_000).unwrap();
        assert_close(&out, &input);
    }

    #[test]
    fn test_resample_upsample_interpolates() {
        // 12 kHz -> 24 kHz doubles the length and inserts midpoints
        let out = resample_linear(&[0.0, 1.0, 0.0], 12_000, 24_000).unwrap();
        assert_close(&out, &[0.0, 0.5, 1.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_resample_downsample_length() {
        let input = vec![0.25f32; 22_050];
        let out = resample_linear(&input, 22_050, 24_000).unwrap();
        assert_eq!(out.len(), 24_000);
        assert!(out.iter().all(|s| (s - 0.25).abs() < 1e-6));

        let out = resample_linear(&vec![0.0f32; 48_000], 48_000, 24_000).unwrap();
        assert_eq!(out.len(), 24_000);
    }

    #[test]
    fn test_resample_zero_rate_errors() {
        assert!(resample_linear(&[0.0], 0, 24_000).is_err());
    }

    #[test]
    fn test_integer_types_are_scaled() {
        let raw = RawAudio::Samples {
            data: SampleData::I16(vec![i16::MIN, 0, 16_384]),
            channels: 1,
            sample_rate: 24_000,
        };
        let wav = normalize(raw, 24_000).unwrap();
        assert_close(wav.samples(), &[-1.0, 0.0, 0.5]);

        let f64_raw = RawAudio::Samples {
            data: SampleData::F64(vec![0.25, -0.75]),
            channels: 1,
            sample_rate: 24_000,
        };
        assert_close(normalize(f64_raw, 24_000).unwrap().samples(), &[0.25, -0.75]);
    }

    #[test]
    fn test_encoded_wav_round_trip_through_normalize() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 12_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..100 {
                writer.write_sample(16_384i16).unwrap();
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        let wav = normalize(RawAudio::Encoded(cursor.into_inner()), 24_000).unwrap();
        assert_eq!(wav.len(), 200);
        assert!(wav.samples().iter().all(|s| (s - 0.25).abs() < 1e-4));
    }

    fn int_wav(bits: u16, samples: &[i32]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 24_000,
            bits_per_sample: bits,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                if bits == 8 {
                    writer.write_sample(s as i8).unwrap();
                } else {
                    writer.write_sample(s).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_24_bit_pcm_is_scaled_to_unit_range() {
        let bytes = int_wav(24, &[8_388_607, -8_388_608, 4_194_304, 0]);
        let wav = normalize(RawAudio::Encoded(bytes), 24_000).unwrap();
        assert_close(wav.samples(), &[1.0, -1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_8_bit_pcm_is_scaled_to_unit_range() {
        let bytes = int_wav(8, &[127, -128, 64, 0]);
        let wav = normalize(RawAudio::Encoded(bytes), 24_000).unwrap();
        // 127/128 is the largest positive 8-bit value
        assert_close(wav.samples(), &[127.0 / 128.0, -1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_32_bit_int_pcm_is_scaled_to_unit_range() {
        let bytes = int_wav(32, &[i32::MIN, 1 << 30, -(1 << 29)]);
        let (data, channels, rate) = decode_wav(Cursor::new(bytes)).unwrap();
        assert_eq!((channels, rate), (1, 24_000));
        assert_close(&data.into_f32(), &[-1.0, 0.5, -0.25]);
    }

    #[test]
    fn test_file_reference_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 24_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0.1f32, -0.2, 0.3] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let wav = normalize(RawAudio::File(path), 24_000).unwrap();
        assert_close(wav.samples(), &[0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_missing_file_errors() {
        let err = normalize(RawAudio::File("/nonexistent/nothing.wav".into()), 24_000).unwrap_err();
        assert!(err.to_string().contains("Failed to open audio file"));
    }

    #[test]
    fn test_concat_inserts_gap_between_segments_only() {
        let a = Waveform::new(vec![1.0, 1.0]);
        let b = Waveform::new(vec![2.0]);
        let c = Waveform::new(vec![3.0, 3.0, 3.0]);
        // 0.001 s at 2 kHz = 2 samples of silence
        let out = concat_with_gap(&[a.clone(), b.clone(), c.clone()], 2_000, 0.001);
        assert_eq!(out.samples(), &[1.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 3.0, 3.0, 3.0]);

        let gap = vec![0.0; 2];
        let mut expected = concat_with_gap(&[a], 2_000, 0.001).into_samples();
        expected.extend(&gap);
        expected.extend(concat_with_gap(&[b], 2_000, 0.001).into_samples());
        expected.extend(&gap);
        expected.extend(concat_with_gap(&[c], 2_000, 0.001).into_samples());
        assert_eq!(out.samples(), expected.as_slice());
    }

    #[test]
    fn test_concat_empty_and_single() {
        assert!(concat_with_gap(&[], 24_000, 0.06).is_empty());
        let single = concat_with_gap(&[Waveform::new(vec![0.5; 10])], 24_000, 0.06);
        assert_eq!(single.len(), 10);
    }

    #[test]
    fn test_concat_gap_length_at_canonical_rate() {
        let out = concat_with_gap(&[Waveform::new(vec![1.0]), Waveform::new(vec![1.0])], 24_000, 0.06);
        assert_eq!(out.len(), 2 + 1_440);
    }

    #[test]
    fn test_silence_duration() {
        let s = Waveform::silence(0.48, 24_000);
        assert_eq!(s.len(), 11_520);
        assert!(s.samples().iter().all(|v| *v == 0.0));
        assert_eq!(s.duration_ms(24_000), 480);
    }
}
