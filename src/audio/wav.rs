// WAV output - Peak normalisation and RIFF/WAVE writing for recordings

use crate::audio::dsp_utils::{peak_abs, resample_linear};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Recordings are always written at this rate
pub const RECORDING_SAMPLE_RATE: u32 = 44100;

/// Fraction of full scale the loudest sample is scaled to
pub const TARGET_PEAK: f64 = 0.9;

#[derive(Debug, Error)]
pub enum WavError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Scale so the peak lands on 90% of full scale.
///
/// The gain is computed from `max(1, peak)`, so silence stays silent. Scaled
/// values are clamped to the i16 range and truncated toward zero.
pub fn normalize(samples: &[i16]) -> Vec<i16> {
    let peak = peak_abs(samples).max(1) as f64;
    let gain = TARGET_PEAK * i16::MAX as f64 / peak;
    samples
        .iter()
        .map(|&s| (s as f64 * gain).clamp(i16::MIN as f64, i16::MAX as f64) as i16)
        .collect()
}

/// Write mono 16-bit PCM, creating parent directories as needed
pub fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<(), WavError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Bring a buffer captured at `capture_rate` to the recording rate, normalise
/// it and write it
pub fn save_recording(path: &Path, samples: &[i16], capture_rate: u32) -> Result<(), WavError> {
    let resampled = resample_linear(samples, capture_rate, RECORDING_SAMPLE_RATE);
    if capture_rate != RECORDING_SAMPLE_RATE {
        log::debug!(
            "Resampled recording {} Hz -> {} Hz",
            capture_rate,
            RECORDING_SAMPLE_RATE
        );
    }
    let normalized = normalize(&resampled);
    write_wav(path, &normalized, RECORDING_SAMPLE_RATE)?;
    log::info!(
        "Wrote recording {} ({} samples)",
        path.display(),
        normalized.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;
    use tempfile::tempdir;

    #[test]
    fn test_normalized_peak_is_ninety_percent() {
        let out = normalize(&[100, -400, 250, 0]);
        assert_eq!(peak_abs(&out), 29490);
        assert_eq!(out[1], -29490);
        // 100 * 29490.3 / 400 = 7372.575, truncated
        assert_eq!(out[0], 7372);
    }

    #[test]
    fn test_quiet_input_is_boosted() {
        let out = normalize(&[1, -1]);
        assert_eq!(out, vec![29490, -29490]);
    }

    #[test]
    fn test_silence_stays_silent() {
        assert_eq!(normalize(&[0, 0, 0]), vec![0, 0, 0]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_full_scale_negative_peak() {
        let out = normalize(&[i16::MIN, i16::MAX]);
        assert!(out.iter().all(|&s| (s as i32).abs() <= 29490));
    }

    #[test]
    fn test_saved_recording_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("mic_rec_snare.wav");
        save_recording(&path, &[0, 1000, -2000, 500], 44100).unwrap();

        let mut reader = WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.sample_format, SampleFormat::Int);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 4);
        assert_eq!(samples[2], -29490);
    }

    #[test]
    fn test_recording_from_48k_capture_keeps_duration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mic_rec_kick.wav");
        // Half a second at 48 kHz
        let captured: Vec<i16> = (0..24000).map(|i| ((i % 96) as i16 - 48) * 100).collect();
        save_recording(&path, &captured, 48000).unwrap();

        let reader = WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, RECORDING_SAMPLE_RATE);
        let seconds = reader.duration() as f64 / reader.spec().sample_rate as f64;
        assert!((seconds - 0.5).abs() < 1e-3, "duration {}", seconds);
    }
}
