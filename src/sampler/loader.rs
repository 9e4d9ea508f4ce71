// Sample loader - Turns an opaque sample handle into mono f32 audio

use claxon::FlacReader;
use hound::{SampleFormat, WavReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Empty sample handle")]
    EmptyHandle,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("FLAC error: {0}")]
    Flac(#[from] claxon::Error),

    #[error("Sample contains no audio: {0}")]
    NoAudio(String),
}

/// Decoded sample, downmixed to mono
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub data: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source file
    pub channels: u16,
}

impl Sample {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.sample_rate as f64
    }
}

/// Resolve a handle to a filesystem path. Plain paths and `file://` URIs are
/// accepted.
pub fn handle_to_path(handle: &str) -> Result<PathBuf, SampleError> {
    let trimmed = handle.trim();
    let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
    if path.is_empty() {
        return Err(SampleError::EmptyHandle);
    }
    Ok(PathBuf::from(path))
}

/// Load the sample a handle points at
pub fn load_sample(handle: &str) -> Result<Sample, SampleError> {
    let path = handle_to_path(handle)?;
    let sample = load_sample_file(&path)?;
    if sample.is_empty() {
        return Err(SampleError::NoAudio(sample.name));
    }
    Ok(sample)
}

/// Load a WAV or FLAC file, chosen by extension
pub fn load_sample_file(path: &Path) -> Result<Sample, SampleError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "wav" | "wave" => load_wav(path),
        "flac" => load_flac(path),
        _ => Err(SampleError::UnsupportedFormat(extension)),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn load_wav(path: &Path) -> Result<Sample, SampleError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample as u32);
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(Sample {
        name: file_name(path),
        data: downmix(&interleaved, spec.channels),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

fn load_flac(path: &Path) -> Result<Sample, SampleError> {
    let mut reader = FlacReader::open(path)?;
    let info = reader.streaminfo();
    let scale = int_scale(info.bits_per_sample);

    let interleaved: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / scale))
        .collect::<Result<_, _>>()?;

    let channels = info.channels as u16;
    Ok(Sample {
        name: file_name(path),
        data: downmix(&interleaved, channels),
        sample_rate: info.sample_rate,
        channels,
    })
}

/// Full-scale value for a signed integer sample of `bits` bits
fn int_scale(bits: u32) -> f32 {
    (1u64 << (bits.clamp(1, 32) - 1)) as f32
}

/// Average interleaved frames down to one channel
fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
