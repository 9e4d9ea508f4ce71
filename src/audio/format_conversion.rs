// Sample format conversion - f32 signal <-> 16-bit PCM <-> CPAL device types
//
// Called from audio callbacks: no allocation, no locking.

use cpal::{FromSample, Sample};

/// Asymmetric PCM range: 32767 above zero, 32768 below
const PCM_POSITIVE: f32 = i16::MAX as f32;
const PCM_NEGATIVE: f32 = 32768.0;

#[inline]
fn pcm_scale(negative: bool) -> f32 {
    if negative { PCM_NEGATIVE } else { PCM_POSITIVE }
}

/// Quantise to 16 bits, saturating outside [-1, 1]
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * pcm_scale(clamped < 0.0)) as i16
}

/// Exact inverse scaling of `f32_to_i16`
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / pcm_scale(sample < 0)
}

/// Fan the mixed mono signal out to every channel of one device frame
#[inline]
pub fn write_mono_to_interleaved_frame<T>(internal_sample: f32, output_frame: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    output_frame.fill(T::from_sample(internal_sample));
}

/// Mean of one interleaved microphone frame, 0.0 for a zero-channel frame
#[inline]
pub fn interleaved_frame_to_mono<T>(input_frame: &[T]) -> f32
where
    T: Sample,
    f32: FromSample<T>,
{
    match input_frame.len() {
        0 => 0.0,
        channels => {
            input_frame
                .iter()
                .fold(0.0, |acc, &s| acc + f32::from_sample(s))
                / channels as f32
        }
    }
}
