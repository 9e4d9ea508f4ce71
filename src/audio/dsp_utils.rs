// DSP utilities - Sample hygiene for the real-time callbacks

/// Flush values too small to matter to zero
///
/// Denormal floats can slow some CPUs down badly inside the callback.
/// Threshold: 1e-15, far below 32-bit float noise.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Clamp into [-1, 1]
#[inline]
pub fn hard_clip(x: f32) -> f32 {
    x.clamp(-1.0, 1.0)
}

/// Largest absolute value in a 16-bit buffer, as i32 so that i16::MIN fits
pub fn peak_abs(samples: &[i16]) -> i32 {
    samples.iter().map(|&s| (s as i32).abs()).max().unwrap_or(0)
}

/// Linear-interpolation resampling of 16-bit audio from `from_rate` to `to_rate`.
///
/// The output covers the same duration: `ceil(len * to_rate / from_rate)` samples.
pub fn resample_linear(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return Vec::new();
    }
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let step = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 * to_rate as f64 / from_rate as f64).ceil() as usize;
    let last = samples.len() - 1;
    (0..out_len)
        .map(|i| {
            let position = i as f64 * step;
            let index = (position as usize).min(last);
            let next = (index + 1).min(last);
            let frac = position - index as f64;
            let a = samples[index] as f64;
            let b = samples[next] as f64;
            (a + (b - a) * frac)
                .round()
                .clamp(i16::MIN as f64, i16::MAX as f64) as i16
        })
        .collect()
}
