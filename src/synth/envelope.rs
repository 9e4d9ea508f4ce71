// Percussive envelope - Linear attack / hold / decay over a fixed-length buffer
//
// The envelope is defined over the whole buffer: it ramps 0 → 1 during the
// attack window, holds 1, and ramps 1 → 0 over the decay window that ends on
// the last sample of the buffer.

/// Attack and decay lengths expressed in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    /// Attack time in milliseconds
    pub attack_ms: f64,
    /// Decay time in milliseconds (ends on the last sample)
    pub decay_ms: f64,
}

impl EnvelopeParams {
    pub fn new(attack_ms: f64, decay_ms: f64) -> Self {
        Self {
            attack_ms: attack_ms.max(0.0),
            decay_ms: decay_ms.max(0.0),
        }
    }
}

/// Envelope resolved to sample counts for one buffer length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercussiveEnvelope {
    len: usize,
    attack: usize,
    decay: usize,
}

impl PercussiveEnvelope {
    /// Build an envelope directly from sample counts.
    ///
    /// `attack` is clamped to `len` and `decay` to what is left after the attack,
    /// so `attack + decay <= len` always holds.
    pub fn from_samples(len: usize, attack: usize, decay: usize) -> Self {
        let attack = attack.min(len);
        let decay = decay.min(len - attack);
        Self { len, attack, decay }
    }

    /// Resolve millisecond parameters against a buffer length and sample rate
    pub fn new(params: EnvelopeParams, len: usize, sample_rate: f64) -> Self {
        let attack = ms_to_samples(params.attack_ms, sample_rate);
        let decay = ms_to_samples(params.decay_ms, sample_rate);
        Self::from_samples(len, attack, decay)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn attack_samples(&self) -> usize {
        self.attack
    }

    pub fn decay_samples(&self) -> usize {
        self.decay
    }

    /// Index of the first sample of the decay ramp
    fn decay_start(&self) -> usize {
        self.len - self.decay
    }

    /// Envelope gain at sample `i`
    #[inline]
    pub fn value(&self, i: usize) -> f64 {
        if i < self.attack {
            i as f64 / self.attack as f64
        } else if i >= self.decay_start() {
            if self.decay == 0 {
                return 0.0;
            }
            let k = i - self.decay_start();
            1.0 - k as f64 / self.decay as f64
        } else {
            1.0
        }
    }
}

/// Convert a duration in milliseconds to a rounded sample count
#[inline]
pub fn ms_to_samples(ms: f64, sample_rate: f64) -> usize {
    (ms * sample_rate / 1000.0).round().max(0.0) as usize
}
