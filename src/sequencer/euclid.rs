// Euclidean rhythms - Even distribution of pulses over steps
//
// Pulse i lands on floor(i * steps / pulses). This gives the same maximally
// even spread as Bjorklund's algorithm without recursion; ties are broken by
// truncation, so the first pulse is always on step 0.

/// Firing mask of length `steps` with `min(pulses, steps)` true entries
pub fn generate(steps: usize, pulses: usize) -> Vec<bool> {
    let mut pattern = vec![false; steps];
    if steps == 0 || pulses == 0 {
        return pattern;
    }

    let pulses = pulses.min(steps);
    for i in 0..pulses {
        // Integer form of floor(i * steps / pulses)
        let index = (i * steps / pulses).min(steps - 1);
        pattern[index] = true;
    }
    pattern
}

/// Number of true entries in a mask
pub fn pulse_count(pattern: &[bool]) -> usize {
    pattern.iter().filter(|&&hit| hit).count()
}
