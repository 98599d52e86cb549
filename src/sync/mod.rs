//! Coarse time/frequency synchronization search.
//!
//! Locates candidate FT8/JS8 transmissions inside a frame by correlating a
//! sliding window against the 7-tone Costas sync pattern.

use crate::constants::{COSTAS, SAMPLE_RATE, SYMBOL_LEN};
use crate::fft;

/// A coarse sync hit: frequency (Hz, relative to baseband center), time
/// offset (seconds from frame start), and correlation strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub freq_hz: f32,
    pub time_sec: f32,
    pub metric: f32,
}

/// Search `frame` (complex baseband samples) for Costas sync candidates.
/// Returns an empty list if the frame is too short to hold even one full
/// 7-symbol sync block.
pub fn detect(frame: &[(f32, f32)]) -> Vec<Candidate> {
    let l = SYMBOL_LEN;
    if frame.len() < 7 * l {
        return Vec::new();
    }

    let step = l / 2;
    let metric_len = l / 2 - 8;
    let mut candidates = Vec::new();

    let mut t = 0usize;
    while t + 7 * l <= frame.len() {
        let mut mag: [Vec<f32>; 7] = std::array::from_fn(|_| vec![0.0f32; l]);
        for (i, _) in COSTAS.iter().enumerate() {
            let start = t + i * l;
            let mut real: Vec<f32> = frame[start..start + l].iter().map(|s| s.0).collect();
            let mut imag: Vec<f32> = frame[start..start + l].iter().map(|s| s.1).collect();
            fft::fft_complex(&mut real, &mut imag, l).expect("symbol-length FFT should not fail");
            for k in 0..l {
                mag[i][k] = real[k] * real[k] + imag[k] * imag[k];
            }
        }

        let mut metric = vec![0.0f32; metric_len];
        for (k, slot) in metric.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (i, &costas_tone) in COSTAS.iter().enumerate() {
                acc += mag[i][k + costas_tone];
            }
            *slot = acc;
        }

        let mu = metric.iter().sum::<f32>() / metric.len() as f32;
        for (k, &m) in metric.iter().enumerate() {
            if m > 10.0 * mu {
                candidates.push(Candidate {
                    freq_hz: k as f32 * SAMPLE_RATE / l as f32,
                    time_sec: t as f32 / SAMPLE_RATE,
                    metric: m,
                });
            }
        }

        t += step;
    }

    candidates.sort_by(|a, b| b.metric.total_cmp(&a.metric));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_on_short_frame() {
        let frame = vec![(0.0f32, 0.0f32); 7 * SYMBOL_LEN - 1];
        assert!(detect(&frame).is_empty());
    }

    #[test]
    fn empty_frame_is_empty() {
        assert!(detect(&[]).is_empty());
    }

    #[test]
    fn candidates_are_sorted_descending_by_metric() {
        let l = SYMBOL_LEN;
        let mut frame = vec![(0.0f32, 0.0f32); 7 * l + l];
        let bin = 40.0f32;
        for (i, &costas_tone) in COSTAS.iter().enumerate() {
            for n in 0..l {
                let freq = (bin + costas_tone as f32) / l as f32;
                let phase = 2.0 * std::f32::consts::PI * freq * n as f32;
                frame[i * l + n] = (phase.cos(), phase.sin());
            }
        }

        let candidates = detect(&frame);
        for pair in candidates.windows(2) {
            assert!(pair[0].metric >= pair[1].metric);
        }
    }
}
