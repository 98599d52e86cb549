//! FSK8 demodulation: refine a coarse sync candidate and decide the 79 tones.

use crate::constants::{COSTAS, SAMPLE_RATE, SYMBOL_LEN, TONE_COUNT};
use crate::fft;
use crate::sync::Candidate;

/// Refined demodulation result. `tones` has length <= 79; fewer than 79
/// indicates the candidate's symbols ran past the edge of the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Demodulated {
    pub freq_hz: f32,
    pub time_sec: f32,
    pub snr_db: f32,
    pub tones: Vec<u8>,
}

fn magnitude_at_bin(frame: &[(f32, f32)], start: usize, l: usize, bin: usize) -> f32 {
    let mut real: Vec<f32> = frame[start..start + l].iter().map(|s| s.0).collect();
    let mut imag: Vec<f32> = frame[start..start + l].iter().map(|s| s.1).collect();
    fft::fft_complex(&mut real, &mut imag, l).expect("symbol-length FFT should not fail");
    real[bin] * real[bin] + imag[bin] * imag[bin]
}

fn costas_metric(frame: &[(f32, f32)], start: usize, base_bin: usize, l: usize) -> Option<f32> {
    if base_bin + 6 >= l {
        return None;
    }
    if start + 7 * l > frame.len() {
        return None;
    }
    let mut acc = 0.0f32;
    for (i, &tone) in COSTAS.iter().enumerate() {
        acc += magnitude_at_bin(frame, start + i * l, l, base_bin + tone);
    }
    Some(acc)
}

/// Refine `candidate` against `frame` and decide its 79 tones plus SNR.
/// Returns an empty `tones` list if the refinement search finds no
/// in-bounds window to settle on.
pub fn demodulate(frame: &[(f32, f32)], candidate: &Candidate) -> Demodulated {
    let l = SYMBOL_LEN;
    let k0 = (candidate.freq_hz * l as f32 / SAMPLE_RATE).round() as i64;
    let t0 = (candidate.time_sec * SAMPLE_RATE).round() as i64;

    let empty = Demodulated { freq_hz: candidate.freq_hz, time_sec: candidate.time_sec, snr_db: 0.0, tones: Vec::new() };

    if t0 < 0 {
        return empty;
    }
    let t0 = t0 as usize;

    let mut best_bin = None;
    let mut best_metric = f32::MIN;
    for delta in -2i64..=2 {
        let bin = k0 + delta;
        if bin < 0 {
            continue;
        }
        if let Some(m) = costas_metric(frame, t0, bin as usize, l) {
            if m > best_metric {
                best_metric = m;
                best_bin = Some(bin as usize);
            }
        }
    }
    let refined_bin = match best_bin {
        Some(b) => b,
        None => return empty,
    };

    let half = l / 2;
    let eighth = l / 8;
    let mut best_dt: Option<i64> = None;
    let mut best_metric = f32::MIN;
    let mut dt = -(half as i64);
    while dt <= half as i64 {
        let start = t0 as i64 + dt;
        if start >= 0 {
            if let Some(m) = costas_metric(frame, start as usize, refined_bin, l) {
                if m > best_metric {
                    best_metric = m;
                    best_dt = Some(dt);
                }
            }
        }
        dt += eighth as i64;
    }
    let refined_start = match best_dt {
        Some(dt) => (t0 as i64 + dt) as usize,
        None => return empty,
    };

    let mut tones = Vec::with_capacity(79);
    let mut chosen_powers = Vec::with_capacity(79);
    let mut other_powers_sum = 0.0f32;
    let mut other_powers_count = 0usize;

    for s in 0..79usize {
        let start = refined_start + s * l;
        if start + l > frame.len() {
            break;
        }
        let mut real: Vec<f32> = frame[start..start + l].iter().map(|x| x.0).collect();
        let mut imag: Vec<f32> = frame[start..start + l].iter().map(|x| x.1).collect();
        fft::fft_complex(&mut real, &mut imag, l).expect("symbol-length FFT should not fail");

        let mut powers = [0.0f32; TONE_COUNT];
        for (t, slot) in powers.iter_mut().enumerate() {
            let bin = refined_bin + t;
            *slot = real[bin] * real[bin] + imag[bin] * imag[bin];
        }

        let (best_tone, &best_power) =
            powers.iter().enumerate().max_by(|a, b| a.1.total_cmp(b.1)).unwrap();

        tones.push(best_tone as u8);
        chosen_powers.push(best_power);
        for (t, &p) in powers.iter().enumerate() {
            if t != best_tone {
                other_powers_sum += p;
                other_powers_count += 1;
            }
        }
    }

    let signal_power = chosen_powers.iter().sum::<f32>() / chosen_powers.len().max(1) as f32;
    let noise_per_bin = if other_powers_count > 0 { other_powers_sum / other_powers_count as f32 } else { 0.0 };
    let bin_bandwidth = SAMPLE_RATE / l as f32;
    let noise_reference = noise_per_bin * (2500.0 / bin_bandwidth);

    let snr_db = if noise_reference > 0.0 { 10.0 * (signal_power / noise_reference).log10() } else { 0.0 };

    Demodulated {
        freq_hz: refined_bin as f32 * SAMPLE_RATE / l as f32,
        time_sec: refined_start as f32 / SAMPLE_RATE,
        snr_db,
        tones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone_frame(l: usize, symbols: usize, tone_fn: impl Fn(usize) -> u8) -> Vec<(f32, f32)> {
        let mut frame = vec![(0.0f32, 0.0f32); symbols * l];
        for s in 0..symbols {
            let tone = tone_fn(s);
            for n in 0..l {
                let freq = tone as f32 / l as f32;
                let phase = 2.0 * std::f32::consts::PI * freq * n as f32;
                frame[s * l + n] = (phase.cos(), phase.sin());
            }
        }
        frame
    }

    #[test]
    fn decodes_costas_symbols_back_to_the_pattern() {
        let l = SYMBOL_LEN;
        let frame = tone_frame(l, 7, |s| COSTAS[s] as u8);
        let candidate = Candidate { freq_hz: 0.0, time_sec: 0.0, metric: 1.0 };

        let result = demodulate(&frame, &candidate);
        assert_eq!(result.tones.len(), 7);
        for (i, &tone) in COSTAS.iter().enumerate() {
            assert_eq!(result.tones[i], tone as u8);
        }
    }

    #[test]
    fn truncates_tones_when_frame_runs_short() {
        let l = SYMBOL_LEN;
        // Only 10 symbols worth of frame, well past the point refinement
        // needs but short of 79 symbols.
        let frame = tone_frame(l, 10, |s| COSTAS[s % 7] as u8);
        let candidate = Candidate { freq_hz: 0.0, time_sec: 0.0, metric: 1.0 };

        let result = demodulate(&frame, &candidate);
        assert!(result.tones.len() <= 10);
    }

    #[test]
    fn rejects_out_of_bounds_refinement() {
        let frame = vec![(0.0f32, 0.0f32); SYMBOL_LEN * 7];
        let candidate = Candidate { freq_hz: 0.0, time_sec: 100.0, metric: 1.0 };
        let result = demodulate(&frame, &candidate);
        assert!(result.tones.is_empty());
    }
}
