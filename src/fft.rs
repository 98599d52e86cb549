//! FFT utilities for sync and demodulation, with a per-size plan cache so
//! repeated windows (one per symbol, many per frame) don't replan.

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use once_cell::sync::Lazy;

/// Cache of forward FFT plans
static FFT_FORWARD_CACHE: Lazy<Mutex<HashMap<usize, Arc<dyn Fft<f32>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Cache of inverse FFT plans
static FFT_INVERSE_CACHE: Lazy<Mutex<HashMap<usize, Arc<dyn Fft<f32>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Get or create a forward FFT plan for the given size
fn get_forward_plan(n: usize) -> Arc<dyn Fft<f32>> {
    let mut cache = FFT_FORWARD_CACHE.lock().unwrap();

    if let Some(plan) = cache.get(&n) {
        return Arc::clone(plan);
    }

    let mut planner = FftPlanner::new();
    let plan = planner.plan_fft_forward(n);
    cache.insert(n, Arc::clone(&plan));
    plan
}

/// Get or create an inverse FFT plan for the given size
fn get_inverse_plan(n: usize) -> Arc<dyn Fft<f32>> {
    let mut cache = FFT_INVERSE_CACHE.lock().unwrap();

    if let Some(plan) = cache.get(&n) {
        return Arc::clone(plan);
    }

    let mut planner = FftPlanner::new();
    let plan = planner.plan_fft_inverse(n);
    cache.insert(n, Arc::clone(&plan));
    plan
}

/// In-place real-to-complex FFT using RustFFT
///
/// # Arguments
/// * `real` - Real part (input/output)
/// * `imag` - Imaginary part (input/output, should be zeros on input)
/// * `n` - FFT size (must be power of 2)
pub(crate) fn fft_real(real: &mut [f32], imag: &mut [f32], n: usize) -> Result<(), String> {
    if n & (n - 1) != 0 {
        return Err(format!("FFT size must be power of 2, got {}", n));
    }

    if real.len() < n || imag.len() < n {
        return Err(format!(
            "Buffers too small: real={}, imag={}, need={}",
            real.len(),
            imag.len(),
            n
        ));
    }

    // Convert separate real/imag arrays to Complex
    let mut buffer: Vec<Complex<f32>> = (0..n)
        .map(|i| Complex::new(real[i], imag[i]))
        .collect();

    // Perform FFT using cached plan
    let fft = get_forward_plan(n);
    fft.process(&mut buffer);

    // Convert back to separate arrays
    for i in 0..n {
        real[i] = buffer[i].re;
        imag[i] = buffer[i].im;
    }

    Ok(())
}

/// Complex-to-complex FFT
///
/// Same as fft_real but handles complex input
pub(crate) fn fft_complex(real: &mut [f32], imag: &mut [f32], n: usize) -> Result<(), String> {
    fft_real(real, imag, n)
}

/// Complex-to-complex inverse FFT
pub(crate) fn fft_complex_inverse(real: &mut [f32], imag: &mut [f32], n: usize) -> Result<(), String> {
    if n & (n - 1) != 0 {
        return Err(format!("FFT size must be power of 2, got {}", n));
    }

    if real.len() < n || imag.len() < n {
        return Err(format!(
            "Buffers too small: real={}, imag={}, need={}",
            real.len(),
            imag.len(),
            n
        ));
    }

    // Convert separate real/imag arrays to Complex
    let mut buffer: Vec<Complex<f32>> = (0..n)
        .map(|i| Complex::new(real[i], imag[i]))
        .collect();

    // Perform inverse FFT using cached plan
    let fft = get_inverse_plan(n);
    fft.process(&mut buffer);

    // Scale and convert back to separate arrays
    let scale = 1.0 / n as f32;
    for i in 0..n {
        real[i] = buffer[i].re * scale;
        imag[i] = buffer[i].im * scale;
    }

    Ok(())
}
