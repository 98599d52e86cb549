//! RF ingest: byte-stream decimation and the slot-aligned ring buffer that
//! backs frame snapshots.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use snafu::Snafu;
use tracing::warn;

use crate::constants::FRAME_LEN;

/// Box-car decimation factor: 240 kHz input / 20 = 12 kHz baseband.
pub const DECIMATION: usize = 20;

#[derive(Debug, Snafu)]
pub enum RfError {
    #[snafu(display("RF device {device_index} could not be opened"))]
    OpenFailed { device_index: u32 },
    #[snafu(display("failed to set center frequency to {hz} Hz"))]
    SetFreqFailed { hz: u32 },
    #[snafu(display("failed to set sample rate to {hz} Hz"))]
    SetSampleRateFailed { hz: u32 },
    #[snafu(display("async capture failed to start"))]
    StartAsyncFailed,
}

/// Convert an interleaved 8-bit unsigned IQ byte stream into decimated
/// complex baseband samples, averaging every [`DECIMATION`] consecutive
/// complex input samples into one output sample.
pub fn decimate(raw: &[u8]) -> Vec<(f32, f32)> {
    let pairs = raw.len() / 2;
    let groups = pairs / DECIMATION;
    let mut out = Vec::with_capacity(groups);

    for g in 0..groups {
        let mut acc_i = 0.0f32;
        let mut acc_q = 0.0f32;
        for k in 0..DECIMATION {
            let idx = (g * DECIMATION + k) * 2;
            let i = (raw[idx] as f32 - 127.5) / 127.5;
            let q = (raw[idx + 1] as f32 - 127.5) / 127.5;
            acc_i += i;
            acc_q += q;
        }
        out.push((acc_i / DECIMATION as f32, acc_q / DECIMATION as f32));
    }

    out
}

struct RingBufferInner {
    samples: Vec<(f32, f32)>,
    /// Index of the oldest sample / next position to be overwritten.
    pos: usize,
}

/// Fixed-capacity circular buffer of [`FRAME_LEN`] complex baseband samples,
/// written by the capture worker and snapshotted by readers under the same
/// lock.
pub struct RingBuffer {
    inner: Mutex<RingBufferInner>,
}

impl RingBuffer {
    pub fn new() -> Self {
        Self { inner: Mutex::new(RingBufferInner { samples: vec![(0.0, 0.0); FRAME_LEN], pos: 0 }) }
    }

    /// Write a decimated batch, positioning it so its last sample lands at
    /// the ring index implied by `now_ms`'s phase within the current
    /// 15-second slot.
    pub fn write_batch(&self, batch: &[(f32, f32)], now_ms: u64) {
        if batch.is_empty() {
            return;
        }
        let mut inner = self.inner.lock().expect("ring buffer mutex poisoned");

        let slot_ms = (now_ms % 15_000) as i64;
        let slot_samples = slot_ms * 12_000 / 1_000;
        let write_pos = (slot_samples - batch.len() as i64).rem_euclid(FRAME_LEN as i64) as usize;

        for (i, &sample) in batch.iter().enumerate() {
            inner.samples[(write_pos + i) % FRAME_LEN] = sample;
        }
        inner.pos = (write_pos + batch.len()) % FRAME_LEN;
    }

    /// Take a length-[`FRAME_LEN`] snapshot starting at the oldest sample,
    /// under the buffer's lock.
    pub fn snapshot(&self) -> Vec<(f32, f32)> {
        let inner = self.inner.lock().expect("ring buffer mutex poisoned");
        (0..FRAME_LEN).map(|i| inner.samples[(inner.pos + i) % FRAME_LEN]).collect()
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Current Unix time in milliseconds, used to phase-align ring writes.
pub fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before Unix epoch").as_millis() as u64
}

/// The tuner driver's required surface; a thin wrapper over a vendor API in
/// production, exercised here only through [`NullRfDriver`].
pub trait RfDriver: Send {
    fn open(&mut self, device_index: u32) -> Result<(), RfError>;
    fn close(&mut self);
    fn set_center_freq(&mut self, hz: u32) -> Result<(), RfError>;
    fn set_sample_rate(&mut self, hz: u32) -> Result<(), RfError>;
    /// Starts delivering IQ batches to `callback` on a driver-owned thread,
    /// blocking until `cancel_async` is called.
    fn start_async(&mut self, callback: Box<dyn FnMut(&[u8]) + Send>) -> Result<(), RfError>;
    fn cancel_async(&mut self) -> Result<(), RfError>;
}

/// Stand-in RF driver for when no tuner is attached: `open` logs a warning
/// and succeeds, `start_async` never calls back. The pipeline continues
/// running and the ring buffer stays at its initial all-zero frame.
pub struct NullRfDriver;

impl RfDriver for NullRfDriver {
    fn open(&mut self, device_index: u32) -> Result<(), RfError> {
        warn!(device_index, "no RF device present; continuing with empty frames");
        Ok(())
    }

    fn close(&mut self) {}

    fn set_center_freq(&mut self, _hz: u32) -> Result<(), RfError> {
        Ok(())
    }

    fn set_sample_rate(&mut self, _hz: u32) -> Result<(), RfError> {
        Ok(())
    }

    fn start_async(&mut self, _callback: Box<dyn FnMut(&[u8]) + Send>) -> Result<(), RfError> {
        Ok(())
    }

    fn cancel_async(&mut self) -> Result<(), RfError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimate_maps_centered_bytes_to_near_zero() {
        let raw = vec![127u8, 128u8]; // I, Q near center
        let out = decimate(&vec![127u8, 128u8].repeat(DECIMATION));
        assert_eq!(out.len(), 1);
        assert!(out[0].0.abs() < 0.01);
        assert!(out[0].1.abs() < 0.02);
        let _ = raw;
    }

    #[test]
    fn decimate_drops_a_partial_trailing_group() {
        let raw = vec![255u8; (DECIMATION * 2 + 3) * 2];
        let out = decimate(&raw);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn snapshot_has_frame_len_samples() {
        let rb = RingBuffer::new();
        assert_eq!(rb.snapshot().len(), FRAME_LEN);
    }

    #[test]
    fn ring_alignment_matches_the_wall_clock_phase() {
        let rb = RingBuffer::new();
        let batch = vec![(1.0f32, 1.0f32); 100];
        let ms = 15_000 * 7 + 500;
        rb.write_batch(&batch, ms);

        let snap = rb.snapshot();
        // last written sample at ring index 5999, oldest-first snapshot
        // means it is the very last element of the snapshot.
        assert_eq!(snap[FRAME_LEN - 1], (1.0, 1.0));
        assert_eq!(snap[0], (0.0, 0.0));
    }

    struct NeverCalled;
    impl RfDriver for NeverCalled {
        fn open(&mut self, _device_index: u32) -> Result<(), RfError> {
            Ok(())
        }
        fn close(&mut self) {}
        fn set_center_freq(&mut self, _hz: u32) -> Result<(), RfError> {
            Ok(())
        }
        fn set_sample_rate(&mut self, _hz: u32) -> Result<(), RfError> {
            Ok(())
        }
        fn start_async(&mut self, _callback: Box<dyn FnMut(&[u8]) + Send>) -> Result<(), RfError> {
            Ok(())
        }
        fn cancel_async(&mut self) -> Result<(), RfError> {
            Ok(())
        }
    }

    #[test]
    fn null_driver_opens_without_error() {
        let mut driver = NullRfDriver;
        assert!(driver.open(0).is_ok());
        let _never: Box<dyn RfDriver> = Box::new(NeverCalled);
    }
}
