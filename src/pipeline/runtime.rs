//! Wires the capture, decode, and persist stages together as four OS
//! threads plus a signal handler, and implements the shutdown ordering.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::error;

use crate::capture::RingBuffer;
use crate::engine::{DecodeEngine, Mode};
use crate::persist::{NewRecord, Persister};

use super::queue::Queue;

/// Process-wide status counters read by the (external) HTTP status
/// endpoint; written by the capture and decoder threads.
#[derive(Default)]
pub struct Status {
    pub last_capture: AtomicI64,
    pub last_decode: AtomicI64,
    pub last_count: AtomicUsize,
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before Unix epoch").as_secs() as i64
}

/// Sleeps for `duration`, checking `running` every 50ms so shutdown doesn't
/// have to wait out a full capture interval.
fn sleep_interruptible(duration: Duration, running: &AtomicBool) {
    let step = Duration::from_millis(50);
    let mut remaining = duration;
    while remaining > Duration::ZERO && running.load(Ordering::Relaxed) {
        let this_step = remaining.min(step);
        thread::sleep(this_step);
        remaining -= this_step;
    }
}

/// The four worker threads and the shared `running` flag, plus handles to
/// the two queues so a caller (or a `ctrlc` handler) can drive frames and
/// shutdown.
pub struct Pipeline {
    running: Arc<AtomicBool>,
    decode_queue: Arc<Queue<Vec<(f32, f32)>>>,
    log_queue: Arc<Queue<Vec<NewRecord>>>,
    capture_handle: Option<JoinHandle<()>>,
    decoder_handle: Option<JoinHandle<()>>,
    persister_handle: Option<JoinHandle<()>>,
    server_handle: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Spawns capture-thread, decoder-thread, persister-thread, and a
    /// no-op server-thread stand-in, returning once all four are running.
    pub fn spawn(
        ring: Arc<RingBuffer>,
        engine: Arc<DecodeEngine>,
        mut persister: Box<dyn Persister>,
        band_label: impl Fn() -> String + Send + 'static,
        status: Arc<Status>,
        capture_interval: Duration,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let decode_queue = Arc::new(Queue::new());
        let log_queue = Arc::new(Queue::new());

        let capture_handle = {
            let running = Arc::clone(&running);
            let decode_queue = Arc::clone(&decode_queue);
            let status = Arc::clone(&status);
            thread::spawn(move || {
                while running.load(Ordering::Relaxed) {
                    let frame = ring.snapshot();
                    status.last_capture.store(now_unix(), Ordering::Relaxed);
                    decode_queue.push(frame);
                    sleep_interruptible(capture_interval, &running);
                }
            })
        };

        let decoder_handle = {
            let decode_queue = Arc::clone(&decode_queue);
            let log_queue = Arc::clone(&log_queue);
            let status = Arc::clone(&status);
            thread::spawn(move || {
                while let Some(frame) = decode_queue.pop() {
                    let results = engine.process(&frame);
                    status.last_decode.store(now_unix(), Ordering::Relaxed);
                    status.last_count.store(results.len(), Ordering::Relaxed);

                    if results.is_empty() {
                        continue;
                    }

                    let timestamp = now_unix();
                    let band = band_label();
                    let records: Vec<NewRecord> = results
                        .iter()
                        .map(|r| NewRecord {
                            timestamp,
                            band: band.clone(),
                            frequency: r.freq_hz as f64,
                            mode: match r.mode { Mode::Ft8 => "FT8".to_string(), Mode::Js8 => "JS8".to_string() },
                            snr: r.snr_db as f64,
                            text: r.text.clone(),
                        })
                        .collect();
                    log_queue.push(records);
                }
            })
        };

        let persister_handle = {
            let log_queue = Arc::clone(&log_queue);
            thread::spawn(move || {
                while let Some(batch) = log_queue.pop() {
                    if let Err(err) = persister.insert_batch(&batch) {
                        error!(%err, "persist batch failed, rolling back and continuing");
                    }
                }
            })
        };

        let server_handle = {
            let running = Arc::clone(&running);
            thread::spawn(move || {
                while running.load(Ordering::Relaxed) {
                    thread::sleep(Duration::from_millis(50));
                }
            })
        };

        Self {
            running,
            decode_queue,
            log_queue,
            capture_handle: Some(capture_handle),
            decoder_handle: Some(decoder_handle),
            persister_handle: Some(persister_handle),
            server_handle: Some(server_handle),
        }
    }

    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn decode_queue(&self) -> &Arc<Queue<Vec<(f32, f32)>>> {
        &self.decode_queue
    }

    /// Runs the exact shutdown ordering: flip `running`, join capture, stop
    /// and join decoder, stop and join persister, join server.
    pub fn shutdown(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.capture_handle.take() {
            let _ = handle.join();
        }

        self.decode_queue.stop();
        if let Some(handle) = self.decoder_handle.take() {
            let _ = handle.join();
        }

        self.log_queue.stop();
        if let Some(handle) = self.persister_handle.take() {
            let _ = handle.join();
        }

        if let Some(handle) = self.server_handle.take() {
            let _ = handle.join();
        }
    }
}
