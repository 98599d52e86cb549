//! HF receiver daemon: wires config, RF capture, the decode engine, and
//! persistence into the four-thread pipeline and runs until interrupted.

use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{error, info, warn};

use hfreceiver::bands;
use hfreceiver::capture::{NullRfDriver, RfDriver, RingBuffer};
use hfreceiver::config::Config;
use hfreceiver::engine::DecodeEngine;
use hfreceiver::persist::{Persister, SqlitePersister};
use hfreceiver::pipeline::{Pipeline, Status};
use hfreceiver::tracing_init;

fn main() -> ExitCode {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "hfreceiver.conf".to_string());
    let config = Config::load(&config_path);

    tracing_init::init_tracing(&config.log_level);
    info!(db_path = %config.db_path, web_port = config.web_port, "starting hfreceiverd");

    let persister: Box<dyn Persister> = match SqlitePersister::open(&config.db_path) {
        Ok(db) => Box::new(db),
        Err(err) => {
            error!(%err, "failed to initialize persistence");
            return ExitCode::from(1);
        }
    };

    let mut rf: Box<dyn RfDriver> = Box::new(NullRfDriver);
    if let Err(err) = rf.open(0) {
        warn!(%err, "RF device unavailable at startup; continuing with empty frames");
    }
    let band_index = Arc::new(AtomicUsize::new(bands::DEFAULT_INDEX));
    if let Some(preset) = bands::PRESETS.get(band_index.load(Ordering::Relaxed)) {
        let _ = rf.set_center_freq(preset.center_hz);
    }

    let ring = Arc::new(RingBuffer::new());
    let engine = Arc::new(DecodeEngine::new(false));
    let status = Arc::new(Status::default());

    let band_label = {
        let band_index = Arc::clone(&band_index);
        move || bands::label(band_index.load(Ordering::Relaxed)).to_string()
    };

    let pipeline = Pipeline::spawn(ring, engine, persister, band_label, status, Duration::from_secs(15));

    let running_for_handler = pipeline.running_flag();
    let _ = ctrlc::set_handler(move || {
        running_for_handler.store(false, Ordering::Relaxed);
    });

    let running = pipeline.running_flag();
    while running.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(200));
    }

    pipeline.shutdown();
    rf.close();
    info!("hfreceiverd shut down cleanly");
    ExitCode::from(0)
}
