pub mod bands;
pub mod capture;
pub mod config;
pub mod constants;
pub mod crc;
pub mod demod;
pub mod engine;
pub mod fft;
pub mod gray;
pub mod ldpc;
pub mod message;
pub mod persist;
pub mod pipeline;
pub mod symbol;
pub mod sync;
pub mod tracing_init;

pub use engine::{DecodeEngine, DecodedMessage, Mode};
