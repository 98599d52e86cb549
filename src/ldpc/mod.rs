//! LDPC(174,91) error correction for FT8/JS8.
//!
//! **Decoding**: belief propagation (sum-product) over soft LLRs, recovering
//! the 91-bit message (77 payload bits + 14 CRC bits) from a 174-bit
//! codeword.
//!
//! **Encoding**: used only by the test/simulation harness to synthesize
//! valid codewords; the receive path never encodes.

mod matrix;
mod encode;
mod decode;

pub use decode::decode;
pub use encode::encode;
pub use matrix::GRAPH;
