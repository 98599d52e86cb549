//! LDPC encoder for FT8/JS8, used by the simulation/test harness to
//! synthesize valid codewords. The receive path never encodes.

use bitvec::prelude::*;

use crate::constants::{LDPC_K, LDPC_M, LDPC_N};

use super::matrix::GRAPH;

/// Encode a 91-bit message (77 payload bits + 14 CRC bits) into a 174-bit
/// systematic codeword, computing each parity bit as the XOR of the message
/// columns its check covers.
pub fn encode(message: &BitSlice<u8, Msb0>, codeword: &mut BitSlice<u8, Msb0>) {
    assert_eq!(message.len(), LDPC_K, "message must be {LDPC_K} bits");
    assert_eq!(codeword.len(), LDPC_N, "codeword must be {LDPC_N} bits");

    codeword[..LDPC_K].copy_from_bitslice(message);

    for j in 0..LDPC_M {
        let mut parity = false;
        for &col in &GRAPH.checks[j] {
            if col < LDPC_K {
                parity ^= message[col];
            }
        }
        codeword.set(LDPC_K + j, parity);
    }
}
