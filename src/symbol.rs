//! Mapping between a 174-bit LDPC codeword and the 79-symbol tone sequence
//! used on the air: `S7 D29 S7 D29 S7` (three Costas sync blocks, two
//! 29-symbol data blocks). Used by the simulation harness to synthesize test
//! signals; the receive path demodulates tones directly from audio instead.

use bitvec::order::Msb0;
use bitvec::slice::BitSlice;

use crate::constants::{COSTAS, LDPC_N, NUM_SYMBOLS};
use crate::gray;

/// Number of data (non-sync) symbols.
pub const DATA_SYMBOLS: usize = 58;

/// Map a 174-bit codeword onto the 79-symbol tone sequence, inserting the
/// Costas sync blocks at positions 0..7, 36..43, 72..79.
pub fn map(codeword: &BitSlice<u8, Msb0>, symbols: &mut [u8; NUM_SYMBOLS]) -> Result<(), String> {
    if codeword.len() != LDPC_N {
        return Err(format!("codeword must be exactly {LDPC_N} bits, got {}", codeword.len()));
    }

    for (i, &tone) in COSTAS.iter().enumerate() {
        symbols[i] = tone as u8;
        symbols[36 + i] = tone as u8;
        symbols[72 + i] = tone as u8;
    }

    let mut k = 7;
    for j in 0..DATA_SYMBOLS {
        if j == 29 {
            k += 7;
        }
        let i = 3 * j;
        let value = ((codeword[i] as u8) << 2) | ((codeword[i + 1] as u8) << 1) | (codeword[i + 2] as u8);
        symbols[k] = gray::encode(value);
        k += 1;
    }

    Ok(())
}

/// Inverse of [`map`]: recover the 174-bit codeword from a 79-symbol tone
/// sequence, ignoring the sync blocks.
pub fn demap(symbols: &[u8; NUM_SYMBOLS], codeword: &mut BitSlice<u8, Msb0>) -> Result<(), String> {
    if codeword.len() != LDPC_N {
        return Err(format!("codeword must be exactly {LDPC_N} bits, got {}", codeword.len()));
    }

    let mut k = 7;
    for j in 0..DATA_SYMBOLS {
        if j == 29 {
            k += 7;
        }
        let i = 3 * j;
        let value = gray::decode(symbols[k]);
        codeword.set(i, (value & 0b100) != 0);
        codeword.set(i + 1, (value & 0b010) != 0);
        codeword.set(i + 2, (value & 0b001) != 0);
        k += 1;
    }

    Ok(())
}
