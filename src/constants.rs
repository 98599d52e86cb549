//! Shared FT8/JS8 physical-layer constants.
//!
//! Symbol timing, Costas sync pattern, and Gray code tables used across the
//! sync, demodulation, and LDPC stages.

/// Working baseband sample rate, in samples/second.
pub const SAMPLE_RATE: f32 = 12_000.0;

/// Tone spacing / symbol rate, in Hz (and symbols/second).
pub const SYMBOL_RATE: f32 = 6.25;

/// Samples per symbol: `SAMPLE_RATE / SYMBOL_RATE` = 1920 at 12 kHz.
pub const SYMBOL_LEN: usize = 1920;

/// Number of FSK tones per symbol.
pub const TONE_COUNT: usize = 8;

/// Total symbols in one FT8/JS8 transmission.
pub const NUM_SYMBOLS: usize = 79;

/// Samples in one 15-second frame at [`SAMPLE_RATE`].
pub const FRAME_LEN: usize = 180_000;

/// The 7-tone Costas sync pattern, repeated at symbol offsets 0, 36, 72.
pub const COSTAS: [usize; 7] = [0, 1, 3, 2, 4, 6, 5];

/// Starting symbol index of each of the three Costas blocks.
pub const COSTAS_STARTS: [usize; 3] = [0, 36, 72];

/// Gray-decode table: tone index -> 3-bit codeword value (MSB first).
pub const GRAY_DECODE: [u8; 8] = [0, 1, 3, 2, 6, 4, 5, 7];

/// LDPC(174,91): total codeword bits.
pub const LDPC_N: usize = 174;
/// LDPC(174,91): systematic message bits (77 payload + 14 CRC).
pub const LDPC_K: usize = 91;
/// LDPC(174,91): parity checks / parity bits.
pub const LDPC_M: usize = LDPC_N - LDPC_K;

/// FT8/JS8 payload size in bits (before the 14-bit CRC).
pub const PAYLOAD_BITS: usize = 77;

/// CRC-14 polynomial used by FT8 (without the implicit leading 1 bit).
pub const CRC_POLYNOMIAL: u16 = 0x2757;

/// Returns true if `idx` (0..79) falls on one of the three Costas sync blocks.
pub fn is_costas_symbol(idx: usize) -> bool {
    COSTAS_STARTS.iter().any(|&start| idx >= start && idx < start + 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn costas_symbol_positions() {
        for i in 0..7 {
            assert!(is_costas_symbol(i));
            assert!(is_costas_symbol(36 + i));
            assert!(is_costas_symbol(72 + i));
        }
        assert!(!is_costas_symbol(7));
        assert!(!is_costas_symbol(35));
        assert!(!is_costas_symbol(43));
        assert!(!is_costas_symbol(71));
    }

    #[test]
    fn symbol_len_matches_rate() {
        assert_eq!(SYMBOL_LEN, (SAMPLE_RATE / SYMBOL_RATE) as usize);
    }
}
