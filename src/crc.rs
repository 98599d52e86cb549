//! CRC-14 used to verify FT8/JS8 payloads.
//!
//! The CRC is computed over the first 82 bits of the 91-bit (77 message +
//! 14 CRC) information word, with the CRC field itself masked to zero.
//!
//! Reference: <https://wsjt.sourceforge.io/FT4_FT8_QEX.pdf> page 8.

use bitvec::prelude::*;
use crc::{Algorithm, Crc};

use crate::constants::CRC_POLYNOMIAL;

const CRC_FT8: Algorithm<u16> = Algorithm {
    width: 14,
    poly: CRC_POLYNOMIAL,
    init: 0x0,
    refin: false,
    refout: false,
    xorout: 0x0,
    check: 0x0,
    residue: 0x0,
};

static FT8_CRC: Crc<u16> = Crc::<u16>::new(&CRC_FT8);

/// Compute the 14-bit CRC over the first 82 bits of a 12-byte a91 buffer.
///
/// Callers must already have masked the CRC field (low 3 bits of byte 9,
/// all of byte 10) to zero, matching the reference decode procedure.
pub fn crc14_over_a91(a91: &[u8; 12]) -> u16 {
    // 82 bits = 10 full bytes + 2 bits of an 11th byte. The `crc` crate only
    // checksums whole bytes, so build an 11-byte buffer with the trailing
    // 6 bits cleared (they are already zero in `a91` by construction).
    let mut buf = [0u8; 11];
    buf[..11].copy_from_slice(&a91[..11]);
    buf[10] &= 0b1100_0000;
    FT8_CRC.checksum(&buf) & 0x3FFF
}

/// Extract the 14-bit CRC embedded at bit positions 77..91 of `a91`.
pub fn extract_crc(a91: &[u8; 12]) -> u16 {
    let mut v: u16 = 0;
    for bit in 77..91 {
        let byte = bit / 8;
        let off = 7 - (bit % 8);
        let b = (a91[byte] >> off) & 1;
        v = (v << 1) | b as u16;
    }
    v
}

/// Mask the CRC field of `a91` (low 3 bits of byte 9, all of byte 10) to
/// zero, as required before recomputing the CRC over the first 82 bits.
pub fn mask_crc_field(a91: &mut [u8; 12]) {
    a91[9] &= 0xF8;
    a91[10] = 0;
}

/// Pack a decoded 91-bit (77 payload + 14 CRC) message into an a91 buffer
/// and verify its embedded CRC matches the CRC recomputed over the payload.
pub fn verify_message(message: &BitSlice<u8, Msb0>) -> bool {
    if message.len() != 91 {
        return false;
    }
    let mut a91 = [0u8; 12];
    for (i, bit) in message.iter().enumerate() {
        if *bit {
            a91[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    let embedded = extract_crc(&a91);
    mask_crc_field(&mut a91);
    embedded == crc14_over_a91(&a91)
}
