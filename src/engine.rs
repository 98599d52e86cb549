//! Decode engine: orchestrates sync -> demod -> LDPC decode -> message
//! unpacking, fanning candidates out across a worker pool.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::constants::{is_costas_symbol, LDPC_K, LDPC_M, LDPC_N, NUM_SYMBOLS};
use crate::crc::{crc14_over_a91, extract_crc, mask_crc_field};
use crate::{demod, gray, ldpc, message, sync};

/// The demodulated signal's protocol, decided at message-unpacking time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Ft8,
    Js8,
}

/// A fully decoded (or failed-to-decode) candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub freq_hz: f32,
    pub time_sec: f32,
    pub snr_db: f32,
    pub crc_ok: bool,
    pub ldpc_errors: usize,
    pub payload: [u8; 10],
    pub text: String,
    pub mode: Mode,
}

/// Orchestrates `sync::detect` -> `demod::demodulate` -> `ldpc::decode` over
/// a frame, with a process-wide toggle for whether the JS8 text fallback is
/// attempted when FT8 unpacking yields nothing.
pub struct DecodeEngine {
    js8_enabled: AtomicBool,
}

impl DecodeEngine {
    pub fn new(js8_enabled: bool) -> Self {
        Self { js8_enabled: AtomicBool::new(js8_enabled) }
    }

    pub fn js8_enabled(&self) -> bool {
        self.js8_enabled.load(Ordering::Relaxed)
    }

    pub fn set_js8_enabled(&self, enabled: bool) {
        self.js8_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Decode every sync candidate in `frame`, preserving descending
    /// sync-metric order. Candidates are processed independently and in
    /// parallel; results are gathered back in candidate order.
    pub fn process(&self, frame: &[(f32, f32)]) -> Vec<DecodedMessage> {
        let candidates = sync::detect(frame);
        let js8_enabled = self.js8_enabled();

        candidates.par_iter().map(|candidate| decode_candidate(frame, candidate, js8_enabled)).collect()
    }
}

fn decode_candidate(frame: &[(f32, f32)], candidate: &sync::Candidate, js8_enabled: bool) -> DecodedMessage {
    let demodulated = demod::demodulate(frame, candidate);

    if demodulated.tones.len() != NUM_SYMBOLS {
        return DecodedMessage {
            freq_hz: demodulated.freq_hz,
            time_sec: demodulated.time_sec,
            snr_db: demodulated.snr_db,
            crc_ok: false,
            ldpc_errors: LDPC_M,
            payload: [0u8; 10],
            text: String::new(),
            mode: Mode::Ft8,
        };
    }

    let llr = tones_to_llr(&demodulated.tones);
    let (codeword, ldpc_errors) = ldpc::decode(&llr, 50);

    let mut payload = [0u8; 10];
    let mut crc_ok = false;

    if ldpc_errors == 0 {
        let mut a91 = [0u8; 12];
        for i in 0..LDPC_K {
            if codeword[i] {
                a91[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        let embedded = extract_crc(&a91);
        mask_crc_field(&mut a91);
        let computed = crc14_over_a91(&a91);
        crc_ok = embedded == computed;
        payload.copy_from_slice(&a91[..10]);
    }

    let mut text = String::new();
    let mut mode = Mode::Ft8;

    if crc_ok {
        text = message::decode_ft8_payload(&payload);
        if text.is_empty() && js8_enabled {
            let js8_text = message::decode_js8_payload(&payload);
            if !js8_text.is_empty() {
                text = js8_text;
                mode = Mode::Js8;
            }
        }
    }

    DecodedMessage {
        freq_hz: demodulated.freq_hz,
        time_sec: demodulated.time_sec,
        snr_db: demodulated.snr_db,
        crc_ok,
        ldpc_errors,
        payload,
        text,
        mode,
    }
}

/// Map 79 decoded tones onto 174 hard-decision LLRs, skipping the three
/// Costas sync blocks. `bit == 1 -> +4.0`, `bit == 0 -> -4.0`, matching
/// `ldpc::decode`'s "positive favors 1" convention.
fn tones_to_llr(tones: &[u8]) -> [f32; LDPC_N] {
    let mut llr = [0.0f32; LDPC_N];
    let mut out = 0usize;
    for (s, &tone) in tones.iter().enumerate() {
        if is_costas_symbol(s) {
            continue;
        }
        let value = gray::decode(tone);
        for i in 0..3 {
            let bit = (value >> (2 - i)) & 1;
            llr[out] = if bit == 1 { 4.0 } else { -4.0 };
            out += 1;
        }
    }
    llr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{COSTAS, SYMBOL_LEN};
    use crate::ldpc;
    use crate::symbol;
    use bitvec::prelude::*;

    fn synth_frame_for(message: &[u8; 91]) -> Vec<(f32, f32)> {
        let mut storage = [0u8; 12];
        let msg_bits = &mut storage.view_bits_mut::<Msb0>()[..LDPC_K];
        for (i, &b) in message.iter().enumerate() {
            msg_bits.set(i, b != 0);
        }
        let mut cw_storage = [0u8; 22];
        let codeword = &mut cw_storage.view_bits_mut::<Msb0>()[..LDPC_N];
        ldpc::encode(msg_bits, codeword);

        let mut symbols = [0u8; NUM_SYMBOLS];
        symbol::map(codeword, &mut symbols).unwrap();

        let l = SYMBOL_LEN;
        let mut frame = vec![(0.0f32, 0.0f32); symbols.len() * l];
        for (s, &tone) in symbols.iter().enumerate() {
            for n in 0..l {
                let freq = tone as f32 / l as f32;
                let phase = 2.0 * std::f32::consts::PI * freq * n as f32;
                frame[s * l + n] = (phase.cos(), phase.sin());
            }
        }
        frame
    }

    fn stamped_message(payload: &[u8; 77]) -> [u8; 91] {
        let mut bits = [0u8; 91];
        bits[..77].copy_from_slice(payload);
        let mut a91 = [0u8; 12];
        for (i, &b) in bits.iter().enumerate() {
            if b != 0 {
                a91[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        mask_crc_field(&mut a91);
        let crc = crc14_over_a91(&a91);
        for i in 0..14 {
            bits[77 + i] = ((crc >> (13 - i)) & 1) as u8;
        }
        bits
    }

    fn payload_for_message(call1: &str, call2: &str, grid: Option<&str>) -> [u8; 77] {
        let packed = message::pack_ft8_standard(call1, call2, grid).unwrap();
        let mut payload = [0u8; 77];
        for i in 0..77 {
            let byte = i / 8;
            let off = 7 - (i % 8);
            payload[i] = (packed[byte] >> off) & 1;
        }
        payload
    }

    #[test]
    fn end_to_end_decodes_a_known_message() {
        // Synthetic round trip: this crate's own encoder produces the frame,
        // so a pass here only proves internal consistency of the sync ->
        // demod -> LDPC -> message pipeline, not compatibility with a real
        // transmitter. `end_to_end_decodes_a_real_wsjt_x_codeword` below
        // covers the latter.
        let payload = payload_for_message("KA1ABC", "WA9XYZ", Some("EM00"));
        let message = stamped_message(&payload);
        let frame = synth_frame_for(&message);

        let engine = DecodeEngine::new(false);
        let results = engine.process(&frame);

        // The Costas pattern repeats three times in one transmission, so the
        // sync detector (which performs no dedup, per design) may surface
        // more than one candidate against the same signal; at least one must
        // decode to the known text.
        assert!(!results.is_empty());
        assert!(results.iter().any(|r| r.crc_ok && r.text == "KA1ABC WA9XYZ EM00" && r.mode == Mode::Ft8));
    }

    /// Drives the full sync -> demod -> LDPC -> message pipeline from a
    /// tone sequence built directly off WSJT-X's own ft8code reference
    /// codeword for "CQ SOTA N0YPR/R DM42" (the real 91-bit message/CRC and
    /// the real 83 parity bits it produces), not a codeword this crate
    /// encoded itself. Confirms the LDPC stage recovers the real message
    /// bits bit-for-bit against the real generator matrix.
    #[test]
    fn end_to_end_decodes_a_real_wsjt_x_codeword() {
        let msg_str = "00000000010111100101100110000000010100100110110011100110110001100111110010001";
        let crc_str = "00001001100101";
        let parity_str =
            "11100110011001101100100111100011101000010001100111111001100110001110011001011110010";

        let bits: Vec<u8> =
            msg_str.chars().chain(crc_str.chars()).chain(parity_str.chars()).map(|c| (c == '1') as u8).collect();
        assert_eq!(bits.len(), LDPC_N);

        let mut cw_storage = [0u8; 22];
        let codeword = &mut cw_storage.view_bits_mut::<Msb0>()[..LDPC_N];
        for (i, &b) in bits.iter().enumerate() {
            codeword.set(i, b != 0);
        }

        let mut symbols = [0u8; NUM_SYMBOLS];
        symbol::map(codeword, &mut symbols).unwrap();

        let l = SYMBOL_LEN;
        let mut frame = vec![(0.0f32, 0.0f32); symbols.len() * l];
        for (s, &tone) in symbols.iter().enumerate() {
            for n in 0..l {
                let freq = tone as f32 / l as f32;
                let phase = 2.0 * std::f32::consts::PI * freq * n as f32;
                frame[s * l + n] = (phase.cos(), phase.sin());
            }
        }

        let engine = DecodeEngine::new(false);
        let results = engine.process(&frame);

        assert!(!results.is_empty());
        assert!(results.iter().any(|r| {
            r.ldpc_errors == 0 && {
                let mut a91 = [0u8; 12];
                for (i, &b) in bits.iter().take(LDPC_K).enumerate() {
                    if b != 0 {
                        a91[i / 8] |= 1 << (7 - (i % 8));
                    }
                }
                r.payload[..] == a91[..10]
            }
        }));
    }

    #[test]
    fn empty_frame_produces_no_results() {
        let engine = DecodeEngine::new(false);
        assert!(engine.process(&[]).is_empty());
    }

    #[test]
    fn js8_toggle_is_read_once_per_call() {
        let engine = DecodeEngine::new(false);
        assert!(!engine.js8_enabled());
        engine.set_js8_enabled(true);
        assert!(engine.js8_enabled());
    }

    #[test]
    fn costas_pattern_is_excluded_from_llrs() {
        // sanity: exactly 58 data symbols contribute 174 bits
        let tones = [0u8; NUM_SYMBOLS];
        let llr = tones_to_llr(&tones);
        assert_eq!(llr.len(), LDPC_N);
        let _ = COSTAS;
    }
}
