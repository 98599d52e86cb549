//! LDPC decoder using belief propagation (the sum-product algorithm).

use bitvec::prelude::*;
use bitvec::vec::BitVec;

use crate::constants::LDPC_N;

use super::matrix::GRAPH;

/// Piecewise-linear approximation of atanh, as used by WSJT-X's BP decoder.
/// Caps output at +/-7.0 for numerical stability.
#[inline]
fn platanh(x: f32) -> f32 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let z = x.abs();

    if z <= 0.664 {
        x / 0.83
    } else if z <= 0.9217 {
        sign * (z - 0.4064) / 0.322
    } else if z <= 0.9951 {
        sign * (z - 0.8378) / 0.0524
    } else if z <= 0.9998 {
        sign * (z - 0.9914) / 0.0012
    } else {
        sign * 7.0
    }
}

/// Decode a 174-bit codeword from soft LLRs using belief propagation.
///
/// `llr[i] > 0` favors bit `i` being 1; magnitude is confidence. Runs for up
/// to `max_iterations` and always returns a hard-decision codeword together
/// with the number of parity checks it fails to satisfy — CRC verification
/// is the caller's job, not this decoder's.
pub fn decode(llr: &[f32], max_iterations: usize) -> (BitVec<u8, Msb0>, usize) {
    assert_eq!(llr.len(), LDPC_N, "llr must be {LDPC_N} bits");

    let checks = &GRAPH.checks;
    let bits = &GRAPH.bits;

    let mut toc: Vec<Vec<f32>> = checks.iter().map(|m| vec![0.0f32; m.len()]).collect();
    let mut tov: Vec<Vec<f32>> = bits.iter().map(|m| vec![0.0f32; m.len()]).collect();
    let mut zn = vec![0.0f32; LDPC_N];

    for (j, members) in checks.iter().enumerate() {
        for (i, &bit_idx) in members.iter().enumerate() {
            toc[j][i] = llr[bit_idx];
        }
    }

    let mut cw = BitVec::<u8, Msb0>::repeat(false, LDPC_N);
    let mut ncheck = checks.len();

    for iter in 0..=max_iterations {
        for i in 0..LDPC_N {
            zn[i] = llr[i] + tov[i].iter().sum::<f32>();
        }

        for i in 0..LDPC_N {
            cw.set(i, zn[i] > 0.0);
        }

        ncheck = 0;
        for members in checks {
            let mut parity = false;
            for &bit_idx in members {
                parity ^= cw[bit_idx];
            }
            if parity {
                ncheck += 1;
            }
        }

        if ncheck == 0 || iter == max_iterations {
            break;
        }

        for (j, members) in checks.iter().enumerate() {
            for (i, &bit_idx) in members.iter().enumerate() {
                toc[j][i] = zn[bit_idx];
                if let Some(local) = bits[bit_idx].iter().position(|&c| c == j) {
                    toc[j][i] -= tov[bit_idx][local];
                }
            }
        }

        for (i, memberships) in bits.iter().enumerate() {
            for (e, &check_idx) in memberships.iter().enumerate() {
                let members = &checks[check_idx];
                let mut product = 1.0f32;
                for (k, &bit_k) in members.iter().enumerate() {
                    if bit_k != i {
                        product *= f32::tanh(-toc[check_idx][k] / 2.0);
                    }
                }
                tov[i][e] = 2.0 * platanh(-product);
            }
        }
    }

    (cw, ncheck)
}
