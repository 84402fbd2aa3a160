//! LDPC sum-product decoder over a structured quasi-cyclic parity matrix.
//!
//! H is (N−K)×N, built deterministically: information column j connects to
//! check i when (i + 3j) mod 7 == 0; parity column K+k connects to checks k
//! and (k−1) wrapping, i.e. check i covers parity bits i and (i+1) mod (N−K).
//! Adjacency lists are precomputed once; the decoder is belief propagation
//! with the tanh rule, sequential check updates for a canonical iteration
//! order, and a message-change convergence test.
//!
//! Non-convergence is a soft failure: the last hard decision is still
//! returned and the caller decides whether to accept it.

use crate::bits::BitWriter;
use crate::types::{
    CancelToken, CodecCounters, CounterSnapshot, DecodeError, DecodeResult,
};

/// Belief-propagation iteration cap.
pub const MAX_ITER: usize = 50;

/// Convergence threshold on the largest variable-message change.
const CONVERGENCE_EPS: f64 = 1e-6;

/// Stand-in for atanh at saturation.
const LARGE_LLR: f64 = 1.0e3;

/// Decode outcome; `converged` is false when the iteration cap was hit.
#[derive(Debug, Clone, PartialEq)]
pub struct LdpcOutcome {
    /// The K information bits, packed MSB-first.
    pub bits: Vec<u8>,
    pub converged: bool,
    pub iterations: usize,
}

/// LDPC decoder with a fixed Tanner graph. Construction is the expensive
/// part; instances are immutable and safe to share across threads.
#[derive(Debug)]
pub struct Ldpc {
    n: usize,
    k: usize,
    /// check -> adjacent variable columns
    check_adj: Vec<Vec<usize>>,
    /// variable -> adjacent check rows
    var_adj: Vec<Vec<usize>>,
    /// For check c edge e → position of c within var_adj[var].
    check_edge_pos: Vec<Vec<usize>>,
    /// For variable v edge e → position of v within check_adj[check].
    var_edge_pos: Vec<Vec<usize>>,
    max_iter: usize,
    counters: CodecCounters,
}

impl Ldpc {
    pub fn new(n: usize, k: usize) -> Self {
        Self::with_max_iter(n, k, MAX_ITER)
    }

    pub fn with_max_iter(n: usize, k: usize, max_iter: usize) -> Self {
        assert!(k >= 1 && k < n, "k must satisfy 1 <= k < n");
        let m = n - k;

        let mut check_adj: Vec<Vec<usize>> = vec![Vec::new(); m];
        let mut var_adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, row) in check_adj.iter_mut().enumerate() {
            for j in 0..k {
                if (i + 3 * j) % 7 == 0 {
                    row.push(j);
                }
            }
            row.push(k + i);
            let wrap = k + (i + 1) % m;
            if wrap != k + i {
                row.push(wrap);
            }
        }
        for (i, row) in check_adj.iter().enumerate() {
            for &j in row {
                var_adj[j].push(i);
            }
        }

        let check_edge_pos = check_adj
            .iter()
            .enumerate()
            .map(|(c, row)| {
                row.iter()
                    .map(|&v| {
                        var_adj[v]
                            .iter()
                            .position(|&cc| cc == c)
                            .expect("edge present in both adjacency lists")
                    })
                    .collect()
            })
            .collect();
        let var_edge_pos = var_adj
            .iter()
            .enumerate()
            .map(|(v, row)| {
                row.iter()
                    .map(|&c| {
                        check_adj[c]
                            .iter()
                            .position(|&vv| vv == v)
                            .expect("edge present in both adjacency lists")
                    })
                    .collect()
            })
            .collect();

        Ldpc {
            n,
            k,
            check_adj,
            var_adj,
            check_edge_pos,
            var_edge_pos,
            max_iter,
            counters: CodecCounters::new(),
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Whether hard bits (0/1 per column) satisfy every parity check.
    pub fn check_parity(&self, bits: &[u8]) -> bool {
        self.check_adj
            .iter()
            .all(|row| row.iter().fold(0u8, |acc, &v| acc ^ (bits[v] & 1)) == 0)
    }

    /// Sum-product decode from channel LLRs (positive favors 0).
    pub fn decode(&self, llrs: &[f64], cancel: &CancelToken) -> DecodeResult<LdpcOutcome> {
        self.counters.record_decode();
        match self.decode_inner(llrs, cancel) {
            Ok(outcome) => {
                if !outcome.converged {
                    self.counters.record_failure();
                }
                Ok(outcome)
            }
            Err(e) => {
                self.counters.record_failure();
                Err(e)
            }
        }
    }

    fn decode_inner(&self, llrs: &[f64], cancel: &CancelToken) -> DecodeResult<LdpcOutcome> {
        if llrs.len() != self.n {
            return Err(DecodeError::Truncated {
                need: self.n,
                got: llrs.len(),
            });
        }

        let m = self.n - self.k;
        // v2c[c][e]: message from check_adj[c][e] into check c.
        let mut v2c: Vec<Vec<f64>> = self
            .check_adj
            .iter()
            .map(|row| row.iter().map(|&v| llrs[v]).collect())
            .collect();
        // c2v[v][e]: message from var_adj[v][e] into variable v.
        let mut c2v: Vec<Vec<f64>> = self
            .var_adj
            .iter()
            .map(|row| vec![0.0; row.len()])
            .collect();

        let mut iterations = 0;
        let mut converged = false;

        for _ in 0..self.max_iter {
            cancel.check()?;
            iterations += 1;

            // Check-node update, sequential for a canonical order.
            for c in 0..m {
                let row = &self.check_adj[c];
                let tanhs: Vec<f64> = v2c[c].iter().map(|&x| (x / 2.0).tanh()).collect();
                for (e, &v) in row.iter().enumerate() {
                    let mut prod = 1.0;
                    for (e2, &t) in tanhs.iter().enumerate() {
                        if e2 != e {
                            prod *= t;
                        }
                    }
                    c2v[v][self.check_edge_pos[c][e]] = 2.0 * atanh_safe(prod);
                }
            }

            // Variable-node update.
            let mut max_change = 0.0f64;
            for v in 0..self.n {
                let incoming = &c2v[v];
                let total: f64 = incoming.iter().sum();
                for (e, &c) in self.var_adj[v].iter().enumerate() {
                    let msg = llrs[v] + total - incoming[e];
                    let slot = &mut v2c[c][self.var_edge_pos[v][e]];
                    max_change = max_change.max((msg - *slot).abs());
                    *slot = msg;
                }
            }

            if max_change < CONVERGENCE_EPS {
                converged = true;
                break;
            }
        }

        // Hard decision from the final totals.
        let mut writer = BitWriter::with_capacity_bits(self.k);
        for v in 0..self.k {
            let total: f64 = llrs[v] + c2v[v].iter().sum::<f64>();
            writer.push_bit(if total >= 0.0 { 0 } else { 1 });
        }

        Ok(LdpcOutcome {
            bits: writer.finish(),
            converged,
            iterations,
        })
    }
}

/// atanh with the saturation guard: |x| ≥ 1 returns sign(x)·LARGE.
#[inline]
fn atanh_safe(x: f64) -> f64 {
    if x >= 1.0 {
        LARGE_LLR
    } else if x <= -1.0 {
        -LARGE_LLR
    } else {
        0.5 * ((1.0 + x) / (1.0 - x)).ln()
    }
}

/// Map hard bits (one per slice entry, 0/1) to LLRs of the given magnitude.
pub fn llrs_from_bits(bits: &[u8], magnitude: f64) -> Vec<f64> {
    bits.iter()
        .map(|&b| if b & 1 == 0 { magnitude } else { -magnitude })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 32;
    const K: usize = 16;
    const M: usize = N - K;

    /// Solve the parity recurrence for a codeword carrying `info` (K bits).
    /// Check i covers parity bits i and (i+1) mod M, so p_{i+1} = s_i + p_i
    /// with p_0 = 0; solvable when the info syndromes have even weight.
    fn encode_for_test(info: &mut [u8; K]) -> Vec<u8> {
        let ldpc = Ldpc::new(N, K);
        let syndrome = |info: &[u8; K]| -> Vec<u8> {
            (0..M)
                .map(|i| {
                    (0..K)
                        .filter(|&j| (i + 3 * j) % 7 == 0)
                        .fold(0u8, |acc, j| acc ^ info[j])
                })
                .collect()
        };

        let mut s = syndrome(info);
        if s.iter().fold(0u8, |a, &b| a ^ b) == 1 {
            // Flip an info bit whose column has odd weight to fix parity.
            let j = (0..K)
                .find(|&j| (0..M).filter(|&i| (i + 3 * j) % 7 == 0).count() % 2 == 1)
                .expect("odd-weight column exists");
            info[j] ^= 1;
            s = syndrome(info);
        }

        let mut parity = vec![0u8; M];
        for i in 0..M - 1 {
            parity[i + 1] = s[i] ^ parity[i];
        }
        let mut word = Vec::with_capacity(N);
        word.extend_from_slice(info);
        word.extend_from_slice(&parity);
        assert!(ldpc.check_parity(&word), "test encoder produced non-codeword");
        word
    }

    #[test]
    fn test_adjacency_matches_construction_rule() {
        let ldpc = Ldpc::new(N, K);
        for i in 0..M {
            for j in 0..K {
                let connected = ldpc.check_adj[i].contains(&j);
                assert_eq!(connected, (i + 3 * j) % 7 == 0, "i={i} j={j}");
            }
            assert!(ldpc.check_adj[i].contains(&(K + i)));
            assert!(ldpc.check_adj[i].contains(&(K + (i + 1) % M)));
        }
    }

    #[test]
    fn test_all_zero_word_is_codeword() {
        let ldpc = Ldpc::new(N, K);
        assert!(ldpc.check_parity(&[0u8; N]));
    }

    #[test]
    fn test_clean_llrs_decode_to_codeword() {
        let ldpc = Ldpc::new(N, K);
        let mut info = [0u8; K];
        for (j, slot) in info.iter_mut().enumerate() {
            *slot = ((j * 5 + 1) % 3 == 0) as u8;
        }
        let word = encode_for_test(&mut info);
        let llrs = llrs_from_bits(&word, 4.0);

        let outcome = ldpc.decode(&llrs, &CancelToken::default()).unwrap();
        assert!(outcome.converged);

        let mut expected = BitWriter::with_capacity_bits(K);
        for &b in &info {
            expected.push_bit(b);
        }
        assert_eq!(outcome.bits, expected.finish());
    }

    #[test]
    fn test_single_weak_flip_recovered() {
        let ldpc = Ldpc::new(N, K);
        let mut info = [0u8; K];
        info[2] = 1;
        info[9] = 1;
        let word = encode_for_test(&mut info);
        let mut llrs = llrs_from_bits(&word, 4.0);
        // One channel bit flipped with low confidence.
        llrs[5] = -llrs[5].signum() * 0.5;

        let outcome = ldpc.decode(&llrs, &CancelToken::default()).unwrap();
        let mut expected = BitWriter::with_capacity_bits(K);
        for &b in &info {
            expected.push_bit(b);
        }
        assert_eq!(outcome.bits, expected.finish());
    }

    #[test]
    fn test_non_convergence_is_soft() {
        // Contradictory all-low-confidence input: the cap is reached but the
        // decoder still produces a hard decision.
        let ldpc = Ldpc::with_max_iter(N, K, 3);
        let llrs: Vec<f64> = (0..N).map(|i| if i % 2 == 0 { 0.1 } else { -0.1 }).collect();
        let outcome = ldpc.decode(&llrs, &CancelToken::default()).unwrap();
        assert_eq!(outcome.bits.len(), K / 8);
        assert_eq!(outcome.iterations, 3);
    }

    #[test]
    fn test_wrong_llr_length_rejected() {
        let ldpc = Ldpc::new(N, K);
        assert_eq!(
            ldpc.decode(&[0.0; 5], &CancelToken::default()),
            Err(DecodeError::Truncated { need: N, got: 5 })
        );
    }

    #[test]
    fn test_cancellation_between_iterations() {
        let ldpc = Ldpc::new(N, K);
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            ldpc.decode(&vec![0.5; N], &token),
            Err(DecodeError::Cancelled)
        );
    }

    #[test]
    fn test_atanh_safe_saturates() {
        assert_eq!(atanh_safe(1.0), LARGE_LLR);
        assert_eq!(atanh_safe(-1.5), -LARGE_LLR);
        assert!((atanh_safe(0.5) - 0.5493061443340549).abs() < 1e-12);
    }
}
