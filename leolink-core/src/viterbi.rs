//! Rate-1/2, K=7 convolutional codec (CCSDS convention).
//!
//! Generators g0 = 0o171, g1 = 0o133. Input bits are taken MSB-first per
//! byte; each input bit emits a 2-bit symbol (g0 output first), packed
//! MSB-first. The decoder is a hard-decision Viterbi with a Hamming branch
//! metric and a 35-deep survivor ring (5·K) driving continuous truncated
//! traceback, plus a soft-decision variant fed by channel LLRs.

use crate::bits::{BitReader, BitWriter};
use crate::types::{
    CancelToken, CodecCounters, CounterSnapshot, DecodeError, DecodeResult, EncodeResult,
    FecCodec,
};

const G0: u8 = 0o171;
const G1: u8 = 0o133;
const STATES: usize = 64;
const STATE_MASK: u8 = 0x3F;
/// Survivor ring depth, 5·K.
const TRACEBACK: usize = 35;

const INFINITY: u32 = u32::MAX / 2;

#[derive(Debug, Clone, Copy)]
struct Transition {
    next: u8,
    /// Expected 2-bit channel symbol, g0 output in the high bit.
    symbol: u8,
}

#[derive(Debug, Clone, Copy, Default)]
struct Survivor {
    prev: u8,
    bit: u8,
}

/// Convolutional codec. The trellis is built once at construction and is
/// immutable afterwards; instances are safe to share across threads.
#[derive(Debug)]
pub struct Viterbi {
    trellis: [[Transition; 2]; STATES],
    counters: CodecCounters,
}

#[inline(always)]
fn parity(x: u8) -> u8 {
    (x.count_ones() & 1) as u8
}

impl Default for Viterbi {
    fn default() -> Self {
        Self::new()
    }
}

impl Viterbi {
    pub fn new() -> Self {
        let mut trellis = [[Transition { next: 0, symbol: 0 }; 2]; STATES];
        for (state, row) in trellis.iter_mut().enumerate() {
            for (bit, slot) in row.iter_mut().enumerate() {
                let window = ((state as u8) << 1) | bit as u8;
                let out0 = parity(window & G0);
                let out1 = parity(window & G1);
                *slot = Transition {
                    next: window & STATE_MASK,
                    symbol: out0 << 1 | out1,
                };
            }
        }
        Viterbi {
            trellis,
            counters: CodecCounters::new(),
        }
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    // -----------------------------------------------------------------------
    // Encode
    // -----------------------------------------------------------------------

    /// Encode bytes; the output is exactly twice as long.
    pub fn encode(&self, input: &[u8]) -> Vec<u8> {
        self.counters.record_encode();
        self.encode_raw(input)
    }

    fn encode_raw(&self, input: &[u8]) -> Vec<u8> {
        let mut writer = BitWriter::with_capacity_bits(input.len() * 16);
        let mut state = 0u8;
        let mut reader = BitReader::new(input);
        while let Some(bit) = reader.read_bit() {
            let tr = self.trellis[state as usize][bit as usize];
            writer.push_bits(tr.symbol as u32, 2);
            state = tr.next;
        }
        writer.finish()
    }

    // -----------------------------------------------------------------------
    // Decode
    // -----------------------------------------------------------------------

    /// Hard-decision decode. The input must hold an even number of bytes
    /// (each output byte consumes two symbol bytes).
    pub fn decode(&self, symbols: &[u8]) -> DecodeResult<Vec<u8>> {
        self.decode_cancellable(symbols, &CancelToken::default())
    }

    pub fn decode_cancellable(
        &self,
        symbols: &[u8],
        cancel: &CancelToken,
    ) -> DecodeResult<Vec<u8>> {
        self.counters.record_decode();
        match self.decode_inner(symbols, cancel) {
            Ok(bits) => {
                // Corrected count: channel bits that disagree with a clean
                // re-encode of the decision.
                let reencoded = self.encode_raw(&bits);
                let corrected: u32 = reencoded
                    .iter()
                    .zip(symbols)
                    .map(|(a, b)| (a ^ b).count_ones())
                    .sum();
                self.counters.record_corrected(corrected as u64);
                Ok(bits)
            }
            Err(e) => {
                self.counters.record_failure();
                Err(e)
            }
        }
    }

    fn decode_inner(&self, symbols: &[u8], cancel: &CancelToken) -> DecodeResult<Vec<u8>> {
        if symbols.len() % 2 != 0 {
            return Err(DecodeError::Truncated {
                need: symbols.len() + 1,
                got: symbols.len(),
            });
        }
        let n_steps = symbols.len() * 4;
        if n_steps == 0 {
            return Ok(Vec::new());
        }

        let mut metrics = vec![INFINITY; STATES];
        let mut next_metrics = vec![INFINITY; STATES];
        metrics[0] = 0;

        let mut ring = vec![[Survivor::default(); STATES]; TRACEBACK];
        let mut out = BitWriter::with_capacity_bits(n_steps);

        let mut reader = BitReader::new(symbols);
        for t in 0..n_steps {
            cancel.check()?;
            let rx = reader.read_bits(2).expect("length checked") as u8;

            next_metrics.fill(INFINITY);
            let slot = &mut ring[t % TRACEBACK];
            for state in 0..STATES {
                let pm = metrics[state];
                if pm >= INFINITY {
                    continue;
                }
                for bit in 0..2u8 {
                    let tr = self.trellis[state][bit as usize];
                    let branch = (rx ^ tr.symbol).count_ones();
                    let cand = pm + branch;
                    // Strict less-than keeps the lower source index on ties.
                    if cand < next_metrics[tr.next as usize] {
                        next_metrics[tr.next as usize] = cand;
                        slot[tr.next as usize] = Survivor {
                            prev: state as u8,
                            bit,
                        };
                    }
                }
            }
            std::mem::swap(&mut metrics, &mut next_metrics);

            // Once the ring is full, emit the oldest decision.
            if t + 1 >= TRACEBACK {
                let emit_time = t + 1 - TRACEBACK;
                let mut state = best_state(&metrics);
                let mut bit = 0u8;
                for s in (emit_time..=t).rev() {
                    let entry = ring[s % TRACEBACK][state as usize];
                    bit = entry.bit;
                    state = entry.prev;
                }
                out.push_bit(bit);
            }
        }

        // Flush the ring with a final traceback from the best end state.
        let flush = n_steps.min(TRACEBACK - 1);
        let mut tail = Vec::with_capacity(flush);
        let mut state = best_state(&metrics);
        for s in ((n_steps - flush)..n_steps).rev() {
            let entry = ring[s % TRACEBACK][state as usize];
            tail.push(entry.bit);
            state = entry.prev;
        }
        for &bit in tail.iter().rev() {
            out.push_bit(bit);
        }

        Ok(out.finish())
    }

    /// Soft-decision decode from channel LLRs, one per channel bit (positive
    /// favors 0). `llrs.len()` must be even; returns the decided bits packed
    /// MSB-first.
    pub fn decode_soft(&self, llrs: &[f64], cancel: &CancelToken) -> DecodeResult<Vec<u8>> {
        self.counters.record_decode();
        match self.decode_soft_inner(llrs, cancel) {
            Ok(bits) => Ok(bits),
            Err(e) => {
                self.counters.record_failure();
                Err(e)
            }
        }
    }

    fn decode_soft_inner(&self, llrs: &[f64], cancel: &CancelToken) -> DecodeResult<Vec<u8>> {
        if llrs.len() % 2 != 0 {
            return Err(DecodeError::Truncated {
                need: llrs.len() + 1,
                got: llrs.len(),
            });
        }
        let n_steps = llrs.len() / 2;
        if n_steps == 0 {
            return Ok(Vec::new());
        }

        let mut metrics = vec![f64::INFINITY; STATES];
        let mut next_metrics = vec![f64::INFINITY; STATES];
        metrics[0] = 0.0;

        let mut ring = vec![[Survivor::default(); STATES]; TRACEBACK];
        let mut out = BitWriter::with_capacity_bits(n_steps);

        for t in 0..n_steps {
            cancel.check()?;
            let (l0, l1) = (llrs[2 * t], llrs[2 * t + 1]);

            next_metrics.fill(f64::INFINITY);
            let slot = &mut ring[t % TRACEBACK];
            for state in 0..STATES {
                let pm = metrics[state];
                if !pm.is_finite() {
                    continue;
                }
                for bit in 0..2u8 {
                    let tr = self.trellis[state][bit as usize];
                    let e0 = tr.symbol >> 1;
                    let e1 = tr.symbol & 1;
                    // Pay |llr| whenever the expectation contradicts its sign.
                    let branch = soft_cost(e0, l0) + soft_cost(e1, l1);
                    let cand = pm + branch;
                    if cand < next_metrics[tr.next as usize] {
                        next_metrics[tr.next as usize] = cand;
                        slot[tr.next as usize] = Survivor {
                            prev: state as u8,
                            bit,
                        };
                    }
                }
            }
            std::mem::swap(&mut metrics, &mut next_metrics);

            if t + 1 >= TRACEBACK {
                let emit_time = t + 1 - TRACEBACK;
                let mut state = best_state_soft(&metrics);
                let mut bit = 0u8;
                for s in (emit_time..=t).rev() {
                    let entry = ring[s % TRACEBACK][state as usize];
                    bit = entry.bit;
                    state = entry.prev;
                }
                out.push_bit(bit);
            }
        }

        let flush = n_steps.min(TRACEBACK - 1);
        let mut tail = Vec::with_capacity(flush);
        let mut state = best_state_soft(&metrics);
        for s in ((n_steps - flush)..n_steps).rev() {
            let entry = ring[s % TRACEBACK][state as usize];
            tail.push(entry.bit);
            state = entry.prev;
        }
        for &bit in tail.iter().rev() {
            out.push_bit(bit);
        }

        Ok(out.finish())
    }
}

#[inline]
fn soft_cost(expected: u8, llr: f64) -> f64 {
    if expected == 0 {
        (-llr).max(0.0)
    } else {
        llr.max(0.0)
    }
}

fn best_state(metrics: &[u32]) -> u8 {
    let mut best = 0usize;
    for (i, &m) in metrics.iter().enumerate() {
        if m < metrics[best] {
            best = i;
        }
    }
    best as u8
}

fn best_state_soft(metrics: &[f64]) -> u8 {
    let mut best = 0usize;
    for (i, &m) in metrics.iter().enumerate() {
        if m < metrics[best] {
            best = i;
        }
    }
    best as u8
}

// ---------------------------------------------------------------------------
// Codec seam
// ---------------------------------------------------------------------------

impl FecCodec for Viterbi {
    fn name(&self) -> &'static str {
        "viterbi(171,133)"
    }

    fn encode(&self, input: &[u8]) -> EncodeResult<Vec<u8>> {
        Ok(Viterbi::encode(self, input))
    }

    fn decode(&self, input: &[u8]) -> DecodeResult<Vec<u8>> {
        Viterbi::decode(self, input)
    }

    fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn bit_errors(a: &[u8], b: &[u8]) -> u32 {
        a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
    }

    #[test]
    fn test_trellis_shape() {
        let v = Viterbi::new();
        for state in 0..STATES {
            for bit in 0..2 {
                let tr = v.trellis[state][bit];
                assert_eq!(tr.next, (((state as u8) << 1) | bit as u8) & STATE_MASK);
                assert!(tr.symbol < 4);
            }
        }
    }

    #[test]
    fn test_encode_doubles_length() {
        let v = Viterbi::new();
        assert_eq!(v.encode(&[0u8; 128]).len(), 256);
        assert_eq!(v.encode(&[]).len(), 0);
    }

    #[test]
    fn test_all_zero_input_encodes_to_zero() {
        // State never leaves 0 and both generators output 0.
        let v = Viterbi::new();
        assert!(v.encode(&[0u8; 16]).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_clean_roundtrip_identity() {
        let v = Viterbi::new();
        for input in [
            vec![0xA5u8; 4],
            b"telemetry downlink frame".to_vec(),
            (0..128).map(|i| (i * 37 + 11) as u8).collect::<Vec<u8>>(),
        ] {
            let encoded = v.encode(&input);
            assert_eq!(v.decode(&encoded).unwrap(), input, "len={}", input.len());
        }
    }

    #[test]
    fn test_short_input_roundtrip() {
        // Shorter than the traceback depth: the flush path alone recovers it.
        let v = Viterbi::new();
        let input = vec![0x3Cu8, 0x7E];
        let encoded = v.encode(&input);
        assert_eq!(v.decode(&encoded).unwrap(), input);
    }

    #[test]
    fn test_scattered_bit_errors_corrected() {
        // Frame-sized input, 8 flipped channel bits far apart: the decode
        // must come back with at most one residual bit error.
        let v = Viterbi::new();
        let input: Vec<u8> = (0..128).map(|i| (i * 29 + 3) as u8).collect();
        let mut encoded = v.encode(&input);
        for i in 0..8 {
            encoded[i * 31 + 4] ^= 1 << (i % 8);
        }
        let decoded = v.decode(&encoded).unwrap();
        assert!(bit_errors(&decoded, &input) <= 1);
    }

    #[test]
    fn test_burst_within_32bit_window() {
        // Three flips inside one 32-bit window of the encoded stream must
        // produce at most one output bit error.
        let v = Viterbi::new();
        let input: Vec<u8> = (0..64).map(|i| (i * 13 + 5) as u8).collect();
        let mut encoded = v.encode(&input);
        encoded[40] ^= 0x21;
        encoded[41] ^= 0x04;
        let decoded = v.decode(&encoded).unwrap();
        assert!(bit_errors(&decoded, &input) <= 1);
    }

    #[test]
    fn test_odd_symbol_length_rejected() {
        let v = Viterbi::new();
        assert_eq!(
            v.decode(&[0u8; 3]),
            Err(DecodeError::Truncated { need: 4, got: 3 })
        );
    }

    #[test]
    fn test_cancellation() {
        let v = Viterbi::new();
        let encoded = v.encode(&[0x55u8; 32]);
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            v.decode_cancellable(&encoded, &token),
            Err(DecodeError::Cancelled)
        );
    }

    #[test]
    fn test_soft_decode_matches_hard_on_strong_llrs() {
        let v = Viterbi::new();
        let input: Vec<u8> = (0..48).map(|i| (i * 17 + 7) as u8).collect();
        let encoded = v.encode(&input);

        // Strong LLRs straight from the hard bits: +4 for 0, −4 for 1.
        let mut llrs = Vec::with_capacity(encoded.len() * 8);
        let mut reader = BitReader::new(&encoded);
        while let Some(bit) = reader.read_bit() {
            llrs.push(if bit == 0 { 4.0 } else { -4.0 });
        }
        let decoded = v.decode_soft(&llrs, &CancelToken::default()).unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn test_soft_decode_survives_erased_symbols() {
        let v = Viterbi::new();
        let input: Vec<u8> = (0..32).map(|i| (i * 23 + 1) as u8).collect();
        let encoded = v.encode(&input);

        let mut llrs = Vec::with_capacity(encoded.len() * 8);
        let mut reader = BitReader::new(&encoded);
        while let Some(bit) = reader.read_bit() {
            llrs.push(if bit == 0 { 4.0 } else { -4.0 });
        }
        // Zero-confidence stretch: 12 erased channel bits.
        for l in llrs.iter_mut().skip(100).take(12) {
            *l = 0.0;
        }
        let decoded = v.decode_soft(&llrs, &CancelToken::default()).unwrap();
        assert_eq!(decoded, input);
    }
}
