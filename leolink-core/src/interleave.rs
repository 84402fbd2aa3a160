//! Bit-level block interleaver.
//!
//! Bits are written row-major into a depth × ceil(n/depth) matrix and read
//! column-major, so a contiguous burst on the channel lands spread across
//! the stream after deinterleaving. Combined with BCH(15,7,2) this turns a
//! burst that would swamp one codeword into isolated single-bit errors.

use crate::bch::BchFrameCodec;
use crate::bits::{BitReader, BitWriter};
use crate::types::{
    CounterSnapshot, DecodeResult, EncodeResult, FecCodec,
};

/// Interleaver depth (matrix rows) used by the pipeline scheme.
pub const DEFAULT_DEPTH: usize = 16;

/// Block interleaver over bit streams. Stateless; the permutation depends
/// only on the stream length.
#[derive(Debug, Clone, Copy)]
pub struct BlockInterleaver {
    depth: usize,
}

impl BlockInterleaver {
    pub fn new(depth: usize) -> Self {
        assert!(depth >= 2, "interleaver depth must be at least 2");
        BlockInterleaver { depth }
    }

    /// Permutation: output position k takes input bit `perm[k]`.
    fn permutation(&self, nbits: usize) -> Vec<usize> {
        let cols = nbits.div_ceil(self.depth);
        let mut perm = Vec::with_capacity(nbits);
        for col in 0..cols {
            for row in 0..self.depth {
                let idx = row * cols + col;
                if idx < nbits {
                    perm.push(idx);
                }
            }
        }
        perm
    }

    pub fn interleave(&self, data: &[u8]) -> Vec<u8> {
        self.permute(data, false)
    }

    pub fn deinterleave(&self, data: &[u8]) -> Vec<u8> {
        self.permute(data, true)
    }

    fn permute(&self, data: &[u8], inverse: bool) -> Vec<u8> {
        let nbits = data.len() * 8;
        let perm = self.permutation(nbits);

        let mut bits = Vec::with_capacity(nbits);
        let mut reader = BitReader::new(data);
        while let Some(bit) = reader.read_bit() {
            bits.push(bit);
        }

        let mut out = vec![0u8; nbits];
        if inverse {
            for (k, &src) in perm.iter().enumerate() {
                out[src] = bits[k];
            }
        } else {
            for (k, &src) in perm.iter().enumerate() {
                out[k] = bits[src];
            }
        }

        let mut writer = BitWriter::with_capacity_bits(nbits);
        for bit in out {
            writer.push_bit(bit);
        }
        writer.finish()
    }
}

// ---------------------------------------------------------------------------
// Codec seam
// ---------------------------------------------------------------------------

/// BCH(15,7,2) behind a bit interleaver: the burst-tolerant scheme.
#[derive(Debug)]
pub struct InterleavedBchCodec {
    inner: BchFrameCodec,
    interleaver: BlockInterleaver,
}

impl InterleavedBchCodec {
    pub fn new() -> Self {
        InterleavedBchCodec {
            inner: BchFrameCodec::new(),
            interleaver: BlockInterleaver::new(DEFAULT_DEPTH),
        }
    }
}

impl Default for InterleavedBchCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FecCodec for InterleavedBchCodec {
    fn name(&self) -> &'static str {
        "bch(15,7)+interleave"
    }

    fn encode(&self, input: &[u8]) -> EncodeResult<Vec<u8>> {
        Ok(self.interleaver.interleave(&self.inner.encode(input)?))
    }

    fn decode(&self, input: &[u8]) -> DecodeResult<Vec<u8>> {
        self.inner.decode(&self.interleaver.deinterleave(input))
    }

    fn counters(&self) -> CounterSnapshot {
        self.inner.counters()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_is_identity() {
        let il = BlockInterleaver::new(16);
        for len in [1usize, 7, 64, 160, 276] {
            let data: Vec<u8> = (0..len).map(|i| (i * 57 + 13) as u8).collect();
            assert_eq!(il.deinterleave(&il.interleave(&data)), data, "len={len}");
        }
    }

    #[test]
    fn test_permutation_is_a_bijection() {
        let il = BlockInterleaver::new(16);
        let perm = il.permutation(1024);
        let mut seen = vec![false; 1024];
        for &p in &perm {
            assert!(!seen[p], "position {p} emitted twice");
            seen[p] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_adjacent_bits_spread_apart() {
        // Consecutive channel positions must map to stream positions at
        // least one matrix column apart.
        let il = BlockInterleaver::new(16);
        let nbits = 1024;
        let cols = nbits / 16;
        let perm = il.permutation(nbits);
        for pair in perm.windows(2) {
            let gap = pair[0].abs_diff(pair[1]);
            assert!(gap >= cols - 1, "gap {gap} below column width");
        }
    }

    #[test]
    fn test_interleaved_bch_survives_a_burst_plain_bch_cannot() {
        let data: Vec<u8> = (0..128).map(|i| (i * 3 + 7) as u8).collect();

        // Six consecutive flipped bits land inside a single 15-bit codeword
        // of the plain stream.
        let plain = BchFrameCodec::new();
        let mut encoded = plain.encode(&data).unwrap();
        encoded[3] ^= 0b0011_1111;
        match plain.decode(&encoded) {
            Ok(decoded) => assert_ne!(decoded, data),
            Err(_) => {}
        }

        // The same burst against the interleaved stream spreads into six
        // different codewords and decodes cleanly.
        let codec = InterleavedBchCodec::new();
        let mut encoded = codec.encode(&data).unwrap();
        encoded[3] ^= 0b0011_1111;
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }
}
