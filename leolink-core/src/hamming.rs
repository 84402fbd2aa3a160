//! Hamming(7,4) codec: single-bit correction, double-bit detection attempt.
//!
//! Codeword layout, positions 1..7 MSB-first: [p1, p2, d1, p3, d2, d3, d4].
//! The syndrome (s1 + 2·s2 + 4·s3) is the 1-based position of a single
//! flipped bit. After flipping, the syndrome is recomputed; a non-zero
//! re-check is reported as `Uncorrectable`. Being a distance-3 code, some
//! double-bit patterns still alias onto a neighboring codeword.

use crate::bits::{BitReader, BitWriter};
use crate::types::{
    CodecCounters, CounterSnapshot, DecodeError, DecodeResult, EncodeError, EncodeResult,
    FecCodec,
};

const CODE_BITS: usize = 7;
const DATA_BITS: usize = 4;

/// Hamming(7,4) codec. Stateless apart from counters.
#[derive(Debug, Default)]
pub struct Hamming {
    counters: CodecCounters,
}

impl Hamming {
    pub fn new() -> Self {
        Hamming::default()
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Encode a nibble (d1..d4, MSB-first) into 7 bits (bit 6 = p1).
    pub fn encode(&self, nibble: u8) -> EncodeResult<u8> {
        if nibble & 0xF0 != 0 {
            return Err(EncodeError::OutOfRange("hamming nibble"));
        }
        self.counters.record_encode();

        let d1 = (nibble >> 3) & 1;
        let d2 = (nibble >> 2) & 1;
        let d3 = (nibble >> 1) & 1;
        let d4 = nibble & 1;

        let p1 = d1 ^ d2 ^ d4;
        let p2 = d1 ^ d3 ^ d4;
        let p3 = d2 ^ d3 ^ d4;

        Ok(p1 << 6 | p2 << 5 | d1 << 4 | p3 << 3 | d2 << 2 | d3 << 1 | d4)
    }

    /// Decode 7 bits back to the nibble, correcting a single flipped bit.
    pub fn decode(&self, codeword: u8) -> DecodeResult<u8> {
        self.counters.record_decode();
        match self.decode_inner(codeword & 0x7F) {
            Ok((nibble, corrected)) => {
                self.counters.record_corrected(corrected);
                Ok(nibble)
            }
            Err(e) => {
                self.counters.record_failure();
                Err(e)
            }
        }
    }

    fn decode_inner(&self, codeword: u8) -> DecodeResult<(u8, u64)> {
        let pos = syndrome(codeword);
        if pos == 0 {
            return Ok((extract_nibble(codeword), 0));
        }

        // Positions are 1-based from the MSB side; bit index from the LSB.
        let fixed = codeword ^ (1 << (CODE_BITS - pos as usize));
        if syndrome(fixed) != 0 {
            return Err(DecodeError::Uncorrectable);
        }
        Ok((extract_nibble(fixed), 1))
    }
}

/// s1 + 2·s2 + 4·s3 over the received word.
fn syndrome(cw: u8) -> u8 {
    let p1 = (cw >> 6) & 1;
    let p2 = (cw >> 5) & 1;
    let d1 = (cw >> 4) & 1;
    let p3 = (cw >> 3) & 1;
    let d2 = (cw >> 2) & 1;
    let d3 = (cw >> 1) & 1;
    let d4 = cw & 1;

    let s1 = p1 ^ d1 ^ d2 ^ d4;
    let s2 = p2 ^ d1 ^ d3 ^ d4;
    let s3 = p3 ^ d2 ^ d3 ^ d4;
    s1 | s2 << 1 | s3 << 2
}

fn extract_nibble(cw: u8) -> u8 {
    let d1 = (cw >> 4) & 1;
    let d2 = (cw >> 2) & 1;
    let d3 = (cw >> 1) & 1;
    let d4 = cw & 1;
    d1 << 3 | d2 << 2 | d3 << 1 | d4
}

// ---------------------------------------------------------------------------
// Frame-level codec seam
// ---------------------------------------------------------------------------

/// Carries a byte stream as two Hamming(7,4) codewords per byte, high nibble
/// first, packed MSB-first.
#[derive(Debug, Default)]
pub struct HammingFrameCodec {
    inner: Hamming,
}

impl HammingFrameCodec {
    pub fn new() -> Self {
        HammingFrameCodec::default()
    }
}

impl FecCodec for HammingFrameCodec {
    fn name(&self) -> &'static str {
        "hamming(7,4)"
    }

    fn encode(&self, input: &[u8]) -> EncodeResult<Vec<u8>> {
        let mut writer = BitWriter::with_capacity_bits(input.len() * 2 * CODE_BITS);
        for &byte in input {
            let hi = self.inner.encode(byte >> 4)?;
            let lo = self.inner.encode(byte & 0x0F)?;
            writer.push_bits(hi as u32, CODE_BITS);
            writer.push_bits(lo as u32, CODE_BITS);
        }
        Ok(writer.finish())
    }

    fn decode(&self, input: &[u8]) -> DecodeResult<Vec<u8>> {
        let groups = (input.len() * 8) / CODE_BITS;
        let mut reader = BitReader::new(input);
        let mut nibbles = Vec::with_capacity(groups);
        for _ in 0..groups {
            let cw = reader.read_bits(CODE_BITS).ok_or(DecodeError::Truncated {
                need: 1,
                got: 0,
            })?;
            nibbles.push(self.inner.decode(cw as u8)?);
        }
        Ok(nibbles
            .chunks_exact(2)
            .map(|pair| pair[0] << 4 | pair[1])
            .collect())
    }

    fn counters(&self) -> CounterSnapshot {
        self.inner.counters()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
