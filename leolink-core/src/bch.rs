//! Binary BCH(15,7,2) codec over GF(16).
//!
//! Field: x^4 + x + 1 (0x13), α = 2. Generator polynomial
//! 0b1_1101_0001 (degree 8). Codeword bit j is the coefficient of x^j;
//! the 7 message bits occupy x^8..x^14.
//!
//! Decoding: syndromes at α..α^4, Berlekamp–Massey, Chien over the 15 bit
//! positions. Binary code, so correction is a plain bit flip — no Forney.

use crate::bits::{BitReader, BitWriter};
use crate::types::{
    CodecCounters, CounterSnapshot, DecodeError, DecodeResult, EncodeError, EncodeResult,
    FecCodec,
};

/// g(x) for BCH(15,7,2).
const GENERATOR: u16 = 0b1_1101_0001;

const CODE_BITS: usize = 15;
const DATA_BITS: usize = 7;
/// Correctable bit errors per codeword.
const T: usize = 2;

// ---------------------------------------------------------------------------
// GF(16) tables (compile-time)
// ---------------------------------------------------------------------------

const GF16_POLY: u8 = 0x13;
const GF16_ORDER: usize = 15;

const fn build_gf16_tables() -> ([u8; 32], [u8; 16]) {
    let mut exp = [0u8; 32];
    let mut log = [0u8; 16];
    let mut x: u8 = 1;
    let mut i = 0;
    while i < 15 {
        exp[i] = x;
        exp[i + 15] = x;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x10 != 0 {
            x ^= GF16_POLY;
        }
        i += 1;
    }
    (exp, log)
}

static GF16_TABLES: ([u8; 32], [u8; 16]) = build_gf16_tables();

#[inline(always)]
fn gf16_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let (exp, log) = (&GF16_TABLES.0, &GF16_TABLES.1);
    exp[log[a as usize] as usize + log[b as usize] as usize]
}

#[inline(always)]
fn gf16_div(a: u8, b: u8) -> u8 {
    assert!(b != 0, "division by 0 in GF(16)");
    if a == 0 {
        return 0;
    }
    let (exp, log) = (&GF16_TABLES.0, &GF16_TABLES.1);
    exp[(GF16_ORDER + log[a as usize] as usize - log[b as usize] as usize) % GF16_ORDER]
}

#[inline(always)]
fn gf16_alpha_pow(i: i32) -> u8 {
    GF16_TABLES.0[i.rem_euclid(GF16_ORDER as i32) as usize]
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// BCH(15,7,2) codec. Stateless apart from counters.
#[derive(Debug, Default)]
pub struct Bch {
    counters: CodecCounters,
}

impl Bch {
    pub fn new() -> Self {
        Bch::default()
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Systematic encode of a 7-bit message into a 15-bit codeword.
    pub fn encode(&self, message: u8) -> EncodeResult<u16> {
        if message & 0x80 != 0 {
            return Err(EncodeError::OutOfRange("bch message"));
        }
        self.counters.record_encode();
        let shifted = (message as u16) << (CODE_BITS - DATA_BITS);
        Ok(shifted | poly_mod(shifted))
    }

    /// Correct up to two bit errors and return the 7-bit message.
    pub fn decode(&self, received: u16) -> DecodeResult<u8> {
        self.counters.record_decode();
        match self.decode_inner(received & 0x7FFF) {
            Ok((message, corrected)) => {
                self.counters.record_corrected(corrected);
                Ok(message)
            }
            Err(e) => {
                self.counters.record_failure();
                Err(e)
            }
        }
    }

    fn decode_inner(&self, received: u16) -> DecodeResult<(u8, u64)> {
        let syndromes = compute_syndromes(received);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(((received >> (CODE_BITS - DATA_BITS)) as u8, 0));
        }

        let lambda = berlekamp_massey(&syndromes);
        let errors = lambda.len() - 1;
        if errors == 0 || errors > T {
            return Err(DecodeError::Uncorrectable);
        }

        // Chien search: Λ(α^(−j)) = 0 means bit j is flipped.
        let mut fixed = received;
        let mut roots = 0usize;
        for j in 0..CODE_BITS {
            let x = gf16_alpha_pow(-(j as i32));
            let mut acc = 0u8;
            let mut xp = 1u8;
            for &c in &lambda {
                acc ^= gf16_mul(c, xp);
                xp = gf16_mul(xp, x);
            }
            if acc == 0 {
                fixed ^= 1 << j;
                roots += 1;
            }
        }
        if roots != errors {
            return Err(DecodeError::Uncorrectable);
        }

        if compute_syndromes(fixed).iter().any(|&s| s != 0) {
            return Err(DecodeError::Uncorrectable);
        }

        Ok(((fixed >> (CODE_BITS - DATA_BITS)) as u8, roots as u64))
    }
}

/// Remainder of a degree-<15 binary polynomial modulo the generator.
fn poly_mod(mut value: u16) -> u16 {
    for bit in (8..16).rev() {
        if value & (1 << bit) != 0 {
            value ^= GENERATOR << (bit - 8);
        }
    }
    value & 0xFF
}

/// S_i = r(α^i) in GF(16), i = 1..4.
fn compute_syndromes(received: u16) -> [u8; 2 * T] {
    let mut out = [0u8; 2 * T];
    for (idx, s) in out.iter_mut().enumerate() {
        let i = (idx + 1) as i32;
        let mut acc = 0u8;
        for j in 0..CODE_BITS {
            if received & (1 << j) != 0 {
                acc ^= gf16_alpha_pow(i * j as i32);
            }
        }
        *s = acc;
    }
    out
}

/// Standard BM over GF(16); returns the locator coefficients, constant first.
fn berlekamp_massey(syndromes: &[u8; 2 * T]) -> Vec<u8> {
    let mut lambda = vec![1u8];
    let mut prev = vec![1u8];
    let mut l = 0usize;
    let mut m = 1usize;
    let mut prev_disc = 1u8;

    for step in 0..syndromes.len() {
        let mut disc = 0u8;
        for i in 0..lambda.len().min(step + 1) {
            disc ^= gf16_mul(lambda[i], syndromes[step - i]);
        }

        if disc == 0 {
            m += 1;
            continue;
        }

        let adjusted = add_shifted(&lambda, &prev, gf16_div(disc, prev_disc), m);
        if 2 * l <= step {
            prev = lambda;
            prev_disc = disc;
            l = step + 1 - l;
            m = 1;
        } else {
            m += 1;
        }
        lambda = adjusted;
    }

    lambda
}

/// `lambda + coef·x^shift·prev` over GF(16), trimmed.
fn add_shifted(lambda: &[u8], prev: &[u8], coef: u8, shift: usize) -> Vec<u8> {
    let len = lambda.len().max(prev.len() + shift);
    let mut out = vec![0u8; len];
    out[..lambda.len()].copy_from_slice(lambda);
    for (i, &p) in prev.iter().enumerate() {
        out[i + shift] ^= gf16_mul(coef, p);
    }
    while out.len() > 1 && *out.last().expect("non-empty") == 0 {
        out.pop();
    }
    out
}

// ---------------------------------------------------------------------------
// Frame-level codec seam
// ---------------------------------------------------------------------------

/// Protects an arbitrary byte stream by cutting it into 7-bit groups, each
/// carried in one BCH(15,7,2) codeword, MSB-first.
#[derive(Debug, Default)]
pub struct BchFrameCodec {
    inner: Bch,
}

impl BchFrameCodec {
    pub fn new() -> Self {
        BchFrameCodec::default()
    }
}

impl FecCodec for BchFrameCodec {
    fn name(&self) -> &'static str {
        "bch(15,7)"
    }

    fn encode(&self, input: &[u8]) -> EncodeResult<Vec<u8>> {
        let groups = (input.len() * 8).div_ceil(DATA_BITS);
        let mut reader = BitReader::new(input);
        let mut writer = BitWriter::with_capacity_bits(groups * CODE_BITS);
        for _ in 0..groups {
            let mut message = 0u32;
            for _ in 0..DATA_BITS {
                message = (message << 1) | reader.read_bit().unwrap_or(0) as u32;
            }
            let cw = self.inner.encode(message as u8)?;
            writer.push_bits(cw as u32, CODE_BITS);
        }
        Ok(writer.finish())
    }

    fn decode(&self, input: &[u8]) -> DecodeResult<Vec<u8>> {
        let groups = (input.len() * 8) / CODE_BITS;
        let mut reader = BitReader::new(input);
        let mut writer = BitWriter::with_capacity_bits(groups * DATA_BITS);
        for _ in 0..groups {
            let cw = reader.read_bits(CODE_BITS).ok_or(DecodeError::Truncated {
                need: CODE_BITS.div_ceil(8),
                got: 0,
            })?;
            let message = self.inner.decode(cw as u16)?;
            writer.push_bits(message as u32, DATA_BITS);
        }
        let mut bytes = writer.finish();
        bytes.truncate(groups * DATA_BITS / 8);
        Ok(bytes)
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
    fn test_gf16_inverse_pairs() {
        for a in 1..16u8 {
            assert_eq!(gf16_mul(a, gf16_div(1, a)), 1, "a={a}");
        }
    }

    #[test]
    fn test_encode_is_multiple_of_generator() {
        let bch = Bch::new();
        for m in 0..128u8 {
            let cw = bch.encode(m).unwrap();
            assert_eq!(poly_mod(cw), 0, "m={m:#09b}");
        }
    }

    #[test]
    fn test_clean_roundtrip_all_messages() {
        let bch = Bch::new();
        for m in 0..128u8 {
            let cw = bch.encode(m).unwrap();
            assert_eq!(bch.decode(cw).unwrap(), m);
        }
    }

    #[test]
    fn test_all_single_bit_errors() {
        let bch = Bch::new();
        for m in 0..128u8 {
            let cw = bch.encode(m).unwrap();
            for bit in 0..15 {
                assert_eq!(bch.decode(cw ^ (1 << bit)).unwrap(), m, "m={m} bit={bit}");
            }
        }
    }

    #[test]
    fn test_all_double_bit_errors() {
        let bch = Bch::new();
        for m in 0..128u8 {
            let cw = bch.encode(m).unwrap();
            for b1 in 0..15 {
                for b2 in (b1 + 1)..15 {
                    let corrupted = cw ^ (1 << b1) ^ (1 << b2);
                    assert_eq!(
                        bch.decode(corrupted).unwrap(),
                        m,
                        "m={m} bits={b1},{b2}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_triple_errors_never_silently_miscorrect_within_capability() {
        // Three errors exceed t=2: the decoder must either refuse or land on
        // a different codeword it admits — never claim the original message.
        let bch = Bch::new();
        for m in (0..128u8).step_by(7) {
            let cw = bch.encode(m).unwrap();
            for b1 in 0..15 {
                for b2 in (b1 + 1)..15 {
                    for b3 in (b2 + 1)..15 {
                        let corrupted = cw ^ (1 << b1) ^ (1 << b2) ^ (1 << b3);
                        match bch.decode(corrupted) {
                            Err(DecodeError::Uncorrectable) => {}
                            Err(other) => panic!("unexpected error: {other}"),
                            Ok(decoded) => assert_ne!(decoded, m),
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_spec_vector_1010101() {
        // Encode 0b1010101, flip bits 2 and 9, decode back.
        let bch = Bch::new();
        let cw = bch.encode(0b1010101).unwrap();
        let corrupted = cw ^ (1 << 2) ^ (1 << 9);
        assert_eq!(bch.decode(corrupted).unwrap(), 0b1010101);
    }

    #[test]
    fn test_message_wider_than_7_bits_rejected() {
        let bch = Bch::new();
        assert_eq!(
            bch.encode(0x80),
            Err(EncodeError::OutOfRange("bch message"))
        );
    }

    #[test]
    fn test_frame_codec_roundtrip_with_errors() {
        let codec = BchFrameCodec::new();
        let data: Vec<u8> = (0..128).map(|i| (i * 5 + 1) as u8).collect();
        let mut encoded = codec.encode(&data).unwrap();
        // One flipped bit in three separate codeword regions.
        encoded[0] ^= 0x10;
        encoded[50] ^= 0x02;
        encoded[200] ^= 0x80;
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_frame_codec_length_math() {
        let codec = BchFrameCodec::new();
        let data = vec![0xABu8; 128];
        let encoded = codec.encode(&data).unwrap();
        // ceil(1024/7) = 147 codewords, 2205 bits, 276 bytes.
        assert_eq!(encoded.len(), 276);
        assert_eq!(codec.decode(&encoded).unwrap(), data);
    }
}
