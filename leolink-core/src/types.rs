//! Shared types and error enums for leolink-core.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// Errors produced while building frames or encoding codewords.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("value out of range for field {0}")]
    OutOfRange(&'static str),
}

/// Errors produced while decoding codewords or validating frames.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("input truncated: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },
    #[error("errors exceed correction capability")]
    Uncorrectable,
    #[error("decode cancelled")]
    Cancelled,
    #[error("frame header unreadable")]
    Malformed,
    #[error("sync word not found within search window")]
    SyncLost,
}

pub type EncodeResult<T> = std::result::Result<T, EncodeError>;
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation token shared between a caller and a decode in
/// progress. The LDPC iteration loop, the RS Berlekamp–Massey loop, and the
/// Viterbi forward pass poll it between iterations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken(Arc::new(AtomicBool::new(false)))
    }

    /// Request cancellation. Decoders in flight return `DecodeError::Cancelled`
    /// at their next poll point.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Poll point used inside decoder loops.
    pub(crate) fn check(&self) -> DecodeResult<()> {
        if self.is_cancelled() {
            Err(DecodeError::Cancelled)
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Performance counters
// ---------------------------------------------------------------------------

/// Monotonic per-codec counters. Updated with relaxed atomic increments on
/// every outcome, including failures, so operators can compute
/// corrected/failed ratios. Never affects correctness.
#[derive(Debug, Default)]
pub struct CodecCounters {
    encodes: AtomicU64,
    decodes: AtomicU64,
    corrected: AtomicU64,
    failures: AtomicU64,
}

impl CodecCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_encode(&self) {
        self.encodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode(&self) {
        self.decodes.fetch_add(1, Ordering::Relaxed);
    }

    /// Count symbols or bits repaired in a successful decode.
    pub fn record_corrected(&self, n: u64) {
        self.corrected.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            encodes: self.encodes.load(Ordering::Relaxed),
            decodes: self.decodes.load(Ordering::Relaxed),
            corrected: self.corrected.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a codec's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub encodes: u64,
    pub decodes: u64,
    pub corrected: u64,
    pub failures: u64,
}

// ---------------------------------------------------------------------------
// Codec seam
// ---------------------------------------------------------------------------

/// Byte-stream FEC codec interface. Dynamic dispatch happens only at the
/// orchestration seam; the concrete codecs are used directly everywhere else.
pub trait FecCodec: Send + Sync {
    fn name(&self) -> &'static str;

    /// Expand `input` into a protected stream.
    fn encode(&self, input: &[u8]) -> EncodeResult<Vec<u8>>;

    /// Recover the original stream from a possibly corrupted one.
    fn decode(&self, input: &[u8]) -> DecodeResult<Vec<u8>>;

    fn counters(&self) -> CounterSnapshot;
}

// ---------------------------------------------------------------------------
// Hex utilities (CLI file format)
// ---------------------------------------------------------------------------

/// Decode a hex string into bytes. Case-insensitive, must be even length.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for chunk in hex.as_bytes().chunks(2) {
        let high = hex_digit(chunk[0])?;
        let low = hex_digit(chunk[1])?;
        bytes.push((high << 4) | low);
    }
    Some(bytes)
}

/// Encode bytes as uppercase hex string.
pub fn hex_encode(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    for &b in data {
        s.push(HEX_CHARS[(b >> 4) as usize] as char);
        s.push(HEX_CHARS[(b & 0x0F) as usize] as char);
    }
    s
}

const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_fires_once_cancelled() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert_eq!(token.check(), Err(DecodeError::Cancelled));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_token_clone_shares_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_counters_accumulate() {
        let counters = CodecCounters::new();
        counters.record_encode();
        counters.record_decode();
        counters.record_decode();
        counters.record_corrected(3);
        counters.record_failure();

        let snap = counters.snapshot();
        assert_eq!(snap.encodes, 1);
        assert_eq!(snap.decodes, 2);
        assert_eq!(snap.corrected, 3);
        assert_eq!(snap.failures, 1);
    }

    #[test]
    fn test_hex_roundtrip() {
        assert_eq!(hex_decode("1ACFFC1D"), Some(vec![0x1A, 0xCF, 0xFC, 0x1D]));
        assert_eq!(hex_encode(&[0x1A, 0xCF, 0xFC, 0x1D]), "1ACFFC1D");
        assert_eq!(hex_decode("odd"), None);
        assert_eq!(hex_decode("ZZ"), None);
    }
}
