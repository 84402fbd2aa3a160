//! Layered frame validation: sync search with resynchronization, structure
//! check, CRC check, and a combined status with a confidence scalar.
//!
//! Layer 1 scans for the sync word — exact at offset 0, exact within the
//! first 16 bytes (resync), or a weak ≥30/32-bit correlation anywhere.
//! Layer 2 cross-checks the payload length field against the bytes actually
//! present from the sync position. Layer 3 recomputes the CRC over the
//! realigned frame.

use serde::Serialize;

use crate::crc::crc32;
use crate::frame::{FRAME_LEN, OFF_CRC, OFF_PAYLOAD_LEN, PAYLOAD_LEN, SYNC_BYTES};

/// Resync window: exact sync matches are accepted this deep into the buffer.
const RESYNC_WINDOW: usize = 16;
/// Matching bits (of 32) for a weak sync lock.
const WEAK_SYNC_BITS: u32 = 30;
/// Bytes of a frame that are not payload (sync + header + padding + CRC).
const FRAME_OVERHEAD: usize = FRAME_LEN - PAYLOAD_LEN;

/// Minimum confidence for a degraded-but-usable verdict.
const DEGRADED_MIN_CONFIDENCE: f64 = 0.5;
/// Confidence bonus for a successful resynchronization, and its cap.
const RECOVERY_BONUS: f64 = 0.3;
const RECOVERY_CAP: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncStatus {
    Valid,
    Resynced,
    Weak,
    Lost,
}

impl SyncStatus {
    fn penalty(self) -> f64 {
        match self {
            SyncStatus::Valid => 0.0,
            SyncStatus::Resynced => -0.1,
            SyncStatus::Weak => -0.3,
            SyncStatus::Lost => -0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StructureStatus {
    Valid,
    Truncated,
    Oversized,
    Malformed,
}

impl StructureStatus {
    fn penalty(self) -> f64 {
        match self {
            StructureStatus::Valid => 0.0,
            StructureStatus::Oversized => -0.2,
            StructureStatus::Truncated => -0.6,
            StructureStatus::Malformed => -0.9,
        }
    }
}

/// Combined verdict, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FrameStatus {
    /// All layers pass with no resync.
    Valid,
    /// All layers pass after resynchronization.
    Recovered,
    /// Structure is sound but the CRC disagrees.
    DataCorrupted,
    /// Non-fatal layer 1/2 findings with usable confidence.
    Degraded,
    Truncated,
    Malformed,
    SyncLost,
}

/// Full validation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub status: FrameStatus,
    pub sync: SyncStatus,
    pub sync_offset: usize,
    pub structure: StructureStatus,
    pub crc_ok: bool,
    pub confidence: f64,
    /// The realigned 128-byte frame, when enough bytes exist at the chosen
    /// sync position (present even on CRC failure so FEC can still run).
    #[serde(skip)]
    pub frame: Option<Vec<u8>>,
}

/// Stateless layered validator.
#[derive(Debug, Default)]
pub struct FrameValidator;

impl FrameValidator {
    pub fn new() -> Self {
        FrameValidator
    }

    pub fn validate(&self, buffer: &[u8]) -> ValidationReport {
        let (sync, sync_offset) = search_sync(buffer);
        let structure = check_structure(buffer, sync_offset, sync);
        let crc_ok = check_crc(buffer, sync_offset);

        let resynced = matches!(sync, SyncStatus::Resynced | SyncStatus::Weak);
        let mut confidence = 1.0 + sync.penalty() + structure.penalty();
        if resynced && crc_ok {
            confidence = (confidence + RECOVERY_BONUS).min(RECOVERY_CAP);
        }
        let confidence = confidence.clamp(0.0, 1.0);

        let status = combined_status(sync, structure, crc_ok, confidence);

        let frame = if sync_offset + FRAME_LEN <= buffer.len() && sync != SyncStatus::Lost {
            Some(buffer[sync_offset..sync_offset + FRAME_LEN].to_vec())
        } else {
            None
        };

        ValidationReport {
            status,
            sync,
            sync_offset,
            structure,
            crc_ok,
            confidence,
            frame,
        }
    }
}

// ---------------------------------------------------------------------------
// Layer 1: sync search
// ---------------------------------------------------------------------------

fn search_sync(buffer: &[u8]) -> (SyncStatus, usize) {
    if buffer.len() < 4 {
        return (SyncStatus::Lost, 0);
    }
    if buffer[..4] == SYNC_BYTES {
        return (SyncStatus::Valid, 0);
    }

    let window_end = RESYNC_WINDOW.min(buffer.len() - 4);
    for off in 1..=window_end {
        if buffer[off..off + 4] == SYNC_BYTES {
            return (SyncStatus::Resynced, off);
        }
    }

    // Weak lock: best bitwise correlation anywhere in the buffer.
    let mut best_bits = 0u32;
    let mut best_off = 0usize;
    for off in 0..=buffer.len() - 4 {
        let matching = 32
            - buffer[off..off + 4]
                .iter()
                .zip(&SYNC_BYTES)
                .map(|(a, b)| (a ^ b).count_ones())
                .sum::<u32>();
        if matching > best_bits {
            best_bits = matching;
            best_off = off;
        }
    }
    if best_bits >= WEAK_SYNC_BITS {
        (SyncStatus::Weak, best_off)
    } else {
        (SyncStatus::Lost, 0)
    }
}

// ---------------------------------------------------------------------------
// Layer 2: structure
// ---------------------------------------------------------------------------

fn check_structure(buffer: &[u8], sync_offset: usize, sync: SyncStatus) -> StructureStatus {
    if sync == SyncStatus::Lost {
        return StructureStatus::Malformed;
    }
    let len_field_at = sync_offset + OFF_PAYLOAD_LEN;
    if len_field_at + 2 > buffer.len() {
        return StructureStatus::Malformed;
    }
    let payload_len = u16::from_be_bytes([buffer[len_field_at], buffer[len_field_at + 1]]) as usize;

    let expected = FRAME_OVERHEAD + payload_len;
    let actual = buffer.len() - sync_offset;
    match actual.cmp(&expected) {
        std::cmp::Ordering::Equal => StructureStatus::Valid,
        std::cmp::Ordering::Less => StructureStatus::Truncated,
        std::cmp::Ordering::Greater => StructureStatus::Oversized,
    }
}

// ---------------------------------------------------------------------------
// Layer 3: CRC
// ---------------------------------------------------------------------------

fn check_crc(buffer: &[u8], sync_offset: usize) -> bool {
    if sync_offset + FRAME_LEN > buffer.len() {
        return false;
    }
    let frame = &buffer[sync_offset..sync_offset + FRAME_LEN];
    let stored = u32::from_be_bytes([frame[124], frame[125], frame[126], frame[127]]);
    crc32(&frame[..OFF_CRC]) == stored
}

// ---------------------------------------------------------------------------
// Combination
// ---------------------------------------------------------------------------

fn combined_status(
    sync: SyncStatus,
    structure: StructureStatus,
    crc_ok: bool,
    confidence: f64,
) -> FrameStatus {
    if sync == SyncStatus::Lost {
        return FrameStatus::SyncLost;
    }
    match structure {
        StructureStatus::Malformed => return FrameStatus::Malformed,
        StructureStatus::Truncated => return FrameStatus::Truncated,
        _ => {}
    }

    if crc_ok {
        match (sync, structure) {
            (SyncStatus::Valid, StructureStatus::Valid) => FrameStatus::Valid,
            (_, StructureStatus::Valid) => FrameStatus::Recovered,
            _ if confidence >= DEGRADED_MIN_CONFIDENCE => FrameStatus::Degraded,
            _ => FrameStatus::DataCorrupted,
        }
    } else {
        FrameStatus::DataCorrupted
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
