//! 128-byte CCSDS-style telemetry frame: layout, builder, parser.
//!
//! Layout (all multi-byte fields big-endian):
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0      | 4    | sync word 0x1ACFFC1D |
//! | 4      | 2    | satellite ID |
//! | 6      | 4    | timestamp, seconds truncated |
//! | 10     | 2    | payload length, always 76 |
//! | 12     | 2    | sequence counter |
//! | 14     | 2    | reserved, zero |
//! | 16     | 76   | payload |
//! | 92     | 32   | reserved, zero |
//! | 124    | 4    | CRC-32 over bytes [0, 124) |

use crate::crc::crc32;
use crate::telemetry::{TelemetryRecord, Visibility};
use crate::types::{DecodeError, DecodeResult, EncodeError, EncodeResult};

// ---------------------------------------------------------------------------
// Layout constants
// ---------------------------------------------------------------------------

pub const FRAME_LEN: usize = 128;
pub const SYNC_WORD: u32 = 0x1ACF_FC1D;
pub const SYNC_BYTES: [u8; 4] = SYNC_WORD.to_be_bytes();

pub const OFF_SAT_ID: usize = 4;
pub const OFF_TIMESTAMP: usize = 6;
pub const OFF_PAYLOAD_LEN: usize = 10;
pub const OFF_SEQUENCE: usize = 12;
pub const OFF_RESERVED: usize = 14;
pub const OFF_PAYLOAD: usize = 16;
pub const OFF_CRC: usize = 124;

pub const PAYLOAD_LEN: usize = 76;

// Payload-relative offsets (§ payload layout).
const PL_LATITUDE: usize = 0;
const PL_LONGITUDE: usize = 8;
const PL_ALTITUDE: usize = 16;
const PL_VELOCITY: usize = 20;
const PL_FOOTPRINT: usize = 24;
const PL_DAYNUM: usize = 28;
const PL_SOLAR_LAT: usize = 32;
const PL_SOLAR_LON: usize = 36;
const PL_TIMESTAMP: usize = 40;
const PL_VISIBILITY: usize = 44;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builds sealed frames from telemetry records.
///
/// Keeps the monotone sequence counter; one builder per downlink stream.
#[derive(Debug, Default)]
pub struct FrameBuilder {
    next_seq: u16,
}

impl FrameBuilder {
    pub fn new() -> Self {
        FrameBuilder { next_seq: 0 }
    }

    /// Build a frame, consuming the next sequence number.
    pub fn build(&mut self, record: &TelemetryRecord) -> EncodeResult<[u8; FRAME_LEN]> {
        let seq = self.next_seq;
        let frame = build_with_seq(record, seq)?;
        self.next_seq = self.next_seq.wrapping_add(1);
        Ok(frame)
    }
}

/// Build a frame with an explicit sequence number.
///
/// Fails with `OutOfRange` when the timestamp cannot be narrowed losslessly
/// to the 32-bit wire field.
pub fn build_with_seq(record: &TelemetryRecord, seq: u16) -> EncodeResult<[u8; FRAME_LEN]> {
    let ts: u32 = record
        .timestamp
        .try_into()
        .map_err(|_| EncodeError::OutOfRange("timestamp"))?;

    let mut frame = [0u8; FRAME_LEN];
    frame[..4].copy_from_slice(&SYNC_BYTES);
    frame[OFF_SAT_ID..OFF_SAT_ID + 2].copy_from_slice(&record.sat_id.to_be_bytes());
    frame[OFF_TIMESTAMP..OFF_TIMESTAMP + 4].copy_from_slice(&ts.to_be_bytes());
    frame[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 2]
        .copy_from_slice(&(PAYLOAD_LEN as u16).to_be_bytes());
    frame[OFF_SEQUENCE..OFF_SEQUENCE + 2].copy_from_slice(&seq.to_be_bytes());
    // OFF_RESERVED and the tail padding stay zero.

    pack_payload(record, ts, &mut frame[OFF_PAYLOAD..OFF_PAYLOAD + PAYLOAD_LEN]);

    let crc = crc32(&frame[..OFF_CRC]);
    frame[OFF_CRC..].copy_from_slice(&crc.to_be_bytes());
    Ok(frame)
}

fn pack_payload(record: &TelemetryRecord, ts: u32, payload: &mut [u8]) {
    payload[PL_LATITUDE..PL_LATITUDE + 8].copy_from_slice(&record.latitude.to_be_bytes());
    payload[PL_LONGITUDE..PL_LONGITUDE + 8].copy_from_slice(&record.longitude.to_be_bytes());
    payload[PL_ALTITUDE..PL_ALTITUDE + 4]
        .copy_from_slice(&(record.altitude as f32).to_be_bytes());
    payload[PL_VELOCITY..PL_VELOCITY + 4]
        .copy_from_slice(&(record.velocity as f32).to_be_bytes());
    payload[PL_FOOTPRINT..PL_FOOTPRINT + 4]
        .copy_from_slice(&(record.footprint as f32).to_be_bytes());
    payload[PL_DAYNUM..PL_DAYNUM + 4].copy_from_slice(&(record.daynum as f32).to_be_bytes());
    payload[PL_SOLAR_LAT..PL_SOLAR_LAT + 4]
        .copy_from_slice(&(record.solar_lat as f32).to_be_bytes());
    payload[PL_SOLAR_LON..PL_SOLAR_LON + 4]
        .copy_from_slice(&(record.solar_lon as f32).to_be_bytes());
    payload[PL_TIMESTAMP..PL_TIMESTAMP + 4].copy_from_slice(&ts.to_be_bytes());
    payload[PL_VISIBILITY] = record.visibility.code();
    // Bytes 45..76 are reserved, zero-filled.
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// A parsed telemetry frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFrame {
    pub sat_id: u16,
    /// Header timestamp, seconds.
    pub timestamp: u32,
    pub sequence: u16,
    pub record: TelemetryRecord,
    /// Whether the trailing CRC matched the sealed region.
    pub crc_ok: bool,
}

/// Parse a 128-byte frame back into a telemetry record.
///
/// The caller is expected to have located the frame start (see `validator`);
/// this function demands exact framing. Float fields narrowed to f32 on the
/// wire come back at f32 precision; the units tag is not transmitted.
pub fn parse_frame(frame: &[u8]) -> DecodeResult<ParsedFrame> {
    if frame.len() < FRAME_LEN {
        return Err(DecodeError::Truncated {
            need: FRAME_LEN,
            got: frame.len(),
        });
    }
    if frame[..4] != SYNC_BYTES {
        return Err(DecodeError::SyncLost);
    }

    let payload_len = u16::from_be_bytes([frame[OFF_PAYLOAD_LEN], frame[OFF_PAYLOAD_LEN + 1]]);
    if payload_len as usize != PAYLOAD_LEN {
        return Err(DecodeError::Malformed);
    }

    let sat_id = u16::from_be_bytes([frame[OFF_SAT_ID], frame[OFF_SAT_ID + 1]]);
    let timestamp = u32::from_be_bytes([
        frame[OFF_TIMESTAMP],
        frame[OFF_TIMESTAMP + 1],
        frame[OFF_TIMESTAMP + 2],
        frame[OFF_TIMESTAMP + 3],
    ]);
    let sequence = u16::from_be_bytes([frame[OFF_SEQUENCE], frame[OFF_SEQUENCE + 1]]);

    let payload = &frame[OFF_PAYLOAD..OFF_PAYLOAD + PAYLOAD_LEN];
    let record = unpack_payload(sat_id, payload);

    let crc_ok = crc32(&frame[..OFF_CRC])
        == u32::from_be_bytes([frame[124], frame[125], frame[126], frame[127]]);

    Ok(ParsedFrame {
        sat_id,
        timestamp,
        sequence,
        record,
        crc_ok,
    })
}

fn unpack_payload(sat_id: u16, payload: &[u8]) -> TelemetryRecord {
    let f64_at = |off: usize| {
        f64::from_be_bytes(payload[off..off + 8].try_into().expect("fixed slice"))
    };
    let f32_at = |off: usize| {
        f32::from_be_bytes(payload[off..off + 4].try_into().expect("fixed slice"))
    };

    let ts = u32::from_be_bytes(
        payload[PL_TIMESTAMP..PL_TIMESTAMP + 4]
            .try_into()
            .expect("fixed slice"),
    );

    TelemetryRecord {
        sat_id,
        timestamp: ts as i64,
        latitude: f64_at(PL_LATITUDE),
        longitude: f64_at(PL_LONGITUDE),
        altitude: f32_at(PL_ALTITUDE) as f64,
        velocity: f32_at(PL_VELOCITY) as f64,
        footprint: f32_at(PL_FOOTPRINT) as f64,
        daynum: f32_at(PL_DAYNUM) as f64,
        solar_lat: f32_at(PL_SOLAR_LAT) as f64,
        solar_lon: f32_at(PL_SOLAR_LON) as f64,
        visibility: Visibility::from_code(payload[PL_VISIBILITY]),
        units: String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
