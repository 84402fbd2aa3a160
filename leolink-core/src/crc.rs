//! CRC-32 validation for telemetry frames.
//!
//! IEEE 802.3 polynomial, reflected form: init 0xFFFFFFFF, process bytes
//! LSB-first through a 256-entry table, final XOR 0xFFFFFFFF.
//!
//! The frame stores the CRC big-endian over bytes [0, 124); see `frame`.

/// Reflected IEEE 802.3 generator.
const GENERATOR: u32 = 0xEDB8_8320;

// ---------------------------------------------------------------------------
// CRC lookup table (compile-time)
// ---------------------------------------------------------------------------

const fn build_crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ GENERATOR;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC_TABLE: [u32; 256] = build_crc_table();

// ---------------------------------------------------------------------------
// Core CRC functions
// ---------------------------------------------------------------------------

/// CRC-32 of a byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc = (crc >> 8) ^ CRC_TABLE[((crc ^ byte as u32) & 0xFF) as usize];
    }
    crc ^ 0xFFFF_FFFF
}

/// Check a buffer whose last 4 bytes hold a big-endian CRC-32 of everything
/// before them.
pub fn verify_trailing(data: &[u8]) -> bool {
    if data.len() < 4 {
        return false;
    }
    let body = &data[..data.len() - 4];
    let stored = u32::from_be_bytes([
        data[data.len() - 4],
        data[data.len() - 3],
        data[data.len() - 2],
        data[data.len() - 1],
    ]);
    crc32(body) == stored
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
