//! Error-pattern analysis: statistical scoring of the damage between an
//! original frame and its corrupted copy.
//!
//! Feature extraction works on the per-byte XOR popcounts. A byte is
//! "damaged" when at least two of its bits flipped; a burst region is a run
//! of three or more consecutive damaged bytes. Classification is first
//! match wins, after the density gate.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Below this error density (or under `MINOR_BIT_FLOOR` flipped bits) the
/// damage is reported as minor.
const MINOR_DENSITY: f64 = 0.005;
const MINOR_BIT_FLOOR: u32 = 10;

const LOSS_THRESHOLD: f64 = 0.30;
const DRIFT_THRESHOLD: f64 = 0.25;
const DRIFT_BURST_CEILING: f64 = 0.40;
const BURST_THRESHOLD: f64 = 0.20;
const GAUSSIAN_THRESHOLD: f64 = 0.15;
const RANDOM_THRESHOLD: f64 = 0.15;

/// Bit shifts probed by the drift detector.
const DRIFT_SEARCH_BITS: i32 = 16;

/// Two flipped bits make a byte "damaged"; three damaged bytes make a run.
const DAMAGED_BIT_MIN: u32 = 2;
const BURST_RUN_MIN: usize = 3;

/// Zero-byte run length that counts toward packet loss.
const LOSS_RUN_MIN: usize = 4;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Primary damage classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorType {
    Burst,
    RandomBit,
    SyncDrift,
    PacketLoss,
    GaussianNoise,
    Mixed,
    Minor,
    None,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorType::Burst => "burst",
            ErrorType::RandomBit => "random-bit",
            ErrorType::SyncDrift => "sync-drift",
            ErrorType::PacketLoss => "packet-loss",
            ErrorType::GaussianNoise => "gaussian-noise",
            ErrorType::Mixed => "mixed",
            ErrorType::Minor => "minor",
            ErrorType::None => "none",
        };
        write!(f, "{name}")
    }
}

/// Analysis record: per-type scores in [0, 1] plus raw damage counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorAnalysis {
    pub primary: ErrorType,
    pub burst_score: f64,
    pub random_score: f64,
    pub drift_score: f64,
    pub loss_score: f64,
    pub gaussian_score: f64,
    pub bit_errors: u32,
    pub burst_regions: usize,
    pub error_density: f64,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Score the damage between `original` and `corrupted`. The frames are
/// expected to be the same length; trailing bytes without a counterpart are
/// ignored.
pub fn analyze(original: &[u8], corrupted: &[u8]) -> ErrorAnalysis {
    let len = original.len().min(corrupted.len());
    let original = &original[..len];
    let corrupted = &corrupted[..len];

    let popcounts: Vec<u32> = original
        .iter()
        .zip(corrupted)
        .map(|(a, b)| (a ^ b).count_ones())
        .collect();
    let bit_errors: u32 = popcounts.iter().sum();
    let error_density = if len == 0 {
        0.0
    } else {
        bit_errors as f64 / (8.0 * len as f64)
    };

    let (burst_regions, run_bytes, run_errors) = burst_runs(&popcounts);
    let burst_score = if bit_errors == 0 || len == 0 {
        0.0
    } else {
        // Concentration of the damage inside runs, discounted by how much of
        // the frame the runs cover: localized bursts score high, frame-wide
        // damage does not.
        let concentration = run_errors as f64 / bit_errors as f64;
        let coverage = run_bytes as f64 / len as f64;
        (concentration * (1.0 - coverage)).clamp(0.0, 1.0)
    };

    let random_score = 1.0 / (1.0 + variance(&popcounts).sqrt());
    let drift_score = drift_score(original, corrupted);
    let loss_score = loss_score(original, corrupted);
    let gaussian_score = gaussian_score(&popcounts);

    let primary = classify_type(
        bit_errors,
        error_density,
        burst_score,
        random_score,
        drift_score,
        loss_score,
        gaussian_score,
    );

    ErrorAnalysis {
        primary,
        burst_score,
        random_score,
        drift_score,
        loss_score,
        gaussian_score,
        bit_errors,
        burst_regions,
        error_density,
    }
}

#[allow(clippy::too_many_arguments)]
fn classify_type(
    bit_errors: u32,
    density: f64,
    burst: f64,
    random: f64,
    drift: f64,
    loss: f64,
    gaussian: f64,
) -> ErrorType {
    if bit_errors == 0 {
        return ErrorType::None;
    }
    if density < MINOR_DENSITY || bit_errors < MINOR_BIT_FLOOR {
        return ErrorType::Minor;
    }
    if loss > LOSS_THRESHOLD {
        return ErrorType::PacketLoss;
    }
    if drift > DRIFT_THRESHOLD && burst < DRIFT_BURST_CEILING {
        return ErrorType::SyncDrift;
    }
    if burst > BURST_THRESHOLD {
        return ErrorType::Burst;
    }
    if gaussian > GAUSSIAN_THRESHOLD {
        return ErrorType::GaussianNoise;
    }
    if random > RANDOM_THRESHOLD {
        return ErrorType::RandomBit;
    }
    ErrorType::Mixed
}

/// Runs of ≥3 consecutive damaged bytes: (run count, bytes in runs, flipped
/// bits in runs).
fn burst_runs(popcounts: &[u32]) -> (usize, usize, u32) {
    let mut regions = 0usize;
    let mut run_bytes = 0usize;
    let mut run_errors = 0u32;

    let mut i = 0;
    while i < popcounts.len() {
        if popcounts[i] >= DAMAGED_BIT_MIN {
            let start = i;
            while i < popcounts.len() && popcounts[i] >= DAMAGED_BIT_MIN {
                i += 1;
            }
            let run = i - start;
            if run >= BURST_RUN_MIN {
                regions += 1;
                run_bytes += run;
                run_errors += popcounts[start..i].iter().sum::<u32>();
            }
        } else {
            i += 1;
        }
    }
    (regions, run_bytes, run_errors)
}

fn variance(popcounts: &[u32]) -> f64 {
    if popcounts.is_empty() {
        return 0.0;
    }
    let n = popcounts.len() as f64;
    let mean = popcounts.iter().sum::<u32>() as f64 / n;
    popcounts
        .iter()
        .map(|&c| {
            let d = c as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

/// Best bit-alignment improvement over the zero-shift match, probing shifts
/// of ±1..16 bits. A genuinely drifted frame realigns almost perfectly at
/// the true shift while its zero-shift match sits near the correlation
/// floor, so the improvement is large; undrifted damage scores near zero.
fn drift_score(original: &[u8], corrupted: &[u8]) -> f64 {
    let nbits = (original.len().min(corrupted.len())) * 8;
    if nbits == 0 {
        return 0.0;
    }
    let bit = |data: &[u8], i: usize| -> u8 { (data[i / 8] >> (7 - i % 8)) & 1 };

    let match_at = |shift: i32| -> f64 {
        let mut matches = 0usize;
        let mut compared = 0usize;
        for i in 0..nbits {
            let j = i as i32 + shift;
            if j < 0 || j >= nbits as i32 {
                continue;
            }
            compared += 1;
            if bit(original, j as usize) == bit(corrupted, i) {
                matches += 1;
            }
        }
        if compared == 0 {
            0.0
        } else {
            matches as f64 / compared as f64
        }
    };

    let base = match_at(0);
    let mut best = 0.0f64;
    for shift in -DRIFT_SEARCH_BITS..=DRIFT_SEARCH_BITS {
        if shift == 0 {
            continue;
        }
        best = best.max(match_at(shift) - base);
    }
    best.clamp(0.0, 1.0)
}

/// Zero-byte runs (≥4) in the corrupted frame where the original carried
/// data, normalized by len/8.
fn loss_score(original: &[u8], corrupted: &[u8]) -> f64 {
    let len = original.len().min(corrupted.len());
    if len == 0 {
        return 0.0;
    }

    let mut runs = 0usize;
    let mut i = 0;
    while i < len {
        if corrupted[i] == 0 && original[i] != 0 {
            let start = i;
            while i < len && corrupted[i] == 0 && original[i] != 0 {
                i += 1;
            }
            if i - start >= LOSS_RUN_MIN {
                runs += 1;
            }
        } else {
            i += 1;
        }
    }
    runs as f64 / (len as f64 / 8.0).max(1.0)
}

/// 1 − coefficient of variation of the per-byte damage, floored at zero.
/// Uniform low-level noise has similar damage everywhere (cv small).
fn gaussian_score(popcounts: &[u32]) -> f64 {
    if popcounts.is_empty() {
        return 0.0;
    }
    let mean = popcounts.iter().sum::<u32>() as f64 / popcounts.len() as f64;
    if mean <= 0.0 {
        return 0.0;
    }
    let cv = variance(popcounts).sqrt() / mean;
    (1.0 - cv).max(0.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
