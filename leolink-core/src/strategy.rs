//! Correction-strategy selection: a pure decision table from an error
//! analysis to the codec the recovery path should use next.
//!
//! All algorithm-selection policy lives here; the codecs never know why
//! they were chosen.

use serde::Serialize;

use crate::analyzer::{ErrorAnalysis, ErrorType};

/// Confidence for the clean/minor rows.
const CLEAN_CONFIDENCE: f64 = 0.95;
/// Floor/ceiling for the drift→Viterbi confidence ramp.
const DRIFT_CONFIDENCE_FLOOR: f64 = 0.75;
const DRIFT_CONFIDENCE_CEILING: f64 = 0.85;
/// Drift strong enough (and bursts rare enough) to trust Viterbi.
const DRIFT_VITERBI_SCORE: f64 = 0.3;
const DRIFT_VITERBI_BURST_MAX: f64 = 0.3;
/// A mixed sub-score must clear this to drive the recursive pick.
const MIXED_DOMINANT_MIN: f64 = 0.25;

/// Correction algorithms the pipeline can be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Algorithm {
    Viterbi,
    Bch,
    Rs,
    Ldpc,
    Hamming,
    InterleaverOnly,
    Resync,
    None,
    SafeDefault,
    RequestRetransmit,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Algorithm::Viterbi => "viterbi",
            Algorithm::Bch => "bch",
            Algorithm::Rs => "rs",
            Algorithm::Ldpc => "ldpc",
            Algorithm::Hamming => "hamming",
            Algorithm::InterleaverOnly => "interleaver-only",
            Algorithm::Resync => "resync",
            Algorithm::None => "none",
            Algorithm::SafeDefault => "safe-default",
            Algorithm::RequestRetransmit => "request-retransmit",
        };
        write!(f, "{name}")
    }
}

/// Chosen strategy with a confidence scalar and a human-readable rationale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionStrategy {
    pub primary: Algorithm,
    pub secondary: Option<Algorithm>,
    /// Configuration tag, e.g. "conv-k7-r12" or "bch-15-7".
    pub config: &'static str,
    pub confidence: f64,
    pub rationale: String,
}

impl CorrectionStrategy {
    fn new(
        primary: Algorithm,
        secondary: Option<Algorithm>,
        config: &'static str,
        confidence: f64,
        rationale: String,
    ) -> Self {
        CorrectionStrategy {
            primary,
            secondary,
            config,
            confidence,
            rationale,
        }
    }
}

/// Map an analysis to a correction strategy.
pub fn classify(analysis: &ErrorAnalysis) -> CorrectionStrategy {
    classify_as(analysis, analysis.primary)
}

fn classify_as(analysis: &ErrorAnalysis, primary: ErrorType) -> CorrectionStrategy {
    match primary {
        ErrorType::None => CorrectionStrategy::new(
            Algorithm::None,
            Option::None,
            "passthrough",
            CLEAN_CONFIDENCE,
            "no channel damage detected".into(),
        ),
        ErrorType::Minor => CorrectionStrategy::new(
            Algorithm::Hamming,
            Some(Algorithm::Bch),
            "hamming-7-4",
            CLEAN_CONFIDENCE,
            format!(
                "{} flipped bits, within single-bit capability",
                analysis.bit_errors
            ),
        ),
        ErrorType::SyncDrift => {
            if analysis.drift_score > DRIFT_VITERBI_SCORE
                && analysis.burst_score < DRIFT_VITERBI_BURST_MAX
            {
                CorrectionStrategy::new(
                    Algorithm::Viterbi,
                    Some(Algorithm::Bch),
                    "conv-k7-r12",
                    (1.5 * analysis.drift_score)
                        .clamp(DRIFT_CONFIDENCE_FLOOR, DRIFT_CONFIDENCE_CEILING),
                    format!(
                        "bit alignment recovers at a non-zero shift (score {:.2})",
                        analysis.drift_score
                    ),
                )
            } else {
                CorrectionStrategy::new(
                    Algorithm::SafeDefault,
                    Some(Algorithm::Bch),
                    "bch-15-7",
                    DRIFT_CONFIDENCE_FLOOR,
                    "drift signature too weak for trellis realignment".into(),
                )
            }
        }
        ErrorType::RandomBit => CorrectionStrategy::new(
            Algorithm::Bch,
            Some(Algorithm::Hamming),
            "bch-15-7",
            0.90,
            "independent bit flips sit inside BCH capability".into(),
        ),
        ErrorType::Burst => CorrectionStrategy::new(
            // Viterbi smears burst damage across the traceback window.
            Algorithm::Bch,
            Some(Algorithm::Rs),
            "bch-15-7",
            0.85,
            format!(
                "{} burst region(s); trellis decoding is unsafe for bursts",
                analysis.burst_regions
            ),
        ),
        ErrorType::GaussianNoise => CorrectionStrategy::new(
            Algorithm::Ldpc,
            Some(Algorithm::Bch),
            "ldpc-sp",
            0.80,
            "uniform low-level noise favors soft-decision decoding".into(),
        ),
        ErrorType::PacketLoss => CorrectionStrategy::new(
            Algorithm::RequestRetransmit,
            Some(Algorithm::Rs),
            "retransmit",
            0.90,
            "contiguous data loss exceeds in-frame redundancy".into(),
        ),
        ErrorType::Mixed => {
            let dominant = [
                (ErrorType::Burst, analysis.burst_score),
                (ErrorType::RandomBit, analysis.random_score),
                (ErrorType::SyncDrift, analysis.drift_score),
                (ErrorType::PacketLoss, analysis.loss_score),
                (ErrorType::GaussianNoise, analysis.gaussian_score),
            ]
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .expect("non-empty score table");

            if dominant.1 > MIXED_DOMINANT_MIN {
                classify_as(analysis, dominant.0)
            } else {
                CorrectionStrategy::new(
                    Algorithm::SafeDefault,
                    Some(Algorithm::Bch),
                    "bch-15-7",
                    DRIFT_CONFIDENCE_FLOOR,
                    "no dominant damage signature".into(),
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(primary: ErrorType) -> ErrorAnalysis {
        ErrorAnalysis {
            primary,
            burst_score: 0.0,
            random_score: 0.0,
            drift_score: 0.0,
            loss_score: 0.0,
            gaussian_score: 0.0,
            bit_errors: 40,
            burst_regions: 0,
            error_density: 0.04,
        }
    }

    #[test]
    fn test_clean_frame_needs_nothing() {
        let strategy = classify(&analysis(ErrorType::None));
        assert_eq!(strategy.primary, Algorithm::None);
        assert_eq!(strategy.confidence, 0.95);
    }

    #[test]
    fn test_minor_damage_uses_single_bit_codecs() {
        let strategy = classify(&analysis(ErrorType::Minor));
        assert!(matches!(
            strategy.primary,
            Algorithm::Hamming | Algorithm::Bch
        ));
        assert_eq!(strategy.confidence, 0.95);
    }

    #[test]
    fn test_strong_drift_picks_viterbi() {
        let mut a = analysis(ErrorType::SyncDrift);
        a.drift_score = 0.55;
        a.burst_score = 0.1;
        let strategy = classify(&a);
        assert_eq!(strategy.primary, Algorithm::Viterbi);
        assert!((strategy.confidence - 0.825).abs() < 1e-9);
    }

    #[test]
    fn test_drift_confidence_caps_at_085() {
        let mut a = analysis(ErrorType::SyncDrift);
        a.drift_score = 0.9;
        let strategy = classify(&a);
        assert_eq!(strategy.primary, Algorithm::Viterbi);
        assert_eq!(strategy.confidence, 0.85);
    }

    #[test]
    fn test_weak_drift_falls_back_to_safe_default() {
        let mut a = analysis(ErrorType::SyncDrift);
        a.drift_score = 0.27;
        let strategy = classify(&a);
        assert_eq!(strategy.primary, Algorithm::SafeDefault);
        assert_eq!(strategy.confidence, 0.75);
    }

    #[test]
    fn test_bursty_drift_avoids_viterbi() {
        let mut a = analysis(ErrorType::SyncDrift);
        a.drift_score = 0.6;
        a.burst_score = 0.5;
        let strategy = classify(&a);
        assert_ne!(strategy.primary, Algorithm::Viterbi);
    }

    #[test]
    fn test_drift_confidence_monotone_in_score() {
        // Higher sync score must never lower the confidence, across the
        // fallback/Viterbi boundary included.
        let mut last = 0.0f64;
        for step in 0..=100 {
            let mut a = analysis(ErrorType::SyncDrift);
            a.drift_score = step as f64 / 100.0;
            let strategy = classify(&a);
            assert!(
                strategy.confidence >= last,
                "confidence dropped at score {}",
                a.drift_score
            );
            last = strategy.confidence;
        }
    }

    #[test]
    fn test_random_bits_use_bch() {
        let strategy = classify(&analysis(ErrorType::RandomBit));
        assert_eq!(strategy.primary, Algorithm::Bch);
        assert_eq!(strategy.confidence, 0.90);
    }

    #[test]
    fn test_burst_avoids_viterbi() {
        let mut a = analysis(ErrorType::Burst);
        a.burst_score = 0.8;
        a.burst_regions = 2;
        let strategy = classify(&a);
        assert_eq!(strategy.primary, Algorithm::Bch);
        assert_ne!(strategy.primary, Algorithm::Viterbi);
        assert!(strategy.rationale.contains("unsafe for bursts"));
    }

    #[test]
    fn test_gaussian_uses_ldpc() {
        let strategy = classify(&analysis(ErrorType::GaussianNoise));
        assert_eq!(strategy.primary, Algorithm::Ldpc);
    }

    #[test]
    fn test_packet_loss_requests_retransmit() {
        let strategy = classify(&analysis(ErrorType::PacketLoss));
        assert_eq!(strategy.primary, Algorithm::RequestRetransmit);
    }

    #[test]
    fn test_mixed_recurses_on_dominant_score() {
        let mut a = analysis(ErrorType::Mixed);
        a.gaussian_score = 0.5;
        a.random_score = 0.2;
        let strategy = classify(&a);
        assert_eq!(strategy.primary, Algorithm::Ldpc);
    }

    #[test]
    fn test_mixed_without_dominant_is_safe_default() {
        let mut a = analysis(ErrorType::Mixed);
        a.burst_score = 0.1;
        a.random_score = 0.12;
        let strategy = classify(&a);
        assert_eq!(strategy.primary, Algorithm::SafeDefault);
        assert_eq!(strategy.secondary, Some(Algorithm::Bch));
    }
}
