//! End-to-end link orchestration: build → FEC-encode → inject → FEC-decode
//! → validate → analyze → classify.
//!
//! The pipeline is the only place that dispatches codecs through the
//! `FecCodec` vtable. With adaptive mode on, the strategy classifier's
//! recommendation selects the scheme used for subsequent frames, so a noisy
//! channel drives the link toward the codec that fits its damage signature.

use serde::Serialize;

use crate::analyzer::{analyze, ErrorAnalysis};
use crate::bch::BchFrameCodec;
use crate::channel::{ChannelSimulator, ImpairmentKind};
use crate::frame::{parse_frame, FrameBuilder};
use crate::hamming::HammingFrameCodec;
use crate::interleave::InterleavedBchCodec;
use crate::rs::RsFrameCodec;
use crate::strategy::{classify, Algorithm, CorrectionStrategy};
use crate::telemetry::TelemetryRecord;
use crate::types::{EncodeResult, FecCodec};
use crate::validator::{FrameStatus, FrameValidator, ValidationReport};
use crate::viterbi::Viterbi;

/// FEC layer applied to frames on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FecScheme {
    None,
    Hamming,
    Bch,
    InterleavedBch,
    Convolutional,
    ReedSolomon,
}

impl std::fmt::Display for FecScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FecScheme::None => "none",
            FecScheme::Hamming => "hamming",
            FecScheme::Bch => "bch",
            FecScheme::InterleavedBch => "bch+interleave",
            FecScheme::Convolutional => "convolutional",
            FecScheme::ReedSolomon => "reed-solomon",
        };
        write!(f, "{name}")
    }
}

/// Pipeline configuration. The core never reads files; the CLI maps its
/// flags onto this struct.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub scheme: FecScheme,
    pub channel_seed: u64,
    pub channel_scale: f64,
    /// Let strategy recommendations switch the scheme for later frames.
    pub adaptive: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            scheme: FecScheme::Convolutional,
            channel_seed: 0x1ACF_FC1D,
            channel_scale: 1.0,
            adaptive: true,
        }
    }
}

/// What happened to one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeliveryOutcome {
    Delivered { corrected: bool },
    RetransmitRequested,
    Failed,
}

/// Full record of one encode→inject→recover cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub sequence: u16,
    pub scheme: FecScheme,
    pub transmitted_len: usize,
    pub impairments: Vec<ImpairmentKind>,
    /// Channel-level damage: transmitted stream vs. received stream.
    pub analysis: ErrorAnalysis,
    pub strategy: CorrectionStrategy,
    pub validation: ValidationReport,
    pub outcome: DeliveryOutcome,
    /// Telemetry recovered from the validated frame, when delivery worked.
    pub recovered: Option<TelemetryRecord>,
}

/// Monotone link statistics across cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    pub frames: u64,
    pub delivered: u64,
    pub corrected: u64,
    pub retransmits: u64,
    pub failed: u64,
}

/// The orchestrator.
pub struct TelemetryPipeline {
    config: PipelineConfig,
    builder: FrameBuilder,
    channel: ChannelSimulator,
    validator: FrameValidator,
    scheme: FecScheme,
    stats: LinkStats,

    hamming: HammingFrameCodec,
    bch: BchFrameCodec,
    interleaved_bch: InterleavedBchCodec,
    viterbi: Viterbi,
    rs: RsFrameCodec,
}

impl TelemetryPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        TelemetryPipeline {
            channel: ChannelSimulator::new(config.channel_seed),
            scheme: config.scheme,
            config,
            builder: FrameBuilder::new(),
            validator: FrameValidator::new(),
            stats: LinkStats::default(),
            hamming: HammingFrameCodec::new(),
            bch: BchFrameCodec::new(),
            interleaved_bch: InterleavedBchCodec::new(),
            viterbi: Viterbi::new(),
            rs: RsFrameCodec::new(),
        }
    }

    /// Scheme currently in use (moves under adaptive mode).
    pub fn scheme(&self) -> FecScheme {
        self.scheme
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Run one full cycle for a telemetry record.
    pub fn run_cycle(&mut self, record: &TelemetryRecord) -> EncodeResult<CycleReport> {
        let scheme = self.scheme;
        let frame = self.builder.build(record)?;
        let sequence = parse_frame(&frame).map(|p| p.sequence).unwrap_or(0);

        let transmitted = match self.codec_for(scheme) {
            Some(codec) => codec.encode(&frame)?,
            None => frame.to_vec(),
        };

        let injection = self
            .channel
            .inject_detailed(&transmitted, self.config.channel_scale);

        // Recover the frame bytes: FEC first, then layered validation.
        let candidate = match self.codec_for(scheme) {
            Some(codec) => codec.decode(&injection.data).unwrap_or_else(|_| injection.data.clone()),
            None => injection.data.clone(),
        };
        let validation = self.validator.validate(&candidate);

        let analysis = analyze(&transmitted, &injection.data);
        let strategy = classify(&analysis);

        let recovered = match validation.status {
            FrameStatus::Valid | FrameStatus::Recovered => validation
                .frame
                .as_deref()
                .and_then(|f| parse_frame(f).ok())
                .map(|p| p.record),
            _ => None,
        };

        let outcome = if recovered.is_some() {
            DeliveryOutcome::Delivered {
                corrected: analysis.bit_errors > 0
                    || validation.status == FrameStatus::Recovered,
            }
        } else if strategy.primary == Algorithm::RequestRetransmit {
            DeliveryOutcome::RetransmitRequested
        } else {
            DeliveryOutcome::Failed
        };

        self.stats.frames += 1;
        match outcome {
            DeliveryOutcome::Delivered { corrected } => {
                self.stats.delivered += 1;
                if corrected {
                    self.stats.corrected += 1;
                }
            }
            DeliveryOutcome::RetransmitRequested => self.stats.retransmits += 1,
            DeliveryOutcome::Failed => self.stats.failed += 1,
        }

        if self.config.adaptive {
            if let Some(next) = scheme_for(strategy.primary) {
                self.scheme = next;
            }
        }

        Ok(CycleReport {
            sequence,
            scheme,
            transmitted_len: transmitted.len(),
            impairments: injection.applied,
            analysis,
            strategy,
            validation,
            outcome,
            recovered,
        })
    }

    fn codec_for(&self, scheme: FecScheme) -> Option<&dyn FecCodec> {
        match scheme {
            FecScheme::None => None,
            FecScheme::Hamming => Some(&self.hamming),
            FecScheme::Bch => Some(&self.bch),
            FecScheme::InterleavedBch => Some(&self.interleaved_bch),
            FecScheme::Convolutional => Some(&self.viterbi),
            FecScheme::ReedSolomon => Some(&self.rs),
        }
    }
}

/// Scheme a strategy recommendation maps to for later frames. `None` keeps
/// the current scheme. The LDPC pick lands on Reed–Solomon because the
/// structured H matrix has no encoder for arbitrary data.
fn scheme_for(algorithm: Algorithm) -> Option<FecScheme> {
    match algorithm {
        Algorithm::Viterbi => Some(FecScheme::Convolutional),
        Algorithm::Bch | Algorithm::SafeDefault => Some(FecScheme::Bch),
        Algorithm::Hamming => Some(FecScheme::Hamming),
        Algorithm::Rs | Algorithm::Ldpc => Some(FecScheme::ReedSolomon),
        Algorithm::InterleaverOnly => Some(FecScheme::InterleavedBch),
        Algorithm::Resync | Algorithm::None | Algorithm::RequestRetransmit => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
