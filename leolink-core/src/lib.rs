//! leolink-core: telemetry frame coding and recovery library.
//!
//! No async, no I/O — just algorithms. This crate is the shared core used
//! by the `leolink` CLI: CCSDS-style frame building and validation, the FEC
//! codecs (Viterbi, Reed–Solomon, BCH, Hamming, LDPC), the channel error
//! injector, and the analyzer/classifier pair that picks a recovery
//! strategy.

pub mod analyzer;
pub mod bch;
pub mod bits;
pub mod channel;
pub mod crc;
pub mod frame;
pub mod gf256;
pub mod hamming;
pub mod interleave;
pub mod ldpc;
pub mod pipeline;
pub mod poly;
pub mod rs;
pub mod strategy;
pub mod telemetry;
pub mod types;
pub mod validator;
pub mod viterbi;

// Re-export commonly used types at crate root
pub use analyzer::{analyze, ErrorAnalysis, ErrorType};
pub use channel::{ChannelSimulator, ImpairmentKind};
pub use frame::{build_with_seq, parse_frame, FrameBuilder, ParsedFrame, FRAME_LEN, SYNC_WORD};
pub use pipeline::{
    CycleReport, DeliveryOutcome, FecScheme, LinkStats, PipelineConfig, TelemetryPipeline,
};
pub use strategy::{classify, Algorithm, CorrectionStrategy};
pub use telemetry::{TelemetryRecord, Visibility};
pub use types::*;
pub use validator::{FrameStatus, FrameValidator, ValidationReport};
