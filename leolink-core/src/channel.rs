//! Channel impairment simulator.
//!
//! Applies one or more impairment types to a copy of the frame, each drawn
//! with a base occurrence probability scaled by the caller's factor. All
//! randomness comes from the simulator's own seeded generator; reseeding is
//! the only way to reproduce an output. Instances are not shared across
//! threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::bits::{BitReader, BitWriter};

/// Impairment types the channel can inflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImpairmentKind {
    GaussianNoise,
    BurstErrors,
    RandomBits,
    SyncDrift,
    PacketLoss,
}

/// Base occurrence probabilities per injection call, before scaling.
#[derive(Debug, Clone)]
pub struct ChannelProfile {
    pub gaussian_probability: f64,
    pub burst_probability: f64,
    /// Bursts per burst application, before the ⌈count·scale⌉ adjustment.
    pub burst_count: usize,
    pub random_probability: f64,
    pub drift_probability: f64,
    pub loss_probability: f64,
}

impl Default for ChannelProfile {
    fn default() -> Self {
        ChannelProfile {
            gaussian_probability: 0.20,
            burst_probability: 0.25,
            burst_count: 1,
            random_probability: 0.35,
            drift_probability: 0.10,
            loss_probability: 0.10,
        }
    }
}

/// Injection result with the impairments that were actually applied.
#[derive(Debug, Clone)]
pub struct InjectionOutcome {
    pub data: Vec<u8>,
    pub applied: Vec<ImpairmentKind>,
}

/// Seeded error injector.
#[derive(Debug)]
pub struct ChannelSimulator {
    rng: StdRng,
    profile: ChannelProfile,
}

impl ChannelSimulator {
    pub fn new(seed: u64) -> Self {
        ChannelSimulator {
            rng: StdRng::seed_from_u64(seed),
            profile: ChannelProfile::default(),
        }
    }

    pub fn with_profile(seed: u64, profile: ChannelProfile) -> Self {
        ChannelSimulator {
            rng: StdRng::seed_from_u64(seed),
            profile,
        }
    }

    /// Restart the generator; subsequent outputs repeat from this point.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Corrupt a copy of `data`. Each impairment type occurs with its base
    /// probability times `scale`; at least one impairment is always applied.
    pub fn inject(&mut self, data: &[u8], scale: f64) -> Vec<u8> {
        self.inject_detailed(data, scale).data
    }

    /// `inject`, also reporting which impairments were applied.
    pub fn inject_detailed(&mut self, data: &[u8], scale: f64) -> InjectionOutcome {
        let mut out = data.to_vec();
        let mut applied = Vec::new();
        if data.is_empty() {
            return InjectionOutcome { data: out, applied };
        }

        let candidates = [
            (ImpairmentKind::BurstErrors, self.profile.burst_probability),
            (ImpairmentKind::RandomBits, self.profile.random_probability),
            (ImpairmentKind::SyncDrift, self.profile.drift_probability),
            (ImpairmentKind::PacketLoss, self.profile.loss_probability),
            (
                ImpairmentKind::GaussianNoise,
                self.profile.gaussian_probability,
            ),
        ];
        for (kind, base) in candidates {
            if self.rng.gen_bool((base * scale).clamp(0.0, 1.0)) {
                self.apply(&mut out, kind, scale);
                applied.push(kind);
            }
        }
        if applied.is_empty() {
            self.apply(&mut out, ImpairmentKind::RandomBits, scale);
            applied.push(ImpairmentKind::RandomBits);
        }

        InjectionOutcome { data: out, applied }
    }

    /// Apply a single impairment in place. Exposed so tests and the CLI can
    /// drive one impairment type deterministically.
    pub fn apply(&mut self, data: &mut Vec<u8>, kind: ImpairmentKind, scale: f64) {
        if data.is_empty() {
            return;
        }
        match kind {
            ImpairmentKind::GaussianNoise => self.gaussian_noise(data),
            ImpairmentKind::BurstErrors => self.burst_errors(data, scale),
            ImpairmentKind::RandomBits => self.random_bits(data),
            ImpairmentKind::SyncDrift => self.sync_drift(data),
            ImpairmentKind::PacketLoss => self.packet_loss(data),
        }
    }

    /// Flip each bit independently with probability η·0.05, η ∈ [0.1, 0.3].
    fn gaussian_noise(&mut self, data: &mut [u8]) {
        let eta = self.rng.gen_range(0.1..=0.3);
        let p = eta * 0.05;
        for byte in data.iter_mut() {
            for bit in 0..8 {
                if self.rng.gen_bool(p) {
                    *byte ^= 1 << bit;
                }
            }
        }
    }

    /// ⌈count·scale⌉ bursts of 2..4 bytes, 2..4 flipped bits per byte. The
    /// scale widens the burst count only, never the length bounds.
    fn burst_errors(&mut self, data: &mut [u8], scale: f64) {
        if data.len() < 4 {
            return;
        }
        let bursts = ((self.profile.burst_count as f64 * scale).ceil() as usize).max(1);
        for _ in 0..bursts {
            let start = self.rng.gen_range(0..=data.len() - 4);
            let len = self.rng.gen_range(2..=4usize).min(data.len() - start);
            for byte in data[start..start + len].iter_mut() {
                let flips = self.rng.gen_range(2..=4usize);
                let mut positions = [0u8, 1, 2, 3, 4, 5, 6, 7];
                // Partial Fisher–Yates for distinct bit positions.
                for i in 0..flips {
                    let j = self.rng.gen_range(i..8);
                    positions.swap(i, j);
                    *byte ^= 1 << positions[i];
                }
            }
        }
    }

    /// Independent per-bit flips with p ∈ [0.002, 0.01].
    fn random_bits(&mut self, data: &mut [u8]) {
        let p = self.rng.gen_range(0.002..=0.01);
        for byte in data.iter_mut() {
            for bit in 0..8 {
                if self.rng.gen_bool(p) {
                    *byte ^= 1 << bit;
                }
            }
        }
    }

    /// Left-shift the whole bit stream by 1 or 2 bits; the new tail bits are
    /// random.
    fn sync_drift(&mut self, data: &mut Vec<u8>) {
        let shift = self.rng.gen_range(1..=2usize);
        let mut reader = BitReader::new(data);
        for _ in 0..shift {
            let _ = reader.read_bit();
        }
        let mut writer = BitWriter::with_capacity_bits(data.len() * 8);
        while let Some(bit) = reader.read_bit() {
            writer.push_bit(bit);
        }
        for _ in 0..shift {
            writer.push_bit(self.rng.gen_range(0..=1u8));
        }
        *data = writer.finish();
    }

    /// 20% severe: 5..9 contiguous bytes overwritten with random values.
    /// Otherwise 2..4 contiguous bytes with independent 15% bit flips.
    fn packet_loss(&mut self, data: &mut [u8]) {
        if self.rng.gen_bool(0.2) {
            let len = self.rng.gen_range(5..=9usize).min(data.len());
            let start = self.rng.gen_range(0..=data.len() - len);
            for byte in data[start..start + len].iter_mut() {
                *byte = self.rng.gen();
            }
        } else {
            let len = self.rng.gen_range(2..=4usize).min(data.len());
            let start = self.rng.gen_range(0..=data.len() - len);
            for byte in data[start..start + len].iter_mut() {
                for bit in 0..8 {
                    if self.rng.gen_bool(0.15) {
                        *byte ^= 1 << bit;
                    }
                }
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

    fn frame() -> Vec<u8> {
        (0..128).map(|i| (i * 19 + 41) as u8).collect()
    }

    fn bit_errors(a: &[u8], b: &[u8]) -> u32 {
        a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones()).sum()
    }

    #[test]
    fn test_same_seed_reproduces_output() {
        let data = frame();
        let mut a = ChannelSimulator::new(42);
        let mut b = ChannelSimulator::new(42);
        assert_eq!(a.inject(&data, 1.0), b.inject(&data, 1.0));
    }

    #[test]
    fn test_reseed_restarts_sequence() {
        let data = frame();
        let mut sim = ChannelSimulator::new(7);
        let first = sim.inject(&data, 1.0);
        sim.inject(&data, 1.0);
        sim.reseed(7);
        assert_eq!(sim.inject(&data, 1.0), first);
    }

    #[test]
    fn test_inject_always_applies_something() {
        let data = frame();
        let mut sim = ChannelSimulator::new(3);
        for _ in 0..50 {
            let outcome = sim.inject_detailed(&data, 0.0);
            assert!(!outcome.applied.is_empty());
        }
    }

    #[test]
    fn test_burst_touches_a_contiguous_region() {
        let data = frame();
        let mut sim = ChannelSimulator::new(11);
        let mut out = data.clone();
        sim.apply(&mut out, ImpairmentKind::BurstErrors, 1.0);

        let damaged: Vec<usize> = (0..data.len()).filter(|&i| data[i] != out[i]).collect();
        assert!(!damaged.is_empty());
        assert!(damaged.len() <= 4);
        let span = damaged.last().expect("non-empty") - damaged[0] + 1;
        assert!(span <= 4, "burst damage spread over {span} bytes");
        // Every damaged byte has 2..4 flipped bits.
        for &i in &damaged {
            let flips = (data[i] ^ out[i]).count_ones();
            assert!((2..=4).contains(&flips));
        }
    }

    #[test]
    fn test_burst_count_scales() {
        let data = frame();
        let mut sim = ChannelSimulator::new(13);
        let mut out = data.clone();
        sim.apply(&mut out, ImpairmentKind::BurstErrors, 4.0);
        // ⌈1·4⌉ = 4 bursts of up to 4 bytes each.
        let damaged = (0..data.len()).filter(|&i| data[i] != out[i]).count();
        assert!(damaged > 4, "expected several burst regions, got {damaged}");
        assert!(damaged <= 16);
    }

    #[test]
    fn test_gaussian_noise_rate_is_plausible() {
        let data = vec![0u8; 4096];
        let mut sim = ChannelSimulator::new(17);
        let mut out = data.clone();
        sim.apply(&mut out, ImpairmentKind::GaussianNoise, 1.0);
        let errors = bit_errors(&data, &out);
        // p ∈ [0.005, 0.015] over 32768 bits → roughly 160..500 flips.
        assert!(errors > 50, "too few flips: {errors}");
        assert!(errors < 1200, "too many flips: {errors}");
    }

    #[test]
    fn test_sync_drift_shifts_bits() {
        let data = frame();
        let mut sim = ChannelSimulator::new(23);
        let mut out = data.clone();
        sim.apply(&mut out, ImpairmentKind::SyncDrift, 1.0);
        assert_eq!(out.len(), data.len());

        // The output must equal the input shifted left by 1 or 2 bits,
        // ignoring the random tail bits.
        let matches_shift = |s: usize| -> bool {
            let mut reader = BitReader::new(&data);
            for _ in 0..s {
                let _ = reader.read_bit();
            }
            let mut shifted = BitWriter::with_capacity_bits(data.len() * 8);
            while let Some(bit) = reader.read_bit() {
                shifted.push_bit(bit);
            }
            let shifted = shifted.finish();
            let full = data.len() - 1;
            shifted[..full] == out[..full]
        };
        assert!(matches_shift(1) || matches_shift(2));
    }

    #[test]
    fn test_packet_loss_hits_contiguous_bytes() {
        let data = frame();
        let mut sim = ChannelSimulator::new(29);
        let mut out = data.clone();
        sim.apply(&mut out, ImpairmentKind::PacketLoss, 1.0);
        let damaged: Vec<usize> = (0..data.len()).filter(|&i| data[i] != out[i]).collect();
        assert!(!damaged.is_empty());
        let span = damaged.last().expect("non-empty") - damaged[0] + 1;
        assert!(span <= 9, "loss region spread over {span} bytes");
    }

    #[test]
    fn test_empty_input() {
        let mut sim = ChannelSimulator::new(1);
        let outcome = sim.inject_detailed(&[], 1.0);
        assert!(outcome.data.is_empty());
        assert!(outcome.applied.is_empty());
    }
}
