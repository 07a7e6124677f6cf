//! Deterministic randomness for the `random` property.
//!
//! Not cryptographic. A point's random value depends only on the query seed and its position,
//! so re-scoring the same point inside one query always yields the same number.

use crate::Vec3;

/// SplitMix64 stream, used when an extender needs more than one value per point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        mix64(self.state)
    }

    /// Uniform in `[0, 1)` using 24 bits of mantissa.
    pub fn next_unit(&mut self) -> f32 {
        let x = (self.next_u64() >> 40) as u32;
        (x as f32) / ((1u32 << 24) as f32)
    }
}

pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

/// Seed for a single point of a query.
pub fn point_seed(query_seed: u64, position: Vec3) -> u64 {
    let px = u64::from(position.x.to_bits());
    let py = u64::from(position.y.to_bits()) << 21;
    let pz = u64::from(position.z.to_bits()) << 42;
    mix64(query_seed ^ mix64(px) ^ mix64(py.wrapping_add(0x9E3779B97F4A7C15)) ^ mix64(pz))
}

/// Stable value in `[0, 1)` for a point.
pub fn point_unit(query_seed: u64, position: Vec3) -> f32 {
    SplitMix64::new(point_seed(query_seed, position)).next_unit()
}
