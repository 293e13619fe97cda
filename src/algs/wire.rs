//! Fixed, little-endian wire types for ghost exchange.
//!
//! Counts and node ids travel as `u64`, field values as `f64` bit patterns, all
//! stored pre-LE so the byte stream is identical on every host.

use bytemuck::{Pod, Zeroable};

use crate::pd_error::PdError;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Decode a received byte buffer; copies so the input need not be aligned.
pub fn collect_from<T: Pod>(bytes: &[u8]) -> Vec<T> {
    bytemuck::pod_collect_to_vec(bytes)
}

pub fn expect_exact_len(neighbor: usize, actual: usize, expected: usize) -> Result<(), PdError> {
    if actual == expected {
        Ok(())
    } else {
        Err(PdError::GhostExchange {
            neighbor,
            message: format!("expected {expected} bytes, got {actual}"),
        })
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u64, // count of following records
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u64).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u64::from_le(self.n_le) as usize
    }
}

/// A global node id carried on the wire.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireIndex {
    pub id_le: u64,
}

impl WireIndex {
    pub fn of(id: u64) -> Self {
        Self { id_le: id.to_le() }
    }
    pub fn get(&self) -> u64 {
        u64::from_le(self.id_le)
    }
}

/// One field component carried on the wire.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireScalar {
    pub bits_le: u64,
}

impl WireScalar {
    pub fn of(v: f64) -> Self {
        Self {
            bits_le: v.to_bits().to_le(),
        }
    }
    pub fn get(&self) -> f64 {
        f64::from_bits(u64::from_le(self.bits_le))
    }
}

/// Pass/fail flag for collective status checks.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireStatus {
    pub ok: u8,
}

impl WireStatus {
    pub fn new(ok: bool) -> Self {
        Self { ok: u8::from(ok) }
    }
    pub fn is_ok(&self) -> bool {
        self.ok != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_keep_their_bits() {
        let values = [0.0, -0.0, 1.5, f64::MIN_POSITIVE, f64::INFINITY];
        let wire: Vec<WireScalar> = values.iter().map(|&v| WireScalar::of(v)).collect();
        let bytes = cast_slice(&wire).to_vec();
        let back: Vec<WireScalar> = collect_from(&bytes);
        for (a, b) in values.iter().zip(back.iter()) {
            assert_eq!(a.to_bits(), b.get().to_bits());
        }
    }

    #[test]
    fn length_mismatch_is_a_ghost_exchange_error() {
        let err = expect_exact_len(3, 8, 16).unwrap_err();
        assert!(matches!(err, PdError::GhostExchange { neighbor: 3, .. }));
        assert!(expect_exact_len(0, 8, 8).is_ok());
        assert_eq!(WireCount::new(12).get(), 12);
    }
}
