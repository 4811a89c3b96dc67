// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Wrapper types for f32 and f64 with bit-pattern equality and hashing.
//!
//! Operand values compare by their bits so that NaN payloads survive every
//! box/unbox step and results of both execution strategies compare exactly.

use core::fmt;

/// Wrapper for f32 that implements Hash, `PartialEq`, and Eq based on bit
/// patterns.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct FloatBits32(pub u32);

impl FloatBits32 {
    /// Represents a canonical Not-a-Number (`NaN`) value for f32.
    pub const NAN: Self = FloatBits32(0x7fc0_0000);

    /// Creates a new `FloatBits32` from an `f32` value.
    #[must_use]
    pub fn from_float(val: f32) -> Self {
        Self(val.to_bits())
    }

    /// Returns the `f32` value represented by this `FloatBits32`.
    #[must_use]
    pub fn value(self) -> f32 {
        f32::from_bits(self.0)
    }

    /// Returns the underlying `u32` bits.
    #[must_use]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Creates a `FloatBits32` from raw `u32` bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for FloatBits32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#010x})", self.value(), self.0)
    }
}

impl From<f32> for FloatBits32 {
    fn from(val: f32) -> Self {
        Self::from_float(val)
    }
}

/// Wrapper for f64 that implements Hash, `PartialEq`, and Eq based on bit
/// patterns.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct FloatBits64(pub u64);

impl FloatBits64 {
    /// Represents a canonical Not-a-Number (`NaN`) value for f64.
    pub const NAN: Self = FloatBits64(0x7ff8_0000_0000_0000);

    /// Creates a new `FloatBits64` from an `f64` value.
    #[must_use]
    pub fn from_float(val: f64) -> Self {
        Self(val.to_bits())
    }

    /// Returns the `f64` value represented by this `FloatBits64`.
    #[must_use]
    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }

    /// Returns the underlying `u64` bits.
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Creates a `FloatBits64` from raw `u64` bits.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for FloatBits64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#018x})", self.value(), self.0)
    }
}

impl From<f64> for FloatBits64 {
    fn from(val: f64) -> Self {
        Self::from_float(val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_payload_survives() {
        let quiet = f32::from_bits(0x7fc0_0001);
        let bits = FloatBits32::from_float(quiet);
        assert_eq!(bits.to_bits(), 0x7fc0_0001);
        assert_eq!(bits, FloatBits32::from_bits(0x7fc0_0001));
        assert_ne!(bits, FloatBits32::NAN);
    }

    #[test]
    fn signed_zeroes_differ() {
        assert_ne!(FloatBits64::from_float(0.0), FloatBits64::from_float(-0.0));
    }
}
