// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Numeric instruction semantics.
//!
//! Operands and results are raw 64-bit slots. Integer ops wrap, division
//! and truncation trap as WebAssembly requires, and float sign operations
//! act on bits so NaN payloads are preserved.

use duet_error::{Error, Result};

use super::instruction::{
    ConversionOp, FloatBinaryOp, FloatCompareOp, FloatUnaryOp, IntBinaryOp, IntCompareOp,
    IntUnaryOp,
};

macro_rules! int_ops {
    ($unary:ident, $binary:ident, $compare:ident, $t:ty, $u:ty) => {
        /// Apply an integer unary operator
        pub fn $unary(op: IntUnaryOp, a: $t) -> Result<$t> {
            Ok(match op {
                IntUnaryOp::Clz => a.leading_zeros() as $t,
                IntUnaryOp::Ctz => a.trailing_zeros() as $t,
                IntUnaryOp::Popcnt => a.count_ones() as $t,
                IntUnaryOp::Extend8S => a as i8 as $t,
                IntUnaryOp::Extend16S => a as i16 as $t,
                IntUnaryOp::Extend32S => {
                    if <$t>::BITS == 32 {
                        return Err(Error::runtime_unsupported_operation(
                            "extend32_s is only defined for i64",
                        ));
                    }
                    a as i32 as $t
                }
            })
        }

        /// Apply an integer binary operator
        pub fn $binary(op: IntBinaryOp, a: $t, b: $t) -> Result<$t> {
            Ok(match op {
                IntBinaryOp::Add => a.wrapping_add(b),
                IntBinaryOp::Sub => a.wrapping_sub(b),
                IntBinaryOp::Mul => a.wrapping_mul(b),
                IntBinaryOp::DivS => {
                    if b == 0 {
                        return Err(Error::trap_integer_divide_by_zero());
                    }
                    if a == <$t>::MIN && b == -1 {
                        return Err(Error::trap_integer_overflow());
                    }
                    a.wrapping_div(b)
                }
                IntBinaryOp::DivU => {
                    if b == 0 {
                        return Err(Error::trap_integer_divide_by_zero());
                    }
                    ((a as $u) / (b as $u)) as $t
                }
                IntBinaryOp::RemS => {
                    if b == 0 {
                        return Err(Error::trap_integer_divide_by_zero());
                    }
                    a.wrapping_rem(b)
                }
                IntBinaryOp::RemU => {
                    if b == 0 {
                        return Err(Error::trap_integer_divide_by_zero());
                    }
                    ((a as $u) % (b as $u)) as $t
                }
                IntBinaryOp::And => a & b,
                IntBinaryOp::Or => a | b,
                IntBinaryOp::Xor => a ^ b,
                IntBinaryOp::Shl => a.wrapping_shl(b as u32),
                IntBinaryOp::ShrS => a.wrapping_shr(b as u32),
                IntBinaryOp::ShrU => (a as $u).wrapping_shr(b as u32) as $t,
                IntBinaryOp::Rotl => a.rotate_left((b as u32) % <$t>::BITS),
                IntBinaryOp::Rotr => a.rotate_right((b as u32) % <$t>::BITS),
            })
        }

        /// Apply an integer comparison
        pub fn $compare(op: IntCompareOp, a: $t, b: $t) -> bool {
            match op {
                IntCompareOp::Eq => a == b,
                IntCompareOp::Ne => a != b,
                IntCompareOp::LtS => a < b,
                IntCompareOp::LtU => (a as $u) < (b as $u),
                IntCompareOp::GtS => a > b,
                IntCompareOp::GtU => (a as $u) > (b as $u),
                IntCompareOp::LeS => a <= b,
                IntCompareOp::LeU => (a as $u) <= (b as $u),
                IntCompareOp::GeS => a >= b,
                IntCompareOp::GeU => (a as $u) >= (b as $u),
            }
        }
    };
}

int_ops!(i32_unary, i32_binary, i32_compare, i32, u32);
int_ops!(i64_unary, i64_binary, i64_compare, i64, u64);

macro_rules! float_ops {
    ($unary:ident, $binary:ident, $compare:ident, $min:ident, $max:ident, $f:ty, $bits:ty) => {
        /// Apply a float unary operator to raw bits
        pub fn $unary(op: FloatUnaryOp, bits: $bits) -> $bits {
            const SIGN: $bits = 1 << (<$bits>::BITS - 1);
            let a = <$f>::from_bits(bits);
            match op {
                FloatUnaryOp::Abs => bits & !SIGN,
                FloatUnaryOp::Neg => bits ^ SIGN,
                FloatUnaryOp::Ceil => a.ceil().to_bits(),
                FloatUnaryOp::Floor => a.floor().to_bits(),
                FloatUnaryOp::Trunc => a.trunc().to_bits(),
                FloatUnaryOp::Nearest => a.round_ties_even().to_bits(),
                FloatUnaryOp::Sqrt => a.sqrt().to_bits(),
            }
        }

        /// Apply a float binary operator to raw bits
        pub fn $binary(op: FloatBinaryOp, a_bits: $bits, b_bits: $bits) -> $bits {
            const SIGN: $bits = 1 << (<$bits>::BITS - 1);
            let a = <$f>::from_bits(a_bits);
            let b = <$f>::from_bits(b_bits);
            match op {
                FloatBinaryOp::Add => (a + b).to_bits(),
                FloatBinaryOp::Sub => (a - b).to_bits(),
                FloatBinaryOp::Mul => (a * b).to_bits(),
                FloatBinaryOp::Div => (a / b).to_bits(),
                FloatBinaryOp::Min => $min(a, b).to_bits(),
                FloatBinaryOp::Max => $max(a, b).to_bits(),
                FloatBinaryOp::Copysign => (a_bits & !SIGN) | (b_bits & SIGN),
            }
        }

        /// Apply a float comparison to raw bits
        pub fn $compare(op: FloatCompareOp, a_bits: $bits, b_bits: $bits) -> bool {
            let a = <$f>::from_bits(a_bits);
            let b = <$f>::from_bits(b_bits);
            match op {
                FloatCompareOp::Eq => a == b,
                FloatCompareOp::Ne => a != b,
                FloatCompareOp::Lt => a < b,
                FloatCompareOp::Gt => a > b,
                FloatCompareOp::Le => a <= b,
                FloatCompareOp::Ge => a >= b,
            }
        }

        // NaN propagates; -0.0 is smaller than +0.0
        fn $min(a: $f, b: $f) -> $f {
            if a.is_nan() || b.is_nan() {
                return <$f>::NAN;
            }
            if a == b {
                return <$f>::from_bits(a.to_bits() | b.to_bits());
            }
            a.min(b)
        }

        fn $max(a: $f, b: $f) -> $f {
            if a.is_nan() || b.is_nan() {
                return <$f>::NAN;
            }
            if a == b {
                return <$f>::from_bits(a.to_bits() & b.to_bits());
            }
            a.max(b)
        }
    };
}

float_ops!(f32_unary, f32_binary, f32_compare, f32_min, f32_max, f32, u32);
float_ops!(f64_unary, f64_binary, f64_compare, f64_min, f64_max, f64, u64);

fn trunc_checked(x: f64, lower_exclusive: f64, upper_exclusive: f64) -> Result<f64> {
    if x.is_nan() {
        return Err(Error::trap_invalid_conversion());
    }
    let t = x.trunc();
    if t > lower_exclusive && t < upper_exclusive {
        Ok(t)
    } else {
        Err(Error::trap_integer_overflow())
    }
}

fn trunc_i32_s(x: f64) -> Result<u64> {
    let t = trunc_checked(x, -2_147_483_649.0, 2_147_483_648.0)?;
    Ok(t as i32 as i64 as u64)
}

fn trunc_i32_u(x: f64) -> Result<u64> {
    let t = trunc_checked(x, -1.0, 4_294_967_296.0)?;
    Ok(t as u32 as i32 as i64 as u64)
}

fn trunc_i64_s(x: f64) -> Result<u64> {
    // 2^63 is exactly representable; -2^63 itself is in range
    if x.trunc() == -9_223_372_036_854_775_808.0 {
        return Ok(i64::MIN as u64);
    }
    let t = trunc_checked(x, -9_223_372_036_854_775_808.0, 9_223_372_036_854_775_808.0)?;
    Ok(t as i64 as u64)
}

fn trunc_i64_u(x: f64) -> Result<u64> {
    let t = trunc_checked(x, -1.0, 18_446_744_073_709_551_616.0)?;
    Ok(t as u64)
}

/// Apply a conversion to a raw slot, producing a raw slot
pub fn convert(op: ConversionOp, raw: u64) -> Result<u64> {
    let as_f32 = || f32::from_bits(raw as u32);
    let as_f64 = || f64::from_bits(raw);
    let from_i32 = |v: i32| v as i64 as u64;
    Ok(match op {
        ConversionOp::I32WrapI64 => from_i32(raw as i32),
        ConversionOp::I32TruncF32S => trunc_i32_s(f64::from(as_f32()))?,
        ConversionOp::I32TruncF32U => trunc_i32_u(f64::from(as_f32()))?,
        ConversionOp::I32TruncF64S => trunc_i32_s(as_f64())?,
        ConversionOp::I32TruncF64U => trunc_i32_u(as_f64())?,
        ConversionOp::I64ExtendI32S => raw as i32 as i64 as u64,
        ConversionOp::I64ExtendI32U => u64::from(raw as u32),
        ConversionOp::I64TruncF32S => trunc_i64_s(f64::from(as_f32()))?,
        ConversionOp::I64TruncF32U => trunc_i64_u(f64::from(as_f32()))?,
        ConversionOp::I64TruncF64S => trunc_i64_s(as_f64())?,
        ConversionOp::I64TruncF64U => trunc_i64_u(as_f64())?,
        ConversionOp::F32ConvertI32S => u64::from((raw as i32 as f32).to_bits()),
        ConversionOp::F32ConvertI32U => u64::from((raw as u32 as f32).to_bits()),
        ConversionOp::F32ConvertI64S => u64::from((raw as i64 as f32).to_bits()),
        ConversionOp::F32ConvertI64U => u64::from((raw as f32).to_bits()),
        ConversionOp::F32DemoteF64 => u64::from((as_f64() as f32).to_bits()),
        ConversionOp::F64ConvertI32S => (f64::from(raw as i32)).to_bits(),
        ConversionOp::F64ConvertI32U => (f64::from(raw as u32)).to_bits(),
        ConversionOp::F64ConvertI64S => (raw as i64 as f64).to_bits(),
        ConversionOp::F64ConvertI64U => (raw as f64).to_bits(),
        ConversionOp::F64PromoteF32 => f64::from(as_f32()).to_bits(),
        ConversionOp::I32ReinterpretF32 => from_i32(raw as u32 as i32),
        ConversionOp::I64ReinterpretF64 => raw,
        ConversionOp::F32ReinterpretI32 => u64::from(raw as u32),
        ConversionOp::F64ReinterpretI64 => raw,
    })
}
