// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! WebAssembly operand values.
//!
//! [`Value`] is the boxed, tagged form used at every uniform call boundary.
//! Its raw form is a single `u64` slot, used by the interpreter's operand
//! stack and by globals.

use core::fmt;

use crate::{
    float_repr::{FloatBits32, FloatBits64},
    types::ValueType,
};

/// Raw slot encoding of a null reference.
pub const REF_NULL_RAW: u64 = u64::MAX;

/// A single WebAssembly operand.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// A 32-bit integer
    I32(i32),
    /// A 64-bit integer
    I64(i64),
    /// A 32-bit float, stored by its bits
    F32(FloatBits32),
    /// A 64-bit float, stored by its bits
    F64(FloatBits64),
    /// A function reference (`None` is null)
    FuncRef(Option<u32>),
    /// An external reference (`None` is null)
    ExternRef(Option<u32>),
}

impl Value {
    /// Creates a default (zero) value for the given type.
    #[must_use]
    pub const fn default_for_type(ty: ValueType) -> Self {
        match ty {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(FloatBits32(0)),
            ValueType::F64 => Value::F64(FloatBits64(0)),
            ValueType::FuncRef => Value::FuncRef(None),
            ValueType::ExternRef => Value::ExternRef(None),
        }
    }

    /// Creates an f32 value
    #[must_use]
    pub fn f32(val: f32) -> Self {
        Value::F32(FloatBits32::from_float(val))
    }

    /// Creates an f64 value
    #[must_use]
    pub fn f64(val: f64) -> Self {
        Value::F64(FloatBits64::from_float(val))
    }

    /// Returns the WebAssembly type of this value
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::I32(_) => ValueType::I32,
            Self::I64(_) => ValueType::I64,
            Self::F32(_) => ValueType::F32,
            Self::F64(_) => ValueType::F64,
            Self::FuncRef(_) => ValueType::FuncRef,
            Self::ExternRef(_) => ValueType::ExternRef,
        }
    }

    /// Checks if this value's tag equals the given type
    #[must_use]
    pub const fn matches_type(&self, ty: ValueType) -> bool {
        matches!(
            (self, ty),
            (Self::I32(_), ValueType::I32)
                | (Self::I64(_), ValueType::I64)
                | (Self::F32(_), ValueType::F32)
                | (Self::F64(_), ValueType::F64)
                | (Self::FuncRef(_), ValueType::FuncRef)
                | (Self::ExternRef(_), ValueType::ExternRef)
        )
    }

    /// Attempts to extract an i32 value if this Value is an I32.
    #[must_use]
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to extract an i64 value if this Value is an I64.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to extract an f32 value if this Value is an F32.
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(v.value()),
            _ => None,
        }
    }

    /// Attempts to extract an f64 value if this Value is an F64.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(v) => Some(v.value()),
            _ => None,
        }
    }

    /// Attempts to extract a function reference if this Value is a FuncRef.
    #[must_use]
    pub const fn as_func_ref(&self) -> Option<Option<u32>> {
        match self {
            Self::FuncRef(v) => Some(*v),
            _ => None,
        }
    }

    /// Attempts to extract an external reference if this Value is an
    /// ExternRef.
    #[must_use]
    pub const fn as_extern_ref(&self) -> Option<Option<u32>> {
        match self {
            Self::ExternRef(v) => Some(*v),
            _ => None,
        }
    }

    /// Encode into a 64-bit slot.
    ///
    /// i32 sign-extends, floats keep their bits, null references become
    /// [`REF_NULL_RAW`].
    #[must_use]
    pub const fn to_raw(&self) -> u64 {
        match *self {
            Self::I32(v) => v as i64 as u64,
            Self::I64(v) => v as u64,
            Self::F32(v) => v.0 as u64,
            Self::F64(v) => v.0,
            Self::FuncRef(Some(idx)) | Self::ExternRef(Some(idx)) => idx as u64,
            Self::FuncRef(None) | Self::ExternRef(None) => REF_NULL_RAW,
        }
    }

    /// Decode a 64-bit slot as a value of the given type.
    ///
    /// i32 truncates to the low 32 bits.
    #[must_use]
    pub const fn from_raw(ty: ValueType, raw: u64) -> Self {
        match ty {
            ValueType::I32 => Self::I32(raw as i32),
            ValueType::I64 => Self::I64(raw as i64),
            ValueType::F32 => Self::F32(FloatBits32(raw as u32)),
            ValueType::F64 => Self::F64(FloatBits64(raw)),
            ValueType::FuncRef => Self::FuncRef(raw_to_ref(raw)),
            ValueType::ExternRef => Self::ExternRef(raw_to_ref(raw)),
        }
    }
}

const fn raw_to_ref(raw: u64) -> Option<u32> {
    if raw == REF_NULL_RAW {
        None
    } else {
        Some(raw as u32)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(v) => write!(f, "i32:{v}"),
            Self::I64(v) => write!(f, "i64:{v}"),
            Self::F32(v) => write!(f, "f32:{:?}", v),
            Self::F64(v) => write!(f, "f64:{:?}", v),
            Self::FuncRef(Some(idx)) => write!(f, "funcref:{idx}"),
            Self::ExternRef(Some(idx)) => write!(f, "externref:{idx}"),
            Self::FuncRef(None) => f.write_str("funcref:null"),
            Self::ExternRef(None) => f.write_str("externref:null"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::f32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::f64(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i32_sign_extends_into_slot() {
        assert_eq!(Value::I32(-1).to_raw(), u64::MAX);
        assert_eq!(Value::from_raw(ValueType::I32, u64::MAX), Value::I32(-1));
        assert_eq!(
            Value::from_raw(ValueType::I32, 0xdead_beef_0000_0007),
            Value::I32(7)
        );
    }

    #[test]
    fn null_references_use_all_ones() {
        assert_eq!(Value::FuncRef(None).to_raw(), REF_NULL_RAW);
        assert_eq!(Value::from_raw(ValueType::FuncRef, REF_NULL_RAW), Value::FuncRef(None));
        assert_eq!(Value::from_raw(ValueType::ExternRef, 3), Value::ExternRef(Some(3)));
    }

    #[test]
    fn defaults_match_their_type() {
        for ty in [
            ValueType::I32,
            ValueType::I64,
            ValueType::F32,
            ValueType::F64,
            ValueType::FuncRef,
            ValueType::ExternRef,
        ] {
            let v = Value::default_for_type(ty);
            assert!(v.matches_type(ty));
            assert_eq!(v.value_type(), ty);
        }
    }

    #[test]
    fn accessors_respect_tag() {
        let v = Value::I64(9);
        assert_eq!(v.as_i64(), Some(9));
        assert_eq!(v.as_i32(), None);
        assert_eq!(Value::f32(1.5).as_f32(), Some(1.5));
    }
}
