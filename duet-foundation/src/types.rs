// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! WebAssembly type definitions consumed by the invocation layer.
//!
//! These are produced by a decoder (or by hand through the module builder)
//! and are read-only afterwards.

use alloc::vec::Vec;
use core::fmt::{self, Display};

use duet_error::{Error, Result};

/// WebAssembly value types
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// 32-bit integer
    #[default]
    I32,
    /// 64-bit integer
    I64,
    /// 32-bit floating point
    F32,
    /// 64-bit floating point
    F64,
    /// Function reference
    FuncRef,
    /// External reference
    ExternRef,
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::FuncRef => "funcref",
            Self::ExternRef => "externref",
        };
        f.write_str(name)
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ValueType {
    /// Create a value type from its binary representation
    pub fn from_binary(byte: u8) -> Result<Self> {
        match byte {
            0x7F => Ok(ValueType::I32),
            0x7E => Ok(ValueType::I64),
            0x7D => Ok(ValueType::F32),
            0x7C => Ok(ValueType::F64),
            0x70 => Ok(ValueType::FuncRef),
            0x6F => Ok(ValueType::ExternRef),
            _ => Err(Error::validation_error("Invalid value type byte")),
        }
    }

    /// Convert to the WebAssembly binary format value
    #[must_use]
    pub const fn to_binary(self) -> u8 {
        match self {
            ValueType::I32 => 0x7F,
            ValueType::I64 => 0x7E,
            ValueType::F32 => 0x7D,
            ValueType::F64 => 0x7C,
            ValueType::FuncRef => 0x70,
            ValueType::ExternRef => 0x6F,
        }
    }

    /// Whether this is a reference type
    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::FuncRef | Self::ExternRef)
    }

    /// Get the size of this value type in linear memory, in bytes
    #[must_use]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
            Self::FuncRef | Self::ExternRef => core::mem::size_of::<u32>(),
        }
    }
}

/// Function signature: ordered parameter kinds and ordered result kinds.
///
/// Compared structurally. Two indices with equal parameter and result lists
/// have the same type regardless of which type index declared them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FuncType {
    params:  Vec<ValueType>,
    results: Vec<ValueType>,
}

impl FuncType {
    /// Create a new function type
    pub fn new(
        params: impl IntoIterator<Item = ValueType>,
        results: impl IntoIterator<Item = ValueType>,
    ) -> Self {
        Self {
            params:  params.into_iter().collect(),
            results: results.into_iter().collect(),
        }
    }

    /// Parameter kinds in order
    #[must_use]
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Result kinds in order
    #[must_use]
    pub fn results(&self) -> &[ValueType] {
        &self.results
    }
}

impl Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        f.write_str(") -> ")?;
        match self.results.as_slice() {
            [] => f.write_str("()"),
            [single] => write!(f, "{single}"),
            many => {
                f.write_str("(")?;
                for (i, result) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{result}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Represents the size limits of a table or memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Limits {
    /// Initial size
    pub min: u32,
    /// Optional maximum size
    pub max: Option<u32>,
}

impl Limits {
    /// Create new limits
    #[must_use]
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Whether `self` may stand in for an import declared with `required`
    #[must_use]
    pub fn is_subtype_of(&self, required: &Limits) -> bool {
        if self.min < required.min {
            return false;
        }
        match (self.max, required.max) {
            (_, None) => true,
            (Some(actual), Some(req)) => actual <= req,
            (None, Some(_)) => false,
        }
    }
}

/// Linear memory type, in 64 KiB pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MemoryType {
    /// Page limits
    pub limits: Limits,
}

impl MemoryType {
    /// Create a memory type from page limits
    #[must_use]
    pub const fn new(min: u32, max: Option<u32>) -> Self {
        Self {
            limits: Limits::new(min, max),
        }
    }
}

/// Table type; tables always hold function references here
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableType {
    /// Element type
    pub element_type: ValueType,
    /// Slot limits
    pub limits:       Limits,
}

impl TableType {
    /// Create a funcref table type
    #[must_use]
    pub const fn funcref(min: u32, max: Option<u32>) -> Self {
        Self {
            element_type: ValueType::FuncRef,
            limits:       Limits::new(min, max),
        }
    }
}

/// Global type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalType {
    /// Type of the stored value
    pub value_type: ValueType,
    /// Whether `global.set` is allowed
    pub mutable:    bool,
}

impl GlobalType {
    /// Create a global type
    #[must_use]
    pub const fn new(value_type: ValueType, mutable: bool) -> Self {
        Self {
            value_type,
            mutable,
        }
    }
}
