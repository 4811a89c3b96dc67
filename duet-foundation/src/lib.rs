// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Core value and type definitions for the Duet WebAssembly engine.
//!
//! - [`ValueType`] and [`Value`]: operand kinds and tagged operands
//! - [`FuncType`]: structural function signatures
//! - [`Limits`], [`MemoryType`], [`TableType`], [`GlobalType`]
//! - [`NativeType`], [`NativeParams`], [`NativeResults`]: boxing between
//!   [`Value`] lists and native Rust types
//!
//! The crate is `no_std` with `alloc`.

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

pub mod float_repr;
pub mod marshal;
pub mod types;
pub mod values;

pub use duet_error::{codes, Error, ErrorCategory, Result};
pub use float_repr::{FloatBits32, FloatBits64};
pub use marshal::{ExternRef, FuncRef, NativeParams, NativeResults, NativeType};
pub use types::{FuncType, GlobalType, Limits, MemoryType, TableType, ValueType};
pub use values::{Value, REF_NULL_RAW};
