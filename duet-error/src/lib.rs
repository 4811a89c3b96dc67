// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Error handling for the Duet WebAssembly invocation layer.
//!
//! A single `Copy` error type carries every failure that can cross a call
//! boundary: traps, dispatch inconsistencies, linking problems and resource
//! exhaustion. The crate is `no_std` compatible.
//!
//! ```
//! use duet_error::{Error, ErrorCategory, Result};
//!
//! fn divide(a: i32, b: i32) -> Result<i32> {
//!     if b == 0 {
//!         return Err(Error::trap_integer_divide_by_zero());
//!     }
//!     Ok(a / b)
//! }
//!
//! let err = divide(1, 0).unwrap_err();
//! assert_eq!(err.category, ErrorCategory::RuntimeTrap);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codes;
pub mod errors;

pub use errors::{Error, ErrorCategory};

/// A specialized `Result` type for Duet operations.
pub type Result<T> = core::result::Result<T, Error>;
