// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Unified error type for Duet.
//!
//! Every failure at a call boundary, whether raised by an interpreted body, a
//! compiled entry point, a host function or the dispatch layer itself, is an
//! [`Error`]. Callers never need to know which execution strategy produced it.

use core::fmt;

use crate::codes;

/// `Error` categories for Duet operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCategory {
    /// Core engine errors
    Core           = 1,
    /// Resource errors (memory, tables, globals)
    Resource       = 3,
    /// Memory errors
    Memory         = 4,
    /// Validation and linking errors
    Validation     = 5,
    /// Type errors
    Type           = 6,
    /// Runtime errors (general)
    Runtime        = 7,
    /// Unknown errors
    Unknown        = 9,
    /// Concurrency errors
    Concurrency    = 11,
    /// WebAssembly trap errors (abnormal termination defined by Wasm)
    RuntimeTrap    = 13,
    /// Construction-time inconsistencies (registry, module layout)
    Initialization = 14,
    /// Not supported operation errors
    NotSupported   = 15,
}

/// Duet `Error` type
///
/// Categorized error with a numeric code and a static message. The type is
/// `Copy` so it crosses adapter, machine and host boundaries without
/// allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Error {
    /// `Error` category
    pub category: ErrorCategory,
    /// `Error` code
    pub code:     u16,
    /// `Error` message
    pub message:  &'static str,
}

impl Error {
    /// Create a new error.
    #[must_use]
    pub const fn new(category: ErrorCategory, code: u16, message: &'static str) -> Self {
        Self {
            category,
            code,
            message,
        }
    }

    /// Whether this error is a WebAssembly trap
    #[must_use]
    pub const fn is_trap(&self) -> bool {
        matches!(self.category, ErrorCategory::RuntimeTrap)
    }

    /// Whether this error is a validation or linking error
    #[must_use]
    pub const fn is_validation_error(&self) -> bool {
        matches!(self.category, ErrorCategory::Validation)
    }

    /// Whether this error reports a construction-time inconsistency
    #[must_use]
    pub const fn is_initialization_error(&self) -> bool {
        matches!(self.category, ErrorCategory::Initialization)
    }

    /// Whether this error is a resource error
    #[must_use]
    pub const fn is_resource_error(&self) -> bool {
        matches!(self.category, ErrorCategory::Resource)
    }

    // Factory methods

    /// Create a runtime stack underflow error
    #[must_use]
    pub const fn runtime_stack_underflow(message: &'static str) -> Self {
        Self::new(ErrorCategory::Runtime, codes::STACK_UNDERFLOW, message)
    }

    /// Create a runtime type mismatch error
    #[must_use]
    pub const fn runtime_type_mismatch(message: &'static str) -> Self {
        Self::new(ErrorCategory::Type, codes::TYPE_MISMATCH, message)
    }

    /// Create a runtime out of bounds error
    #[must_use]
    pub const fn runtime_out_of_bounds(message: &'static str) -> Self {
        Self::new(ErrorCategory::Runtime, codes::OUT_OF_BOUNDS_ERROR, message)
    }

    /// Create an error for an invalid function index
    #[must_use]
    pub const fn runtime_function_not_found(message: &'static str) -> Self {
        Self::new(ErrorCategory::Runtime, codes::INVALID_FUNCTION_INDEX, message)
    }

    /// Create an error for an unsupported operation
    #[must_use]
    pub const fn runtime_unsupported_operation(message: &'static str) -> Self {
        Self::new(
            ErrorCategory::NotSupported,
            codes::UNSUPPORTED_OPERATION,
            message,
        )
    }

    /// Execution was interrupted through an instance's interrupt handle
    #[must_use]
    pub const fn interrupted() -> Self {
        Self::new(
            ErrorCategory::Runtime,
            codes::EXECUTION_INTERRUPTED,
            "Execution interrupted",
        )
    }

    /// Create a poisoned lock error
    #[must_use]
    pub const fn poisoned_lock(message: &'static str) -> Self {
        Self::new(ErrorCategory::Concurrency, codes::POISONED_LOCK, message)
    }

    /// A function body is malformed (unbalanced blocks, bad branch depth)
    #[must_use]
    pub const fn malformed_body(message: &'static str) -> Self {
        Self::new(ErrorCategory::Validation, codes::MALFORMED_BODY, message)
    }

    /// Invoked a function index with no registered adapter.
    ///
    /// The decoder and the adapter builder disagree about the function index
    /// space. This is never retried.
    #[must_use]
    pub const fn unregistered_function() -> Self {
        Self::new(
            ErrorCategory::Initialization,
            codes::UNREGISTERED_FUNCTION,
            "No adapter registered for function index",
        )
    }

    /// A function index was registered more than once
    #[must_use]
    pub const fn duplicate_registration() -> Self {
        Self::new(
            ErrorCategory::Initialization,
            codes::DUPLICATE_REGISTRATION,
            "Function index registered twice",
        )
    }

    /// Native entry point signature disagrees with the declared function type
    #[must_use]
    pub const fn entry_point_signature_mismatch(message: &'static str) -> Self {
        Self::new(
            ErrorCategory::Validation,
            codes::ENTRY_POINT_SIGNATURE_MISMATCH,
            message,
        )
    }

    /// Create a validation error
    #[must_use]
    pub const fn validation_error(message: &'static str) -> Self {
        Self::new(ErrorCategory::Validation, codes::VALIDATION_ERROR, message)
    }

    /// Create an invalid type index error
    #[must_use]
    pub const fn validation_invalid_type_index(message: &'static str) -> Self {
        Self::new(ErrorCategory::Validation, codes::INVALID_TYPE_INDEX, message)
    }

    /// Create an invalid configuration error
    #[must_use]
    pub const fn invalid_configuration(message: &'static str) -> Self {
        Self::new(
            ErrorCategory::Validation,
            codes::INVALID_CONFIGURATION,
            message,
        )
    }

    /// Import could not be resolved
    #[must_use]
    pub const fn link_unknown_import(message: &'static str) -> Self {
        Self::new(ErrorCategory::Validation, codes::LINK_UNKNOWN_IMPORT, message)
    }

    /// Import resolved to something of the wrong type
    #[must_use]
    pub const fn link_incompatible_import(message: &'static str) -> Self {
        Self::new(
            ErrorCategory::Validation,
            codes::LINK_INCOMPATIBLE_IMPORT,
            message,
        )
    }

    /// Data or element segment does not fit its target
    #[must_use]
    pub const fn segment_out_of_bounds(message: &'static str) -> Self {
        Self::new(
            ErrorCategory::Validation,
            codes::SEGMENT_OUT_OF_BOUNDS,
            message,
        )
    }

    /// Export not found
    #[must_use]
    pub const fn export_not_found() -> Self {
        Self::new(
            ErrorCategory::Runtime,
            codes::EXPORT_NOT_FOUND,
            "Export not found",
        )
    }

    /// Export is not a function
    #[must_use]
    pub const fn export_not_a_function() -> Self {
        Self::new(
            ErrorCategory::Type,
            codes::EXPORT_NOT_A_FUNCTION,
            "Export is not a function",
        )
    }

    /// Create a resource limit exceeded error
    #[must_use]
    pub const fn resource_limit_exceeded(message: &'static str) -> Self {
        Self::new(
            ErrorCategory::Resource,
            codes::RESOURCE_LIMIT_EXCEEDED,
            message,
        )
    }

    /// Create a memory not found error
    #[must_use]
    pub const fn memory_not_found(message: &'static str) -> Self {
        Self::new(ErrorCategory::Resource, codes::MEMORY_NOT_FOUND, message)
    }

    /// Create a table not found error
    #[must_use]
    pub const fn table_not_found(message: &'static str) -> Self {
        Self::new(ErrorCategory::Resource, codes::TABLE_NOT_FOUND, message)
    }

    /// Create a global not found error
    #[must_use]
    pub const fn global_not_found(message: &'static str) -> Self {
        Self::new(ErrorCategory::Resource, codes::GLOBAL_NOT_FOUND, message)
    }

    /// Attempted to write an immutable global
    #[must_use]
    pub const fn global_immutable() -> Self {
        Self::new(
            ErrorCategory::Validation,
            codes::GLOBAL_IMMUTABLE,
            "Cannot modify immutable global",
        )
    }

    // Traps

    /// `unreachable` was executed
    #[must_use]
    pub const fn trap_unreachable() -> Self {
        Self::new(
            ErrorCategory::RuntimeTrap,
            codes::TRAP_UNREACHABLE,
            "Trapped on unreachable instruction",
        )
    }

    /// Out of bounds memory access
    #[must_use]
    pub const fn trap_out_of_bounds_memory() -> Self {
        Self::new(
            ErrorCategory::RuntimeTrap,
            codes::TRAP_OUT_OF_BOUNDS_MEMORY,
            "out of bounds memory access",
        )
    }

    /// Integer division or remainder by zero
    #[must_use]
    pub const fn trap_integer_divide_by_zero() -> Self {
        Self::new(
            ErrorCategory::RuntimeTrap,
            codes::TRAP_INTEGER_DIVIDE_BY_ZERO,
            "integer divide by zero",
        )
    }

    /// Signed integer overflow in division
    #[must_use]
    pub const fn trap_integer_overflow() -> Self {
        Self::new(
            ErrorCategory::RuntimeTrap,
            codes::TRAP_INTEGER_OVERFLOW,
            "integer overflow",
        )
    }

    /// Float to integer truncation of NaN or out of range value
    #[must_use]
    pub const fn trap_invalid_conversion() -> Self {
        Self::new(
            ErrorCategory::RuntimeTrap,
            codes::TRAP_INVALID_CONVERSION,
            "invalid conversion to integer",
        )
    }

    /// Nested calls exceeded the configured depth
    #[must_use]
    pub const fn trap_call_stack_exhausted() -> Self {
        Self::new(
            ErrorCategory::RuntimeTrap,
            codes::TRAP_CALL_STACK_EXHAUSTED,
            "call stack exhausted",
        )
    }

    /// `call_indirect` target type disagrees with the expected type
    #[must_use]
    pub const fn trap_indirect_call_type_mismatch() -> Self {
        Self::new(
            ErrorCategory::RuntimeTrap,
            codes::TRAP_INDIRECT_CALL_TYPE_MISMATCH,
            "indirect call type mismatch",
        )
    }

    /// Table slot holds a null reference
    #[must_use]
    pub const fn trap_uninitialized_element() -> Self {
        Self::new(
            ErrorCategory::RuntimeTrap,
            codes::TRAP_UNINITIALIZED_ELEMENT,
            "uninitialized element",
        )
    }

    /// Table index outside the table
    #[must_use]
    pub const fn trap_undefined_element() -> Self {
        Self::new(
            ErrorCategory::RuntimeTrap,
            codes::TRAP_UNDEFINED_ELEMENT,
            "undefined element",
        )
    }

    /// Argument list disagrees with the callee's parameter kinds
    #[must_use]
    pub const fn trap_argument_mismatch() -> Self {
        Self::new(
            ErrorCategory::RuntimeTrap,
            codes::TRAP_ARGUMENT_MISMATCH,
            "argument arity or kind mismatch",
        )
    }

    /// Result list disagrees with the callee's result kinds
    #[must_use]
    pub const fn trap_result_mismatch() -> Self {
        Self::new(
            ErrorCategory::RuntimeTrap,
            codes::TRAP_RESULT_MISMATCH,
            "result arity or kind mismatch",
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}][E{:04X}] {}",
            self.category, self.code, self.message
        )
    }
}

impl From<core::fmt::Error> for Error {
    fn from(_: core::fmt::Error) -> Self {
        Self::new(ErrorCategory::Unknown, codes::EXECUTION_ERROR, "Formatting error")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
