// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Error codes for Duet
//!
//! Codes are grouped in ranges of one thousand per concern so that a code
//! alone identifies the subsystem that raised it.

// Core error codes (1000-1999)
/// Stack underflow error
pub const STACK_UNDERFLOW: u16 = 1000;
/// General execution error
pub const EXECUTION_ERROR: u16 = 1001;
/// Type mismatch error
pub const TYPE_MISMATCH: u16 = 1002;
/// Out of bounds error
pub const OUT_OF_BOUNDS_ERROR: u16 = 1003;
/// Execution was interrupted by the host
pub const EXECUTION_INTERRUPTED: u16 = 1004;
/// Poisoned lock error
pub const POISONED_LOCK: u16 = 1005;
/// Feature not supported
pub const UNSUPPORTED_OPERATION: u16 = 1006;
/// Malformed function body (unbalanced blocks, bad branch depth)
pub const MALFORMED_BODY: u16 = 1007;

// Function and dispatch error codes (2000-2999)
/// Invalid function index error
pub const INVALID_FUNCTION_INDEX: u16 = 2000;
/// A function index was invoked that no adapter was registered for
pub const UNREGISTERED_FUNCTION: u16 = 2001;
/// A function index was registered twice
pub const DUPLICATE_REGISTRATION: u16 = 2002;
/// Native entry point signature disagrees with its declared function type
pub const ENTRY_POINT_SIGNATURE_MISMATCH: u16 = 2003;
/// Export not found
pub const EXPORT_NOT_FOUND: u16 = 2004;
/// Export exists but is not a function
pub const EXPORT_NOT_A_FUNCTION: u16 = 2005;
/// Invalid type index
pub const INVALID_TYPE_INDEX: u16 = 2006;

// Resource error codes (3000-3999)
/// Resource limit exceeded error
pub const RESOURCE_LIMIT_EXCEEDED: u16 = 3000;
/// Global not found
pub const GLOBAL_NOT_FOUND: u16 = 3001;
/// Memory not found
pub const MEMORY_NOT_FOUND: u16 = 3002;
/// Table not found
pub const TABLE_NOT_FOUND: u16 = 3003;
/// Immutable global written
pub const GLOBAL_IMMUTABLE: u16 = 3004;

// Trap codes (4000-4999)
/// `unreachable` executed
pub const TRAP_UNREACHABLE: u16 = 4000;
/// Out of bounds memory access
pub const TRAP_OUT_OF_BOUNDS_MEMORY: u16 = 4001;
/// Integer division by zero
pub const TRAP_INTEGER_DIVIDE_BY_ZERO: u16 = 4002;
/// Integer overflow
pub const TRAP_INTEGER_OVERFLOW: u16 = 4003;
/// Invalid conversion to integer
pub const TRAP_INVALID_CONVERSION: u16 = 4004;
/// Call stack exhausted
pub const TRAP_CALL_STACK_EXHAUSTED: u16 = 4005;
/// Indirect call type mismatch
pub const TRAP_INDIRECT_CALL_TYPE_MISMATCH: u16 = 4006;
/// Table slot holds a null reference
pub const TRAP_UNINITIALIZED_ELEMENT: u16 = 4007;
/// Table index outside the table
pub const TRAP_UNDEFINED_ELEMENT: u16 = 4008;
/// Arguments do not match the callee's parameter kinds
pub const TRAP_ARGUMENT_MISMATCH: u16 = 4009;
/// Host function returned results that disagree with its type
pub const TRAP_RESULT_MISMATCH: u16 = 4010;

// Validation and linking error codes (5000-5999)
/// Validation error
pub const VALIDATION_ERROR: u16 = 5000;
/// Import could not be resolved
pub const LINK_UNKNOWN_IMPORT: u16 = 5001;
/// Import resolved to an entity of the wrong type
pub const LINK_INCOMPATIBLE_IMPORT: u16 = 5002;
/// Data or element segment does not fit
pub const SEGMENT_OUT_OF_BOUNDS: u16 = 5003;
/// Invalid configuration value
pub const INVALID_CONFIGURATION: u16 = 5004;
