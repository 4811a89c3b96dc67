// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Duet Runtime - invocation layer
//!
//! Instances run on a [`Machine`]: either the [`AotMachine`], which calls
//! precompiled native entry points through adapters held in a dense
//! [`DispatchRegistry`], or the [`InterpreterMachine`], which executes
//! decoded instruction bodies. Both are reached through the same
//! [`Instance::call`] path and are observationally identical for a given
//! module.
//!
//! Typed native entry points take their arguments followed by an
//! [`ExecutionContext`]; [`IntoAdapter`] wraps them into the uniform
//! boxed calling convention.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

// Re-export error types for convenience
pub use duet_error::{codes, Error, ErrorCategory, Result};
pub use duet_foundation::{
    ExternRef, FloatBits32, FloatBits64, FuncRef, FuncType, GlobalType, Limits, MemoryType,
    NativeParams, NativeResults, NativeType, TableType, Value, ValueType,
};

pub mod adapter;
pub mod aot;
pub mod call;
pub mod config;
pub mod context;
pub mod global;
pub mod host;
pub mod instance;
pub mod interpreter;
pub mod machine;
pub mod memory;
pub mod module;
pub mod registry;
pub mod table;

pub use adapter::{Adapter, IntoAdapter};
pub use aot::{AotMachine, CompiledModule, CompiledModuleBuilder};
pub use config::EngineConfig;
pub use context::ExecutionContext;
pub use global::Global;
pub use host::{HostFunction, Imports};
pub use instance::{ExportFunction, Instance, InstanceBuilder, InterruptHandle};
pub use interpreter::{
    instruction::{BlockType, Instruction, MemArg},
    InterpreterMachine,
};
pub use machine::{ExecutionStrategy, Machine};
pub use memory::{Memory, PAGE_SIZE};
pub use module::{Export, FunctionBody, Module, ModuleBuilder};
pub use registry::DispatchRegistry;
pub use table::{Table, TableEntry};
