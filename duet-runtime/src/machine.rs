// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The execution strategy abstraction.

use std::{fmt, sync::Arc};

use duet_error::Result;
use duet_foundation::Value;

use crate::instance::Instance;

/// How a machine executes function bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionStrategy {
    /// Precompiled native entry points behind adapters
    Aot,
    /// Bytecode interpretation
    Interpreter,
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aot => f.write_str("aot"),
            Self::Interpreter => f.write_str("interpreter"),
        }
    }
}

/// Executes a function index against an instance.
///
/// Implementations are interchangeable: for a given module, every machine
/// returns the same results and raises the same traps for the same calls.
/// A machine holds no per-instance state.
pub trait Machine: Send + Sync + fmt::Debug {
    /// Run `func_index` with `args` on `instance`.
    ///
    /// Callers go through [`Instance::call`], which applies the depth limit
    /// and interrupt check before dispatching here.
    fn call(&self, instance: &Arc<Instance>, func_index: u32, args: &[Value]) -> Result<Vec<Value>>;

    /// Whether defined function `func_index` runs as interpreted bytecode.
    ///
    /// The interpreter uses this to keep calls between interpreted
    /// functions on its own frame stack.
    fn interprets(&self, func_index: u32) -> bool;

    /// Which strategy this machine implements
    fn strategy(&self) -> ExecutionStrategy;
}
