// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The interpreting machine.
//!
//! Executes decoded instruction sequences directly. Calls between
//! interpreted functions of one instance stay on the executor's frame
//! stack; every other call (an import, a native entry point, a function of
//! another instance) leaves the interpreter through [`Instance::call`].

pub mod control;
mod executor;
pub mod instruction;
pub mod numeric;

use std::sync::Arc;

use duet_error::{Error, Result};
use duet_foundation::Value;

use self::executor::Executor;
use crate::{
    adapter::kinds_match,
    instance::Instance,
    machine::{ExecutionStrategy, Machine},
};

/// Machine executing function bodies by interpretation
#[derive(Debug, Default, Clone, Copy)]
pub struct InterpreterMachine;

impl InterpreterMachine {
    /// Create an interpreter
    pub const fn new() -> Self {
        Self
    }
}

impl Machine for InterpreterMachine {
    fn call(&self, instance: &Arc<Instance>, func_index: u32, args: &[Value]) -> Result<Vec<Value>> {
        let module = instance.module();
        if module.is_import(func_index) {
            return instance.call_host(func_index, args);
        }
        let ty = module.func_type(func_index)?;
        let body = module.body(func_index)?.ok_or(Error::runtime_unsupported_operation(
            "Function has no body to interpret",
        ))?;
        if !kinds_match(args, ty.params()) {
            return Err(Error::trap_argument_mismatch());
        }
        Executor::new(instance, ty, body, args).run()
    }

    fn interprets(&self, _func_index: u32) -> bool {
        true
    }

    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Interpreter
    }
}
