// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The execution context handed to every entry point.

use std::sync::Arc;

use duet_error::{Error, Result};
use duet_foundation::{FuncType, Value};

use crate::{call, instance::Instance, memory::Memory};

/// Instance and memory handle for one call.
///
/// Built fresh for every call so the memory handle is never stale. Passed
/// explicitly as the trailing parameter of native entry points; several
/// instances of one module can run concurrently without shared state.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    instance: Arc<Instance>,
    memory:   Option<Arc<Memory>>,
}

impl ExecutionContext {
    /// Context for a call on `instance`
    pub fn new(instance: &Arc<Instance>) -> Self {
        Self {
            instance: Arc::clone(instance),
            memory:   instance.memory(),
        }
    }

    /// The running instance
    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// The instance's memory
    pub fn memory(&self) -> Result<&Memory> {
        self.memory
            .as_deref()
            .ok_or(Error::memory_not_found("Instance has no memory"))
    }

    /// Call a function of the running instance
    pub fn call(&self, func_index: u32, args: &[Value]) -> Result<Vec<Value>> {
        self.instance.call(func_index, args)
    }

    /// Call through the running instance's table, expecting `expected`
    pub fn call_indirect(
        &self,
        expected: &FuncType,
        element: u32,
        args: &[Value],
    ) -> Result<Vec<Value>> {
        call::call_indirect(&self.instance, expected, element, args)
    }

    /// Read a global
    pub fn global(&self, global_index: u32) -> Result<Value> {
        self.instance.global(global_index)?.get()
    }

    /// Write a mutable global
    pub fn set_global(&self, global_index: u32, value: Value) -> Result<()> {
        self.instance.global(global_index)?.set(value)
    }
}
