// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! The ahead-of-time machine.
//!
//! A [`CompiledModule`] pairs a module with a [`DispatchRegistry`] holding
//! one adapter per function index: the native entry point of a compiled
//! function, an interpreter adapter for a function that only has a body,
//! and a host trampoline for every import. The registry is complete and
//! frozen before any instance exists.

use std::sync::Arc;

use duet_error::{Error, Result};
use duet_foundation::Value;
use tracing::debug;

use crate::{
    adapter::{Adapter, IntoAdapter},
    context::ExecutionContext,
    instance::Instance,
    interpreter::InterpreterMachine,
    machine::{ExecutionStrategy, Machine},
    module::Module,
    registry::{DispatchRegistry, DispatchRegistryBuilder},
};

/// A module with its native entry points
#[derive(Debug)]
pub struct CompiledModule {
    module:      Arc<Module>,
    registry:    DispatchRegistry,
    interpreted: Vec<bool>,
}

impl CompiledModule {
    /// Start registering entry points for `module`
    pub fn builder(module: Arc<Module>) -> CompiledModuleBuilder {
        let registry = DispatchRegistry::builder(module.function_count());
        CompiledModuleBuilder { module, registry }
    }

    /// The module
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// The dispatch registry
    pub fn registry(&self) -> &DispatchRegistry {
        &self.registry
    }

    /// Whether `func_index` falls back to the interpreter
    pub fn is_interpreted(&self, func_index: u32) -> bool {
        self.interpreted
            .get(func_index as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Machine dispatching through this module's registry
    pub fn machine(self: &Arc<Self>) -> Arc<AotMachine> {
        Arc::new(AotMachine::new(Arc::clone(self)))
    }
}

/// Builder for [`CompiledModule`]
#[derive(Debug)]
pub struct CompiledModuleBuilder {
    module:   Arc<Module>,
    registry: DispatchRegistryBuilder,
}

impl CompiledModuleBuilder {
    /// Register the typed native entry point of defined function `func_index`.
    ///
    /// The closure's signature must equal the function's declared type.
    pub fn function<P, R, F>(mut self, func_index: u32, entry_point: F) -> Result<Self>
    where
        F: IntoAdapter<P, R>,
    {
        self.check_defined(func_index)?;
        let adapter = Adapter::new(self.module.func_type(func_index)?, entry_point)?;
        self.registry.register(func_index, adapter)?;
        Ok(self)
    }

    /// Register a boxed entry point for defined function `func_index`
    pub fn dynamic_function<F>(mut self, func_index: u32, entry_point: F) -> Result<Self>
    where
        F: Fn(&[Value], &ExecutionContext) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.check_defined(func_index)?;
        let ty = self.module.func_type(func_index)?.clone();
        self.registry.register(func_index, Adapter::dynamic(ty, entry_point))?;
        Ok(self)
    }

    fn check_defined(&self, func_index: u32) -> Result<()> {
        if self.module.is_import(func_index) {
            return Err(Error::validation_error(
                "Imported functions are dispatched through host trampolines",
            ));
        }
        Ok(())
    }

    /// Add trampolines for imports, interpreter adapters for functions
    /// without an entry point, and freeze the registry.
    ///
    /// Fails if a defined function has neither an entry point nor a body.
    pub fn build(mut self) -> Result<Arc<CompiledModule>> {
        for import_index in 0..self.module.import_count() {
            let ty = self.module.func_type(import_index)?.clone();
            let trampoline = Adapter::dynamic(ty, move |args, ctx| {
                ctx.instance().call_host(import_index, args)
            });
            self.registry.register(import_index, trampoline)?;
        }

        let mut interpreted = vec![false; self.module.function_count() as usize];
        for func_index in self.module.import_count()..self.module.function_count() {
            if self.registry.is_registered(func_index) || self.module.body(func_index)?.is_none() {
                continue;
            }
            let ty = self.module.func_type(func_index)?.clone();
            let fallback = Adapter::dynamic(ty, move |args, ctx| {
                InterpreterMachine::new().call(ctx.instance(), func_index, args)
            });
            self.registry.register(func_index, fallback)?;
            interpreted[func_index as usize] = true;
        }

        let registry = self.registry.build();
        if let Some(missing) = registry.missing().next() {
            debug!(func_index = missing, "function without entry point or body");
            return Err(Error::unregistered_function());
        }
        debug!(
            functions = registry.len(),
            imports = self.module.import_count(),
            interpreted = interpreted.iter().filter(|flag| **flag).count(),
            "dispatch registry built"
        );
        Ok(Arc::new(CompiledModule {
            module: self.module,
            registry,
            interpreted,
        }))
    }
}

/// Machine calling precompiled entry points
#[derive(Debug, Clone)]
pub struct AotMachine {
    compiled: Arc<CompiledModule>,
}

impl AotMachine {
    /// Machine for `compiled`
    pub fn new(compiled: Arc<CompiledModule>) -> Self {
        Self { compiled }
    }

    /// The compiled module this machine dispatches into
    pub fn compiled(&self) -> &Arc<CompiledModule> {
        &self.compiled
    }
}

impl Machine for AotMachine {
    #[inline]
    fn call(&self, instance: &Arc<Instance>, func_index: u32, args: &[Value]) -> Result<Vec<Value>> {
        self.compiled.registry.get(func_index)?.invoke(instance, args)
    }

    fn interprets(&self, func_index: u32) -> bool {
        self.compiled.is_interpreted(func_index)
    }

    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Aot
    }
}
