// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Module instances.
//!
//! An [`Instance`] owns the runtime state of one instantiation: memory,
//! globals, the table and resolved imports. It is shared behind an `Arc`
//! by every call against it and routes calls to its [`Machine`] without
//! knowing which strategy that machine implements.

use std::{
    cell::Cell,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use duet_error::{Error, Result};
use duet_foundation::{FuncType, NativeParams, NativeResults, Value};
use tracing::{debug, trace, warn};

use crate::{
    config::EngineConfig,
    global::Global,
    host::{HostFunction, Imports},
    interpreter::InterpreterMachine,
    machine::{ExecutionStrategy, Machine},
    memory::Memory,
    module::{Export, Module},
    table::Table,
};

thread_local! {
    static CALL_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Tracks nesting of calls on the current thread.
///
/// Held for the lifetime of one call frame, native or interpreted.
pub(crate) struct CallDepthGuard;

impl CallDepthGuard {
    fn enter(limit: u32) -> Result<Self> {
        CALL_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= limit {
                return Err(Error::trap_call_stack_exhausted());
            }
            depth.set(current + 1);
            Ok(CallDepthGuard)
        })
    }
}

impl Drop for CallDepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Requests that running code on an instance stop at the next check
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Request interruption; the next call boundary or loop back-edge
    /// raises an interrupted error
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// A module instance
pub struct Instance {
    module:    Arc<Module>,
    machine:   Arc<dyn Machine>,
    config:    EngineConfig,
    imports:   Vec<HostFunction>,
    memory:    Option<Arc<Memory>>,
    globals:   Vec<Global>,
    table:     Option<Table>,
    interrupt: Arc<AtomicBool>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("functions", &self.module.function_count())
            .field("strategy", &self.machine.strategy())
            .field("has_memory", &self.memory.is_some())
            .field("globals", &self.globals.len())
            .finish_non_exhaustive()
    }
}

impl Instance {
    /// Start instantiating `module`
    pub fn builder(module: Arc<Module>) -> InstanceBuilder {
        InstanceBuilder {
            module,
            machine: None,
            imports: Imports::default(),
            config: EngineConfig::default(),
        }
    }

    /// Call a function by index.
    ///
    /// Every call, from the host, a native entry point, the interpreter or
    /// a trampoline, comes through here. Applies the depth limit and the
    /// interrupt check, then dispatches to the machine.
    pub fn call(self: &Arc<Self>, func_index: u32, args: &[Value]) -> Result<Vec<Value>> {
        let _depth = self.enter_call()?;
        trace!(func_index, strategy = %self.machine.strategy(), "call");
        self.machine.call(self, func_index, args)
    }

    /// Invoke the resolved import at `func_index`
    pub fn call_host(self: &Arc<Self>, func_index: u32, args: &[Value]) -> Result<Vec<Value>> {
        let host = self
            .imports
            .get(func_index as usize)
            .ok_or(Error::runtime_function_not_found("Not an imported function"))?;
        trace!(func_index, module = host.module(), name = host.name(), "host call");
        host.call(self, args)
    }

    /// Exported function by name
    pub fn export(self: &Arc<Self>, name: &str) -> Result<ExportFunction> {
        match self.module.export(name) {
            Some(Export::Function(index)) => Ok(ExportFunction {
                instance: Arc::clone(self),
                index,
                ty: self.module.func_type(index)?.clone(),
            }),
            Some(_) => Err(Error::export_not_a_function()),
            None => Err(Error::export_not_found()),
        }
    }

    /// Exported global by name
    pub fn exported_global(&self, name: &str) -> Result<&Global> {
        match self.module.export(name) {
            Some(Export::Global(index)) => self.global(index),
            Some(_) => Err(Error::runtime_type_mismatch("Export is not a global")),
            None => Err(Error::export_not_found()),
        }
    }

    /// Exported memory by name
    pub fn exported_memory(&self, name: &str) -> Result<Arc<Memory>> {
        match self.module.export(name) {
            Some(Export::Memory) => self
                .memory()
                .ok_or(Error::memory_not_found("Instance has no memory")),
            Some(_) => Err(Error::runtime_type_mismatch("Export is not a memory")),
            None => Err(Error::export_not_found()),
        }
    }

    /// Exported table by name
    pub fn exported_table(&self, name: &str) -> Result<&Table> {
        match self.module.export(name) {
            Some(Export::Table) => self.table(),
            Some(_) => Err(Error::runtime_type_mismatch("Export is not a table")),
            None => Err(Error::export_not_found()),
        }
    }

    /// Current memory handle, fetched anew by every call
    pub fn memory(&self) -> Option<Arc<Memory>> {
        self.memory.clone()
    }

    /// Global by index
    pub fn global(&self, global_index: u32) -> Result<&Global> {
        self.globals
            .get(global_index as usize)
            .ok_or(Error::global_not_found("Global index out of range"))
    }

    /// The table
    pub fn table(&self) -> Result<&Table> {
        self.table
            .as_ref()
            .ok_or(Error::table_not_found("Instance has no table"))
    }

    /// The module this instance was created from
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Type of a function of this instance
    pub fn func_type(&self, func_index: u32) -> Result<&FuncType> {
        self.module.func_type(func_index)
    }

    /// Strategy of the backing machine
    pub fn strategy(&self) -> ExecutionStrategy {
        self.machine.strategy()
    }

    /// Engine limits this instance was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle for interrupting running code from another thread
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle {
            flag: Arc::clone(&self.interrupt),
        }
    }

    /// Interrupt check and depth slot for a new call frame
    pub(crate) fn enter_call(&self) -> Result<CallDepthGuard> {
        self.check_interrupt()?;
        CallDepthGuard::enter(self.config.max_call_depth())
    }

    /// Whether `func_index` runs as interpreted bytecode on this instance
    pub(crate) fn interprets(&self, func_index: u32) -> bool {
        !self.module.is_import(func_index)
            && self.machine.interprets(func_index)
            && matches!(self.module.body(func_index), Ok(Some(_)))
    }

    /// Raise an interrupted error if interruption was requested.
    ///
    /// Clears the request, so later calls run normally.
    pub fn check_interrupt(&self) -> Result<()> {
        if self.config.interruptible() && self.interrupt.swap(false, Ordering::SeqCst) {
            debug!("execution interrupted");
            return Err(Error::interrupted());
        }
        Ok(())
    }
}

/// Builder for [`Instance`]
#[derive(Debug)]
pub struct InstanceBuilder {
    module:  Arc<Module>,
    machine: Option<Arc<dyn Machine>>,
    imports: Imports,
    config:  EngineConfig,
}

impl InstanceBuilder {
    /// Machine executing function bodies; the interpreter when not set
    pub fn with_machine(mut self, machine: Arc<dyn Machine>) -> Self {
        self.machine = Some(machine);
        self
    }

    /// Functions to satisfy the module's imports
    pub fn with_imports(mut self, imports: Imports) -> Self {
        self.imports = imports;
        self
    }

    /// Engine limits
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Link imports, create memory, globals and table, copy segments and run
    /// the start function
    pub fn build(self) -> Result<Arc<Instance>> {
        self.config.validate()?;
        let module = self.module;

        let imports = module
            .imports()
            .iter()
            .map(|import| {
                let host = self
                    .imports
                    .function(&import.module, &import.name)
                    .ok_or(Error::link_unknown_import("Unknown import"))?;
                if host.ty() != module.type_at(import.type_index)? {
                    warn!(
                        module = %import.module,
                        name = %import.name,
                        "import type mismatch"
                    );
                    return Err(Error::link_incompatible_import(
                        "Imported function type does not match",
                    ));
                }
                Ok(host.clone())
            })
            .collect::<Result<Vec<_>>>()?;

        let memory = module
            .memory()
            .map(|ty| Memory::new(ty, self.config.max_memory_pages()).map(Arc::new))
            .transpose()?;
        let globals = module
            .globals()
            .map(|(ty, initial)| Global::new(ty, initial))
            .collect::<Result<Vec<_>>>()?;
        let table = module.table().map(Table::new);

        if let Some(table) = &table {
            for segment in module.elements() {
                table.initialize(segment.offset, &segment.functions)?;
            }
        }
        if let Some(memory) = &memory {
            for segment in module.data() {
                let fits = u64::from(segment.offset) + segment.bytes.len() as u64
                    <= memory.size_in_bytes()? as u64;
                if !fits {
                    return Err(Error::segment_out_of_bounds(
                        "Data segment does not fit the memory",
                    ));
                }
                memory.write(u64::from(segment.offset), &segment.bytes)?;
            }
        }

        let machine = self
            .machine
            .unwrap_or_else(|| Arc::new(InterpreterMachine::new()));
        let instance = Arc::new(Instance {
            module,
            machine,
            config: self.config,
            imports,
            memory,
            globals,
            table,
            interrupt: Arc::new(AtomicBool::new(false)),
        });
        debug!(
            strategy = %instance.strategy(),
            functions = instance.module.function_count(),
            "instantiated"
        );

        if let Some(start) = instance.module.start() {
            instance.call(start, &[])?;
        }
        Ok(instance)
    }
}

/// An exported function bound to its instance
#[derive(Debug, Clone)]
pub struct ExportFunction {
    instance: Arc<Instance>,
    index:    u32,
    ty:       FuncType,
}

impl ExportFunction {
    /// Function index within the instance
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Function type
    pub fn ty(&self) -> &FuncType {
        &self.ty
    }

    /// The owning instance
    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// Call with boxed values
    pub fn call(&self, args: &[Value]) -> Result<Vec<Value>> {
        self.instance.call(self.index, args).inspect_err(|err| {
            if err.is_trap() {
                warn!(func_index = self.index, error = %err, "trap at export boundary");
            }
        })
    }

    /// Call with native values.
    ///
    /// `P` and `R` must describe exactly the export's type.
    pub fn call_native<P, R>(&self, params: P) -> Result<R>
    where
        P: NativeParams,
        R: NativeResults,
    {
        if P::param_types() != self.ty.params() || R::result_types() != self.ty.results() {
            return Err(Error::runtime_type_mismatch(
                "Native signature does not match the export's type",
            ));
        }
        let results = self.call(&params.into_values())?;
        R::from_values(&results).ok_or(Error::trap_result_mismatch())
    }
}
