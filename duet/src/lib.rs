// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Duet - WebAssembly engine with interchangeable machines
//!
//! A [`Module`] is instantiated on either the ahead-of-time machine or the
//! interpreter. Callers cannot tell the two apart: the same export returns
//! the same results and raises the same traps on both.
//!
//! # Example
//!
//! ```
//! use duet::prelude::*;
//!
//! # fn main() -> duet::Result<()> {
//! let mut builder = Module::builder();
//! let add = builder.declare_function(FuncType::new(
//!     [ValueType::I32, ValueType::I32],
//!     [ValueType::I32],
//! ));
//! builder.export_function("add", add);
//! let module = builder.build()?;
//!
//! let compiled = CompiledModule::builder(module.clone())
//!     .function(add, |a: i32, b: i32, _: &ExecutionContext| -> duet::Result<i32> {
//!         Ok(a.wrapping_add(b))
//!     })?
//!     .build()?;
//! let instance = Instance::builder(module)
//!     .with_machine(compiled.machine())
//!     .build()?;
//!
//! let sum = instance.export("add")?.call_native::<(i32, i32), i32>((2, 3))?;
//! assert_eq!(sum, 5);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

pub use duet_error::{codes, Error, ErrorCategory, Result};
pub use duet_foundation::{
    ExternRef, FloatBits32, FloatBits64, FuncRef, FuncType, GlobalType, Limits, MemoryType,
    NativeParams, NativeResults, NativeType, TableType, Value, ValueType,
};
pub use duet_runtime::{
    interpreter, Adapter, AotMachine, CompiledModule, CompiledModuleBuilder, DispatchRegistry,
    EngineConfig, ExecutionContext, ExecutionStrategy, Export, ExportFunction, FunctionBody,
    Global, HostFunction, Imports, Instance, InstanceBuilder, InterpreterMachine,
    InterruptHandle, IntoAdapter, Machine, Memory, Module, ModuleBuilder, Table, TableEntry,
    PAGE_SIZE,
};

/// Commonly used items
pub mod prelude {
    pub use duet_runtime::{
        interpreter::instruction::{
            BlockType, ConversionOp, FloatBinaryOp, FloatCompareOp, FloatUnaryOp, Instruction,
            IntBinaryOp, IntCompareOp, IntUnaryOp, LoadOp, MemArg, StoreOp,
        },
        CompiledModule, EngineConfig, ExecutionContext, ExecutionStrategy, ExportFunction,
        FunctionBody, HostFunction, Imports, Instance, InterpreterMachine, Machine, Module,
    };

    pub use crate::{
        Error, FuncType, GlobalType, MemoryType, Result, TableType, Value, ValueType,
    };
}

/// Instantiate `module` on the interpreter
pub fn instantiate_interpreted(
    module: Arc<Module>,
    imports: Imports,
) -> Result<Arc<Instance>> {
    Instance::builder(module).with_imports(imports).build()
}

/// Instantiate `compiled` on the ahead-of-time machine
pub fn instantiate_compiled(
    compiled: &Arc<CompiledModule>,
    imports: Imports,
) -> Result<Arc<Instance>> {
    Instance::builder(Arc::clone(compiled.module()))
        .with_machine(compiled.machine())
        .with_imports(imports)
        .build()
}
