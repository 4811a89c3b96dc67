// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Decoded module description.
//!
//! A [`Module`] is what a decoder hands to this layer: the function type of
//! every index (imports first), interpretable bodies, the memory, table and
//! globals to create, segments to copy in, exports and the start function.
//! It is immutable once built and shared by every instance and machine.

use std::{collections::HashMap, sync::Arc};

use duet_error::{Error, Result};
use duet_foundation::{FuncType, GlobalType, MemoryType, TableType, Value, ValueType};
use tracing::debug;

use crate::interpreter::{
    control::{self, ControlMap},
    instruction::Instruction,
};

/// Locals and code of one function
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionBody {
    /// Declared locals, after the parameters
    pub locals: Vec<ValueType>,
    /// Instructions, terminated by the function's `End`
    pub code:   Vec<Instruction>,
}

impl FunctionBody {
    /// Body with no extra locals
    pub fn new(code: Vec<Instruction>) -> Self {
        Self {
            locals: Vec::new(),
            code,
        }
    }

    /// Body with extra locals
    pub fn with_locals(locals: Vec<ValueType>, code: Vec<Instruction>) -> Self {
        Self { locals, code }
    }
}

/// A function body with its pre-computed control map
#[derive(Debug, Clone)]
pub struct CompiledBody {
    body:    FunctionBody,
    control: ControlMap,
}

impl CompiledBody {
    /// Declared locals, after the parameters
    pub fn locals(&self) -> &[ValueType] {
        &self.body.locals
    }

    /// Instructions
    pub fn code(&self) -> &[Instruction] {
        &self.body.code
    }

    /// Matching else/end positions
    pub fn control(&self) -> &ControlMap {
        &self.control
    }
}

/// An imported function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionImport {
    /// Module name
    pub module:     String,
    /// Field name
    pub name:       String,
    /// Index into the type section
    pub type_index: u32,
}

/// What an export name refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Export {
    /// Function index
    Function(u32),
    /// The memory
    Memory,
    /// The table
    Table,
    /// Global index
    Global(u32),
}

/// Bytes copied into memory at instantiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    /// Byte offset
    pub offset: u32,
    /// Contents
    pub bytes:  Vec<u8>,
}

/// Function indices copied into the table at instantiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSegment {
    /// Slot offset
    pub offset:    u32,
    /// Function indices
    pub functions: Vec<u32>,
}

#[derive(Debug, Clone)]
struct FunctionDef {
    type_index: u32,
    body:       Option<CompiledBody>,
}

#[derive(Debug, Clone)]
struct GlobalDef {
    ty:      GlobalType,
    initial: Value,
}

/// A validated module
#[derive(Debug)]
pub struct Module {
    types:     Vec<FuncType>,
    imports:   Vec<FunctionImport>,
    functions: Vec<FunctionDef>,
    memory:    Option<MemoryType>,
    data:      Vec<DataSegment>,
    table:     Option<TableType>,
    elements:  Vec<ElementSegment>,
    globals:   Vec<GlobalDef>,
    exports:   HashMap<String, Export>,
    start:     Option<u32>,
}

impl Module {
    /// Start building a module
    pub fn builder() -> ModuleBuilder {
        ModuleBuilder::default()
    }

    /// Number of imported functions; they occupy the lowest indices
    pub fn import_count(&self) -> u32 {
        self.imports.len() as u32
    }

    /// Size of the function index space, imports included
    pub fn function_count(&self) -> u32 {
        (self.imports.len() + self.functions.len()) as u32
    }

    /// Whether `func_index` is imported
    pub fn is_import(&self, func_index: u32) -> bool {
        func_index < self.import_count()
    }

    /// Type at a type index
    pub fn type_at(&self, type_index: u32) -> Result<&FuncType> {
        self.types
            .get(type_index as usize)
            .ok_or(Error::validation_invalid_type_index("Type index out of range"))
    }

    /// Type of the function at `func_index`
    pub fn func_type(&self, func_index: u32) -> Result<&FuncType> {
        let type_index = match self.imports.get(func_index as usize) {
            Some(import) => import.type_index,
            None => self.defined(func_index)?.type_index,
        };
        self.type_at(type_index)
    }

    /// Interpretable body of a defined function, if one was supplied
    pub fn body(&self, func_index: u32) -> Result<Option<&CompiledBody>> {
        Ok(self.defined(func_index)?.body.as_ref())
    }

    /// Imported functions in index order
    pub fn imports(&self) -> &[FunctionImport] {
        &self.imports
    }

    /// Memory declaration
    pub fn memory(&self) -> Option<MemoryType> {
        self.memory
    }

    /// Data segments
    pub fn data(&self) -> &[DataSegment] {
        &self.data
    }

    /// Table declaration
    pub fn table(&self) -> Option<TableType> {
        self.table
    }

    /// Element segments
    pub fn elements(&self) -> &[ElementSegment] {
        &self.elements
    }

    /// Declared globals with their initial values
    pub fn globals(&self) -> impl Iterator<Item = (GlobalType, Value)> + '_ {
        self.globals.iter().map(|g| (g.ty, g.initial))
    }

    /// Look up an export
    pub fn export(&self, name: &str) -> Option<Export> {
        self.exports.get(name).copied()
    }

    /// Start function
    pub fn start(&self) -> Option<u32> {
        self.start
    }

    fn defined(&self, func_index: u32) -> Result<&FunctionDef> {
        (func_index as usize)
            .checked_sub(self.imports.len())
            .and_then(|i| self.functions.get(i))
            .ok_or(Error::runtime_function_not_found("Function index out of range"))
    }
}

/// Builder for [`Module`]
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    types:     Vec<FuncType>,
    imports:   Vec<FunctionImport>,
    functions: Vec<(u32, Option<FunctionBody>)>,
    memory:    Option<MemoryType>,
    data:      Vec<DataSegment>,
    table:     Option<TableType>,
    elements:  Vec<ElementSegment>,
    globals:   Vec<GlobalDef>,
    exports:   Vec<(String, Export)>,
    start:     Option<u32>,
}

impl ModuleBuilder {
    /// Add a function type, returning its type index.
    ///
    /// Structurally equal types share one index.
    pub fn add_type(&mut self, ty: FuncType) -> u32 {
        if let Some(existing) = self.types.iter().position(|t| *t == ty) {
            return existing as u32;
        }
        self.types.push(ty);
        (self.types.len() - 1) as u32
    }

    /// Import a function; imports must be added before defined functions
    pub fn import_function(&mut self, module: &str, name: &str, ty: FuncType) -> Result<u32> {
        if !self.functions.is_empty() {
            return Err(Error::validation_error(
                "Function imports must precede defined functions",
            ));
        }
        let type_index = self.add_type(ty);
        self.imports.push(FunctionImport {
            module: module.to_string(),
            name: name.to_string(),
            type_index,
        });
        Ok((self.imports.len() - 1) as u32)
    }

    /// Define a function with an interpretable body
    pub fn add_function(&mut self, ty: FuncType, body: FunctionBody) -> u32 {
        let type_index = self.add_type(ty);
        self.functions.push((type_index, Some(body)));
        self.last_function_index()
    }

    /// Define a function that only has a native entry point
    pub fn declare_function(&mut self, ty: FuncType) -> u32 {
        let type_index = self.add_type(ty);
        self.functions.push((type_index, None));
        self.last_function_index()
    }

    /// Declare the memory
    pub fn memory(&mut self, ty: MemoryType) -> &mut Self {
        self.memory = Some(ty);
        self
    }

    /// Add a data segment
    pub fn data(&mut self, offset: u32, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.data.push(DataSegment {
            offset,
            bytes: bytes.into(),
        });
        self
    }

    /// Declare the table
    pub fn table(&mut self, ty: TableType) -> &mut Self {
        self.table = Some(ty);
        self
    }

    /// Add an element segment
    pub fn elements(&mut self, offset: u32, functions: Vec<u32>) -> &mut Self {
        self.elements.push(ElementSegment { offset, functions });
        self
    }

    /// Declare a global, returning its index
    pub fn global(&mut self, ty: GlobalType, initial: Value) -> u32 {
        self.globals.push(GlobalDef { ty, initial });
        (self.globals.len() - 1) as u32
    }

    /// Export a function
    pub fn export_function(&mut self, name: &str, func_index: u32) -> &mut Self {
        self.exports.push((name.to_string(), Export::Function(func_index)));
        self
    }

    /// Export the memory
    pub fn export_memory(&mut self, name: &str) -> &mut Self {
        self.exports.push((name.to_string(), Export::Memory));
        self
    }

    /// Export the table
    pub fn export_table(&mut self, name: &str) -> &mut Self {
        self.exports.push((name.to_string(), Export::Table));
        self
    }

    /// Export a global
    pub fn export_global(&mut self, name: &str, global_index: u32) -> &mut Self {
        self.exports.push((name.to_string(), Export::Global(global_index)));
        self
    }

    /// Set the start function
    pub fn start(&mut self, func_index: u32) -> &mut Self {
        self.start = Some(func_index);
        self
    }

    /// Validate and freeze the module
    pub fn build(self) -> Result<Arc<Module>> {
        let function_count = (self.imports.len() + self.functions.len()) as u32;

        let functions = self
            .functions
            .into_iter()
            .map(|(type_index, body)| -> Result<FunctionDef> {
                let body = body
                    .map(|body| {
                        control::analyze(&body.code).map(|control| CompiledBody { body, control })
                    })
                    .transpose()?;
                Ok(FunctionDef { type_index, body })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut exports = HashMap::with_capacity(self.exports.len());
        for (name, export) in self.exports {
            match export {
                Export::Function(idx) if idx >= function_count => {
                    return Err(Error::validation_error("Exported function index out of range"));
                }
                Export::Global(idx) if idx as usize >= self.globals.len() => {
                    return Err(Error::validation_error("Exported global index out of range"));
                }
                Export::Memory if self.memory.is_none() => {
                    return Err(Error::memory_not_found("Exported memory is not declared"));
                }
                Export::Table if self.table.is_none() => {
                    return Err(Error::table_not_found("Exported table is not declared"));
                }
                _ => {}
            }
            if exports.insert(name, export).is_some() {
                return Err(Error::validation_error("Duplicate export name"));
            }
        }

        if !self.data.is_empty() && self.memory.is_none() {
            return Err(Error::memory_not_found("Data segment without a memory"));
        }
        if !self.elements.is_empty() && self.table.is_none() {
            return Err(Error::table_not_found("Element segment without a table"));
        }
        if self
            .elements
            .iter()
            .flat_map(|segment| segment.functions.iter())
            .any(|idx| *idx >= function_count)
        {
            return Err(Error::validation_error("Element refers to an unknown function"));
        }

        let module = Module {
            types: self.types,
            imports: self.imports,
            functions,
            memory: self.memory,
            data: self.data,
            table: self.table,
            elements: self.elements,
            globals: self.globals,
            exports,
            start: self.start,
        };

        if let Some(start) = module.start {
            let ty = module.func_type(start)?;
            if !ty.params().is_empty() || !ty.results().is_empty() {
                return Err(Error::validation_error("Start function must have type () -> ()"));
            }
        }

        debug!(
            functions = module.function_count(),
            imports = module.import_count(),
            exports = module.exports.len(),
            "module built"
        );
        Ok(Arc::new(module))
    }

    fn last_function_index(&self) -> u32 {
        (self.imports.len() + self.functions.len() - 1) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_i32() -> FuncType {
        FuncType::new([ValueType::I32, ValueType::I32], [ValueType::I32])
    }

    #[test]
    fn imports_take_the_lowest_indices() -> Result<()> {
        let mut builder = Module::builder();
        let log = builder.import_function("env", "log", FuncType::new([ValueType::I32], []))?;
        let add = builder.declare_function(binary_i32());
        assert_eq!((log, add), (0, 1));
        assert!(builder.import_function("env", "late", FuncType::default()).is_err());

        let module = builder.build()?;
        assert_eq!(module.import_count(), 1);
        assert_eq!(module.function_count(), 2);
        assert!(module.is_import(0));
        assert_eq!(module.func_type(1)?, &binary_i32());
        assert!(module.body(1)?.is_none());
        assert!(module.func_type(2).is_err());
        Ok(())
    }

    #[test]
    fn equal_types_share_an_index() {
        let mut builder = Module::builder();
        let a = builder.add_type(binary_i32());
        let b = builder.add_type(binary_i32());
        assert_eq!(a, b);
    }

    #[test]
    fn bodies_are_scanned_at_build_time() {
        let mut builder = Module::builder();
        builder.add_function(FuncType::default(), FunctionBody::new(vec![Instruction::Nop]));
        let err = builder.build().unwrap_err();
        assert_eq!(err.code, duet_error::codes::MALFORMED_BODY);
    }

    #[test]
    fn exports_are_validated() -> Result<()> {
        let mut builder = Module::builder();
        builder.export_function("missing", 3);
        assert!(builder.build().is_err());

        let mut builder = Module::builder();
        let f = builder.add_function(FuncType::default(), FunctionBody::new(vec![Instruction::End]));
        builder.export_function("run", f).start(f);
        let module = builder.build()?;
        assert_eq!(module.export("run"), Some(Export::Function(0)));
        assert_eq!(module.export("nope"), None);
        Ok(())
    }

    #[test]
    fn start_must_take_nothing() {
        let mut builder = Module::builder();
        let f = builder.declare_function(binary_i32());
        builder.start(f);
        assert!(builder.build().is_err());
    }
}
