// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Host functions and the import set used for linking.

use std::{collections::HashMap, sync::Arc};

use duet_error::Result;
use duet_foundation::{FuncType, Value};

use crate::{
    adapter::{Adapter, IntoAdapter},
    context::ExecutionContext,
    instance::{ExportFunction, Instance},
};

/// A function supplied to satisfy an import.
///
/// Invoked with the context of the importing instance, so it sees the
/// caller's memory. A function re-exported from another instance runs on
/// that instance instead.
#[derive(Debug, Clone)]
pub struct HostFunction {
    module:  String,
    name:    String,
    adapter: Adapter,
}

impl HostFunction {
    /// Host function working on boxed values
    pub fn new<F>(module: &str, name: &str, ty: FuncType, func: F) -> Self
    where
        F: Fn(&ExecutionContext, &[Value]) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        Self {
            module:  module.to_string(),
            name:    name.to_string(),
            adapter: Adapter::dynamic(ty, move |args, ctx| func(ctx, args)),
        }
    }

    /// Host function from a typed closure; the type is taken from its
    /// signature
    pub fn wrap<P, R, F>(module: &str, name: &str, func: F) -> Result<Self>
    where
        F: IntoAdapter<P, R>,
    {
        let ty = <F as IntoAdapter<P, R>>::signature();
        Ok(Self {
            module:  module.to_string(),
            name:    name.to_string(),
            adapter: func.into_adapter(&ty)?,
        })
    }

    /// Another instance's export, offered under a new import name
    pub fn from_export(module: &str, name: &str, export: ExportFunction) -> Self {
        let ty = export.ty().clone();
        Self {
            module:  module.to_string(),
            name:    name.to_string(),
            adapter: Adapter::dynamic(ty, move |args, _caller| export.call(args)),
        }
    }

    /// Import module name
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Import field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Function type
    pub fn ty(&self) -> &FuncType {
        self.adapter.ty()
    }

    /// Invoke on behalf of `caller`
    pub fn call(&self, caller: &Arc<Instance>, args: &[Value]) -> Result<Vec<Value>> {
        self.adapter.invoke(caller, args)
    }
}

/// Host functions keyed by (module, name)
#[derive(Debug, Clone, Default)]
pub struct Imports {
    functions: HashMap<(String, String), HostFunction>,
}

impl Imports {
    /// Empty import set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function, replacing any with the same name
    pub fn with_function(mut self, function: HostFunction) -> Self {
        self.add_function(function);
        self
    }

    /// Add a function, replacing any with the same name
    pub fn add_function(&mut self, function: HostFunction) {
        self.functions.insert(
            (function.module.clone(), function.name.clone()),
            function,
        );
    }

    /// Look up a function
    pub fn function(&self, module: &str, name: &str) -> Option<&HostFunction> {
        self.functions
            .get(&(module.to_string(), name.to_string()))
    }

    /// Number of functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether no functions were added
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use duet_foundation::ValueType;

    use super::*;

    #[test]
    fn typed_host_functions_take_their_type_from_the_closure() -> Result<()> {
        let double = HostFunction::wrap("env", "double", |x: i64, _: &ExecutionContext| -> Result<i64> {
            Ok(x * 2)
        })?;
        assert_eq!(double.ty(), &FuncType::new([ValueType::I64], [ValueType::I64]));
        assert_eq!((double.module(), double.name()), ("env", "double"));
        Ok(())
    }

    #[test]
    fn lookup_by_module_and_name() {
        let imports = Imports::new()
            .with_function(HostFunction::new("env", "a", FuncType::default(), |_, _| Ok(vec![])))
            .with_function(HostFunction::new("other", "a", FuncType::default(), |_, _| Ok(vec![])));
        assert_eq!(imports.len(), 2);
        assert!(imports.function("env", "a").is_some());
        assert!(imports.function("env", "b").is_none());
    }
}
