// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! WebAssembly global variables.

use std::sync::RwLock;

use duet_error::{Error, Result};
use duet_foundation::{GlobalType, Value};

/// A global variable instance
#[derive(Debug)]
pub struct Global {
    ty:    GlobalType,
    value: RwLock<Value>,
}

impl Global {
    /// Create a global holding `initial`, which must match `ty`
    pub fn new(ty: GlobalType, initial: Value) -> Result<Self> {
        if !initial.matches_type(ty.value_type) {
            return Err(Error::runtime_type_mismatch(
                "Global initializer does not match its declared type",
            ));
        }
        Ok(Self {
            ty,
            value: RwLock::new(initial),
        })
    }

    /// Declared type
    pub fn ty(&self) -> GlobalType {
        self.ty
    }

    /// Current value
    pub fn get(&self) -> Result<Value> {
        self.value
            .read()
            .map(|v| *v)
            .map_err(|_| Error::poisoned_lock("Global lock poisoned"))
    }

    /// Replace the value. Fails for immutable globals and on type mismatch.
    pub fn set(&self, value: Value) -> Result<()> {
        if !self.ty.mutable {
            return Err(Error::global_immutable());
        }
        if !value.matches_type(self.ty.value_type) {
            return Err(Error::runtime_type_mismatch(
                "Value does not match the global's type",
            ));
        }
        let mut slot = self
            .value
            .write()
            .map_err(|_| Error::poisoned_lock("Global lock poisoned"))?;
        *slot = value;
        Ok(())
    }
}
