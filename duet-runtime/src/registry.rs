// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Dense function-index to adapter table.

use duet_error::{Error, Result};

use crate::adapter::Adapter;

/// Adapters indexed by function index.
///
/// Built once when a module is compiled and read-only afterwards, so
/// lookups need no locking.
#[derive(Debug, Clone)]
pub struct DispatchRegistry {
    adapters: Vec<Option<Adapter>>,
}

impl DispatchRegistry {
    /// Start a registry for `function_count` indices
    pub fn builder(function_count: u32) -> DispatchRegistryBuilder {
        DispatchRegistryBuilder {
            adapters: vec![None; function_count as usize],
        }
    }

    /// Adapter for `func_index`.
    ///
    /// A missing entry means the index space the registry was built from
    /// disagrees with the caller's; it is reported, never skipped.
    #[inline]
    pub fn get(&self, func_index: u32) -> Result<&Adapter> {
        self.adapters
            .get(func_index as usize)
            .and_then(Option::as_ref)
            .ok_or(Error::unregistered_function())
    }

    /// Size of the index space
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether the index space is empty
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Indices with no adapter
    pub fn missing(&self) -> impl Iterator<Item = u32> + '_ {
        self.adapters
            .iter()
            .enumerate()
            .filter(|(_, adapter)| adapter.is_none())
            .map(|(idx, _)| idx as u32)
    }
}

/// Builder for [`DispatchRegistry`]
#[derive(Debug)]
pub struct DispatchRegistryBuilder {
    adapters: Vec<Option<Adapter>>,
}

impl DispatchRegistryBuilder {
    /// Register the adapter for `func_index`, once
    pub fn register(&mut self, func_index: u32, adapter: Adapter) -> Result<()> {
        let slot = self
            .adapters
            .get_mut(func_index as usize)
            .ok_or(Error::runtime_function_not_found(
                "Function index outside the registry",
            ))?;
        if slot.is_some() {
            return Err(Error::duplicate_registration());
        }
        *slot = Some(adapter);
        Ok(())
    }

    /// Whether `func_index` already has an adapter
    pub fn is_registered(&self, func_index: u32) -> bool {
        matches!(self.adapters.get(func_index as usize), Some(Some(_)))
    }

    /// Freeze the registry
    pub fn build(self) -> DispatchRegistry {
        DispatchRegistry {
            adapters: self.adapters,
        }
    }
}
