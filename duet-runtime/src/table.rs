// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Function reference tables used by `call_indirect`.

use std::sync::{Arc, RwLock};

use duet_error::{Error, Result};
use duet_foundation::TableType;

use crate::instance::Instance;

/// A non-null table slot.
///
/// `owner` names the instance the function index belongs to. `None` means
/// the instance that owns the table, so a table never holds a strong
/// reference to its own instance.
#[derive(Debug, Clone)]
pub struct TableEntry {
    /// Function index within the owning instance
    pub func_index: u32,
    /// Owning instance when different from the table's
    pub owner:      Option<Arc<Instance>>,
}

impl TableEntry {
    /// A function of the table's own instance
    pub fn local(func_index: u32) -> Self {
        Self {
            func_index,
            owner: None,
        }
    }

    /// A function belonging to another instance
    pub fn foreign(func_index: u32, owner: Arc<Instance>) -> Self {
        Self {
            func_index,
            owner: Some(owner),
        }
    }
}

/// A funcref table instance
#[derive(Debug)]
pub struct Table {
    ty:    TableType,
    slots: RwLock<Vec<Option<TableEntry>>>,
}

impl Table {
    /// Create a table of `ty.limits.min` null slots
    pub fn new(ty: TableType) -> Self {
        Self {
            ty,
            slots: RwLock::new(vec![None; ty.limits.min as usize]),
        }
    }

    /// Declared table type
    pub fn ty(&self) -> TableType {
        self.ty
    }

    /// Number of slots
    pub fn size(&self) -> Result<u32> {
        Ok(self.read_guard()?.len() as u32)
    }

    /// Slot contents; `Ok(None)` for a null slot.
    ///
    /// An index past the end raises the undefined element trap.
    pub fn get(&self, index: u32) -> Result<Option<TableEntry>> {
        self.read_guard()?
            .get(index as usize)
            .cloned()
            .ok_or(Error::trap_undefined_element())
    }

    /// Overwrite a slot
    pub fn set(&self, index: u32, entry: Option<TableEntry>) -> Result<()> {
        let mut slots = self.write_guard()?;
        let slot = slots
            .get_mut(index as usize)
            .ok_or(Error::trap_undefined_element())?;
        *slot = entry;
        Ok(())
    }

    /// Fill consecutive slots starting at `offset` with local functions
    pub(crate) fn initialize(&self, offset: u32, functions: &[u32]) -> Result<()> {
        let mut slots = self.write_guard()?;
        let start = offset as usize;
        let end = start
            .checked_add(functions.len())
            .filter(|end| *end <= slots.len())
            .ok_or(Error::segment_out_of_bounds(
                "Element segment does not fit the table",
            ))?;
        for (slot, func_index) in slots[start..end].iter_mut().zip(functions) {
            *slot = Some(TableEntry::local(*func_index));
        }
        Ok(())
    }

    fn read_guard(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Option<TableEntry>>>> {
        self.slots
            .read()
            .map_err(|_| Error::poisoned_lock("Table lock poisoned"))
    }

    fn write_guard(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Option<TableEntry>>>> {
        self.slots
            .write()
            .map_err(|_| Error::poisoned_lock("Table lock poisoned"))
    }
}
