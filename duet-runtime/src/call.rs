// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Indirect calls shared by both machines.

use std::sync::Arc;

use duet_error::{Error, Result};
use duet_foundation::{FuncType, Value};
use tracing::trace;

use crate::{instance::Instance, table::TableEntry};

/// Call the function in table slot `element`.
///
/// Checks, in order: the slot exists (undefined element), it is not null
/// (uninitialized element), and the target's type equals `expected`
/// structurally (indirect call type mismatch). Only then is the target
/// invoked, on the instance owning the slot's function. A failed check has
/// no side effects.
pub fn call_indirect(
    instance: &Arc<Instance>,
    expected: &FuncType,
    element: u32,
    args: &[Value],
) -> Result<Vec<Value>> {
    let entry = resolve_indirect(instance, expected, element)?;
    entry
        .owner
        .as_ref()
        .unwrap_or(instance)
        .call(entry.func_index, args)
}

/// The checked table entry `call_indirect` would invoke
pub(crate) fn resolve_indirect(
    instance: &Arc<Instance>,
    expected: &FuncType,
    element: u32,
) -> Result<TableEntry> {
    let entry = instance
        .table()?
        .get(element)?
        .ok_or(Error::trap_uninitialized_element())?;
    let target = entry.owner.as_ref().unwrap_or(instance);
    if target.func_type(entry.func_index)? != expected {
        trace!(element, func_index = entry.func_index, "call_indirect type mismatch");
        return Err(Error::trap_indirect_call_type_mismatch());
    }
    Ok(entry)
}
