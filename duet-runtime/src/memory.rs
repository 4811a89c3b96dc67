// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Linear memory.
//!
//! A memory grows in place behind a lock, so a shared handle stays valid
//! across `memory.grow`. Every access is bounds-checked against the current
//! size and fails with an out-of-bounds trap.

use std::sync::RwLock;

use duet_error::{Error, Result};
use duet_foundation::MemoryType;
use tracing::debug;

use crate::config::MAX_MEMORY_PAGES;

/// WebAssembly page size in bytes
pub const PAGE_SIZE: usize = 65536;

/// A linear memory instance
#[derive(Debug)]
pub struct Memory {
    ty:        MemoryType,
    max_pages: u32,
    data:      RwLock<Vec<u8>>,
}

impl Memory {
    /// Create a memory of `ty.limits.min` pages, capped at `page_cap`
    pub fn new(ty: MemoryType, page_cap: u32) -> Result<Self> {
        let declared_max = ty.limits.max.unwrap_or(MAX_MEMORY_PAGES);
        if let Some(max) = ty.limits.max {
            if ty.limits.min > max {
                return Err(Error::validation_error(
                    "Memory minimum exceeds its maximum",
                ));
            }
        }
        let max_pages = declared_max.min(page_cap).min(MAX_MEMORY_PAGES);
        if ty.limits.min > max_pages {
            return Err(Error::resource_limit_exceeded(
                "Initial memory size exceeds the configured limit",
            ));
        }
        Ok(Self {
            ty,
            max_pages,
            data: RwLock::new(vec![0; ty.limits.min as usize * PAGE_SIZE]),
        })
    }

    /// Declared memory type
    pub fn ty(&self) -> MemoryType {
        self.ty
    }

    /// Effective maximum, in pages
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Current size in bytes
    pub fn size_in_bytes(&self) -> Result<usize> {
        Ok(self.read_guard()?.len())
    }

    /// Current size in pages
    pub fn pages(&self) -> Result<u32> {
        Ok((self.size_in_bytes()? / PAGE_SIZE) as u32)
    }

    /// Grow by `delta` pages.
    ///
    /// Returns the previous size in pages, or `None` when the result would
    /// exceed the maximum. Failure to grow is not an error.
    pub fn grow(&self, delta: u32) -> Result<Option<u32>> {
        let mut data = self.write_guard()?;
        let previous = (data.len() / PAGE_SIZE) as u32;
        let Some(next) = previous.checked_add(delta) else {
            return Ok(None);
        };
        if next > self.max_pages {
            debug!(previous, delta, max = self.max_pages, "memory.grow refused");
            return Ok(None);
        }
        data.resize(next as usize * PAGE_SIZE, 0);
        debug!(previous, next, "memory grown");
        Ok(Some(previous))
    }

    /// Copy `buf.len()` bytes starting at `addr` into `buf`
    pub fn read(&self, addr: u64, buf: &mut [u8]) -> Result<()> {
        let data = self.read_guard()?;
        let start = checked_range(data.len(), addr, buf.len())?;
        buf.copy_from_slice(&data[start..start + buf.len()]);
        Ok(())
    }

    /// Copy `bytes` into memory starting at `addr`
    pub fn write(&self, addr: u64, bytes: &[u8]) -> Result<()> {
        let mut data = self.write_guard()?;
        let start = checked_range(data.len(), addr, bytes.len())?;
        data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Read `N` little-endian bytes at `addr`
    pub fn load<const N: usize>(&self, addr: u64) -> Result<[u8; N]> {
        let mut bytes = [0u8; N];
        self.read(addr, &mut bytes)?;
        Ok(bytes)
    }

    /// Write `N` little-endian bytes at `addr`
    pub fn store<const N: usize>(&self, addr: u64, bytes: [u8; N]) -> Result<()> {
        self.write(addr, &bytes)
    }

    /// Read an i32
    pub fn read_i32(&self, addr: u64) -> Result<i32> {
        Ok(i32::from_le_bytes(self.load(addr)?))
    }

    /// Read an i64
    pub fn read_i64(&self, addr: u64) -> Result<i64> {
        Ok(i64::from_le_bytes(self.load(addr)?))
    }

    /// Read an f32
    pub fn read_f32(&self, addr: u64) -> Result<f32> {
        Ok(f32::from_le_bytes(self.load(addr)?))
    }

    /// Read an f64
    pub fn read_f64(&self, addr: u64) -> Result<f64> {
        Ok(f64::from_le_bytes(self.load(addr)?))
    }

    /// Write an i32
    pub fn write_i32(&self, addr: u64, value: i32) -> Result<()> {
        self.store(addr, value.to_le_bytes())
    }

    /// Write an i64
    pub fn write_i64(&self, addr: u64, value: i64) -> Result<()> {
        self.store(addr, value.to_le_bytes())
    }

    /// Write an f32
    pub fn write_f32(&self, addr: u64, value: f32) -> Result<()> {
        self.store(addr, value.to_le_bytes())
    }

    /// Write an f64
    pub fn write_f64(&self, addr: u64, value: f64) -> Result<()> {
        self.store(addr, value.to_le_bytes())
    }

    /// Copy of the whole memory contents
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        Ok(self.read_guard()?.clone())
    }

    fn read_guard(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<u8>>> {
        self.data
            .read()
            .map_err(|_| Error::poisoned_lock("Memory lock poisoned"))
    }

    fn write_guard(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<u8>>> {
        self.data
            .write()
            .map_err(|_| Error::poisoned_lock("Memory lock poisoned"))
    }
}

fn checked_range(len: usize, addr: u64, size: usize) -> Result<usize> {
    let end = addr
        .checked_add(size as u64)
        .ok_or(Error::trap_out_of_bounds_memory())?;
    if end > len as u64 {
        return Err(Error::trap_out_of_bounds_memory());
    }
    Ok(addr as usize)
}
