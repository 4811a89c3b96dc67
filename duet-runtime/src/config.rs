// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Engine configuration.
//!
//! Limits applied by every instance regardless of the machine backing it.

use duet_error::{Error, Result};

/// Default nesting limit for calls on one thread
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 1024;
/// Maximum number of 64 KiB pages addressable by a 32-bit memory
pub const MAX_MEMORY_PAGES: u32 = 65536;

/// Environment variable overriding [`EngineConfig::max_call_depth`]
pub const ENV_MAX_CALL_DEPTH: &str = "DUET_MAX_CALL_DEPTH";
/// Environment variable overriding [`EngineConfig::max_memory_pages`]
pub const ENV_MAX_MEMORY_PAGES: &str = "DUET_MAX_MEMORY_PAGES";
/// Environment variable overriding [`EngineConfig::interruptible`]
pub const ENV_INTERRUPTIBLE: &str = "DUET_INTERRUPTIBLE";

/// Limits and switches shared by every instance created with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    max_call_depth:   u32,
    max_memory_pages: u32,
    interruptible:    bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth:   DEFAULT_MAX_CALL_DEPTH,
            max_memory_pages: MAX_MEMORY_PAGES,
            interruptible:    true,
        }
    }
}

impl EngineConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Small caps for constrained hosts: 256 nested calls, 16 pages (1 MiB)
    pub fn strict() -> Self {
        Self {
            max_call_depth:   256,
            max_memory_pages: 16,
            interruptible:    true,
        }
    }

    /// Set the call nesting limit
    pub fn with_max_call_depth(mut self, depth: u32) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Cap memory size, in pages
    pub fn with_max_memory_pages(mut self, pages: u32) -> Self {
        self.max_memory_pages = pages;
        self
    }

    /// Enable or disable interrupt checks at call boundaries and loop
    /// back-edges
    pub fn with_interruptible(mut self, interruptible: bool) -> Self {
        self.interruptible = interruptible;
        self
    }

    /// Call nesting limit
    pub fn max_call_depth(&self) -> u32 {
        self.max_call_depth
    }

    /// Memory cap, in pages
    pub fn max_memory_pages(&self) -> u32 {
        self.max_memory_pages
    }

    /// Whether interrupt checks are performed
    pub fn interruptible(&self) -> bool {
        self.interruptible
    }

    /// Check that the limits are usable
    pub fn validate(&self) -> Result<()> {
        if self.max_call_depth == 0 {
            return Err(Error::invalid_configuration(
                "max_call_depth must be at least 1",
            ));
        }
        if self.max_memory_pages > MAX_MEMORY_PAGES {
            return Err(Error::invalid_configuration(
                "max_memory_pages exceeds the 32-bit address space",
            ));
        }
        Ok(())
    }

    /// Defaults overlaid with `DUET_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values from a key lookup, as [`EngineConfig::from_env`] does
    /// with the process environment
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_CALL_DEPTH) {
            self.max_call_depth = raw
                .trim()
                .parse()
                .map_err(|_| Error::invalid_configuration("DUET_MAX_CALL_DEPTH is not a number"))?;
        }
        if let Some(raw) = lookup(ENV_MAX_MEMORY_PAGES) {
            self.max_memory_pages = raw.trim().parse().map_err(|_| {
                Error::invalid_configuration("DUET_MAX_MEMORY_PAGES is not a number")
            })?;
        }
        if let Some(raw) = lookup(ENV_INTERRUPTIBLE) {
            self.interruptible = parse_flag(&raw)
                .ok_or(Error::invalid_configuration("DUET_INTERRUPTIBLE is not a boolean"))?;
        }
        self.validate()?;
        Ok(self)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_call_depth(), 1024);
        assert_eq!(config.max_memory_pages(), 65536);
        assert!(config.interruptible());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overlay_reads_all_keys() -> Result<()> {
        let config = EngineConfig::default().overlay(lookup(&[
            ("DUET_MAX_CALL_DEPTH", "64"),
            ("DUET_MAX_MEMORY_PAGES", " 2 "),
            ("DUET_INTERRUPTIBLE", "off"),
        ]))?;
        assert_eq!(config.max_call_depth(), 64);
        assert_eq!(config.max_memory_pages(), 2);
        assert!(!config.interruptible());
        Ok(())
    }

    #[test]
    fn overlay_rejects_garbage() {
        let err = EngineConfig::default()
            .overlay(lookup(&[("DUET_MAX_CALL_DEPTH", "deep")]))
            .unwrap_err();
        assert!(err.is_validation_error());
        assert!(EngineConfig::default()
            .overlay(lookup(&[("DUET_INTERRUPTIBLE", "maybe")]))
            .is_err());
        assert!(EngineConfig::default()
            .overlay(lookup(&[("DUET_MAX_CALL_DEPTH", "0")]))
            .is_err());
        assert!(EngineConfig::default()
            .overlay(lookup(&[("DUET_MAX_MEMORY_PAGES", "65537")]))
            .is_err());
    }

    #[test]
    fn strict_is_smaller() {
        let strict = EngineConfig::strict();
        assert!(strict.max_call_depth() < EngineConfig::default().max_call_depth());
        assert_eq!(strict.max_memory_pages(), 16);
    }
}
