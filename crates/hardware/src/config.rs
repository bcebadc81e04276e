//! Configuration system for the emulator.
//!
//! This module defines all configuration structures used to parameterize a machine.
//! It provides:
//! 1. **Defaults:** Baseline constants (RAM layout, burst quotas, cache and TLB sizes).
//! 2. **Structures:** Hierarchical config for general, memory, scheduler, cache and MMU.
//! 3. **Validation:** `Config::validate` rejects values the core cannot run with.
//!
//! Configuration is supplied as JSON (`Config::from_json`) or built with `Config::default()`.
//! Every section and field is optional in JSON; missing values take the defaults below.

use serde::Deserialize;

use crate::common::ConfigError;
use crate::common::constants::PAGE_SIZE;

/// Default configuration constants for the emulator.
mod defaults {
    /// Base physical address of main RAM.
    ///
    /// Zero suits both guests: MIPS kseg0/kseg1 windows map onto physical
    /// address zero, and the i960 runs with an identity mapping.
    pub const RAM_BASE: u64 = 0;

    /// Total size of main RAM (32 MiB).
    pub const RAM_SIZE: u64 = 32 * 1024 * 1024;

    /// Instructions CPU 0 runs per scheduling round.
    ///
    /// Bounded so tick callbacks (timers, interrupt sources) still observe
    /// time at a useful granularity.
    pub const QUOTA: u64 = 1024;

    /// Instructions every other CPU runs per scheduling round.
    pub const OTHER_QUOTA: u64 = 1024;

    /// Translation pages cached per CPU before the cache is flushed.
    pub const MAX_PAGES: usize = 1024;

    /// TLB entries for TLB-based architectures (R4400 has 48).
    pub const TLB_ENTRIES: usize = 48;

    /// Largest TLB the MIPS Index register can address.
    pub const MAX_TLB_ENTRIES: usize = 64;
}

pub use defaults::MAX_TLB_ENTRIES;

/// Guest instruction-set family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchKind {
    /// 32-bit little-endian MIPS with an R4000-style TLB.
    #[default]
    #[serde(alias = "MIPS", alias = "mipsel")]
    Mips,
    /// Intel i960 (KA/CA class).
    #[serde(alias = "I960", alias = "80960")]
    I960,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use dtemu_core::config::{ArchKind, Config};
///
/// let json = r#"{
///     "general": { "arch": "i960", "cpus": 2 },
///     "sched": { "quota": 256 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.general.arch, ArchKind::I960);
/// assert_eq!(config.general.cpus, 2);
/// assert_eq!(config.sched.quota, 256);
/// assert_eq!(config.sched.other_quota, 1024);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General machine settings.
    pub general: GeneralConfig,
    /// Main memory layout.
    pub memory: MemoryConfig,
    /// Scheduler burst sizes and stepping.
    pub sched: SchedConfig,
    /// Translation cache sizing.
    pub cache: CacheConfig,
    /// Address translator sizing.
    pub mmu: MmuConfig,
}

impl Config {
    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the core cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.cpus == 0 {
            return Err(ConfigError::NoCpus);
        }
        if self.sched.quota == 0 || self.sched.other_quota == 0 || self.sched.step == Some(0) {
            return Err(ConfigError::ZeroQuota);
        }
        if self.memory.ram_size == 0 || self.memory.ram_size % PAGE_SIZE != 0 {
            return Err(ConfigError::RamSize(self.memory.ram_size));
        }
        if self.cache.max_pages == 0 {
            return Err(ConfigError::ZeroCachePages);
        }
        if self.mmu.tlb_entries == 0 || self.mmu.tlb_entries > MAX_TLB_ENTRIES {
            return Err(ConfigError::TlbSize {
                got: self.mmu.tlb_entries,
                max: MAX_TLB_ENTRIES,
            });
        }
        Ok(())
    }
}

/// General machine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Guest architecture of every CPU in the machine.
    pub arch: ArchKind,
    /// Number of CPU cores.
    pub cpus: usize,
    /// Initial program counter; the architecture's reset vector when absent.
    pub start_pc: Option<u64>,
    /// Log every decoded instruction at `trace` level.
    pub trace: bool,
    /// A debugger collaborator is attached: errors switch to single-step
    /// instead of killing the CPU.
    pub debugger: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            arch: ArchKind::default(),
            cpus: 1,
            start_pc: None,
            trace: false,
            debugger: false,
        }
    }
}

/// Main memory layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Physical base address of RAM.
    pub ram_base: u64,
    /// RAM size in bytes; must be a non-zero multiple of the page size.
    pub ram_size: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ram_base: defaults::RAM_BASE,
            ram_size: defaults::RAM_SIZE,
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedConfig {
    /// Burst quota of CPU 0 (the reference clock).
    pub quota: u64,
    /// Burst quota of every other CPU.
    pub other_quota: u64,
    /// Start in single-step mode with this many instructions per CPU per round.
    pub step: Option<u64>,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            quota: defaults::QUOTA,
            other_quota: defaults::OTHER_QUOTA,
            step: None,
        }
    }
}

/// Translation cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Pages kept per CPU; creating one more flushes the whole cache.
    pub max_pages: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_pages: defaults::MAX_PAGES,
        }
    }
}

/// Address translator configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MmuConfig {
    /// Number of TLB entries on TLB-based architectures.
    pub tlb_entries: usize,
}

impl Default for MmuConfig {
    fn default() -> Self {
        Self {
            tlb_entries: defaults::TLB_ENTRIES,
        }
    }
}
