//! Dynamic-translation emulator core.
//!
//! This crate implements an instruction-level, multi-CPU emulator core with the following:
//! 1. **Core:** Translation cache of pre-decoded instruction calls, the burst dispatch loop,
//!    CPU run state, exception entry and interrupt plumbing.
//! 2. **MMU:** A software-refilled TLB translator with probe (side-effect-free) lookups.
//! 3. **ISA:** Guest architectures plugged in through the [`isa::Arch`] trait (MIPS, i960).
//! 4. **SoC:** The physical bus, RAM, and the device trait for memory-mapped hardware.
//! 5. **Simulation:** Machine assembly, tick registry, scheduler, and image loading.

/// Common types and constants (addresses, faults, access flags, errors).
pub mod common;
/// Emulator configuration (defaults, JSON parsing, validation).
pub mod config;
/// Execution core (CPU, dyntrans cache and dispatch, TLB).
pub mod core;
/// Guest instruction sets.
pub mod isa;
/// Machine, ticks, scheduler and loader.
pub mod sim;
/// System-on-chip (bus, RAM, device trait).
pub mod soc;
/// Emulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// CPU core generic over its architecture, and its run state.
pub use crate::core::{Cpu, RunState};
/// Guest architectures.
pub use crate::isa::{Arch, I960, Mips};
/// Machine and its run controller.
pub use crate::sim::{Liveness, Machine, Scheduler};
/// Physical bus.
pub use crate::soc::Bus;
