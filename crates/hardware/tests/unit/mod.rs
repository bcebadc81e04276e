//! # Unit Components
//!
//! This module serves as the central hub for the tests of the emulator core.
//! It organizes them by layer: the architecture-neutral execution core, the
//! guest instruction sets, and the machine-level simulation.

/// Configuration defaults, JSON parsing and validation.
pub mod config;

/// Execution core tests.
///
/// This module aggregates tests for:
/// - The translation cache and the dispatch loop.
/// - Breakpoints, aborts and the fetch-fault guard.
/// - The TLB translator.
pub mod core;

/// Guest instruction set tests (MIPS and i960).
pub mod isa;

/// Machine, scheduler, tick registry and loader tests.
pub mod sim;
