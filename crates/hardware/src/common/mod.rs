//! Common utilities and types used throughout the emulator core.
//!
//! This module provides fundamental building blocks that are shared across all components
//! of the emulator. It includes:
//! 1. **Address Types:** Strong type for physical (bus) addresses.
//! 2. **Constants:** Page geometry, slot counts, register-file sizes.
//! 3. **Memory Access:** Access classification and translator flags (including probes).
//! 4. **Error Handling:** Faults, decode errors, diagnostics and host errors.
//! 5. **Register Management:** Index-addressed register arrays.

/// Address type definitions (physical addresses).
pub mod addr;

/// Common constants used throughout the emulator.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Error types, faults and diagnostics.
pub mod error;

/// Register file implementation.
pub mod reg;

pub use addr::PhysAddr;
pub use constants::{PAGE_SHIFT, PAGE_SIZE, SLOTS_PER_PAGE};
pub use data::{AccessFlags, AccessType};
pub use error::{
    ConfigError, DecodeError, Diagnostic, DiagnosticKind, Fault, FaultKind, Mapping, SimError,
    TranslationResult,
};
pub use reg::RegisterFile;
