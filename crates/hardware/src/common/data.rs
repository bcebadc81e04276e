//! Memory Access Types.
//!
//! This module defines the classification of memory accesses used throughout the emulator.
//! These types are used for the following:
//! 1. **Permission Validation:** Dirty-bit and privilege checks in the address translator.
//! 2. **Fault Generation:** Choosing the load/store/fetch flavour of a guest exception.
//! 3. **Diagnostics:** The probe flag lets memory dumps translate without side effects.

use serde::Serialize;

/// Type of memory access operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AccessType {
    /// Instruction fetch access.
    Fetch,

    /// Data read access.
    Read,

    /// Data write access.
    ///
    /// Requires the dirty (writable) bit on TLB-mapped pages.
    Write,
}

/// Flags passed to the address translator.
///
/// Combines the kind of access with the `probe` bit. A probe is a diagnostic
/// lookup (debugger memory dumps, disassembly): faults are reported back to the
/// caller as a plain failure and never delivered to the guest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AccessFlags {
    /// Instruction fetch, data read, or data write.
    pub access: AccessType,
    /// Probe only: no guest-visible side effects.
    pub probe: bool,
}

impl AccessFlags {
    /// Instruction fetch.
    pub const FETCH: Self = Self {
        access: AccessType::Fetch,
        probe: false,
    };
    /// Data load.
    pub const READ: Self = Self {
        access: AccessType::Read,
        probe: false,
    };
    /// Data store.
    pub const WRITE: Self = Self {
        access: AccessType::Write,
        probe: false,
    };

    /// Returns the same access marked as a side-effect-free probe.
    #[must_use]
    pub const fn probe(self) -> Self {
        Self {
            access: self.access,
            probe: true,
        }
    }

    /// Returns `true` for data stores.
    #[inline(always)]
    pub const fn is_write(self) -> bool {
        matches!(self.access, AccessType::Write)
    }

    /// Returns `true` for instruction fetches.
    #[inline(always)]
    pub const fn is_fetch(self) -> bool {
        matches!(self.access, AccessType::Fetch)
    }
}
