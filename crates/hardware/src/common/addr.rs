//! Physical Address type.
//!
//! This module defines a strong type for bus addresses. It provides the following:
//! 1. **Type Safety:** Keeps translated addresses apart from raw guest values.
//! 2. **Page Arithmetic:** The page key used by the translation cache.
//! 3. **MMU Integration:** Acts as the result type of address translation.

use std::fmt;

use super::constants::PAGE_OFFSET_MASK;

/// A physical address on the system bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Returns the physical page this address lies in.
    ///
    /// Translation pages are keyed by this value, so two virtual mappings of
    /// the same physical code share one set of decoded instructions.
    #[inline(always)]
    pub const fn page(self) -> Self {
        Self(self.0 & !PAGE_OFFSET_MASK)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p:{:#010x}", self.0)
    }
}
