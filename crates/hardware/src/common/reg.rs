//! Register Files.
//!
//! This module provides the fixed-size register arrays every CPU core carries. It provides:
//! 1. **Storage:** 32 general-purpose and 32 control registers, addressed by index.
//! 2. **Operand Targets:** Decoded instruction operands refer into these arrays by
//!    index instead of by reference, so an instruction call never aliases CPU state.
//! 3. **Observability:** A `Display` dump for diagnostics.
//!
//! Architectural quirks such as a hardwired zero register are resolved at decode
//! time (a write to MIPS `$zero` binds to a discarded operand), not here.

use std::fmt;

use super::constants::NUM_GPRS;

/// Fixed array of 64-bit registers addressed by index.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterFile<const N: usize = NUM_GPRS> {
    regs: [u64; N],
}

impl<const N: usize> Default for RegisterFile<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RegisterFile<N> {
    /// Creates a register file with every register set to zero.
    pub const fn new() -> Self {
        Self { regs: [0; N] }
    }

    /// Reads a register.
    ///
    /// # Arguments
    ///
    /// * `idx` - Register index. Out-of-range indices read as zero.
    ///
    /// # Returns
    ///
    /// The 64-bit value stored in the register.
    #[inline(always)]
    pub fn read(&self, idx: usize) -> u64 {
        self.regs.get(idx).copied().unwrap_or(0)
    }

    /// Writes a register.
    ///
    /// # Arguments
    ///
    /// * `idx` - Register index. Out-of-range writes are dropped.
    /// * `val` - The 64-bit value to write.
    #[inline(always)]
    pub fn write(&mut self, idx: usize, val: u64) {
        if let Some(slot) = self.regs.get_mut(idx) {
            *slot = val;
        }
    }

    /// Clears every register to zero.
    pub fn clear(&mut self) {
        self.regs = [0; N];
    }
}

impl<const N: usize> fmt::Debug for RegisterFile<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.regs.iter()).finish()
    }
}

impl<const N: usize> fmt::Display for RegisterFile<N> {
    /// Prints registers in pairs, like a monitor's register dump.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..N).step_by(2) {
            write!(f, "r{:<2}={:#018x}", i, self.regs[i])?;
            if i + 1 < N {
                write!(f, " r{:<2}={:#018x}", i + 1, self.regs[i + 1])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
