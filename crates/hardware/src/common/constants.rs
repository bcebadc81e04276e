//! Global System Constants.
//!
//! This module defines system-wide constants used across the emulator core. It includes:
//! 1. **Memory Constants:** Page sizes, masks, and shifts for translation pages.
//! 2. **Slot Geometry:** How many instruction slots one translation page holds.
//! 3. **Register Files:** Sizes of the general and control register arrays.
//! 4. **Dispatch Guards:** Limits that turn runaway conditions into diagnostics.

/// Number of bits to shift to convert between bytes and pages.
pub const PAGE_SHIFT: u32 = 12;

/// Page size in bytes (4KB). Both the translation cache and the smallest TLB page use it.
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;

/// Mask for extracting the page offset from an address.
pub const PAGE_OFFSET_MASK: u64 = PAGE_SIZE - 1;

/// log2 of the instruction slot granularity in bytes.
///
/// Every supported guest encodes instructions in multiples of 32-bit words,
/// so one slot covers four bytes of guest code.
pub const INSN_SHIFT: u32 = 2;

/// Bytes covered by one instruction slot.
pub const INSN_BYTES: u64 = 1 << INSN_SHIFT;

/// Instruction slots per translation page (1024 for 4 KiB pages).
pub const SLOTS_PER_PAGE: usize = 1 << (PAGE_SHIFT - INSN_SHIFT);

/// Number of general-purpose registers held by every CPU core.
pub const NUM_GPRS: usize = 32;

/// Number of control/special registers held by every CPU core.
pub const NUM_CTRL: usize = 32;

/// Consecutive instruction-fetch faults tolerated without retiring an instruction.
///
/// A guest whose exception vector itself faults would otherwise spin inside a
/// single burst forever, since fetch faults do not count as instructions.
pub const MAX_FETCH_FAULTS: u32 = 8;
