//! Guest instruction set tests.

/// MIPS decode, delay slots, exceptions and the TLB.
pub mod mips;

/// i960 decode, register frames and the interrupt table.
pub mod i960;
