//! Architecture-independent execution core.
//!
//! This module contains the parts every guest architecture shares:
//! 1. **CPU:** Register files, run state, exception and interrupt plumbing.
//! 2. **Dyntrans:** Translation pages of decoded instruction calls and the dispatch loop.
//! 3. **MMU:** The translator contract and the software-refilled TLB.

/// CPU core state and control flow.
pub mod cpu;

/// Translation cache and dispatch loop.
pub mod dyntrans;

/// Address translation (TLB).
pub mod mmu;

pub use self::cpu::{Cpu, RunState};
