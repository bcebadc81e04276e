//! Memory Management Unit (MMU).
//!
//! This module holds the architecture-neutral parts of address translation.
//! The translator contract is `translate(cpu, vaddr, flags) -> Mapping | Fault`:
//! it never delivers an exception itself, so a probe and a real access share
//! one code path and differ only in what the caller does with the `Fault`.
//!
//! Architectures without a TLB return `Mapping::identity`. TLB-based ones
//! combine their fixed address windows with the associative scan in [`tlb`].

/// Software-refilled TLB with even/odd page pairs.
pub mod tlb;

pub use tlb::{EntryLo, Probe, Tlb, TlbEntry};
