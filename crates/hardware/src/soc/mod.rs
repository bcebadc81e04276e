//! System-on-Chip (SoC) Components.
//!
//! This module organizes the physical side of the machine: the system bus,
//! RAM, and the device trait external collaborators implement to attach
//! memory-mapped hardware.

/// System bus interconnect and routing.
pub mod interconnect;

/// System RAM.
pub mod memory;

/// Device trait definitions for MMIO access.
pub mod traits;

pub use interconnect::Bus;
pub use memory::Memory;
pub use traits::Device;
