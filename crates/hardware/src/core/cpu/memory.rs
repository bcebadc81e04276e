//! Memory Access Helpers.
//!
//! This module provides the interface between instruction handlers and the bus.
//! It performs the following:
//! 1. **Alignment:** Strict-alignment architectures fault on misaligned data accesses.
//! 2. **Address Translation:** Calls the architecture's translator for every access.
//! 3. **Fault Delivery:** A failed translation is delivered as a guest exception at
//!    the running instruction; the helper returns `None` and the handler must return.

use crate::common::{AccessFlags, Fault, FaultKind};
use crate::isa::Arch;
use crate::soc::Bus;

use super::Cpu;

impl<A: Arch> Cpu<A> {
    /// Translates a data access, delivering any fault.
    ///
    /// # Arguments
    ///
    /// * `bus` - System bus (exception entry may touch guest memory).
    /// * `vaddr` - Virtual address.
    /// * `size` - Access size in bytes (power of two).
    /// * `flags` - Read or write.
    ///
    /// # Returns
    ///
    /// The physical address, or `None` after an exception was entered.
    #[inline(always)]
    pub fn data_access(&mut self, bus: &mut Bus, vaddr: u64, size: u64, flags: AccessFlags) -> Option<u64> {
        let result = if A::STRICT_ALIGNMENT && vaddr & (size - 1) != 0 {
            Err(Fault::new(FaultKind::AddressError, vaddr, 0, flags.access))
        } else {
            A::translate(self, vaddr, flags)
        };
        match result {
            Ok(mapping) => Some(mapping.paddr.val()),
            Err(fault) => {
                self.pc = self.current_pc();
                self.deliver_fault(bus, &fault);
                None
            }
        }
    }

    /// Loads a byte.
    pub fn load_u8(&mut self, bus: &mut Bus, vaddr: u64) -> Option<u8> {
        let paddr = self.data_access(bus, vaddr, 1, AccessFlags::READ)?;
        Some(bus.read_u8(paddr))
    }

    /// Loads a little-endian halfword.
    pub fn load_u16(&mut self, bus: &mut Bus, vaddr: u64) -> Option<u16> {
        let paddr = self.data_access(bus, vaddr, 2, AccessFlags::READ)?;
        Some(bus.read_u16(paddr))
    }

    /// Loads a little-endian word.
    pub fn load_u32(&mut self, bus: &mut Bus, vaddr: u64) -> Option<u32> {
        let paddr = self.data_access(bus, vaddr, 4, AccessFlags::READ)?;
        Some(bus.read_u32(paddr))
    }

    /// Stores a byte.
    pub fn store_u8(&mut self, bus: &mut Bus, vaddr: u64, val: u8) -> Option<()> {
        let paddr = self.data_access(bus, vaddr, 1, AccessFlags::WRITE)?;
        bus.write_u8(paddr, val);
        Some(())
    }

    /// Stores a little-endian halfword.
    pub fn store_u16(&mut self, bus: &mut Bus, vaddr: u64, val: u16) -> Option<()> {
        let paddr = self.data_access(bus, vaddr, 2, AccessFlags::WRITE)?;
        bus.write_u16(paddr, val);
        Some(())
    }

    /// Stores a little-endian word.
    pub fn store_u32(&mut self, bus: &mut Bus, vaddr: u64, val: u32) -> Option<()> {
        let paddr = self.data_access(bus, vaddr, 4, AccessFlags::WRITE)?;
        bus.write_u32(paddr, val);
        Some(())
    }
}
