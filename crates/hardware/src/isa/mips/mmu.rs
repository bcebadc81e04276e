//! MIPS address translation.
//!
//! The 32-bit virtual address space is split into fixed windows:
//!
//! | range                     | name  | mapping                    | privilege |
//! |---------------------------|-------|----------------------------|-----------|
//! | `0x0000_0000-0x7fff_ffff` | kuseg | TLB (identity with ERL)    | any       |
//! | `0x8000_0000-0x9fff_ffff` | kseg0 | `vaddr - 0x8000_0000`      | kernel    |
//! | `0xa000_0000-0xbfff_ffff` | kseg1 | `vaddr - 0xa000_0000`      | kernel    |
//! | `0xc000_0000-0xffff_ffff` | kseg2 | TLB                        | kernel    |
//!
//! Supervisor mode is treated as user mode.

use super::Mips;
use super::cp0::{reg, status};
use crate::common::{AccessFlags, Fault, FaultKind, Mapping, TranslationResult};
use crate::core::cpu::Cpu;

const KSEG0: u64 = 0x8000_0000;
const KSEG1: u64 = 0xa000_0000;
const KSEG2: u64 = 0xc000_0000;

/// Returns `true` when the CPU runs in user mode (KSU non-zero, EXL and ERL clear).
pub fn user_mode(cpu: &Cpu<Mips>) -> bool {
    let st = cpu.ctrl.read(reg::STATUS as usize) as u32;
    st & (status::EXL | status::ERL) == 0 && st & status::KSU_MASK != 0
}

/// Current address-space identifier (EntryHi.ASID).
pub fn current_asid(cpu: &Cpu<Mips>) -> u8 {
    (cpu.ctrl.read(reg::ENTRY_HI as usize) & 0xff) as u8
}

/// Physical address of a kseg0/kseg1 address, `None` for mapped segments.
pub const fn unmapped_paddr(vaddr: u64) -> Option<u64> {
    let vaddr = vaddr & 0xffff_ffff;
    if vaddr >= KSEG0 && vaddr < KSEG2 {
        Some(vaddr & 0x1fff_ffff)
    } else {
        None
    }
}

/// Translates a MIPS virtual address.
pub fn translate(cpu: &Cpu<Mips>, vaddr: u64, flags: AccessFlags) -> TranslationResult {
    let vaddr = vaddr & 0xffff_ffff;
    let asid = current_asid(cpu);

    if vaddr < KSEG0 {
        let erl = cpu.ctrl.read(reg::STATUS as usize) as u32 & status::ERL != 0;
        if erl {
            return Ok(Mapping::identity(vaddr));
        }
        return cpu.arch.tlb.lookup(vaddr, asid, flags);
    }

    if user_mode(cpu) {
        return Err(Fault::new(FaultKind::AddressError, vaddr, asid, flags.access));
    }

    if vaddr < KSEG1 {
        Ok(Mapping::identity(vaddr - KSEG0))
    } else if vaddr < KSEG2 {
        Ok(Mapping::identity(vaddr - KSEG1))
    } else {
        cpu.arch.tlb.lookup(vaddr, asid, flags)
    }
}
