//! System control coprocessor (CP0).
//!
//! This module defines the CP0 register map, the Status/Cause bit layout, the
//! exception kinds, and [`exception_entry`]: a pure function from the current
//! CP0 state and an exception to the CP0 state and vector after entry.

use super::ExcCode;

/// CP0 register numbers (index into `Cpu::ctrl`).
pub mod reg {
    /// TLB index for `TLBR`/`TLBWI`, probe result for `TLBP`.
    pub const INDEX: u8 = 0;
    /// Pseudo-random TLB index for `TLBWR` (computed on read).
    pub const RANDOM: u8 = 1;
    /// Even half of the TLB entry being read or written.
    pub const ENTRY_LO0: u8 = 2;
    /// Odd half of the TLB entry being read or written.
    pub const ENTRY_LO1: u8 = 3;
    /// Page table base and faulting BadVPN2.
    pub const CONTEXT: u8 = 4;
    /// Page size of the TLB entry being read or written.
    pub const PAGE_MASK: u8 = 5;
    /// Number of TLB entries `TLBWR` never replaces.
    pub const WIRED: u8 = 6;
    /// Address of the last address or TLB fault.
    pub const BAD_VADDR: u8 = 8;
    /// Timer counter.
    pub const COUNT: u8 = 9;
    /// VPN2 and current ASID.
    pub const ENTRY_HI: u8 = 10;
    /// Timer compare value.
    pub const COMPARE: u8 = 11;
    /// Processor status.
    pub const STATUS: u8 = 12;
    /// Cause of the last exception and pending interrupts.
    pub const CAUSE: u8 = 13;
    /// Exception program counter.
    pub const EPC: u8 = 14;
    /// Processor revision identifier.
    pub const PRID: u8 = 15;
    /// Configuration.
    pub const CONFIG: u8 = 16;
    /// Physical address of the last `LL`.
    pub const LLADDR: u8 = 17;
    /// Error exception program counter (reset, NMI).
    pub const ERROR_EPC: u8 = 30;
}

/// Status register bits.
pub mod status {
    /// Interrupt enable.
    pub const IE: u32 = 1 << 0;
    /// Exception level.
    pub const EXL: u32 = 1 << 1;
    /// Error level (set at reset).
    pub const ERL: u32 = 1 << 2;
    /// Kernel/supervisor/user mode field.
    pub const KSU_MASK: u32 = 0x3 << 3;
    /// Interrupt mask field (IM7..IM0).
    pub const IM_MASK: u32 = 0xff << 8;
    /// Bootstrap exception vectors.
    pub const BEV: u32 = 1 << 22;
    /// Coprocessor 0 usable in user mode.
    pub const CU0: u32 = 1 << 28;
}

/// Cause register bits.
pub mod cause {
    /// Exception code field shift.
    pub const EXC_SHIFT: u32 = 2;
    /// Exception code field.
    pub const EXC_MASK: u32 = 0x1f << EXC_SHIFT;
    /// Interrupt pending field (IP7..IP0).
    pub const IP_MASK: u32 = 0xff << 8;
    /// Software-writable interrupt pending bits (IP1..IP0).
    pub const IP_SOFT: u32 = 0x3 << 8;
    /// First hardware interrupt pending bit (IP2).
    pub const IP_HW_SHIFT: u32 = 10;
    /// Timer interrupt pending bit (IP7).
    pub const IP_TIMER: u32 = 1 << 15;
    /// Coprocessor number field shift for coprocessor-unusable exceptions.
    pub const CE_SHIFT: u32 = 28;
    /// Coprocessor number field.
    pub const CE_MASK: u32 = 0x3 << CE_SHIFT;
    /// Exception occurred in a branch delay slot.
    pub const BD: u32 = 1 << 31;
}

/// Exception vector base with `Status.BEV` clear.
pub const VECTOR_BASE: u32 = 0x8000_0000;
/// Exception vector base with `Status.BEV` set.
pub const BEV_VECTOR_BASE: u32 = 0xbfc0_0200;
/// Offset of the TLB refill vector.
pub const REFILL_OFFSET: u32 = 0x000;
/// Offset of the general exception vector.
pub const GENERAL_OFFSET: u32 = 0x180;
/// Reset vector.
pub const RESET_VECTOR: u32 = 0xbfc0_0000;

/// A guest-visible MIPS exception.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MipsException {
    /// External, timer or software interrupt.
    Interrupt,
    /// Store to a valid page whose dirty bit is clear.
    TlbModify {
        /// Faulting address.
        vaddr: u32,
    },
    /// Load or fetch TLB miss (`refill`) or invalid entry.
    TlbLoad {
        /// Faulting address.
        vaddr: u32,
        /// No entry matched; vectors to the refill handler.
        refill: bool,
    },
    /// Store TLB miss (`refill`) or invalid entry.
    TlbStore {
        /// Faulting address.
        vaddr: u32,
        /// No entry matched; vectors to the refill handler.
        refill: bool,
    },
    /// Misaligned or privileged load or fetch.
    AddressLoad {
        /// Faulting address.
        vaddr: u32,
    },
    /// Misaligned or privileged store.
    AddressStore {
        /// Faulting address.
        vaddr: u32,
    },
    /// `SYSCALL`.
    Syscall,
    /// `BREAK`.
    Breakpoint,
    /// Coprocessor unusable.
    CoprocessorUnusable(u8),
    /// Signed arithmetic overflow.
    Overflow,
}

impl MipsException {
    /// Cause.ExcCode value.
    pub const fn code(&self) -> ExcCode {
        match self {
            Self::Interrupt => ExcCode::Int,
            Self::TlbModify { .. } => ExcCode::Mod,
            Self::TlbLoad { .. } => ExcCode::TlbL,
            Self::TlbStore { .. } => ExcCode::TlbS,
            Self::AddressLoad { .. } => ExcCode::AdEL,
            Self::AddressStore { .. } => ExcCode::AdES,
            Self::Syscall => ExcCode::Sys,
            Self::Breakpoint => ExcCode::Bp,
            Self::CoprocessorUnusable(_) => ExcCode::CpU,
            Self::Overflow => ExcCode::Ov,
        }
    }

    /// Address latched into BadVAddr, for address and TLB exceptions.
    pub const fn bad_vaddr(&self) -> Option<u32> {
        match *self {
            Self::TlbModify { vaddr }
            | Self::TlbLoad { vaddr, .. }
            | Self::TlbStore { vaddr, .. }
            | Self::AddressLoad { vaddr }
            | Self::AddressStore { vaddr } => Some(vaddr),
            _ => None,
        }
    }

    /// TLB exceptions also latch the faulting page into Context and EntryHi.
    pub const fn is_tlb(&self) -> bool {
        matches!(
            self,
            Self::TlbModify { .. } | Self::TlbLoad { .. } | Self::TlbStore { .. }
        )
    }

    /// TLB miss (no matching entry).
    pub const fn is_refill(&self) -> bool {
        matches!(
            self,
            Self::TlbLoad { refill: true, .. } | Self::TlbStore { refill: true, .. }
        )
    }
}

/// CP0 state exception entry depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExceptionContext {
    /// Address of the faulting instruction (or of the delay slot).
    pub pc: u32,
    /// The faulting instruction sits in a branch delay slot.
    pub in_delay_slot: bool,
    /// Status register.
    pub status: u32,
    /// Cause register (software-visible bits).
    pub cause: u32,
    /// EPC register.
    pub epc: u32,
    /// Context register.
    pub context: u32,
    /// EntryHi register.
    pub entry_hi: u32,
    /// BadVAddr register.
    pub bad_vaddr: u32,
}

/// CP0 state and vector after exception entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExceptionEntry {
    /// New Status.
    pub status: u32,
    /// New Cause.
    pub cause: u32,
    /// New EPC.
    pub epc: u32,
    /// New Context.
    pub context: u32,
    /// New EntryHi.
    pub entry_hi: u32,
    /// New BadVAddr.
    pub bad_vaddr: u32,
    /// Address execution continues at.
    pub vector: u32,
}

/// Computes the CP0 state after taking `exc` in `ctx`.
///
/// With `Status.EXL` already set (nested exception) EPC and Cause.BD keep their
/// values and refills use the general vector.
pub fn exception_entry(ctx: &ExceptionContext, exc: &MipsException) -> ExceptionEntry {
    let exl = ctx.status & status::EXL != 0;

    let mut cause = (ctx.cause & !(cause::EXC_MASK | cause::CE_MASK))
        | ((exc.code() as u32) << cause::EXC_SHIFT);
    if let MipsException::CoprocessorUnusable(n) = exc {
        cause |= (u32::from(*n) << cause::CE_SHIFT) & cause::CE_MASK;
    }

    let mut epc = ctx.epc;
    if !exl {
        if ctx.in_delay_slot {
            epc = ctx.pc.wrapping_sub(4);
            cause |= cause::BD;
        } else {
            epc = ctx.pc;
            cause &= !cause::BD;
        }
    }

    let mut entry = ExceptionEntry {
        status: ctx.status | status::EXL,
        cause,
        epc,
        context: ctx.context,
        entry_hi: ctx.entry_hi,
        bad_vaddr: ctx.bad_vaddr,
        vector: 0,
    };

    if let Some(vaddr) = exc.bad_vaddr() {
        entry.bad_vaddr = vaddr;
        if exc.is_tlb() {
            entry.context = (ctx.context & 0xff80_0000) | ((vaddr >> 13) << 4);
            entry.entry_hi = (vaddr & 0xffff_e000) | (ctx.entry_hi & 0xff);
        }
    }

    let base = if ctx.status & status::BEV != 0 {
        BEV_VECTOR_BASE
    } else {
        VECTOR_BASE
    };
    let offset = if exc.is_refill() && !exl {
        REFILL_OFFSET
    } else {
        GENERAL_OFFSET
    };
    entry.vector = base.wrapping_add(offset);
    entry
}
