//! MIPS (R4000-class, 32-bit, little-endian).
//!
//! This module implements the MIPS guest. It provides:
//! 1. **Translation:** Fixed kseg windows plus a software-refilled TLB ([`mmu`]).
//! 2. **Decoding:** A sparse opcode table binding handlers and operands ([`decode`]).
//! 3. **Execution:** Handlers for the integer, branch, load/store and CP0 subset ([`exec`]).
//! 4. **Exceptions:** CP0 exception entry, `ERET`, and the Count/Compare timer ([`cp0`]).
//!
//! General registers hold 32-bit values zero-extended into 64-bit slots.
//! Branches and jumps have one delay slot. Interrupt lines 0..5 drive
//! Cause.IP2..IP7; the Count/Compare timer also drives IP7.

/// CP0 registers and exception entry.
pub mod cp0;

/// Opcode table and operand binding.
pub mod decode;

/// Instruction handlers.
pub mod exec;

/// Segment windows and TLB lookup.
pub mod mmu;

use crate::common::{AccessFlags, AccessType, Fault, FaultKind, TranslationResult};
use crate::config::Config;
use crate::core::cpu::Cpu;
use crate::core::dyntrans::Ic;
use crate::core::mmu::Tlb;
use crate::isa::Arch;
use crate::soc::Bus;

use self::cp0::{ExceptionContext, MipsException, cause, exception_entry, reg, status};

/// Cause.ExcCode values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ExcCode {
    /// Interrupt.
    Int = 0,
    /// TLB modification.
    Mod = 1,
    /// TLB exception on load or fetch.
    TlbL = 2,
    /// TLB exception on store.
    TlbS = 3,
    /// Address error on load or fetch.
    AdEL = 4,
    /// Address error on store.
    AdES = 5,
    /// Syscall.
    Sys = 8,
    /// Breakpoint.
    Bp = 9,
    /// Coprocessor unusable.
    CpU = 11,
    /// Arithmetic overflow.
    Ov = 12,
}

/// Processor revision reported in PRId (R4000).
const PRID_R4000: u64 = 0x0000_0400;

/// MIPS-specific CPU state.
#[derive(Clone, Debug)]
pub struct MipsState {
    /// Multiply/divide high result.
    pub hi: u32,
    /// Multiply/divide low result.
    pub lo: u32,
    /// Joint TLB.
    pub tlb: Tlb,
    /// Count reached Compare; drives Cause.IP7 until Compare is written.
    pub timer_pending: bool,
    /// Load-linked reservation.
    pub ll_bit: bool,
}

/// MIPS architecture marker.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mips;

/// Hardware interrupt lines mapped onto Cause.IP2..IP7.
pub const HW_LINES: u32 = 6;

/// Live Cause value: stored bits plus hardware interrupt lines and the timer.
pub fn live_cause(cpu: &Cpu<Mips>) -> u32 {
    let stored = cpu.ctrl.read(reg::CAUSE as usize) as u32;
    let lines = (cpu.pending_lines() as u32) & ((1 << HW_LINES) - 1);
    let timer = if cpu.arch.timer_pending {
        cause::IP_TIMER
    } else {
        0
    };
    stored | (lines << cause::IP_HW_SHIFT) | timer
}

/// Index `TLBWR` replaces: cycles through the entries above Wired with Count.
pub fn random_index(cpu: &Cpu<Mips>) -> usize {
    let n = cpu.arch.tlb.len().max(1);
    let wired = (cpu.ctrl.read(reg::WIRED as usize) as usize).min(n - 1);
    let count = cpu.ctrl.read(reg::COUNT as usize) as usize;
    wired + count % (n - wired)
}

impl Arch for Mips {
    type State = MipsState;
    type Exception = MipsException;

    const NAME: &'static str = "mips";
    const STRICT_ALIGNMENT: bool = true;

    fn new_state(config: &Config) -> MipsState {
        MipsState {
            hi: 0,
            lo: 0,
            tlb: Tlb::new(config.mmu.tlb_entries),
            timer_pending: false,
            ll_bit: false,
        }
    }

    fn reset(cpu: &mut Cpu<Self>) {
        cpu.regs.clear();
        cpu.ctrl.clear();
        cpu.arch.tlb.flush();
        cpu.arch.hi = 0;
        cpu.arch.lo = 0;
        cpu.arch.timer_pending = false;
        cpu.arch.ll_bit = false;
        cpu.ctrl
            .write(reg::STATUS as usize, u64::from(status::BEV | status::ERL));
        cpu.ctrl
            .write(reg::RANDOM as usize, cpu.arch.tlb.len().saturating_sub(1) as u64);
        cpu.ctrl.write(reg::PRID as usize, PRID_R4000);
        cpu.ctrl.write(reg::CONFIG as usize, 0x3);
        cpu.set_pc(u64::from(cp0::RESET_VECTOR));
    }

    fn translate(cpu: &Cpu<Self>, vaddr: u64, flags: AccessFlags) -> TranslationResult {
        mmu::translate(cpu, vaddr, flags)
    }

    fn decode(words: &[u32]) -> Ic<Self> {
        decode::decode(words)
    }

    fn image_paddr(vaddr: u64) -> u64 {
        mmu::unmapped_paddr(vaddr).unwrap_or(vaddr)
    }

    fn fault_exception(fault: &Fault) -> MipsException {
        let vaddr = fault.vaddr as u32;
        let store = fault.access == AccessType::Write;
        match fault.kind {
            FaultKind::Modify => MipsException::TlbModify { vaddr },
            FaultKind::Refill | FaultKind::Invalid => {
                let refill = fault.kind == FaultKind::Refill;
                if store {
                    MipsException::TlbStore { vaddr, refill }
                } else {
                    MipsException::TlbLoad { vaddr, refill }
                }
            }
            FaultKind::AddressError => {
                if store {
                    MipsException::AddressStore { vaddr }
                } else {
                    MipsException::AddressLoad { vaddr }
                }
            }
        }
    }

    fn enter_exception(cpu: &mut Cpu<Self>, _bus: &mut Bus, exc: MipsException) {
        let read = |r: u8| cpu.ctrl.read(r as usize) as u32;
        let ctx = ExceptionContext {
            pc: cpu.pc() as u32,
            in_delay_slot: cpu.in_delay_slot(),
            status: read(reg::STATUS),
            cause: read(reg::CAUSE),
            epc: read(reg::EPC),
            context: read(reg::CONTEXT),
            entry_hi: read(reg::ENTRY_HI),
            bad_vaddr: read(reg::BAD_VADDR),
        };
        let entry = exception_entry(&ctx, &exc);

        let mut write = |r: u8, v: u32| cpu.ctrl.write(r as usize, u64::from(v));
        write(reg::STATUS, entry.status);
        write(reg::CAUSE, entry.cause);
        write(reg::EPC, entry.epc);
        write(reg::CONTEXT, entry.context);
        write(reg::ENTRY_HI, entry.entry_hi);
        write(reg::BAD_VADDR, entry.bad_vaddr);
        cpu.arch.ll_bit = false;
        cpu.jump_resync(u64::from(entry.vector));
    }

    fn interrupt_pending(cpu: &Cpu<Self>) -> bool {
        let st = cpu.ctrl.read(reg::STATUS as usize) as u32;
        st & status::IE != 0
            && st & (status::EXL | status::ERL) == 0
            && live_cause(cpu) & st & status::IM_MASK != 0
    }

    fn take_interrupt(cpu: &mut Cpu<Self>, bus: &mut Bus) {
        cpu.enter_exception(bus, MipsException::Interrupt);
    }

    fn after_burst(cpu: &mut Cpu<Self>, executed: u64) {
        let count = cpu.ctrl.read(reg::COUNT as usize) as u32;
        let compare = cpu.ctrl.read(reg::COMPARE as usize) as u32;
        let delta = u32::try_from(executed).unwrap_or(u32::MAX);
        cpu.ctrl
            .write(reg::COUNT as usize, u64::from(count.wrapping_add(delta)));
        if delta > 0 && compare.wrapping_sub(count).wrapping_sub(1) < delta {
            cpu.arch.timer_pending = true;
            cpu.request_interrupt_poll();
        }
    }
}
