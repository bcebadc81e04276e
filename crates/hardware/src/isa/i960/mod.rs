//! Intel i960 (KA/CA-class, little-endian).
//!
//! The i960 has no MMU: virtual and physical addresses are identical. What
//! makes it interesting for the execution core is elsewhere:
//! 1. **Variable length:** MEMB-format instructions with a displacement carry a
//!    second 32-bit word ([`words_needed`]).
//! 2. **Register frames:** `call` spills the sixteen local registers to the
//!    caller's frame and builds a new one; `ret` restores them.
//! 3. **Fault and interrupt tables:** exceptions vector through tables in guest
//!    memory whose bases live in control registers.
//!
//! Register numbering follows the encoding: indices 0..15 are the locals
//! `r0`..`r15` (`pfp`, `sp`, `rip`, ...), 16..31 the globals `g0`..`g15`
//! (`g15` is `fp`). Values are 32-bit, zero-extended into the 64-bit slots.

/// Opcode table and operand binding.
pub mod decode;

/// Instruction handlers.
pub mod exec;

use tracing::debug;

use crate::common::{AccessFlags, Fault, FaultKind, Mapping, TranslationResult};
use crate::config::Config;
use crate::core::cpu::Cpu;
use crate::core::dyntrans::Ic;
use crate::isa::Arch;
use crate::soc::Bus;

/// Register indices with fixed roles.
pub mod reg {
    /// Previous frame pointer (low bits hold the return type).
    pub const PFP: u8 = 0;
    /// Stack pointer.
    pub const SP: u8 = 1;
    /// Return instruction pointer.
    pub const RIP: u8 = 2;
    /// `g14`, the link register of `bal`/`balx`.
    pub const G14: u8 = 30;
    /// `g15`, the frame pointer.
    pub const FP: u8 = 31;
}

/// Control register indices (into `Cpu::ctrl`).
pub mod ctrl {
    /// Arithmetic controls: condition code, overflow flag and mask.
    pub const AC: u8 = 0;
    /// Process controls: trace enable, execution mode, priority.
    pub const PC: u8 = 1;
    /// Trace controls.
    pub const TC: u8 = 2;
    /// Guest address of the interrupt table.
    pub const INT_TABLE: u8 = 5;
    /// Guest address of the fault table.
    pub const FAULT_TABLE: u8 = 6;
}

/// Arithmetic-controls bits.
pub mod ac {
    /// Condition code field.
    pub const CC_MASK: u32 = 0x7;
    /// Condition code: less (or carry for `addc`).
    pub const CC_LESS: u32 = 0b100;
    /// Condition code: equal.
    pub const CC_EQUAL: u32 = 0b010;
    /// Condition code: greater.
    pub const CC_GREATER: u32 = 0b001;
    /// Sticky integer overflow flag.
    pub const OVERFLOW_FLAG: u32 = 1 << 8;
    /// Integer overflow faults are masked (set the flag instead).
    pub const OVERFLOW_MASK: u32 = 1 << 12;
}

/// Process-controls bits.
pub mod pc {
    /// Trace enable.
    pub const TRACE_ENABLE: u32 = 1 << 0;
    /// Supervisor execution mode.
    pub const SUPERVISOR: u32 = 1 << 1;
    /// Executing an interrupt handler.
    pub const INTERRUPTED: u32 = 1 << 13;
    /// Priority field shift.
    pub const PRIORITY_SHIFT: u32 = 16;
    /// Priority field.
    pub const PRIORITY_MASK: u32 = 0x1f << PRIORITY_SHIFT;
}

/// Return types stored in the low bits of `pfp`.
pub mod rtype {
    /// Plain local return.
    pub const LOCAL: u32 = 0;
    /// Return from a fault handler: restores PC and AC.
    pub const FAULT: u32 = 1;
    /// Return from an interrupt handler: restores PC and AC.
    pub const INTERRUPT: u32 = 7;
}

/// Fault types (index into the fault table).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultType {
    /// Trace event.
    Trace = 1,
    /// Invalid or unaligned operation.
    Operation = 2,
    /// Integer overflow or division by zero.
    Arithmetic = 3,
    /// Range or privilege constraint.
    Constraint = 5,
    /// Memory protection.
    Protection = 7,
    /// Type mismatch (for example `modpc` outside supervisor mode).
    Type = 10,
}

/// A guest-visible i960 exception.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum I960Exception {
    /// A fault, vectored through the fault table.
    Fault {
        /// Fault type.
        kind: FaultType,
        /// Fault subtype, recorded in the fault record.
        subtype: u8,
        /// Address the handler returns to; `None` retries the faulting instruction.
        resume: Option<u64>,
    },
    /// An external interrupt, vectored through the interrupt table.
    Interrupt {
        /// Interrupt line.
        line: u32,
    },
}

/// i960-specific CPU state.
#[derive(Clone, Debug, Default)]
pub struct I960State {
    /// Writes to special function registers that were ignored.
    pub sfr_writes: u64,
}

/// i960 architecture marker.
#[derive(Clone, Copy, Debug, Default)]
pub struct I960;

/// Frames are aligned to this many bytes.
pub const FRAME_ALIGN: u64 = 64;

/// Bytes of locals spilled per frame.
const LOCALS_BYTES: u64 = 64;

/// Bytes of the PC/AC record below a fault or interrupt frame.
const RECORD_BYTES: u64 = 16;

/// Number of 32-bit words the instruction starting with `first` occupies.
///
/// MEMB modes carrying a displacement (IP-relative and the four
/// `disp`-forms) need the following word.
pub const fn words_needed(first: u32) -> usize {
    let is_mem = first >> 31 == 1;
    let memb = first & (1 << 12) != 0;
    let mode = (first >> 10) & 0xf;
    if is_mem && memb && (mode == 0b0101 || mode >= 0b1100) {
        2
    } else {
        1
    }
}

/// Current interrupt priority (PC bits 20..16).
pub fn priority(cpu: &Cpu<I960>) -> u32 {
    (cpu.ctrl.read(ctrl::PC as usize) as u32 & pc::PRIORITY_MASK) >> pc::PRIORITY_SHIFT
}

/// Priority of interrupt line `line`.
pub const fn line_priority(line: u32) -> u32 {
    if line >= 30 { 31 } else { line + 1 }
}

/// Vector number delivered for interrupt line `line`.
pub const fn line_vector(line: u32) -> u32 {
    line_priority(line) * 8 + 2
}

/// Highest asserted interrupt line, if any.
fn highest_line(cpu: &Cpu<I960>) -> Option<u32> {
    let lines = cpu.pending_lines() & 0xffff_ffff;
    (lines != 0).then(|| 63 - lines.leading_zeros())
}

/// Reads the condition code.
pub fn cc(cpu: &Cpu<I960>) -> u32 {
    cpu.ctrl.read(ctrl::AC as usize) as u32 & ac::CC_MASK
}

/// Replaces the condition code.
pub fn set_cc(cpu: &mut Cpu<I960>, cc: u32) {
    let a = cpu.ctrl.read(ctrl::AC as usize) as u32;
    cpu.ctrl
        .write(ctrl::AC as usize, u64::from((a & !ac::CC_MASK) | (cc & ac::CC_MASK)));
}

/// Spills `r0`..`r15` to the frame at `fp`.
pub(crate) fn save_locals(cpu: &Cpu<I960>, bus: &mut Bus, fp: u64) {
    for i in 0..16u64 {
        bus.write_u32(fp + i * 4, cpu.regs.read(i as usize) as u32);
    }
}

/// Reloads `r0`..`r15` from the frame at `fp`.
pub(crate) fn restore_locals(cpu: &mut Cpu<I960>, bus: &mut Bus, fp: u64) {
    for i in 0..16u64 {
        cpu.regs.write(i as usize, u64::from(bus.read_u32(fp + i * 4)));
    }
}

/// Builds a new frame above the stack pointer and makes it current.
///
/// The caller's locals are spilled to the caller's frame with `rip` set to
/// `return_ip`; the new `pfp` carries `rtype` in its low bits. `reserve`
/// bytes directly below the new frame are left for a PC/AC record.
///
/// Returns the new frame pointer.
pub(crate) fn push_frame(
    cpu: &mut Cpu<I960>,
    bus: &mut Bus,
    return_ip: u64,
    rtype: u32,
    reserve: u64,
) -> u64 {
    let fp = cpu.regs.read(reg::FP as usize) & 0xffff_ffff;
    let sp = cpu.regs.read(reg::SP as usize) & 0xffff_ffff;
    cpu.regs.write(reg::RIP as usize, return_ip & 0xffff_ffff);
    save_locals(cpu, bus, fp);

    let new_fp = (sp + reserve + FRAME_ALIGN - 1) & !(FRAME_ALIGN - 1) & 0xffff_ffff;
    cpu.regs.write(reg::PFP as usize, fp | u64::from(rtype));
    cpu.regs.write(reg::SP as usize, new_fp + LOCALS_BYTES);
    cpu.regs.write(reg::FP as usize, new_fp);
    new_fp
}

impl Arch for I960 {
    type State = I960State;
    type Exception = I960Exception;

    const NAME: &'static str = "i960";
    const STRICT_ALIGNMENT: bool = false;

    fn new_state(_config: &Config) -> I960State {
        I960State::default()
    }

    fn reset(cpu: &mut Cpu<Self>) {
        cpu.regs.clear();
        cpu.ctrl.clear();
        cpu.arch = I960State::default();
        cpu.ctrl
            .write(ctrl::AC as usize, u64::from(ac::OVERFLOW_MASK));
        cpu.ctrl.write(
            ctrl::PC as usize,
            u64::from(pc::SUPERVISOR | pc::PRIORITY_MASK),
        );
        cpu.set_pc(0);
    }

    fn translate(_cpu: &Cpu<Self>, vaddr: u64, flags: AccessFlags) -> TranslationResult {
        if vaddr > 0xffff_ffff {
            return Err(Fault::new(FaultKind::AddressError, vaddr, 0, flags.access));
        }
        Ok(Mapping::identity(vaddr))
    }

    fn words_needed(first: u32) -> usize {
        words_needed(first)
    }

    fn decode(words: &[u32]) -> Ic<Self> {
        decode::decode(words)
    }

    fn fault_exception(fault: &Fault) -> I960Exception {
        let (kind, subtype) = match fault.kind {
            FaultKind::AddressError => (FaultType::Operation, 3),
            FaultKind::Refill | FaultKind::Invalid | FaultKind::Modify => {
                (FaultType::Protection, 1)
            }
        };
        I960Exception::Fault {
            kind,
            subtype,
            resume: None,
        }
    }

    fn enter_exception(cpu: &mut Cpu<Self>, bus: &mut Bus, exc: I960Exception) {
        let old_pc = cpu.ctrl.read(ctrl::PC as usize) as u32;
        let old_ac = cpu.ctrl.read(ctrl::AC as usize) as u32;
        let here = cpu.pc() & 0xffff_ffff;

        let (rtype, resume, new_pc, word2, handler) = match exc {
            I960Exception::Fault {
                kind,
                subtype,
                resume,
            } => {
                let table = cpu.ctrl.read(ctrl::FAULT_TABLE as usize) & 0xffff_ffff;
                let entry = bus.read_u32(table + 8 * kind as u64);
                let new_pc = (old_pc | pc::SUPERVISOR) & !pc::TRACE_ENABLE;
                let word2 = u32::from(kind as u8) | (u32::from(subtype) << 16);
                (
                    rtype::FAULT,
                    resume.unwrap_or(here),
                    new_pc,
                    word2,
                    u64::from(entry & !3),
                )
            }
            I960Exception::Interrupt { line } => {
                let prio = line_priority(line);
                let vector = line_vector(line);
                let table = cpu.ctrl.read(ctrl::INT_TABLE as usize) & 0xffff_ffff;
                let handler = bus.read_u32(table + 4 + 4 * u64::from(vector));
                let new_pc = ((old_pc | pc::SUPERVISOR | pc::INTERRUPTED)
                    & !(pc::TRACE_ENABLE | pc::PRIORITY_MASK))
                    | (prio << pc::PRIORITY_SHIFT);
                (rtype::INTERRUPT, here, new_pc, vector, u64::from(handler & !3))
            }
        };

        let new_fp = push_frame(cpu, bus, resume, rtype, RECORD_BYTES);
        let record = new_fp - RECORD_BYTES;
        bus.write_u32(record, old_pc);
        bus.write_u32(record + 4, old_ac);
        bus.write_u32(record + 8, word2);
        bus.write_u32(record + 12, here as u32);

        cpu.ctrl.write(ctrl::PC as usize, u64::from(new_pc));
        debug!(
            cpu = cpu.id,
            handler = format_args!("{handler:#x}"),
            frame = format_args!("{new_fp:#x}"),
            "i960 exception frame"
        );
        cpu.jump_resync(handler);
    }

    fn interrupt_pending(cpu: &Cpu<Self>) -> bool {
        highest_line(cpu).is_some_and(|line| line_priority(line) > priority(cpu))
    }

    fn take_interrupt(cpu: &mut Cpu<Self>, bus: &mut Bus) {
        if let Some(line) = highest_line(cpu) {
            cpu.enter_exception(bus, I960Exception::Interrupt { line });
        }
    }
}

/// Returns from the current frame (`ret`).
///
/// Fault and interrupt returns also restore PC and AC from the record
/// below the frame.
pub(crate) fn pop_frame(cpu: &mut Cpu<I960>, bus: &mut Bus) {
    let fp = cpu.regs.read(reg::FP as usize) & 0xffff_ffff;
    let pfp = cpu.regs.read(reg::PFP as usize) as u32;
    let rtype = pfp & 0x7;
    let caller_fp = u64::from(pfp & !0xf);

    let restores = matches!(rtype, rtype::FAULT | rtype::INTERRUPT);
    if restores {
        let record = fp.wrapping_sub(RECORD_BYTES);
        let saved_pc = bus.read_u32(record);
        let saved_ac = bus.read_u32(record + 4);
        cpu.ctrl.write(ctrl::PC as usize, u64::from(saved_pc));
        cpu.ctrl.write(ctrl::AC as usize, u64::from(saved_ac));
    }

    cpu.regs.write(reg::FP as usize, caller_fp);
    restore_locals(cpu, bus, caller_fp);
    let target = cpu.regs.read(reg::RIP as usize) & 0xffff_ffff;
    if restores {
        cpu.jump_resync(target);
        cpu.request_interrupt_poll();
    } else {
        cpu.branch_to(target);
    }
}
