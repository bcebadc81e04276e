//! MIPS instruction handlers.
//!
//! Every handler reads its operands through `cpu.value` and writes through
//! `cpu.set`; the decoder has already folded `$zero` and immediates into the
//! operands. Values are 32-bit and live zero-extended in the register file.
//!
//! Taken branches record their target with `delay_branch`; the dispatch loop
//! applies it after the delay-slot instruction.

use super::cp0::{MipsException, cause, reg, status};
use super::mmu::{current_asid, user_mode};
use super::{Mips, live_cause, random_index};
use crate::common::AccessFlags;
use crate::core::cpu::Cpu;
use crate::core::dyntrans::{Ic, Operand};
use crate::core::mmu::{EntryLo, Probe, TlbEntry};
use crate::isa::Arch;
use crate::soc::Bus;

type C = Cpu<Mips>;

#[inline(always)]
fn r32(cpu: &C, ic: &Ic<Mips>, i: usize) -> u32 {
    cpu.value(ic.arg(i)) as u32
}

#[inline(always)]
fn w32(cpu: &mut C, ic: &Ic<Mips>, i: usize, v: u32) {
    cpu.set(ic.arg(i), u64::from(v));
}

#[inline(always)]
fn ea(cpu: &C, ic: &Ic<Mips>) -> u64 {
    u64::from(r32(cpu, ic, 1).wrapping_add(r32(cpu, ic, 2)))
}

#[inline(always)]
fn target(cpu: &C, ic: &Ic<Mips>) -> u64 {
    cpu.value(ic.arg(2)) & 0xffff_ffff
}

/// Does nothing (also `sync` and `cache`).
pub fn nop(_cpu: &mut C, _bus: &mut Bus, _ic: &Ic<Mips>) {}

macro_rules! alu {
    ($($(#[$doc:meta])* $name:ident => |$a:ident, $b:ident| $body:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
                let $a = r32(cpu, ic, 1);
                let $b = r32(cpu, ic, 2);
                w32(cpu, ic, 0, $body);
            }
        )*
    };
}

alu! {
    /// `addu`, `addiu`.
    addu => |a, b| a.wrapping_add(b);
    /// `subu`.
    subu => |a, b| a.wrapping_sub(b);
    /// `and`, `andi`.
    and => |a, b| a & b;
    /// `or`, `ori`.
    or => |a, b| a | b;
    /// `xor`, `xori`.
    xor => |a, b| a ^ b;
    /// `nor`.
    nor => |a, b| !(a | b);
    /// `slt`, `slti`.
    slt => |a, b| u32::from((a as i32) < (b as i32));
    /// `sltu`, `sltiu`.
    sltu => |a, b| u32::from(a < b);
    /// `sll`, `sllv` (operand 1 is the value, operand 2 the amount).
    sll => |a, b| a << (b & 31);
    /// `srl`, `srlv`.
    srl => |a, b| a >> (b & 31);
    /// `sra`, `srav`.
    sra => |a, b| ((a as i32) >> (b & 31)) as u32;
}

/// `lui`: copies operand 1 into operand 0.
pub fn mov(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let v = cpu.value(ic.arg(1));
    cpu.set(ic.arg(0), v);
}

/// `add`, `addi`: traps on signed overflow without writing the destination.
pub fn add(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let (a, b) = (r32(cpu, ic, 1) as i32, r32(cpu, ic, 2) as i32);
    match a.checked_add(b) {
        Some(v) => w32(cpu, ic, 0, v as u32),
        None => cpu.raise_exception(bus, MipsException::Overflow),
    }
}

/// `sub`: traps on signed overflow without writing the destination.
pub fn sub(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let (a, b) = (r32(cpu, ic, 1) as i32, r32(cpu, ic, 2) as i32);
    match a.checked_sub(b) {
        Some(v) => w32(cpu, ic, 0, v as u32),
        None => cpu.raise_exception(bus, MipsException::Overflow),
    }
}

/// `mult`.
pub fn mult(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let p = i64::from(r32(cpu, ic, 1) as i32) * i64::from(r32(cpu, ic, 2) as i32);
    cpu.arch.lo = p as u32;
    cpu.arch.hi = (p >> 32) as u32;
}

/// `multu`.
pub fn multu(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let p = u64::from(r32(cpu, ic, 1)) * u64::from(r32(cpu, ic, 2));
    cpu.arch.lo = p as u32;
    cpu.arch.hi = (p >> 32) as u32;
}

/// `div`. Division by zero leaves HI/LO unchanged.
pub fn div(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let (a, b) = (r32(cpu, ic, 1) as i32, r32(cpu, ic, 2) as i32);
    if b != 0 {
        cpu.arch.lo = a.wrapping_div(b) as u32;
        cpu.arch.hi = a.wrapping_rem(b) as u32;
    }
}

/// `divu`. Division by zero leaves HI/LO unchanged.
pub fn divu(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let (a, b) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    if b != 0 {
        cpu.arch.lo = a / b;
        cpu.arch.hi = a % b;
    }
}

/// `mfhi`.
pub fn mfhi(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let v = cpu.arch.hi;
    w32(cpu, ic, 0, v);
}

/// `mflo`.
pub fn mflo(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let v = cpu.arch.lo;
    w32(cpu, ic, 0, v);
}

/// `mthi`.
pub fn mthi(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    cpu.arch.hi = r32(cpu, ic, 0);
}

/// `mtlo`.
pub fn mtlo(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    cpu.arch.lo = r32(cpu, ic, 0);
}

/// Writes the return address (`pc + 8`) into operand `i`.
fn link(cpu: &mut C, ic: &Ic<Mips>, i: usize) {
    let ra = cpu.current_pc().wrapping_add(8) & 0xffff_ffff;
    cpu.set(ic.arg(i), ra);
}

/// `j`, `jal`.
pub fn j(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let region = cpu.current_pc().wrapping_add(4) & 0xf000_0000;
    let dest = region | cpu.value(ic.arg(0));
    link(cpu, ic, 1);
    cpu.delay_branch(dest);
}

/// `jr`.
pub fn jr(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let dest = cpu.value(ic.arg(0));
    cpu.delay_branch(dest);
}

/// `jalr`.
pub fn jalr(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let dest = cpu.value(ic.arg(0));
    link(cpu, ic, 1);
    cpu.delay_branch(dest);
}

macro_rules! branch {
    ($($(#[$doc:meta])* $name:ident => |$a:ident, $b:ident| $cond:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
                let $a = r32(cpu, ic, 0) as i32;
                let $b = r32(cpu, ic, 1) as i32;
                if $cond {
                    let dest = target(cpu, ic);
                    cpu.delay_branch(dest);
                }
            }
        )*
    };
}

branch! {
    /// `beq`.
    beq => |a, b| a == b;
    /// `bne`.
    bne => |a, b| a != b;
    /// `blez`.
    blez => |a, _b| a <= 0;
    /// `bgtz`.
    bgtz => |a, _b| a > 0;
}

/// `bltz`, `bltzal` (operand 1 is the link register or absent).
pub fn bltz(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let taken = (r32(cpu, ic, 0) as i32) < 0;
    link(cpu, ic, 1);
    if taken {
        let dest = target(cpu, ic);
        cpu.delay_branch(dest);
    }
}

/// `bgez`, `bgezal` (operand 1 is the link register or absent).
pub fn bgez(cpu: &mut C, _bus: &mut Bus, ic: &Ic<Mips>) {
    let taken = (r32(cpu, ic, 0) as i32) >= 0;
    link(cpu, ic, 1);
    if taken {
        let dest = target(cpu, ic);
        cpu.delay_branch(dest);
    }
}

/// `syscall`.
pub fn syscall(cpu: &mut C, bus: &mut Bus, _ic: &Ic<Mips>) {
    cpu.raise_exception(bus, MipsException::Syscall);
}

/// `break`.
pub fn break_(cpu: &mut C, bus: &mut Bus, _ic: &Ic<Mips>) {
    cpu.raise_exception(bus, MipsException::Breakpoint);
}

/// Any use of coprocessor 1-3 (operand 0 is the unit).
pub fn cop_unusable(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let unit = cpu.value(ic.arg(0)) as u8;
    cpu.raise_exception(bus, MipsException::CoprocessorUnusable(unit));
}

/// `lb`.
pub fn lb(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let addr = ea(cpu, ic);
    if let Some(v) = cpu.load_u8(bus, addr) {
        w32(cpu, ic, 0, v as i8 as i32 as u32);
    }
}

/// `lbu`.
pub fn lbu(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let addr = ea(cpu, ic);
    if let Some(v) = cpu.load_u8(bus, addr) {
        w32(cpu, ic, 0, u32::from(v));
    }
}

/// `lh`.
pub fn lh(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let addr = ea(cpu, ic);
    if let Some(v) = cpu.load_u16(bus, addr) {
        w32(cpu, ic, 0, v as i16 as i32 as u32);
    }
}

/// `lhu`.
pub fn lhu(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let addr = ea(cpu, ic);
    if let Some(v) = cpu.load_u16(bus, addr) {
        w32(cpu, ic, 0, u32::from(v));
    }
}

/// `lw`.
pub fn lw(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let addr = ea(cpu, ic);
    if let Some(v) = cpu.load_u32(bus, addr) {
        w32(cpu, ic, 0, v);
    }
}

/// `sb`.
pub fn sb(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let (addr, v) = (ea(cpu, ic), r32(cpu, ic, 0));
    let _ = cpu.store_u8(bus, addr, v as u8);
}

/// `sh`.
pub fn sh(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let (addr, v) = (ea(cpu, ic), r32(cpu, ic, 0));
    let _ = cpu.store_u16(bus, addr, v as u16);
}

/// `sw`.
pub fn sw(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let (addr, v) = (ea(cpu, ic), r32(cpu, ic, 0));
    let _ = cpu.store_u32(bus, addr, v);
}

/// `ll`: load word and set the reservation.
pub fn ll(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    let addr = ea(cpu, ic);
    if let Some(v) = cpu.load_u32(bus, addr) {
        w32(cpu, ic, 0, v);
        cpu.arch.ll_bit = true;
        if let Ok(m) = cpu.translate(addr, AccessFlags::READ.probe()) {
            cpu.ctrl.write(reg::LLADDR as usize, m.paddr.val() >> 4);
        }
    }
}

/// `sc`: store if the reservation holds; operand 3 receives 1 on success, 0 otherwise.
pub fn sc(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    if !cpu.arch.ll_bit {
        w32(cpu, ic, 3, 0);
        return;
    }
    let (addr, v) = (ea(cpu, ic), r32(cpu, ic, 0));
    if cpu.store_u32(bus, addr, v).is_some() {
        cpu.arch.ll_bit = false;
        w32(cpu, ic, 3, 1);
    }
}

/// Raises coprocessor-unusable for CP0 instructions in user mode without `Status.CU0`.
fn cp0_denied(cpu: &mut C, bus: &mut Bus) -> bool {
    let cu0 = cpu.ctrl.read(reg::STATUS as usize) as u32 & status::CU0 != 0;
    if user_mode(cpu) && !cu0 {
        cpu.raise_exception(bus, MipsException::CoprocessorUnusable(0));
        return true;
    }
    false
}

/// `mfc0`: Cause and Random are computed on read.
pub fn mfc0(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    if cp0_denied(cpu, bus) {
        return;
    }
    let v = match ic.arg(1) {
        Operand::Ctrl(reg::CAUSE) => u64::from(live_cause(cpu)),
        Operand::Ctrl(reg::RANDOM) => random_index(cpu) as u64,
        op => cpu.value(op) & 0xffff_ffff,
    };
    cpu.set(ic.arg(0), v);
}

/// `mtc0`: applies each register's writable mask and side effects.
pub fn mtc0(cpu: &mut C, bus: &mut Bus, ic: &Ic<Mips>) {
    if cp0_denied(cpu, bus) {
        return;
    }
    let v = r32(cpu, ic, 0);
    let Operand::Ctrl(r) = ic.arg(1) else {
        return;
    };
    let old = cpu.ctrl.read(r as usize) as u32;
    let new = match r {
        reg::INDEX => v & 0x3f,
        reg::RANDOM | reg::BAD_VADDR | reg::PRID => old,
        reg::ENTRY_LO0 | reg::ENTRY_LO1 => v & 0x3fff_ffff,
        reg::CONTEXT => (v & 0xff80_0000) | (old & 0x007f_fff0),
        reg::PAGE_MASK => v & 0x01ff_e000,
        reg::WIRED => v & 0x3f,
        reg::ENTRY_HI => v & 0xffff_e0ff,
        reg::COMPARE => {
            cpu.arch.timer_pending = false;
            v
        }
        reg::CAUSE => (old & !cause::IP_SOFT) | (v & cause::IP_SOFT),
        reg::CONFIG => (old & !0x7) | (v & 0x7),
        _ => v,
    };
    cpu.ctrl.write(r as usize, u64::from(new));
    if matches!(r, reg::STATUS | reg::CAUSE | reg::COMPARE) {
        cpu.request_interrupt_poll();
    }
    if matches!(r, reg::STATUS | reg::ENTRY_HI) {
        cpu.invalidate_cursor();
    }
}

/// Builds a TLB entry from EntryHi, EntryLo0/1 and PageMask.
fn entry_from_cp0(cpu: &C) -> TlbEntry {
    let read = |r: u8| cpu.ctrl.read(r as usize);
    let hi = read(reg::ENTRY_HI);
    let (lo0, g0) = EntryLo::from_reg(read(reg::ENTRY_LO0));
    let (lo1, g1) = EntryLo::from_reg(read(reg::ENTRY_LO1));
    TlbEntry {
        page_mask: read(reg::PAGE_MASK) & 0x01ff_e000,
        vpn2: (hi & 0xffff_e000) >> 13,
        asid: (hi & 0xff) as u8,
        global: g0 && g1,
        lo: [lo0, lo1],
    }
}

fn tlb_write(cpu: &mut C, index: usize) {
    let entry = entry_from_cp0(cpu);
    let _ = cpu.arch.tlb.write(index, entry);
    cpu.invalidate_cursor();
}

/// `tlbr`.
pub fn tlbr(cpu: &mut C, bus: &mut Bus, _ic: &Ic<Mips>) {
    if cp0_denied(cpu, bus) {
        return;
    }
    let index = (cpu.ctrl.read(reg::INDEX as usize) & 0x3f) as usize;
    let Some(e) = cpu.arch.tlb.read(index).copied() else {
        return;
    };
    cpu.ctrl.write(reg::PAGE_MASK as usize, e.page_mask);
    cpu.ctrl
        .write(reg::ENTRY_HI as usize, (e.vpn2 << 13) | u64::from(e.asid));
    cpu.ctrl
        .write(reg::ENTRY_LO0 as usize, e.lo[0].to_reg(e.global));
    cpu.ctrl
        .write(reg::ENTRY_LO1 as usize, e.lo[1].to_reg(e.global));
    cpu.invalidate_cursor();
}

/// `tlbwi`.
pub fn tlbwi(cpu: &mut C, bus: &mut Bus, _ic: &Ic<Mips>) {
    if cp0_denied(cpu, bus) {
        return;
    }
    let index = (cpu.ctrl.read(reg::INDEX as usize) & 0x3f) as usize;
    tlb_write(cpu, index);
}

/// `tlbwr`.
pub fn tlbwr(cpu: &mut C, bus: &mut Bus, _ic: &Ic<Mips>) {
    if cp0_denied(cpu, bus) {
        return;
    }
    let index = random_index(cpu);
    tlb_write(cpu, index);
}

/// `tlbp`: Index receives the first matching entry, or bit 31 on a miss.
pub fn tlbp(cpu: &mut C, bus: &mut Bus, _ic: &Ic<Mips>) {
    if cp0_denied(cpu, bus) {
        return;
    }
    let vaddr = cpu.ctrl.read(reg::ENTRY_HI as usize) & 0xffff_e000;
    let index = match cpu.arch.tlb.probe(vaddr, current_asid(cpu)) {
        Probe::Hit(i) => i as u64,
        Probe::Miss => 0x8000_0000,
    };
    cpu.ctrl.write(reg::INDEX as usize, index);
}

/// `eret`: returns to ErrorEPC (ERL set) or EPC, without a delay slot.
pub fn eret(cpu: &mut C, bus: &mut Bus, _ic: &Ic<Mips>) {
    if cp0_denied(cpu, bus) {
        return;
    }
    let st = cpu.ctrl.read(reg::STATUS as usize) as u32;
    let (dest, st) = if st & status::ERL != 0 {
        (cpu.ctrl.read(reg::ERROR_EPC as usize), st & !status::ERL)
    } else {
        (cpu.ctrl.read(reg::EPC as usize), st & !status::EXL)
    };
    cpu.ctrl.write(reg::STATUS as usize, u64::from(st));
    cpu.arch.ll_bit = false;
    cpu.jump_resync(dest & 0xffff_ffff);
    cpu.request_interrupt_poll();
}

/// `wait`: idles for the rest of the burst unless an interrupt is pending.
///
/// The interrupt that ends the wait latches EPC past the `wait`, so `eret`
/// continues with the next instruction.
pub fn wait(cpu: &mut C, bus: &mut Bus, _ic: &Ic<Mips>) {
    if cp0_denied(cpu, bus) {
        return;
    }
    if !Mips::interrupt_pending(cpu) {
        cpu.idle();
    }
}
