//! # MIPS Exception Tests
//!
//! Exception entry is checked twice: as a pure function of the CP0 state, and
//! through guest programs that take and return from exceptions.

use crate::common::TestContext;
use crate::common::asm::mips::*;
use dtemu_core::isa::mips::ExcCode;
use dtemu_core::isa::mips::cp0::{
    ExceptionContext, MipsException, cause, exception_entry, reg, status,
};
use pretty_assertions::assert_eq;

const BASE: u64 = 0x8000_1000;
const GENERAL_VECTOR: u64 = 0x8000_0180;

fn exc_code(cause_reg: u32) -> u32 {
    (cause_reg & cause::EXC_MASK) >> cause::EXC_SHIFT
}

#[test]
fn test_entry_outside_delay_slot() {
    let ctx = ExceptionContext {
        pc: 0x8000_2000,
        cause: cause::BD,
        ..Default::default()
    };
    let entry = exception_entry(&ctx, &MipsException::Syscall);

    assert_eq!(entry.epc, 0x8000_2000);
    assert_eq!(entry.cause & cause::BD, 0);
    assert_eq!(exc_code(entry.cause), ExcCode::Sys as u32);
    assert_eq!(entry.status, status::EXL);
    assert_eq!(u64::from(entry.vector), GENERAL_VECTOR);
}

#[test]
fn test_entry_in_delay_slot_points_at_branch() {
    let ctx = ExceptionContext {
        pc: 0x8000_2004,
        in_delay_slot: true,
        ..Default::default()
    };
    let entry = exception_entry(&ctx, &MipsException::Overflow);

    assert_eq!(entry.epc, 0x8000_2000);
    assert_ne!(entry.cause & cause::BD, 0);
    assert_eq!(exc_code(entry.cause), ExcCode::Ov as u32);
}

#[test]
fn test_tlb_refill_latches_page_and_uses_refill_vector() {
    let ctx = ExceptionContext {
        pc: 0x8000_2000,
        entry_hi: 0x0000_0005,
        context: 0x0080_0000,
        ..Default::default()
    };
    let exc = MipsException::TlbLoad {
        vaddr: 0x0040_1234,
        refill: true,
    };
    let entry = exception_entry(&ctx, &exc);

    assert_eq!(entry.vector, 0x8000_0000);
    assert_eq!(entry.bad_vaddr, 0x0040_1234);
    // ASID survives, VPN2 is replaced.
    assert_eq!(entry.entry_hi, 0x0040_0005);
    assert_eq!(entry.context, 0x0080_0000 | (0x0040_1234 >> 13) << 4);
    assert_eq!(exc_code(entry.cause), ExcCode::TlbL as u32);
}

#[test]
fn test_nested_exception_keeps_epc_and_uses_general_vector() {
    let ctx = ExceptionContext {
        pc: 0x8000_0010,
        in_delay_slot: false,
        status: status::EXL,
        cause: cause::BD,
        epc: 0x0040_0000,
        ..Default::default()
    };
    let exc = MipsException::TlbStore {
        vaddr: 0x1000,
        refill: true,
    };
    let entry = exception_entry(&ctx, &exc);

    assert_eq!(entry.epc, 0x0040_0000);
    assert_ne!(entry.cause & cause::BD, 0);
    assert_eq!(u64::from(entry.vector), GENERAL_VECTOR);
    assert_eq!(exc_code(entry.cause), ExcCode::TlbS as u32);
}

#[test]
fn test_bootstrap_vectors() {
    let ctx = ExceptionContext {
        status: status::BEV,
        ..Default::default()
    };
    let refill = MipsException::TlbLoad {
        vaddr: 0,
        refill: true,
    };
    assert_eq!(exception_entry(&ctx, &refill).vector, 0xbfc0_0200);
    assert_eq!(
        exception_entry(&ctx, &MipsException::Syscall).vector,
        0xbfc0_0380
    );
}

#[test]
fn test_coprocessor_unusable_records_unit() {
    let entry = exception_entry(
        &ExceptionContext::default(),
        &MipsException::CoprocessorUnusable(1),
    );
    assert_eq!(exc_code(entry.cause), ExcCode::CpU as u32);
    assert_eq!((entry.cause & cause::CE_MASK) >> cause::CE_SHIFT, 1);
}

#[test]
fn test_syscall_in_delay_slot() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[beq(0, 0, 2), SYSCALL, NOP]);

    assert_eq!(ctx.run(2), 2);
    assert_eq!(ctx.cpu().pc(), GENERAL_VECTOR);
    assert!(!ctx.cpu().in_delay_slot());
    assert_eq!(u64::from(ctx.cp0(reg::EPC)), BASE);
    assert_ne!(ctx.cp0(reg::CAUSE) & cause::BD, 0);
    assert_eq!(exc_code(ctx.cp0(reg::CAUSE)), ExcCode::Sys as u32);
    assert_ne!(ctx.cp0(reg::STATUS) & status::EXL, 0);
    assert_eq!(ctx.cpu().stats.exceptions, 1);
}

#[test]
fn test_syscall_handler_returns_past_syscall() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[SYSCALL, addiu(5, 0, 1)]);
    ctx.poke_words(
        GENERAL_VECTOR,
        &[
            mfc0(26, u32::from(reg::EPC)),
            addiu(26, 26, 4),
            mtc0(26, u32::from(reg::EPC)),
            ERET,
        ],
    );

    assert_eq!(ctx.run(6), 6);
    assert_eq!(ctx.get_reg(5), 1);
    assert_eq!(ctx.cp0(reg::STATUS) & status::EXL, 0);
    assert_eq!(ctx.cpu().pc(), BASE + 8);
}

#[test]
fn test_coprocessor_one_is_unusable() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[0x4400_0000]);

    assert_eq!(ctx.run(1), 1);
    assert_eq!(ctx.cpu().pc(), GENERAL_VECTOR);
    let cause_reg = ctx.cp0(reg::CAUSE);
    assert_eq!(exc_code(cause_reg), ExcCode::CpU as u32);
    assert_eq!((cause_reg & cause::CE_MASK) >> cause::CE_SHIFT, 1);
}

#[test]
fn test_misaligned_load_is_address_error() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[lui(1, 0x8000), lw(2, 2, 1)]);

    assert_eq!(ctx.run(2), 2);
    assert_eq!(ctx.cpu().pc(), GENERAL_VECTOR);
    assert_eq!(exc_code(ctx.cp0(reg::CAUSE)), ExcCode::AdEL as u32);
    assert_eq!(ctx.cp0(reg::BAD_VADDR), 0x8000_0002);
    assert_eq!(u64::from(ctx.cp0(reg::EPC)), BASE + 4);
    assert_eq!(ctx.cpu().stats.address_errors, 1);
}

#[test]
fn test_user_mode_cannot_touch_kernel_segments() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[NOP]);
    // KSU = user; the fetch itself faults.
    ctx.set_cp0(reg::STATUS, 0x10);

    assert_eq!(ctx.run(1), 1);
    assert_eq!(ctx.cpu().pc(), GENERAL_VECTOR + 4);
    assert_eq!(exc_code(ctx.cp0(reg::CAUSE)), ExcCode::AdEL as u32);
    assert_eq!(u64::from(ctx.cp0(reg::EPC)), BASE);
    assert_ne!(ctx.cp0(reg::STATUS) & status::EXL, 0);
}
