//! # MIPS TLB Program Tests
//!
//! Guest code fills the TLB through CP0 and then touches mapped kuseg
//! addresses. Misses vector to the refill handler with the faulting page
//! latched in BadVAddr, Context and EntryHi.

use crate::common::TestContext;
use crate::common::asm::mips::*;
use dtemu_core::Mips;
use dtemu_core::common::AccessFlags;
use dtemu_core::isa::mips::ExcCode;
use dtemu_core::isa::mips::cp0::{cause, reg};
use pretty_assertions::assert_eq;

const BASE: u64 = 0x8000_1000;
const MAPPED: u16 = 0x0040;
const FRAME: u64 = 0x8_0000;

/// Maps the even page of VPN2 `0x0040_0000` to physical `0x8_0000`.
fn map_page(entry_lo0: u16) -> Vec<u32> {
    let r = |x: u8| u32::from(x);
    vec![
        lui(1, MAPPED),
        mtc0(1, r(reg::ENTRY_HI)),
        ori(2, 0, entry_lo0),
        mtc0(2, r(reg::ENTRY_LO0)),
        mtc0(0, r(reg::ENTRY_LO1)),
        mtc0(0, r(reg::PAGE_MASK)),
        mtc0(0, r(reg::INDEX)),
        TLBWI,
        ori(3, 0, 0xbeef),
    ]
}

fn exc_code(ctx: &TestContext<Mips>) -> u32 {
    (ctx.cp0(reg::CAUSE) & cause::EXC_MASK) >> cause::EXC_SHIFT
}

#[test]
fn test_refill_on_unmapped_kuseg_load() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[lui(1, MAPPED), lw(2, 0, 1)]);

    assert_eq!(ctx.run(2), 2);
    assert_eq!(ctx.cpu().pc(), 0x8000_0000);
    assert_eq!(exc_code(&ctx), ExcCode::TlbL as u32);
    assert_eq!(ctx.cp0(reg::BAD_VADDR), 0x0040_0000);
    assert_eq!(ctx.cp0(reg::ENTRY_HI), 0x0040_0000);
    assert_eq!(ctx.cp0(reg::CONTEXT), 0x2000);
    assert_eq!(u64::from(ctx.cp0(reg::EPC)), BASE + 4);
    assert_eq!(ctx.cpu().stats.tlb_refill, 1);
}

#[test]
fn test_written_entry_maps_loads_and_stores() {
    let mut program = map_page(0x2006);
    program.extend([sw(3, 0x10, 1), lw(4, 0x10, 1)]);
    let mut ctx = TestContext::mips(1).load_program(BASE, &program);

    let n = program.len() as u64;
    assert_eq!(ctx.run(n), n);
    assert_eq!(ctx.get_reg(4), 0xbeef);
    assert_eq!(ctx.read_word(FRAME + 0x10), 0xbeef);
    assert_eq!(ctx.cpu().stats.exceptions, 0);

    let mapping = ctx
        .cpu()
        .translate(0x0040_0010, AccessFlags::READ.probe())
        .unwrap();
    assert_eq!(mapping.paddr.val(), FRAME + 0x10);
    assert!(mapping.writable);
}

#[test]
fn test_store_to_clean_page_raises_modify() {
    // Valid but not dirty.
    let mut program = map_page(0x2002);
    program.push(sw(3, 0x10, 1));
    let mut ctx = TestContext::mips(1).load_program(BASE, &program);

    let n = program.len() as u64;
    assert_eq!(ctx.run(n), n);
    assert_eq!(ctx.cpu().pc(), 0x8000_0180);
    assert_eq!(exc_code(&ctx), ExcCode::Mod as u32);
    assert_eq!(ctx.cp0(reg::BAD_VADDR), 0x0040_0010);
    assert_eq!(ctx.cpu().stats.tlb_modify, 1);
    assert_eq!(ctx.read_word(FRAME + 0x10), 0);
}

#[test]
fn test_odd_page_without_valid_bit_is_invalid() {
    let mut program = map_page(0x2006);
    // 0x0040_1000 selects EntryLo1, which was written as zero.
    program.extend([ori(5, 1, 0x1000), lw(4, 0, 5)]);
    let mut ctx = TestContext::mips(1).load_program(BASE, &program);

    let n = program.len() as u64;
    assert_eq!(ctx.run(n), n);
    assert_eq!(ctx.cpu().pc(), 0x8000_0180);
    assert_eq!(exc_code(&ctx), ExcCode::TlbL as u32);
    assert_eq!(ctx.cpu().stats.tlb_invalid, 1);
}

#[test]
fn test_probe_read_leaves_state_untouched() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[addiu(1, 0, 1)]);
    let cp0_before: Vec<u32> = (0..32).map(|r| ctx.cp0(r)).collect();

    // Unmapped kuseg: the probe fails without raising anything.
    let m = &mut ctx.machine;
    assert_eq!(m.cpus[0].read_virtual_probe(&mut m.bus, 0x0040_0000, 4), None);

    // kseg0 reads straight through.
    let bytes = m.cpus[0].read_virtual_probe(&mut m.bus, BASE, 4).unwrap();
    assert_eq!(bytes, addiu(1, 0, 1).to_le_bytes().to_vec());

    let cp0_after: Vec<u32> = (0..32).map(|r| ctx.cp0(r)).collect();
    assert_eq!(cp0_before, cp0_after);
    assert_eq!(ctx.cpu().stats.exceptions, 0);
    assert_eq!(ctx.cpu().stats.tlb_refill, 0);
    assert_eq!(ctx.cpu().pc(), BASE);
}
