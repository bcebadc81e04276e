//! # Translation Cache Tests
//!
//! Every instruction is decoded once per cache lifetime; a reset or a
//! capacity flush forces exactly one more decode per instruction reached.

use crate::common::TestContext;
use crate::common::asm::mips::*;
use crate::common::harness::test_config;
use dtemu_core::Mips;
use dtemu_core::core::dyntrans::run_burst;
use pretty_assertions::assert_eq;

const LOOP_BASE: u64 = 0x8000_1000;

fn counting_loop() -> TestContext<Mips> {
    TestContext::mips(1).load_program(LOOP_BASE, &[addiu(1, 1, 1), j(LOOP_BASE as u32), NOP])
}

#[test]
fn test_loop_decodes_each_slot_once() {
    let mut ctx = counting_loop();

    assert_eq!(ctx.run(30), 30);
    assert_eq!(ctx.get_reg(1), 10);
    assert_eq!(ctx.cpu().stats.translations, 3);
    assert_eq!(ctx.cpu().stats.pages_created, 1);
    assert_eq!(ctx.cpu().pc(), LOOP_BASE);

    assert_eq!(ctx.run(300), 300);
    assert_eq!(ctx.get_reg(1), 110);
    assert_eq!(ctx.cpu().stats.translations, 3);
}

#[test]
fn test_reset_redecodes_exactly_once() {
    let mut ctx = counting_loop();
    assert_eq!(ctx.run(30), 30);
    assert_eq!(ctx.cpu().stats.translations, 3);

    ctx.cpu_mut().reset_translation_cache();
    assert_eq!(ctx.cpu().cached_pages(), 0);
    assert_eq!(ctx.cpu().stats.cache_flushes, 1);
    assert_eq!(ctx.cpu().pc(), LOOP_BASE);

    assert_eq!(ctx.run(30), 30);
    assert_eq!(ctx.cpu().stats.translations, 6);
    assert_eq!(ctx.get_reg(1), 20);
}

#[test]
fn test_reset_between_bursts_keeps_position() {
    let mut ctx = counting_loop();
    // Stop mid-loop, right after the jump.
    assert_eq!(ctx.run(2), 2);
    assert_eq!(ctx.cpu().pc(), LOOP_BASE + 8);
    assert!(ctx.cpu().in_delay_slot());

    ctx.machine.reset_translation_caches();
    assert_eq!(ctx.run(2), 2);
    // Delay slot ran, then the loop head.
    assert_eq!(ctx.get_reg(1), 2);
    assert_eq!(ctx.cpu().pc(), LOOP_BASE + 4);
}

#[test]
fn test_sequential_execution_crosses_pages() {
    let mut ctx = TestContext::mips(1).load_program(
        0x8000_1ff8,
        &[addiu(1, 0, 1), addiu(2, 0, 2), addiu(3, 0, 3), addiu(4, 0, 4)],
    );

    assert_eq!(ctx.run(4), 4);
    assert_eq!([1, 2, 3, 4].map(|r| ctx.get_reg(r)), [1, 2, 3, 4]);
    assert_eq!(ctx.cpu().stats.pages_created, 2);
    assert_eq!(ctx.cpu().cached_pages(), 2);
    assert_eq!(ctx.cpu().pc(), 0x8000_2008);
}

#[test]
fn test_capacity_pressure_flushes_whole_cache() {
    let mut config = test_config(1);
    config.cache.max_pages = 1;
    let mut ctx = TestContext::mips_with(&config)
        .load_program(0x8000_1ff8, &[addiu(1, 1, 1), addiu(2, 2, 1)]);
    ctx.poke_words(0x8000_2000, &[addiu(3, 3, 1), j(0x8000_1ff8), NOP]);

    assert_eq!(ctx.run(5), 5);
    assert_eq!(ctx.cpu().stats.pages_created, 2);
    assert_eq!(ctx.cpu().stats.cache_flushes, 1);
    assert_eq!(ctx.cpu().cached_pages(), 1);
    assert_eq!(ctx.cpu().stats.translations, 5);

    // The jump back lands on a page that was flushed.
    assert_eq!(ctx.run(1), 1);
    assert_eq!(ctx.cpu().stats.pages_created, 3);
    assert_eq!(ctx.cpu().stats.cache_flushes, 2);
    assert_eq!(ctx.cpu().stats.translations, 6);
    assert_eq!(ctx.get_reg(1), 2);
}

#[test]
fn test_same_physical_page_is_shared_between_aliases() {
    // kseg0 and kseg1 alias the same physical page.
    let mut ctx = TestContext::mips(1).load_program(LOOP_BASE, &[addiu(1, 1, 1), NOP]);
    assert_eq!(ctx.run(2), 2);

    ctx.cpu_mut().set_pc(0xa000_1000);
    assert_eq!(ctx.run(2), 2);
    assert_eq!(ctx.get_reg(1), 2);
    assert_eq!(ctx.cpu().stats.pages_created, 1);
    assert_eq!(ctx.cpu().stats.translations, 2);
}

#[test]
fn test_quota_zero_and_halted_cpus_do_nothing() {
    let mut ctx = counting_loop();
    let m = &mut ctx.machine;
    assert_eq!(run_burst(&mut m.cpus[0], &mut m.bus, 0), 0);

    m.pause(0).unwrap();
    assert_eq!(run_burst(&mut m.cpus[0], &mut m.bus, 100), 0);
    assert_eq!(m.cpus[0].stats.bursts, 0);
    assert_eq!(m.cpus[0].regs.read(1), 0);
}

#[test]
fn test_burst_counts_instructions() {
    let mut ctx = counting_loop();
    for _ in 0..4 {
        assert_eq!(ctx.run(25), 25);
    }
    assert_eq!(ctx.cpu().stats.instructions, 100);
    assert_eq!(ctx.cpu().stats.bursts, 4);
    assert_eq!(ctx.machine.stats.cycles, 100);
}
