//! # MIPS Interrupt Tests
//!
//! Hardware lines 0..5 appear as Cause.IP2..IP7 and the Count/Compare timer
//! drives IP7. Pending interrupts are taken at burst start.

use crate::common::TestContext;
use crate::common::asm::mips::*;
use crate::common::harness::test_config;
use dtemu_core::Liveness;
use dtemu_core::isa::mips::cp0::{cause, reg, status};
use dtemu_core::isa::mips::{ExcCode, live_cause};
use pretty_assertions::assert_eq;

const BASE: u64 = 0x8000_1000;
const VECTOR: u64 = 0x8000_0180;
const IM2: u32 = 1 << 10;
const IM7: u32 = 1 << 15;

fn counting_loop(quota: u64) -> TestContext<dtemu_core::Mips> {
    let mut config = test_config(1);
    config.sched.quota = quota;
    TestContext::mips_with(&config)
        .load_program(BASE, &[addiu(1, 1, 1), j(BASE as u32), NOP])
}

#[test]
fn test_tick_raised_line_enters_handler() {
    let mut ctx = counting_loop(16);
    ctx.poke_words(VECTOR, &[addiu(7, 0, 0x77)]);
    ctx.set_cp0(reg::STATUS, status::IE | IM2);
    let id = ctx
        .machine
        .register_tick("device", 10, |t| t.raise_interrupt(0, 0))
        .unwrap();

    // The tick fires at the end of the first round.
    assert_eq!(ctx.round(), Liveness::Running);
    assert_eq!(ctx.machine.ticks.fired(id), Some(1));
    assert_eq!(ctx.cpu().stats.interrupts, 0);
    assert_eq!(ctx.get_reg(1), 6);

    assert_eq!(ctx.round(), Liveness::Running);
    assert_eq!(ctx.cpu().stats.interrupts, 1);
    assert_eq!(ctx.get_reg(7), 0x77);
    assert_eq!(ctx.get_reg(1), 6);
    assert_eq!(u64::from(ctx.cp0(reg::EPC)), BASE + 4);
    assert_eq!(
        (ctx.cp0(reg::CAUSE) & cause::EXC_MASK) >> cause::EXC_SHIFT,
        ExcCode::Int as u32
    );
    assert_ne!(live_cause(ctx.cpu()) & IM2, 0);
    assert_ne!(ctx.cp0(reg::STATUS) & status::EXL, 0);

    // 32 cycles against a period of 10.
    assert_eq!(ctx.machine.ticks.fired(id), Some(3));
    assert_eq!(ctx.machine.stats.ticks_fired, 3);
}

#[test]
fn test_masked_line_is_not_taken() {
    let mut ctx = counting_loop(16);
    ctx.set_cp0(reg::STATUS, status::IE);
    ctx.machine.raise_interrupt(0, 0).unwrap();

    assert_eq!(ctx.run(5), 5);
    assert_eq!(ctx.cpu().stats.interrupts, 0);
    assert_ne!(live_cause(ctx.cpu()) & IM2, 0);

    // Unmasking makes it visible at the next burst.
    ctx.set_cp0(reg::STATUS, status::IE | IM2);
    assert_eq!(ctx.run(1), 1);
    assert_eq!(ctx.cpu().stats.interrupts, 1);
    assert_eq!(ctx.cpu().pc(), VECTOR + 4);

    // Acknowledged lines drop out of Cause.
    ctx.machine.acknowledge_interrupt(0, 0).unwrap();
    assert_eq!(live_cause(ctx.cpu()) & cause::IP_MASK, 0);
}

#[test]
fn test_count_compare_timer() {
    let mut ctx = counting_loop(16);
    ctx.set_cp0(reg::COMPARE, 20);
    ctx.set_cp0(reg::STATUS, status::IE | IM7);

    assert_eq!(ctx.run(16), 16);
    assert!(!ctx.cpu().arch.timer_pending);
    assert_eq!(ctx.cp0(reg::COUNT), 16);

    assert_eq!(ctx.run(16), 16);
    assert!(ctx.cpu().arch.timer_pending);
    assert_eq!(ctx.cpu().stats.interrupts, 0);

    assert_eq!(ctx.run(1), 1);
    assert_eq!(ctx.cpu().stats.interrupts, 1);
    assert_ne!(live_cause(ctx.cpu()) & cause::IP_TIMER, 0);
    assert_eq!(ctx.cpu().pc(), VECTOR + 4);
}

#[test]
fn test_compare_write_clears_timer() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[mtc0(0, u32::from(reg::COMPARE))]);
    ctx.cpu_mut().arch.timer_pending = true;

    assert_eq!(ctx.run(1), 1);
    assert!(!ctx.cpu().arch.timer_pending);
}

#[test]
fn test_wait_idles_for_rest_of_burst() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[WAIT, addiu(1, 0, 1)]);

    // The whole burst is charged while the guest waits.
    assert_eq!(ctx.run(10), 10);
    assert_eq!(ctx.cpu().pc(), BASE);
    assert_eq!(ctx.get_reg(1), 0);
    assert_eq!(ctx.machine.stats.cycles, 10);

    ctx.set_cp0(reg::STATUS, status::IE | IM2);
    ctx.machine.raise_interrupt(0, 0).unwrap();
    assert_eq!(ctx.run(1), 1);
    assert_eq!(ctx.cpu().stats.interrupts, 1);
    assert_eq!(u64::from(ctx.cp0(reg::EPC)), BASE + 4);
}

#[test]
fn test_return_from_wait_continues_after_it() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[WAIT, addiu(1, 0, 1)]);
    ctx.poke_words(VECTOR, &[NOP, ERET]);

    assert_eq!(ctx.run(4), 4);
    assert_eq!(ctx.cpu().pc(), BASE);

    ctx.set_cp0(reg::STATUS, status::IE | IM2);
    ctx.machine.raise_interrupt(0, 0).unwrap();
    assert_eq!(ctx.run(1), 1);
    assert_eq!(ctx.cpu().pc(), VECTOR + 4);

    ctx.machine.acknowledge_interrupt(0, 0).unwrap();
    assert_eq!(ctx.run(2), 2);
    assert_eq!(ctx.get_reg(1), 1);
    assert_eq!(ctx.cpu().pc(), BASE + 8);
    assert_eq!(ctx.cp0(reg::STATUS) & status::EXL, 0);
}
