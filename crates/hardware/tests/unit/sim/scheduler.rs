//! # Scheduler Tests
//!
//! A round runs CPU 0 for the main quota and every other CPU for the
//! secondary quota, then advances ticks by CPU 0's count. Diagnostics are
//! escalated according to whether a debugger is attached.

use crate::common::TestContext;
use crate::common::asm::i960::{HALT, mov_lit};
use crate::common::asm::mips::*;
use crate::common::harness::test_config;
use dtemu_core::common::{ConfigError, DiagnosticKind, SimError};
use dtemu_core::{I960, Liveness, Mips, RunState};
use pretty_assertions::assert_eq;

const BASE: u64 = 0x8000_1000;

fn two_cpu_loop() -> TestContext<Mips> {
    let mut config = test_config(2);
    config.sched.quota = 16;
    config.sched.other_quota = 4;
    let mut ctx = TestContext::mips_with(&config)
        .load_program(BASE, &[addiu(1, 1, 1), j(BASE as u32), NOP]);
    ctx.machine.cpus[1].set_pc(BASE);
    ctx
}

#[test]
fn test_round_uses_both_quotas() {
    let mut ctx = two_cpu_loop();

    assert_eq!(ctx.round(), Liveness::Running);
    assert_eq!(ctx.machine.cpus[0].stats.instructions, 16);
    assert_eq!(ctx.machine.cpus[1].stats.instructions, 4);
    assert_eq!(ctx.machine.cpus[0].regs.read(1), 6);
    assert_eq!(ctx.machine.cpus[1].regs.read(1), 2);
    // Only CPU 0 drives time.
    assert_eq!(ctx.machine.stats.cycles, 16);
    assert_eq!(ctx.machine.stats.rounds, 1);
}

#[test]
fn test_single_step_touches_one_cpu() {
    let mut ctx = two_cpu_loop();

    assert_eq!(ctx.step_cpu(1, 5).unwrap(), 5);
    assert_eq!(ctx.machine.cpus[1].regs.read(1), 2);
    assert_eq!(ctx.machine.cpus[0].regs.read(1), 0);
    assert_eq!(ctx.machine.cpus[0].stats.bursts, 0);
    assert_eq!(ctx.machine.stats.cycles, 0);

    assert_eq!(ctx.step_cpu(0, 5).unwrap(), 5);
    assert_eq!(ctx.machine.stats.cycles, 5);
    assert_eq!(ctx.machine.cpus[1].stats.instructions, 5);
}

#[test]
fn test_step_mode_yields_every_round() {
    let mut ctx = two_cpu_loop();
    ctx.sched.set_step(Some(3));

    assert_eq!(ctx.round(), Liveness::Break);
    assert_eq!(ctx.machine.cpus[0].stats.instructions, 3);
    assert_eq!(ctx.machine.cpus[1].stats.instructions, 3);

    ctx.sched.set_step(Some(0));
    assert_eq!(ctx.sched.step(), None);
    assert_eq!(ctx.round(), Liveness::Running);
}

#[test]
fn test_headless_diagnostic_kills_only_offender() {
    let mut ctx = two_cpu_loop();
    ctx.poke_words(0x8000_2000, &[0xfc00_0000]);
    ctx.machine.cpus[1].set_pc(0x8000_2000);

    assert_eq!(ctx.round(), Liveness::Running);
    assert_eq!(ctx.machine.cpus[0].state, RunState::Running);
    assert_eq!(ctx.machine.cpus[1].state, RunState::Dead);
    let diags = ctx.sched.take_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].cpu, 1);

    // Later rounds skip the dead CPU.
    assert_eq!(ctx.round(), Liveness::Running);
    assert!(ctx.sched.take_diagnostics().is_empty());
}

#[test]
fn test_last_cpu_dying_idles_machine() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[0xfc00_0000]);
    assert_eq!(ctx.round(), Liveness::Idle);
    assert!(!ctx.machine.any_running());
}

#[test]
fn test_debugger_gets_control_on_diagnostic() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[addiu(1, 0, 1), 0xfc00_0000]);
    ctx.sched.set_debugger(true);
    assert!(ctx.sched.debugger_attached());

    assert_eq!(ctx.round(), Liveness::Break);
    assert_eq!(ctx.cpu().state, RunState::Running);
    assert_eq!(ctx.sched.step(), Some(1));
    assert_eq!(ctx.cpu().pc(), BASE + 4);
    assert_eq!(ctx.get_reg(1), 1);
    assert_eq!(ctx.sched.take_diagnostics().len(), 1);
}

#[test]
fn test_misaligned_pc_fails_validation() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[NOP]);
    ctx.cpu_mut().set_pc(BASE + 2);

    assert_eq!(ctx.round(), Liveness::Idle);
    assert_eq!(ctx.cpu().state, RunState::Dead);
    assert_eq!(ctx.cpu().stats.bursts, 0);
    let diags = ctx.sched.take_diagnostics();
    assert_eq!(
        diags[0].kind,
        DiagnosticKind::Structural(ConfigError::MisalignedPc {
            pc: BASE + 2,
            align: 4
        })
    );
}

#[test]
fn test_stop_request_applies_after_burst() {
    let mut ctx = two_cpu_loop();
    ctx.machine.stop(0).unwrap();
    assert_eq!(ctx.cpu().state, RunState::Running);

    assert_eq!(ctx.round(), Liveness::Running);
    assert_eq!(ctx.cpu().stats.instructions, 16);
    assert_eq!(ctx.cpu().state, RunState::Halted);
    assert_eq!(ctx.machine.cpus[1].state, RunState::Running);

    // A halted CPU 0 contributes no cycles.
    assert_eq!(ctx.round(), Liveness::Running);
    assert_eq!(ctx.machine.stats.cycles, 16);
}

#[test]
fn test_pause_and_resume() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[addiu(1, 1, 1), j(BASE as u32), NOP]);
    ctx.machine.pause(0).unwrap();
    assert_eq!(ctx.round(), Liveness::Idle);

    ctx.machine.resume(0).unwrap();
    assert_eq!(ctx.round(), Liveness::Running);
    assert!(ctx.get_reg(1) > 0);
}

#[test]
fn test_run_until_idle() {
    let mut ctx = TestContext::mips(1).load_program(BASE, &[addiu(1, 1, 1), j(BASE as u32), NOP]);
    assert_eq!(
        ctx.sched.run_until_idle(&mut ctx.machine, Some(5)),
        Liveness::Running
    );
    assert_eq!(ctx.machine.stats.rounds, 5);

    let mut ctx = TestContext::<I960>::new(1).load_program(0x1000, &[mov_lit(1, 16), HALT]);
    assert_eq!(ctx.sched.run_until_idle(&mut ctx.machine, None), Liveness::Idle);
    assert_eq!(ctx.machine.stats.rounds, 1);
    assert_eq!(ctx.get_reg(16), 1);
}

#[test]
fn test_unknown_cpu_is_an_error() {
    let mut ctx = TestContext::mips(1);
    assert!(matches!(ctx.step_cpu(3, 1), Err(SimError::NoSuchCpu(3))));
    assert!(matches!(ctx.machine.cpu(1), Err(SimError::NoSuchCpu(1))));
    assert!(matches!(
        ctx.machine.raise_interrupt(2, 0),
        Err(SimError::NoSuchCpu(2))
    ));
    assert!(ctx.machine.stop(7).is_err());
}
