//! # Machine Tests

use crate::common::TestContext;
use crate::common::harness::{TEST_RAM, test_config};
use dtemu_core::common::ConfigError;
use dtemu_core::isa::mips::cp0::{RESET_VECTOR, reg, status};
use dtemu_core::{I960, Machine, Mips, RunState};
use pretty_assertions::assert_eq;

#[test]
fn test_new_machine_is_in_reset_state() {
    let machine = Machine::<Mips>::new(&test_config(3)).unwrap();

    assert_eq!(machine.cpus.len(), 3);
    for (i, cpu) in machine.cpus.iter().enumerate() {
        assert_eq!(cpu.id, i);
        assert_eq!(cpu.state, RunState::Running);
        assert_eq!(cpu.pc(), u64::from(RESET_VECTOR));
        assert_eq!(
            cpu.ctrl.read(reg::STATUS as usize) as u32,
            status::BEV | status::ERL
        );
        assert_eq!(cpu.cached_pages(), 0);
    }
    assert!(machine.bus.is_valid_address(TEST_RAM - 1));
    assert!(!machine.bus.is_valid_address(TEST_RAM));
}

#[test]
fn test_start_pc_overrides_reset_vector() {
    let mut config = test_config(2);
    config.general.start_pc = Some(0x4000);
    let machine = Machine::<I960>::new(&config).unwrap();
    assert!(machine.cpus.iter().all(|c| c.pc() == 0x4000));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = test_config(1);
    config.general.cpus = 0;
    assert_eq!(
        Machine::<Mips>::new(&config).err(),
        Some(ConfigError::NoCpus)
    );
}

#[test]
fn test_tick_registration_validates_period() {
    let mut ctx = TestContext::mips(1);
    assert!(ctx.machine.register_tick("timer", 100, |_| {}).is_ok());
    assert!(matches!(
        ctx.machine.register_tick("broken", 0, |_| {}),
        Err(ConfigError::ZeroTickPeriod { .. })
    ));
    assert_eq!(ctx.machine.ticks.len(), 1);
}

#[test]
fn test_breakpoints_reach_every_cpu() {
    let mut ctx = TestContext::mips(2);
    ctx.machine.set_breakpoints(&[0x8000_1000]);
    for cpu in &ctx.machine.cpus {
        assert_eq!(cpu.stats.cache_flushes, 1);
    }
}

#[test]
fn test_resume_does_not_revive_dead_cpu() {
    let mut ctx = TestContext::mips(1);
    ctx.cpu_mut().state = RunState::Dead;
    ctx.machine.pause(0).unwrap();
    assert_eq!(ctx.cpu().state, RunState::Dead);
    ctx.machine.resume(0).unwrap();
    assert_eq!(ctx.cpu().state, RunState::Dead);
    assert!(!ctx.machine.any_running());
}

#[test]
fn test_stats_report_lists_every_cpu() {
    let ctx = TestContext::mips(2);
    let report = ctx.machine.stats_report(&[]);
    assert!(report.contains("cpu0"));
    assert!(report.contains("cpu1"));
    assert_eq!(ctx.machine.cpu_stats().len(), 2);
}
