//! Multi-CPU scheduler.
//!
//! One call to [`Scheduler::run_burst`] is one scheduling round:
//! 1. **CPU 0** runs up to `quota` instructions; its committed count is the
//!    round's cycle delta.
//! 2. **Other CPUs** run up to `other_quota` instructions each, in index order.
//! 3. **Ticks** advance by the cycle delta and fire when due.
//!
//! Each burst is preceded by the architecture's validation. Failed validations
//! and diagnostics raised inside bursts are escalated: with a debugger
//! attached the scheduler drops into single-step and yields; headless, the
//! offending CPU is marked dead.

use tracing::{error, info};

use super::machine::Machine;
use crate::common::{Diagnostic, DiagnosticKind, SimError};
use crate::config::Config;
use crate::core::cpu::{Cpu, RunState};
use crate::core::dyntrans::run_burst;
use crate::isa::Arch;
use crate::soc::Bus;

/// Outcome of a scheduling round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    /// At least one CPU is still running.
    Running,
    /// No CPU is running.
    Idle,
    /// Control is yielded to the debugger.
    Break,
}

/// Run controller: quotas, single-step and escalation policy.
#[derive(Debug, Clone)]
pub struct Scheduler {
    quota: u64,
    other_quota: u64,
    step: Option<u64>,
    debugger: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Scheduler {
    /// Creates a scheduler from the `sched` and `general` sections.
    pub fn new(config: &Config) -> Self {
        Self {
            quota: config.sched.quota.max(1),
            other_quota: config.sched.other_quota.max(1),
            step: config.sched.step.filter(|&n| n > 0),
            debugger: config.general.debugger,
            diagnostics: Vec::new(),
        }
    }

    /// Sets the single-step width: `Some(n)` runs `n` instructions per CPU per
    /// round and yields after each round; `None` returns to full quotas.
    pub fn set_step(&mut self, step: Option<u64>) {
        self.step = step.filter(|&n| n > 0);
    }

    /// Current single-step width.
    pub const fn step(&self) -> Option<u64> {
        self.step
    }

    /// Attaches or detaches the debugger collaborator.
    pub const fn set_debugger(&mut self, attached: bool) {
        self.debugger = attached;
    }

    /// Returns `true` when a debugger is attached.
    pub const fn debugger_attached(&self) -> bool {
        self.debugger
    }

    /// Drains the diagnostics escalated so far.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Runs one scheduling round.
    ///
    /// # Returns
    ///
    /// `Break` if the round ended in the debugger (single-step active or a
    /// diagnostic escalated), otherwise `Running` or `Idle`.
    pub fn run_burst<A: Arch>(&mut self, machine: &mut Machine<A>) -> Liveness {
        let mut brk = false;
        let mut cycles = 0;

        for (idx, cpu) in machine.cpus.iter_mut().enumerate() {
            if !cpu.is_running() {
                continue;
            }
            let quota = self
                .step
                .unwrap_or(if idx == 0 { self.quota } else { self.other_quota });
            let (n, escalated) = self.burst(cpu, &mut machine.bus, quota);
            brk |= escalated;
            if idx == 0 {
                cycles = n;
            }
        }

        machine.stats.rounds += 1;
        machine.stats.cycles += cycles;
        machine.stats.ticks_fired += machine
            .ticks
            .advance(cycles, &mut machine.cpus, &mut machine.bus);

        if brk || self.step.is_some() {
            Liveness::Break
        } else if machine.any_running() {
            Liveness::Running
        } else {
            Liveness::Idle
        }
    }

    /// Executes exactly `count` instructions on CPU `cpu` and nothing else.
    ///
    /// Other CPUs do not run. Stepping CPU 0 advances ticks by the count
    /// executed, keeping tick timing tied to CPU 0.
    ///
    /// # Returns
    ///
    /// Instructions executed; fewer than `count` if the CPU halted, faulted
    /// into a diagnostic, or reached a breakpoint.
    pub fn single_step<A: Arch>(
        &mut self,
        machine: &mut Machine<A>,
        cpu: usize,
        count: u64,
    ) -> Result<u64, SimError> {
        let c = machine.cpus.get_mut(cpu).ok_or(SimError::NoSuchCpu(cpu))?;
        if !c.is_running() || count == 0 {
            return Ok(0);
        }
        let (n, _) = self.burst(c, &mut machine.bus, count);
        if cpu == 0 {
            machine.stats.cycles += n;
            machine.stats.ticks_fired += machine
                .ticks
                .advance(n, &mut machine.cpus, &mut machine.bus);
        }
        Ok(n)
    }

    /// Runs rounds until no CPU is running, a round breaks, or `max_rounds` pass.
    pub fn run_until_idle<A: Arch>(
        &mut self,
        machine: &mut Machine<A>,
        max_rounds: Option<u64>,
    ) -> Liveness {
        let mut rounds = 0u64;
        loop {
            let live = self.run_burst(machine);
            rounds += 1;
            if live != Liveness::Running || max_rounds.is_some_and(|m| rounds >= m) {
                return live;
            }
        }
    }

    /// Validates and runs one CPU burst. Returns the count and whether it escalated.
    fn burst<A: Arch>(&mut self, cpu: &mut Cpu<A>, bus: &mut Bus, quota: u64) -> (u64, bool) {
        if let Err(e) = A::validate(cpu) {
            let diag = Diagnostic {
                cpu: cpu.id,
                pc: cpu.pc(),
                kind: DiagnosticKind::Structural(e),
            };
            return (0, self.escalate(cpu, diag));
        }
        let n = run_burst(cpu, bus, quota);
        let escalated = cpu
            .take_diagnostic()
            .is_some_and(|d| self.escalate(cpu, d));
        let _ = cpu.apply_stop_request();
        (n, escalated)
    }

    /// Applies the escalation policy. Returns `true` if control goes to the debugger.
    fn escalate<A: Arch>(&mut self, cpu: &mut Cpu<A>, diag: Diagnostic) -> bool {
        let to_debugger = self.debugger;
        if matches!(diag.kind, DiagnosticKind::Breakpoint) {
            info!(cpu = diag.cpu, pc = format_args!("{:#x}", diag.pc), "breakpoint");
            if !to_debugger {
                cpu.state = RunState::Halted;
            }
        } else if to_debugger {
            error!(%diag, "entering single-step");
            self.step = Some(1);
        } else {
            error!(%diag, "cpu marked dead");
            cpu.state = RunState::Dead;
        }
        self.diagnostics.push(diag);
        to_debugger
    }
}
