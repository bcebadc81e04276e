//! The emulated machine.
//!
//! A machine is an ordered set of CPU cores of one architecture sharing a
//! single bus, plus the tick registry. It owns no run-control policy; the
//! [`Scheduler`](super::Scheduler) decides who runs and for how long.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info};

use super::tick::{TickContext, TickId, TickRegistry};
use crate::common::{ConfigError, SimError};
use crate::config::Config;
use crate::core::cpu::{Cpu, RunState};
use crate::isa::Arch;
use crate::soc::{Bus, Memory};
use crate::stats::{CpuStats, SimStats};

/// CPUs, bus and periodic events of one emulated system.
pub struct Machine<A: Arch> {
    /// CPU cores; index 0 is the timing reference.
    pub cpus: Vec<Cpu<A>>,
    /// The shared physical bus.
    pub bus: Bus,
    /// Periodic callbacks.
    pub ticks: TickRegistry<A>,
    /// Machine-wide counters.
    pub stats: SimStats,
}

impl<A: Arch> Machine<A> {
    /// Builds a machine from a validated configuration.
    ///
    /// The bus gets one RAM device covering `memory.ram_base ..
    /// memory.ram_base + memory.ram_size`; every CPU starts in its
    /// architectural reset state (or at `general.start_pc`).
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut bus = Bus::new();
        let size = usize::try_from(config.memory.ram_size)
            .map_err(|_| ConfigError::RamSize(config.memory.ram_size))?;
        bus.add_device(Box::new(Memory::new(config.memory.ram_base, size)));

        let cpus = (0..config.general.cpus)
            .map(|id| Cpu::new(id, config))
            .collect();
        info!(
            arch = A::NAME,
            cpus = config.general.cpus,
            ram = format_args!("{:#x}+{:#x}", config.memory.ram_base, config.memory.ram_size),
            "machine created"
        );

        Ok(Self {
            cpus,
            bus,
            ticks: TickRegistry::new(),
            stats: SimStats::default(),
        })
    }

    /// Registers a periodic callback driven by CPU 0's committed instructions.
    pub fn register_tick<F>(&mut self, name: &str, period: u64, callback: F) -> Result<TickId, ConfigError>
    where
        F: FnMut(&mut TickContext<'_, A>) + 'static,
    {
        let id = self.ticks.register(name, period, Box::new(callback))?;
        debug!(tick = name, period, "tick registered");
        Ok(id)
    }

    /// Returns CPU `idx`.
    pub fn cpu(&self, idx: usize) -> Result<&Cpu<A>, SimError> {
        self.cpus.get(idx).ok_or(SimError::NoSuchCpu(idx))
    }

    /// Returns CPU `idx` mutably.
    pub fn cpu_mut(&mut self, idx: usize) -> Result<&mut Cpu<A>, SimError> {
        self.cpus.get_mut(idx).ok_or(SimError::NoSuchCpu(idx))
    }

    /// Asserts interrupt line `line` on CPU `cpu`.
    pub fn raise_interrupt(&mut self, cpu: usize, line: u32) -> Result<(), SimError> {
        self.cpu_mut(cpu)?.raise_interrupt(line);
        Ok(())
    }

    /// Deasserts interrupt line `line` on CPU `cpu`.
    pub fn acknowledge_interrupt(&mut self, cpu: usize, line: u32) -> Result<(), SimError> {
        self.cpu_mut(cpu)?.acknowledge_interrupt(line);
        Ok(())
    }

    /// Requests that CPU `cpu` stop; the scheduler applies it after the CPU's next burst.
    pub fn stop(&mut self, cpu: usize) -> Result<(), SimError> {
        self.cpu_mut(cpu)?.request_stop();
        Ok(())
    }

    /// Halts CPU `cpu` immediately.
    pub fn pause(&mut self, cpu: usize) -> Result<(), SimError> {
        let c = self.cpu_mut(cpu)?;
        if c.state == RunState::Running {
            c.state = RunState::Halted;
        }
        Ok(())
    }

    /// Resumes a halted CPU. Dead CPUs stay dead.
    pub fn resume(&mut self, cpu: usize) -> Result<(), SimError> {
        let c = self.cpu_mut(cpu)?;
        if c.state == RunState::Halted {
            c.state = RunState::Running;
        }
        Ok(())
    }

    /// Replaces the breakpoint set of every CPU.
    ///
    /// Every translation cache is reset so breakpoint slots bind on the next visit.
    pub fn set_breakpoints(&mut self, addrs: &[u64]) {
        let set: BTreeSet<u64> = addrs.iter().copied().collect();
        for cpu in &mut self.cpus {
            cpu.set_breakpoints(&set);
        }
    }

    /// Discards the translation cache of every CPU.
    pub fn reset_translation_caches(&mut self) {
        for cpu in &mut self.cpus {
            cpu.reset_translation_cache();
        }
    }

    /// Returns `true` while any CPU is running.
    pub fn any_running(&self) -> bool {
        self.cpus.iter().any(Cpu::is_running)
    }

    /// Per-CPU counters in CPU order.
    pub fn cpu_stats(&self) -> Vec<&CpuStats> {
        self.cpus.iter().map(|c| &c.stats).collect()
    }

    /// Renders the statistics report (`sections` empty for all).
    pub fn stats_report(&self, sections: &[String]) -> String {
        self.stats.render_sections(&self.cpu_stats(), sections)
    }
}

impl<A: Arch> fmt::Debug for Machine<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("arch", &A::NAME)
            .field("cpus", &self.cpus)
            .field("bus", &self.bus)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}
