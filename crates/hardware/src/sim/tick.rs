//! Periodic hardware events.
//!
//! Devices that need to act "every N cycles" (timers, display refresh,
//! serial polling) register a tick: a named callback with a period in guest
//! cycles. The scheduler advances every countdown by the number of
//! instructions CPU 0 committed in the round; each time a countdown reaches
//! zero or below the callback runs and the countdown is rearmed by one period.
//!
//! A long burst can therefore fire the same tick several times in a row.

use std::fmt;

use crate::common::ConfigError;
use crate::core::cpu::Cpu;
use crate::isa::Arch;
use crate::soc::Bus;

/// Handle returned by tick registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickId(pub usize);

/// What a tick callback may touch.
pub struct TickContext<'a, A: Arch> {
    /// Every CPU of the machine.
    pub cpus: &'a mut [Cpu<A>],
    /// The shared bus.
    pub bus: &'a mut Bus,
}

impl<A: Arch> TickContext<'_, A> {
    /// Asserts interrupt line `line` on CPU `cpu`. Unknown CPUs are ignored.
    pub fn raise_interrupt(&mut self, cpu: usize, line: u32) {
        if let Some(c) = self.cpus.get_mut(cpu) {
            c.raise_interrupt(line);
        }
    }

    /// Deasserts interrupt line `line` on CPU `cpu`.
    pub fn acknowledge_interrupt(&mut self, cpu: usize, line: u32) {
        if let Some(c) = self.cpus.get_mut(cpu) {
            c.acknowledge_interrupt(line);
        }
    }
}

impl<A: Arch> fmt::Debug for TickContext<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickContext")
            .field("cpus", &self.cpus.len())
            .finish_non_exhaustive()
    }
}

/// Tick callback.
pub type TickFn<A> = Box<dyn FnMut(&mut TickContext<'_, A>)>;

struct Tick<A: Arch> {
    name: String,
    period: i64,
    countdown: i64,
    fired: u64,
    callback: TickFn<A>,
}

/// Ordered set of periodic callbacks.
pub struct TickRegistry<A: Arch> {
    ticks: Vec<Tick<A>>,
}

impl<A: Arch> Default for TickRegistry<A> {
    fn default() -> Self {
        Self { ticks: Vec::new() }
    }
}

impl<A: Arch> TickRegistry<A> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` to run every `period` cycles.
    ///
    /// # Arguments
    ///
    /// * `name` - Label for logs and statistics.
    /// * `period` - Cycles between invocations; must be non-zero.
    /// * `callback` - Invoked with the machine's CPUs and bus.
    ///
    /// # Returns
    ///
    /// The tick's handle, or `ConfigError::ZeroTickPeriod`.
    pub fn register(
        &mut self,
        name: &str,
        period: u64,
        callback: TickFn<A>,
    ) -> Result<TickId, ConfigError> {
        if period == 0 {
            return Err(ConfigError::ZeroTickPeriod {
                name: name.to_owned(),
            });
        }
        let period = i64::try_from(period).unwrap_or(i64::MAX);
        self.ticks.push(Tick {
            name: name.to_owned(),
            period,
            countdown: period,
            fired: 0,
            callback,
        });
        Ok(TickId(self.ticks.len() - 1))
    }

    /// Advances every countdown by `cycles`, firing callbacks that come due.
    ///
    /// Ticks are visited in registration order.
    ///
    /// # Returns
    ///
    /// Number of callback invocations.
    pub fn advance(&mut self, cycles: u64, cpus: &mut [Cpu<A>], bus: &mut Bus) -> u64 {
        let delta = i64::try_from(cycles).unwrap_or(i64::MAX);
        let mut fired = 0;
        let mut ctx = TickContext { cpus, bus };
        for tick in &mut self.ticks {
            tick.countdown = tick.countdown.saturating_sub(delta);
            while tick.countdown <= 0 {
                (tick.callback)(&mut ctx);
                tick.countdown = tick.countdown.saturating_add(tick.period);
                tick.fired += 1;
                fired += 1;
            }
        }
        fired
    }

    /// Cycles left until tick `id` fires next.
    pub fn countdown(&self, id: TickId) -> Option<i64> {
        self.ticks.get(id.0).map(|t| t.countdown)
    }

    /// Times tick `id` has fired.
    pub fn fired(&self, id: TickId) -> Option<u64> {
        self.ticks.get(id.0).map(|t| t.fired)
    }

    /// Number of registered ticks.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

impl<A: Arch> fmt::Debug for TickRegistry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.ticks
                    .iter()
                    .map(|t| (t.name.as_str(), t.period, t.countdown)),
            )
            .finish()
    }
}
