//! Simulation layer.
//!
//! Assembles CPUs, the bus and periodic events into a machine and drives it:
//! 1. **Machine:** CPU set, shared bus, tick registry and counters ([`machine`]).
//! 2. **Ticks:** Periodic callbacks timed by CPU 0 ([`tick`]).
//! 3. **Scheduler:** Round-robin bursts, single-step and error escalation ([`scheduler`]).
//! 4. **Loader:** Raw and ELF guest images ([`loader`]).

pub mod loader;
pub mod machine;
pub mod scheduler;
pub mod tick;

pub use machine::Machine;
pub use scheduler::{Liveness, Scheduler};
pub use tick::{TickContext, TickId, TickRegistry};
