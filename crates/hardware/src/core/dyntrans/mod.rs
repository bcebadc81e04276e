//! Dynamic translation ("decode once, replay many").
//!
//! Guest code is decoded lazily into instruction calls (ICs) stored in
//! translation pages, one slot per instruction word. It provides:
//! 1. **ICs:** Handler plus resolved operands ([`ic`]).
//! 2. **Pages:** Per-CPU arena of pages keyed by physical address ([`page`]).
//! 3. **Dispatch:** The burst loop, translate-on-demand and resynchronisation ([`dispatch`]).
//!
//! The dispatch cursor names the running slot and the next one. The next
//! slot is either a plain index into the current page, a request to
//! resynchronise from the program counter, or the abort sentinel.

/// Burst loop and translate-on-demand.
pub mod dispatch;

/// Instruction calls and operands.
pub mod ic;

/// Translation pages and the page cache.
pub mod page;

pub use dispatch::run_burst;
pub use ic::{Handler, Ic, Operand};
pub use page::{PageIndex, TranslationCache, TranslationPage};

use crate::isa::Arch;

/// What the dispatch loop executes next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Next {
    /// Slot index in the current page. Indices past the end continue on the
    /// following virtual page.
    Slot(usize),
    /// Translate the program counter and locate its page.
    Resync,
    /// Leave the burst; the program counter holds the offending instruction.
    Abort,
}

/// Position of the dispatch loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cursor {
    /// Virtual base address of the current page.
    pub vbase: u64,
    /// Current page in the CPU's translation cache.
    pub page: PageIndex,
    /// Slot of the running instruction.
    pub current: usize,
    /// What runs next.
    pub next: Next,
}

impl Cursor {
    /// Virtual base that never equals a page-aligned address.
    pub const INVALID_VBASE: u64 = u64::MAX;
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            vbase: Self::INVALID_VBASE,
            page: 0,
            current: 0,
            next: Next::Resync,
        }
    }
}

/// The IC every fresh slot holds: decode on first execution.
pub fn untranslated<A: Arch>() -> Ic<A> {
    Ic::bare("<untranslated>", dispatch::to_be_translated::<A>)
}
