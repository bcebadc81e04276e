//! CPU Core Definition.
//!
//! This module defines the architecture-generic CPU core. It provides:
//! 1. **State:** General and control register files, program counter, run state,
//!    pending interrupt lines, and the architecture's own state (`A::State`).
//! 2. **Dispatch Cursor:** Where the dispatch loop is inside the translation cache,
//!    as a page index plus slot indices; the program counter is only materialised
//!    at burst boundaries and when an exception needs it.
//! 3. **Operand Access:** `value`/`set` resolve decoded operands for handlers.
//! 4. **Control Flow:** Intra-page branches, delay slots, resynchronisation and aborts.
//! 5. **Exceptions and Interrupts:** Fault delivery and interrupt line bookkeeping.

/// Guest memory access through the address translator.
pub mod memory;

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::common::constants::{INSN_SHIFT, NUM_CTRL, PAGE_OFFSET_MASK};
use crate::common::{
    AccessFlags, Diagnostic, DiagnosticKind, Fault, RegisterFile, TranslationResult,
};
use crate::config::Config;
use crate::core::dyntrans::page::TranslationCache;
use crate::core::dyntrans::{Cursor, Next};
use crate::core::dyntrans::ic::Operand;
use crate::isa::Arch;
use crate::soc::Bus;
use crate::stats::CpuStats;

/// Run state of a CPU core.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub enum RunState {
    /// Executing instructions each scheduling round.
    #[default]
    Running,
    /// Stopped until resumed or woken by an interrupt.
    Halted,
    /// Stopped after an escalated error; never scheduled again.
    Dead,
}

/// One emulated processor.
pub struct Cpu<A: Arch> {
    /// Index of this CPU in the machine.
    pub id: usize,
    /// General-purpose registers.
    pub regs: RegisterFile,
    /// Control registers (MIPS CP0, i960 AC/PC/TC and friends).
    pub ctrl: RegisterFile<NUM_CTRL>,
    /// Architecture-specific state.
    pub arch: A::State,
    /// Run state.
    pub state: RunState,
    /// Counters.
    pub stats: CpuStats,
    /// Log every decoded instruction.
    pub trace: bool,

    pub(crate) pc: u64,
    pub(crate) cursor: Cursor,
    pub(crate) cache: TranslationCache<A>,
    pub(crate) delay: Option<u64>,
    pub(crate) irq_lines: u64,
    pub(crate) poll_irq: bool,
    pub(crate) executed: u64,
    pub(crate) burst_quota: u64,
    pub(crate) fetch_faults: u32,
    pub(crate) diagnostic: Option<Diagnostic>,
    pub(crate) breakpoints: BTreeSet<u64>,
    pub(crate) bp_skip: Option<u64>,
    pub(crate) idle_resume: Option<u64>,
    pub(crate) stop_requested: bool,
}

impl<A: Arch> Cpu<A> {
    /// Creates a CPU in its architectural reset state.
    ///
    /// # Arguments
    ///
    /// * `id` - Index of the CPU in the machine.
    /// * `config` - Machine configuration (cache size, TLB size, start PC, trace).
    pub fn new(id: usize, config: &Config) -> Self {
        let mut cpu = Self {
            id,
            regs: RegisterFile::new(),
            ctrl: RegisterFile::new(),
            arch: A::new_state(config),
            state: RunState::Running,
            stats: CpuStats::default(),
            trace: config.general.trace,
            pc: 0,
            cursor: Cursor::default(),
            cache: TranslationCache::new(config.cache.max_pages),
            delay: None,
            irq_lines: 0,
            poll_irq: false,
            executed: 0,
            burst_quota: 0,
            fetch_faults: 0,
            diagnostic: None,
            breakpoints: BTreeSet::new(),
            bp_skip: None,
            idle_resume: None,
            stop_requested: false,
        };
        A::reset(&mut cpu);
        if let Some(pc) = config.general.start_pc {
            cpu.set_pc(pc);
        }
        cpu
    }

    /// Program counter of the next instruction to execute.
    ///
    /// Exact between bursts. Inside a handler use [`Cpu::current_pc`].
    pub const fn pc(&self) -> u64 {
        self.pc
    }

    /// Moves execution to `pc`; the next burst resynchronises there.
    pub fn set_pc(&mut self, pc: u64) {
        self.pc = pc;
        self.delay = None;
        self.idle_resume = None;
        self.cursor.vbase = Cursor::INVALID_VBASE;
        self.cursor.next = Next::Resync;
    }

    /// Address of the instruction whose handler is running.
    #[inline(always)]
    pub const fn current_pc(&self) -> u64 {
        self.cursor
            .vbase
            .wrapping_add((self.cursor.current as u64) << INSN_SHIFT)
    }

    /// Address of the instruction after the running one.
    #[inline(always)]
    pub const fn next_pc(&self) -> u64 {
        match self.cursor.next {
            Next::Slot(s) => self.cursor.vbase.wrapping_add((s as u64) << INSN_SHIFT),
            Next::Resync | Next::Abort => self.pc,
        }
    }

    /// Writes the cursor position back into the program counter.
    pub(crate) const fn sync_pc(&mut self) {
        if let Next::Slot(_) = self.cursor.next {
            self.pc = self.next_pc();
        }
    }

    /// Reads an operand.
    #[inline(always)]
    pub fn value(&self, op: Operand) -> u64 {
        match op {
            Operand::None => 0,
            Operand::Lit(v) => v,
            Operand::Reg(r) => self.regs.read(r as usize),
            Operand::Ctrl(c) => self.ctrl.read(c as usize),
            Operand::Scaled { reg, shift } => self.regs.read(reg as usize) << shift,
            Operand::PcRelative(off) => self.current_pc().wrapping_add(off as u64),
        }
    }

    /// Writes an operand. Writes to literals and absent operands are discarded.
    #[inline(always)]
    pub fn set(&mut self, op: Operand, v: u64) {
        match op {
            Operand::Reg(r) => self.regs.write(r as usize, v),
            Operand::Ctrl(c) => self.ctrl.write(c as usize, v),
            Operand::None
            | Operand::Lit(_)
            | Operand::Scaled { .. }
            | Operand::PcRelative(_) => {}
        }
    }

    /// Continues at `target` after the running instruction.
    ///
    /// A target inside the current virtual page only moves the slot index.
    /// Anything else goes through a full resynchronisation, which also
    /// reports misaligned targets.
    #[inline(always)]
    pub fn branch_to(&mut self, target: u64) {
        let aligned = target & ((1 << INSN_SHIFT) - 1) == 0;
        if aligned && target & !PAGE_OFFSET_MASK == self.cursor.vbase {
            self.cursor.next = Next::Slot(((target & PAGE_OFFSET_MASK) >> INSN_SHIFT) as usize);
        } else {
            self.pc = target;
            self.cursor.next = Next::Resync;
        }
    }

    /// Records a taken branch whose target applies after the delay slot.
    pub const fn delay_branch(&mut self, target: u64) {
        self.delay = Some(target);
    }

    /// Returns `true` while a taken branch waits for its delay slot.
    pub const fn in_delay_slot(&self) -> bool {
        self.delay.is_some()
    }

    /// Continues at `target` through a full resynchronisation.
    ///
    /// Used where the translation context may have changed (exception entry,
    /// exception return, mode switches).
    pub fn jump_resync(&mut self, target: u64) {
        self.pc = target;
        self.delay = None;
        self.idle_resume = None;
        self.cursor.vbase = Cursor::INVALID_VBASE;
        self.cursor.next = Next::Resync;
    }

    /// Forces the next instruction through a fresh translation.
    ///
    /// Called after TLB writes and address-space switches so code running
    /// on through the current page observes the new mapping.
    pub fn invalidate_cursor(&mut self) {
        self.pc = self.next_pc();
        self.cursor.vbase = Cursor::INVALID_VBASE;
        self.cursor.next = Next::Resync;
    }

    /// Stays on the running instruction for the rest of the burst.
    ///
    /// Used by wait-for-interrupt instructions: the burst is charged in full so
    /// ticks keep advancing while the guest idles. An interrupt taken while
    /// idling resumes past the instruction, so the exception return address
    /// is the following instruction.
    pub const fn idle(&mut self) {
        self.idle_resume = Some(self.next_pc());
        self.cursor.next = Next::Slot(self.cursor.current);
        if self.executed < self.burst_quota {
            self.executed = self.burst_quota;
        }
    }

    /// Halts the CPU until it is resumed or an interrupt is raised.
    pub fn halt(&mut self) {
        self.sync_pc();
        self.state = RunState::Halted;
        debug!(cpu = self.id, pc = format_args!("{:#x}", self.pc), "halted");
    }

    /// Aborts the burst at the running instruction.
    ///
    /// The instruction does not count, the program counter stays on it, and the
    /// dispatch loop exits through the abort sentinel.
    pub fn abort(&mut self, kind: DiagnosticKind) {
        self.executed = self.executed.saturating_sub(1);
        self.pc = self.current_pc();
        self.cursor.next = Next::Abort;
        self.stats.aborts += 1;
        self.diagnostic = Some(Diagnostic {
            cpu: self.id,
            pc: self.pc,
            kind,
        });
    }

    /// Raises a synchronous exception for the running instruction.
    pub fn raise_exception(&mut self, bus: &mut Bus, exc: A::Exception) {
        self.pc = self.current_pc();
        self.enter_exception(bus, exc);
    }

    /// Enters an exception with `pc` already holding the faulting address.
    pub(crate) fn enter_exception(&mut self, bus: &mut Bus, exc: A::Exception) {
        self.stats.exceptions += 1;
        debug!(
            cpu = self.id,
            pc = format_args!("{:#x}", self.pc),
            exception = ?exc,
            "exception entry"
        );
        A::enter_exception(self, bus, exc);
    }

    /// Delivers a translation fault with `pc` already holding the faulting address.
    pub(crate) fn deliver_fault(&mut self, bus: &mut Bus, fault: &Fault) {
        self.stats.record_fault(fault.kind);
        self.enter_exception(bus, A::fault_exception(fault));
    }

    /// Translates a virtual address without delivering anything.
    ///
    /// # Arguments
    ///
    /// * `vaddr` - Virtual address.
    /// * `flags` - Access kind and probe bit.
    ///
    /// # Returns
    ///
    /// The mapping, or the fault the access would raise.
    pub fn translate(&self, vaddr: u64, flags: AccessFlags) -> TranslationResult {
        A::translate(self, vaddr, flags)
    }

    /// Reads guest memory through a probe translation, for debuggers and dumps.
    ///
    /// # Returns
    ///
    /// `None` if any byte is unmapped or unbacked. Guest state is never touched.
    pub fn read_virtual_probe(&self, bus: &mut Bus, vaddr: u64, len: usize) -> Option<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        let mut addr = vaddr;
        let end = vaddr.checked_add(len as u64)?;
        while addr < end {
            let page_end = (addr | PAGE_OFFSET_MASK).saturating_add(1).min(end);
            let mapping = A::translate(self, addr, AccessFlags::READ.probe()).ok()?;
            out.extend(bus.read_bytes(mapping.paddr.val(), (page_end - addr) as usize)?);
            addr = page_end;
        }
        Some(out)
    }

    /// Asserts interrupt line `line` (0..64). Wakes a halted CPU.
    pub fn raise_interrupt(&mut self, line: u32) {
        if line < u64::BITS {
            self.irq_lines |= 1 << line;
            self.poll_irq = true;
            if self.state == RunState::Halted {
                self.state = RunState::Running;
            }
        }
    }

    /// Deasserts interrupt line `line`.
    pub const fn acknowledge_interrupt(&mut self, line: u32) {
        if line < u64::BITS {
            self.irq_lines &= !(1 << line);
        }
    }

    /// Bitmask of asserted interrupt lines.
    pub const fn pending_lines(&self) -> u64 {
        self.irq_lines
    }

    /// Asks the dispatch loop to re-check interrupts after the running instruction.
    pub const fn request_interrupt_poll(&mut self) {
        self.poll_irq = true;
    }

    /// Asks the scheduler to stop this CPU at the end of its current burst.
    pub const fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Applies a pending stop request. Returns `true` if the CPU was stopped.
    pub(crate) fn apply_stop_request(&mut self) -> bool {
        if !self.stop_requested {
            return false;
        }
        self.stop_requested = false;
        if self.state == RunState::Running {
            self.state = RunState::Halted;
            debug!(cpu = self.id, pc = format_args!("{:#x}", self.pc), "stopped");
        }
        true
    }

    /// Discards every translation page of this CPU.
    ///
    /// Every instruction reached afterwards is decoded again, once.
    pub fn reset_translation_cache(&mut self) {
        self.sync_pc();
        self.cache.clear();
        self.stats.cache_flushes += 1;
        self.cursor = Cursor::default();
        debug!(cpu = self.id, "translation cache reset");
    }

    /// Replaces the breakpoint set and discards translations bound against the old one.
    pub fn set_breakpoints(&mut self, addrs: &BTreeSet<u64>) {
        self.breakpoints.clone_from(addrs);
        self.bp_skip = None;
        self.reset_translation_cache();
    }

    /// Number of translation pages currently cached.
    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    /// Takes the diagnostic raised by the last burst, if any.
    pub fn take_diagnostic(&mut self) -> Option<Diagnostic> {
        self.diagnostic.take()
    }

    /// Returns `true` when the CPU takes part in scheduling.
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }
}

impl<A: Arch> fmt::Debug for Cpu<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cpu")
            .field("id", &self.id)
            .field("arch", &A::NAME)
            .field("pc", &format_args!("{:#x}", self.pc))
            .field("state", &self.state)
            .field("regs", &self.regs)
            .field("ctrl", &self.ctrl)
            .field("arch_state", &self.arch)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
