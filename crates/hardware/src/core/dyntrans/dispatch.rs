//! The dispatch loop.
//!
//! `run_burst` executes up to `quota` instructions on one CPU by calling the
//! handler bound in each slot in turn. Control flow handlers steer the loop by
//! editing the cursor; the loop itself only:
//! 1. **Crosses pages:** a slot index past the end resynchronises on the next page.
//! 2. **Resynchronises:** translates the program counter for fetch and finds or
//!    creates its translation page, delivering fetch faults as exceptions.
//! 3. **Applies delay slots:** a pending branch target takes effect after the
//!    instruction following the branch.
//! 4. **Polls interrupts:** at burst start and whenever a handler requests it.
//!
//! A decode failure aborts the burst through the abort sentinel. The
//! instruction does not count and the program counter is left on it.

use tracing::trace;

use super::ic::{Ic, Operand};
use super::{Cursor, Next};
use crate::common::constants::{INSN_BYTES, INSN_SHIFT, MAX_FETCH_FAULTS, PAGE_OFFSET_MASK};
use crate::common::{
    AccessFlags, AccessType, ConfigError, DecodeError, Diagnostic, DiagnosticKind, Fault,
    FaultKind, SLOTS_PER_PAGE,
};
use crate::core::cpu::{Cpu, RunState};
use crate::isa::Arch;
use crate::soc::Bus;

/// Runs one burst of at most `quota` instructions.
///
/// # Arguments
///
/// * `cpu` - The CPU to run; nothing happens unless it is `Running`.
/// * `bus` - The system bus.
/// * `quota` - Instruction budget.
///
/// # Returns
///
/// Number of instructions executed. A diagnostic raised during the burst is
/// left in the CPU for the scheduler to collect.
pub fn run_burst<A: Arch>(cpu: &mut Cpu<A>, bus: &mut Bus, quota: u64) -> u64 {
    cpu.executed = 0;
    if cpu.state != RunState::Running || quota == 0 {
        return 0;
    }
    cpu.burst_quota = quota;
    cpu.fetch_faults = 0;
    cpu.stats.bursts += 1;
    if cpu.cursor.next == Next::Abort {
        cpu.cursor.next = Next::Resync;
    }

    poll_interrupts(cpu, bus);

    while cpu.executed < quota && cpu.state == RunState::Running {
        let slot = match cpu.cursor.next {
            Next::Abort => break,
            Next::Resync => {
                resync(cpu, bus);
                continue;
            }
            Next::Slot(s) if s >= SLOTS_PER_PAGE => {
                cpu.pc = cpu.next_pc();
                cpu.cursor.next = Next::Resync;
                continue;
            }
            Next::Slot(s) => s,
        };
        let Some(ic) = cpu.cache.ic(cpu.cursor.page, slot) else {
            cpu.pc = cpu.next_pc();
            cpu.cursor = Cursor::default();
            continue;
        };

        cpu.cursor.current = slot;
        cpu.cursor.next = Next::Slot(slot + ic.words as usize);
        cpu.executed += 1;
        cpu.fetch_faults = 0;
        cpu.idle_resume = None;

        let was_in_slot = cpu.delay.is_some();
        (ic.handler)(cpu, bus, &ic);

        if was_in_slot && cpu.cursor.next != Next::Abort {
            if let Some(target) = cpu.delay.take() {
                cpu.idle_resume = None;
                cpu.branch_to(target);
            }
        }
        if cpu.poll_irq && cpu.delay.is_none() && cpu.cursor.next != Next::Abort {
            poll_interrupts(cpu, bus);
        }
    }

    cpu.sync_pc();
    let executed = cpu.executed;
    cpu.stats.instructions += executed;
    A::after_burst(cpu, executed);
    executed
}

fn poll_interrupts<A: Arch>(cpu: &mut Cpu<A>, bus: &mut Bus) {
    cpu.poll_irq = false;
    if A::interrupt_pending(cpu) {
        match cpu.idle_resume.take() {
            Some(resume) => cpu.jump_resync(resume),
            None => cpu.sync_pc(),
        }
        cpu.stats.interrupts += 1;
        A::take_interrupt(cpu, bus);
    }
}

/// Points the cursor at the page holding the program counter.
fn resync<A: Arch>(cpu: &mut Cpu<A>, bus: &mut Bus) {
    let pc = cpu.pc;
    let result = if pc & (INSN_BYTES - 1) == 0 {
        A::translate(cpu, pc, AccessFlags::FETCH)
    } else {
        Err(Fault::new(FaultKind::AddressError, pc, 0, AccessType::Fetch))
    };

    match result {
        Ok(mapping) => {
            if cpu.cache.find(mapping.paddr).is_none() {
                cpu.stats.pages_created += 1;
                tracing::debug!(
                    cpu = cpu.id,
                    vaddr = format_args!("{:#x}", pc & !PAGE_OFFSET_MASK),
                    paddr = %mapping.paddr.page(),
                    "new translation page"
                );
            }
            let (page, flushed) = cpu.cache.get_or_create(mapping.paddr);
            if flushed {
                cpu.stats.cache_flushes += 1;
            }
            let slot = ((pc & PAGE_OFFSET_MASK) >> INSN_SHIFT) as usize;
            cpu.cursor = Cursor {
                vbase: pc & !PAGE_OFFSET_MASK,
                page,
                current: slot,
                next: Next::Slot(slot),
            };
        }
        Err(fault) => {
            cpu.fetch_faults += 1;
            if cpu.fetch_faults > MAX_FETCH_FAULTS {
                cpu.stats.aborts += 1;
                cpu.cursor.next = Next::Abort;
                cpu.diagnostic = Some(Diagnostic {
                    cpu: cpu.id,
                    pc,
                    kind: ConfigError::FetchLoop {
                        pc,
                        count: cpu.fetch_faults,
                    }
                    .into(),
                });
                return;
            }
            cpu.deliver_fault(bus, &fault);
        }
    }
}

/// Fetches and decodes the instruction at the running slot.
///
/// Returns `None` after aborting the burst with a diagnostic.
fn fetch_decode<A: Arch>(cpu: &mut Cpu<A>, bus: &mut Bus) -> Option<Ic<A>> {
    let pc = cpu.current_pc();
    let slot = cpu.cursor.current;
    let Some(base) = cpu.cache.page(cpu.cursor.page).map(|p| p.paddr().val()) else {
        cpu.executed = cpu.executed.saturating_sub(1);
        cpu.jump_resync(pc);
        return None;
    };

    let paddr = base + ((slot as u64) << INSN_SHIFT);
    if !bus.is_valid_address(paddr) {
        cpu.abort(DecodeError::UnbackedFetch { paddr }.into());
        return None;
    }
    let mut words = [bus.read_u32(paddr), 0];
    let len = A::words_needed(words[0]).clamp(1, words.len());

    if len == 2 {
        let next_vaddr = pc.wrapping_add(INSN_BYTES);
        let next_paddr = if slot + 1 < SLOTS_PER_PAGE {
            Some(paddr + INSN_BYTES)
        } else {
            A::translate(cpu, next_vaddr, AccessFlags::FETCH.probe())
                .ok()
                .map(|m| m.paddr.val())
        };
        match next_paddr.filter(|&p| bus.is_valid_address(p)) {
            Some(p) => words[1] = bus.read_u32(p),
            None => {
                cpu.abort(DecodeError::Truncated { addr: next_vaddr }.into());
                return None;
            }
        }
    }

    let ic = A::decode(&words[..len]);
    cpu.stats.translations += 1;
    if cpu.trace {
        trace!(
            cpu = cpu.id,
            pc = format_args!("{pc:#010x}"),
            word = format_args!("{:#010x}", words[0]),
            insn = ic.name,
            "decode"
        );
    }
    Some(ic)
}

/// Handler bound into every fresh slot.
///
/// Decodes the slot, stores the result, and runs it in the same call. A slot
/// at a breakpoint address is bound to the breakpoint handler instead.
pub fn to_be_translated<A: Arch>(cpu: &mut Cpu<A>, bus: &mut Bus, _ic: &Ic<A>) {
    let pc = cpu.current_pc();
    let (page, slot) = (cpu.cursor.page, cpu.cursor.current);

    if cpu.breakpoints.contains(&pc) {
        let bp = Ic::bare("<breakpoint>", breakpoint_hit::<A>);
        cpu.cache.store(page, slot, bp);
        breakpoint_hit(cpu, bus, &bp);
        return;
    }

    let Some(ic) = fetch_decode(cpu, bus) else {
        return;
    };
    cpu.cache.store(page, slot, ic);
    cpu.cursor.next = Next::Slot(slot + ic.words as usize);
    (ic.handler)(cpu, bus, &ic);
}

/// Stops before a breakpoint address; the next visit executes the instruction once.
fn breakpoint_hit<A: Arch>(cpu: &mut Cpu<A>, bus: &mut Bus, _ic: &Ic<A>) {
    let pc = cpu.current_pc();
    if cpu.bp_skip == Some(pc) {
        cpu.bp_skip = None;
        if let Some(ic) = fetch_decode(cpu, bus) {
            cpu.cursor.next = Next::Slot(cpu.cursor.current + ic.words as usize);
            (ic.handler)(cpu, bus, &ic);
        }
    } else {
        cpu.bp_skip = Some(pc);
        cpu.abort(DiagnosticKind::Breakpoint);
    }
}

/// Handler for words no pattern matches. Carries the raw word as operand 0.
pub fn unimplemented<A: Arch>(cpu: &mut Cpu<A>, _bus: &mut Bus, ic: &Ic<A>) {
    let word = cpu.value(ic.arg(0)) as u32;
    cpu.abort(DecodeError::Unimplemented { word }.into());
}

/// Binds the unimplemented handler for `word`.
pub fn unimplemented_ic<A: Arch>(word: u32) -> Ic<A> {
    Ic::new(
        "<unimplemented>",
        unimplemented::<A>,
        [Operand::uimm(word), Operand::None, Operand::None, Operand::None],
    )
}
