//! Emulation statistics collection and reporting.
//!
//! This module tracks counters for the emulator core. It provides:
//! 1. **Per-CPU counters:** Instructions, bursts, translation-cache activity, exceptions.
//! 2. **Translator counters:** Refill, invalid, modify and address-error faults.
//! 3. **Machine counters:** Scheduling rounds, elapsed reference cycles, tick callbacks fired.
//! 4. **Reporting:** Sectioned text output and `serde` serialization for tooling.

use std::fmt::Write as _;
use std::time::Instant;

use serde::Serialize;

use crate::common::FaultKind;

/// Counters owned by one CPU core.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CpuStats {
    /// Instructions executed (retired) by this CPU.
    pub instructions: u64,
    /// Bursts run by the dispatch loop.
    pub bursts: u64,
    /// Slots decoded by the translate-on-demand handler.
    pub translations: u64,
    /// Translation pages created.
    pub pages_created: u64,
    /// Whole-cache flushes (capacity pressure or explicit reset).
    pub cache_flushes: u64,
    /// Bursts aborted by a decode failure.
    pub aborts: u64,

    /// Synchronous exceptions delivered to the guest.
    pub exceptions: u64,
    /// Interrupts taken.
    pub interrupts: u64,

    /// TLB refill faults.
    pub tlb_refill: u64,
    /// TLB invalid faults.
    pub tlb_invalid: u64,
    /// TLB modify (write to clean page) faults.
    pub tlb_modify: u64,
    /// Address-error faults.
    pub address_errors: u64,
}

impl CpuStats {
    /// Counts a delivered translation fault by kind.
    pub const fn record_fault(&mut self, kind: FaultKind) {
        match kind {
            FaultKind::Refill => self.tlb_refill += 1,
            FaultKind::Invalid => self.tlb_invalid += 1,
            FaultKind::Modify => self.tlb_modify += 1,
            FaultKind::AddressError => self.address_errors += 1,
        }
    }
}

/// Machine-wide counters.
#[derive(Clone, Debug, Serialize)]
pub struct SimStats {
    #[serde(skip)]
    start_time: Instant,
    /// Scheduling rounds completed.
    pub rounds: u64,
    /// Reference cycles elapsed (instructions executed by CPU 0).
    pub cycles: u64,
    /// Tick callbacks fired.
    pub ticks_fired: u64,
}

impl Default for SimStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            rounds: 0,
            cycles: 0,
            ticks_fired: 0,
        }
    }
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"cpu"`, `"translation"`, `"mmu"`.
/// Pass an empty slice to `render_sections` to render all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "cpu", "translation", "mmu"];

const RULE: &str = "==========================================================";
const THIN: &str = "----------------------------------------------------------";

impl SimStats {
    /// Renders the requested statistics sections as text.
    ///
    /// # Arguments
    ///
    /// * `cpus` - Per-CPU counters, in CPU index order.
    /// * `sections` - Section names to include, or empty for all.
    pub fn render_sections(&self, cpus: &[&CpuStats], sections: &[String]) -> String {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let seconds = self.start_time.elapsed().as_secs_f64().max(f64::EPSILON);
        let total: u64 = cpus.iter().map(|c| c.instructions).sum();
        let mut out = String::new();

        let _ = writeln!(out, "\n{RULE}");
        let _ = writeln!(out, "DYNTRANS EMULATION STATISTICS");
        let _ = writeln!(out, "{RULE}");
        if want("summary") {
            let _ = writeln!(out, "host_seconds             {seconds:.4} s");
            let _ = writeln!(out, "sim_rounds               {}", self.rounds);
            let _ = writeln!(out, "sim_cycles               {}", self.cycles);
            let _ = writeln!(out, "sim_insts                {total}");
            let _ = writeln!(out, "sim_ticks_fired          {}", self.ticks_fired);
            let _ = writeln!(
                out,
                "sim_mips                 {:.2}",
                (total as f64 / seconds) / 1_000_000.0
            );
            let _ = writeln!(out, "{THIN}");
        }
        if want("cpu") {
            let _ = writeln!(out, "CPU BREAKDOWN");
            for (i, c) in cpus.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  cpu{i:<3} insts: {:<12} | bursts: {:<8} | exc: {:<8} | irq: {}",
                    c.instructions, c.bursts, c.exceptions, c.interrupts
                );
            }
            let _ = writeln!(out, "{THIN}");
        }
        if want("translation") {
            let _ = writeln!(out, "TRANSLATION CACHE");
            for (i, c) in cpus.iter().enumerate() {
                let per_slot = if c.translations == 0 {
                    0.0
                } else {
                    c.instructions as f64 / c.translations as f64
                };
                let _ = writeln!(
                    out,
                    "  cpu{i:<3} decoded: {:<10} | pages: {:<6} | flushes: {:<4} | aborts: {:<4} | reuse: {per_slot:.1}x",
                    c.translations, c.pages_created, c.cache_flushes, c.aborts
                );
            }
            let _ = writeln!(out, "{THIN}");
        }
        if want("mmu") {
            let _ = writeln!(out, "ADDRESS TRANSLATION");
            for (i, c) in cpus.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  cpu{i:<3} refill: {:<8} | invalid: {:<8} | modify: {:<8} | adel/ades: {}",
                    c.tlb_refill, c.tlb_invalid, c.tlb_modify, c.address_errors
                );
            }
        }
        let _ = writeln!(out, "{RULE}");
        out
    }
}
