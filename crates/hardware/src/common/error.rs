//! Fault, diagnostic and error definitions.
//!
//! This module defines the error taxonomy of the emulator core. It provides:
//! 1. **Translation Results:** `Mapping` on success, `Fault` on failure. Faults are
//!    architectural: they turn into guest exceptions and never escape the core.
//! 2. **Decode Errors:** Conditions the dispatch loop cannot execute; they abort the
//!    current burst and surface as a `Diagnostic`.
//! 3. **Structural Errors:** Misconfiguration caught by validation before a burst.
//! 4. **Host Errors:** `SimError` for the loader and the command-line front end.

use std::fmt;

use thiserror::Error;

use super::addr::PhysAddr;
use super::data::AccessType;

/// Reason an address translation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// No TLB entry matches the virtual page and address space.
    Refill,
    /// A matching entry exists but its valid bit is clear.
    Invalid,
    /// A matching valid entry was written while its dirty bit is clear.
    Modify,
    /// The address lies outside every window the current privilege may use,
    /// or is misaligned for the access.
    AddressError,
}

/// A failed translation, carrying everything exception entry needs.
///
/// The translator only reports; delivering the guest-visible exception is the
/// CPU core's job (and is skipped entirely for probes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fault {
    /// Why translation failed.
    pub kind: FaultKind,
    /// The faulting virtual address.
    pub vaddr: u64,
    /// Virtual page-pair number (`vaddr >> 13`) of the faulting address.
    pub vpn2: u64,
    /// Address-space identifier that was active for the lookup.
    pub asid: u8,
    /// Access that faulted.
    pub access: AccessType,
}

impl Fault {
    /// Creates a fault for `vaddr`.
    pub const fn new(kind: FaultKind, vaddr: u64, asid: u8, access: AccessType) -> Self {
        Self {
            kind,
            vaddr,
            vpn2: vaddr >> 13,
            asid,
            access,
        }
    }

    /// Returns `true` when the fault is a TLB refill (no matching entry).
    pub const fn is_refill(&self) -> bool {
        matches!(self.kind, FaultKind::Refill)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} fault on {:?} at {:#x} (asid {})",
            self.kind, self.access, self.vaddr, self.asid
        )
    }
}

/// A successful translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mapping {
    /// Translated physical address.
    pub paddr: PhysAddr,
    /// Whether a store through this mapping is permitted.
    pub writable: bool,
}

impl Mapping {
    /// Identity mapping used by unmapped windows and TLB-less architectures.
    pub const fn identity(addr: u64) -> Self {
        Self {
            paddr: PhysAddr(addr),
            writable: true,
        }
    }
}

/// Outcome of `translate(cpu, vaddr, flags)`.
pub type TranslationResult = Result<Mapping, Fault>;

/// Instruction words the dispatch loop could not turn into an executable call.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The word matches no implemented pattern (reserved or not emulated).
    #[error("unimplemented or reserved opcode {word:#010x}")]
    Unimplemented {
        /// Raw instruction word.
        word: u32,
    },
    /// A multi-word instruction whose trailing word could not be fetched.
    #[error("trailing instruction word at {addr:#x} could not be fetched")]
    Truncated {
        /// Virtual address of the missing word.
        addr: u64,
    },
    /// Instruction fetch translated to a physical address no device backs.
    #[error("instruction fetch from unbacked physical address {paddr:#x}")]
    UnbackedFetch {
        /// Physical address of the fetch.
        paddr: u64,
    },
}

/// Configuration and precondition failures.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),
    /// A machine was requested with no processors.
    #[error("machine needs at least one cpu")]
    NoCpus,
    /// A scheduler burst quota of zero would never make progress.
    #[error("scheduler quota must be non-zero")]
    ZeroQuota,
    /// A tick registration with period zero would fire forever.
    #[error("tick '{name}' registered with a zero period")]
    ZeroTickPeriod {
        /// Name the tick was registered under.
        name: String,
    },
    /// RAM must cover whole pages.
    #[error("ram size {0:#x} is not a non-zero multiple of the page size")]
    RamSize(u64),
    /// TLB size outside the supported range.
    #[error("tlb needs between 1 and {max} entries, got {got}")]
    TlbSize {
        /// Requested entry count.
        got: usize,
        /// Largest supported entry count.
        max: usize,
    },
    /// The translation cache must hold at least one page.
    #[error("translation cache needs at least one page")]
    ZeroCachePages,
    /// Program counter violates the architecture's alignment rule.
    #[error("program counter {pc:#x} is not {align}-byte aligned")]
    MisalignedPc {
        /// Offending program counter.
        pc: u64,
        /// Required alignment in bytes.
        align: u64,
    },
    /// Instruction fetch keeps faulting without ever retiring an instruction.
    #[error("instruction fetch faulted {count} times at {pc:#x} without retiring an instruction")]
    FetchLoop {
        /// Last program counter fetched from.
        pc: u64,
        /// Number of consecutive faults.
        count: u32,
    },
}

/// What a diagnostic is about.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    /// Decode failure; the burst was aborted.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A precondition check blocked the burst.
    #[error(transparent)]
    Structural(#[from] ConfigError),
    /// Execution reached a breakpoint address.
    #[error("breakpoint")]
    Breakpoint,
}

/// A human-visible report escalated by the scheduler to the UI/debugger.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("cpu{cpu} at {pc:#010x}: {kind}")]
pub struct Diagnostic {
    /// Index of the CPU that raised it.
    pub cpu: usize,
    /// Program counter of the offending instruction.
    pub pc: u64,
    /// Classification and detail.
    pub kind: DiagnosticKind,
}

/// Host-level errors from loading images and assembling machines.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Reading an image from disk failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The image is not a usable ELF file.
    #[error("malformed ELF image: {0}")]
    Elf(#[from] object::Error),
    /// The image parses but cannot run on this core.
    #[error("unsupported image: {0}")]
    UnsupportedImage(&'static str),
    /// A CPU index outside the machine.
    #[error("no cpu with index {0}")]
    NoSuchCpu(usize),
    /// The image does not fit in memory backed by the bus.
    #[error("image of {len} bytes at {addr:#x} is outside backed memory")]
    ImageOutOfRange {
        /// Physical load address.
        addr: u64,
        /// Image length in bytes.
        len: usize,
    },
}
