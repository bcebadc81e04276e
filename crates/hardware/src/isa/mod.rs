//! Instruction Set Architectures.
//!
//! The execution core is generic over [`Arch`]; an architecture supplies its
//! translator, decoder, exception entry and interrupt model.
//!
//! # Architectures
//!
//! * `mips`: 32-bit little-endian MIPS (R4000-class) with a software-refilled TLB.
//! * `i960`: Intel i960 (KA/CA-class), variable-length instructions, no TLB.

/// Sparse opcode tables shared by the decoders.
pub mod decode;

/// Intel i960.
pub mod i960;

/// MIPS32 (R4000-class).
pub mod mips;

use std::fmt::Debug;

use crate::common::constants::INSN_BYTES;
use crate::common::{AccessFlags, ConfigError, Fault, TranslationResult};
use crate::config::Config;
use crate::core::cpu::Cpu;
use crate::core::dyntrans::Ic;
use crate::soc::Bus;

pub use i960::I960;
pub use mips::Mips;

/// A guest instruction-set architecture.
///
/// Implementors are zero-sized marker types; all state lives in the CPU
/// (`Cpu::regs`, `Cpu::ctrl`, and `Cpu::arch` of type [`Arch::State`]).
pub trait Arch: Sized + 'static {
    /// Architecture-specific CPU state (TLB, HI/LO, ...).
    type State: Debug;
    /// Guest-visible exception kinds.
    type Exception: Debug;

    /// Short name for logs.
    const NAME: &'static str;

    /// Misaligned data accesses raise an address error.
    const STRICT_ALIGNMENT: bool;

    /// Creates the architecture state for a new CPU.
    fn new_state(config: &Config) -> Self::State;

    /// Puts the CPU into its architectural reset state (registers and PC).
    fn reset(cpu: &mut Cpu<Self>);

    /// Translates a virtual address. Never delivers; the caller decides.
    fn translate(cpu: &Cpu<Self>, vaddr: u64, flags: AccessFlags) -> TranslationResult;

    /// Number of 32-bit words the instruction starting with `first` occupies.
    fn words_needed(_first: u32) -> usize {
        1
    }

    /// Binds instruction words to an IC. Unknown words bind the unimplemented handler.
    fn decode(words: &[u32]) -> Ic<Self>;

    /// Maps a translation fault to the exception it raises.
    fn fault_exception(fault: &Fault) -> Self::Exception;

    /// Enters an exception. `cpu.pc()` holds the faulting instruction's address.
    fn enter_exception(cpu: &mut Cpu<Self>, bus: &mut Bus, exc: Self::Exception);

    /// Returns `true` if an interrupt should be taken now.
    fn interrupt_pending(cpu: &Cpu<Self>) -> bool;

    /// Takes the highest-priority pending interrupt.
    fn take_interrupt(cpu: &mut Cpu<Self>, bus: &mut Bus);

    /// Checks that the CPU can run a burst.
    fn validate(cpu: &Cpu<Self>) -> Result<(), ConfigError> {
        if cpu.pc() % INSN_BYTES == 0 {
            Ok(())
        } else {
            Err(ConfigError::MisalignedPc {
                pc: cpu.pc(),
                align: INSN_BYTES,
            })
        }
    }

    /// Physical address an image segment linked at `vaddr` is loaded to.
    fn image_paddr(vaddr: u64) -> u64 {
        vaddr
    }

    /// Runs after every burst with the number of instructions executed.
    fn after_burst(_cpu: &mut Cpu<Self>, _executed: u64) {}
}
