//! Instruction calls (ICs).
//!
//! An IC is one decoded guest instruction: a handler function plus up to four
//! operands resolved at decode time. Handlers never look at raw instruction
//! bits; they read `cpu.value(operand)` and write `cpu.set(operand, v)`, so one
//! handler serves every encoding of an operation.

use std::fmt;

use crate::core::cpu::Cpu;
use crate::isa::Arch;
use crate::soc::Bus;

/// Handler bound into an IC.
pub type Handler<A> = fn(&mut Cpu<A>, &mut Bus, &Ic<A>);

/// A decoded operand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Absent, or a destination whose writes are discarded.
    #[default]
    None,
    /// Immediate value (already sign- or zero-extended by the decoder).
    Lit(u64),
    /// General-purpose register index.
    Reg(u8),
    /// Control register index.
    Ctrl(u8),
    /// General-purpose register shifted left by a literal amount.
    Scaled {
        /// Register index.
        reg: u8,
        /// Left shift applied to the register value.
        shift: u8,
    },
    /// Signed offset from the address of the executing instruction.
    PcRelative(i64),
}

impl Operand {
    /// Sign-extends the low `bits` of `raw` into a literal.
    pub const fn simm(raw: u32, bits: u32) -> Self {
        let shift = 64 - bits;
        Self::Lit((((raw as u64) << shift) as i64 >> shift) as u64)
    }

    /// Zero-extended literal.
    pub const fn uimm(raw: u32) -> Self {
        Self::Lit(raw as u64)
    }

    /// Returns the register index if this operand names a general register.
    pub const fn reg(self) -> Option<u8> {
        match self {
            Self::Reg(r) | Self::Scaled { reg: r, .. } => Some(r),
            _ => None,
        }
    }
}

/// One slot of a translation page.
pub struct Ic<A: Arch> {
    /// Function executed when the slot is reached.
    pub handler: Handler<A>,
    /// Resolved operands.
    pub args: [Operand; 4],
    /// Length in 32-bit instruction words.
    pub words: u8,
    /// Mnemonic, for traces and diagnostics.
    pub name: &'static str,
}

impl<A: Arch> Ic<A> {
    /// Binds a one-word instruction.
    pub const fn new(name: &'static str, handler: Handler<A>, args: [Operand; 4]) -> Self {
        Self {
            handler,
            args,
            words: 1,
            name,
        }
    }

    /// Binds an instruction with no operands.
    pub const fn bare(name: &'static str, handler: Handler<A>) -> Self {
        Self::new(name, handler, [Operand::None; 4])
    }

    /// Sets the instruction length in words.
    #[must_use]
    pub const fn with_words(mut self, words: u8) -> Self {
        self.words = words;
        self
    }

    /// Operand `i` (0..4).
    #[inline(always)]
    pub const fn arg(&self, i: usize) -> Operand {
        self.args[i]
    }

    /// Returns `true` if both ICs bind the same handler, operands and length.
    pub fn binds_same(&self, other: &Self) -> bool {
        std::ptr::fn_addr_eq(self.handler, other.handler)
            && self.args == other.args
            && self.words == other.words
            && self.name == other.name
    }
}

impl<A: Arch> Clone for Ic<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: Arch> Copy for Ic<A> {}

impl<A: Arch> fmt::Debug for Ic<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ic")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("words", &self.words)
            .finish_non_exhaustive()
    }
}
