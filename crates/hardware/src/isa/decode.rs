//! Sparse opcode tables.
//!
//! Each architecture decodes through an ordered table of `(mask, value, binder)`
//! patterns. The first pattern whose masked bits equal `value` binds the
//! instruction; a word matching nothing binds the unimplemented handler.
//! Decoding is a pure function of the instruction words, so the same words
//! always bind the same handler and operands.

use crate::core::dyntrans::Ic;
use crate::core::dyntrans::dispatch::unimplemented_ic;
use crate::isa::Arch;

/// Builds an IC from the instruction words (first word first).
pub type Binder<A> = fn(&[u32]) -> Ic<A>;

/// One row of an opcode table.
pub struct OpPattern<A: Arch> {
    /// Bits of the first word that identify the instruction.
    pub mask: u32,
    /// Required value of those bits.
    pub value: u32,
    /// Operand resolver for matching words.
    pub bind: Binder<A>,
}

impl<A: Arch> OpPattern<A> {
    /// Returns `true` if `word` matches this pattern.
    #[inline(always)]
    pub const fn matches(&self, word: u32) -> bool {
        word & self.mask == self.value
    }
}

impl<A: Arch> std::fmt::Debug for OpPattern<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpPattern({:#010x}/{:#010x})", self.value, self.mask)
    }
}

/// Decodes `words` against `table`.
///
/// # Arguments
///
/// * `table` - Patterns in priority order.
/// * `words` - Instruction words, first word first.
///
/// # Returns
///
/// The bound IC, or the unimplemented IC carrying the first word. An empty
/// slice binds the unimplemented IC for word zero.
pub fn decode_with<A: Arch>(table: &[OpPattern<A>], words: &[u32]) -> Ic<A> {
    let Some(&first) = words.first() else {
        return unimplemented_ic(0);
    };
    table
        .iter()
        .find(|p| p.matches(first))
        .map_or_else(|| unimplemented_ic(first), |p| (p.bind)(words))
}

/// Extracts `len` bits of `word` starting at bit `lo`.
#[inline(always)]
pub const fn bits(word: u32, lo: u32, len: u32) -> u32 {
    (word >> lo) & ((1 << len) - 1)
}
