//! # i960 Decode Tests
//!
//! MEMB instructions with a displacement span two words; everything else is
//! one word. Decoding is a pure function of the words it is given.

use crate::common::TestContext;
use crate::common::asm::i960::*;
use dtemu_core::common::{DecodeError, DiagnosticKind};
use dtemu_core::core::dyntrans::{Operand, run_burst};
use dtemu_core::isa::i960::words_needed;
use dtemu_core::{Arch, I960, RunState};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

#[rstest]
#[case::mov(mov_lit(5, 4), "mov")]
#[case::addo(addo(Src::R(4), Src::Lit(1), 5), "addo")]
#[case::cmpo(cmpo(Src::Lit(5), Src::R(4)), "cmpo")]
#[case::halt(HALT, "halt")]
#[case::ret(RET, "ret")]
#[case::b(b(8), "b")]
#[case::call(call(0x100), "call")]
#[case::be(be(-8), "be")]
#[case::st(st(4, g(0), 8), "st")]
#[case::ld(ld(4, g(0), 8), "ld")]
#[case::ctrl_zero(0x0000_0000, "<unimplemented>")]
fn test_mnemonics(#[case] word: u32, #[case] name: &str) {
    assert_eq!(I960::decode(&[word]).name, name);
}

#[rstest]
#[case::mema(ld(4, g(0), 8), 1)]
#[case::reg(mov_lit(5, 4), 1)]
#[case::ctrl(b(8), 1)]
#[case::memb_absolute(lda_abs(4, 0x1234)[0], 2)]
#[case::memb_ip_relative(0x8c00_0000 | 0b0101 << 10 | 1 << 12, 2)]
#[case::memb_abase_only(0x8c00_0000 | 0b0100 << 10 | 1 << 12, 1)]
fn test_words_needed(#[case] word: u32, #[case] words: usize) {
    assert_eq!(words_needed(word), words);
}

#[test]
fn test_two_word_operands() {
    let ic = I960::decode(&lda_abs(g(2), 0x1234_5678));
    assert_eq!(ic.words, 2);
    assert_eq!(ic.arg(0), Operand::Reg(18));
    assert_eq!(ic.arg(3), Operand::Lit(0x1234_5678));
}

#[test]
fn test_literals_and_branch_displacement() {
    let ic = I960::decode(&[addo(Src::Lit(31), Src::R(3), 5)]);
    assert_eq!(ic.arg(0), Operand::Reg(5));
    assert_eq!(ic.arg(1), Operand::Lit(31));
    assert_eq!(ic.arg(2), Operand::Reg(3));

    assert_eq!(I960::decode(&[b(-16)]).arg(0), Operand::PcRelative(-16));
}

#[test]
fn test_lda_executes_as_one_instruction() {
    let mut ctx = TestContext::<I960>::new(1);
    let [w0, w1] = lda_abs(g(2), 0x1234_5678);
    ctx = ctx.load_program(0x1000, &[w0, w1, HALT]);

    assert_eq!(ctx.run(10), 2);
    assert_eq!(ctx.get_reg(18), 0x1234_5678);
    assert_eq!(ctx.cpu().state, RunState::Halted);
    assert_eq!(ctx.cpu().pc(), 0x100c);
    assert_eq!(ctx.cpu().stats.translations, 2);
}

#[test]
fn test_second_word_past_memory_is_truncated() {
    let [w0, _] = lda_abs(g(2), 0);
    let mut ctx = TestContext::<I960>::new(1).load_program(0xf_fffc, &[w0]);
    let m = &mut ctx.machine;

    assert_eq!(run_burst(&mut m.cpus[0], &mut m.bus, 10), 0);
    let diag = m.cpus[0].take_diagnostic().unwrap();
    assert_eq!(diag.pc, 0xf_fffc);
    assert_eq!(
        diag.kind,
        DiagnosticKind::Decode(DecodeError::Truncated { addr: 0x10_0000 })
    );
    assert_eq!(m.cpus[0].pc(), 0xf_fffc);
}

#[test]
fn test_special_function_register_write_is_ignored() {
    let mut ctx = TestContext::<I960>::new(1)
        .load_program(0x1000, &[reg_sfr(0x590, 1, 2, 3), mov_lit(5, g(0))]);
    ctx.set_reg(1, 10);
    ctx.set_reg(2, 20);
    let before = ctx.cpu().regs.clone();

    assert_eq!(ctx.run(1), 1);
    assert_eq!(ctx.cpu().regs, before);
    assert_eq!(ctx.cpu().arch.sfr_writes, 1);

    assert_eq!(ctx.run(1), 1);
    assert_eq!(ctx.get_reg(16), 5);
}

proptest! {
    #[test]
    fn prop_decode_is_deterministic(first in any::<u32>(), second in any::<u32>()) {
        let words = [first, second];
        let words = &words[..words_needed(first)];
        let a = I960::decode(words);
        let b = I960::decode(words);
        prop_assert!(a.binds_same(&b));
        prop_assert!(usize::from(a.words) <= words.len());
    }
}
