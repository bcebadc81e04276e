//! i960 opcode table.
//!
//! Four formats share the top opcode byte:
//!
//! | opcode      | format | layout                                              |
//! |-------------|--------|-----------------------------------------------------|
//! | `0x00-0x1f` | CTRL   | 24-bit word displacement                            |
//! | `0x20-0x3f` | COBR   | src1 (reg or literal), src2, 13-bit displacement    |
//! | `0x40-0x7f` | REG    | opcode extended by bits 10..7, src1, src2, src/dst  |
//! | `0x80-0xff` | MEM    | MEMA (12-bit offset) or MEMB (optional second word) |
//!
//! Literals (M1/M2 set) are the register field's value, 0..31. A REG
//! instruction whose destination selects a special function register (M3 set)
//! binds to a handler that warns and does nothing.

use super::I960;
use super::exec;
use crate::core::dyntrans::dispatch::unimplemented_ic;
use crate::core::dyntrans::{Handler, Ic, Operand};
use crate::isa::decode::{OpPattern, bits, decode_with};

const TOP: u32 = 0xff00_0000;
const REG: u32 = 0xff00_0780;

const N: Operand = Operand::None;

const fn top(op: u32) -> u32 {
    op << 24
}

/// REG-format pattern value for the 12-bit opcode `op`.
const fn reg_op(op: u32) -> u32 {
    ((op >> 4) << 24) | ((op & 0xf) << 7)
}

fn lit(v: u32) -> Operand {
    Operand::uimm(v)
}

fn src_dst(w: u32) -> u8 {
    bits(w, 19, 5) as u8
}

fn reg_src1(w: u32) -> Operand {
    if w & (1 << 11) != 0 {
        lit(bits(w, 0, 5))
    } else {
        Operand::Reg(bits(w, 0, 5) as u8)
    }
}

fn reg_src2(w: u32) -> Operand {
    if w & (1 << 12) != 0 {
        lit(bits(w, 14, 5))
    } else {
        Operand::Reg(bits(w, 14, 5) as u8)
    }
}

const fn sfr_dst(w: u32) -> bool {
    w & (1 << 13) != 0
}

/// `dst = f(src1, src2)`.
fn reg3(name: &'static str, h: Handler<I960>, w: u32) -> Ic<I960> {
    if sfr_dst(w) {
        return Ic::bare(name, exec::sfr_write);
    }
    Ic::new(name, h, [Operand::Reg(src_dst(w)), reg_src1(w), reg_src2(w), N])
}

/// Compare-style operations with no destination.
fn reg_cmp(name: &'static str, h: Handler<I960>, w: u32) -> Ic<I960> {
    Ic::new(name, h, [N, reg_src1(w), reg_src2(w), N])
}

/// Register moves of `n` consecutive registers.
fn reg_mov(name: &'static str, n: u32, w: u32) -> Ic<I960> {
    if sfr_dst(w) {
        return Ic::bare(name, exec::sfr_write);
    }
    Ic::new(name, exec::mov, [Operand::Reg(src_dst(w)), reg_src1(w), lit(n), N])
}

fn ctrl_disp(w: u32) -> Operand {
    Operand::PcRelative(i64::from(((w & 0x00ff_fffc) << 8) as i32 >> 8))
}

fn cobr_disp(w: u32) -> Operand {
    Operand::PcRelative(i64::from(((w & 0x1ffc) << 19) as i32 >> 19))
}

fn cobr_src1(w: u32) -> Operand {
    if w & (1 << 13) != 0 {
        lit(bits(w, 19, 5))
    } else {
        Operand::Reg(bits(w, 19, 5) as u8)
    }
}

fn cobr_src2(w: u32) -> Operand {
    Operand::Reg(bits(w, 14, 5) as u8)
}

/// Conditional branch on the condition code; the mask is the opcode's low 3 bits.
fn ctrl_cond(name: &'static str, w: u32) -> Ic<I960> {
    Ic::new(name, exec::bcc, [ctrl_disp(w), N, N, lit(bits(w, 24, 3))])
}

/// `test*`: the register named by src1 receives the condition outcome.
fn cobr_test(name: &'static str, w: u32) -> Ic<I960> {
    Ic::new(
        name,
        exec::test,
        [Operand::Reg(bits(w, 19, 5) as u8), N, N, lit(bits(w, 24, 3))],
    )
}

/// Compare-and-branch; the mask is the opcode's low 3 bits.
fn cobr_cmp(name: &'static str, h: Handler<I960>, w: u32) -> Ic<I960> {
    Ic::new(name, h, [cobr_src1(w), cobr_src2(w), cobr_disp(w), lit(bits(w, 24, 3))])
}

/// Effective-address operands `[base, index, displacement]`.
///
/// Absent parts bind to `Operand::None`, which reads as zero.
fn mem_ea(words: &[u32]) -> [Operand; 3] {
    let w = words[0];
    let abase = Operand::Reg(bits(w, 14, 5) as u8);
    let second = || lit(words.get(1).copied().unwrap_or(0));
    if w & (1 << 12) == 0 {
        let offset = lit(bits(w, 0, 12));
        return if w & (1 << 13) == 0 {
            [N, N, offset]
        } else {
            [abase, N, offset]
        };
    }
    let index = Operand::Scaled {
        reg: bits(w, 0, 5) as u8,
        shift: bits(w, 7, 3) as u8,
    };
    match bits(w, 10, 4) {
        0b0100 => [abase, N, N],
        0b0101 => [Operand::PcRelative(8), N, second()],
        0b0111 => [abase, index, N],
        0b1100 => [N, N, second()],
        0b1101 => [abase, N, second()],
        0b1110 => [N, index, second()],
        0b1111 => [abase, index, second()],
        _ => [N, N, N],
    }
}

/// Reserved MEMB addressing modes.
const fn mem_reserved(w: u32) -> bool {
    w & (1 << 12) != 0 && matches!(bits(w, 10, 4), 0b0110 | 0b1000..=0b1011)
}

/// MEM-format instruction; operand 0 is the register, 1..3 the address parts.
fn mem(name: &'static str, h: Handler<I960>, words: &[u32]) -> Ic<I960> {
    let w = words[0];
    if mem_reserved(w) {
        return unimplemented_ic(w);
    }
    let [base, index, disp] = mem_ea(words);
    let len = super::words_needed(w) as u8;
    Ic::new(name, h, [Operand::Reg(src_dst(w)), base, index, disp]).with_words(len)
}

static TABLE: &[OpPattern<I960>] = &[
    // CTRL
    OpPattern { mask: TOP, value: top(0x08), bind: |w| Ic::new("b", exec::b, [ctrl_disp(w[0]), N, N, N]) },
    OpPattern { mask: TOP, value: top(0x09), bind: |w| Ic::new("call", exec::call, [ctrl_disp(w[0]), N, N, N]) },
    OpPattern { mask: TOP, value: top(0x0a), bind: |_| Ic::bare("ret", exec::ret) },
    OpPattern {
        mask: TOP,
        value: top(0x0b),
        bind: |w| Ic::new("bal", exec::bal, [ctrl_disp(w[0]), Operand::Reg(super::reg::G14), N, N]),
    },
    OpPattern { mask: TOP, value: top(0x10), bind: |w| ctrl_cond("bno", w[0]) },
    OpPattern { mask: TOP, value: top(0x11), bind: |w| ctrl_cond("bg", w[0]) },
    OpPattern { mask: TOP, value: top(0x12), bind: |w| ctrl_cond("be", w[0]) },
    OpPattern { mask: TOP, value: top(0x13), bind: |w| ctrl_cond("bge", w[0]) },
    OpPattern { mask: TOP, value: top(0x14), bind: |w| ctrl_cond("bl", w[0]) },
    OpPattern { mask: TOP, value: top(0x15), bind: |w| ctrl_cond("bne", w[0]) },
    OpPattern { mask: TOP, value: top(0x16), bind: |w| ctrl_cond("ble", w[0]) },
    OpPattern { mask: TOP, value: top(0x17), bind: |w| ctrl_cond("bo", w[0]) },
    // COBR
    OpPattern { mask: TOP, value: top(0x20), bind: |w| cobr_test("testno", w[0]) },
    OpPattern { mask: TOP, value: top(0x21), bind: |w| cobr_test("testg", w[0]) },
    OpPattern { mask: TOP, value: top(0x22), bind: |w| cobr_test("teste", w[0]) },
    OpPattern { mask: TOP, value: top(0x23), bind: |w| cobr_test("testge", w[0]) },
    OpPattern { mask: TOP, value: top(0x24), bind: |w| cobr_test("testl", w[0]) },
    OpPattern { mask: TOP, value: top(0x25), bind: |w| cobr_test("testne", w[0]) },
    OpPattern { mask: TOP, value: top(0x26), bind: |w| cobr_test("testle", w[0]) },
    OpPattern { mask: TOP, value: top(0x27), bind: |w| cobr_test("testo", w[0]) },
    OpPattern { mask: TOP, value: top(0x30), bind: |w| cobr_cmp("bbc", exec::bbc, w[0]) },
    OpPattern { mask: TOP, value: top(0x31), bind: |w| cobr_cmp("cmpobg", exec::cmpob, w[0]) },
    OpPattern { mask: TOP, value: top(0x32), bind: |w| cobr_cmp("cmpobe", exec::cmpob, w[0]) },
    OpPattern { mask: TOP, value: top(0x33), bind: |w| cobr_cmp("cmpobge", exec::cmpob, w[0]) },
    OpPattern { mask: TOP, value: top(0x34), bind: |w| cobr_cmp("cmpobl", exec::cmpob, w[0]) },
    OpPattern { mask: TOP, value: top(0x35), bind: |w| cobr_cmp("cmpobne", exec::cmpob, w[0]) },
    OpPattern { mask: TOP, value: top(0x36), bind: |w| cobr_cmp("cmpoble", exec::cmpob, w[0]) },
    OpPattern { mask: TOP, value: top(0x37), bind: |w| cobr_cmp("bbs", exec::bbs, w[0]) },
    OpPattern { mask: TOP, value: top(0x38), bind: |w| cobr_cmp("cmpibno", exec::cmpib, w[0]) },
    OpPattern { mask: TOP, value: top(0x39), bind: |w| cobr_cmp("cmpibg", exec::cmpib, w[0]) },
    OpPattern { mask: TOP, value: top(0x3a), bind: |w| cobr_cmp("cmpibe", exec::cmpib, w[0]) },
    OpPattern { mask: TOP, value: top(0x3b), bind: |w| cobr_cmp("cmpibge", exec::cmpib, w[0]) },
    OpPattern { mask: TOP, value: top(0x3c), bind: |w| cobr_cmp("cmpibl", exec::cmpib, w[0]) },
    OpPattern { mask: TOP, value: top(0x3d), bind: |w| cobr_cmp("cmpibne", exec::cmpib, w[0]) },
    OpPattern { mask: TOP, value: top(0x3e), bind: |w| cobr_cmp("cmpible", exec::cmpib, w[0]) },
    OpPattern { mask: TOP, value: top(0x3f), bind: |w| cobr_cmp("cmpibo", exec::cmpib, w[0]) },
    // REG: logic
    OpPattern { mask: REG, value: reg_op(0x580), bind: |w| reg3("notbit", exec::notbit, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x581), bind: |w| reg3("and", exec::and, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x582), bind: |w| reg3("andnot", exec::andnot, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x583), bind: |w| reg3("setbit", exec::setbit, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x584), bind: |w| reg3("notand", exec::notand, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x586), bind: |w| reg3("xor", exec::xor, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x587), bind: |w| reg3("or", exec::or, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x588), bind: |w| reg3("nor", exec::nor, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x589), bind: |w| reg3("xnor", exec::xnor, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x58a), bind: |w| reg3("not", exec::not, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x58b), bind: |w| reg3("ornot", exec::ornot, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x58c), bind: |w| reg3("clrbit", exec::clrbit, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x58d), bind: |w| reg3("notor", exec::notor, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x58e), bind: |w| reg3("nand", exec::nand, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x58f), bind: |w| reg3("alterbit", exec::alterbit, w[0]) },
    // REG: arithmetic and shifts
    OpPattern { mask: REG, value: reg_op(0x590), bind: |w| reg3("addo", exec::addo, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x591), bind: |w| reg3("addi", exec::addi, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x592), bind: |w| reg3("subo", exec::subo, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x593), bind: |w| reg3("subi", exec::subi, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x598), bind: |w| reg3("shro", exec::shro, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x59a), bind: |w| reg3("shrdi", exec::shrdi, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x59b), bind: |w| reg3("shri", exec::shri, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x59c), bind: |w| reg3("shlo", exec::shlo, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x59d), bind: |w| reg3("rotate", exec::rotate, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x59e), bind: |w| reg3("shli", exec::shlo, w[0]) },
    // REG: compares
    OpPattern { mask: REG, value: reg_op(0x5a0), bind: |w| reg_cmp("cmpo", exec::cmpo, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5a1), bind: |w| reg_cmp("cmpi", exec::cmpi, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5a2), bind: |w| reg_cmp("concmpo", exec::concmpo, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5a3), bind: |w| reg_cmp("concmpi", exec::concmpi, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5a4), bind: |w| reg3("cmpinco", exec::cmpinco, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5a5), bind: |w| reg3("cmpinci", exec::cmpinci, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5a6), bind: |w| reg3("cmpdeco", exec::cmpdeco, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5a7), bind: |w| reg3("cmpdeci", exec::cmpdeci, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5ac), bind: |w| reg_cmp("scanbyte", exec::scanbyte, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5ae), bind: |w| reg_cmp("chkbit", exec::chkbit, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5b0), bind: |w| reg3("addc", exec::addc, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5b2), bind: |w| reg3("subc", exec::subc, w[0]) },
    // REG: moves
    OpPattern { mask: REG, value: reg_op(0x5cc), bind: |w| reg_mov("mov", 1, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5dc), bind: |w| reg_mov("movl", 2, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5ec), bind: |w| reg_mov("movt", 3, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x5fc), bind: |w| reg_mov("movq", 4, w[0]) },
    // REG: atomics, bit fields, controls
    OpPattern { mask: REG, value: reg_op(0x610), bind: |w| reg3("atmod", exec::atmod, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x612), bind: |w| reg3("atadd", exec::atadd, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x640), bind: |w| reg3("spanbit", exec::spanbit, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x641), bind: |w| reg3("scanbit", exec::scanbit, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x645), bind: |w| reg3("modac", exec::modac, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x650), bind: |w| reg3("modify", exec::modify, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x651), bind: |w| reg3("extract", exec::extract, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x654), bind: |w| reg3("modtc", exec::modtc, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x655), bind: |w| reg3("modpc", exec::modpc, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x65d), bind: |_| Ic::bare("halt", exec::halt) },
    OpPattern { mask: REG, value: reg_op(0x66b), bind: |_| Ic::bare("mark", exec::nop) },
    OpPattern { mask: REG, value: reg_op(0x66c), bind: |_| Ic::bare("fmark", exec::nop) },
    OpPattern { mask: REG, value: reg_op(0x66d), bind: |_| Ic::bare("flushreg", exec::nop) },
    OpPattern { mask: REG, value: reg_op(0x66f), bind: |_| Ic::bare("syncf", exec::nop) },
    // REG: multiply and divide
    OpPattern { mask: REG, value: reg_op(0x670), bind: |w| reg3("emul", exec::emul, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x671), bind: |w| reg3("ediv", exec::ediv, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x701), bind: |w| reg3("mulo", exec::mulo, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x708), bind: |w| reg3("remo", exec::remo, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x70b), bind: |w| reg3("divo", exec::divo, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x741), bind: |w| reg3("muli", exec::muli, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x748), bind: |w| reg3("remi", exec::remi, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x749), bind: |w| reg3("modi", exec::modi, w[0]) },
    OpPattern { mask: REG, value: reg_op(0x74b), bind: |w| reg3("divi", exec::divi, w[0]) },
    // MEM
    OpPattern { mask: TOP, value: top(0x80), bind: |w| mem("ldob", exec::ldob, w) },
    OpPattern { mask: TOP, value: top(0x82), bind: |w| mem("stob", exec::stob, w) },
    OpPattern { mask: TOP, value: top(0x84), bind: |w| mem("bx", exec::bx, w) },
    OpPattern { mask: TOP, value: top(0x85), bind: |w| mem("balx", exec::balx, w) },
    OpPattern { mask: TOP, value: top(0x86), bind: |w| mem("callx", exec::callx, w) },
    OpPattern { mask: TOP, value: top(0x88), bind: |w| mem("ldos", exec::ldos, w) },
    OpPattern { mask: TOP, value: top(0x8a), bind: |w| mem("stos", exec::stos, w) },
    OpPattern { mask: TOP, value: top(0x8c), bind: |w| mem("lda", exec::lda, w) },
    OpPattern { mask: TOP, value: top(0x90), bind: |w| mem("ld", exec::ld, w) },
    OpPattern { mask: TOP, value: top(0x92), bind: |w| mem("st", exec::st, w) },
    OpPattern { mask: TOP, value: top(0x98), bind: |w| mem("ldl", exec::ldl, w) },
    OpPattern { mask: TOP, value: top(0x9a), bind: |w| mem("stl", exec::stl, w) },
    OpPattern { mask: TOP, value: top(0xa0), bind: |w| mem("ldt", exec::ldt, w) },
    OpPattern { mask: TOP, value: top(0xa2), bind: |w| mem("stt", exec::stt, w) },
    OpPattern { mask: TOP, value: top(0xb0), bind: |w| mem("ldq", exec::ldq, w) },
    OpPattern { mask: TOP, value: top(0xb2), bind: |w| mem("stq", exec::stq, w) },
    OpPattern { mask: TOP, value: top(0xc0), bind: |w| mem("ldib", exec::ldib, w) },
    OpPattern { mask: TOP, value: top(0xc2), bind: |w| mem("stib", exec::stob, w) },
    OpPattern { mask: TOP, value: top(0xc8), bind: |w| mem("ldis", exec::ldis, w) },
    OpPattern { mask: TOP, value: top(0xca), bind: |w| mem("stis", exec::stos, w) },
];

/// Decodes one i960 instruction (one or two words).
pub fn decode(words: &[u32]) -> Ic<I960> {
    decode_with(TABLE, words)
}
