//! MIPS opcode table.
//!
//! Operands are resolved here so handlers stay encoding-agnostic:
//! a source `$zero` becomes `Lit(0)`, a destination `$zero` becomes
//! `Operand::None`, and pure ALU operations writing `$zero` bind to `nop`.
//! Branch targets become `PcRelative` offsets from the branch itself.

use super::Mips;
use super::exec;
use crate::core::dyntrans::{Handler, Ic, Operand};
use crate::isa::decode::{OpPattern, bits, decode_with};

const SPECIAL: u32 = 0xfc00_003f;
const REGIMM: u32 = 0xfc1f_0000;
const OPCODE: u32 = 0xfc00_0000;
const COP0_MOVE: u32 = 0xffe0_0000;
const COP0_CO: u32 = 0xfe00_003f;

const fn op(n: u32) -> u32 {
    n << 26
}

fn rs(w: u32) -> u8 {
    bits(w, 21, 5) as u8
}

fn rt(w: u32) -> u8 {
    bits(w, 16, 5) as u8
}

fn rd(w: u32) -> u8 {
    bits(w, 11, 5) as u8
}

fn sa(w: u32) -> Operand {
    Operand::uimm(bits(w, 6, 5))
}

/// Source register operand.
pub const fn src(r: u8) -> Operand {
    if r == 0 {
        Operand::Lit(0)
    } else {
        Operand::Reg(r)
    }
}

/// Destination register operand.
pub const fn dst(r: u8) -> Operand {
    if r == 0 {
        Operand::None
    } else {
        Operand::Reg(r)
    }
}

fn simm(w: u32) -> Operand {
    Operand::simm(w & 0xffff, 16)
}

fn branch_offset(w: u32) -> Operand {
    let off = i64::from((w & 0xffff) as u16 as i16) << 2;
    Operand::PcRelative(4 + off)
}

const N: Operand = Operand::None;

fn nop_ic() -> Ic<Mips> {
    Ic::bare("nop", exec::nop)
}

/// `rd = rs op rt`, folded to `nop` when `rd` is `$zero`.
fn alu_r(name: &'static str, h: Handler<Mips>, w: u32) -> Ic<Mips> {
    if rd(w) == 0 {
        return nop_ic();
    }
    Ic::new(name, h, [dst(rd(w)), src(rs(w)), src(rt(w)), N])
}

/// `rd = rs op rt` that may trap, so never folded.
fn alu_r_trap(name: &'static str, h: Handler<Mips>, w: u32) -> Ic<Mips> {
    Ic::new(name, h, [dst(rd(w)), src(rs(w)), src(rt(w)), N])
}

/// `rd = rt shift sa`.
fn shift_imm(name: &'static str, h: Handler<Mips>, w: u32) -> Ic<Mips> {
    if rd(w) == 0 {
        return nop_ic();
    }
    Ic::new(name, h, [dst(rd(w)), src(rt(w)), sa(w), N])
}

/// `rd = rt shift rs`.
fn shift_var(name: &'static str, h: Handler<Mips>, w: u32) -> Ic<Mips> {
    if rd(w) == 0 {
        return nop_ic();
    }
    Ic::new(name, h, [dst(rd(w)), src(rt(w)), src(rs(w)), N])
}

/// `rt = rs op imm` with a sign-extended immediate.
fn alu_i(name: &'static str, h: Handler<Mips>, w: u32) -> Ic<Mips> {
    if rt(w) == 0 {
        return nop_ic();
    }
    Ic::new(name, h, [dst(rt(w)), src(rs(w)), simm(w), N])
}

/// `rt = rs op imm` with a zero-extended immediate.
fn alu_u(name: &'static str, h: Handler<Mips>, w: u32) -> Ic<Mips> {
    if rt(w) == 0 {
        return nop_ic();
    }
    Ic::new(name, h, [dst(rt(w)), src(rs(w)), Operand::uimm(w & 0xffff), N])
}

fn load(name: &'static str, h: Handler<Mips>, w: u32) -> Ic<Mips> {
    Ic::new(name, h, [dst(rt(w)), src(rs(w)), simm(w), N])
}

fn store(name: &'static str, h: Handler<Mips>, w: u32) -> Ic<Mips> {
    Ic::new(name, h, [src(rt(w)), src(rs(w)), simm(w), N])
}

/// Two-register compare-and-branch.
fn branch2(name: &'static str, h: Handler<Mips>, w: u32) -> Ic<Mips> {
    Ic::new(name, h, [src(rs(w)), src(rt(w)), branch_offset(w), N])
}

/// Compare-with-zero branch; operand 1 is the link register for the `al` forms.
fn branch1(name: &'static str, h: Handler<Mips>, w: u32, link: bool) -> Ic<Mips> {
    let link = if link { Operand::Reg(31) } else { N };
    Ic::new(name, h, [src(rs(w)), link, branch_offset(w), N])
}

fn jump(name: &'static str, h: Handler<Mips>, w: u32, link: bool) -> Ic<Mips> {
    let link = if link { Operand::Reg(31) } else { N };
    Ic::new(name, h, [Operand::uimm((w & 0x03ff_ffff) << 2), link, N, N])
}

fn cop_unusable(w: u32) -> Ic<Mips> {
    let unit = bits(w, 26, 2);
    Ic::new("cop", exec::cop_unusable, [Operand::uimm(unit), N, N, N])
}

static TABLE: &[OpPattern<Mips>] = &[
    // SPECIAL
    OpPattern { mask: SPECIAL, value: 0x00, bind: |w| shift_imm("sll", exec::sll, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x02, bind: |w| shift_imm("srl", exec::srl, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x03, bind: |w| shift_imm("sra", exec::sra, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x04, bind: |w| shift_var("sllv", exec::sll, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x06, bind: |w| shift_var("srlv", exec::srl, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x07, bind: |w| shift_var("srav", exec::sra, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x08, bind: |w| Ic::new("jr", exec::jr, [src(rs(w[0])), N, N, N]) },
    OpPattern {
        mask: SPECIAL,
        value: 0x09,
        bind: |w| Ic::new("jalr", exec::jalr, [src(rs(w[0])), dst(rd(w[0])), N, N]),
    },
    OpPattern { mask: SPECIAL, value: 0x0c, bind: |_| Ic::bare("syscall", exec::syscall) },
    OpPattern { mask: SPECIAL, value: 0x0d, bind: |_| Ic::bare("break", exec::break_) },
    OpPattern { mask: SPECIAL, value: 0x0f, bind: |_| Ic::bare("sync", exec::nop) },
    OpPattern { mask: SPECIAL, value: 0x10, bind: |w| Ic::new("mfhi", exec::mfhi, [dst(rd(w[0])), N, N, N]) },
    OpPattern { mask: SPECIAL, value: 0x11, bind: |w| Ic::new("mthi", exec::mthi, [src(rs(w[0])), N, N, N]) },
    OpPattern { mask: SPECIAL, value: 0x12, bind: |w| Ic::new("mflo", exec::mflo, [dst(rd(w[0])), N, N, N]) },
    OpPattern { mask: SPECIAL, value: 0x13, bind: |w| Ic::new("mtlo", exec::mtlo, [src(rs(w[0])), N, N, N]) },
    OpPattern { mask: SPECIAL, value: 0x18, bind: |w| alu_r_trap("mult", exec::mult, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x19, bind: |w| alu_r_trap("multu", exec::multu, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x1a, bind: |w| alu_r_trap("div", exec::div, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x1b, bind: |w| alu_r_trap("divu", exec::divu, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x20, bind: |w| alu_r_trap("add", exec::add, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x21, bind: |w| alu_r("addu", exec::addu, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x22, bind: |w| alu_r_trap("sub", exec::sub, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x23, bind: |w| alu_r("subu", exec::subu, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x24, bind: |w| alu_r("and", exec::and, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x25, bind: |w| alu_r("or", exec::or, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x26, bind: |w| alu_r("xor", exec::xor, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x27, bind: |w| alu_r("nor", exec::nor, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x2a, bind: |w| alu_r("slt", exec::slt, w[0]) },
    OpPattern { mask: SPECIAL, value: 0x2b, bind: |w| alu_r("sltu", exec::sltu, w[0]) },
    // REGIMM
    OpPattern { mask: REGIMM, value: op(1), bind: |w| branch1("bltz", exec::bltz, w[0], false) },
    OpPattern { mask: REGIMM, value: op(1) | (1 << 16), bind: |w| branch1("bgez", exec::bgez, w[0], false) },
    OpPattern { mask: REGIMM, value: op(1) | (16 << 16), bind: |w| branch1("bltzal", exec::bltz, w[0], true) },
    OpPattern { mask: REGIMM, value: op(1) | (17 << 16), bind: |w| branch1("bgezal", exec::bgez, w[0], true) },
    // Jumps and branches
    OpPattern { mask: OPCODE, value: op(2), bind: |w| jump("j", exec::j, w[0], false) },
    OpPattern { mask: OPCODE, value: op(3), bind: |w| jump("jal", exec::j, w[0], true) },
    OpPattern { mask: OPCODE, value: op(4), bind: |w| branch2("beq", exec::beq, w[0]) },
    OpPattern { mask: OPCODE, value: op(5), bind: |w| branch2("bne", exec::bne, w[0]) },
    OpPattern { mask: OPCODE, value: op(6), bind: |w| branch1("blez", exec::blez, w[0], false) },
    OpPattern { mask: OPCODE, value: op(7), bind: |w| branch1("bgtz", exec::bgtz, w[0], false) },
    // Immediate ALU
    OpPattern {
        mask: OPCODE,
        value: op(8),
        bind: |w| Ic::new("addi", exec::add, [dst(rt(w[0])), src(rs(w[0])), simm(w[0]), N]),
    },
    OpPattern { mask: OPCODE, value: op(9), bind: |w| alu_i("addiu", exec::addu, w[0]) },
    OpPattern { mask: OPCODE, value: op(10), bind: |w| alu_i("slti", exec::slt, w[0]) },
    OpPattern { mask: OPCODE, value: op(11), bind: |w| alu_i("sltiu", exec::sltu, w[0]) },
    OpPattern { mask: OPCODE, value: op(12), bind: |w| alu_u("andi", exec::and, w[0]) },
    OpPattern { mask: OPCODE, value: op(13), bind: |w| alu_u("ori", exec::or, w[0]) },
    OpPattern { mask: OPCODE, value: op(14), bind: |w| alu_u("xori", exec::xor, w[0]) },
    OpPattern {
        mask: OPCODE,
        value: op(15),
        bind: |w| {
            if rt(w[0]) == 0 {
                return nop_ic();
            }
            Ic::new("lui", exec::mov, [dst(rt(w[0])), Operand::uimm((w[0] & 0xffff) << 16), N, N])
        },
    },
    // COP0
    OpPattern {
        mask: COP0_MOVE,
        value: op(16),
        bind: |w| Ic::new("mfc0", exec::mfc0, [dst(rt(w[0])), Operand::Ctrl(rd(w[0])), N, N]),
    },
    OpPattern {
        mask: COP0_MOVE,
        value: op(16) | (4 << 21),
        bind: |w| Ic::new("mtc0", exec::mtc0, [src(rt(w[0])), Operand::Ctrl(rd(w[0])), N, N]),
    },
    OpPattern { mask: COP0_CO, value: op(16) | (1 << 25) | 0x01, bind: |_| Ic::bare("tlbr", exec::tlbr) },
    OpPattern { mask: COP0_CO, value: op(16) | (1 << 25) | 0x02, bind: |_| Ic::bare("tlbwi", exec::tlbwi) },
    OpPattern { mask: COP0_CO, value: op(16) | (1 << 25) | 0x06, bind: |_| Ic::bare("tlbwr", exec::tlbwr) },
    OpPattern { mask: COP0_CO, value: op(16) | (1 << 25) | 0x08, bind: |_| Ic::bare("tlbp", exec::tlbp) },
    OpPattern { mask: COP0_CO, value: op(16) | (1 << 25) | 0x18, bind: |_| Ic::bare("eret", exec::eret) },
    OpPattern { mask: COP0_CO, value: op(16) | (1 << 25) | 0x20, bind: |_| Ic::bare("wait", exec::wait) },
    // Coprocessors 1-3 are absent.
    OpPattern { mask: OPCODE, value: op(17), bind: |w| cop_unusable(w[0]) },
    OpPattern { mask: OPCODE, value: op(18), bind: |w| cop_unusable(w[0]) },
    OpPattern { mask: OPCODE, value: op(19), bind: |w| cop_unusable(w[0]) },
    OpPattern { mask: OPCODE, value: op(49), bind: |w| cop_unusable(w[0]) },
    OpPattern { mask: OPCODE, value: op(50), bind: |w| cop_unusable(w[0]) },
    OpPattern { mask: OPCODE, value: op(53), bind: |w| cop_unusable(w[0]) },
    OpPattern { mask: OPCODE, value: op(57), bind: |w| cop_unusable(w[0]) },
    OpPattern { mask: OPCODE, value: op(58), bind: |w| cop_unusable(w[0]) },
    OpPattern { mask: OPCODE, value: op(61), bind: |w| cop_unusable(w[0]) },
    // Loads and stores
    OpPattern { mask: OPCODE, value: op(32), bind: |w| load("lb", exec::lb, w[0]) },
    OpPattern { mask: OPCODE, value: op(33), bind: |w| load("lh", exec::lh, w[0]) },
    OpPattern { mask: OPCODE, value: op(35), bind: |w| load("lw", exec::lw, w[0]) },
    OpPattern { mask: OPCODE, value: op(36), bind: |w| load("lbu", exec::lbu, w[0]) },
    OpPattern { mask: OPCODE, value: op(37), bind: |w| load("lhu", exec::lhu, w[0]) },
    OpPattern { mask: OPCODE, value: op(40), bind: |w| store("sb", exec::sb, w[0]) },
    OpPattern { mask: OPCODE, value: op(41), bind: |w| store("sh", exec::sh, w[0]) },
    OpPattern { mask: OPCODE, value: op(43), bind: |w| store("sw", exec::sw, w[0]) },
    OpPattern { mask: OPCODE, value: op(47), bind: |_| Ic::bare("cache", exec::nop) },
    OpPattern { mask: OPCODE, value: op(48), bind: |w| load("ll", exec::ll, w[0]) },
    OpPattern {
        mask: OPCODE,
        value: op(56),
        bind: |w| Ic::new("sc", exec::sc, [src(rt(w[0])), src(rs(w[0])), simm(w[0]), dst(rt(w[0]))]),
    },
];

/// Decodes one MIPS instruction word.
pub fn decode(words: &[u32]) -> Ic<Mips> {
    decode_with(TABLE, words)
}
