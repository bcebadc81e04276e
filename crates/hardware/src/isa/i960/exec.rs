//! i960 instruction handlers.
//!
//! Operand order follows the assembler: `op src1, src2, dst` computes
//! `dst = src2 OP src1` for the non-commutative operations (`subo`, `shlo`,
//! `divo`, ...). The i960 has no delay slots; taken branches move the
//! cursor directly.

use tracing::warn;

use super::{
    FaultType, I960, I960Exception, ac, cc, ctrl, pc, pop_frame, push_frame, rtype, set_cc,
};
use crate::core::cpu::Cpu;
use crate::core::dyntrans::{Ic, Operand};
use crate::soc::Bus;

type C = Cpu<I960>;

const MASK32: u64 = 0xffff_ffff;

#[inline(always)]
fn r32(cpu: &C, ic: &Ic<I960>, i: usize) -> u32 {
    cpu.value(ic.arg(i)) as u32
}

#[inline(always)]
fn w32(cpu: &mut C, ic: &Ic<I960>, i: usize, v: u32) {
    cpu.set(ic.arg(i), u64::from(v));
}

/// Effective address of a MEM-format instruction (operands 1..3).
#[inline(always)]
fn ea(cpu: &C, ic: &Ic<I960>) -> u64 {
    cpu.value(ic.arg(1))
        .wrapping_add(cpu.value(ic.arg(2)))
        .wrapping_add(cpu.value(ic.arg(3)))
        & MASK32
}

/// Raises a fault that resumes after the running instruction.
fn fault(cpu: &mut C, bus: &mut Bus, kind: FaultType, subtype: u8) {
    let resume = Some(cpu.next_pc() & MASK32);
    cpu.raise_exception(
        bus,
        I960Exception::Fault {
            kind,
            subtype,
            resume,
        },
    );
}

/// Integer overflow: sets the sticky flag when masked, faults otherwise.
fn overflow(cpu: &mut C, bus: &mut Bus) {
    let a = cpu.ctrl.read(ctrl::AC as usize) as u32;
    if a & ac::OVERFLOW_MASK != 0 {
        cpu.ctrl
            .write(ctrl::AC as usize, u64::from(a | ac::OVERFLOW_FLAG));
    } else {
        fault(cpu, bus, FaultType::Arithmetic, 1);
    }
}

fn zero_divide(cpu: &mut C, bus: &mut Bus) {
    fault(cpu, bus, FaultType::Arithmetic, 2);
}

/// Condition-code test used by branches and `test*`.
///
/// A zero mask tests for "unordered" (CC == 0); any other mask tests for
/// overlap with the condition code.
pub const fn cc_matches(cc: u32, mask: u32) -> bool {
    if mask == 0 { cc == 0 } else { cc & mask != 0 }
}

fn compare<T: PartialOrd>(a: &T, b: &T) -> u32 {
    if a < b {
        ac::CC_LESS
    } else if a == b {
        ac::CC_EQUAL
    } else {
        ac::CC_GREATER
    }
}

/// Does nothing (`mark`, `fmark`, `flushreg`, `syncf`).
pub fn nop(_cpu: &mut C, _bus: &mut Bus, _ic: &Ic<I960>) {}

/// REG-format write to a special function register: logged and ignored.
pub fn sfr_write(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    cpu.arch.sfr_writes += 1;
    warn!(
        cpu = cpu.id,
        pc = format_args!("{:#x}", cpu.current_pc()),
        insn = ic.name,
        "write to special function register ignored"
    );
}

/// `halt`.
pub fn halt(cpu: &mut C, _bus: &mut Bus, _ic: &Ic<I960>) {
    cpu.halt();
}

macro_rules! reg_op {
    ($($(#[$doc:meta])* $name:ident => |$s1:ident, $s2:ident| $body:expr;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
                let $s1 = r32(cpu, ic, 1);
                let $s2 = r32(cpu, ic, 2);
                w32(cpu, ic, 0, $body);
            }
        )*
    };
}

reg_op! {
    /// `and`.
    and => |a, b| b & a;
    /// `andnot`.
    andnot => |a, b| b & !a;
    /// `notand`.
    notand => |a, b| !b & a;
    /// `or`.
    or => |a, b| b | a;
    /// `ornot`.
    ornot => |a, b| b | !a;
    /// `notor`.
    notor => |a, b| !b | a;
    /// `xor`.
    xor => |a, b| b ^ a;
    /// `xnor`.
    xnor => |a, b| !(b ^ a);
    /// `nor`.
    nor => |a, b| !(b | a);
    /// `nand`.
    nand => |a, b| !(b & a);
    /// `not`.
    not => |a, _b| !a;
    /// `setbit`.
    setbit => |a, b| b | (1 << (a & 31));
    /// `clrbit`.
    clrbit => |a, b| b & !(1 << (a & 31));
    /// `notbit`.
    notbit => |a, b| b ^ (1 << (a & 31));
    /// `addo`.
    addo => |a, b| b.wrapping_add(a);
    /// `subo`.
    subo => |a, b| b.wrapping_sub(a);
    /// `mulo`.
    mulo => |a, b| b.wrapping_mul(a);
    /// `shlo`, `shli`.
    shlo => |a, b| b.checked_shl(a).unwrap_or(0);
    /// `shro`.
    shro => |a, b| b.checked_shr(a).unwrap_or(0);
    /// `shri`.
    shri => |a, b| ((b as i32) >> a.min(31)) as u32;
    /// `rotate`.
    rotate => |a, b| b.rotate_left(a & 31);
}

/// `shrdi`: arithmetic shift that rounds toward zero.
pub fn shrdi(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let n = r32(cpu, ic, 1).min(31);
    let v = r32(cpu, ic, 2) as i32;
    let bias = if v < 0 { (1i32 << n) - 1 } else { 0 };
    w32(cpu, ic, 0, (v.wrapping_add(bias) >> n) as u32);
}

/// `alterbit`: sets the bit when CC bit 1 is set, clears it otherwise.
pub fn alterbit(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let bit = 1u32 << (r32(cpu, ic, 1) & 31);
    let src = r32(cpu, ic, 2);
    let v = if cc(cpu) & ac::CC_EQUAL != 0 {
        src | bit
    } else {
        src & !bit
    };
    w32(cpu, ic, 0, v);
}

/// `addi`: signed add, overflow faults unless masked.
pub fn addi(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1) as i32, r32(cpu, ic, 2) as i32);
    let (v, ovf) = b.overflowing_add(a);
    w32(cpu, ic, 0, v as u32);
    if ovf {
        overflow(cpu, bus);
    }
}

/// `subi`: signed subtract, overflow faults unless masked.
pub fn subi(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1) as i32, r32(cpu, ic, 2) as i32);
    let (v, ovf) = b.overflowing_sub(a);
    w32(cpu, ic, 0, v as u32);
    if ovf {
        overflow(cpu, bus);
    }
}

/// `muli`: signed multiply, overflow faults unless masked.
pub fn muli(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1) as i32, r32(cpu, ic, 2) as i32);
    let (v, ovf) = b.overflowing_mul(a);
    w32(cpu, ic, 0, v as u32);
    if ovf {
        overflow(cpu, bus);
    }
}

/// `divo`: zero divisor faults and leaves the destination unchanged.
pub fn divo(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    match b.checked_div(a) {
        Some(v) => w32(cpu, ic, 0, v),
        None => zero_divide(cpu, bus),
    }
}

/// `remo`.
pub fn remo(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    match b.checked_rem(a) {
        Some(v) => w32(cpu, ic, 0, v),
        None => zero_divide(cpu, bus),
    }
}

/// Signed division family: zero divisor faults, `MIN / -1` overflows.
fn signed_div(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>, f: fn(i32, i32) -> i32) {
    let (a, b) = (r32(cpu, ic, 1) as i32, r32(cpu, ic, 2) as i32);
    if a == 0 {
        zero_divide(cpu, bus);
    } else {
        w32(cpu, ic, 0, f(b, a) as u32);
        if b == i32::MIN && a == -1 {
            overflow(cpu, bus);
        }
    }
}

/// `divi`.
pub fn divi(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    signed_div(cpu, bus, ic, i32::wrapping_div);
}

/// `remi`: remainder with the dividend's sign.
pub fn remi(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    signed_div(cpu, bus, ic, i32::wrapping_rem);
}

/// `modi`: remainder with the divisor's sign.
pub fn modi(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    signed_div(cpu, bus, ic, |b, a| {
        let r = b.wrapping_rem(a);
        if r != 0 && (r < 0) != (a < 0) { r + a } else { r }
    });
}

/// Reads a register pair (`r`, `r + 1`) as a 64-bit value; literals extend with zero.
fn pair(cpu: &C, op: Operand) -> u64 {
    match op {
        Operand::Reg(r) => {
            let lo = cpu.regs.read(r as usize) & MASK32;
            let hi = cpu.regs.read(r as usize + 1) & MASK32;
            (hi << 32) | lo
        }
        op => cpu.value(op) & MASK32,
    }
}

/// Writes a 64-bit value to the register pair starting at operand `op`.
fn set_pair(cpu: &mut C, op: Operand, v: u64) {
    if let Operand::Reg(r) = op {
        cpu.regs.write(r as usize, v & MASK32);
        cpu.regs.write(r as usize + 1, v >> 32);
    }
}

/// `emul`: 32x32 to 64-bit unsigned multiply into a register pair.
pub fn emul(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let p = u64::from(r32(cpu, ic, 1)) * u64::from(r32(cpu, ic, 2));
    set_pair(cpu, ic.arg(0), p);
}

/// `ediv`: 64 / 32 unsigned divide; `dst` gets the remainder, `dst + 1` the quotient.
pub fn ediv(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let divisor = u64::from(r32(cpu, ic, 1));
    if divisor == 0 {
        zero_divide(cpu, bus);
        return;
    }
    let dividend = pair(cpu, ic.arg(2));
    let q = dividend / divisor;
    let r = dividend % divisor;
    set_pair(cpu, ic.arg(0), (q << 32) | (r & MASK32));
}

/// `addc`: add with carry in CC bit 1; CC receives carry and overflow.
pub fn addc(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    let carry = (cc(cpu) >> 1) & 1;
    with_carry(cpu, ic, b, a, carry);
}

/// `subc`: `src2 - src1 - 1 + carry`.
pub fn subc(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    let carry = (cc(cpu) >> 1) & 1;
    with_carry(cpu, ic, b, !a, carry);
}

fn with_carry(cpu: &mut C, ic: &Ic<I960>, x: u32, y: u32, carry: u32) {
    let wide = u64::from(x) + u64::from(y) + u64::from(carry);
    let v = wide as u32;
    let carry_out = u32::from(wide > u64::from(u32::MAX));
    let ovf = u32::from(((x ^ v) & (y ^ v)) >> 31 != 0);
    w32(cpu, ic, 0, v);
    set_cc(cpu, (carry_out << 1) | ovf);
}

/// `cmpo`.
pub fn cmpo(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    set_cc(cpu, compare(&a, &b));
}

/// `cmpi`.
pub fn cmpi(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1) as i32, r32(cpu, ic, 2) as i32);
    set_cc(cpu, compare(&a, &b));
}

/// `concmpo`: compares only if the previous compare was not "less".
pub fn concmpo(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    if cc(cpu) & ac::CC_LESS == 0 {
        let (a, b) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
        set_cc(cpu, if a <= b { ac::CC_EQUAL } else { ac::CC_GREATER });
    }
}

/// `concmpi`.
pub fn concmpi(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    if cc(cpu) & ac::CC_LESS == 0 {
        let (a, b) = (r32(cpu, ic, 1) as i32, r32(cpu, ic, 2) as i32);
        set_cc(cpu, if a <= b { ac::CC_EQUAL } else { ac::CC_GREATER });
    }
}

/// `cmpinco`: unsigned compare, then `dst = src2 + 1`.
pub fn cmpinco(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    set_cc(cpu, compare(&a, &b));
    w32(cpu, ic, 0, b.wrapping_add(1));
}

/// `cmpinci`.
pub fn cmpinci(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1) as i32, r32(cpu, ic, 2) as i32);
    set_cc(cpu, compare(&a, &b));
    w32(cpu, ic, 0, b.wrapping_add(1) as u32);
}

/// `cmpdeco`.
pub fn cmpdeco(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    set_cc(cpu, compare(&a, &b));
    w32(cpu, ic, 0, b.wrapping_sub(1));
}

/// `cmpdeci`.
pub fn cmpdeci(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1) as i32, r32(cpu, ic, 2) as i32);
    set_cc(cpu, compare(&a, &b));
    w32(cpu, ic, 0, b.wrapping_sub(1) as u32);
}

/// `scanbyte`: CC is "equal" if any byte lane of the operands matches.
pub fn scanbyte(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1).to_le_bytes(), r32(cpu, ic, 2).to_le_bytes());
    let hit = a.iter().zip(b.iter()).any(|(x, y)| x == y);
    set_cc(cpu, if hit { ac::CC_EQUAL } else { 0 });
}

/// `chkbit`: CC is "equal" if bit `src1` of `src2` is set.
pub fn chkbit(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    let set = (b >> (a & 31)) & 1 != 0;
    set_cc(cpu, if set { ac::CC_EQUAL } else { 0 });
}

/// `scanbit`: index of the most significant set bit, or all ones.
pub fn scanbit(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let v = r32(cpu, ic, 1);
    msb(cpu, ic, v);
}

/// `spanbit`: index of the most significant clear bit, or all ones.
pub fn spanbit(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let v = !r32(cpu, ic, 1);
    msb(cpu, ic, v);
}

fn msb(cpu: &mut C, ic: &Ic<I960>, v: u32) {
    if v == 0 {
        w32(cpu, ic, 0, u32::MAX);
        set_cc(cpu, 0);
    } else {
        w32(cpu, ic, 0, 31 - v.leading_zeros());
        set_cc(cpu, ac::CC_EQUAL);
    }
}

/// `extract`: `dst = (dst >> src1) & ((1 << src2) - 1)`.
pub fn extract(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (pos, len) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    let field = r32(cpu, ic, 0).checked_shr(pos).unwrap_or(0);
    let mask = 1u32.checked_shl(len).map_or(u32::MAX, |m| m - 1);
    w32(cpu, ic, 0, field & mask);
}

/// `modify`: replaces the `src1`-masked bits of `dst` with those of `src2`.
pub fn modify(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (mask, src) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    let d = r32(cpu, ic, 0);
    w32(cpu, ic, 0, (src & mask) | (d & !mask));
}

/// Masked update of control register `c`; `dst` receives the old value.
fn modify_ctrl(cpu: &mut C, ic: &Ic<I960>, c: u8, mask: u32, src: u32) -> u32 {
    let old = cpu.ctrl.read(c as usize) as u32;
    cpu.ctrl
        .write(c as usize, u64::from((src & mask) | (old & !mask)));
    w32(cpu, ic, 0, old);
    old
}

/// `modac mask, src, dst`.
pub fn modac(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (mask, src) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    let _ = modify_ctrl(cpu, ic, ctrl::AC, mask, src);
}

/// `modtc mask, src, dst`.
pub fn modtc(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (mask, src) = (r32(cpu, ic, 1), r32(cpu, ic, 2));
    let _ = modify_ctrl(cpu, ic, ctrl::TC, mask, src);
}

/// `modpc src, mask, src/dst`: supervisor only when the mask is non-zero.
pub fn modpc(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let mask = r32(cpu, ic, 2);
    let supervisor = cpu.ctrl.read(ctrl::PC as usize) as u32 & pc::SUPERVISOR != 0;
    if mask != 0 && !supervisor {
        fault(cpu, bus, FaultType::Type, 1);
        return;
    }
    let src = r32(cpu, ic, 0);
    let _ = modify_ctrl(cpu, ic, ctrl::PC, mask, src);
    cpu.request_interrupt_poll();
}

/// `atmod src, mask, src/dst`: atomic masked read-modify-write of a word.
pub fn atmod(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let addr = u64::from(r32(cpu, ic, 1) & !3);
    let mask = r32(cpu, ic, 2);
    let Some(old) = cpu.load_u32(bus, addr) else {
        return;
    };
    let new = (r32(cpu, ic, 0) & mask) | (old & !mask);
    if cpu.store_u32(bus, addr, new).is_some() {
        w32(cpu, ic, 0, old);
    }
}

/// `atadd src, src2, dst`: atomic add to a word; `dst` receives the old value.
pub fn atadd(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let addr = u64::from(r32(cpu, ic, 1) & !3);
    let add = r32(cpu, ic, 2);
    let Some(old) = cpu.load_u32(bus, addr) else {
        return;
    };
    if cpu.store_u32(bus, addr, old.wrapping_add(add)).is_some() {
        w32(cpu, ic, 0, old);
    }
}

/// `mov`, `movl`, `movt`, `movq` (operand 2 is the register count).
///
/// A literal source fills the first register and zeroes the rest.
pub fn mov(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let Operand::Reg(d) = ic.arg(0) else {
        return;
    };
    let n = cpu.value(ic.arg(2)) as usize;
    for i in 0..n {
        let v = match ic.arg(1) {
            Operand::Reg(s) => cpu.regs.read(s as usize + i),
            op if i == 0 => cpu.value(op),
            _ => 0,
        };
        cpu.regs.write(d as usize + i, v & MASK32);
    }
}

/// `b`.
pub fn b(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let dest = cpu.value(ic.arg(0)) & MASK32;
    cpu.branch_to(dest);
}

/// `bal`: links into operand 1 (`g14`).
pub fn bal(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let dest = cpu.value(ic.arg(0)) & MASK32;
    let link = cpu.next_pc() & MASK32;
    cpu.set(ic.arg(1), link);
    cpu.branch_to(dest);
}

/// Conditional branch (`bg`, `be`, ...); operand 3 is the mask.
pub fn bcc(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let mask = cpu.value(ic.arg(3)) as u32;
    if cc_matches(cc(cpu), mask) {
        let dest = cpu.value(ic.arg(0)) & MASK32;
        cpu.branch_to(dest);
    }
}

/// `test*`: writes 1 if the condition holds, 0 otherwise.
pub fn test(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let mask = cpu.value(ic.arg(3)) as u32;
    let v = u32::from(cc_matches(cc(cpu), mask));
    w32(cpu, ic, 0, v);
}

fn cobr_branch(cpu: &mut C, ic: &Ic<I960>, cond: u32) {
    set_cc(cpu, cond);
    let mask = cpu.value(ic.arg(3)) as u32;
    if cc_matches(cond, mask) {
        let dest = cpu.value(ic.arg(2)) & MASK32;
        cpu.branch_to(dest);
    }
}

/// `cmpob*`: unsigned compare and branch.
pub fn cmpob(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 0), r32(cpu, ic, 1));
    cobr_branch(cpu, ic, compare(&a, &b));
}

/// `cmpib*`: signed compare and branch.
pub fn cmpib(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (a, b) = (r32(cpu, ic, 0) as i32, r32(cpu, ic, 1) as i32);
    cobr_branch(cpu, ic, compare(&a, &b));
}

/// `bbc`: branch if bit `src1` of `src2` is clear.
pub fn bbc(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (pos, v) = (r32(cpu, ic, 0), r32(cpu, ic, 1));
    let set = (v >> (pos & 31)) & 1 != 0;
    set_cc(cpu, if set { ac::CC_EQUAL } else { 0 });
    if !set {
        let dest = cpu.value(ic.arg(2)) & MASK32;
        cpu.branch_to(dest);
    }
}

/// `bbs`: branch if bit `src1` of `src2` is set.
pub fn bbs(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let (pos, v) = (r32(cpu, ic, 0), r32(cpu, ic, 1));
    let set = (v >> (pos & 31)) & 1 != 0;
    set_cc(cpu, if set { ac::CC_EQUAL } else { 0 });
    if set {
        let dest = cpu.value(ic.arg(2)) & MASK32;
        cpu.branch_to(dest);
    }
}

/// Calls `dest` with a new local frame.
fn call_to(cpu: &mut C, bus: &mut Bus, dest: u64) {
    let ret = cpu.next_pc() & MASK32;
    let _ = push_frame(cpu, bus, ret, rtype::LOCAL, 0);
    cpu.branch_to(dest);
}

/// `call`.
pub fn call(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let dest = cpu.value(ic.arg(0)) & MASK32;
    call_to(cpu, bus, dest);
}

/// `callx`.
pub fn callx(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let dest = ea(cpu, ic);
    call_to(cpu, bus, dest);
}

/// `ret`.
pub fn ret(cpu: &mut C, bus: &mut Bus, _ic: &Ic<I960>) {
    pop_frame(cpu, bus);
}

/// `bx`.
pub fn bx(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let dest = ea(cpu, ic);
    cpu.branch_to(dest);
}

/// `balx`: links into operand 0.
pub fn balx(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let dest = ea(cpu, ic);
    let link = cpu.next_pc() & MASK32;
    cpu.set(ic.arg(0), link);
    cpu.branch_to(dest);
}

/// `lda`.
pub fn lda(cpu: &mut C, _bus: &mut Bus, ic: &Ic<I960>) {
    let addr = ea(cpu, ic);
    cpu.set(ic.arg(0), addr);
}

/// `ldob`.
pub fn ldob(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let addr = ea(cpu, ic);
    if let Some(v) = cpu.load_u8(bus, addr) {
        w32(cpu, ic, 0, u32::from(v));
    }
}

/// `ldib`.
pub fn ldib(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let addr = ea(cpu, ic);
    if let Some(v) = cpu.load_u8(bus, addr) {
        w32(cpu, ic, 0, v as i8 as i32 as u32);
    }
}

/// `ldos`.
pub fn ldos(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let addr = ea(cpu, ic);
    if let Some(v) = cpu.load_u16(bus, addr) {
        w32(cpu, ic, 0, u32::from(v));
    }
}

/// `ldis`.
pub fn ldis(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let addr = ea(cpu, ic);
    if let Some(v) = cpu.load_u16(bus, addr) {
        w32(cpu, ic, 0, v as i16 as i32 as u32);
    }
}

/// `stob`, `stib`.
pub fn stob(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let (addr, v) = (ea(cpu, ic), r32(cpu, ic, 0));
    let _ = cpu.store_u8(bus, addr, v as u8);
}

/// `stos`, `stis`.
pub fn stos(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    let (addr, v) = (ea(cpu, ic), r32(cpu, ic, 0));
    let _ = cpu.store_u16(bus, addr, v as u16);
}

fn load_words(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>, n: usize) {
    let Some(r) = ic.arg(0).reg() else {
        return;
    };
    let addr = ea(cpu, ic);
    let mut vals = [0u32; 4];
    for (i, v) in vals.iter_mut().enumerate().take(n) {
        let Some(w) = cpu.load_u32(bus, addr + 4 * i as u64) else {
            return;
        };
        *v = w;
    }
    for (i, v) in vals.iter().enumerate().take(n) {
        cpu.regs.write(r as usize + i, u64::from(*v));
    }
}

fn store_words(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>, n: usize) {
    let Some(r) = ic.arg(0).reg() else {
        return;
    };
    let addr = ea(cpu, ic);
    for i in 0..n {
        let v = cpu.regs.read(r as usize + i) as u32;
        if cpu.store_u32(bus, addr + 4 * i as u64, v).is_none() {
            return;
        }
    }
}

/// `ld`.
pub fn ld(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    load_words(cpu, bus, ic, 1);
}

/// `ldl`.
pub fn ldl(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    load_words(cpu, bus, ic, 2);
}

/// `ldt`.
pub fn ldt(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    load_words(cpu, bus, ic, 3);
}

/// `ldq`.
pub fn ldq(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    load_words(cpu, bus, ic, 4);
}

/// `st`.
pub fn st(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    store_words(cpu, bus, ic, 1);
}

/// `stl`.
pub fn stl(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    store_words(cpu, bus, ic, 2);
}

/// `stt`.
pub fn stt(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    store_words(cpu, bus, ic, 3);
}

/// `stq`.
pub fn stq(cpu: &mut C, bus: &mut Bus, ic: &Ic<I960>) {
    store_words(cpu, bus, ic, 4);
}

