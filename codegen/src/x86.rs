// i386 register, operand and instruction definitions with their machine encodings
use std::fmt;

use model::{CompileError, CompileResult, ErrorKind};

use crate::buffer::CodeBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum X86Reg {
    Eax, Ecx, Edx, Ebx, Esp, Ebp,
    Al, // low byte of eax
}

impl X86Reg {
    pub fn to_str(&self) -> &str {
        match self {
            Self::Eax => "eax", Self::Ecx => "ecx", Self::Edx => "edx", Self::Ebx => "ebx",
            Self::Esp => "esp", Self::Ebp => "ebp",
            Self::Al => "al",
        }
    }

    /// Register number used in ModRM and short-form opcodes.
    fn code(self) -> u8 {
        match self {
            Self::Eax | Self::Al => 0,
            Self::Ecx => 1,
            Self::Edx => 2,
            Self::Ebx => 3,
            Self::Esp => 4,
            Self::Ebp => 5,
        }
    }

    pub fn is_byte(self) -> bool {
        matches!(self, Self::Al)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum X86Operand {
    Reg(X86Reg),
    DwordMem(X86Reg, i32), // [reg + offset] - DWORD PTR
    ByteMem(X86Reg, i32),  // [reg + offset] - BYTE PTR
    AbsDword(u32),         // [address] - DWORD PTR
    AbsByte(u32),          // [address] - BYTE PTR
    Imm(i32),
}

impl X86Operand {
    fn is_byte(&self) -> bool {
        match self {
            Self::Reg(r) => r.is_byte(),
            Self::ByteMem(..) | Self::AbsByte(_) => true,
            _ => false,
        }
    }
}

impl fmt::Display for X86Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reg(r) => f.write_str(r.to_str()),
            Self::DwordMem(r, offset) => write!(f, "DWORD PTR [{}{:+}]", r.to_str(), offset),
            Self::ByteMem(r, offset) => write!(f, "BYTE PTR [{}{:+}]", r.to_str(), offset),
            Self::AbsDword(addr) => write!(f, "DWORD PTR [{:#x}]", addr),
            Self::AbsByte(addr) => write!(f, "BYTE PTR [{:#x}]", addr),
            Self::Imm(i) => write!(f, "{}", i),
        }
    }
}

/// Condition codes for `setcc` and `jcc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    E,
    Ne,
    L,
    G,
}

impl Cond {
    fn code(self) -> u8 {
        match self {
            Cond::E => 0x4,
            Cond::Ne => 0x5,
            Cond::L => 0xC,
            Cond::G => 0xF,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Cond::E => "e",
            Cond::Ne => "ne",
            Cond::L => "l",
            Cond::G => "g",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum X86Instr {
    Mov(X86Operand, X86Operand),
    Movsx(X86Reg, X86Operand), // Sign-extend a byte into a 32-bit register
    Movzx(X86Reg, X86Operand), // Zero-extend
    Lea(X86Reg, X86Operand),
    Add(X86Operand, X86Operand),
    Sub(X86Operand, X86Operand),
    And(X86Operand, X86Operand),
    Or(X86Operand, X86Operand),
    Xor(X86Operand, X86Operand),
    Cmp(X86Operand, X86Operand),
    Test(X86Operand, X86Operand),
    Imul(X86Reg, X86Operand),
    Idiv(X86Operand),
    Not(X86Operand),
    Neg(X86Operand),
    Shl(X86Operand, u8),
    Sar(X86Operand, u8), // Arithmetic (signed) right shift
    Set(Cond, X86Reg),
    Push(X86Reg),
    Pop(X86Reg),
    Cdq,
    Jmp(String),
    Jcc(Cond, String),
    Call(String),
    Ret,
    Int(u8),
    Label(String),
}

/// A rel32 field that still has to be pointed at a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixup {
    /// Position of the 4-byte displacement in the code buffer.
    pub at: usize,
    pub label: String,
}

fn invalid(instr: &X86Instr) -> CompileError {
    CompileError::new(ErrorKind::Internal(format!("cannot encode `{}`", instr)), 0)
}

/// ModRM (plus SIB and displacement) for a register field and an r/m operand.
fn modrm(out: &mut CodeBuffer, reg_field: u8, rm: &X86Operand) -> Option<()> {
    match rm {
        X86Operand::Reg(r) => out.push(0xC0 | (reg_field << 3) | r.code()),
        X86Operand::DwordMem(base, disp) | X86Operand::ByteMem(base, disp) => {
            let base_code = base.code();
            if *disp == 0 && *base != X86Reg::Ebp {
                out.push((reg_field << 3) | base_code);
            } else {
                out.push(0x80 | (reg_field << 3) | base_code);
            }
            if *base == X86Reg::Esp {
                out.push(0x24);
            }
            if *disp != 0 || *base == X86Reg::Ebp {
                out.extend(&disp.to_le_bytes());
            }
        }
        X86Operand::AbsDword(addr) | X86Operand::AbsByte(addr) => {
            out.push((reg_field << 3) | 0x5);
            out.extend(&addr.to_le_bytes());
        }
        X86Operand::Imm(_) => return None,
    }
    Some(())
}

/// Opcode base and `/digit` extension of the two-operand ALU instructions.
fn alu_codes(instr: &X86Instr) -> Option<(u8, u8, &X86Operand, &X86Operand)> {
    match instr {
        X86Instr::Add(d, s) => Some((0x00, 0, d, s)),
        X86Instr::Or(d, s) => Some((0x08, 1, d, s)),
        X86Instr::And(d, s) => Some((0x20, 4, d, s)),
        X86Instr::Sub(d, s) => Some((0x28, 5, d, s)),
        X86Instr::Xor(d, s) => Some((0x30, 6, d, s)),
        X86Instr::Cmp(d, s) => Some((0x38, 7, d, s)),
        _ => None,
    }
}

impl X86Instr {
    /// Append the machine encoding. Branches and calls get a zero displacement
    /// and return the fixup that has to patch it.
    pub fn encode(&self, out: &mut CodeBuffer) -> CompileResult<Option<Fixup>> {
        self.encode_inner(out).ok_or_else(|| invalid(self))
    }

    fn encode_inner(&self, out: &mut CodeBuffer) -> Option<Option<Fixup>> {
        use X86Operand::*;
        if let Some((base, ext, dst, src)) = alu_codes(self) {
            let byte = dst.is_byte();
            match src {
                Reg(s) if s.is_byte() == byte => {
                    out.push(if byte { base } else { base + 1 });
                    modrm(out, s.code(), dst)?;
                }
                Imm(v) if byte => {
                    out.push(0x80);
                    modrm(out, ext, dst)?;
                    out.push(*v as u8);
                }
                Imm(v) => {
                    out.push(0x81);
                    modrm(out, ext, dst)?;
                    out.extend(&v.to_le_bytes());
                }
                _ => return None,
            }
            return Some(None);
        }

        match self {
            X86Instr::Mov(dst, src) => match (dst, src) {
                (Reg(r), Imm(v)) if r.is_byte() => {
                    out.push(0xB0 + r.code());
                    out.push(*v as u8);
                }
                (Reg(r), Imm(v)) => {
                    out.push(0xB8 + r.code());
                    out.extend(&v.to_le_bytes());
                }
                (_, Reg(s)) if s.is_byte() == dst.is_byte() => {
                    out.push(if s.is_byte() { 0x88 } else { 0x89 });
                    modrm(out, s.code(), dst)?;
                }
                (Reg(d), mem) if d.is_byte() == mem.is_byte() => {
                    out.push(if d.is_byte() { 0x8A } else { 0x8B });
                    modrm(out, d.code(), mem)?;
                }
                _ => return None,
            },
            X86Instr::Movsx(d, src) | X86Instr::Movzx(d, src) => {
                if d.is_byte() || !src.is_byte() {
                    return None;
                }
                let op = if matches!(self, X86Instr::Movsx(..)) { 0xBE } else { 0xB6 };
                out.extend(&[0x0F, op]);
                modrm(out, d.code(), src)?;
            }
            X86Instr::Lea(d, mem) => {
                if matches!(mem, Reg(_) | Imm(_)) {
                    return None;
                }
                out.push(0x8D);
                modrm(out, d.code(), mem)?;
            }
            X86Instr::Test(dst, Reg(s)) if s.is_byte() == dst.is_byte() => {
                out.push(if s.is_byte() { 0x84 } else { 0x85 });
                modrm(out, s.code(), dst)?;
            }
            X86Instr::Imul(d, src) => {
                out.extend(&[0x0F, 0xAF]);
                modrm(out, d.code(), src)?;
            }
            X86Instr::Idiv(src) => {
                out.push(0xF7);
                modrm(out, 7, src)?;
            }
            X86Instr::Not(dst) => {
                out.push(0xF7);
                modrm(out, 2, dst)?;
            }
            X86Instr::Neg(dst) => {
                out.push(0xF7);
                modrm(out, 3, dst)?;
            }
            X86Instr::Shl(dst, n) | X86Instr::Sar(dst, n) => {
                let ext = if matches!(self, X86Instr::Shl(..)) { 4 } else { 7 };
                out.push(0xC1);
                modrm(out, ext, dst)?;
                out.push(*n);
            }
            X86Instr::Set(cond, r) if r.is_byte() => {
                out.extend(&[0x0F, 0x90 | cond.code()]);
                modrm(out, 0, &Reg(*r))?;
            }
            X86Instr::Push(r) if !r.is_byte() => out.push(0x50 + r.code()),
            X86Instr::Pop(r) if !r.is_byte() => out.push(0x58 + r.code()),
            X86Instr::Cdq => out.push(0x99),
            X86Instr::Ret => out.push(0xC3),
            X86Instr::Int(n) => out.extend(&[0xCD, *n]),
            X86Instr::Jmp(label) => return Some(Some(rel32(out, &[0xE9], label))),
            X86Instr::Call(label) => return Some(Some(rel32(out, &[0xE8], label))),
            X86Instr::Jcc(cond, label) => {
                return Some(Some(rel32(out, &[0x0F, 0x80 | cond.code()], label)));
            }
            X86Instr::Label(_) => {}
            _ => return None,
        }
        Some(None)
    }
}

fn rel32(out: &mut CodeBuffer, opcode: &[u8], label: &str) -> Fixup {
    out.extend(opcode);
    let at = out.len();
    out.extend(&[0; 4]);
    Fixup { at, label: label.to_string() }
}

impl fmt::Display for X86Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            X86Instr::Label(l) => write!(f, "{}:", l),
            X86Instr::Mov(d, s) => write!(f, "  mov {}, {}", d, s),
            X86Instr::Movsx(d, s) => write!(f, "  movsx {}, {}", d.to_str(), s),
            X86Instr::Movzx(d, s) => write!(f, "  movzx {}, {}", d.to_str(), s),
            X86Instr::Lea(d, s) => write!(f, "  lea {}, {}", d.to_str(), s),
            X86Instr::Add(d, s) => write!(f, "  add {}, {}", d, s),
            X86Instr::Sub(d, s) => write!(f, "  sub {}, {}", d, s),
            X86Instr::And(d, s) => write!(f, "  and {}, {}", d, s),
            X86Instr::Or(d, s) => write!(f, "  or {}, {}", d, s),
            X86Instr::Xor(d, s) => write!(f, "  xor {}, {}", d, s),
            X86Instr::Cmp(l, r) => write!(f, "  cmp {}, {}", l, r),
            X86Instr::Test(l, r) => write!(f, "  test {}, {}", l, r),
            X86Instr::Imul(d, s) => write!(f, "  imul {}, {}", d.to_str(), s),
            X86Instr::Idiv(s) => write!(f, "  idiv {}", s),
            X86Instr::Not(d) => write!(f, "  not {}", d),
            X86Instr::Neg(d) => write!(f, "  neg {}", d),
            X86Instr::Shl(d, n) => write!(f, "  shl {}, {}", d, n),
            X86Instr::Sar(d, n) => write!(f, "  sar {}, {}", d, n),
            X86Instr::Set(c, d) => write!(f, "  set{} {}", c.suffix(), d.to_str()),
            X86Instr::Push(r) => write!(f, "  push {}", r.to_str()),
            X86Instr::Pop(r) => write!(f, "  pop {}", r.to_str()),
            X86Instr::Cdq => f.write_str("  cdq"),
            X86Instr::Jmp(l) => write!(f, "  jmp {}", l),
            X86Instr::Jcc(c, l) => write!(f, "  j{} {}", c.suffix(), l),
            X86Instr::Call(l) => write!(f, "  call {}", l),
            X86Instr::Ret => f.write_str("  ret"),
            X86Instr::Int(n) => write!(f, "  int {:#x}", n),
        }
    }
}
