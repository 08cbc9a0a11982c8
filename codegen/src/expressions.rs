// Expression lowering. Every expression leaves its value in al or eax.
use model::{CompileResult, ExprKind, Node, TypeTag};

use crate::function::{FunctionGenerator, internal, operand};
use crate::types::element_size;
use crate::x86::{Cond, X86Instr, X86Operand, X86Reg};

impl<'a> FunctionGenerator<'a> {
    /// Generate `node` and return the type of the value it produced.
    pub(crate) fn gen_expr(&mut self, node: &Node) -> CompileResult<TypeTag> {
        let kind = node
            .expr_kind()
            .ok_or_else(|| internal("expected an expression".to_string()))?;
        match kind {
            ExprKind::Ident(name) => self.gen_load_variable(name, node.offset),
            ExprKind::IntLiteral(value) => {
                self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Eax), X86Operand::Imm(*value)));
                Ok(TypeTag::Int)
            }
            ExprKind::CharLiteral(value) => {
                self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Al), X86Operand::Imm(i32::from(*value))));
                Ok(TypeTag::Char)
            }
            ExprKind::StringLiteral(bytes) => {
                let addr = self.data.add_string(bytes);
                self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Eax), X86Operand::Imm(addr as i32)));
                Ok(TypeTag::PtrChar)
            }
            ExprKind::Deref => self.gen_deref(node),
            ExprKind::AddressOf => {
                let ty = self.gen_address(operand(node, 0)?)?;
                Ok(ty.pointer_to())
            }
            ExprKind::Increment => self.gen_step(node, true),
            ExprKind::Decrement => self.gen_step(node, false),
            ExprKind::Not => {
                self.gen_int(operand(node, 0)?)?;
                self.asm.push(X86Instr::Test(X86Operand::Reg(X86Reg::Eax), X86Operand::Reg(X86Reg::Eax)));
                self.gen_set(Cond::E);
                Ok(TypeTag::Int)
            }
            ExprKind::BitNot => {
                self.gen_int(operand(node, 0)?)?;
                self.asm.push(X86Instr::Not(X86Operand::Reg(X86Reg::Eax)));
                Ok(TypeTag::Int)
            }
            ExprKind::Negate => {
                self.gen_int(operand(node, 0)?)?;
                self.asm.push(X86Instr::Neg(X86Operand::Reg(X86Reg::Eax)));
                Ok(TypeTag::Int)
            }
            ExprKind::LogicalAnd | ExprKind::LogicalOr => self.gen_logical(node),
            ExprKind::Assign => self.gen_assign(node),
            ExprKind::Call => self.gen_call(node),
            _ => self.gen_binary(kind, node),
        }
    }

    /// Generate `node` as a full 32-bit value in eax.
    pub(crate) fn gen_int(&mut self, node: &Node) -> CompileResult<TypeTag> {
        let ty = self.gen_expr(node)?;
        self.widen(ty);
        Ok(ty)
    }

    /// `setcc al` followed by a zero-extension to eax.
    pub(crate) fn gen_set(&mut self, cond: Cond) {
        self.asm.push(X86Instr::Set(cond, X86Reg::Al));
        self.asm.push(X86Instr::Movzx(X86Reg::Eax, X86Operand::Reg(X86Reg::Al)));
    }

    /// Left operand ends up in eax, right operand in ecx.
    fn gen_binary(&mut self, kind: &ExprKind, node: &Node) -> CompileResult<TypeTag> {
        let lhs = self.gen_int(operand(node, 0)?)?;
        self.asm.push(X86Instr::Push(X86Reg::Eax));
        let rhs = self.gen_int(operand(node, 1)?)?;
        self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Ecx), X86Operand::Reg(X86Reg::Eax)));
        self.asm.push(X86Instr::Pop(X86Reg::Eax));

        let eax = X86Operand::Reg(X86Reg::Eax);
        let ecx = X86Operand::Reg(X86Reg::Ecx);
        let result = match kind {
            ExprKind::Add => {
                let result = if lhs.is_pointer() && !rhs.is_pointer() {
                    self.scale(X86Reg::Ecx, lhs);
                    lhs
                } else if rhs.is_pointer() && !lhs.is_pointer() {
                    self.scale(X86Reg::Eax, rhs);
                    rhs
                } else {
                    TypeTag::Int
                };
                self.asm.push(X86Instr::Add(eax, ecx));
                result
            }
            ExprKind::Subtract => {
                if lhs.is_pointer() && !rhs.is_pointer() {
                    self.scale(X86Reg::Ecx, lhs);
                    self.asm.push(X86Instr::Sub(eax, ecx));
                    lhs
                } else {
                    self.asm.push(X86Instr::Sub(eax, ecx));
                    if lhs.is_pointer() && rhs.is_pointer() && element_size(lhs) == 4 {
                        self.asm.push(X86Instr::Sar(X86Operand::Reg(X86Reg::Eax), 2));
                    }
                    TypeTag::Int
                }
            }
            ExprKind::Multiply => {
                self.asm.push(X86Instr::Imul(X86Reg::Eax, ecx));
                TypeTag::Int
            }
            ExprKind::Divide | ExprKind::Modulo => {
                self.asm.push(X86Instr::Cdq);
                self.asm.push(X86Instr::Idiv(ecx));
                if *kind == ExprKind::Modulo {
                    self.asm.push(X86Instr::Mov(eax, X86Operand::Reg(X86Reg::Edx)));
                }
                TypeTag::Int
            }
            ExprKind::BitAnd => {
                self.asm.push(X86Instr::And(eax, ecx));
                TypeTag::Int
            }
            ExprKind::BitOr => {
                self.asm.push(X86Instr::Or(eax, ecx));
                TypeTag::Int
            }
            ExprKind::BitXor => {
                self.asm.push(X86Instr::Xor(eax, ecx));
                TypeTag::Int
            }
            ExprKind::Less | ExprKind::Greater | ExprKind::Equal => {
                self.asm.push(X86Instr::Cmp(eax, ecx));
                self.gen_set(match kind {
                    ExprKind::Less => Cond::L,
                    ExprKind::Greater => Cond::G,
                    _ => Cond::E,
                });
                TypeTag::Int
            }
            other => return Err(internal(format!("{:?} is not a binary operator", other))),
        };
        Ok(result)
    }
}
