// Branches, loops and short-circuit operators. All jumps are rel32 and get
// patched by the assembler once their labels are placed.
use model::{CompileError, CompileResult, ErrorKind, ExprKind, Node, TypeTag};
use semantic::BlockIds;

use crate::function::{FunctionGenerator, LoopLabels, operand};
use crate::x86::{Cond, X86Instr, X86Operand, X86Reg};

impl<'a> FunctionGenerator<'a> {
    fn gen_test_eax(&mut self) {
        self.asm.push(X86Instr::Test(X86Operand::Reg(X86Reg::Eax), X86Operand::Reg(X86Reg::Eax)));
    }

    pub(crate) fn gen_if(&mut self, stmt: &Node, ids: &mut BlockIds) -> CompileResult<()> {
        let (then_id, else_id) = ids.if_branches();
        let else_label = self.new_label();

        self.gen_int(operand(stmt, 0)?)?;
        self.gen_test_eax();
        self.asm.push(X86Instr::Jcc(Cond::E, else_label.clone()));
        self.gen_block(operand(stmt, 1)?, &then_id)?;

        match stmt.children.get(2) {
            Some(else_branch) => {
                let end_label = self.new_label();
                self.asm.push(X86Instr::Jmp(end_label.clone()));
                self.asm.push(X86Instr::Label(else_label));
                self.gen_block(else_branch, &else_id)?;
                self.asm.push(X86Instr::Label(end_label));
            }
            None => self.asm.push(X86Instr::Label(else_label)),
        }
        Ok(())
    }

    pub(crate) fn gen_while(&mut self, stmt: &Node, ids: &mut BlockIds) -> CompileResult<()> {
        let body_id = ids.while_body();
        let top = self.new_label();
        let end = self.new_label();

        self.asm.push(X86Instr::Label(top.clone()));
        self.gen_int(operand(stmt, 0)?)?;
        self.gen_test_eax();
        self.asm.push(X86Instr::Jcc(Cond::E, end.clone()));

        self.loops.push(LoopLabels { continue_label: top.clone(), break_label: end.clone() });
        let body = self.gen_block(operand(stmt, 1)?, &body_id);
        self.loops.pop();
        body?;

        self.asm.push(X86Instr::Jmp(top));
        self.asm.push(X86Instr::Label(end));
        Ok(())
    }

    pub(crate) fn gen_break(&mut self, stmt: &Node) -> CompileResult<()> {
        let target = self
            .loops
            .last()
            .map(|l| l.break_label.clone())
            .ok_or_else(|| CompileError::new(ErrorKind::BreakOutsideLoop, stmt.offset))?;
        self.asm.push(X86Instr::Jmp(target));
        Ok(())
    }

    pub(crate) fn gen_continue(&mut self, stmt: &Node) -> CompileResult<()> {
        let target = self
            .loops
            .last()
            .map(|l| l.continue_label.clone())
            .ok_or_else(|| CompileError::new(ErrorKind::ContinueOutsideLoop, stmt.offset))?;
        self.asm.push(X86Instr::Jmp(target));
        Ok(())
    }

    /// `&&` and `||` evaluate the right operand only when the left one does
    /// not already decide the result, which is always 0 or 1.
    pub(crate) fn gen_logical(&mut self, node: &Node) -> CompileResult<TypeTag> {
        let is_and = node.expr_kind() == Some(&ExprKind::LogicalAnd);
        // `&&` jumps out on a zero operand, `||` on a non-zero one.
        let (exit_cond, exit_value, fall_value) = if is_and {
            (Cond::E, 0, 1)
        } else {
            (Cond::Ne, 1, 0)
        };
        let exit = self.new_label();
        let end = self.new_label();

        for side in 0..2 {
            self.gen_int(operand(node, side)?)?;
            self.gen_test_eax();
            self.asm.push(X86Instr::Jcc(exit_cond, exit.clone()));
        }
        self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Eax), X86Operand::Imm(fall_value)));
        self.asm.push(X86Instr::Jmp(end.clone()));
        self.asm.push(X86Instr::Label(exit));
        self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Eax), X86Operand::Imm(exit_value)));
        self.asm.push(X86Instr::Label(end));
        Ok(TypeTag::Int)
    }
}
