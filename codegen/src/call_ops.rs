// Function calls. Arguments are stored into a reserved area at the packed
// offsets the callee's parameters were resolved to.
use model::{CompileError, CompileResult, ErrorKind, ExprKind, Node, TypeTag};
use semantic::SymbolKind;

use crate::function::{FunctionGenerator, internal};
use crate::x86::{X86Instr, X86Operand, X86Reg};

impl<'a> FunctionGenerator<'a> {
    pub(crate) fn gen_call(&mut self, node: &Node) -> CompileResult<TypeTag> {
        let (callee, args) = node
            .children
            .split_first()
            .ok_or_else(|| internal("call without a callee".to_string()))?;
        let Some(ExprKind::Ident(name)) = callee.expr_kind() else {
            return Err(internal("callee is not an identifier".to_string()));
        };

        let tree = self.tree;
        let symbol = tree
            .lookup(self.scope, name)
            .ok_or_else(|| CompileError::new(ErrorKind::UndefinedSymbol(name.clone()), callee.offset))?;
        let SymbolKind::Function { params, defined } = &symbol.kind else {
            return Err(CompileError::new(ErrorKind::NotAFunction(name.clone()), callee.offset));
        };
        if !defined {
            return Err(CompileError::new(ErrorKind::UndefinedFunction(name.clone()), callee.offset));
        }
        if params.len() != args.len() {
            return Err(CompileError::new(
                ErrorKind::ArgumentCount {
                    name: name.clone(),
                    expected: params.len(),
                    found: args.len(),
                },
                node.offset,
            ));
        }

        let area: u32 = params.iter().map(|p| p.size()).sum();
        if area > 0 {
            self.asm.push(X86Instr::Sub(X86Operand::Reg(X86Reg::Esp), X86Operand::Imm(area as i32)));
        }
        let mut offset = 0i32;
        for (arg, &param) in args.iter().zip(params) {
            let ty = self.gen_expr(arg)?;
            self.convert(ty, param);
            let slot = if param == TypeTag::Char {
                X86Operand::ByteMem(X86Reg::Esp, offset)
            } else {
                X86Operand::DwordMem(X86Reg::Esp, offset)
            };
            self.store(slot, param);
            offset += param.size() as i32;
        }

        self.asm.push(X86Instr::Call(name.clone()));
        if area > 0 {
            self.asm.push(X86Instr::Add(X86Operand::Reg(X86Reg::Esp), X86Operand::Imm(area as i32)));
        }
        Ok(symbol.ty)
    }
}
