// Variable access, addresses, stores and increments
use model::{CompileError, CompileResult, ErrorKind, Node, ExprKind, Segment, TypeTag};
use semantic::Symbol;

use crate::function::{FunctionGenerator, internal, operand};
use crate::globals::DataSegment;
use crate::types::{accumulator, element_size, mem_at, mem_operand};
use crate::x86::{X86Instr, X86Operand, X86Reg};

impl<'a> FunctionGenerator<'a> {
    /// Look up a variable visible from the current scope.
    pub(crate) fn variable(&self, name: &str, offset: usize) -> CompileResult<&'a Symbol> {
        let tree = self.tree;
        let symbol = tree
            .lookup(self.scope, name)
            .ok_or_else(|| CompileError::new(ErrorKind::UndefinedSymbol(name.to_string()), offset))?;
        if symbol.is_function() {
            return Err(CompileError::new(
                ErrorKind::MalformedExpression(format!("function {} used as a value", name)),
                offset,
            ));
        }
        Ok(symbol)
    }

    pub(crate) fn load(&mut self, src: X86Operand, ty: TypeTag) {
        self.asm.push(X86Instr::Mov(X86Operand::Reg(accumulator(ty)), src));
    }

    pub(crate) fn store(&mut self, dst: X86Operand, ty: TypeTag) {
        self.asm.push(X86Instr::Mov(dst, X86Operand::Reg(accumulator(ty))));
    }

    pub(crate) fn gen_load_variable(&mut self, name: &str, offset: usize) -> CompileResult<TypeTag> {
        let symbol = self.variable(name, offset)?;
        self.load(mem_operand(symbol.location, symbol.ty), symbol.ty);
        Ok(symbol.ty)
    }

    /// Type a pointer dereference yields; dereferencing a non-pointer or a
    /// `void *` is an error.
    pub(crate) fn deref_type(&self, pointer: TypeTag, node: &Node) -> CompileResult<TypeTag> {
        match pointer.pointee() {
            Some(pointee) if pointee != TypeTag::Void => Ok(pointee),
            _ => Err(CompileError::new(ErrorKind::InvalidDereference, node.offset)),
        }
    }

    pub(crate) fn gen_deref(&mut self, node: &Node) -> CompileResult<TypeTag> {
        let pointer = self.gen_expr(operand(node, 0)?)?;
        let pointee = self.deref_type(pointer, node)?;
        self.load(mem_at(X86Reg::Eax, pointee), pointee);
        Ok(pointee)
    }

    /// Leave the address of an lvalue in eax and return the lvalue's type.
    pub(crate) fn gen_address(&mut self, node: &Node) -> CompileResult<TypeTag> {
        match node.expr_kind() {
            Some(ExprKind::Ident(name)) => {
                let symbol = self.variable(name, node.offset)?;
                let offset = symbol.location.offset;
                match symbol.location.segment {
                    Segment::Data => {
                        let addr = DataSegment::address(offset);
                        self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Eax), X86Operand::Imm(addr as i32)));
                    }
                    Segment::Stack | Segment::Code => {
                        self.asm.push(X86Instr::Lea(X86Reg::Eax, X86Operand::DwordMem(X86Reg::Ebp, offset)));
                    }
                }
                Ok(symbol.ty)
            }
            Some(ExprKind::Deref) => {
                let pointer = self.gen_expr(operand(node, 0)?)?;
                self.deref_type(pointer, node)
            }
            _ => Err(CompileError::new(ErrorKind::InvalidLvalue, node.offset)),
        }
    }

    pub(crate) fn gen_assign(&mut self, node: &Node) -> CompileResult<TypeTag> {
        let target = self.gen_address(operand(node, 0)?)?;
        self.asm.push(X86Instr::Push(X86Reg::Eax));
        let value = self.gen_expr(operand(node, 1)?)?;
        self.convert(value, target);
        self.asm.push(X86Instr::Pop(X86Reg::Ecx));
        self.store(mem_at(X86Reg::Ecx, target), target);
        Ok(target)
    }

    /// Prefix `++`/`--`: the value of the expression is the updated one.
    pub(crate) fn gen_step(&mut self, node: &Node, increment: bool) -> CompileResult<TypeTag> {
        let ty = self.gen_address(operand(node, 0)?)?;
        self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Ecx), X86Operand::Reg(X86Reg::Eax)));
        self.load(mem_at(X86Reg::Ecx, ty), ty);
        let step = if ty.is_pointer() { element_size(ty) } else { 1 };
        let acc = X86Operand::Reg(accumulator(ty));
        let imm = X86Operand::Imm(step as i32);
        self.asm.push(if increment { X86Instr::Add(acc, imm) } else { X86Instr::Sub(acc, imm) });
        self.store(mem_at(X86Reg::Ecx, ty), ty);
        Ok(ty)
    }

    /// Store a local's initializer straight into its slot.
    pub(crate) fn gen_decl_init(&mut self, name: &str, init: &Node) -> CompileResult<()> {
        let tree = self.tree;
        let symbol = tree
            .scope(self.scope)
            .get(name)
            .ok_or_else(|| internal(format!("local {} was not resolved", name)))?;
        let value = self.gen_expr(init)?;
        self.convert(value, symbol.ty);
        self.store(mem_operand(symbol.location, symbol.ty), symbol.ty);
        Ok(())
    }
}
