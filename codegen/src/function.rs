use log::debug;
use model::target::ENTRY_SYMBOL;
use model::{CompileError, CompileResult, ErrorKind, Node, StmtKind, TypeTag};
use semantic::{BlockIds, ScopeId, ScopeTree};

use crate::globals::DataSegment;
use crate::x86::{X86Instr, X86Operand, X86Reg};

/// Branch targets of the innermost enclosing loop.
pub(crate) struct LoopLabels {
    pub(crate) continue_label: String,
    pub(crate) break_label: String,
}

/// Handles generation of code for a single function
pub struct FunctionGenerator<'a> {
    pub asm: Vec<X86Instr>,

    // Context from parent Codegen
    pub(crate) tree: &'a ScopeTree,
    pub(crate) data: &'a mut DataSegment,

    // Per-function state
    pub(crate) name: String,
    pub(crate) scope: ScopeId,
    pub(crate) return_type: TypeTag,
    pub(crate) loops: Vec<LoopLabels>,
    next_label: usize,
}

impl<'a> FunctionGenerator<'a> {
    pub fn new(tree: &'a ScopeTree, data: &'a mut DataSegment, name: &str) -> CompileResult<Self> {
        let symbol = tree
            .root()
            .get(name)
            .ok_or_else(|| internal(format!("function {} was not resolved", name)))?;
        let scope = symbol
            .child
            .ok_or_else(|| internal(format!("function {} has no scope", name)))?;
        Ok(Self {
            asm: Vec::new(),
            tree,
            data,
            name: name.to_string(),
            scope,
            return_type: symbol.ty,
            loops: Vec::new(),
            next_label: 0,
        })
    }

    pub fn gen_function(mut self, body: &Node) -> CompileResult<Vec<X86Instr>> {
        let frame = self.tree.scope(self.scope).storage;
        debug!("generating {} (frame {} bytes)", self.name, frame);

        self.asm.push(X86Instr::Label(self.name.clone()));
        // Prologue
        self.asm.push(X86Instr::Push(X86Reg::Ebp));
        self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Ebp), X86Operand::Reg(X86Reg::Esp)));
        self.asm.push(X86Instr::Sub(X86Operand::Reg(X86Reg::Esp), X86Operand::Imm(frame as i32)));

        // The body block shares the function scope.
        self.gen_statements(self.scope, &body.children)?;

        // Falling off the end returns 0.
        self.asm.push(X86Instr::Xor(X86Operand::Reg(X86Reg::Eax), X86Operand::Reg(X86Reg::Eax)));
        self.gen_epilogue();
        Ok(self.asm)
    }

    /// Leave the function with the value already in eax. The entry function
    /// has nowhere to return to, so it exits the process instead.
    pub(crate) fn gen_epilogue(&mut self) {
        if self.name == ENTRY_SYMBOL {
            self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Ebx), X86Operand::Reg(X86Reg::Eax)));
            self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Eax), X86Operand::Imm(1)));
            self.asm.push(X86Instr::Int(0x80));
        } else {
            self.asm.push(X86Instr::Mov(X86Operand::Reg(X86Reg::Esp), X86Operand::Reg(X86Reg::Ebp)));
            self.asm.push(X86Instr::Pop(X86Reg::Ebp));
            self.asm.push(X86Instr::Ret);
        }
    }

    pub(crate) fn new_label(&mut self) -> String {
        let label = format!(".L{}.{}", self.name, self.next_label);
        self.next_label += 1;
        label
    }

    /// Generate a statement list inside `scope`, which has its own block ids.
    pub(crate) fn gen_statements(&mut self, scope: ScopeId, stmts: &[Node]) -> CompileResult<()> {
        let outer = std::mem::replace(&mut self.scope, scope);
        let mut ids = BlockIds::default();
        for stmt in stmts {
            self.gen_stmt(stmt, &mut ids)?;
        }
        self.scope = outer;
        Ok(())
    }

    /// Generate a nested block whose scope is registered under `id`.
    pub(crate) fn gen_block(&mut self, block: &Node, id: &str) -> CompileResult<()> {
        let scope = self
            .tree
            .child(self.scope, id)
            .ok_or_else(|| internal(format!("block {} in {} was not resolved", id, self.name)))?;
        self.gen_statements(scope, &block.children)
    }

    fn gen_stmt(&mut self, stmt: &Node, ids: &mut BlockIds) -> CompileResult<()> {
        let kind = stmt
            .stmt_kind()
            .ok_or_else(|| internal("expected a statement".to_string()))?;
        match kind {
            StmtKind::Decl(name) => {
                if let Some(init) = stmt.children.get(1) {
                    self.gen_decl_init(name, init)?;
                }
            }
            StmtKind::Expr => {
                if let Some(expr) = stmt.children.first() {
                    self.gen_expr(expr)?;
                }
            }
            StmtKind::Empty => {}
            StmtKind::Block => {
                let id = ids.block();
                self.gen_block(stmt, &id)?;
            }
            StmtKind::If => self.gen_if(stmt, ids)?,
            StmtKind::While => self.gen_while(stmt, ids)?,
            StmtKind::Break => self.gen_break(stmt)?,
            StmtKind::Continue => self.gen_continue(stmt)?,
            StmtKind::Return => self.gen_return(stmt)?,
        }
        Ok(())
    }

    fn gen_return(&mut self, stmt: &Node) -> CompileResult<()> {
        match stmt.children.first() {
            Some(value) => {
                let ty = self.gen_expr(value)?;
                self.convert(ty, self.return_type);
            }
            None => {
                self.asm.push(X86Instr::Xor(X86Operand::Reg(X86Reg::Eax), X86Operand::Reg(X86Reg::Eax)));
            }
        }
        self.gen_epilogue();
        Ok(())
    }
}

pub(crate) fn internal(message: String) -> CompileError {
    CompileError::new(ErrorKind::Internal(message), 0)
}

/// Child `index` of a node, or a malformed-expression error at the node.
pub(crate) fn operand(node: &Node, index: usize) -> CompileResult<&Node> {
    node.children
        .get(index)
        .ok_or_else(|| CompileError::new(ErrorKind::MalformedExpression("missing operand".to_string()), node.offset))
}
