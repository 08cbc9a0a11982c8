// Data segment: global variable storage followed by string literals
use log::trace;
use model::target::data_vaddr;
use model::{CompileError, CompileResult, ErrorKind, ExprKind, Node, StmtKind};
use semantic::ScopeTree;

use crate::buffer::CodeBuffer;

pub struct DataSegment {
    bytes: CodeBuffer,
}

impl DataSegment {
    /// Start with the zeroed storage the resolver reserved for globals.
    pub fn new(globals_size: u32) -> Self {
        Self { bytes: CodeBuffer::zeroed(globals_size as usize) }
    }

    /// Absolute address of a data offset.
    pub fn address(offset: i32) -> u32 {
        data_vaddr().wrapping_add_signed(offset)
    }

    /// Write the initial value of every initialized global. Only integer and
    /// character literals, optionally negated, are accepted.
    pub fn init_globals(&mut self, program: &Node, tree: &ScopeTree) -> CompileResult<()> {
        for item in &program.children {
            let Some(StmtKind::Decl(name)) = item.stmt_kind() else {
                continue;
            };
            let Some(init) = item.children.get(1) else {
                continue;
            };
            let value = literal_value(init).ok_or_else(|| {
                CompileError::new(ErrorKind::InvalidInitializer(name.clone()), item.offset)
            })?;
            let symbol = tree.root().get(name).ok_or_else(|| {
                CompileError::new(ErrorKind::UndefinedSymbol(name.clone()), item.offset)
            })?;
            let size = symbol.ty.size() as usize;
            let at = symbol.location.offset as usize;
            trace!("global {} = {}", name, value);
            self.bytes.patch(at, &value.to_le_bytes()[..size]);
        }
        Ok(())
    }

    /// Append a NUL-terminated string and return its absolute address.
    pub fn add_string(&mut self, bytes: &[u8]) -> u32 {
        let offset = self.bytes.len();
        self.bytes.extend(bytes);
        self.bytes.push(0);
        Self::address(offset as i32)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes.into_bytes()
    }
}

fn literal_value(node: &Node) -> Option<i32> {
    match node.expr_kind()? {
        ExprKind::IntLiteral(v) => Some(*v),
        ExprKind::CharLiteral(c) => Some(i32::from(*c as i8)),
        ExprKind::Negate => literal_value(node.children.first()?).map(i32::wrapping_neg),
        _ => None,
    }
}
