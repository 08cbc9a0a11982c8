mod assembler;
mod buffer;
mod call_ops;
mod control_flow;
mod expressions;
mod function;
mod globals;
mod memory_ops;
mod types;
mod x86;

use std::collections::HashMap;

use log::debug;
use model::target::max_data_len;
use model::{CompileError, CompileResult, ErrorKind, Node};
use semantic::ScopeTree;

pub use assembler::Assembler;
pub use buffer::CodeBuffer;
pub use x86::{Cond, Fixup, X86Instr, X86Operand, X86Reg};
use function::FunctionGenerator;
use globals::DataSegment;

/// Output of code generation: both segments plus the code offset of every
/// function that has a body.
#[derive(Debug)]
pub struct Generated {
    pub code: Vec<u8>,
    pub data: Vec<u8>,
    pub functions: HashMap<String, u32>,
}

pub struct Codegen<'a> {
    tree: &'a ScopeTree,
}

impl<'a> Codegen<'a> {
    pub fn new(tree: &'a ScopeTree) -> Self {
        Self { tree }
    }

    pub fn gen_program(&self, program: &Node) -> CompileResult<Generated> {
        let mut data = DataSegment::new(self.tree.root().storage);
        data.init_globals(program, self.tree)?;

        let mut assembler = Assembler::new();
        let mut functions = HashMap::new();
        for item in &program.children {
            let Some(parts) = item.function_parts() else {
                continue;
            };
            let Some(body) = parts.body else {
                continue;
            };
            let func_gen = FunctionGenerator::new(self.tree, &mut data, parts.name)?;
            let func_asm = func_gen.gen_function(body)?;
            let offset = assembler.assemble(&func_asm)?;
            functions.insert(parts.name.to_string(), offset as u32);
        }
        let code = assembler.finish()?;

        if data.len() > max_data_len() as usize {
            return Err(CompileError::new(ErrorKind::ImageTooLarge(data.len()), 0));
        }
        debug!(
            "generated {} bytes of code, {} bytes of data, {} functions",
            code.len(),
            data.len(),
            functions.len()
        );
        Ok(Generated { code, data: data.into_bytes(), functions })
    }
}

/// Generate code and data for a resolved program.
pub fn generate(program: &Node, tree: &ScopeTree) -> CompileResult<Generated> {
    Codegen::new(tree).gen_program(program)
}
