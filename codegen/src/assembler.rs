use std::collections::HashMap;

use log::trace;
use model::{CompileError, CompileResult, ErrorKind};

use crate::buffer::CodeBuffer;
use crate::x86::{Fixup, X86Instr};

/// Encodes instruction sequences into one code buffer and resolves every
/// branch and call once all labels are known.
pub struct Assembler {
    code: CodeBuffer,
    labels: HashMap<String, usize>,
    fixups: Vec<Fixup>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self {
            code: CodeBuffer::new(),
            labels: HashMap::new(),
            fixups: Vec::new(),
        }
    }

    /// Encode `instrs` and return the code offset of the first one.
    pub fn assemble(&mut self, instrs: &[X86Instr]) -> CompileResult<usize> {
        let start = self.code.len();
        for instr in instrs {
            trace!("{:06x} {}", self.code.len(), instr);
            if let X86Instr::Label(name) = instr {
                if self.labels.insert(name.clone(), self.code.len()).is_some() {
                    return Err(internal(format!("label {} defined twice", name)));
                }
                continue;
            }
            if let Some(fixup) = instr.encode(&mut self.code)? {
                self.fixups.push(fixup);
            }
        }
        Ok(start)
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// Patch every rel32 displacement and hand back the finished code.
    pub fn finish(mut self) -> CompileResult<Vec<u8>> {
        for fixup in std::mem::take(&mut self.fixups) {
            let target = self
                .label(&fixup.label)
                .ok_or_else(|| internal(format!("undefined label {}", fixup.label)))?;
            let rel = target as i64 - (fixup.at as i64 + 4);
            self.code.patch(fixup.at, &(rel as i32).to_le_bytes());
        }
        Ok(self.code.into_bytes())
    }
}

fn internal(message: String) -> CompileError {
    CompileError::new(ErrorKind::Internal(message), 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x86::{X86Operand, X86Reg};

    #[test]
    fn forward_and_backward_jumps_resolve() {
        let mut asm = Assembler::new();
        let start = asm
            .assemble(&[
                X86Instr::Label("top".to_string()),
                X86Instr::Jmp("end".to_string()),
                X86Instr::Jmp("top".to_string()),
                X86Instr::Label("end".to_string()),
                X86Instr::Ret,
            ])
            .unwrap();
        assert_eq!(start, 0);
        assert_eq!(asm.label("end"), Some(10));
        let code = asm.finish().unwrap();
        assert_eq!(
            code,
            vec![0xE9, 5, 0, 0, 0, 0xE9, 0xF6, 0xFF, 0xFF, 0xFF, 0xC3]
        );
    }

    #[test]
    fn calls_resolve_across_sequences() {
        let mut asm = Assembler::new();
        asm.assemble(&[X86Instr::Call("f".to_string())]).unwrap();
        let f = asm
            .assemble(&[
                X86Instr::Label("f".to_string()),
                X86Instr::Mov(X86Operand::Reg(X86Reg::Eax), X86Operand::Imm(7)),
            ])
            .unwrap();
        assert_eq!(f, 5);
        let code = asm.finish().unwrap();
        assert_eq!(&code[..5], &[0xE8, 0, 0, 0, 0]);
    }

    #[test]
    fn undefined_label_is_internal_error() {
        let mut asm = Assembler::new();
        asm.assemble(&[X86Instr::Jmp("nowhere".to_string())]).unwrap();
        let err = asm.finish().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Internal(_)));
    }

    #[test]
    fn duplicate_label_is_internal_error() {
        let mut asm = Assembler::new();
        let label = X86Instr::Label("a".to_string());
        assert!(asm.assemble(&[label.clone(), label]).is_err());
    }
}
