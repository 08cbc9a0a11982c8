// Value widths and pointer scaling
use model::{Location, Segment, TypeTag};

use crate::function::FunctionGenerator;
use crate::globals::DataSegment;
use crate::x86::{X86Instr, X86Operand, X86Reg};

/// Register a value of `ty` lives in: `al` for chars, `eax` otherwise.
pub(crate) fn accumulator(ty: TypeTag) -> X86Reg {
    if ty == TypeTag::Char { X86Reg::Al } else { X86Reg::Eax }
}

/// Bytes one step of pointer arithmetic moves. `void *` steps by one byte.
pub(crate) fn element_size(pointer: TypeTag) -> u32 {
    match pointer.pointee() {
        Some(pointee) if pointee.size() > 0 => pointee.size(),
        _ => 1,
    }
}

/// `[base]` with the width of `ty`.
pub(crate) fn mem_at(base: X86Reg, ty: TypeTag) -> X86Operand {
    if ty == TypeTag::Char {
        X86Operand::ByteMem(base, 0)
    } else {
        X86Operand::DwordMem(base, 0)
    }
}

/// Memory operand for a resolved variable.
pub(crate) fn mem_operand(location: Location, ty: TypeTag) -> X86Operand {
    let byte = ty == TypeTag::Char;
    match location.segment {
        Segment::Data => {
            let addr = DataSegment::address(location.offset);
            if byte { X86Operand::AbsByte(addr) } else { X86Operand::AbsDword(addr) }
        }
        Segment::Stack | Segment::Code => {
            if byte {
                X86Operand::ByteMem(X86Reg::Ebp, location.offset)
            } else {
                X86Operand::DwordMem(X86Reg::Ebp, location.offset)
            }
        }
    }
}

impl<'a> FunctionGenerator<'a> {
    /// Sign-extend a char in `al` to the whole of `eax`.
    pub(crate) fn widen(&mut self, ty: TypeTag) {
        if ty == TypeTag::Char {
            self.asm.push(X86Instr::Movsx(X86Reg::Eax, X86Operand::Reg(X86Reg::Al)));
        }
    }

    /// Bring the accumulator from `from` to the width `to` expects. Narrowing
    /// needs no code since `al` is the low byte of `eax`.
    pub(crate) fn convert(&mut self, from: TypeTag, to: TypeTag) {
        if to.size() == 4 {
            self.widen(from);
        }
    }

    /// Multiply an index in `reg` by the element size of `pointer`.
    pub(crate) fn scale(&mut self, reg: X86Reg, pointer: TypeTag) {
        if element_size(pointer) == 4 {
            self.asm.push(X86Instr::Shl(X86Operand::Reg(reg), 2));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_sizes() {
        assert_eq!(element_size(TypeTag::PtrInt), 4);
        assert_eq!(element_size(TypeTag::PtrChar), 1);
        assert_eq!(element_size(TypeTag::PtrVoid), 1);
        assert_eq!(element_size(TypeTag::PtrPtr), 4);
    }

    #[test]
    fn operands_follow_segment_and_width() {
        let local = Location::new(Segment::Stack, -5);
        assert_eq!(mem_operand(local, TypeTag::Char), X86Operand::ByteMem(X86Reg::Ebp, -5));
        let global = Location::new(Segment::Data, 4);
        assert_eq!(
            mem_operand(global, TypeTag::Int),
            X86Operand::AbsDword(model::target::data_vaddr() + 4)
        );
    }
}
