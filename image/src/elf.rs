use std::io::Write;

use model::CompileResult;
use model::target::{ELF_HEADER_SIZE, PROGRAM_HEADER_SIZE};

/// ELF identification bytes: magic, 32-bit class, little-endian, version 1.
pub const IDENT: [u8; 16] = [0x7F, b'E', b'L', b'F', 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];

pub const ET_EXEC: u16 = 2;
pub const EM_386: u16 = 3;
pub const EV_CURRENT: u32 = 1;
pub const PT_LOAD: u32 = 1;

pub const PF_X: u32 = 1;
pub const PF_W: u32 = 2;
pub const PF_R: u32 = 4;

/// ELF32 file header (52 bytes, no section headers).
///
/// All multi-byte values are little-endian.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub entry: u32,
    pub phoff: u32,
    pub phnum: u16,
}

impl FileHeader {
    /// Writes the header to the given writer as exactly 52 bytes.
    pub fn write_to(&self, w: &mut impl Write) -> CompileResult<()> {
        w.write_all(&IDENT)?;
        w.write_all(&ET_EXEC.to_le_bytes())?;
        w.write_all(&EM_386.to_le_bytes())?;
        w.write_all(&EV_CURRENT.to_le_bytes())?;
        w.write_all(&self.entry.to_le_bytes())?;
        w.write_all(&self.phoff.to_le_bytes())?;
        w.write_all(&0u32.to_le_bytes())?; // e_shoff
        w.write_all(&0u32.to_le_bytes())?; // e_flags
        w.write_all(&(ELF_HEADER_SIZE as u16).to_le_bytes())?;
        w.write_all(&(PROGRAM_HEADER_SIZE as u16).to_le_bytes())?;
        w.write_all(&self.phnum.to_le_bytes())?;
        w.write_all(&0u16.to_le_bytes())?; // e_shentsize
        w.write_all(&0u16.to_le_bytes())?; // e_shnum
        w.write_all(&0u16.to_le_bytes())?; // e_shstrndx
        Ok(())
    }
}

/// One `PT_LOAD` program header (32 bytes). File and memory sizes are equal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramHeader {
    pub offset: u32,
    pub vaddr: u32,
    pub size: u32,
    pub flags: u32,
    pub align: u32,
}

impl ProgramHeader {
    pub fn write_to(&self, w: &mut impl Write) -> CompileResult<()> {
        w.write_all(&PT_LOAD.to_le_bytes())?;
        w.write_all(&self.offset.to_le_bytes())?;
        w.write_all(&self.vaddr.to_le_bytes())?;
        w.write_all(&self.vaddr.to_le_bytes())?; // p_paddr
        w.write_all(&self.size.to_le_bytes())?; // p_filesz
        w.write_all(&self.size.to_le_bytes())?; // p_memsz
        w.write_all(&self.flags.to_le_bytes())?;
        w.write_all(&self.align.to_le_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_header_is_52_bytes() {
        let mut out = Vec::new();
        FileHeader { entry: 0x0900_0074, phoff: 52, phnum: 2 }.write_to(&mut out).unwrap();
        assert_eq!(out.len(), ELF_HEADER_SIZE as usize);
        assert_eq!(&out[..4], b"\x7fELF");
        assert_eq!(u16::from_le_bytes([out[16], out[17]]), ET_EXEC);
        assert_eq!(u16::from_le_bytes([out[18], out[19]]), EM_386);
        assert_eq!(u32::from_le_bytes(out[24..28].try_into().unwrap()), 0x0900_0074);
        assert_eq!(u16::from_le_bytes([out[44], out[45]]), 2);
    }

    #[test]
    fn program_header_is_32_bytes() {
        let mut out = Vec::new();
        let header = ProgramHeader { offset: 116, vaddr: 0x0804_8074, size: 9, flags: PF_R | PF_W, align: 0x1000 };
        header.write_to(&mut out).unwrap();
        assert_eq!(out.len(), PROGRAM_HEADER_SIZE as usize);
        assert_eq!(u32::from_le_bytes(out[0..4].try_into().unwrap()), PT_LOAD);
        assert_eq!(u32::from_le_bytes(out[24..28].try_into().unwrap()), 6);
    }
}
