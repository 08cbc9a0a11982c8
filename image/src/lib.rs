// Executable image writer: an ELF32 i386 file with two loadable segments,
// data then code, laid out right after the headers.

mod elf;

use log::debug;
use model::target::{
    CODE_BASE, ELF_HEADER_SIZE, ENTRY_SYMBOL, HEADERS_SIZE, PAGE_SIZE, SEGMENT_COUNT,
    code_vaddr, data_vaddr,
};
use model::{CompileError, CompileResult, ErrorKind, Segment};
use semantic::{ScopeTree, SymbolKind};

pub use elf::{FileHeader, PF_R, PF_W, PF_X, ProgramHeader};

/// A finished executable.
#[derive(Debug)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub entry: u32,
    /// False when no `_start` function was found and the entry point fell
    /// back to the start of the code segment.
    pub entry_found: bool,
}

/// Lay out the headers, data and code into one executable image.
///
/// The scope tree must already carry final code offsets for its functions.
pub fn build_image(data: &[u8], code: &[u8], tree: &ScopeTree) -> CompileResult<Image> {
    let total = HEADERS_SIZE as usize + data.len() + code.len();
    let too_large = || CompileError::new(ErrorKind::ImageTooLarge(total), 0);
    let data_len = u32::try_from(data.len()).map_err(|_| too_large())?;
    let code_len = u32::try_from(code.len()).map_err(|_| too_large())?;
    let code_offset = HEADERS_SIZE.checked_add(data_len).ok_or_else(too_large)?;
    let code_end = CODE_BASE.checked_add(code_offset).and_then(|v| v.checked_add(code_len));
    if code_end.is_none() {
        return Err(too_large());
    }

    let code_start = code_vaddr(data_len);
    let (entry, entry_found) = match entry_offset(tree) {
        Some(offset) => (code_start + offset, true),
        None => (code_start, false),
    };

    let file_header = FileHeader { entry, phoff: ELF_HEADER_SIZE, phnum: SEGMENT_COUNT as u16 };
    let data_header = ProgramHeader {
        offset: HEADERS_SIZE,
        vaddr: data_vaddr(),
        size: data_len,
        flags: PF_R | PF_W,
        align: PAGE_SIZE,
    };
    let code_header = ProgramHeader {
        offset: code_offset,
        vaddr: code_start,
        size: code_len,
        flags: PF_R | PF_X,
        align: PAGE_SIZE,
    };

    let mut bytes = Vec::with_capacity(total);
    file_header.write_to(&mut bytes)?;
    data_header.write_to(&mut bytes)?;
    code_header.write_to(&mut bytes)?;
    bytes.extend_from_slice(data);
    bytes.extend_from_slice(code);

    debug!(
        "image: {} bytes, data at {:#x}, code at {:#x}, entry {:#x}",
        bytes.len(),
        data_vaddr(),
        code_start,
        entry
    );
    Ok(Image { bytes, entry, entry_found })
}

fn entry_offset(tree: &ScopeTree) -> Option<u32> {
    let symbol = tree.root().get(ENTRY_SYMBOL)?;
    match symbol.kind {
        SymbolKind::Function { defined: true, .. } if symbol.location.segment == Segment::Code => {
            u32::try_from(symbol.location.offset).ok()
        }
        _ => None,
    }
}
