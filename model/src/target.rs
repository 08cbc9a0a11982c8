// Target layout shared by the code generator and the image emitter

/// Size of the ELF32 file header.
pub const ELF_HEADER_SIZE: u32 = 52;
/// Size of one ELF32 program header.
pub const PROGRAM_HEADER_SIZE: u32 = 32;
/// The image always carries exactly two loadable segments.
pub const SEGMENT_COUNT: u32 = 2;
/// File offset of the first data byte.
pub const HEADERS_SIZE: u32 = ELF_HEADER_SIZE + SEGMENT_COUNT * PROGRAM_HEADER_SIZE;

pub const PAGE_SIZE: u32 = 0x1000;
/// Base address the data segment is mapped at (plus its file offset).
pub const DATA_BASE: u32 = 0x0804_8000;
/// Base address the code segment is mapped at (plus its file offset).
pub const CODE_BASE: u32 = 0x0900_0000;

/// Name of the entry symbol looked up in the root scope.
pub const ENTRY_SYMBOL: &str = "_start";

/// Virtual address of data offset 0. Data is laid out right after the headers,
/// so this is known before code generation starts.
pub fn data_vaddr() -> u32 {
    DATA_BASE + HEADERS_SIZE
}

/// Virtual address of code offset 0 for a given data segment length.
pub fn code_vaddr(data_len: u32) -> u32 {
    CODE_BASE + HEADERS_SIZE + data_len
}

/// Largest data segment that still fits below the code segment.
pub fn max_data_len() -> u32 {
    CODE_BASE - DATA_BASE - HEADERS_SIZE
}
