use super::{put_u16, put_u32, put_u64, MainSection, MainSymbol};
use crate::GpuDeviceType;

const EHDR_SIZE: u16 = 64;
const SHDR_SIZE: u16 = 64;

pub(super) fn write_main_header(out: &mut Vec<u8>, device: GpuDeviceType, shoff: u64) {
    out.extend_from_slice(&[
        0x7f, b'E', b'L', b'F', 2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ]);
    put_u16(out, 2); // ET_EXEC
    put_u16(out, device.elf_machine() as u16);
    put_u32(out, 1); // EV_CURRENT
    put_u64(out, 0); // e_entry
    put_u64(out, 0); // e_phoff
    put_u64(out, shoff);
    put_u32(out, 0); // e_flags
    put_u16(out, EHDR_SIZE);
    put_u16(out, 0); // e_phentsize
    put_u16(out, 0); // e_phnum
    put_u16(out, SHDR_SIZE);
    put_u16(out, 7); // e_shnum
    put_u16(out, 1); // e_shstrndx
}

pub(super) fn write_symbols(out: &mut Vec<u8>, symbols: &[MainSymbol]) {
    for sym in symbols {
        put_u32(out, sym.name);
        out.push(0); // st_info
        out.push(0); // st_other
        put_u16(out, sym.shndx);
        put_u64(out, sym.value);
        put_u64(out, sym.size);
    }
}

pub(super) fn write_section_headers(out: &mut Vec<u8>, sections: &[MainSection]) {
    for section in sections {
        put_u32(out, section.name);
        put_u32(out, section.sh_type);
        put_u64(out, 0); // sh_flags
        put_u64(out, 0); // sh_addr
        put_u64(out, if section.sh_type == 0 { 0 } else { section.offset });
        put_u64(out, section.size);
        put_u32(out, section.link);
        put_u32(out, section.info);
        put_u64(out, 0); // sh_addralign
        put_u64(out, section.entsize);
    }
}
