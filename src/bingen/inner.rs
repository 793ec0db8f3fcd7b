//! The per-kernel inner CAL ELF.
//!
//! The inner binary is a hand-packed 32-bit ELF with a fixed prefix layout:
//! header at 0x0, three program headers at 0x34, the CAL encoding entry at
//! 0x94, a 40-byte `.shstrtab` at 0xa8, six section headers at 0xd0 and the
//! CAL notes at 0x1c0. Code, data, a one-entry null symbol table and a
//! 2-byte string table follow the notes. The offsets are validated by tests
//! rather than recomputed from running cursors.

use flagset::FlagSet;
use num_traits::ToPrimitive;

use crate::consts::{CalNoteType, CAL_NOTE_NAME};
use crate::metadata::{
    KernelArgType, KernelConfig, KernelResources, PtrAccess, PtrSpace, TempKernelConfig,
};
use crate::quirks::DriverQuirks;
use crate::{AsmError, GpuDeviceType};

use super::{put_u16, put_u32, KernelInput};

/// File offset of the program headers.
pub const INNER_PHDR_OFFSET: usize = 0x34;
/// File offset of the CAL encoding entry.
pub const INNER_CALENC_OFFSET: usize = 0x94;
/// File offset of the inner `.shstrtab` content.
pub const INNER_SHSTRTAB_OFFSET: usize = 0xa8;
/// File offset of the inner section headers.
pub const INNER_SHDR_OFFSET: usize = 0xd0;
/// File offset of the first CAL note.
pub const INNER_NOTES_OFFSET: usize = 0x1c0;

/// Size of the zero-filled default `.data` section.
const DEFAULT_DATA_SIZE: usize = 4736;

const INNER_SHSTRTAB: &[u8; 40] = b"\0.shstrtab\0.text\0.data\0.symtab\0.strtab\0\0";

/// Header of one CAL note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalNoteHeader {
    /// Size of the name field, always 8.
    pub name_size: u32,
    /// A [`CalNoteType`](crate::consts::CalNoteType) value.
    pub note_type: u32,
    /// Size of the note body.
    pub desc_size: u32,
    /// `"ATI CAL\0"`.
    pub name: [u8; 8],
}

impl CalNoteHeader {
    /// A well-formed header for a note of `desc_size` body bytes.
    pub fn new(note_type: CalNoteType, desc_size: u32) -> Self {
        CalNoteHeader {
            name_size: 8,
            note_type: note_type.to_u32().unwrap_or(0),
            desc_size,
            name: CAL_NOTE_NAME,
        }
    }
}

/// A pre-baked CAL note passed through verbatim.
#[derive(Debug, Clone)]
pub struct CalNoteInput {
    /// Note header; `desc_size` must match `data.len()`.
    pub header: CalNoteHeader,
    /// Note body.
    pub data: Vec<u8>,
}

fn put_note_header(out: &mut Vec<u8>, note_type: CalNoteType, desc_size: u32) {
    put_u32(out, 8);
    put_u32(out, note_type.to_u32().unwrap_or(0));
    put_u32(out, desc_size);
    out.extend_from_slice(&CAL_NOTE_NAME);
}

fn put_uav_entry(out: &mut Vec<u8>, id: u32, kind: u32, third: u32) {
    put_u32(out, id);
    put_u32(out, kind);
    put_u32(out, third);
    put_u32(out, 5);
}

/// The 32-byte kernel header placed after the metadata in `.rodata`.
pub(crate) fn kernel_header(
    config: &KernelConfig,
    tcfg: &TempKernelConfig,
    quirks: &DriverQuirks,
    is_64bit: bool,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    put_u32(
        &mut out,
        if quirks.uav_private_in_header {
            tcfg.uav_private
        } else {
            0
        },
    );
    put_u32(&mut out, 0);
    put_u32(&mut out, tcfg.uav_private);
    put_u32(&mut out, config.hw_local_size);
    put_u32(&mut out, if is_64bit { 8 } else { 0 });
    put_u32(&mut out, 1);
    put_u32(&mut out, 0);
    put_u32(&mut out, 0);
    out
}

/// CAL notes synthesized from a kernel configuration, in the fixed order the
/// driver expects.
fn build_cal_notes(
    config: &KernelConfig,
    tcfg: &TempKernelConfig,
    res: &KernelResources,
    quirks: &DriverQuirks,
) -> Vec<u8> {
    let mut out = Vec::new();

    // INPUTS: one word per read-only image
    put_note_header(&mut out, CalNoteType::Inputs, 4 * res.read_only_images);
    for k in 0..res.read_only_images {
        put_u32(
            &mut out,
            if quirks.reversed_input_order {
                res.read_only_images - k - 1
            } else {
                k
            },
        );
    }
    put_note_header(&mut out, CalNoteType::Outputs, 0);

    // UAV table
    put_note_header(&mut out, CalNoteType::Uav, 16 * res.uavs_num);
    if quirks.older_than_1124 {
        // write-only images first, then the global buffers
        for k in 0..res.write_only_images {
            put_u32(&mut out, k);
            put_u32(&mut out, 2);
            put_u32(&mut out, 2);
            put_u32(&mut out, 3);
        }
        let globals = res.uavs_num - res.write_only_images - 1;
        for k in 0..globals {
            put_uav_entry(&mut out, k + tcfg.uav_id + 1, 4, 0);
        }
    } else {
        // in source-argument order
        let mut write_only_count: u32 = 0;
        let mut uav_ids_count = tcfg.uav_id + 1;
        let mut not_used_emitted = false;
        for arg in &config.args {
            if arg.arg_type.is_image() {
                let access = arg.ptr_access
                    & (PtrAccess::ReadOnly | PtrAccess::WriteOnly | PtrAccess::ReadWrite);
                if access == FlagSet::from(PtrAccess::WriteOnly) {
                    put_uav_entry(&mut out, write_only_count, 2, 2);
                    write_only_count += 1;
                }
            } else if arg.arg_type == KernelArgType::Pointer
                && arg.ptr_space == PtrSpace::Global
            {
                if arg.used {
                    put_uav_entry(&mut out, uav_ids_count, 4, 0);
                    uav_ids_count += 1;
                } else if !not_used_emitted {
                    put_uav_entry(&mut out, tcfg.uav_id, 4, 0);
                    not_used_emitted = true;
                }
            }
        }
    }
    if quirks.older_than_1384 {
        put_uav_entry(&mut out, tcfg.private_id, 3, 0);
    } else {
        put_uav_entry(&mut out, tcfg.uav_id, 4, 0);
    }

    put_note_header(&mut out, CalNoteType::CondOut, 4);
    put_u32(&mut out, config.cond_out);
    put_note_header(&mut out, CalNoteType::Float32Consts, 0);
    put_note_header(&mut out, CalNoteType::Int32Consts, 0);
    put_note_header(&mut out, CalNoteType::Bool32Consts, 0);
    put_note_header(&mut out, CalNoteType::EarlyExit, 4);
    put_u32(&mut out, config.early_exit);
    put_note_header(&mut out, CalNoteType::GlobalBuffers, 0);
    put_note_header(&mut out, CalNoteType::ConstantBuffers, 8 * res.const_buffers_num);
    out.resize(out.len() + 8 * res.const_buffers_num as usize, 0);
    put_note_header(&mut out, CalNoteType::ScratchBuffers, 4);
    put_u32(&mut out, config.scratch_buffer_size);
    put_note_header(&mut out, CalNoteType::PersistentBuffers, 0);
    out
}

/// Builds one inner kernel ELF.
pub(crate) fn build_inner_binary(
    kernel: &KernelInput,
    synth: Option<(&TempKernelConfig, &KernelResources)>,
    quirks: &DriverQuirks,
    device: GpuDeviceType,
) -> Result<Vec<u8>, AsmError> {
    let notes = match synth {
        Some((tcfg, res)) => build_cal_notes(&kernel.config, tcfg, res, quirks),
        None => {
            let mut notes = Vec::new();
            for note in &kernel.cal_notes {
                if note.header.desc_size as usize != note.data.len() {
                    return Err(AsmError::Range(
                        "CAL note descSize does not match its data".into(),
                    ));
                }
                put_u32(&mut notes, note.header.name_size);
                put_u32(&mut notes, note.header.note_type);
                put_u32(&mut notes, note.header.desc_size);
                notes.extend_from_slice(&note.header.name);
                notes.extend_from_slice(&note.data);
            }
            notes
        }
    };

    let code_size = kernel.code.len();
    let data_size = kernel
        .data
        .as_ref()
        .map(Vec::len)
        .unwrap_or(DEFAULT_DATA_SIZE);
    let text_offset = INNER_NOTES_OFFSET + notes.len();
    let data_offset = text_offset + code_size;
    let symtab_offset = data_offset + data_size;
    let strtab_offset = symtab_offset + 16;
    let total = strtab_offset + 2;

    let mut out = Vec::with_capacity(total);

    // ELF header
    out.extend_from_slice(&[
        0x7f, b'E', b'L', b'F', 1, 1, 1, 0x64, 0, 0, 0, 0, 0, 0, 0, 0,
    ]);
    put_u16(&mut out, 2); // ET_EXEC
    put_u16(&mut out, 0x7d);
    put_u32(&mut out, 1); // EV_CURRENT
    put_u32(&mut out, 0); // e_entry
    put_u32(&mut out, INNER_PHDR_OFFSET as u32);
    put_u32(&mut out, INNER_SHDR_OFFSET as u32);
    put_u32(&mut out, 1); // e_flags
    put_u16(&mut out, 52); // e_ehsize
    put_u16(&mut out, 32); // e_phentsize
    put_u16(&mut out, 3); // e_phnum
    put_u16(&mut out, 40); // e_shentsize
    put_u16(&mut out, 6); // e_shnum
    put_u16(&mut out, 1); // e_shstrndx
    debug_assert_eq!(out.len(), INNER_PHDR_OFFSET);

    // program headers: CAL encoding dictionary, notes, load
    put_phdr(&mut out, 0x7000_0002, INNER_CALENC_OFFSET as u32, 20);
    put_phdr(&mut out, 4, INNER_NOTES_OFFSET as u32, notes.len() as u32);
    put_phdr(
        &mut out,
        1,
        text_offset as u32,
        (code_size + data_size) as u32,
    );
    debug_assert_eq!(out.len(), INNER_CALENC_OFFSET);

    // CAL encoding entry
    put_u32(&mut out, 4);
    put_u32(&mut out, u32::from(device.inner_machine()));
    put_u32(&mut out, 0);
    put_u32(&mut out, INNER_NOTES_OFFSET as u32);
    put_u32(&mut out, (notes.len() + code_size + data_size) as u32);
    debug_assert_eq!(out.len(), INNER_SHSTRTAB_OFFSET);

    out.extend_from_slice(INNER_SHSTRTAB);
    debug_assert_eq!(out.len(), INNER_SHDR_OFFSET);

    // section headers
    put_inner_shdr(&mut out, 0, 0, 0, 0, 0, 0);
    put_inner_shdr(&mut out, 1, 3, INNER_SHSTRTAB_OFFSET as u32, 40, 0, 0);
    put_inner_shdr(&mut out, 11, 1, text_offset as u32, code_size as u32, 0, 0);
    put_inner_shdr(&mut out, 17, 1, data_offset as u32, data_size as u32, 0, 0);
    put_inner_shdr(&mut out, 23, 2, symtab_offset as u32, 16, 5, 16);
    put_inner_shdr(&mut out, 31, 3, strtab_offset as u32, 2, 0, 0);
    debug_assert_eq!(out.len(), INNER_NOTES_OFFSET);

    out.extend_from_slice(&notes);
    out.extend_from_slice(&kernel.code);
    match &kernel.data {
        Some(data) => out.extend_from_slice(data),
        None => out.resize(out.len() + DEFAULT_DATA_SIZE, 0),
    }
    // one null symbol and an empty string table
    out.resize(out.len() + 16 + 2, 0);
    debug_assert_eq!(out.len(), total);
    Ok(out)
}

fn put_phdr(out: &mut Vec<u8>, p_type: u32, offset: u32, filesz: u32) {
    put_u32(out, p_type);
    put_u32(out, offset);
    put_u32(out, 0); // p_vaddr
    put_u32(out, 0); // p_paddr
    put_u32(out, filesz);
    put_u32(out, 0); // p_memsz
    put_u32(out, 0); // p_flags
    put_u32(out, 0); // p_align
}

fn put_inner_shdr(
    out: &mut Vec<u8>,
    name: u32,
    sh_type: u32,
    offset: u32,
    size: u32,
    link: u32,
    entsize: u32,
) {
    put_u32(out, name);
    put_u32(out, sh_type);
    put_u32(out, 0); // sh_flags
    put_u32(out, 0); // sh_addr
    put_u32(out, if sh_type == 0 { 0 } else { offset });
    put_u32(out, size);
    put_u32(out, link);
    put_u32(out, 0); // sh_info
    put_u32(out, 0); // sh_addralign
    put_u32(out, entsize);
}
