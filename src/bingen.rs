//! AMD "calx" binary generation.
//!
//! The output is a little-endian executable ELF whose sections carry, per
//! kernel, a metadata text, a 32-byte header and an inner CAL ELF with the
//! kernel code. Section order is fixed: `.shstrtab`, `.strtab`, `.symtab`,
//! `.comment`, `.rodata`, `.text`, with the section-header table at the end
//! of the file. The same input always produces byte-identical output.

use log::debug;

use crate::metadata::{
    count_resources, synthesize_metadata, KernelConfig, TempKernelConfig,
};
use crate::quirks::DriverQuirks;
use crate::{AsmError, GpuDeviceType};

mod elf32;
mod elf64;
mod inner;

pub use inner::{CalNoteHeader, CalNoteInput};

/// Fixed content of the outer `.shstrtab` section.
const MAIN_SHSTRTAB: &[u8; 50] =
    b"\0.shstrtab\0.strtab\0.symtab\0.comment\0.rodata\0.text\0";

pub(crate) fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// One kernel of an [`AmdInput`].
///
/// The two construction arms are mutually exclusive: either `use_config` is
/// set and the metadata, header and CAL notes are synthesized from `config`,
/// or they are supplied pre-baked and copied through.
#[derive(Debug, Clone)]
pub struct KernelInput {
    /// Kernel name as referenced by the runtime symbols.
    pub kernel_name: String,
    /// GPU machine code.
    pub code: Vec<u8>,
    /// Kernel data section; a default zero-filled block when absent.
    pub data: Option<Vec<u8>>,
    /// Pre-baked 32-byte kernel header (`use_config == false`).
    pub header: Option<Vec<u8>>,
    /// Pre-baked metadata text (`use_config == false`).
    pub metadata: Option<String>,
    /// Pre-baked CAL notes (`use_config == false`).
    pub cal_notes: Vec<CalNoteInput>,
    /// Synthesize metadata/header/notes from `config`.
    pub use_config: bool,
    /// Kernel configuration for the synthesized arm.
    pub config: KernelConfig,
}

impl KernelInput {
    /// A kernel whose driver structures are synthesized from a config.
    pub fn with_config(
        kernel_name: impl Into<String>,
        code: Vec<u8>,
        config: KernelConfig,
    ) -> Self {
        KernelInput {
            kernel_name: kernel_name.into(),
            code,
            data: None,
            header: None,
            metadata: None,
            cal_notes: Vec::new(),
            use_config: true,
            config,
        }
    }

    /// A kernel with pre-baked CAL notes, header and metadata.
    pub fn with_cal_notes(
        kernel_name: impl Into<String>,
        code: Vec<u8>,
        cal_notes: Vec<CalNoteInput>,
        header: Vec<u8>,
        metadata: String,
    ) -> Self {
        KernelInput {
            kernel_name: kernel_name.into(),
            code,
            data: None,
            header: Some(header),
            metadata: Some(metadata),
            cal_notes,
            use_config: false,
            config: KernelConfig::default(),
        }
    }
}

/// Input of one binary generation.
#[derive(Debug, Clone)]
pub struct AmdInput {
    /// Produce a 64-bit ELF.
    pub is_64bit: bool,
    /// Target device.
    pub device_type: GpuDeviceType,
    /// Driver version as `major*100 + minor`; 0 extracts the version from
    /// `driver_info`.
    pub driver_version: u32,
    /// Verbatim driver-info string; synthesized from the version when absent.
    pub driver_info: Option<String>,
    /// Global constant data placed at the start of `.rodata`.
    pub global_data: Option<Vec<u8>>,
    /// Compile options recorded in `.comment`.
    pub compile_options: String,
    /// Kernels in output order.
    pub kernels: Vec<KernelInput>,
}

impl AmdInput {
    /// Creates an input with no kernels.
    pub fn new(is_64bit: bool, device_type: GpuDeviceType, driver_version: u32) -> Self {
        AmdInput {
            is_64bit,
            device_type,
            driver_version,
            driver_info: None,
            global_data: None,
            compile_options: String::new(),
            kernels: Vec::new(),
        }
    }

    /// Appends a kernel.
    pub fn add_kernel(&mut self, kernel: KernelInput) {
        self.kernels.push(kernel);
    }
}

/// Symbol of the outer `.symtab`, serialized per ELF class.
pub(crate) struct MainSymbol {
    pub name: u32,
    pub value: u64,
    pub size: u64,
    pub shndx: u16,
}

/// Section-header fields of the outer ELF.
pub(crate) struct MainSection {
    pub name: u32,
    pub sh_type: u32,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub entsize: u64,
}

const SHT_PROGBITS: u32 = 1;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;

/// Generates AMD "calx" binaries from an [`AmdInput`].
pub struct AmdGpuBinGenerator<'a> {
    input: &'a AmdInput,
}

impl<'a> AmdGpuBinGenerator<'a> {
    /// Creates a generator borrowing the input.
    pub fn new(input: &'a AmdInput) -> Self {
        AmdGpuBinGenerator { input }
    }

    /// Produces the output binary. The returned buffer is owned by the
    /// caller exclusively.
    pub fn generate(&self) -> Result<Vec<u8>, AsmError> {
        let input = self.input;
        if input.device_type == GpuDeviceType::Undefined {
            return Err(AsmError::Semantic("Undefined GPU device type".into()));
        }
        let quirks = DriverQuirks::resolve(
            input.driver_version,
            input.driver_info.as_deref(),
        );
        debug!(
            "generating {} binary for {} (driver {})",
            if input.is_64bit { "64-bit" } else { "32-bit" },
            input.device_type.name(),
            quirks.driver_version
        );

        // per-kernel synthesis
        let mut metadatas: Vec<Vec<u8>> = Vec::with_capacity(input.kernels.len());
        let mut headers: Vec<Vec<u8>> = Vec::with_capacity(input.kernels.len());
        let mut inner_bins: Vec<Vec<u8>> = Vec::with_capacity(input.kernels.len());
        let mut unique_id: u32 = 1025;
        for kernel in &input.kernels {
            if kernel.use_config {
                let tcfg = TempKernelConfig::resolve(&kernel.config, &quirks)?;
                let resources = count_resources(&kernel.config);
                let metadata = synthesize_metadata(
                    &kernel.kernel_name,
                    &kernel.config,
                    &tcfg,
                    &quirks,
                    input.device_type,
                    input.is_64bit,
                    unique_id,
                )?;
                metadatas.push(metadata.into_bytes());
                headers.push(inner::kernel_header(
                    &kernel.config,
                    &tcfg,
                    &quirks,
                    input.is_64bit,
                ));
                inner_bins.push(inner::build_inner_binary(
                    kernel,
                    Some((&tcfg, &resources)),
                    &quirks,
                    input.device_type,
                )?);
            } else {
                metadatas.push(
                    kernel
                        .metadata
                        .as_ref()
                        .map(|m| m.as_bytes().to_vec())
                        .unwrap_or_default(),
                );
                headers.push(kernel.header.clone().unwrap_or_default());
                inner_bins.push(inner::build_inner_binary(
                    kernel,
                    None,
                    &quirks,
                    input.device_type,
                )?);
            }
            unique_id += 1;
        }

        // section contents, in file order
        let strtab = self.build_strtab(&quirks);
        let symbols = self.build_symbols(&quirks, &metadatas, &headers, &inner_bins);
        let mut comment = Vec::new();
        comment.extend_from_slice(input.compile_options.as_bytes());
        comment.extend_from_slice(quirks.driver_info.as_bytes());
        let mut rodata = Vec::new();
        if let Some(global_data) = &input.global_data {
            rodata.extend_from_slice(global_data);
        }
        for (i, kernel) in input.kernels.iter().enumerate() {
            if kernel.use_config || kernel.header.is_some() {
                rodata.extend_from_slice(&metadatas[i]);
                rodata.extend_from_slice(&headers[i]);
            }
        }
        let mut text = Vec::new();
        for inner_bin in &inner_bins {
            text.extend_from_slice(inner_bin);
        }

        let is64 = input.is_64bit;
        let ehdr_size: u64 = if is64 { 64 } else { 52 };
        let sym_size: u64 = if is64 { 24 } else { 16 };
        let symtab_size = sym_size * symbols.len() as u64;

        let mut offset = ehdr_size;
        let shstrtab_offset = offset;
        offset += MAIN_SHSTRTAB.len() as u64;
        let strtab_offset = offset;
        offset += strtab.len() as u64;
        let symtab_offset = offset;
        offset += symtab_size;
        let comment_offset = offset;
        offset += comment.len() as u64;
        let rodata_offset = offset;
        offset += rodata.len() as u64;
        let text_offset = offset;
        offset += text.len() as u64;
        let shoff = offset;

        let sections = [
            MainSection {
                name: 0,
                sh_type: 0,
                offset: 0,
                size: 0,
                link: 0,
                info: 0,
                entsize: 0,
            },
            MainSection {
                name: 1,
                sh_type: SHT_STRTAB,
                offset: shstrtab_offset,
                size: MAIN_SHSTRTAB.len() as u64,
                link: 0,
                info: 0,
                entsize: 0,
            },
            MainSection {
                name: 11,
                sh_type: SHT_STRTAB,
                offset: strtab_offset,
                size: strtab.len() as u64,
                link: 0,
                info: 0,
                entsize: 0,
            },
            MainSection {
                name: 19,
                sh_type: SHT_SYMTAB,
                offset: symtab_offset,
                size: symtab_size,
                link: 2,
                info: symbols.len() as u32,
                entsize: sym_size,
            },
            MainSection {
                name: 27,
                sh_type: SHT_PROGBITS,
                offset: comment_offset,
                size: comment.len() as u64,
                link: 0,
                info: 0,
                entsize: 0,
            },
            MainSection {
                name: 36,
                sh_type: SHT_PROGBITS,
                offset: rodata_offset,
                size: rodata.len() as u64,
                link: 0,
                info: 0,
                entsize: 0,
            },
            MainSection {
                name: 44,
                sh_type: SHT_PROGBITS,
                offset: text_offset,
                size: text.len() as u64,
                link: 0,
                info: 0,
                entsize: 0,
            },
        ];

        let mut out = Vec::with_capacity((shoff + 7 * if is64 { 64 } else { 40 }) as usize);
        if is64 {
            elf64::write_main_header(&mut out, input.device_type, shoff);
        } else {
            elf32::write_main_header(&mut out, input.device_type, shoff);
        }
        out.extend_from_slice(MAIN_SHSTRTAB);
        out.extend_from_slice(&strtab);
        if is64 {
            elf64::write_symbols(&mut out, &symbols);
        } else {
            elf32::write_symbols(&mut out, &symbols);
        }
        out.extend_from_slice(&comment);
        out.extend_from_slice(&rodata);
        out.extend_from_slice(&text);
        if is64 {
            elf64::write_section_headers(&mut out, &sections);
        } else {
            elf32::write_section_headers(&mut out, &sections);
        }
        debug!("produced {} bytes", out.len());
        Ok(out)
    }

    fn build_strtab(&self, quirks: &DriverQuirks) -> Vec<u8> {
        let mut strtab = Vec::new();
        strtab.push(0);
        strtab.extend_from_slice(b"__OpenCL_compile_options\0");
        if self.input.global_data.is_some() {
            if quirks.older_than_1384 {
                strtab.extend_from_slice(b"__OpenCL_2_global\0");
            } else {
                strtab.extend_from_slice(b"__OpenCL_0_global\0");
            }
        }
        for kernel in &self.input.kernels {
            strtab.extend_from_slice(b"__OpenCL_");
            strtab.extend_from_slice(kernel.kernel_name.as_bytes());
            strtab.extend_from_slice(b"_metadata\0");
            strtab.extend_from_slice(b"__OpenCL_");
            strtab.extend_from_slice(kernel.kernel_name.as_bytes());
            strtab.extend_from_slice(b"_kernel\0");
            strtab.extend_from_slice(b"__OpenCL_");
            strtab.extend_from_slice(kernel.kernel_name.as_bytes());
            strtab.extend_from_slice(b"_header\0");
        }
        strtab
    }

    fn build_symbols(
        &self,
        _quirks: &DriverQuirks,
        metadatas: &[Vec<u8>],
        headers: &[Vec<u8>],
        inner_bins: &[Vec<u8>],
    ) -> Vec<MainSymbol> {
        let input = self.input;
        let mut symbols = Vec::with_capacity(2 + input.kernels.len() * 3);
        symbols.push(MainSymbol {
            name: 0,
            value: 0,
            size: 0,
            shndx: 0,
        });
        let mut name_pos: u32 = 1;
        symbols.push(MainSymbol {
            name: name_pos,
            value: 0,
            size: input.compile_options.len() as u64,
            shndx: 4,
        });
        name_pos += 25;
        let mut rodata_pos: u64 = 0;
        if let Some(global_data) = &input.global_data {
            symbols.push(MainSymbol {
                name: name_pos,
                value: 0,
                size: global_data.len() as u64,
                shndx: 5,
            });
            name_pos += 18;
            rodata_pos = global_data.len() as u64;
        }
        let mut text_pos: u64 = 0;
        for (i, kernel) in input.kernels.iter().enumerate() {
            let name_len = kernel.kernel_name.len() as u32;
            symbols.push(MainSymbol {
                name: name_pos,
                value: rodata_pos,
                size: metadatas[i].len() as u64,
                shndx: 5,
            });
            name_pos += 19 + name_len;
            rodata_pos += metadatas[i].len() as u64;
            symbols.push(MainSymbol {
                name: name_pos,
                value: text_pos,
                size: inner_bins[i].len() as u64,
                shndx: 6,
            });
            name_pos += 17 + name_len;
            text_pos += inner_bins[i].len() as u64;
            symbols.push(MainSymbol {
                name: name_pos,
                value: rodata_pos,
                size: headers[i].len() as u64,
                shndx: 5,
            });
            name_pos += 17 + name_len;
            rodata_pos += headers[i].len() as u64;
        }
        symbols
    }
}
