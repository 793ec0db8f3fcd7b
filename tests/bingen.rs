use gcnasm::{
    AmdGpuBinGenerator, AmdInput, GpuDeviceType, KernelConfig, KernelInput,
};

fn rd16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes(bytes[at..at + 2].try_into().unwrap())
}

fn rd32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

fn rd64(bytes: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(bytes[at..at + 8].try_into().unwrap())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Offset of a section's content in a 32-bit output, from the section
/// header table at the end of the file.
fn section_offset32(binary: &[u8], index: usize) -> (usize, usize) {
    let shoff = rd32(binary, 32) as usize;
    let shdr = shoff + index * 40;
    (rd32(binary, shdr + 16) as usize, rd32(binary, shdr + 20) as usize)
}

fn section_offset64(binary: &[u8], index: usize) -> (usize, usize) {
    let shoff = rd64(binary, 40) as usize;
    let shdr = shoff + index * 64;
    (rd64(binary, shdr + 24) as usize, rd64(binary, shdr + 32) as usize)
}

fn single_kernel_input(driver_version: u32) -> AmdInput {
    let mut input = AmdInput::new(false, GpuDeviceType::CapeVerde, driver_version);
    input.add_kernel(KernelInput::with_config(
        "k1",
        vec![0u8; 16],
        KernelConfig::default(),
    ));
    input
}

#[test]
fn outer_elf_shape() {
    let input = single_kernel_input(150005);
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    assert_eq!(&binary[0..4], b"\x7fELF");
    assert_eq!(binary[4], 1); // ELFCLASS32
    assert_eq!(binary[5], 1); // little endian
    assert_eq!(rd16(&binary, 16), 2); // ET_EXEC
    assert_eq!(rd16(&binary, 18), 0x3ff); // capeverde
    assert_eq!(rd16(&binary, 44), 0); // e_phnum
    assert_eq!(rd16(&binary, 48), 7); // e_shnum
    assert_eq!(rd16(&binary, 50), 1); // e_shstrndx
    // .shstrtab content right after the header
    assert_eq!(
        &binary[52..102],
        b"\0.shstrtab\0.strtab\0.symtab\0.comment\0.rodata\0.text\0".as_slice()
    );
}

#[test]
fn strtab_kernel_symbol_names() {
    let input = single_kernel_input(150005);
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    assert!(find(
        &binary,
        b"__OpenCL_k1_metadata\0__OpenCL_k1_kernel\0__OpenCL_k1_header\0"
    )
    .is_some());
}

#[test]
fn metadata_text_in_rodata() {
    let input = single_kernel_input(150005);
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    let (rodata, _) = section_offset32(&binary, 5);
    let expected: &[u8] = b";ARGSTART:__OpenCL_k1_kernel\n;version:3:1:111\n\
                            ;device:capeverde\n;uniqueid:1025\n";
    assert_eq!(&binary[rodata..rodata + expected.len()], expected);
}

#[test]
fn old_driver_metadata_version() {
    let input = single_kernel_input(100000);
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    assert!(find(&binary, b";version:3:1:104\n").is_some());
    assert!(find(&binary, b";version:3:1:111\n").is_none());
}

#[test]
fn inner_elf_fixed_layout() {
    let input = single_kernel_input(150005);
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    let (text, text_size) = section_offset32(&binary, 6);
    assert!(text_size > 0x1c0);
    let inner = &binary[text..text + text_size];
    assert_eq!(&inner[0..4], b"\x7fELF");
    assert_eq!(inner[7], 0x64);
    assert_eq!(rd16(inner, 18), 0x7d); // inner e_machine
    assert_eq!(rd32(inner, 36), 1); // e_flags
    assert_eq!(rd16(inner, 42), 32); // e_phentsize
    assert_eq!(rd16(inner, 44), 3); // e_phnum
    assert_eq!(rd16(inner, 48), 6); // e_shnum

    // program header 0 points at the CAL encoding entry
    assert_eq!(rd32(inner, 0x34), 0x7000_0002);
    assert_eq!(rd32(inner, 0x38), 0x94);
    assert_eq!(rd32(inner, 0x44), 20);
    // program header 1 is the note segment at 0x1c0
    assert_eq!(rd32(inner, 0x54), 4);
    assert_eq!(rd32(inner, 0x58), 0x1c0);
    // program header 2 loads code and data
    assert_eq!(rd32(inner, 0x74), 1);

    // CAL encoding entry: type 4, capeverde inner machine
    assert_eq!(rd32(inner, 0x94), 4);
    assert_eq!(rd32(inner, 0x98), 0x1c);
    assert_eq!(rd32(inner, 0xa0), 0x1c0);

    assert_eq!(
        &inner[0xa8..0xd0],
        b"\0.shstrtab\0.text\0.data\0.symtab\0.strtab\0\0".as_slice()
    );

    // the first CAL note is INPUTS with a complete header
    assert_eq!(rd32(inner, 0x1c0), 8);
    assert_eq!(rd32(inner, 0x1c4), 2);
    assert_eq!(&inner[0x1cc..0x1d4], b"ATI CAL\0");
}

#[test]
fn uav_note_header_is_complete() {
    let input = single_kernel_input(150005);
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    let (text, _) = section_offset32(&binary, 6);
    // INPUTS (empty) then OUTPUTS (empty) then UAV
    let uav = text + 0x1c0 + 20 + 20;
    assert_eq!(rd32(&binary, uav), 8); // nameSize present
    assert_eq!(rd32(&binary, uav + 4), 16); // CALNOTE_ATI_UAV
    assert_eq!(rd32(&binary, uav + 8), 16); // one entry
    assert_eq!(&binary[uav + 12..uav + 20], b"ATI CAL\0");
    // the trailing entry carries the default uavid with type 4
    assert_eq!(rd32(&binary, uav + 20), 11);
    assert_eq!(rd32(&binary, uav + 24), 4);
    assert_eq!(rd32(&binary, uav + 32), 5);
}

#[test]
fn kernel_header_words() {
    let mut input = AmdInput::new(true, GpuDeviceType::Tahiti, 164205);
    let mut config = KernelConfig::default();
    config.hw_local_size = 256;
    config.uav_private = 128;
    input.add_kernel(KernelInput::with_config("k1", vec![0u8; 8], config));
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    assert_eq!(rd16(&binary, 18), 0x3fd); // tahiti
    assert_eq!(binary[4], 2); // ELFCLASS64
    let (rodata, rodata_size) = section_offset64(&binary, 5);
    let header = rodata + rodata_size - 32;
    let words: Vec<u32> = (0..8).map(|i| rd32(&binary, header + 4 * i)).collect();
    assert_eq!(words, vec![128, 0, 128, 256, 8, 1, 0, 0]);
}

#[test]
fn header_uav_private_gate() {
    let mut input = AmdInput::new(false, GpuDeviceType::Tahiti, 150005);
    let mut config = KernelConfig::default();
    config.hw_local_size = 64;
    config.uav_private = 48;
    input.add_kernel(KernelInput::with_config("k", vec![0u8; 8], config));
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    let (rodata, rodata_size) = section_offset32(&binary, 5);
    let header = rodata + rodata_size - 32;
    // first word stays zero before driver 1642.5
    assert_eq!(rd32(&binary, header), 0);
    assert_eq!(rd32(&binary, header + 8), 48);
    assert_eq!(rd32(&binary, header + 12), 64);
    assert_eq!(rd32(&binary, header + 16), 0);
}

#[test]
fn byte_identical_regeneration() {
    let input = single_kernel_input(150005);
    let a = AmdGpuBinGenerator::new(&input).generate().unwrap();
    let b = AmdGpuBinGenerator::new(&input).generate().unwrap();
    assert_eq!(a, b);
}

#[test]
fn undefined_device_rejected() {
    let input = AmdInput::new(false, GpuDeviceType::Undefined, 150005);
    assert!(AmdGpuBinGenerator::new(&input).generate().is_err());
}

#[test]
fn comment_carries_driver_info() {
    let input = single_kernel_input(150005);
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    assert!(find(
        &binary,
        b"@(#) OpenCL 1.2 AMD-APP (1500.5).  Driver version: 1500.5 (VM)"
    )
    .is_some());
}

#[test]
fn global_data_symbol_name_by_driver() {
    let mut input = single_kernel_input(150005);
    input.global_data = Some(vec![1, 2, 3, 4]);
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    assert!(find(&binary, b"__OpenCL_0_global\0").is_some());

    let mut input = single_kernel_input(130000);
    input.global_data = Some(vec![1, 2, 3, 4]);
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    assert!(find(&binary, b"__OpenCL_2_global\0").is_some());
}

#[test]
fn passthrough_kernel_structures() {
    let note = gcnasm::CalNoteInput {
        header: gcnasm::CalNoteHeader::new(gcnasm::CalNoteType::CondOut, 4),
        data: vec![7, 0, 0, 0],
    };
    let mut input = AmdInput::new(false, GpuDeviceType::CapeVerde, 150005);
    input.add_kernel(KernelInput::with_cal_notes(
        "raw",
        vec![0u8; 4],
        vec![note],
        vec![0xaa; 32],
        ";ARGSTART:__OpenCL_raw_kernel\n;ARGEND:__OpenCL_raw_kernel\n".to_string(),
    ));
    let binary = AmdGpuBinGenerator::new(&input).generate().unwrap();
    let (text, _) = section_offset32(&binary, 6);
    // the supplied note is copied through at the notes offset
    assert_eq!(rd32(&binary, text + 0x1c0), 8);
    assert_eq!(rd32(&binary, text + 0x1c4), 4); // CONDOUT
    assert_eq!(rd32(&binary, text + 0x1c8), 4);
    assert_eq!(rd32(&binary, text + 0x1d4), 7);
    // the pre-baked header lands in .rodata
    assert!(find(&binary, &[0xaa; 32]).is_some());
}
