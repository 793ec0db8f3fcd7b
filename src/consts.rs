//! GPU device tables, architecture generations, and CAL binary constants.

use num_derive::{FromPrimitive, ToPrimitive};
use phf::phf_map;

use crate::AsmError;

/// GCN architecture generation of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcnArch {
    /// GCN 1.0 (Southern Islands).
    Gcn10,
    /// GCN 1.1 (Sea Islands).
    Gcn11,
    /// GCN 1.2 (Volcanic Islands).
    Gcn12,
}

impl GcnArch {
    /// GCN 1.2, the generation with SDWA/DPP words, `sext()` modifiers,
    /// `xnack_mask` and the `1/(2*PI)` inline constant.
    pub fn is_rx3x0(self) -> bool {
        self == GcnArch::Gcn12
    }

    /// GCN 1.1 or newer, the generations with `flat_scratch`.
    pub fn has_flat_scratch(self) -> bool {
        self != GcnArch::Gcn10
    }

    /// Addressable scalar register count.
    pub fn max_sgprs(self) -> u16 {
        if self.is_rx3x0() {
            102
        } else {
            104
        }
    }

    /// Pool index of the `flat_scratch` pair.
    pub fn flat_scratch_reg(self) -> u16 {
        if self.is_rx3x0() {
            102
        } else {
            104
        }
    }
}

/// The GPU device a binary is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
pub enum GpuDeviceType {
    /// No device selected; rejected by the binary generator.
    Undefined,
    /// Cape Verde (Radeon HD 7700 series).
    CapeVerde,
    /// Pitcairn (Radeon HD 7800 series).
    Pitcairn,
    /// Tahiti (Radeon HD 7900 series).
    Tahiti,
    /// Oland.
    Oland,
    /// Bonaire.
    Bonaire,
    /// Spectre (Kaveri APU).
    Spectre,
    /// Spooky (Kaveri APU).
    Spooky,
    /// Kalindi (Kabini APU).
    Kalindi,
    /// Hainan.
    Hainan,
    /// Hawaii.
    Hawaii,
    /// Iceland.
    Iceland,
    /// Tonga.
    Tonga,
    /// Mullins.
    Mullins,
}

/// `e_machine` values of the outer ELF, indexed by device.
const GPU_DEVICE_CODES: [u32; 14] = [
    0, 0x3ff, 0x3fe, 0x3fd, 0x402, 0x403, 0x404, 0x405, 0x406, 0x407, 0x408,
    0x409, 0x40a, 0x40b,
];

/// CAL encoding machine values of the inner ELF, indexed by device.
const GPU_INNER_CODES: [u16; 14] = [
    0, 0x1c, 0x1b, 0x1a, 0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x27, 0x29,
    0x2a, 0x2b,
];

const GPU_DEVICE_NAMES: [&str; 14] = [
    "UNDEFINED",
    "capeverde",
    "pitcairn",
    "tahiti",
    "oland",
    "bonaire",
    "spectre",
    "spooky",
    "kalindi",
    "hainan",
    "hawaii",
    "iceland",
    "tonga",
    "mullins",
];

static GPU_DEVICES_BY_NAME: phf::Map<&'static str, GpuDeviceType> = phf_map! {
    "capeverde" => GpuDeviceType::CapeVerde,
    "pitcairn" => GpuDeviceType::Pitcairn,
    "tahiti" => GpuDeviceType::Tahiti,
    "oland" => GpuDeviceType::Oland,
    "bonaire" => GpuDeviceType::Bonaire,
    "spectre" => GpuDeviceType::Spectre,
    "spooky" => GpuDeviceType::Spooky,
    "kalindi" => GpuDeviceType::Kalindi,
    "hainan" => GpuDeviceType::Hainan,
    "hawaii" => GpuDeviceType::Hawaii,
    "iceland" => GpuDeviceType::Iceland,
    "tonga" => GpuDeviceType::Tonga,
    "mullins" => GpuDeviceType::Mullins,
};

impl GpuDeviceType {
    /// Resolves a device from its driver name, case-insensitively.
    pub fn from_name(name: &str) -> Result<Self, AsmError> {
        GPU_DEVICES_BY_NAME
            .get(name.to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| AsmError::Semantic(format!("Unknown GPU device type '{name}'")))
    }

    /// The driver-visible device name.
    pub fn name(self) -> &'static str {
        GPU_DEVICE_NAMES[self as usize]
    }

    /// `e_machine` of the outer ELF.
    pub fn elf_machine(self) -> u32 {
        GPU_DEVICE_CODES[self as usize]
    }

    /// Machine code of the inner CAL encoding entry.
    pub fn inner_machine(self) -> u16 {
        GPU_INNER_CODES[self as usize]
    }

    /// Architecture generation of the device.
    pub fn arch(self) -> GcnArch {
        match self {
            GpuDeviceType::Undefined
            | GpuDeviceType::CapeVerde
            | GpuDeviceType::Pitcairn
            | GpuDeviceType::Tahiti
            | GpuDeviceType::Oland
            | GpuDeviceType::Hainan => GcnArch::Gcn10,
            GpuDeviceType::Bonaire
            | GpuDeviceType::Spectre
            | GpuDeviceType::Spooky
            | GpuDeviceType::Kalindi
            | GpuDeviceType::Hawaii
            | GpuDeviceType::Mullins => GcnArch::Gcn11,
            GpuDeviceType::Iceland | GpuDeviceType::Tonga => GcnArch::Gcn12,
        }
    }
}

/// CAL note type tags of the inner ELF `PT_NOTE` segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum CalNoteType {
    /// Program info key/value blob.
    ProgInfo = 1,
    /// Read-only image inputs.
    Inputs = 2,
    /// Outputs.
    Outputs = 3,
    /// Conditional output flag.
    CondOut = 4,
    /// Float32 constant buffer.
    Float32Consts = 5,
    /// Int32 constant buffer.
    Int32Consts = 6,
    /// Bool32 constant buffer.
    Bool32Consts = 7,
    /// Early-exit flag.
    EarlyExit = 8,
    /// Global buffers.
    GlobalBuffers = 9,
    /// Constant buffer table.
    ConstantBuffers = 10,
    /// Input samplers.
    InputSamplers = 11,
    /// Persistent buffers.
    PersistentBuffers = 12,
    /// Scratch buffer size.
    ScratchBuffers = 13,
    /// Sub constant buffers.
    SubConstantBuffers = 14,
    /// UAV mailbox size.
    UavMailboxSize = 15,
    /// UAV table.
    Uav = 16,
    /// UAV op mask.
    UavOpMask = 17,
}

/// The 8-byte name field every CAL note header carries.
pub const CAL_NOTE_NAME: [u8; 8] = *b"ATI CAL\0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_lookup() {
        assert_eq!(
            GpuDeviceType::from_name("Tahiti").unwrap(),
            GpuDeviceType::Tahiti
        );
        assert_eq!(
            GpuDeviceType::from_name("capeverde").unwrap(),
            GpuDeviceType::CapeVerde
        );
        assert!(GpuDeviceType::from_name("cypress").is_err());
    }

    #[test]
    fn device_codes() {
        assert_eq!(GpuDeviceType::CapeVerde.elf_machine(), 0x3ff);
        assert_eq!(GpuDeviceType::Tahiti.elf_machine(), 0x3fd);
        assert_eq!(GpuDeviceType::Mullins.elf_machine(), 0x40b);
        assert_eq!(GpuDeviceType::CapeVerde.inner_machine(), 0x1c);
        assert_eq!(GpuDeviceType::Tonga.inner_machine(), 0x2a);
    }

    #[test]
    fn arch_properties() {
        assert_eq!(GpuDeviceType::Tahiti.arch(), GcnArch::Gcn10);
        assert_eq!(GpuDeviceType::Hawaii.arch(), GcnArch::Gcn11);
        assert_eq!(GpuDeviceType::Tonga.arch(), GcnArch::Gcn12);
        assert_eq!(GcnArch::Gcn12.max_sgprs(), 102);
        assert_eq!(GcnArch::Gcn10.max_sgprs(), 104);
        assert_eq!(GcnArch::Gcn11.flat_scratch_reg(), 104);
        assert_eq!(GcnArch::Gcn12.flat_scratch_reg(), 102);
    }
}
