//! Kernel configuration model and the `;KEY:` metadata text consumed by the
//! vendor OpenCL runtime.
//!
//! The metadata grammar is line-per-entry with a fixed entry order; several
//! entries change shape with the driver version, routed through
//! [`DriverQuirks`](crate::quirks::DriverQuirks).

use std::fmt::Write;

use flagset::{flags, FlagSet};

use crate::quirks::DriverQuirks;
use crate::{AsmError, GpuDeviceType};

/// Sentinel requesting driver-version-gated derivation of an optional field.
pub const AMDBIN_DEFAULT: u32 = u32::MAX;
/// Sentinel for an optional field that is absent entirely.
pub const AMDBIN_NOTSUPPLIED: u32 = u32::MAX - 1;

flags! {
    /// Pointer access qualifier bits of a kernel argument.
    pub enum PtrAccess: u8 {
        /// `read_only`.
        ReadOnly,
        /// `write_only`.
        WriteOnly,
        /// `read_write`.
        ReadWrite,
        /// `const`.
        Const,
        /// `restrict`.
        Restrict,
        /// `volatile`.
        Volatile,
    }
}

/// Address space of a pointer argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PtrSpace {
    /// Not a pointer or unset.
    #[default]
    None,
    /// Private memory.
    Private,
    /// Work-group local memory.
    Local,
    /// Global memory.
    Global,
    /// Constant memory.
    Constant,
}

/// Element type of a scalar or vector argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// Unsigned 8-bit.
    U8,
    /// Signed 8-bit.
    I8,
    /// Unsigned 16-bit.
    U16,
    /// Signed 16-bit.
    I16,
    /// Unsigned 32-bit.
    U32,
    /// Signed 32-bit.
    I32,
    /// Unsigned 64-bit.
    U64,
    /// Signed 64-bit.
    I64,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
}

impl ScalarKind {
    fn type_name(self) -> &'static str {
        match self {
            ScalarKind::U8 => "u8",
            ScalarKind::I8 => "i8",
            ScalarKind::U16 => "u16",
            ScalarKind::I16 => "i16",
            ScalarKind::U32 => "u32",
            ScalarKind::I32 => "i32",
            ScalarKind::U64 => "u64",
            ScalarKind::I64 => "i64",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
        }
    }

    fn elem_size(self) -> u32 {
        match self {
            ScalarKind::U8 | ScalarKind::I8 => 1,
            ScalarKind::U16 | ScalarKind::I16 => 2,
            ScalarKind::U32 | ScalarKind::I32 | ScalarKind::Float => 4,
            ScalarKind::U64 | ScalarKind::I64 | ScalarKind::Double => 8,
        }
    }
}

/// Image dimensionality of an image argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Generic `image_t`, treated as 2D.
    Img,
    /// 1D image.
    Img1D,
    /// 1D image array.
    Img1DArray,
    /// 1D image buffer.
    Img1DBuffer,
    /// 2D image.
    Img2D,
    /// 2D image array.
    Img2DArray,
    /// 3D image.
    Img3D,
}

impl ImageKind {
    fn metadata_name(self) -> &'static str {
        match self {
            ImageKind::Img | ImageKind::Img2D => "2D",
            ImageKind::Img1D => "1D",
            ImageKind::Img1DArray => "1DA",
            ImageKind::Img1DBuffer => "1DB",
            ImageKind::Img2DArray => "2DA",
            ImageKind::Img3D => "3D",
        }
    }
}

/// Type of a kernel argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelArgType {
    /// A scalar primitive.
    Scalar(ScalarKind),
    /// A vector of 2, 3, 4, 8 or 16 elements.
    Vector(ScalarKind, u8),
    /// A pointer; the pointee is in `KernelArg::pointer_type`.
    Pointer,
    /// An image.
    Image(ImageKind),
    /// A sampler.
    Sampler,
    /// An opaque structure of `KernelArg::struct_size` bytes.
    Structure,
    /// A 32-bit atomic counter.
    Counter32,
}

impl KernelArgType {
    /// True for any image type.
    pub fn is_image(&self) -> bool {
        matches!(self, KernelArgType::Image(_))
    }

    /// `(type name, element size, vector size)` of the types that carry one
    /// in metadata.
    fn type_info(&self) -> Option<(&'static str, u32, u32)> {
        match self {
            KernelArgType::Scalar(k) => Some((k.type_name(), k.elem_size(), 1)),
            KernelArgType::Vector(k, n) => {
                Some((k.type_name(), k.elem_size(), u32::from(*n)))
            }
            KernelArgType::Sampler => Some(("u32", 4, 1)),
            KernelArgType::Structure => Some(("opaque", 0, 1)),
            _ => None,
        }
    }

    /// The size a value of this type occupies in the argument buffer.
    fn value_size(&self) -> u32 {
        let (elem, vec) = self
            .type_info()
            .map(|(_, e, v)| (e, v))
            .unwrap_or((1, 1));
        (if vec == 3 { 4 } else { vec }) * elem
    }
}

/// One kernel argument.
#[derive(Debug, Clone)]
pub struct KernelArg {
    /// Argument name.
    pub arg_name: String,
    /// Source-level type name, echoed into `;reflection` entries.
    pub type_name: String,
    /// Kind of the argument.
    pub arg_type: KernelArgType,
    /// Pointee type of a pointer argument.
    pub pointer_type: Option<KernelArgType>,
    /// Address space of a pointer argument.
    pub ptr_space: PtrSpace,
    /// Access qualifier bits.
    pub ptr_access: FlagSet<PtrAccess>,
    /// Byte size of a structure argument or structure pointee.
    pub struct_size: u32,
    /// The kernel actually reads or writes through this argument.
    pub used: bool,
}

impl KernelArg {
    /// Creates a non-pointer argument with defaults.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>, arg_type: KernelArgType) -> Self {
        KernelArg {
            arg_name: name.into(),
            type_name: type_name.into(),
            arg_type,
            pointer_type: None,
            ptr_space: PtrSpace::None,
            ptr_access: FlagSet::default(),
            struct_size: 0,
            used: true,
        }
    }
}

/// Structured configuration of one kernel.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Ordered argument list.
    pub args: Vec<KernelArg>,
    /// Constant sampler values.
    pub samplers: Vec<u32>,
    /// Required work-group size, zeroes when unset.
    pub reqd_work_group_size: [u32; 3],
    /// Hardware local memory size.
    pub hw_local_size: u32,
    /// Hardware region size.
    pub hw_region: u32,
    /// Scratch buffer size.
    pub scratch_buffer_size: u32,
    /// Private UAV size.
    pub uav_private: u32,
    /// UAV id base.
    pub uav_id: u32,
    /// Constant buffer id.
    pub const_buffer_id: u32,
    /// Printf buffer id.
    pub printf_id: u32,
    /// Private buffer id.
    pub private_id: u32,
    /// Number of user-data elements, at most 16.
    pub user_data_elems_num: u32,
    /// Conditional-out value.
    pub cond_out: u32,
    /// Early-exit value.
    pub early_exit: u32,
    /// Kernel requires the constant data section.
    pub const_data_required: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            args: Vec::new(),
            samplers: Vec::new(),
            reqd_work_group_size: [0; 3],
            hw_local_size: 0,
            hw_region: AMDBIN_DEFAULT,
            scratch_buffer_size: 0,
            uav_private: AMDBIN_DEFAULT,
            uav_id: AMDBIN_DEFAULT,
            const_buffer_id: AMDBIN_DEFAULT,
            printf_id: AMDBIN_DEFAULT,
            private_id: AMDBIN_DEFAULT,
            user_data_elems_num: 0,
            cond_out: 0,
            early_exit: 0,
            const_data_required: false,
        }
    }
}

/// Kernel configuration with all `DEFAULT` sentinels resolved against the
/// driver quirks.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TempKernelConfig {
    pub hw_region: u32,
    pub uav_private: u32,
    pub uav_id: u32,
    pub const_buffer_id: u32,
    pub printf_id: u32,
    pub private_id: u32,
}

impl TempKernelConfig {
    pub(crate) fn resolve(
        config: &KernelConfig,
        quirks: &DriverQuirks,
    ) -> Result<Self, AsmError> {
        if config.user_data_elems_num > 16 {
            return Err(AsmError::Range(
                "UserDataElemsNum must not be greater than 16".into(),
            ));
        }
        let hw_region = if config.hw_region == AMDBIN_DEFAULT {
            0
        } else {
            config.hw_region
        };
        let uav_private = if config.uav_private == AMDBIN_DEFAULT {
            derive_uav_private(config, quirks)
        } else {
            config.uav_private
        };
        let uav_id = if config.uav_id == AMDBIN_DEFAULT {
            if quirks.older_than_1384 {
                9
            } else {
                11
            }
        } else {
            config.uav_id
        };
        let const_buffer_id = if config.const_buffer_id == AMDBIN_DEFAULT {
            if quirks.older_than_1384 {
                AMDBIN_NOTSUPPLIED
            } else {
                10
            }
        } else {
            config.const_buffer_id
        };
        let printf_id = if config.printf_id == AMDBIN_DEFAULT {
            if quirks.older_than_1384 {
                AMDBIN_NOTSUPPLIED
            } else {
                9
            }
        } else {
            config.printf_id
        };
        let private_id = if config.private_id == AMDBIN_DEFAULT {
            8
        } else {
            config.private_id
        };
        Ok(TempKernelConfig {
            hw_region,
            uav_private,
            uav_id,
            const_buffer_id,
            printf_id,
            private_id,
        })
    }
}

fn derive_uav_private(config: &KernelConfig, quirks: &DriverQuirks) -> u32 {
    let mut forces_uav_private = false;
    let mut amount_of_args: u32 = 0;
    for arg in &config.args {
        if arg.arg_type != KernelArgType::Structure {
            forces_uav_private = true;
        }
        if !quirks.older_than_1598 && arg.arg_type != KernelArgType::Structure {
            continue;
        }
        match arg.arg_type {
            KernelArgType::Pointer => amount_of_args += 32,
            KernelArgType::Structure => {
                amount_of_args += if quirks.older_than_1598 {
                    (arg.struct_size + 15) & !15
                } else {
                    32
                };
            }
            _ => {
                let type_size = arg.arg_type.value_size();
                amount_of_args += ((type_size + 15) >> 4) << 5;
            }
        }
    }
    if forces_uav_private || config.scratch_buffer_size != 0 {
        config.scratch_buffer_size + amount_of_args
    } else {
        0
    }
}

/// Per-kernel resource counts shared by the CAL note emitters and the size
/// accounting.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct KernelResources {
    pub read_only_images: u32,
    pub write_only_images: u32,
    pub uavs_num: u32,
    pub not_used_uav: bool,
    pub samplers_num: u32,
    pub const_buffers_num: u32,
}

pub(crate) fn count_resources(config: &KernelConfig) -> KernelResources {
    let mut res = KernelResources {
        uavs_num: 1,
        samplers_num: config.samplers.len() as u32,
        const_buffers_num: 2,
        ..KernelResources::default()
    };
    for arg in &config.args {
        if arg.arg_type.is_image() {
            let access = arg.ptr_access
                & (PtrAccess::ReadOnly | PtrAccess::WriteOnly | PtrAccess::ReadWrite);
            if access == FlagSet::from(PtrAccess::ReadOnly) {
                res.read_only_images += 1;
            }
            if access == FlagSet::from(PtrAccess::WriteOnly) {
                res.write_only_images += 1;
                res.uavs_num += 1;
            }
        } else if arg.arg_type == KernelArgType::Pointer {
            if arg.ptr_space == PtrSpace::Global {
                if arg.used {
                    res.uavs_num += 1;
                } else {
                    res.not_used_uav = true;
                }
            }
            if arg.ptr_space == PtrSpace::Constant {
                res.const_buffers_num += 1;
            }
        } else if arg.arg_type == KernelArgType::Sampler {
            res.samplers_num += 1;
        }
    }
    if res.not_used_uav {
        res.uavs_num += 1;
    }
    res
}

/// Produces the kernel metadata text.
pub(crate) fn synthesize_metadata(
    kernel_name: &str,
    config: &KernelConfig,
    tcfg: &TempKernelConfig,
    quirks: &DriverQuirks,
    device: GpuDeviceType,
    is_64bit: bool,
    unique_id: u32,
) -> Result<String, AsmError> {
    let mut m = String::with_capacity(256);
    let _ = write!(m, ";ARGSTART:__OpenCL_{kernel_name}_kernel\n");
    if quirks.older_than_1124 {
        m.push_str(";version:3:1:104\n");
    } else {
        m.push_str(";version:3:1:111\n");
    }
    let _ = write!(m, ";device:{}\n", device.name());
    let _ = write!(m, ";uniqueid:{unique_id}\n");
    let _ = write!(m, ";memory:uavprivate:{}\n", tcfg.uav_private);
    let _ = write!(m, ";memory:hwlocal:{}\n", config.hw_local_size);
    let _ = write!(m, ";memory:hwregion:{}\n", tcfg.hw_region);
    let cws = &config.reqd_work_group_size;
    if cws[0] != 0 || cws[1] != 0 || cws[2] != 0 {
        let _ = write!(m, ";cws:{}:{}:{}\n", cws[0], cws[1], cws[2]);
    }

    let mut arg_offset: u32 = 0;
    let mut read_only_image_count: u32 = 0;
    let mut write_only_image_count: u32 = 0;
    let mut uav_id = tcfg.uav_id + 1;
    let mut constant_id: u32 = 2;
    for (k, arg) in config.args.iter().enumerate() {
        match arg.arg_type {
            KernelArgType::Structure => {
                let _ = write!(
                    m,
                    ";value:{}:struct:{}:1:{arg_offset}\n",
                    arg.arg_name, arg.struct_size
                );
                arg_offset += (arg.struct_size + 15) >> 4;
            }
            KernelArgType::Pointer => {
                let ptr_type = arg.pointer_type.unwrap_or(KernelArgType::Scalar(ScalarKind::U8));
                let (type_name, _, _) = ptr_type
                    .type_info()
                    .ok_or_else(|| AsmError::Semantic("Type not supported!".into()))?;
                let _ = write!(
                    m,
                    ";pointer:{}:{type_name}:1:1:{arg_offset}:",
                    arg.arg_name
                );
                match arg.ptr_space {
                    PtrSpace::Local => m.push_str("hl:1"),
                    PtrSpace::Constant => {
                        if quirks.older_than_1384 {
                            let _ = write!(m, "hc{constant_id}");
                            constant_id += 1;
                        } else if arg.used {
                            let _ = write!(m, "c{uav_id}");
                            uav_id += 1;
                        } else {
                            let _ = write!(m, "c{}", tcfg.uav_id);
                        }
                    }
                    PtrSpace::Global => {
                        let _ = write!(m, "uav:{uav_id}");
                        uav_id += 1;
                    }
                    _ => {}
                }
                let elem_size = if ptr_type == KernelArgType::Structure {
                    if arg.struct_size != 0 {
                        arg.struct_size
                    } else {
                        4
                    }
                } else {
                    ptr_type.value_size()
                };
                let _ = write!(
                    m,
                    ":{elem_size}:{}:{}:{}\n",
                    if arg.ptr_access.contains(PtrAccess::Const) {
                        "RO"
                    } else {
                        "RW"
                    },
                    u8::from(arg.ptr_access.contains(PtrAccess::Volatile)),
                    u8::from(arg.ptr_access.contains(PtrAccess::Restrict)),
                );
                arg_offset += 32;
            }
            KernelArgType::Image(img) => {
                let access = arg.ptr_access
                    & (PtrAccess::ReadOnly | PtrAccess::WriteOnly | PtrAccess::ReadWrite);
                let access_name = if access == FlagSet::from(PtrAccess::ReadOnly) {
                    "RO"
                } else if access == FlagSet::from(PtrAccess::WriteOnly) {
                    "WO"
                } else if access == FlagSet::from(PtrAccess::ReadWrite) {
                    "RW"
                } else {
                    return Err(AsmError::Semantic("Invalid image access qualifier!".into()));
                };
                let index = if access == FlagSet::from(PtrAccess::ReadOnly) {
                    let i = read_only_image_count;
                    read_only_image_count += 1;
                    i
                } else {
                    let i = write_only_image_count;
                    write_only_image_count += 1;
                    i
                };
                let _ = write!(
                    m,
                    ";image:{}:{}:{access_name}:{index}:1:{arg_offset}\n",
                    arg.arg_name,
                    img.metadata_name()
                );
                arg_offset += 32;
            }
            KernelArgType::Counter32 => {
                let _ = write!(m, ";counter:{}:32:0:1:{arg_offset}\n", arg.arg_name);
                arg_offset += 16;
            }
            _ => {
                let (type_name, _, vec_size) = arg
                    .arg_type
                    .type_info()
                    .ok_or_else(|| AsmError::Semantic("Type not supported!".into()))?;
                let _ = write!(
                    m,
                    ";value:{}:{type_name}:{vec_size}:{arg_offset}\n",
                    arg.arg_name
                );
                arg_offset += (arg.arg_type.value_size() + 15) >> 4;
            }
        }
        if arg.ptr_access.contains(PtrAccess::Const) {
            let _ = write!(m, ";constant:{k}:{}\n", arg.arg_name);
        }
    }

    if config.const_data_required {
        m.push_str(";memory:datareqd\n");
    }
    let _ = write!(m, ";function:1:{unique_id}\n");

    let mut samp_id: u32 = 0;
    for &samp in &config.samplers {
        let _ = write!(m, ";sampler:unknown_{samp}:{samp_id}:1:{samp}\n");
        samp_id += 1;
    }
    for arg in &config.args {
        if arg.arg_type == KernelArgType::Sampler {
            let _ = write!(m, ";sampler:{}:{samp_id}:0:0\n", arg.arg_name);
            samp_id += 1;
        }
    }

    if is_64bit {
        m.push_str(";memory:64bitABI\n");
    }
    let _ = write!(m, ";uavid:{}\n", tcfg.uav_id);
    if tcfg.printf_id != AMDBIN_NOTSUPPLIED {
        let _ = write!(m, ";printfid:{}\n", tcfg.printf_id);
    }
    if tcfg.const_buffer_id != AMDBIN_NOTSUPPLIED {
        let _ = write!(m, ";cbid:{}\n", tcfg.const_buffer_id);
    }
    let _ = write!(m, ";privateid:{}\n", tcfg.private_id);
    for (k, arg) in config.args.iter().enumerate() {
        let _ = write!(m, ";reflection:{k}:{}\n", arg.type_name);
    }
    let _ = write!(m, ";ARGEND:__OpenCL_{kernel_name}_kernel\n");
    Ok(m)
}
