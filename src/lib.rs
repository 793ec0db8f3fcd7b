//! gcnasm is an assembler core and binary generator for AMD GCN GPU code.
//!
//! The parsing half understands GCN operand syntax: register ranges with
//! per-generation alignment rules, inline-constant folding of small integers
//! and a bounded set of IEEE-754 constants, and the VOP3/SDWA/DPP modifier
//! grammar. The emitting half produces the AMD "calx" OpenCL binary format,
//! an outer ELF wrapping per-kernel CAL ELFs with a byte-exact layout.
//!
//! # Limitations
//!
//! The instruction table covers a representative SOP/VOP subset; richer
//! statement sets plug in through the operand and modifier parsers.
//!
//! # Examples
//!
//! ```
//! use gcnasm::{AsmProgram, GpuDeviceType};
//!
//! let source = ".kernel empty\n.config\n.text\ns_mov_b32 s0, 0\n";
//! let program = AsmProgram::new(150005);
//! let entries = program
//!     .compile(source, &[GpuDeviceType::CapeVerde], "-x asm")
//!     .unwrap();
//! assert!(entries[0].binary.is_some());
//! ```

#![warn(missing_docs)]

pub mod bingen;
pub mod consts;
mod cursor;
pub mod driver;
mod error;
pub mod metadata;
pub mod modifiers;
pub mod numeric;
pub mod operand;
pub mod quirks;
pub mod regs;
mod session;

mod encoder;

pub use flagset;

pub use bingen::{AmdGpuBinGenerator, AmdInput, CalNoteHeader, CalNoteInput, KernelInput};
pub use consts::{CalNoteType, GcnArch, GpuDeviceType};
#[doc(inline)]
pub use cursor::Cursor;
#[doc(inline)]
pub use driver::{
    loader_env, overall_status, parse_compiler_options, AsmProgram, BuildStatus,
    CompilerOptions, ProgDeviceEntry,
};
pub use error::{AsmError, Diagnostic, Diagnostics, Severity};
pub use metadata::{KernelArg, KernelArgType, KernelConfig, PtrAccess, PtrSpace};
pub use modifiers::{GcnEncSize, GcnVopEnc, VopExtraModifiers};
pub use operand::GcnOperand;
pub use quirks::DriverQuirks;
pub use regs::{
    LitKind, OperandFlag, OperandFlags, RegField, RegRange, RegVar, RegVarType, RegVarUsage,
};
#[doc(inline)]
pub use session::{AsmSession, ExprValue, ImmSign, UnresolvedExpr, SECTION_ABS};
