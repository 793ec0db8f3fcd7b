//! Top-level assembly driver.
//!
//! Takes source text, a device list and a compiler-options string, assembles
//! once per distinct device type and returns a device-ordered list of program
//! entries. Per-program state is guarded by a mutex; a failing device leaves
//! the other devices' results intact.

use std::collections::HashMap;
use std::sync::Mutex;

use flagset::{flags, FlagSet};
use log::debug;

use crate::bingen::{AmdGpuBinGenerator, AmdInput, KernelInput};
use crate::cursor::Cursor;
use crate::metadata::{
    ImageKind, KernelArg, KernelArgType, KernelConfig, PtrAccess, PtrSpace, ScalarKind,
};
use crate::numeric::{self, parse_env_variable};
use crate::session::AsmSession;
use crate::{AsmError, GpuDeviceType};

flags! {
    /// Assembler behavior switches from the compiler options.
    pub enum AsmFlag: u8 {
        /// Warnings enabled (`-w` clears it).
        Warnings,
        /// `-forceAddSymbols`.
        ForceAddSymbols,
    }
}

/// Parsed compiler options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerOptions {
    /// `-I`/`-includepath` paths, resolved by the external includer.
    pub include_paths: Vec<String>,
    /// `-D`/`-defsym` symbol definitions.
    pub defsyms: Vec<(String, u64)>,
    /// Behavior switches.
    pub flags: FlagSet<AsmFlag>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            include_paths: Vec::new(),
            defsyms: Vec::new(),
            flags: AsmFlag::Warnings.into(),
        }
    }
}

fn is_sym_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'.' || b == b'_' || b == b'$'
}

fn is_sym_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'$'
}

fn parse_defsym(word: &str) -> Result<(String, u64), AsmError> {
    let (name, value_text) = match word.split_once('=') {
        Some((n, v)) => (n, Some(v)),
        None => (word, None),
    };
    let bytes = name.as_bytes();
    let valid = !bytes.is_empty()
        && is_sym_start(bytes[0])
        && bytes.iter().all(|&b| is_sym_char(b));
    if !valid {
        return Err(AsmError::Parse(format!("Invalid symbol name '{name}'")));
    }
    let value = match value_text {
        Some(text) if text.starts_with('-') => {
            let mut cur = Cursor::new(text, 0);
            numeric::parse_int(&mut cur, 64)? as u64
        }
        Some(text) => numeric::parse_uint_str(text, 64)?,
        None => 0,
    };
    Ok((name.to_string(), value))
}

/// Parses the whitespace-separated compiler-options grammar.
pub fn parse_compiler_options(text: &str) -> Result<CompilerOptions, AsmError> {
    let mut options = CompilerOptions::default();
    let mut next_is_include = false;
    let mut next_is_defsym = false;
    let mut next_is_lang = false;
    for word in text.split_whitespace() {
        if next_is_include {
            next_is_include = false;
            options.include_paths.push(word.to_string());
        } else if next_is_defsym {
            next_is_defsym = false;
            options.defsyms.push(parse_defsym(word)?);
        } else if next_is_lang {
            next_is_lang = false;
            if word != "asm" {
                return Err(AsmError::Semantic(format!("Unsupported language '{word}'")));
            }
        } else if let Some(rest) = word.strip_prefix('-') {
            match rest {
                "w" => options.flags -= AsmFlag::Warnings,
                "forceAddSymbols" => options.flags |= AsmFlag::ForceAddSymbols,
                "I" | "includepath" => next_is_include = true,
                "D" | "defsym" => next_is_defsym = true,
                "x" => next_is_lang = true,
                "xasm" => {}
                _ => {
                    if let Some(path) = rest.strip_prefix("includepath=") {
                        options.include_paths.push(path.to_string());
                    } else if let Some(path) = rest.strip_prefix('I') {
                        options.include_paths.push(path.to_string());
                    } else if let Some(sym) = rest.strip_prefix("defsym=") {
                        options.defsyms.push(parse_defsym(sym)?);
                    } else if let Some(sym) = rest.strip_prefix('D') {
                        options.defsyms.push(parse_defsym(sym)?);
                    } else {
                        return Err(AsmError::Semantic(format!(
                            "Unknown compiler option '{word}'"
                        )));
                    }
                }
            }
        } else {
            return Err(AsmError::Semantic(format!(
                "Unexpected word '{word}' in compiler options"
            )));
        }
    }
    if next_is_include || next_is_defsym || next_is_lang {
        return Err(AsmError::Parse("Missing argument of last option".into()));
    }
    Ok(options)
}

/// Host-loader environment, read once at driver initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderEnv {
    /// `CLRX_FORCE_ORIGINAL_AMDOCL`.
    pub force_original_amdocl: bool,
    /// `CLRX_AMDOCL_PATH`.
    pub amdocl_path: Option<String>,
}

/// Reads the loader environment variables.
pub fn loader_env() -> LoaderEnv {
    let path: String = parse_env_variable("CLRX_AMDOCL_PATH", String::new());
    LoaderEnv {
        force_original_amdocl: parse_env_variable("CLRX_FORCE_ORIGINAL_AMDOCL", false),
        amdocl_path: if path.is_empty() { None } else { Some(path) },
    }
}

/// Per-device compilation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// Binary produced.
    Success,
    /// Assembly or generation failed; the log has the diagnostics.
    Error,
    /// Compilation still running.
    InProgress,
}

/// Result of one device's compilation.
#[derive(Debug, Clone)]
pub struct ProgDeviceEntry {
    /// Outcome for this device.
    pub status: BuildStatus,
    /// Accumulated diagnostics, in source order.
    pub log: String,
    /// The produced binary on success.
    pub binary: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct ProgramState {
    entries: Vec<ProgDeviceEntry>,
}

/// A compilation unit holding per-program state behind a mutex. `compile`
/// may be called from multiple threads; calls on the same program serialize.
#[derive(Debug)]
pub struct AsmProgram {
    driver_version: u32,
    state: Mutex<ProgramState>,
}

impl AsmProgram {
    /// Creates a program targeting the given driver version.
    pub fn new(driver_version: u32) -> Self {
        AsmProgram {
            driver_version,
            state: Mutex::new(ProgramState::default()),
        }
    }

    /// Results of the last compilation, device-ordered.
    pub fn device_entries(&self) -> Vec<ProgDeviceEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    /// Assembles `source` for every device, reusing bytes across devices of
    /// equal type. Returns the device-ordered entries.
    pub fn compile(
        &self,
        source: &str,
        devices: &[GpuDeviceType],
        options_text: &str,
    ) -> Result<Vec<ProgDeviceEntry>, AsmError> {
        let mut state = self.state.lock().unwrap();
        let options = parse_compiler_options(options_text)?;
        let is_64bit = parse_env_variable("GPU_FORCE_64BIT_PTR", false);

        state.entries = devices
            .iter()
            .map(|_| ProgDeviceEntry {
                status: BuildStatus::InProgress,
                log: String::new(),
                binary: None,
            })
            .collect();

        let mut by_type: HashMap<GpuDeviceType, usize> = HashMap::new();
        for i in 0..devices.len() {
            if let Some(&prev) = by_type.get(&devices[i]) {
                let reused = state.entries[prev].clone();
                state.entries[i] = reused;
                continue;
            }
            debug!("assembling for {}", devices[i].name());
            let entry = assemble_for_device(
                source,
                devices[i],
                &options,
                options_text,
                is_64bit,
                self.driver_version,
            );
            state.entries[i] = entry;
            by_type.insert(devices[i], i);
        }
        Ok(state.entries.clone())
    }
}

/// Process exit code of a compilation: 0 when every device succeeded.
pub fn overall_status(entries: &[ProgDeviceEntry]) -> i32 {
    if entries.iter().all(|e| e.status == BuildStatus::Success) {
        0
    } else {
        1
    }
}

/// The first failing device's log, for single-line reporting.
pub fn first_failure(entries: &[ProgDeviceEntry]) -> Option<&str> {
    entries
        .iter()
        .find(|e| e.status == BuildStatus::Error)
        .map(|e| e.log.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Text,
    Data,
    Config,
    GlobalData,
}

struct KernelBuild {
    name: String,
    config: KernelConfig,
    code: Vec<u8>,
    data: Vec<u8>,
}

struct SourceParser<'a> {
    session: AsmSession,
    kernels: Vec<KernelBuild>,
    current: Option<usize>,
    section: Section,
    global_data: Vec<u8>,
    source: &'a str,
}

fn assemble_for_device(
    source: &str,
    device: GpuDeviceType,
    options: &CompilerOptions,
    options_text: &str,
    is_64bit: bool,
    driver_version: u32,
) -> ProgDeviceEntry {
    let mut session = AsmSession::new(
        device.arch(),
        options.flags.contains(AsmFlag::Warnings),
    );
    for (name, value) in &options.defsyms {
        session.add_defsym(name.clone(), *value);
    }
    let mut parser = SourceParser {
        session,
        kernels: Vec::new(),
        current: None,
        section: Section::Text,
        global_data: Vec::new(),
        source,
    };
    parser.run();

    let SourceParser {
        session,
        kernels,
        global_data,
        ..
    } = parser;
    if session.diags.has_errors() {
        return ProgDeviceEntry {
            status: BuildStatus::Error,
            log: session.diags.render(),
            binary: None,
        };
    }

    let mut input = AmdInput::new(is_64bit, device, driver_version);
    input.compile_options = options_text.to_string();
    if !global_data.is_empty() {
        input.global_data = Some(global_data);
    }
    for kernel in kernels {
        let mut kinput = KernelInput::with_config(kernel.name, kernel.code, kernel.config);
        if !kernel.data.is_empty() {
            kinput.data = Some(kernel.data);
        }
        input.add_kernel(kinput);
    }
    match AmdGpuBinGenerator::new(&input).generate() {
        Ok(binary) => ProgDeviceEntry {
            status: BuildStatus::Success,
            log: session.diags.render(),
            binary: Some(binary),
        },
        Err(err) => {
            let mut log = session.diags.render();
            log.push_str(&format!("Error: {err}\n"));
            ProgDeviceEntry {
                status: BuildStatus::Error,
                log,
                binary: None,
            }
        }
    }
}

impl SourceParser<'_> {
    fn run(&mut self) {
        let source = self.source;
        for (index, line) in source.lines().enumerate() {
            let mut cur = Cursor::new(line, index + 1);
            cur.skip_spaces();
            if cur.at_end() {
                continue;
            }
            let _ = self.parse_line(&mut cur);
        }
    }

    fn error(&mut self, cur: &Cursor, msg: impl Into<String>) -> AsmError {
        let msg = msg.into();
        self.session
            .diags
            .error(cur.lineno(), cur.column(), msg.as_str());
        AsmError::Semantic(msg)
    }

    fn parse_line(&mut self, cur: &mut Cursor) -> Result<(), AsmError> {
        if cur.peek() == Some(b'.') {
            cur.bump();
            let name = cur
                .extract_name()
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            return self.parse_directive(cur, &name);
        }
        // `symbol = expression` assignment
        let start = cur.pos();
        let sym = cur.extract_sym_name();
        if !sym.is_empty() {
            cur.skip_spaces();
            if cur.peek() == Some(b'=') {
                cur.skip_char_and_spaces();
                let value = self.session.get_absolute_value(cur)?;
                self.session.add_defsym(sym.to_string(), value);
                return Ok(());
            }
        }
        cur.set_pos(start);

        // an instruction statement
        let kernel = match self.current {
            Some(i) if self.section == Section::Text => i,
            Some(_) => return Err(self.error(cur, "Instruction outside the code section")),
            None => return Err(self.error(cur, "Instruction outside any kernel")),
        };
        self.session.out_pos = self.kernels[kernel].code.len();
        let words = self.session.assemble_instruction(cur)?;
        for word in words {
            self.kernels[kernel]
                .code
                .extend_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }

    fn current_kernel(&mut self, cur: &Cursor) -> Result<usize, AsmError> {
        match self.current {
            Some(i) => Ok(i),
            None => {
                let err = AsmError::Semantic("Kernel not defined".into());
                self.session
                    .diags
                    .error(cur.lineno(), cur.column(), err.to_string());
                Err(err)
            }
        }
    }

    fn config_kernel(&mut self, cur: &Cursor) -> Result<usize, AsmError> {
        let index = self.current_kernel(cur)?;
        if self.section != Section::Config {
            return Err(self.error(cur, "Configuration directive outside .config"));
        }
        Ok(index)
    }

    fn parse_directive(&mut self, cur: &mut Cursor, name: &str) -> Result<(), AsmError> {
        match name {
            "kernel" => {
                cur.skip_spaces();
                let kname = cur.extract_sym_name();
                if kname.is_empty() {
                    return Err(self.error(cur, "Expected kernel name"));
                }
                self.kernels.push(KernelBuild {
                    name: kname.to_string(),
                    config: KernelConfig::default(),
                    code: Vec::new(),
                    data: Vec::new(),
                });
                self.current = Some(self.kernels.len() - 1);
                self.section = Section::Text;
                Ok(())
            }
            "config" => {
                self.current_kernel(cur)?;
                self.section = Section::Config;
                Ok(())
            }
            "text" => {
                self.current_kernel(cur)?;
                self.section = Section::Text;
                Ok(())
            }
            "data" => {
                self.current_kernel(cur)?;
                self.section = Section::Data;
                Ok(())
            }
            "globaldata" => {
                self.section = Section::GlobalData;
                self.current = None;
                Ok(())
            }
            "cws" => {
                let index = self.config_kernel(cur)?;
                let mut cws = [0u32; 3];
                cws[0] = self.session.get_absolute_value(cur)? as u32;
                for slot in cws.iter_mut().skip(1) {
                    cur.skip_spaces();
                    if !cur.eat(b',') {
                        break;
                    }
                    *slot = self.session.get_absolute_value(cur)? as u32;
                }
                self.kernels[index].config.reqd_work_group_size = cws;
                Ok(())
            }
            "uavprivate" | "hwlocal" | "hwregion" | "uavid" | "cbid" | "printfid"
            | "privateid" | "scratchbuffer" | "earlyexit" | "condout" | "userdata" => {
                let index = self.config_kernel(cur)?;
                let value = self.session.get_absolute_value(cur)? as u32;
                let config = &mut self.kernels[index].config;
                match name {
                    "uavprivate" => config.uav_private = value,
                    "hwlocal" => config.hw_local_size = value,
                    "hwregion" => config.hw_region = value,
                    "uavid" => config.uav_id = value,
                    "cbid" => config.const_buffer_id = value,
                    "printfid" => config.printf_id = value,
                    "privateid" => config.private_id = value,
                    "scratchbuffer" => config.scratch_buffer_size = value,
                    "earlyexit" => config.early_exit = value,
                    "condout" => config.cond_out = value,
                    _ => config.user_data_elems_num = value,
                }
                Ok(())
            }
            "constdata" => {
                let index = self.config_kernel(cur)?;
                self.kernels[index].config.const_data_required = true;
                Ok(())
            }
            "sampler" => {
                let index = self.config_kernel(cur)?;
                loop {
                    let value = self.session.get_absolute_value(cur)? as u32;
                    self.kernels[index].config.samplers.push(value);
                    cur.skip_spaces();
                    if !cur.eat(b',') {
                        break;
                    }
                }
                Ok(())
            }
            "arg" => {
                let index = self.config_kernel(cur)?;
                let arg = self.parse_arg(cur)?;
                self.kernels[index].config.args.push(arg);
                Ok(())
            }
            "byte" => self.emit_ints(cur, 1),
            "short" => self.emit_ints(cur, 2),
            "int" => self.emit_ints(cur, 4),
            "quad" => self.emit_ints(cur, 8),
            "half" => self.emit_floats(cur, 2),
            "float" => self.emit_floats(cur, 4),
            "double" => self.emit_floats(cur, 8),
            "string" => {
                let bytes = self.parse_string(cur)?;
                self.emit_bytes(cur, &bytes)
            }
            _ => Err(self.error(cur, format!("Unknown directive '.{name}'"))),
        }
    }

    fn emit_target(&mut self, cur: &Cursor) -> Result<&mut Vec<u8>, AsmError> {
        match self.section {
            Section::GlobalData => Ok(&mut self.global_data),
            Section::Data => {
                let index = self.current_kernel(cur)?;
                Ok(&mut self.kernels[index].data)
            }
            Section::Text => {
                let index = self.current_kernel(cur)?;
                Ok(&mut self.kernels[index].code)
            }
            Section::Config => {
                let err = AsmError::Semantic("Data directive inside .config".into());
                self.session
                    .diags
                    .error(cur.lineno(), cur.column(), err.to_string());
                Err(err)
            }
        }
    }

    fn emit_bytes(&mut self, cur: &Cursor, bytes: &[u8]) -> Result<(), AsmError> {
        self.emit_target(cur)?.extend_from_slice(bytes);
        Ok(())
    }

    fn emit_ints(&mut self, cur: &mut Cursor, width: usize) -> Result<(), AsmError> {
        loop {
            let pos = cur.pos();
            let value = self.session.get_absolute_value(cur)?;
            self.session.warn_for_range(
                cur,
                pos,
                (width * 8) as u32,
                value,
                crate::session::ImmSign::Both,
            );
            let bytes = value.to_le_bytes();
            self.emit_bytes(cur, &bytes[..width])?;
            cur.skip_spaces();
            if !cur.eat(b',') {
                break;
            }
        }
        cur.skip_spaces();
        if !cur.at_end() {
            return Err(self.error(cur, "Garbage at end of line"));
        }
        Ok(())
    }

    fn emit_floats(&mut self, cur: &mut Cursor, width: usize) -> Result<(), AsmError> {
        loop {
            cur.skip_spaces();
            let pos = cur.pos();
            let result = match width {
                2 => numeric::parse_f16(cur).map(|v| u64::from(v)),
                4 => numeric::parse_f32(cur).map(u64::from),
                _ => numeric::parse_f64(cur),
            };
            let value = match result {
                Ok(v) => v,
                Err(err) => {
                    self.session
                        .diags
                        .error(cur.lineno(), pos + 1, err.to_string());
                    return Err(err);
                }
            };
            let bytes = value.to_le_bytes();
            self.emit_bytes(cur, &bytes[..width])?;
            cur.skip_spaces();
            if !cur.eat(b',') {
                break;
            }
        }
        cur.skip_spaces();
        if !cur.at_end() {
            return Err(self.error(cur, "Garbage at end of line"));
        }
        Ok(())
    }

    fn parse_string(&mut self, cur: &mut Cursor) -> Result<Vec<u8>, AsmError> {
        cur.skip_spaces();
        if !cur.eat(b'"') {
            return Err(self.error(cur, "Expected '\"' before string"));
        }
        let mut bytes = Vec::new();
        loop {
            match cur.peek() {
                Some(b'"') => {
                    cur.bump();
                    break;
                }
                Some(b'\\') => {
                    cur.bump();
                    let escaped = match cur.peek() {
                        Some(b'n') => b'\n',
                        Some(b't') => b'\t',
                        Some(b'0') => 0,
                        Some(b) => b,
                        None => return Err(self.error(cur, "Unterminated string")),
                    };
                    bytes.push(escaped);
                    cur.bump();
                }
                Some(b) => {
                    bytes.push(b);
                    cur.bump();
                }
                None => return Err(self.error(cur, "Unterminated string")),
            }
        }
        bytes.push(0);
        Ok(bytes)
    }

    /// `.arg <name>, <typename>, <type>[, <space>][, <qualifier>...]`
    fn parse_arg(&mut self, cur: &mut Cursor) -> Result<KernelArg, AsmError> {
        cur.skip_spaces();
        let name = cur.extract_sym_name();
        if name.is_empty() {
            return Err(self.error(cur, "Expected argument name"));
        }
        let name = name.to_string();
        cur.skip_spaces();
        if !cur.eat(b',') {
            return Err(self.error(cur, "Expected ',' before argument type name"));
        }
        cur.skip_spaces();
        let type_name_start = cur.pos();
        while matches!(cur.peek(), Some(b) if b != b',') {
            cur.bump();
        }
        let type_name = cur.span(type_name_start).trim().to_string();
        if type_name.is_empty() {
            return Err(self.error(cur, "Expected argument type name"));
        }
        if !cur.eat(b',') {
            return Err(self.error(cur, "Expected ',' before argument type"));
        }
        cur.skip_spaces();
        let spec_start = cur.pos();
        while matches!(cur.peek(), Some(b) if b != b',') {
            cur.bump();
        }
        let spec = cur.span(spec_start).trim().to_ascii_lowercase();

        let mut arg = KernelArg::new(name, type_name, KernelArgType::Scalar(ScalarKind::U32));
        if let Some(base) = spec.strip_suffix('*') {
            arg.arg_type = KernelArgType::Pointer;
            arg.pointer_type = Some(match parse_type_spec(base) {
                Some(t) => t,
                None => return Err(self.error(cur, format!("Unknown pointee type '{base}'"))),
            });
            arg.ptr_space = PtrSpace::Global;
        } else if let Some(size_text) = spec.strip_prefix("struct:") {
            arg.arg_type = KernelArgType::Structure;
            arg.struct_size = numeric::parse_uint_str(size_text, 32)
                .map_err(|e| self.error(cur, e.to_string()))? as u32;
        } else {
            arg.arg_type = match parse_type_spec(&spec) {
                Some(t) => t,
                None => return Err(self.error(cur, format!("Unknown argument type '{spec}'"))),
            };
        }

        while cur.eat(b',') {
            cur.skip_spaces();
            let qual_start = cur.pos();
            while matches!(cur.peek(), Some(b) if b != b',') {
                cur.bump();
            }
            let qual = cur.span(qual_start).trim().to_ascii_lowercase();
            match qual.as_str() {
                "global" => arg.ptr_space = PtrSpace::Global,
                "local" => arg.ptr_space = PtrSpace::Local,
                "constant" => arg.ptr_space = PtrSpace::Constant,
                "private" => arg.ptr_space = PtrSpace::Private,
                "const" => arg.ptr_access |= PtrAccess::Const,
                "restrict" => arg.ptr_access |= PtrAccess::Restrict,
                "volatile" => arg.ptr_access |= PtrAccess::Volatile,
                "rdonly" | "read_only" => arg.ptr_access |= PtrAccess::ReadOnly,
                "wronly" | "write_only" => arg.ptr_access |= PtrAccess::WriteOnly,
                "rdwr" | "read_write" => arg.ptr_access |= PtrAccess::ReadWrite,
                "unused" => arg.used = false,
                _ => {
                    return Err(
                        self.error(cur, format!("Unknown argument qualifier '{qual}'"))
                    )
                }
            }
            cur.skip_spaces();
        }
        cur.skip_spaces();
        if !cur.at_end() {
            return Err(self.error(cur, "Garbage at end of line"));
        }
        Ok(arg)
    }
}

fn parse_scalar_kind(spec: &str) -> Option<ScalarKind> {
    Some(match spec {
        "u8" => ScalarKind::U8,
        "i8" => ScalarKind::I8,
        "u16" => ScalarKind::U16,
        "i16" => ScalarKind::I16,
        "u32" => ScalarKind::U32,
        "i32" => ScalarKind::I32,
        "u64" => ScalarKind::U64,
        "i64" => ScalarKind::I64,
        "float" => ScalarKind::Float,
        "double" => ScalarKind::Double,
        _ => return None,
    })
}

fn parse_type_spec(spec: &str) -> Option<KernelArgType> {
    if let Some(kind) = parse_scalar_kind(spec) {
        return Some(KernelArgType::Scalar(kind));
    }
    match spec {
        "image" => return Some(KernelArgType::Image(ImageKind::Img)),
        "image1d" => return Some(KernelArgType::Image(ImageKind::Img1D)),
        "image1d_array" => return Some(KernelArgType::Image(ImageKind::Img1DArray)),
        "image1d_buffer" => return Some(KernelArgType::Image(ImageKind::Img1DBuffer)),
        "image2d" => return Some(KernelArgType::Image(ImageKind::Img2D)),
        "image2d_array" => return Some(KernelArgType::Image(ImageKind::Img2DArray)),
        "image3d" => return Some(KernelArgType::Image(ImageKind::Img3D)),
        "sampler" => return Some(KernelArgType::Sampler),
        "counter32" => return Some(KernelArgType::Counter32),
        _ => {}
    }
    // vector types: base kind followed by 2, 3, 4, 8 or 16
    let split = spec.len().checked_sub(1)?;
    for at in [split.saturating_sub(1), split] {
        if at == 0 {
            continue;
        }
        let (base, count) = spec.split_at(at);
        if let (Some(kind), Ok(n)) = (parse_scalar_kind(base), count.parse::<u8>()) {
            if matches!(n, 2 | 3 | 4 | 8 | 16) {
                return Some(KernelArgType::Vector(kind, n));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_parsing() {
        let opts =
            parse_compiler_options("-w -I/usr/include -D SYM=0x10 -defsym=other=2 -x asm")
                .unwrap();
        assert!(!opts.flags.contains(AsmFlag::Warnings));
        assert_eq!(opts.include_paths, vec!["/usr/include".to_string()]);
        assert_eq!(
            opts.defsyms,
            vec![("SYM".to_string(), 0x10), ("other".to_string(), 2)]
        );
        let opts = parse_compiler_options("-I dir -includepath=second -forceAddSymbols").unwrap();
        assert_eq!(opts.include_paths, vec!["dir", "second"]);
        assert!(opts.flags.contains(AsmFlag::ForceAddSymbols));
    }

    #[test]
    fn option_rejection() {
        assert!(parse_compiler_options("-x cl").is_err());
        assert!(parse_compiler_options("-O2").is_err());
        assert!(parse_compiler_options("stray").is_err());
        assert!(parse_compiler_options("-D").is_err());
        assert!(parse_compiler_options("-D 9bad=1").is_err());
        assert!(parse_compiler_options("-D a..b=xyz").is_err());
        assert!(parse_compiler_options("-x asm").is_ok());
        assert!(parse_compiler_options("-xasm").is_ok());
    }

    #[test]
    fn defsym_forms() {
        assert_eq!(parse_defsym("a=10").unwrap(), ("a".to_string(), 10));
        assert_eq!(parse_defsym("_x").unwrap(), ("_x".to_string(), 0));
        assert_eq!(
            parse_defsym("neg=-2").unwrap(),
            ("neg".to_string(), (-2i64) as u64)
        );
        assert_eq!(parse_defsym(".sym=0b101").unwrap(), (".sym".to_string(), 5));
    }

    const SOURCE: &str = "\
.kernel add
.config
.cws 64, 1, 1
.hwlocal 256
.arg n, uint, u32
.arg data, float*, float*, global
.text
s_mov_b32 s0, s1
v_mov_b32 v0, 1.0
v_add_f32 v1, v0, v2
.data
.int 1, 2, 3
";

    #[test]
    fn end_to_end_compile() {
        let program = AsmProgram::new(150005);
        let entries = program
            .compile(SOURCE, &[GpuDeviceType::CapeVerde], "-x asm")
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, BuildStatus::Success, "{}", entries[0].log);
        let binary = entries[0].binary.as_ref().unwrap();
        assert_eq!(&binary[0..4], b"\x7fELF");
        assert_eq!(overall_status(&entries), 0);
    }

    #[test]
    fn device_grouping_reuses_bytes() {
        let program = AsmProgram::new(150005);
        let devices = [
            GpuDeviceType::CapeVerde,
            GpuDeviceType::Tahiti,
            GpuDeviceType::CapeVerde,
        ];
        let entries = program.compile(SOURCE, &devices, "").unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].binary, entries[2].binary);
        // different devices carry different machine codes
        assert_ne!(entries[0].binary, entries[1].binary);
    }

    #[test]
    fn binary_idempotence() {
        let program = AsmProgram::new(150005);
        let a = program
            .compile(SOURCE, &[GpuDeviceType::Pitcairn], "")
            .unwrap();
        let b = program
            .compile(SOURCE, &[GpuDeviceType::Pitcairn], "")
            .unwrap();
        assert_eq!(a[0].binary, b[0].binary);
    }

    #[test]
    fn failing_device_keeps_siblings() {
        let bad_source = ".kernel k\n.text\nv_bogus v0, v1\n";
        let program = AsmProgram::new(150005);
        let entries = program
            .compile(bad_source, &[GpuDeviceType::CapeVerde], "")
            .unwrap();
        assert_eq!(entries[0].status, BuildStatus::Error);
        assert!(entries[0].log.contains("Unknown instruction"));
        assert_eq!(overall_status(&entries), 1);
        assert!(first_failure(&entries).is_some());
    }

    #[test]
    fn symbol_assignment_and_defsym() {
        let source = "\
value = 41
.kernel k
.text
s_mov_b32 s0, value+1
";
        let program = AsmProgram::new(150005);
        let entries = program
            .compile(source, &[GpuDeviceType::CapeVerde], "")
            .unwrap();
        assert_eq!(entries[0].status, BuildStatus::Success, "{}", entries[0].log);
        // 42 folds to the inline constant 128+42
        let binary = entries[0].binary.as_ref().unwrap();
        let word = 0xbe80_0300u32 | (128 + 42);
        let pos = binary
            .windows(4)
            .position(|w| w == word.to_le_bytes())
            .unwrap_or(usize::MAX);
        assert_ne!(pos, usize::MAX);
    }

    #[test]
    fn diagnostics_are_source_ordered() {
        let source = ".kernel k\n.text\nv_bogus v0\ns_mov s1\n";
        let program = AsmProgram::new(150005);
        let entries = program
            .compile(source, &[GpuDeviceType::CapeVerde], "")
            .unwrap();
        let log = &entries[0].log;
        let first = log.find("3:").unwrap_or(usize::MAX);
        let second = log.find("4:").unwrap_or(usize::MAX);
        assert!(first < second, "{log}");
    }

    #[test]
    fn vector_type_specs() {
        assert_eq!(
            parse_type_spec("float4"),
            Some(KernelArgType::Vector(ScalarKind::Float, 4))
        );
        assert_eq!(
            parse_type_spec("u16"),
            Some(KernelArgType::Scalar(ScalarKind::U16))
        );
        assert_eq!(
            parse_type_spec("u1616"),
            Some(KernelArgType::Vector(ScalarKind::U16, 16))
        );
        assert_eq!(
            parse_type_spec("i83"),
            Some(KernelArgType::Vector(ScalarKind::I8, 3))
        );
        assert_eq!(parse_type_spec("float5"), None);
        assert_eq!(parse_type_spec("imaginary"), None);
    }
}
