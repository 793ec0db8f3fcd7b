//! Register range resolution.
//!
//! Textual register references resolve to half-open `[start, end)` index
//! ranges in the unified 10-bit GCN register space: SGPRs at 0, special
//! 64-bit pairs from 102, TTMPs at 112, VGPRs at 256, single flags and
//! inline constants above. Scalar ranges are alignment-checked against the
//! device generation unless the caller asks for unaligned access.

use flagset::{flags, FlagSet};

use crate::cursor::{is_name_char, Cursor};
use crate::session::AsmSession;
use crate::AsmError;

flags! {
    /// Capability bits steering operand and register parsing.
    pub enum OperandFlag: u32 {
        /// Scalar registers are accepted.
        SRegs,
        /// Vector registers are accepted.
        VRegs,
        /// Scalar-source extras: `vccz`, `execz`, `scc` and literals.
        SSource,
        /// Skip the scalar alignment check.
        Unaligned,
        /// Fall through to symbols bound to register ranges.
        SymRegRange,
        /// `lds`/`lds_direct` accepted as a source.
        Lds,
        /// Only inline constants may be encoded, no trailing literal.
        OnlyInlineConsts,
        /// Report an illegal literal as a VOP3 one.
        NoLiteralError,
        /// Report an illegal literal as a MUBUF one.
        NoLiteralErrorMubuf,
        /// Parse VOP3 operand modifiers (`-`, `abs()`, `sext()`, `|..|`).
        Vop3Mods,
        /// A bare `-` negates via the NEG modifier bit.
        Vop3Neg,
        /// Internal: continue parsing after a consumed `-`.
        ParseWithNeg,
        /// The operand is read; recorded into register-variable usage.
        Read,
        /// The operand is written; recorded into register-variable usage.
        Write,
    }
}

/// Set of [`OperandFlag`]s.
pub type OperandFlags = FlagSet<OperandFlag>;

/// Default precision a literal operand parses with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    /// Integer expression.
    Int,
    /// Half-precision float.
    F16,
    /// Single-precision float.
    F32,
    /// 64-bit operand; float literals carry the high dword of a double.
    F64,
}

/// A half-open register index range. `{0, 0}` means absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegRange {
    /// First register index.
    pub start: u16,
    /// One past the last register index.
    pub end: u16,
}

impl RegRange {
    /// Builds a range.
    pub fn new(start: u16, end: u16) -> Self {
        RegRange { start, end }
    }

    /// True unless this is the absent range.
    pub fn is_set(&self) -> bool {
        !(self.start == 0 && self.end == 0)
    }

    /// Number of registers covered.
    pub fn len(&self) -> u16 {
        self.end - self.start
    }

    /// True for the absent range.
    pub fn is_empty(&self) -> bool {
        !self.is_set()
    }
}

/// Type of a named register variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegVarType {
    /// Scalar register file.
    Sgpr,
    /// Vector register file.
    Vgpr,
}

/// A named register variable awaiting allocation.
#[derive(Debug, Clone)]
pub struct RegVar {
    /// Register file it allocates from.
    pub rtype: RegVarType,
    /// Number of registers.
    pub size: u16,
}

/// Instruction field a register-variable usage was resolved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegField {
    /// Not attached to an encoded field.
    None,
    /// Destination field.
    Dst,
    /// First source field.
    Src0,
    /// Second source field.
    Src1,
    /// Third source field.
    Src2,
}

/// Usage record of a register variable, consumed by the allocation pass.
#[derive(Debug, Clone)]
pub struct RegVarUsage {
    /// Code position of the instruction using the variable.
    pub out_pos: usize,
    /// Field within the instruction.
    pub field: RegField,
    /// First used register, relative to the variable.
    pub rstart: u16,
    /// One past the last used register, relative to the variable.
    pub rend: u16,
    /// Variable is read here.
    pub read: bool,
    /// Variable is written here.
    pub write: bool,
    /// Name of the variable.
    pub name: String,
}

fn pool_name(flags: OperandFlags) -> &'static str {
    if flags.contains(OperandFlag::VRegs) {
        "vector"
    } else {
        "scalar"
    }
}

impl AsmSession {
    /// Emits the "expected registers" diagnostic when the range was
    /// required; returns `Err` in that case and `Ok(None)` for a polite
    /// miss with the cursor restored by the caller.
    fn miss(
        &mut self,
        cur: &Cursor,
        place: usize,
        pool: &str,
        regs_num: u16,
        required: bool,
    ) -> Result<Option<RegRange>, AsmError> {
        if required {
            let msg = if regs_num != 0 {
                format!(
                    "Expected {} {} register{}",
                    regs_num,
                    pool,
                    if regs_num == 1 { "" } else { "s" }
                )
            } else {
                format!("Expected {pool} registers")
            };
            self.diags.error(cur.lineno(), place + 1, msg.as_str());
            return Err(AsmError::Parse(msg));
        }
        Ok(None)
    }

    fn wrong_count(&mut self, cur: &Cursor, place: usize, pool: &str, regs_num: u16) -> AsmError {
        let msg = format!(
            "Required {} {} register{}",
            regs_num,
            pool,
            if regs_num == 1 { "" } else { "s" }
        );
        self.diags.error(cur.lineno(), place + 1, msg.as_str());
        AsmError::Range(msg)
    }

    /// Parses the `lo[:hi]` part of a bracketed range; the caller consumed
    /// the opening `[`.
    fn parse_range_bounds(
        &mut self,
        cur: &mut Cursor,
        place: usize,
        unterminated: &str,
    ) -> Result<(u64, u64), AsmError> {
        cur.skip_spaces();
        let value1 = self.get_absolute_value(cur)?;
        cur.skip_spaces();
        if !matches!(cur.peek(), Some(b':') | Some(b']')) {
            let err = AsmError::Parse(unterminated.to_string());
            return Err(self.error_at(cur, place, err));
        }
        let value2 = if cur.peek() == Some(b':') {
            cur.skip_char_and_spaces();
            self.get_absolute_value(cur)?
        } else {
            value1
        };
        cur.skip_spaces();
        if !cur.eat(b']') {
            let err = AsmError::Parse(unterminated.to_string());
            return Err(self.error_at(cur, place, err));
        }
        Ok((value1, value2))
    }

    fn check_scalar_alignment(
        &mut self,
        cur: &Cursor,
        place: usize,
        start: u16,
        count: u16,
        flags: OperandFlags,
    ) -> Result<(), AsmError> {
        if flags.contains(OperandFlag::Unaligned) || start >= self.arch.max_sgprs() {
            return Ok(());
        }
        if (count == 2 && start & 1 != 0) || (count > 2 && start & 3 != 0) {
            let msg = "Unaligned scalar register range".to_string();
            self.diags.error(cur.lineno(), place + 1, msg.as_str());
            return Err(AsmError::Range(msg));
        }
        Ok(())
    }

    /// Parses a vector register reference: `v<n>` or `v[lo:hi]`.
    pub fn parse_vreg_range(
        &mut self,
        cur: &mut Cursor,
        regs_num: u16,
        required: bool,
        flags: OperandFlags,
    ) -> Result<Option<RegRange>, AsmError> {
        let old_pos = cur.pos();
        cur.skip_spaces();
        let place = cur.pos();

        let mut is_range = false;
        if cur.peek().is_some_and(|b| b.eq_ignore_ascii_case(&b'v')) {
            match cur.peek_at(1) {
                Some(b) if b.is_ascii_digit() => {
                    let digit_pos = cur.pos();
                    cur.bump();
                    let value = match cur.parse_byte() {
                        Ok(v) => v,
                        Err(err) => return Err(self.error_at(cur, cur.pos(), err)),
                    };
                    if !matches!(cur.peek(), Some(b) if is_name_char(b)) {
                        if regs_num != 0 && regs_num != 1 {
                            return Err(self.wrong_count(cur, place, "vector", regs_num));
                        }
                        let v = 256 + u16::from(value);
                        return Ok(Some(RegRange::new(v, v + 1)));
                    }
                    cur.set_pos(digit_pos);
                }
                Some(b'[') => is_range = true,
                _ => {}
            }
        }
        if !is_range {
            cur.set_pos(old_pos);
            if flags.contains(OperandFlag::SymRegRange) {
                return self.parse_symreg_range(cur, regs_num, OperandFlag::VRegs.into(), required);
            }
            let miss = self.miss(cur, place, "vector", regs_num, required)?;
            cur.set_pos(old_pos);
            return Ok(miss);
        }
        cur.bump();
        cur.bump();

        let (value1, value2) =
            self.parse_range_bounds(cur, place, "Unterminated vector register range")?;
        if value2 < value1 {
            let err = AsmError::Range("Illegal vector register range".into());
            return Err(self.error_at(cur, place, err));
        }
        if value1 >= 256 || value2 >= 256 {
            let err = AsmError::Range("Some vector register number out of range".into());
            return Err(self.error_at(cur, place, err));
        }
        let count = (value2 - value1 + 1) as u16;
        if regs_num != 0 && regs_num != count {
            return Err(self.wrong_count(cur, place, "vector", regs_num));
        }
        Ok(Some(RegRange::new(
            256 + value1 as u16,
            256 + value2 as u16 + 1,
        )))
    }

    /// Parses a scalar register reference: `s<n>`, `s[lo:hi]`, `ttmp<n>`,
    /// `ttmp[lo:hi]`, or a named special register.
    pub fn parse_sreg_range(
        &mut self,
        cur: &mut Cursor,
        regs_num: u16,
        required: bool,
        flags: OperandFlags,
    ) -> Result<Option<RegRange>, AsmError> {
        let old_pos = cur.pos();
        cur.skip_spaces();
        let place = cur.pos();
        if cur.at_end() {
            let miss = self.miss(cur, place, "scalar", regs_num, required)?;
            cur.set_pos(old_pos);
            return Ok(miss);
        }

        let mut is_range = false;
        let mut ttmp_reg = false;
        let mut single_or_ttmp = false;
        let prefix_pos = cur.pos();
        if cur.looking_at_nocase("ttmp") {
            single_or_ttmp = true;
            ttmp_reg = true;
            for _ in 0..4 {
                cur.bump();
            }
        } else if cur.peek().is_some_and(|b| b.eq_ignore_ascii_case(&b's'))
            && cur.peek_at(1).is_some()
        {
            single_or_ttmp = true;
            cur.bump();
        }

        let max_sgprs = self.arch.max_sgprs();
        if single_or_ttmp {
            match cur.peek() {
                Some(b) if b.is_ascii_digit() => {
                    let value = match cur.parse_byte() {
                        Ok(v) => v,
                        Err(err) => return Err(self.error_at(cur, cur.pos(), err)),
                    };
                    if !matches!(cur.peek(), Some(b) if is_name_char(b)) {
                        if !ttmp_reg {
                            if u16::from(value) >= max_sgprs {
                                let err = AsmError::Range(
                                    "Scalar register number out of range".into(),
                                );
                                return Err(self.error_at(cur, place, err));
                            }
                        } else if value >= 12 {
                            let err = AsmError::Range(
                                "TTMPRegister number out of range (0-11)".into(),
                            );
                            return Err(self.error_at(cur, place, err));
                        }
                        if regs_num != 0 && regs_num != 1 {
                            return Err(self.wrong_count(cur, place, "scalar", regs_num));
                        }
                        let base = if ttmp_reg { 112 } else { 0 };
                        let v = base + u16::from(value);
                        return Ok(Some(RegRange::new(v, v + 1)));
                    }
                    // a symbol like `s0x`, not a register number
                    cur.set_pos(prefix_pos);
                }
                Some(b'[') => is_range = true,
                _ => cur.set_pos(prefix_pos),
            }
        }

        if !is_range {
            return self.parse_sreg_named(cur, old_pos, place, regs_num, required, flags);
        }
        cur.bump();

        let unterminated = if ttmp_reg {
            "Unterminated TTMPRegister range"
        } else {
            "Unterminated scalar register range"
        };
        let (value1, value2) = self.parse_range_bounds(cur, place, unterminated)?;
        if value2 < value1 {
            let msg = if ttmp_reg {
                "Illegal TTMPRegister range"
            } else {
                "Illegal scalar register range"
            };
            let err = AsmError::Range(msg.into());
            return Err(self.error_at(cur, place, err));
        }
        if !ttmp_reg {
            if value1 >= u64::from(max_sgprs) || value2 >= u64::from(max_sgprs) {
                let err =
                    AsmError::Range("Some scalar register number out of range".into());
                return Err(self.error_at(cur, place, err));
            }
        } else if value1 >= 12 || value2 >= 12 {
            let err =
                AsmError::Range("Some TTMPRegister number out of range (0-11)".into());
            return Err(self.error_at(cur, place, err));
        }
        let count = (value2 - value1 + 1) as u16;
        if regs_num != 0 && regs_num != count {
            return Err(self.wrong_count(cur, place, "scalar", regs_num));
        }
        if !ttmp_reg {
            self.check_scalar_alignment(cur, place, value1 as u16, count, flags)?;
            Ok(Some(RegRange::new(value1 as u16, value2 as u16 + 1)))
        } else {
            Ok(Some(RegRange::new(
                112 + value1 as u16,
                112 + value2 as u16 + 1,
            )))
        }
    }

    /// The named special registers reachable from the scalar grammar.
    fn parse_sreg_named(
        &mut self,
        cur: &mut Cursor,
        old_pos: usize,
        place: usize,
        regs_num: u16,
        required: bool,
        flags: OperandFlags,
    ) -> Result<Option<RegRange>, AsmError> {
        let name_pos = cur.pos();
        let raw = cur.extract_name().unwrap_or("");
        let name = raw.to_ascii_lowercase();

        // (base, suffix length) for the 64-bit pairs
        let mut lo_hi: Option<(u16, usize)> = None;
        if name.starts_with("vcc") {
            lo_hi = Some((106, 3));
        } else if name.starts_with("exec") {
            lo_hi = Some((126, 4));
        } else if name.starts_with("tba") {
            lo_hi = Some((108, 3));
        } else if name.starts_with("tma") {
            lo_hi = Some((110, 3));
        } else if name == "m0" {
            if regs_num != 0 && regs_num != 1 && regs_num != 2 {
                return Err(self.wrong_count(cur, place, "scalar", regs_num));
            }
            return Ok(Some(RegRange::new(124, 125)));
        } else if self.arch.has_flat_scratch() {
            if name.starts_with("flat_scratch") {
                lo_hi = Some((self.arch.flat_scratch_reg(), 12));
            } else if self.arch.is_rx3x0() && name.starts_with("xnack_mask") {
                lo_hi = Some((104, 10));
            }
        }

        if let Some((base, suffix_at)) = lo_hi {
            let suffix = &name[suffix_at.min(name.len())..];
            let range = match suffix {
                "" => {
                    if regs_num != 0 && regs_num != 2 {
                        return Err(self.wrong_count(cur, place, "scalar", regs_num));
                    }
                    Some(RegRange::new(base, base + 2))
                }
                "_lo" => Some(RegRange::new(base, base + 1)),
                "_hi" => Some(RegRange::new(base + 1, base + 2)),
                _ => None,
            };
            if let Some(range) = range {
                if !suffix.is_empty() && regs_num != 0 && regs_num != 1 {
                    return Err(self.wrong_count(cur, place, "scalar", regs_num));
                }
                return Ok(Some(range));
            }
            // not this register after all
            let miss = self.miss(cur, place, "scalar", regs_num, required)?;
            cur.set_pos(old_pos);
            return Ok(miss);
        }

        cur.set_pos(name_pos);
        if flags.contains(OperandFlag::SymRegRange) {
            cur.set_pos(old_pos);
            let mut sym_flags = OperandFlags::from(OperandFlag::SRegs);
            sym_flags |= flags & OperandFlag::Unaligned;
            sym_flags |= flags & OperandFlag::SSource;
            return self.parse_symreg_range(cur, regs_num, sym_flags, required);
        }
        let miss = self.miss(cur, place, "scalar", regs_num, required)?;
        cur.set_pos(old_pos);
        Ok(miss)
    }

    /// Resolves a symbol bound to a concrete register range, with an
    /// optional `[lo:hi]` sub-range.
    pub fn parse_symreg_range(
        &mut self,
        cur: &mut Cursor,
        regs_num: u16,
        flags: OperandFlags,
        required: bool,
    ) -> Result<Option<RegRange>, AsmError> {
        let old_pos = cur.pos();
        cur.skip_spaces();
        let place = cur.pos();
        if cur.peek() == Some(b'@') {
            cur.skip_char_and_spaces();
        }

        let name = cur.extract_sym_name();
        let sym = if name.is_empty() {
            None
        } else {
            self.reg_symbol(name)
        };
        if let Some(range) = sym {
            let mut rstart = range.start;
            let mut rend = range.end;
            let is_vector = rstart >= 256 && rend >= 256;
            let is_scalar = rstart < 256
                && rend < 256
                && (flags.contains(OperandFlag::SSource)
                    || (rstart != 251 && rstart != 252 && rstart != 253));
            if (flags.contains(OperandFlag::VRegs) && is_vector)
                || (flags.contains(OperandFlag::SRegs) && is_scalar)
            {
                cur.skip_spaces();
                if cur.peek() == Some(b'[') {
                    cur.bump();
                    let (value1, value2) =
                        self.parse_range_bounds(cur, place, "Unterminated register range")?;
                    if value2 < value1 {
                        let err = AsmError::Range("Illegal register range".into());
                        return Err(self.error_at(cur, place, err));
                    }
                    let size = u64::from(rend - rstart);
                    if value1 >= size || value2 >= size {
                        let err = AsmError::Range("Register range out of range".into());
                        return Err(self.error_at(cur, place, err));
                    }
                    rend = rstart + value2 as u16 + 1;
                    rstart += value1 as u16;
                }
                let count = rend - rstart;
                if regs_num != 0 && regs_num != count {
                    return Err(self.wrong_count(cur, place, pool_name(flags), regs_num));
                }
                if rstart < 256 {
                    self.check_scalar_alignment(cur, place, rstart, count, flags)?;
                }
                return Ok(Some(RegRange::new(rstart, rend)));
            }
        }
        if sym.is_none() {
            // fall through to a typed register variable
            cur.set_pos(old_pos);
            if let Some(range) =
                self.parse_regvar_range(cur, regs_num, flags, RegField::None, false)?
            {
                return Ok(Some(range));
            }
        }
        let miss = self.miss(cur, place, pool_name(flags), regs_num, required)?;
        cur.set_pos(old_pos);
        Ok(miss)
    }

    /// Resolves a named register variable, recording a usage entry for the
    /// later register-allocation pass.
    pub fn parse_regvar_range(
        &mut self,
        cur: &mut Cursor,
        regs_num: u16,
        flags: OperandFlags,
        field: RegField,
        required: bool,
    ) -> Result<Option<RegRange>, AsmError> {
        let old_pos = cur.pos();
        cur.skip_spaces();
        let place = cur.pos();

        let name = cur.extract_sym_name().to_string();
        let var = if name.is_empty() {
            None
        } else {
            self.reg_var(&name).cloned()
        };
        if let Some(var) = var {
            let type_matches = (flags.contains(OperandFlag::VRegs)
                && var.rtype == RegVarType::Vgpr)
                || (flags.contains(OperandFlag::SRegs) && var.rtype == RegVarType::Sgpr);
            if type_matches {
                let mut rstart: u16 = 0;
                let mut rend: u16 = var.size;
                cur.skip_spaces();
                if cur.peek() == Some(b'[') {
                    cur.bump();
                    let (value1, value2) =
                        self.parse_range_bounds(cur, place, "Unterminated register range")?;
                    if value2 < value1 {
                        let err = AsmError::Range("Illegal register range".into());
                        return Err(self.error_at(cur, place, err));
                    }
                    if value1 >= u64::from(rend) || value2 >= u64::from(rend) {
                        let err = AsmError::Range("Register range out of range".into());
                        return Err(self.error_at(cur, place, err));
                    }
                    rend = value2 as u16 + 1;
                    rstart = value1 as u16;
                }
                if regs_num != 0 && regs_num != rend - rstart {
                    return Err(self.wrong_count(cur, place, pool_name(flags), regs_num));
                }
                if field != RegField::None {
                    let usage = RegVarUsage {
                        out_pos: self.out_pos,
                        field,
                        rstart,
                        rend,
                        read: flags.contains(OperandFlag::Read),
                        write: flags.contains(OperandFlag::Write),
                        name,
                    };
                    self.add_usage(usage);
                }
                return Ok(Some(RegRange::new(rstart, rend)));
            }
        }
        let miss = self.miss(cur, place, pool_name(flags), regs_num, required)?;
        cur.set_pos(old_pos);
        Ok(miss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GcnArch;

    fn session(arch: GcnArch) -> AsmSession {
        AsmSession::new(arch, true)
    }

    fn sregs(text: &str, arch: GcnArch, regs_num: u16) -> Result<Option<RegRange>, AsmError> {
        let mut s = session(arch);
        let mut cur = Cursor::new(text, 1);
        s.parse_sreg_range(&mut cur, regs_num, true, OperandFlags::default())
    }

    fn vregs(text: &str, regs_num: u16) -> Result<Option<RegRange>, AsmError> {
        let mut s = session(GcnArch::Gcn10);
        let mut cur = Cursor::new(text, 1);
        s.parse_vreg_range(&mut cur, regs_num, true, OperandFlags::default())
    }

    #[test]
    fn single_registers() {
        assert_eq!(sregs("s0", GcnArch::Gcn10, 0).unwrap(), Some(RegRange::new(0, 1)));
        assert_eq!(
            sregs("s101", GcnArch::Gcn12, 0).unwrap(),
            Some(RegRange::new(101, 102))
        );
        assert_eq!(vregs("v0", 0).unwrap(), Some(RegRange::new(256, 257)));
        assert_eq!(vregs("v255", 1).unwrap(), Some(RegRange::new(511, 512)));
    }

    #[test]
    fn register_pools() {
        // 102 SGPRs on GCN 1.2, 104 before
        assert!(sregs("s102", GcnArch::Gcn12, 0).is_err());
        assert!(sregs("s103", GcnArch::Gcn10, 0).is_ok());
        assert!(sregs("s104", GcnArch::Gcn10, 0).is_err());
    }

    #[test]
    fn bracket_ranges() {
        assert_eq!(
            sregs("s[2:3]", GcnArch::Gcn10, 0).unwrap(),
            Some(RegRange::new(2, 4))
        );
        assert_eq!(
            sregs("s[4:7]", GcnArch::Gcn10, 4).unwrap(),
            Some(RegRange::new(4, 8))
        );
        assert_eq!(
            vregs("v[3:5]", 3).unwrap(),
            Some(RegRange::new(259, 262))
        );
        assert!(sregs("s[3:2]", GcnArch::Gcn10, 0).is_err());
        assert!(sregs("s[2:3", GcnArch::Gcn10, 0).is_err());
    }

    #[test]
    fn alignment_rules() {
        assert!(sregs("s[1:2]", GcnArch::Gcn10, 0).is_err());
        assert!(sregs("s[2:4]", GcnArch::Gcn10, 0).is_err());
        assert!(sregs("s[4:6]", GcnArch::Gcn10, 0).is_ok());
        // unaligned flag disables the check
        let mut s = session(GcnArch::Gcn10);
        let mut cur = Cursor::new("s[1:2]", 1);
        assert_eq!(
            s.parse_sreg_range(&mut cur, 0, true, OperandFlag::Unaligned.into())
                .unwrap(),
            Some(RegRange::new(1, 3))
        );
    }

    #[test]
    fn ttmp_registers() {
        assert_eq!(
            sregs("ttmp0", GcnArch::Gcn10, 0).unwrap(),
            Some(RegRange::new(112, 113))
        );
        assert_eq!(
            sregs("ttmp[0:3]", GcnArch::Gcn10, 0).unwrap(),
            Some(RegRange::new(112, 116))
        );
        assert!(sregs("ttmp12", GcnArch::Gcn10, 0).is_err());
    }

    #[test]
    fn named_registers() {
        assert_eq!(
            sregs("vcc", GcnArch::Gcn10, 0).unwrap(),
            Some(RegRange::new(106, 108))
        );
        assert_eq!(
            sregs("vcc_lo", GcnArch::Gcn10, 0).unwrap(),
            Some(RegRange::new(106, 107))
        );
        assert_eq!(
            sregs("exec_hi", GcnArch::Gcn10, 0).unwrap(),
            Some(RegRange::new(127, 128))
        );
        assert_eq!(
            sregs("m0", GcnArch::Gcn10, 0).unwrap(),
            Some(RegRange::new(124, 125))
        );
        assert_eq!(
            sregs("tba", GcnArch::Gcn10, 2).unwrap(),
            Some(RegRange::new(108, 110))
        );
        assert_eq!(
            sregs("tma_hi", GcnArch::Gcn10, 1).unwrap(),
            Some(RegRange::new(111, 112))
        );
    }

    #[test]
    fn arch_gated_names() {
        assert!(sregs("flat_scratch", GcnArch::Gcn10, 0).is_err());
        assert_eq!(
            sregs("flat_scratch", GcnArch::Gcn11, 0).unwrap(),
            Some(RegRange::new(104, 106))
        );
        assert_eq!(
            sregs("flat_scratch_lo", GcnArch::Gcn12, 0).unwrap(),
            Some(RegRange::new(102, 103))
        );
        assert!(sregs("xnack_mask", GcnArch::Gcn11, 0).is_err());
        assert_eq!(
            sregs("xnack_mask", GcnArch::Gcn12, 0).unwrap(),
            Some(RegRange::new(104, 106))
        );
    }

    #[test]
    fn regvar_usage_records() {
        let mut s = session(GcnArch::Gcn10);
        s.add_reg_var(
            "temp",
            RegVar {
                rtype: RegVarType::Vgpr,
                size: 4,
            },
        );
        let mut cur = Cursor::new("temp[1:2]", 1);
        let flags = OperandFlag::VRegs | OperandFlag::Read;
        let range = s
            .parse_regvar_range(&mut cur, 2, flags, RegField::Src0, true)
            .unwrap()
            .unwrap();
        assert_eq!(range, RegRange::new(1, 3));
        assert_eq!(s.usages().len(), 1);
        assert_eq!(s.usages()[0].name, "temp");
        assert!(s.usages()[0].read);
        assert!(!s.usages()[0].write);
    }

    #[test]
    fn reg_symbols() {
        let mut s = session(GcnArch::Gcn10);
        s.add_reg_symbol("inputs", RegRange::new(8, 12));
        let mut cur = Cursor::new("inputs[0:1]", 1);
        let range = s
            .parse_symreg_range(&mut cur, 0, OperandFlag::SRegs.into(), true)
            .unwrap()
            .unwrap();
        assert_eq!(range, RegRange::new(8, 10));
    }

    #[test]
    fn sregs_required_count() {
        assert!(sregs("s1", GcnArch::Gcn10, 2).is_err());
        assert!(sregs("vcc", GcnArch::Gcn10, 1).is_err());
        assert!(sregs("vcc_hi", GcnArch::Gcn10, 2).is_err());
    }
}
