//! GCN instruction operand parsing.
//!
//! An operand is a register range, a special scalar name, or a literal.
//! Small integers and a bounded set of IEEE-754 constants fold into inline
//! register-field encodings; everything else becomes a trailing 32-bit
//! literal. VOP3 operands may be wrapped in `-`, `abs()`, `|..|` and, on
//! GCN 1.2, `sext()`.

use crate::cursor::Cursor;
use crate::numeric;
use crate::regs::{LitKind, OperandFlag, OperandFlags, RegRange};
use crate::session::{AsmSession, ExprValue, UnresolvedExpr, SECTION_ABS};
use crate::AsmError;

/// ABS operand modifier bit.
pub const VOPOP_ABS: u8 = 1;
/// NEG operand modifier bit.
pub const VOPOP_NEG: u8 = 2;
/// SEXT operand modifier bit.
pub const VOPOP_SEXT: u8 = 4;

/// A parsed operand. With `range.start == 255` the trailing 32-bit literal
/// in `literal` follows the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GcnOperand {
    /// Register range or inline-constant encoding.
    pub range: RegRange,
    /// Trailing literal value when `range.start == 255`.
    pub literal: u32,
    /// Bitset over [`VOPOP_NEG`], [`VOPOP_ABS`], [`VOPOP_SEXT`].
    pub vop_mods: u8,
}

impl GcnOperand {
    fn from_range(range: RegRange) -> Self {
        GcnOperand {
            range,
            literal: 0,
            vop_mods: 0,
        }
    }

    /// True when the operand requires a trailing literal dword.
    pub fn needs_literal(&self) -> bool {
        self.range.start == 255
    }
}

/// Float width selected by a literal suffix or the instruction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FloatLitType {
    F16,
    F32,
    F64,
}

fn suffix_float_type(rest: &[u8], default: FloatLitType) -> FloatLitType {
    match rest.first() {
        Some(b) if b.eq_ignore_ascii_case(&b'l') => FloatLitType::F64,
        Some(b) if b.eq_ignore_ascii_case(&b's') => FloatLitType::F32,
        Some(b) if b.eq_ignore_ascii_case(&b'h') => FloatLitType::F16,
        _ => default,
    }
}

/// Decides whether `text` is exclusively a floating-point literal: it has a
/// point or an exponent and at least one digit around the point, so it can
/// be neither an integer nor a symbol.
fn is_only_float(text: &[u8], default: FloatLitType) -> Option<FloatLitType> {
    let mut i = 0;
    if matches!(text.first(), Some(b'-') | Some(b'+')) {
        i += 1;
    }
    let (digits, exp_marker): (fn(u8) -> bool, u8) =
        if text.len() > i + 2 && text[i] == b'0' && text[i + 1].to_ascii_lowercase() == b'x' {
            i += 2;
            (|b: u8| b.is_ascii_hexdigit(), b'p')
        } else {
            (|b: u8| b.is_ascii_digit(), b'e')
        };
    let before_start = i;
    while i < text.len() && digits(text[i]) {
        i += 1;
    }
    let int_digits = i - before_start;
    if i >= text.len() || text[i] != b'.' {
        // no point: accept only `XXXe[+-]XXX`
        if int_digits != 0
            && i < text.len()
            && text[i].to_ascii_lowercase() == exp_marker
        {
            let mut j = i + 1;
            if j < text.len() && (text[j] == b'-' || text[j] == b'+') {
                j += 1;
            }
            let exp_start = j;
            while j < text.len() && text[j].is_ascii_digit() {
                j += 1;
            }
            if j != exp_start {
                return Some(suffix_float_type(&text[j..], default));
            }
        }
        return None;
    }
    i += 1;
    let frac_start = i;
    while i < text.len() && digits(text[i]) {
        i += 1;
    }
    let frac_digits = i - frac_start;
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    if int_digits != 0 && i < text.len() && text[i].to_ascii_lowercase() == exp_marker {
        let mut j = i + 1;
        if j < text.len() && (text[j] == b'-' || text[j] == b'+') {
            j += 1;
        }
        while j < text.len() && text[j].is_ascii_digit() {
            j += 1;
        }
        i = j;
    }
    Some(suffix_float_type(&text[i..], default))
}

fn default_float_type(lit: LitKind) -> FloatLitType {
    match lit {
        LitKind::F16 => FloatLitType::F16,
        LitKind::F64 => FloatLitType::F64,
        _ => FloatLitType::F32,
    }
}

/// Inline-constant register code for a float bit pattern at the given
/// precision, if the pattern is one of the foldable constants.
fn fold_float_constant(value: u32, fp: FloatLitType, rx3x0: bool) -> Option<u16> {
    let code = match fp {
        FloatLitType::F16 => match value {
            0x0 => 128,
            0x3800 => 240,
            0xb800 => 241,
            0x3c00 => 242,
            0xbc00 => 243,
            0x4000 => 244,
            0xc000 => 245,
            0x4400 => 246,
            0xc400 => 247,
            0x3118 if rx3x0 => 248,
            _ => return None,
        },
        FloatLitType::F32 => match value {
            0x0 => 128,
            0x3f000000 => 240,
            0xbf000000 => 241,
            0x3f800000 => 242,
            0xbf800000 => 243,
            0x40000000 => 244,
            0xc0000000 => 245,
            0x40800000 => 246,
            0xc0800000 => 247,
            0x3e22f983 if rx3x0 => 248,
            _ => return None,
        },
        // high dword of a double
        FloatLitType::F64 => match value {
            0x0 => 128,
            0x3fe00000 => 240,
            0xbfe00000 => 241,
            0x3ff00000 => 242,
            0xbff00000 => 243,
            0x40000000 => 244,
            0xc0000000 => 245,
            0x40100000 => 246,
            0xc0100000 => 247,
            0x3fc45f30 if rx3x0 => 248,
            _ => return None,
        },
    };
    Some(code)
}

fn parse_float_of_type(cur: &mut Cursor, fp: FloatLitType) -> Result<u32, AsmError> {
    let (value, suffix) = match fp {
        FloatLitType::F16 => (u32::from(numeric::parse_f16(cur)?), b'h'),
        FloatLitType::F32 => (numeric::parse_f32(cur)?, b's'),
        FloatLitType::F64 => (numeric::parse_f64_high(cur)?, b'l'),
    };
    if matches!(cur.peek(), Some(b) if b.eq_ignore_ascii_case(&suffix)) {
        cur.bump();
    }
    Ok(value)
}

impl AsmSession {
    /// Parses a literal immediate: a float when the token is exclusively a
    /// float at the default precision of `lit`, an integer expression
    /// otherwise.
    pub fn parse_literal_imm(
        &mut self,
        cur: &mut Cursor,
        lit: LitKind,
    ) -> Result<u32, AsmError> {
        cur.skip_spaces();
        let default_fp = default_float_type(lit);
        if let Some(fp) = is_only_float(cur.rest(), default_fp) {
            let pos = cur.pos();
            return parse_float_of_type(cur, fp).map_err(|e| self.error_at(cur, pos, e));
        }
        let pos = cur.pos();
        let value = self.get_absolute_value(cur)?;
        self.warn_for_range(cur, pos, 32, value, crate::session::ImmSign::Both);
        Ok(value as u32)
    }

    /// Parses one source or destination operand per the capability `flags`
    /// and default literal type `lit`. Unresolvable expressions are handed
    /// back through `expr_out` with the operand encoded as a literal
    /// placeholder.
    pub fn parse_operand(
        &mut self,
        cur: &mut Cursor,
        regs_num: u16,
        flags: OperandFlags,
        lit: LitKind,
        mut expr_out: Option<&mut Option<UnresolvedExpr>>,
    ) -> Result<GcnOperand, AsmError> {
        if let Some(out) = expr_out.as_deref_mut() {
            *out = None;
        }
        // the legacy literal bug rejects 64-bit float literals entirely
        let lit = if self.buggy_fp_lit && lit == LitKind::F64 {
            LitKind::Int
        } else {
            lit
        };

        let align_flags = flags & OperandFlag::Unaligned;
        let reg_only = flags
            & !(OperandFlag::Unaligned
                | OperandFlag::Read
                | OperandFlag::Write);
        if reg_only == OperandFlags::from(OperandFlag::SRegs) {
            let mut f = OperandFlags::from(OperandFlag::SymRegRange) | align_flags;
            f |= flags & OperandFlag::Read;
            f |= flags & OperandFlag::Write;
            let range = self.require_range(cur, regs_num, true, f, false)?;
            return Ok(GcnOperand::from_range(range));
        }
        if reg_only == OperandFlags::from(OperandFlag::VRegs) {
            let mut f = OperandFlags::from(OperandFlag::SymRegRange) | align_flags;
            f |= flags & OperandFlag::Read;
            f |= flags & OperandFlag::Write;
            let range = self.require_range(cur, regs_num, true, f, true)?;
            return Ok(GcnOperand::from_range(range));
        }

        if flags.contains(OperandFlag::Vop3Mods) {
            return self.parse_operand_with_modifiers(cur, regs_num, flags, lit, expr_out);
        }

        cur.skip_spaces();
        let neg_place = cur.pos();
        let mut vop_mods: u8 = 0;
        if flags.contains(OperandFlag::ParseWithNeg) || flags.contains(OperandFlag::Vop3Neg) {
            if cur.peek() == Some(b'-') {
                cur.skip_char_and_spaces();
                vop_mods |= VOPOP_NEG;
            }
        }

        if flags.contains(OperandFlag::SRegs) {
            if let Some(range) = self.parse_sreg_range(cur, regs_num, false, align_flags)? {
                return Ok(GcnOperand {
                    range,
                    literal: 0,
                    vop_mods,
                });
            }
        }
        if flags.contains(OperandFlag::VRegs) {
            if let Some(range) = self.parse_vreg_range(cur, regs_num, false, align_flags)? {
                return Ok(GcnOperand {
                    range,
                    literal: 0,
                    vop_mods,
                });
            }
        }
        if flags.contains(OperandFlag::SRegs) || flags.contains(OperandFlag::VRegs) {
            let mut sym_flags = align_flags;
            sym_flags |= flags & OperandFlag::SRegs;
            sym_flags |= flags & OperandFlag::VRegs;
            sym_flags |= flags & OperandFlag::SSource;
            if let Some(range) = self.parse_symreg_range(cur, regs_num, sym_flags, false)? {
                return Ok(GcnOperand {
                    range,
                    literal: 0,
                    vop_mods,
                });
            }
        }

        cur.skip_spaces();
        if !flags.contains(OperandFlag::SSource) {
            let err = AsmError::Semantic("Unknown operand".into());
            return Err(self.error_at(cur, cur.pos(), err));
        }

        let name_place = cur.pos();
        if let Some(raw) = cur.extract_name() {
            let name = raw.to_ascii_lowercase();
            let special = match name.as_str() {
                "vccz" => Some(RegRange::new(251, 252)),
                "execz" => Some(RegRange::new(252, 253)),
                "scc" => Some(RegRange::new(253, 254)),
                "lds" | "lds_direct" | "src_lds_direct"
                    if flags.contains(OperandFlag::Lds) =>
                {
                    Some(RegRange::new(254, 255))
                }
                _ => None,
            };
            if let Some(range) = special {
                return Ok(GcnOperand {
                    range,
                    literal: 0,
                    vop_mods: 0,
                });
            }
            cur.set_pos(neg_place);
        }

        self.parse_operand_literal(cur, neg_place, name_place, flags, lit, expr_out)
    }

    /// Required register-range parse used by the pure SREGS/VREGS entry.
    fn require_range(
        &mut self,
        cur: &mut Cursor,
        regs_num: u16,
        required: bool,
        flags: OperandFlags,
        vector: bool,
    ) -> Result<RegRange, AsmError> {
        let parsed = if vector {
            self.parse_vreg_range(cur, regs_num, required, flags)?
        } else {
            self.parse_sreg_range(cur, regs_num, required, flags)?
        };
        parsed.ok_or_else(|| AsmError::Parse("Expected register range".into()))
    }

    /// The `sext(`, `-`, `abs(`, `|..|` prefix layer of a VOP3 operand.
    fn parse_operand_with_modifiers(
        &mut self,
        cur: &mut Cursor,
        regs_num: u16,
        flags: OperandFlags,
        lit: LitKind,
        mut expr_out: Option<&mut Option<UnresolvedExpr>>,
    ) -> Result<GcnOperand, AsmError> {
        let inner_flags = flags & !OperandFlag::Vop3Mods;
        cur.skip_spaces();
        if cur.peek() == Some(b'@') {
            // forced expression, no modifier prefix applies
            return self.parse_operand(cur, regs_num, inner_flags, lit, expr_out);
        }

        let mut vop_mods: u8 = 0;
        if self.arch.is_rx3x0() && cur.looking_at_nocase("sext") {
            for _ in 0..4 {
                cur.bump();
            }
            cur.skip_spaces();
            if cur.eat(b'(') {
                vop_mods |= VOPOP_SEXT;
            } else {
                let err = AsmError::Parse("Expected '(' after sext".into());
                return Err(self.error_at(cur, cur.pos(), err));
            }
        }

        let neg_place = cur.pos();
        if cur.peek() == Some(b'-') {
            vop_mods |= VOPOP_NEG;
            cur.skip_char_and_spaces();
        }
        let mut llvm_abs = false;
        if cur.looking_at_nocase("abs") {
            let abs_pos = cur.pos();
            for _ in 0..3 {
                cur.bump();
            }
            cur.skip_spaces();
            if cur.eat(b'(') {
                vop_mods |= VOPOP_ABS;
            } else {
                cur.set_pos(abs_pos);
                let err = AsmError::Parse("Expected '(' after abs".into());
                return Err(self.error_at(cur, cur.pos(), err));
            }
        } else if cur.peek() == Some(b'|') {
            cur.bump();
            cur.skip_spaces();
            vop_mods |= VOPOP_ABS;
            llvm_abs = true;
        }

        let mut operand = if vop_mods & (VOPOP_NEG | VOPOP_ABS) != VOPOP_NEG {
            self.parse_operand(cur, regs_num, inner_flags, lit, expr_out.as_deref_mut())?
        } else {
            // only a bare `-` was consumed; let the inner parse see it so a
            // following literal keeps its sign
            cur.set_pos(neg_place);
            self.parse_operand(
                cur,
                regs_num,
                inner_flags | OperandFlag::ParseWithNeg,
                lit,
                expr_out.as_deref_mut(),
            )?
        };

        if vop_mods & VOPOP_ABS != 0 {
            cur.skip_spaces();
            let closer = if llvm_abs { b'|' } else { b')' };
            if !cur.eat(closer) {
                let err = AsmError::Parse("Unterminated abs() modifier".into());
                return Err(self.error_at(cur, cur.pos(), err));
            }
        }
        if vop_mods & VOPOP_SEXT != 0 {
            cur.skip_spaces();
            if !cur.eat(b')') {
                let err = AsmError::Parse("Unterminated sext() modifier".into());
                return Err(self.error_at(cur, cur.pos(), err));
            }
        }
        operand.vop_mods |= vop_mods;
        Ok(operand)
    }

    /// The literal / expression tail of operand parsing.
    fn parse_operand_literal(
        &mut self,
        cur: &mut Cursor,
        neg_place: usize,
        name_place: usize,
        flags: OperandFlags,
        lit: LitKind,
        expr_out: Option<&mut Option<UnresolvedExpr>>,
    ) -> Result<GcnOperand, AsmError> {
        // literals own their sign; a consumed `-` modifier is dropped here
        cur.set_pos(neg_place);
        cur.skip_spaces();

        let mut force_expression = false;
        if cur.peek() == Some(b'@') {
            force_expression = true;
            cur.skip_char_and_spaces();
        }
        if cur.at_end() || cur.peek() == Some(b',') {
            let err = AsmError::Parse("Expected instruction operand".into());
            return Err(self.error_at(cur, cur.pos(), err));
        }

        // lit(...) forces the trailing-literal encoding
        let mut encode_as_literal = false;
        let mut lit_start = cur.pos();
        if cur.looking_at_nocase("lit")
            && matches!(cur.peek_at(3), Some(b' ') | Some(b'\t') | Some(b'('))
        {
            let before_lit = cur.pos();
            for _ in 0..3 {
                cur.bump();
            }
            cur.skip_spaces();
            if cur.eat(b'(') {
                encode_as_literal = true;
                cur.skip_spaces();
                lit_start = cur.pos();
            } else {
                cur.set_pos(before_lit);
            }
        }
        if !encode_as_literal {
            lit_start = cur.pos();
        }

        let default_fp = default_float_type(lit);
        let mut value: u64;
        let mut unresolved: Option<UnresolvedExpr> = None;

        let float_type = if force_expression {
            None
        } else {
            is_only_float(cur.rest(), default_fp)
        };
        if let Some(fp) = float_type {
            cur.set_pos(lit_start);
            let fvalue =
                parse_float_of_type(cur, fp).map_err(|e| self.error_at(cur, lit_start, e))?;
            value = u64::from(fvalue);
            if !encode_as_literal {
                // inline-constant folding; the legacy bug folds only
                // single-precision patterns
                let folded = if self.buggy_fp_lit {
                    match fp {
                        FloatLitType::F16 if fvalue == 0 => Some(128),
                        FloatLitType::F32 => {
                            fold_float_constant(fvalue, FloatLitType::F32, self.arch.is_rx3x0())
                        }
                        _ => None,
                    }
                } else if fp == default_fp {
                    fold_float_constant(fvalue, fp, self.arch.is_rx3x0())
                } else {
                    None
                };
                if let Some(code) = folded {
                    return Ok(GcnOperand::from_range(RegRange::new(code, 0)));
                }
            }
        } else {
            let expr_place = cur.pos();
            let evaluated = match self.evaluate_expr(cur) {
                Ok(v) => v,
                Err(err) => return Err(self.error_at(cur, expr_place, err)),
            };
            match evaluated {
                ExprValue::Resolved { value: v, section } => {
                    if section != SECTION_ABS {
                        let err = AsmError::Semantic("Expression must be absolute!".into());
                        return Err(self.error_at(cur, expr_place, err));
                    }
                    value = v;
                }
                ExprValue::Unresolved(expr) => {
                    if flags.contains(OperandFlag::OnlyInlineConsts) || expr_out.is_none() {
                        return Err(self.literal_error(cur, name_place, flags));
                    }
                    unresolved = Some(expr);
                    value = 0;
                }
            }
            if !encode_as_literal && unresolved.is_none() {
                if value <= 64 {
                    return Ok(GcnOperand::from_range(RegRange::new(128 + value as u16, 0)));
                }
                let signed = value as i64;
                if (-16..0).contains(&signed) {
                    return Ok(GcnOperand::from_range(RegRange::new(
                        (192 - signed) as u16,
                        0,
                    )));
                }
            }
        }

        if encode_as_literal {
            cur.skip_spaces();
            if !cur.eat(b')') {
                let err = AsmError::Parse("Expected ')' after expression at 'lit'".into());
                return Err(self.error_at(cur, cur.pos(), err));
            }
        }
        if let Some(expr) = unresolved {
            if let Some(out) = expr_out {
                *out = Some(expr);
            }
            return Ok(GcnOperand::from_range(RegRange::new(255, 0)));
        }

        if flags.contains(OperandFlag::OnlyInlineConsts) {
            return Err(self.literal_error(cur, name_place, flags));
        }
        self.warn_for_range(cur, name_place, 32, value, crate::session::ImmSign::Both);
        Ok(GcnOperand {
            range: RegRange::new(255, 0),
            literal: value as u32,
            vop_mods: 0,
        })
    }

    fn literal_error(&mut self, cur: &Cursor, place: usize, flags: OperandFlags) -> AsmError {
        let msg = if flags.contains(OperandFlag::NoLiteralError) {
            "Literal in VOP3 is illegal"
        } else if flags.contains(OperandFlag::NoLiteralErrorMubuf) {
            "Literal in MUBUF is illegal"
        } else {
            "Only one literal can be used in instruction"
        };
        self.diags.error(cur.lineno(), place + 1, msg);
        AsmError::Semantic(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GcnArch;

    fn session(arch: GcnArch) -> AsmSession {
        AsmSession::new(arch, true)
    }

    fn src_flags() -> OperandFlags {
        OperandFlag::SRegs | OperandFlag::VRegs | OperandFlag::SSource
    }

    fn parse(
        s: &mut AsmSession,
        text: &str,
        flags: OperandFlags,
        lit: LitKind,
    ) -> Result<GcnOperand, AsmError> {
        let mut cur = Cursor::new(text, 1);
        s.parse_operand(&mut cur, 1, flags, lit, None)
    }

    #[test]
    fn inline_integer_constants() {
        let mut s = session(GcnArch::Gcn10);
        for v in 0..=64u16 {
            let op = parse(&mut s, &v.to_string(), src_flags(), LitKind::Int).unwrap();
            assert_eq!(op.range, RegRange::new(128 + v, 0), "value {v}");
        }
        for v in 1..=16i32 {
            let op = parse(&mut s, &format!("-{v}"), src_flags(), LitKind::Int).unwrap();
            assert_eq!(op.range, RegRange::new(192 + v as u16, 0), "value -{v}");
        }
    }

    #[test]
    fn plain_literals() {
        let mut s = session(GcnArch::Gcn10);
        let op = parse(&mut s, "65", src_flags(), LitKind::Int).unwrap();
        assert_eq!(op.range, RegRange::new(255, 0));
        assert_eq!(op.literal, 65);
        let op = parse(&mut s, "-17", src_flags(), LitKind::Int).unwrap();
        assert_eq!(op.range, RegRange::new(255, 0));
        assert_eq!(op.literal, (-17i32) as u32);
        let op = parse(&mut s, "0xdeadbeef", src_flags(), LitKind::Int).unwrap();
        assert_eq!(op.literal, 0xdeadbeef);
    }

    #[test]
    fn float_inline_constants() {
        let mut s = session(GcnArch::Gcn10);
        let op = parse(&mut s, "0.5", src_flags(), LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(240, 0));
        let op = parse(&mut s, "-0.5", src_flags(), LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(241, 0));
        let op = parse(&mut s, "1.0", src_flags(), LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(242, 0));
        let op = parse(&mut s, "-4.0", src_flags(), LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(247, 0));
        // f16 default precision folds the half patterns
        let op = parse(&mut s, "2.0", src_flags(), LitKind::F16).unwrap();
        assert_eq!(op.range, RegRange::new(244, 0));
        // 64-bit operands fold the high dword of the double
        let op = parse(&mut s, "1.0", src_flags(), LitKind::F64).unwrap();
        assert_eq!(op.range, RegRange::new(242, 0));
    }

    #[test]
    fn one_over_two_pi_is_gcn12_only() {
        let mut s = session(GcnArch::Gcn10);
        let op = parse(&mut s, "0.15915494", src_flags(), LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(255, 0));
        assert_eq!(op.literal, 0x3e22f983);
        let mut s = session(GcnArch::Gcn12);
        let op = parse(&mut s, "0.15915494", src_flags(), LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(248, 0));
    }

    #[test]
    fn lit_wrapper_forces_literal() {
        let mut s = session(GcnArch::Gcn10);
        let op = parse(&mut s, "lit(0.5)", src_flags(), LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(255, 0));
        assert_eq!(op.literal, 0x3f000000);
        let op = parse(&mut s, "lit (4)", src_flags(), LitKind::Int).unwrap();
        assert_eq!(op.range, RegRange::new(255, 0));
        assert_eq!(op.literal, 4);
    }

    #[test]
    fn suffixed_floats_route_precision() {
        let mut s = session(GcnArch::Gcn10);
        // `h` suffix parses as half, but does not fold at f32 default
        let op = parse(&mut s, "0.5h", src_flags(), LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(255, 0));
        assert_eq!(op.literal, 0x3800);
        let op = parse(&mut s, "0.5s", src_flags(), LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(240, 0));
    }

    #[test]
    fn buggy_fp_lit_mode() {
        let mut s = session(GcnArch::Gcn10);
        s.buggy_fp_lit = true;
        // f16 folds only zero
        let op = parse(&mut s, "0.0", src_flags(), LitKind::F16).unwrap();
        assert_eq!(op.range, RegRange::new(128, 0));
        let op = parse(&mut s, "0.5", src_flags(), LitKind::F16).unwrap();
        assert_eq!(op.range, RegRange::new(255, 0));
        assert_eq!(op.literal, 0x3800);
        // 64-bit float operands demote to integer parsing
        let op = parse(&mut s, "2", src_flags(), LitKind::F64).unwrap();
        assert_eq!(op.range, RegRange::new(130, 0));
    }

    #[test]
    fn registers_win_over_literals() {
        let mut s = session(GcnArch::Gcn10);
        let op = parse(&mut s, "v1", src_flags(), LitKind::Int).unwrap();
        assert_eq!(op.range, RegRange::new(257, 258));
        let op = parse(&mut s, "s7", src_flags(), LitKind::Int).unwrap();
        assert_eq!(op.range, RegRange::new(7, 8));
        let op = parse(&mut s, "vccz", src_flags(), LitKind::Int).unwrap();
        assert_eq!(op.range, RegRange::new(251, 252));
        let op = parse(&mut s, "scc", src_flags(), LitKind::Int).unwrap();
        assert_eq!(op.range, RegRange::new(253, 254));
    }

    #[test]
    fn lds_requires_flag() {
        let mut s = session(GcnArch::Gcn10);
        let op = parse(&mut s, "lds", src_flags() | OperandFlag::Lds, LitKind::Int).unwrap();
        assert_eq!(op.range, RegRange::new(254, 255));
        // without the flag `lds` is an undefined symbol
        let mut cur = Cursor::new("lds", 1);
        let mut unresolved = None;
        let op = s
            .parse_operand(&mut cur, 1, src_flags(), LitKind::Int, Some(&mut unresolved))
            .unwrap();
        assert_eq!(op.range, RegRange::new(255, 0));
        assert!(unresolved.is_some());
    }

    #[test]
    fn vop3_modifiers() {
        let mut s = session(GcnArch::Gcn12);
        let flags = src_flags() | OperandFlag::Vop3Mods;
        let op = parse(&mut s, "-v3", flags, LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(259, 260));
        assert_eq!(op.vop_mods, VOPOP_NEG);
        let op = parse(&mut s, "abs(v3)", flags, LitKind::F32).unwrap();
        assert_eq!(op.vop_mods, VOPOP_ABS);
        let op = parse(&mut s, "-abs(v3)", flags, LitKind::F32).unwrap();
        assert_eq!(op.vop_mods, VOPOP_NEG | VOPOP_ABS);
        let op = parse(&mut s, "|v3|", flags, LitKind::F32).unwrap();
        assert_eq!(op.vop_mods, VOPOP_ABS);
        let op = parse(&mut s, "sext(v3)", flags, LitKind::F32).unwrap();
        assert_eq!(op.vop_mods, VOPOP_SEXT);
        let op = parse(&mut s, "sext(-abs(v3))", flags, LitKind::F32).unwrap();
        assert_eq!(op.vop_mods, VOPOP_SEXT | VOPOP_NEG | VOPOP_ABS);
    }

    #[test]
    fn sext_needs_gcn12() {
        let mut s = session(GcnArch::Gcn10);
        let flags = src_flags() | OperandFlag::Vop3Mods;
        // on older generations `sext` is just an undefined symbol
        let mut cur = Cursor::new("sext(v3)", 1);
        assert!(s
            .parse_operand(&mut cur, 1, flags, LitKind::F32, None)
            .is_err());
    }

    #[test]
    fn negated_literal_keeps_sign() {
        let mut s = session(GcnArch::Gcn12);
        let flags = src_flags() | OperandFlag::Vop3Mods;
        let op = parse(&mut s, "-4", flags, LitKind::Int).unwrap();
        // folds to the inline constant for -4, no NEG modifier
        assert_eq!(op.range, RegRange::new(196, 0));
        assert_eq!(op.vop_mods, 0);
        let op = parse(&mut s, "-1.0", flags, LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(243, 0));
        assert_eq!(op.vop_mods, 0);
    }

    #[test]
    fn only_inline_consts_rejects_literals() {
        let mut s = session(GcnArch::Gcn10);
        let flags = src_flags() | OperandFlag::OnlyInlineConsts | OperandFlag::NoLiteralError;
        let err = parse(&mut s, "100", flags, LitKind::Int).unwrap_err();
        assert_eq!(
            err,
            AsmError::Semantic("Literal in VOP3 is illegal".into())
        );
        let flags =
            src_flags() | OperandFlag::OnlyInlineConsts | OperandFlag::NoLiteralErrorMubuf;
        let err = parse(&mut s, "100", flags, LitKind::Int).unwrap_err();
        assert_eq!(
            err,
            AsmError::Semantic("Literal in MUBUF is illegal".into())
        );
        let flags = src_flags() | OperandFlag::OnlyInlineConsts;
        let err = parse(&mut s, "100", flags, LitKind::Int).unwrap_err();
        assert_eq!(
            err,
            AsmError::Semantic("Only one literal can be used in instruction".into())
        );
        // inline-foldable values still pass
        let op = parse(&mut s, "63", flags, LitKind::Int).unwrap();
        assert_eq!(op.range, RegRange::new(191, 0));
    }

    #[test]
    fn float_classifier() {
        assert!(is_only_float(b"1.0", FloatLitType::F32).is_some());
        assert!(is_only_float(b"-0.5", FloatLitType::F32).is_some());
        assert!(is_only_float(b"1e10", FloatLitType::F32).is_some());
        assert!(is_only_float(b"0x1.8p2", FloatLitType::F32).is_some());
        assert!(is_only_float(b"10", FloatLitType::F32).is_none());
        assert!(is_only_float(b"0x10", FloatLitType::F32).is_none());
        assert!(is_only_float(b"name", FloatLitType::F32).is_none());
        assert!(is_only_float(b".", FloatLitType::F32).is_none());
        assert_eq!(
            is_only_float(b"1.5l", FloatLitType::F32),
            Some(FloatLitType::F64)
        );
        assert_eq!(
            is_only_float(b"1.5h", FloatLitType::F32),
            Some(FloatLitType::F16)
        );
    }
}
