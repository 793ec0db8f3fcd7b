//! VOP modifier stream parsing: OMOD/CLAMP, SDWA selects, DPP controls.
//!
//! Modifiers from the three vector-op encodings must not mix; the post-scan
//! check rejects a statement that needs more than one of VOP3, SDWA and DPP.

use phf::phf_map;

use crate::cursor::Cursor;
use crate::operand::{GcnOperand, VOPOP_SEXT};
use crate::session::{AsmSession, ImmSign};
use crate::AsmError;

/// OMOD field value `mul:2`.
pub const VOP3_MUL2: u8 = 1;
/// OMOD field value `mul:4`.
pub const VOP3_MUL4: u8 = 2;
/// OMOD field value `div:2`.
pub const VOP3_DIV2: u8 = 3;
/// CLAMP modifier bit.
pub const VOP3_CLAMP: u8 = 4;
/// DPP bound_ctrl modifier bit.
pub const VOP3_BOUNDCTRL: u8 = 8;
/// Explicit `vop3` encoding request.
pub const VOP3_VOP3: u8 = 16;

/// SDWA/DPP specific modifier state with its encoding defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VopExtraModifiers {
    /// SDWA destination select (0-7, 6 = dword).
    pub dst_sel: u8,
    /// SDWA destination unused mode (0 pad, 1 sext, 2 preserve).
    pub dst_unused: u8,
    /// SDWA source 0 select.
    pub src0_sel: u8,
    /// SDWA source 1 select.
    pub src1_sel: u8,
    /// DPP bank mask.
    pub bank_mask: u8,
    /// DPP row mask.
    pub row_mask: u8,
    /// DPP control word.
    pub dpp_ctrl: u16,
    /// The statement needs the SDWA word.
    pub need_sdwa: bool,
    /// The statement needs the DPP word.
    pub need_dpp: bool,
}

impl VopExtraModifiers {
    /// Encoding defaults for a statement with the given SDWA operand count.
    pub fn new(with_sdwa_operands: u8) -> Self {
        VopExtraModifiers {
            dst_sel: 6,
            dst_unused: 0,
            src0_sel: if with_sdwa_operands >= 2 { 6 } else { 0 },
            src1_sel: if with_sdwa_operands >= 3 { 6 } else { 0 },
            bank_mask: 15,
            row_mask: 15,
            dpp_ctrl: 0xe4,
            need_sdwa: false,
            need_dpp: false,
        }
    }
}

/// Encoding explicitly requested by the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcnVopEnc {
    /// No explicit request.
    Normal,
    /// DPP word required.
    Dpp,
    /// SDWA word required.
    Sdwa,
}

/// Encoding width requested by an `_e32`/`_e64` mnemonic suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcnEncSize {
    /// No explicit width.
    Unknown,
    /// 32-bit encoding.
    Bit32,
    /// 64-bit encoding.
    Bit64,
}

static SDWA_SEL_NAMES: phf::Map<&'static str, u8> = phf_map! {
    "b0" => 0, "b1" => 1, "b2" => 2, "b3" => 3,
    "byte0" => 0, "byte1" => 1, "byte2" => 2, "byte3" => 3,
    "byte_0" => 0, "byte_1" => 1, "byte_2" => 2, "byte_3" => 3,
    "w0" => 4, "w1" => 5,
    "word0" => 4, "word1" => 5,
    "word_0" => 4, "word_1" => 5,
    "dword" => 6,
};

impl AsmSession {
    fn expect_colon(&mut self, cur: &mut Cursor, what: &str) -> Result<(), AsmError> {
        cur.skip_spaces();
        if !cur.eat(b':') {
            let err = AsmError::Parse(format!("Expected ':' before {what}"));
            return Err(self.error_at(cur, cur.pos(), err));
        }
        Ok(())
    }

    fn parse_sdwa_sel(&mut self, cur: &mut Cursor, what: &str) -> Result<u8, AsmError> {
        cur.skip_spaces();
        let place = cur.pos();
        let name = cur.extract_name().unwrap_or("").to_ascii_lowercase();
        match SDWA_SEL_NAMES.get(name.as_str()) {
            Some(&sel) => Ok(sel),
            None => {
                let err = AsmError::Semantic(format!("Unknown {what}"));
                Err(self.error_at(cur, place, err))
            }
        }
    }

    /// Parses the whitespace-separated `name[:value]` modifier stream after
    /// the operands. Basic modifiers accumulate into the returned bitset,
    /// SDWA/DPP state goes into `extra` when the encoding has it.
    pub fn parse_vop_modifiers(
        &mut self,
        cur: &mut Cursor,
        with_clamp: bool,
        with_sdwa_operands: u8,
        mut extra: Option<&mut VopExtraModifiers>,
    ) -> Result<u8, AsmError> {
        let mut have_dst_sel = false;
        let mut have_dst_unused = false;
        let mut have_src0_sel = false;
        let mut have_src1_sel = false;
        let mut have_bank_mask = false;
        let mut have_row_mask = false;
        let mut have_bound_ctrl = false;
        let mut have_dpp_ctrl = false;

        if let Some(extra) = extra.as_deref_mut() {
            *extra = VopExtraModifiers::new(with_sdwa_operands);
        }

        cur.skip_spaces();
        let mods_place = cur.pos();
        let mut mods: u8 = 0;
        let mut first_err: Option<AsmError> = None;
        // keep scanning after a bad modifier, report the first at the end

        while !cur.at_end() {
            cur.skip_spaces();
            if cur.at_end() {
                break;
            }
            let mod_place = cur.pos();
            let name = match cur.extract_name() {
                Some(n) => n.to_ascii_lowercase(),
                None => {
                    let err = AsmError::Parse("Expected VOP modifier".into());
                    let err = self.error_at(cur, mod_place, err);
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                    // resync on the next space
                    while matches!(cur.peek(), Some(b) if b != b' ' && b != b'\t') {
                        cur.bump();
                    }
                    continue;
                }
            };
            let mut already_omod = false;
            match name.as_str() {
                "mul" => match self.parse_omod_count(cur, "multiplier number") {
                    Ok(count) => {
                        if count == 2 {
                            already_omod = mods & 3 != 0;
                            mods = mods & !3 | VOP3_MUL2;
                        } else if count == 4 {
                            already_omod = mods & 3 != 0;
                            mods = mods & !3 | VOP3_MUL4;
                        } else {
                            let err =
                                AsmError::Semantic("Unknown VOP3 mul:X modifier".into());
                            let err = self.error_at(cur, mod_place, err);
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                    Err(err) => {
                        if first_err.is_none() {
                            first_err = Some(err);
                        }
                    }
                },
                "div" => match self.parse_omod_count(cur, "divider number") {
                    Ok(count) => {
                        if count == 2 {
                            already_omod = mods & 3 != 0;
                            mods = mods & !3 | VOP3_DIV2;
                        } else {
                            let err =
                                AsmError::Semantic("Unknown VOP3 div:X modifier".into());
                            let err = self.error_at(cur, mod_place, err);
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                    Err(err) => {
                        if first_err.is_none() {
                            first_err = Some(err);
                        }
                    }
                },
                "clamp" => {
                    if with_clamp {
                        mods |= VOP3_CLAMP;
                    } else {
                        let err =
                            AsmError::Semantic("Modifier CLAMP in VOP3B is illegal".into());
                        let err = self.error_at(cur, mod_place, err);
                        if first_err.is_none() {
                            first_err = Some(err);
                        }
                    }
                }
                "vop3" => mods |= VOP3_VOP3,
                _ if extra.is_none() => {
                    let err = AsmError::Semantic("Unknown VOP modifier".into());
                    let err = self.error_at(cur, mod_place, err);
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
                "dst_sel" if with_sdwa_operands >= 1 => {
                    match self
                        .expect_colon(cur, "dst_sel")
                        .and_then(|()| self.parse_sdwa_sel(cur, "dst_sel"))
                    {
                        Ok(sel) => {
                            extra.as_deref_mut().unwrap().dst_sel = sel;
                            if have_dst_sel {
                                self.diags.warning(
                                    cur.lineno(),
                                    mod_place + 1,
                                    "Dst_sel is already defined",
                                );
                            }
                            have_dst_sel = true;
                        }
                        Err(err) => {
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                }
                "dst_unused" | "dst_un" if with_sdwa_operands >= 1 => {
                    match self.parse_dst_unused(cur) {
                        Ok(unused) => {
                            extra.as_deref_mut().unwrap().dst_unused = unused;
                            if have_dst_unused {
                                self.diags.warning(
                                    cur.lineno(),
                                    mod_place + 1,
                                    "Dst_unused is already defined",
                                );
                            }
                            have_dst_unused = true;
                        }
                        Err(err) => {
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                }
                "src0_sel" if with_sdwa_operands >= 2 => {
                    match self
                        .expect_colon(cur, "src0_sel")
                        .and_then(|()| self.parse_sdwa_sel(cur, "src0_sel"))
                    {
                        Ok(sel) => {
                            extra.as_deref_mut().unwrap().src0_sel = sel;
                            if have_src0_sel {
                                self.diags.warning(
                                    cur.lineno(),
                                    mod_place + 1,
                                    "Src0_sel is already defined",
                                );
                            }
                            have_src0_sel = true;
                        }
                        Err(err) => {
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                }
                "src1_sel" if with_sdwa_operands >= 3 => {
                    match self
                        .expect_colon(cur, "src1_sel")
                        .and_then(|()| self.parse_sdwa_sel(cur, "src1_sel"))
                    {
                        Ok(sel) => {
                            extra.as_deref_mut().unwrap().src1_sel = sel;
                            if have_src1_sel {
                                self.diags.warning(
                                    cur.lineno(),
                                    mod_place + 1,
                                    "Src1_sel is already defined",
                                );
                            }
                            have_src1_sel = true;
                        }
                        Err(err) => {
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                }
                "quad_perm" => match self.parse_quad_perm(cur) {
                    Ok(ctrl) => {
                        extra.as_deref_mut().unwrap().dpp_ctrl = ctrl;
                        if have_dpp_ctrl {
                            self.diags.warning(
                                cur.lineno(),
                                mod_place + 1,
                                "DppCtrl is already defined",
                            );
                        }
                        have_dpp_ctrl = true;
                    }
                    Err(err) => {
                        if first_err.is_none() {
                            first_err = Some(err);
                        }
                    }
                },
                "bank_mask" => {
                    match self
                        .expect_colon(cur, "bank_mask")
                        .and_then(|()| self.parse_imm(cur, 4, ImmSign::Unsigned))
                    {
                        Ok(mask) => {
                            extra.as_deref_mut().unwrap().bank_mask = mask as u8;
                            if have_bank_mask {
                                self.diags.warning(
                                    cur.lineno(),
                                    mod_place + 1,
                                    "Bank_mask is already defined",
                                );
                            }
                            have_bank_mask = true;
                        }
                        Err(err) => {
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                }
                "row_mask" => {
                    match self
                        .expect_colon(cur, "row_mask")
                        .and_then(|()| self.parse_imm(cur, 4, ImmSign::Unsigned))
                    {
                        Ok(mask) => {
                            extra.as_deref_mut().unwrap().row_mask = mask as u8;
                            if have_row_mask {
                                self.diags.warning(
                                    cur.lineno(),
                                    mod_place + 1,
                                    "Row_mask is already defined",
                                );
                            }
                            have_row_mask = true;
                        }
                        Err(err) => {
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                }
                "bound_ctrl" => {
                    let mut mod_good = true;
                    cur.skip_spaces();
                    if cur.peek() == Some(b':') {
                        cur.skip_char_and_spaces();
                        if matches!(cur.peek(), Some(b'0') | Some(b'1')) {
                            mods |= VOP3_BOUNDCTRL;
                            cur.bump();
                        } else {
                            let err = AsmError::Parse("Value must be '0' or '1'".into());
                            let err = self.error_at(cur, cur.pos(), err);
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                            mod_good = false;
                        }
                    } else {
                        mods |= VOP3_BOUNDCTRL;
                    }
                    if mod_good {
                        if have_bound_ctrl {
                            self.diags.warning(
                                cur.lineno(),
                                mod_place + 1,
                                "BoundCtrl is already defined",
                            );
                        }
                        have_bound_ctrl = true;
                        extra.as_deref_mut().unwrap().need_dpp = true;
                    }
                }
                "row_shl" | "row_shr" | "row_ror" => {
                    match self
                        .expect_colon(cur, &name)
                        .and_then(|()| self.parse_row_shift(cur, &name))
                    {
                        Ok(ctrl) => {
                            if have_dpp_ctrl {
                                self.diags.warning(
                                    cur.lineno(),
                                    mod_place + 1,
                                    "DppCtrl is already defined",
                                );
                            }
                            have_dpp_ctrl = true;
                            extra.as_deref_mut().unwrap().dpp_ctrl = ctrl;
                        }
                        Err(err) => {
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                }
                "wave_shl" | "wave_shr" | "wave_rol" | "wave_ror" => {
                    let mut mod_good = true;
                    cur.skip_spaces();
                    if cur.peek() == Some(b':') {
                        cur.skip_char_and_spaces();
                        if cur.peek() == Some(b'1') {
                            cur.bump();
                        } else {
                            let err = AsmError::Parse("Value must be '1'".into());
                            let err = self.error_at(cur, cur.pos(), err);
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                            mod_good = false;
                        }
                    }
                    let ctrl = match name.as_str() {
                        "wave_shl" => 0x130,
                        "wave_rol" => 0x134,
                        "wave_shr" => 0x138,
                        _ => 0x13c,
                    };
                    extra.as_deref_mut().unwrap().dpp_ctrl = ctrl;
                    if mod_good {
                        if have_dpp_ctrl {
                            self.diags.warning(
                                cur.lineno(),
                                mod_place + 1,
                                "DppCtrl is already defined",
                            );
                        }
                        have_dpp_ctrl = true;
                    }
                }
                "row_mirror" | "row_half_mirror" | "row_hmirror" => {
                    extra.as_deref_mut().unwrap().dpp_ctrl =
                        if name == "row_mirror" { 0x140 } else { 0x141 };
                    if have_dpp_ctrl {
                        self.diags.warning(
                            cur.lineno(),
                            mod_place + 1,
                            "DppCtrl is already defined",
                        );
                    }
                    have_dpp_ctrl = true;
                }
                "row_bcast15" | "row_bcast31" | "row_bcast" => {
                    let parsed = if name == "row_bcast15" {
                        Ok(0x142)
                    } else if name == "row_bcast31" {
                        Ok(0x143)
                    } else {
                        self.expect_colon(cur, "row_bcast")
                            .and_then(|()| self.parse_row_bcast(cur))
                    };
                    match parsed {
                        Ok(ctrl) => {
                            extra.as_deref_mut().unwrap().dpp_ctrl = ctrl;
                            if have_dpp_ctrl {
                                self.diags.warning(
                                    cur.lineno(),
                                    mod_place + 1,
                                    "DppCtrl is already defined",
                                );
                            }
                            have_dpp_ctrl = true;
                        }
                        Err(err) => {
                            if first_err.is_none() {
                                first_err = Some(err);
                            }
                        }
                    }
                }
                _ => {
                    let err = AsmError::Semantic("Unknown VOP modifier".into());
                    let err = self.error_at(cur, mod_place, err);
                    if first_err.is_none() {
                        first_err = Some(err);
                    }
                }
            }
            if already_omod {
                self.diags
                    .warning(cur.lineno(), mod_place + 1, "OMOD is already defined");
            }
        }

        let vop_sdwa = have_dst_sel || have_dst_unused || have_src0_sel || have_src1_sel;
        let vop_dpp = have_dpp_ctrl || have_bound_ctrl || have_bank_mask || have_row_mask;
        let vop3 = mods & (3 | VOP3_VOP3) != 0;
        if let Some(extra) = extra.as_deref_mut() {
            extra.need_sdwa = vop_sdwa;
            extra.need_dpp = vop_dpp;
        }

        if u32::from(vop3) + u32::from(vop_sdwa) + u32::from(vop_dpp) > 1
            || (mods & VOP3_CLAMP != 0 && vop_dpp)
        {
            let msg = "Mixing modifiers from different encodings is illegal";
            self.diags.error(cur.lineno(), mods_place + 1, msg);
            return Err(AsmError::Semantic(msg.into()));
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(mods),
        }
    }

    fn parse_omod_count(&mut self, cur: &mut Cursor, what: &str) -> Result<u8, AsmError> {
        cur.skip_spaces();
        if !cur.eat(b':') {
            let err = AsmError::Parse(format!("Expected ':' before {what}"));
            return Err(self.error_at(cur, cur.pos(), err));
        }
        cur.skip_spaces();
        cur.parse_byte()
            .map_err(|e| self.error_at(cur, cur.pos(), e))
    }

    fn parse_dst_unused(&mut self, cur: &mut Cursor) -> Result<u8, AsmError> {
        self.expect_colon(cur, "dst_unused")?;
        cur.skip_spaces();
        let place = cur.pos();
        let name = cur.extract_name().unwrap_or("").to_ascii_lowercase();
        let stripped = name.strip_prefix("unused_").unwrap_or(&name);
        match stripped {
            "pad" => Ok(0),
            "sext" => Ok(1),
            "preserve" => Ok(2),
            _ => {
                let err = AsmError::Semantic("Unknown dst_unused".into());
                Err(self.error_at(cur, place, err))
            }
        }
    }

    fn parse_quad_perm(&mut self, cur: &mut Cursor) -> Result<u16, AsmError> {
        self.expect_colon(cur, "quad_perm")?;
        cur.skip_spaces();
        if !cur.eat(b'[') {
            let err = AsmError::Parse("Expected '[' before quad_perm list".into());
            return Err(self.error_at(cur, cur.pos(), err));
        }
        let mut quad_perm: u16 = 0;
        for k in 0..4 {
            cur.skip_spaces();
            let num_place = cur.pos();
            let value = cur
                .parse_byte()
                .map_err(|e| self.error_at(cur, num_place, e))?;
            if value >= 4 {
                let err =
                    AsmError::Range("quad_perm component out of range (0-3)".into());
                return Err(self.error_at(cur, num_place, err));
            }
            quad_perm |= u16::from(value) << (k * 2);
            cur.skip_spaces();
            if k != 3 {
                if !cur.eat(b',') {
                    let err =
                        AsmError::Parse("Expected ',' before quad_perm component".into());
                    return Err(self.error_at(cur, cur.pos(), err));
                }
            } else if !cur.eat(b']') {
                let err = AsmError::Parse("Unterminated quad_perm".into());
                return Err(self.error_at(cur, cur.pos(), err));
            }
        }
        Ok(quad_perm)
    }

    fn parse_row_shift(&mut self, cur: &mut Cursor, name: &str) -> Result<u16, AsmError> {
        cur.skip_spaces();
        let shift_place = cur.pos();
        let shift = self.parse_imm(cur, 4, ImmSign::Unsigned)? as u16;
        if shift == 0 {
            let err = AsmError::Range("Illegal zero shift for row_XXX shift".into());
            return Err(self.error_at(cur, shift_place, err));
        }
        let op = match name {
            "row_shl" => 0,
            "row_shr" => 0x10,
            _ => 0x20,
        };
        Ok(0x100 | op | shift)
    }

    fn parse_row_bcast(&mut self, cur: &mut Cursor) -> Result<u16, AsmError> {
        cur.skip_spaces();
        let num_place = cur.pos();
        let value = cur
            .parse_byte()
            .map_err(|e| self.error_at(cur, num_place, e))?;
        match value {
            15 => Ok(0x142),
            31 => Ok(0x143),
            _ => {
                let err =
                    AsmError::Range("Thread to broadcast must be 15 or 31".into());
                Err(self.error_at(cur, num_place, err))
            }
        }
    }

    /// Verifies the words emitted match an `_e32`/`_e64` suffix request.
    pub fn check_encoding_size(
        &mut self,
        cur: &Cursor,
        place: usize,
        enc_size: GcnEncSize,
        words_num: u32,
    ) -> Result<(), AsmError> {
        if enc_size == GcnEncSize::Bit32 && words_num != 1 {
            let msg = "32-bit encoding specified when 64-bit encoding";
            self.diags.error(cur.lineno(), place + 1, msg);
            return Err(AsmError::Semantic(msg.into()));
        }
        if enc_size == GcnEncSize::Bit64 && words_num != 2 {
            let msg = "64-bit encoding specified when 32-bit encoding";
            self.diags.error(cur.lineno(), place + 1, msg);
            return Err(AsmError::Semantic(msg.into()));
        }
        Ok(())
    }

    /// Verifies a caller-requested SDWA/DPP encoding is actually present.
    pub fn check_vop_encoding(
        &mut self,
        cur: &Cursor,
        place: usize,
        vop_enc: GcnVopEnc,
        extra: &VopExtraModifiers,
    ) -> Result<(), AsmError> {
        if vop_enc == GcnVopEnc::Dpp && !extra.need_dpp {
            let msg = "DPP encoding specified when DPP not present";
            self.diags.error(cur.lineno(), place + 1, msg);
            return Err(AsmError::Semantic(msg.into()));
        }
        if vop_enc == GcnVopEnc::Sdwa && !extra.need_sdwa {
            let msg = "SDWA encoding specified when SDWA not present";
            self.diags.error(cur.lineno(), place + 1, msg);
            return Err(AsmError::Semantic(msg.into()));
        }
        Ok(())
    }

    /// Preconditions of the SDWA/DPP extra words, and the default word
    /// choice when modifiers implied one without an explicit request.
    pub fn check_vop_extra_modifiers(
        &mut self,
        cur: &Cursor,
        place: usize,
        need_imm: bool,
        src_ops: &[&GcnOperand],
        vop3: bool,
        vop_enc: GcnVopEnc,
        extra: &mut VopExtraModifiers,
    ) -> Result<(), AsmError> {
        let mut fail = |session: &mut AsmSession, msg: &str| {
            session.diags.error(cur.lineno(), place + 1, msg);
            Err(AsmError::Semantic(msg.into()))
        };
        if need_imm {
            return fail(self, "Literal with SDWA or DPP word is illegal");
        }
        if let Some(src0) = src_ops.first() {
            if src0.range.start < 256 {
                return fail(self, "SRC0 must be a vector register with SDWA or DPP word");
            }
        }
        if vop3 {
            return fail(self, "Mixing VOP3 with SDWA or DPP word is illegal");
        }
        let sext = src_ops.iter().any(|op| op.vop_mods & VOPOP_SEXT != 0);
        if sext && extra.need_dpp {
            return fail(self, "SEXT modifiers is unavailable for DPP word");
        }
        if !extra.need_sdwa && !extra.need_dpp {
            if vop_enc != GcnVopEnc::Dpp {
                extra.need_sdwa = true;
            } else {
                extra.need_dpp = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GcnArch;

    fn parse(
        text: &str,
        with_clamp: bool,
    ) -> (Result<u8, AsmError>, VopExtraModifiers, AsmSession) {
        let mut s = AsmSession::new(GcnArch::Gcn12, true);
        let mut cur = Cursor::new(text, 1);
        let mut extra = VopExtraModifiers::new(3);
        let res = s.parse_vop_modifiers(&mut cur, with_clamp, 3, Some(&mut extra));
        (res, extra, s)
    }

    #[test]
    fn omod_and_clamp() {
        let (res, extra, _) = parse("mul:2 clamp", true);
        assert_eq!(res.unwrap(), VOP3_MUL2 | VOP3_CLAMP);
        assert!(!extra.need_sdwa);
        assert!(!extra.need_dpp);
        let (res, _, _) = parse("mul:4", true);
        assert_eq!(res.unwrap(), VOP3_MUL4);
        let (res, _, _) = parse("div:2", true);
        assert_eq!(res.unwrap(), VOP3_DIV2);
    }

    #[test]
    fn clamp_in_vop3b_is_illegal() {
        let (res, _, _) = parse("clamp", false);
        assert_eq!(
            res.unwrap_err(),
            AsmError::Semantic("Modifier CLAMP in VOP3B is illegal".into())
        );
    }

    #[test]
    fn sdwa_selects() {
        let (res, extra, _) = parse("dst_sel:b1 src0_sel:word_1 dst_unused:sext", true);
        assert!(res.is_ok());
        assert_eq!(extra.dst_sel, 1);
        assert_eq!(extra.src0_sel, 5);
        assert_eq!(extra.dst_unused, 1);
        assert!(extra.need_sdwa);
        assert!(!extra.need_dpp);
        let (res, extra, _) = parse("src1_sel:dword dst_unused:unused_preserve", true);
        assert!(res.is_ok());
        assert_eq!(extra.src1_sel, 6);
        assert_eq!(extra.dst_unused, 2);
    }

    #[test]
    fn dpp_controls() {
        let (res, extra, _) = parse("quad_perm:[0,1,2,3]", true);
        assert!(res.is_ok());
        assert_eq!(extra.dpp_ctrl, 0xe4);
        assert!(extra.need_dpp);
        let (res, extra, _) = parse("quad_perm:[3,2,1,0]", true);
        assert!(res.is_ok());
        assert_eq!(extra.dpp_ctrl, 0x1b);
        let (_, extra, _) = parse("row_shl:3", true);
        assert_eq!(extra.dpp_ctrl, 0x103);
        let (_, extra, _) = parse("row_shr:7", true);
        assert_eq!(extra.dpp_ctrl, 0x117);
        let (_, extra, _) = parse("row_ror:5", true);
        assert_eq!(extra.dpp_ctrl, 0x125);
        let (_, extra, _) = parse("wave_shl:1", true);
        assert_eq!(extra.dpp_ctrl, 0x130);
        let (_, extra, _) = parse("wave_rol:1", true);
        assert_eq!(extra.dpp_ctrl, 0x134);
        let (_, extra, _) = parse("wave_shr:1", true);
        assert_eq!(extra.dpp_ctrl, 0x138);
        let (_, extra, _) = parse("wave_ror:1", true);
        assert_eq!(extra.dpp_ctrl, 0x13c);
        let (_, extra, _) = parse("row_mirror", true);
        assert_eq!(extra.dpp_ctrl, 0x140);
        let (_, extra, _) = parse("row_half_mirror", true);
        assert_eq!(extra.dpp_ctrl, 0x141);
        let (_, extra, _) = parse("row_bcast15", true);
        assert_eq!(extra.dpp_ctrl, 0x142);
        let (_, extra, _) = parse("row_bcast:15", true);
        assert_eq!(extra.dpp_ctrl, 0x142);
        let (_, extra, _) = parse("row_bcast:31", true);
        assert_eq!(extra.dpp_ctrl, 0x143);
    }

    #[test]
    fn dpp_masks_and_bound_ctrl() {
        let (res, extra, _) = parse("bank_mask:5 row_mask:0xa bound_ctrl", true);
        let mods = res.unwrap();
        assert_eq!(extra.bank_mask, 5);
        assert_eq!(extra.row_mask, 10);
        assert_ne!(mods & VOP3_BOUNDCTRL, 0);
        assert!(extra.need_dpp);
        let (res, _, _) = parse("bound_ctrl:0", true);
        assert!(res.is_ok());
        let (res, _, _) = parse("bound_ctrl:2", true);
        assert!(res.is_err());
    }

    #[test]
    fn zero_row_shift_rejected() {
        let (res, _, _) = parse("row_shl:0", true);
        assert_eq!(
            res.unwrap_err(),
            AsmError::Range("Illegal zero shift for row_XXX shift".into())
        );
    }

    #[test]
    fn cross_encoding_mixing() {
        let (res, _, _) = parse("dst_sel:b1 mul:2", true);
        assert_eq!(
            res.unwrap_err(),
            AsmError::Semantic("Mixing modifiers from different encodings is illegal".into())
        );
        let (res, _, _) = parse("quad_perm:[0,1,2,3] dst_sel:b0", true);
        assert!(res.is_err());
        let (res, _, _) = parse("vop3 row_mask:1", true);
        assert!(res.is_err());
        let (res, _, _) = parse("clamp row_shl:1", true);
        assert!(res.is_err());
        // clamp with SDWA is allowed
        let (res, _, _) = parse("clamp dst_sel:b2", true);
        assert!(res.is_ok());
    }

    #[test]
    fn duplicate_modifiers_warn() {
        let (res, extra, s) = parse("dst_sel:b1 dst_sel:b2", true);
        assert!(res.is_ok());
        assert_eq!(extra.dst_sel, 2);
        assert_eq!(s.diags.entries().len(), 1);
        let (res, _, s) = parse("mul:2 div:2", true);
        assert_eq!(res.unwrap() & 3, VOP3_DIV2);
        assert_eq!(s.diags.entries().len(), 1);
    }

    #[test]
    fn unknown_modifier() {
        let (res, _, _) = parse("swizzle:3", true);
        assert_eq!(
            res.unwrap_err(),
            AsmError::Semantic("Unknown VOP modifier".into())
        );
    }

    #[test]
    fn extra_modifier_preconditions() {
        let mut s = AsmSession::new(GcnArch::Gcn12, true);
        let cur = Cursor::new("", 1);
        let mut extra = VopExtraModifiers::new(3);
        extra.need_sdwa = true;
        let vgpr = GcnOperand {
            range: crate::regs::RegRange::new(256, 257),
            literal: 0,
            vop_mods: 0,
        };
        let sgpr = GcnOperand {
            range: crate::regs::RegRange::new(0, 1),
            literal: 0,
            vop_mods: 0,
        };
        assert!(s
            .check_vop_extra_modifiers(&cur, 0, false, &[&vgpr], false, GcnVopEnc::Normal, &mut extra)
            .is_ok());
        assert!(s
            .check_vop_extra_modifiers(&cur, 0, true, &[&vgpr], false, GcnVopEnc::Normal, &mut extra)
            .is_err());
        assert!(s
            .check_vop_extra_modifiers(&cur, 0, false, &[&sgpr], false, GcnVopEnc::Normal, &mut extra)
            .is_err());
        assert!(s
            .check_vop_extra_modifiers(&cur, 0, false, &[&vgpr], true, GcnVopEnc::Normal, &mut extra)
            .is_err());
    }
}
