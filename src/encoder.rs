//! Instruction-word emission for the supported GCN statement subset.
//!
//! SOP1/SOP2 scalar ops and VOP1/VOP2 vector ops are encoded directly;
//! vector statements promote to the 64-bit VOP3 form when operand modifiers,
//! OMOD/CLAMP, a scalar second source, or an `_e64` suffix require it, and
//! to the SDWA/DPP words on GCN 1.2 when those modifiers are present.
//! Opcode values differ between GCN 1.0/1.1 and GCN 1.2; the mnemonic table
//! carries both.

use phf::phf_map;

use crate::cursor::Cursor;
use crate::modifiers::{
    GcnEncSize, GcnVopEnc, VopExtraModifiers, VOP3_BOUNDCTRL, VOP3_CLAMP, VOP3_VOP3,
};
use crate::operand::{GcnOperand, VOPOP_ABS, VOPOP_NEG, VOPOP_SEXT};
use crate::regs::{LitKind, OperandFlag, OperandFlags, RegRange};
use crate::session::AsmSession;
use crate::AsmError;

/// Encoding family of a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcnEncType {
    /// Scalar one-source ALU.
    Sop1,
    /// Scalar two-source ALU.
    Sop2,
    /// Vector one-source ALU.
    Vop1,
    /// Vector two-source ALU.
    Vop2,
}

/// One mnemonic of the supported subset.
#[derive(Debug, Clone, Copy)]
pub struct GcnInsn {
    enc: GcnEncType,
    /// Opcode on GCN 1.0/1.1.
    opcode_si: u16,
    /// Opcode on GCN 1.2.
    opcode_vi: u16,
    /// Destination register count.
    dst_regs: u16,
    /// Source register count.
    src_regs: u16,
    /// Default literal precision of the sources.
    lit: LitKind,
}

const fn insn(
    enc: GcnEncType,
    opcode_si: u16,
    opcode_vi: u16,
    dst_regs: u16,
    src_regs: u16,
    lit: LitKind,
) -> GcnInsn {
    GcnInsn {
        enc,
        opcode_si,
        opcode_vi,
        dst_regs,
        src_regs,
        lit,
    }
}

static GCN_INSNS: phf::Map<&'static str, GcnInsn> = phf_map! {
    "s_add_u32" => insn(GcnEncType::Sop2, 0, 0, 1, 1, LitKind::Int),
    "s_sub_u32" => insn(GcnEncType::Sop2, 1, 1, 1, 1, LitKind::Int),
    "s_add_i32" => insn(GcnEncType::Sop2, 2, 2, 1, 1, LitKind::Int),
    "s_sub_i32" => insn(GcnEncType::Sop2, 3, 3, 1, 1, LitKind::Int),
    "s_and_b32" => insn(GcnEncType::Sop2, 14, 12, 1, 1, LitKind::Int),
    "s_mov_b32" => insn(GcnEncType::Sop1, 3, 0, 1, 1, LitKind::Int),
    "s_mov_b64" => insn(GcnEncType::Sop1, 4, 1, 2, 2, LitKind::Int),
    "s_not_b32" => insn(GcnEncType::Sop1, 7, 4, 1, 1, LitKind::Int),
    "v_mov_b32" => insn(GcnEncType::Vop1, 1, 1, 1, 1, LitKind::Int),
    "v_cvt_f32_i32" => insn(GcnEncType::Vop1, 5, 5, 1, 1, LitKind::Int),
    "v_cvt_f32_u32" => insn(GcnEncType::Vop1, 6, 6, 1, 1, LitKind::Int),
    "v_add_f32" => insn(GcnEncType::Vop2, 3, 1, 1, 1, LitKind::F32),
    "v_sub_f32" => insn(GcnEncType::Vop2, 4, 2, 1, 1, LitKind::F32),
    "v_subrev_f32" => insn(GcnEncType::Vop2, 5, 3, 1, 1, LitKind::F32),
    "v_mul_f32" => insn(GcnEncType::Vop2, 8, 5, 1, 1, LitKind::F32),
    "v_and_b32" => insn(GcnEncType::Vop2, 27, 19, 1, 1, LitKind::Int),
    "v_or_b32" => insn(GcnEncType::Vop2, 28, 20, 1, 1, LitKind::Int),
    "v_xor_b32" => insn(GcnEncType::Vop2, 29, 21, 1, 1, LitKind::Int),
};

fn vop_mod_bits(op: &GcnOperand) -> (u32, u32, u32) {
    (
        u32::from(op.vop_mods & VOPOP_NEG != 0),
        u32::from(op.vop_mods & VOPOP_ABS != 0),
        u32::from(op.vop_mods & VOPOP_SEXT != 0),
    )
}

impl AsmSession {
    /// Assembles one instruction statement, returning its encoded words.
    /// The trailing literal dword, when present, is the last word.
    pub fn assemble_instruction(&mut self, cur: &mut Cursor) -> Result<Vec<u32>, AsmError> {
        cur.skip_spaces();
        let insn_place = cur.pos();
        let raw = match cur.extract_name() {
            Some(name) => name.to_ascii_lowercase(),
            None => {
                let err = AsmError::Parse("Expected instruction mnemonic".into());
                return Err(self.error_at(cur, insn_place, err));
            }
        };
        let (mnemonic, enc_size) = if let Some(base) = raw.strip_suffix("_e64") {
            (base, GcnEncSize::Bit64)
        } else if let Some(base) = raw.strip_suffix("_e32") {
            (base, GcnEncSize::Bit32)
        } else {
            (raw.as_str(), GcnEncSize::Unknown)
        };
        let insn = match GCN_INSNS.get(mnemonic) {
            Some(insn) => *insn,
            None => {
                let err = AsmError::Semantic(format!("Unknown instruction '{raw}'"));
                return Err(self.error_at(cur, insn_place, err));
            }
        };
        let opcode = if self.arch.is_rx3x0() {
            insn.opcode_vi
        } else {
            insn.opcode_si
        };
        let words = match insn.enc {
            GcnEncType::Sop1 => self.encode_sop1(cur, &insn, opcode)?,
            GcnEncType::Sop2 => self.encode_sop2(cur, &insn, opcode)?,
            GcnEncType::Vop1 | GcnEncType::Vop2 => {
                self.encode_vop(cur, insn_place, &insn, opcode, enc_size)?
            }
        };
        if matches!(insn.enc, GcnEncType::Sop1 | GcnEncType::Sop2) {
            self.check_encoding_size(cur, insn_place, enc_size, words.len() as u32)?;
        }
        cur.skip_spaces();
        if !cur.at_end() {
            let err = AsmError::Parse("Garbage at end of line".into());
            return Err(self.error_at(cur, cur.pos(), err));
        }
        Ok(words)
    }

    fn expect_comma(&mut self, cur: &mut Cursor) -> Result<(), AsmError> {
        cur.skip_spaces();
        if !cur.eat(b',') {
            let err = AsmError::Parse("Expected ',' before operand".into());
            return Err(self.error_at(cur, cur.pos(), err));
        }
        Ok(())
    }

    fn scalar_dst(&mut self, cur: &mut Cursor, regs_num: u16) -> Result<RegRange, AsmError> {
        let flags = OperandFlag::SymRegRange | OperandFlag::Write;
        match self.parse_sreg_range(cur, regs_num, true, flags)? {
            Some(range) => Ok(range),
            None => Err(AsmError::Parse("Expected scalar register".into())),
        }
    }

    fn vector_dst(&mut self, cur: &mut Cursor, regs_num: u16) -> Result<RegRange, AsmError> {
        let flags = OperandFlag::SymRegRange | OperandFlag::Write;
        match self.parse_vreg_range(cur, regs_num, true, flags)? {
            Some(range) => Ok(range),
            None => Err(AsmError::Parse("Expected vector register".into())),
        }
    }

    fn scalar_src(
        &mut self,
        cur: &mut Cursor,
        insn: &GcnInsn,
        literal_seen: bool,
    ) -> Result<GcnOperand, AsmError> {
        let mut flags: OperandFlags =
            OperandFlag::SRegs | OperandFlag::SSource | OperandFlag::Read;
        if literal_seen {
            flags |= OperandFlag::OnlyInlineConsts;
        }
        let pos = cur.pos();
        let mut expr = None;
        let op = self.parse_operand(cur, insn.src_regs, flags, insn.lit, Some(&mut expr))?;
        if expr.is_some() {
            let err =
                AsmError::Dependency("Unresolved expression is illegal in this place".into());
            return Err(self.error_at(cur, pos, err));
        }
        Ok(op)
    }

    fn encode_sop1(
        &mut self,
        cur: &mut Cursor,
        insn: &GcnInsn,
        opcode: u16,
    ) -> Result<Vec<u32>, AsmError> {
        let dst = self.scalar_dst(cur, insn.dst_regs)?;
        self.expect_comma(cur)?;
        let src0 = self.scalar_src(cur, insn, false)?;
        let mut words = vec![
            0xbe80_0000
                | u32::from(dst.start) << 16
                | u32::from(opcode) << 8
                | u32::from(src0.range.start),
        ];
        if src0.needs_literal() {
            words.push(src0.literal);
        }
        Ok(words)
    }

    fn encode_sop2(
        &mut self,
        cur: &mut Cursor,
        insn: &GcnInsn,
        opcode: u16,
    ) -> Result<Vec<u32>, AsmError> {
        let dst = self.scalar_dst(cur, insn.dst_regs)?;
        self.expect_comma(cur)?;
        let src0 = self.scalar_src(cur, insn, false)?;
        self.expect_comma(cur)?;
        let src1 = self.scalar_src(cur, insn, src0.needs_literal())?;
        let mut words = vec![
            0x8000_0000
                | u32::from(opcode) << 23
                | u32::from(dst.start) << 16
                | u32::from(src1.range.start) << 8
                | u32::from(src0.range.start),
        ];
        if src0.needs_literal() {
            words.push(src0.literal);
        } else if src1.needs_literal() {
            words.push(src1.literal);
        }
        Ok(words)
    }

    fn encode_vop(
        &mut self,
        cur: &mut Cursor,
        insn_place: usize,
        insn: &GcnInsn,
        opcode: u16,
        enc_size: GcnEncSize,
    ) -> Result<Vec<u32>, AsmError> {
        let dst = self.vector_dst(cur, insn.dst_regs)?;
        self.expect_comma(cur)?;
        let src_flags: OperandFlags = OperandFlag::VRegs
            | OperandFlag::SRegs
            | OperandFlag::SSource
            | OperandFlag::Vop3Mods
            | OperandFlag::Read;
        let mut expr = None;
        let src0 = self.parse_operand(
            cur,
            insn.src_regs,
            src_flags,
            insn.lit,
            Some(&mut expr),
        )?;
        let src1 = if insn.enc == GcnEncType::Vop2 {
            self.expect_comma(cur)?;
            let mut flags = src_flags;
            if src0.needs_literal() {
                flags |= OperandFlag::OnlyInlineConsts;
            }
            Some(self.parse_operand(cur, insn.src_regs, flags, insn.lit, Some(&mut expr))?)
        } else {
            None
        };
        if expr.is_some() {
            let err =
                AsmError::Dependency("Unresolved expression is illegal in this place".into());
            return Err(self.error_at(cur, insn_place, err));
        }

        let sdwa_operands = if insn.enc == GcnEncType::Vop2 { 3 } else { 2 };
        let mut extra = VopExtraModifiers::new(sdwa_operands);
        let mods = self.parse_vop_modifiers(cur, true, sdwa_operands, Some(&mut extra))?;

        let needs_literal =
            src0.needs_literal() || src1.as_ref().is_some_and(GcnOperand::needs_literal);
        let have_op_mods = src0.vop_mods != 0
            || src1.as_ref().is_some_and(|op| op.vop_mods != 0);
        let vop3_mods = mods & (3 | VOP3_VOP3 | VOP3_CLAMP) != 0;

        if extra.need_sdwa || extra.need_dpp {
            if !self.arch.is_rx3x0() {
                let msg = "SDWA and DPP encodings are available only on GCN 1.2";
                self.diags.error(cur.lineno(), insn_place + 1, msg);
                return Err(AsmError::Semantic(msg.into()));
            }
            let srcs: Vec<&GcnOperand> = match &src1 {
                Some(s1) => vec![&src0, s1],
                None => vec![&src0],
            };
            let vop3 = mods & (3 | VOP3_VOP3) != 0;
            self.check_vop_extra_modifiers(
                cur,
                insn_place,
                needs_literal,
                &srcs,
                vop3,
                GcnVopEnc::Normal,
                &mut extra,
            )?;
            if let Some(s1) = &src1 {
                if s1.range.start < 256 {
                    let msg = "SRC1 must be a vector register with SDWA or DPP word";
                    self.diags.error(cur.lineno(), insn_place + 1, msg);
                    return Err(AsmError::Semantic(msg.into()));
                }
            }
            let words =
                self.encode_vop_extra(insn, opcode, dst, &src0, src1.as_ref(), mods, &extra);
            self.check_encoding_size(cur, insn_place, enc_size, words.len() as u32)?;
            return Ok(words);
        }

        let vsrc1_scalar = src1
            .as_ref()
            .is_some_and(|op| op.range.is_set() && op.range.start < 256);
        let vop3 = vop3_mods
            || have_op_mods
            || vsrc1_scalar
            || enc_size == GcnEncSize::Bit64;
        let words = if vop3 {
            if needs_literal {
                let msg = "Literal in VOP3 is illegal";
                self.diags.error(cur.lineno(), insn_place + 1, msg);
                return Err(AsmError::Semantic(msg.into()));
            }
            self.encode_vop3(insn, opcode, dst, &src0, src1.as_ref(), mods)
        } else {
            let mut words = vec![match insn.enc {
                GcnEncType::Vop1 => {
                    0x7e00_0000
                        | u32::from(dst.start - 256) << 17
                        | u32::from(opcode) << 9
                        | u32::from(src0.range.start)
                }
                _ => {
                    u32::from(opcode) << 25
                        | u32::from(dst.start - 256) << 17
                        | u32::from(src1.as_ref().unwrap().range.start - 256) << 9
                        | u32::from(src0.range.start)
                }
            }];
            if src0.needs_literal() {
                words.push(src0.literal);
            }
            words
        };
        self.check_encoding_size(cur, insn_place, enc_size, words.len() as u32)?;
        Ok(words)
    }

    fn encode_vop3(
        &mut self,
        insn: &GcnInsn,
        opcode: u16,
        dst: RegRange,
        src0: &GcnOperand,
        src1: Option<&GcnOperand>,
        mods: u8,
    ) -> Vec<u32> {
        let vi = self.arch.is_rx3x0();
        let vop3_op = u32::from(opcode)
            + match insn.enc {
                GcnEncType::Vop1 => {
                    if vi {
                        0x140
                    } else {
                        0x180
                    }
                }
                _ => 0x100,
            };
        let (neg0, abs0, _) = vop_mod_bits(src0);
        let (neg1, abs1, _) = src1.map(vop_mod_bits).unwrap_or((0, 0, 0));
        let clamp = u32::from(mods & VOP3_CLAMP != 0);
        let abs = abs0 | abs1 << 1;
        let word0 = if vi {
            0xd000_0000 | vop3_op << 16 | clamp << 15 | abs << 8 | u32::from(dst.start - 256)
        } else {
            0xd000_0000 | vop3_op << 17 | clamp << 11 | abs << 8 | u32::from(dst.start - 256)
        };
        let src1_field = src1.map_or(0, |op| u32::from(op.range.start));
        let omod = u32::from(mods & 3);
        let neg = neg0 | neg1 << 1;
        let word1 =
            u32::from(src0.range.start) | src1_field << 9 | omod << 27 | neg << 29;
        vec![word0, word1]
    }

    fn encode_vop_extra(
        &mut self,
        insn: &GcnInsn,
        opcode: u16,
        dst: RegRange,
        src0: &GcnOperand,
        src1: Option<&GcnOperand>,
        mods: u8,
        extra: &VopExtraModifiers,
    ) -> Vec<u32> {
        let src0_field: u32 = if extra.need_sdwa { 0xf9 } else { 0xfa };
        let word0 = match insn.enc {
            GcnEncType::Vop1 => {
                0x7e00_0000
                    | u32::from(dst.start - 256) << 17
                    | u32::from(opcode) << 9
                    | src0_field
            }
            _ => {
                u32::from(opcode) << 25
                    | u32::from(dst.start - 256) << 17
                    | u32::from(src1.unwrap().range.start - 256) << 9
                    | src0_field
            }
        };
        let (neg0, abs0, sext0) = vop_mod_bits(src0);
        let (neg1, abs1, sext1) = src1.map(vop_mod_bits).unwrap_or((0, 0, 0));
        let src0_reg = u32::from(src0.range.start - 256);
        let word1 = if extra.need_sdwa {
            src0_reg
                | u32::from(extra.dst_sel) << 8
                | u32::from(extra.dst_unused) << 11
                | u32::from(mods & VOP3_CLAMP != 0) << 13
                | u32::from(extra.src0_sel) << 16
                | sext0 << 19
                | neg0 << 20
                | abs0 << 21
                | u32::from(extra.src1_sel) << 24
                | sext1 << 27
                | neg1 << 28
                | abs1 << 29
        } else {
            src0_reg
                | u32::from(extra.dpp_ctrl) << 8
                | u32::from(mods & VOP3_BOUNDCTRL != 0) << 19
                | neg0 << 20
                | abs0 << 21
                | neg1 << 22
                | abs1 << 23
                | u32::from(extra.bank_mask) << 24
                | u32::from(extra.row_mask) << 28
        };
        vec![word0, word1]
    }
}
