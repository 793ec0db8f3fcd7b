use gcnasm::{
    AsmError, AsmSession, Cursor, GcnArch, GcnOperand, LitKind, OperandFlag, OperandFlags,
    RegRange,
};

fn session(arch: GcnArch) -> AsmSession {
    AsmSession::new(arch, true)
}

fn src_flags() -> OperandFlags {
    OperandFlag::SRegs | OperandFlag::VRegs | OperandFlag::SSource
}

fn operand(
    s: &mut AsmSession,
    text: &str,
    regs_num: u16,
    flags: OperandFlags,
    lit: LitKind,
) -> Result<GcnOperand, AsmError> {
    let mut cur = Cursor::new(text, 1);
    s.parse_operand(&mut cur, regs_num, flags, lit, None)
}

#[test]
fn inline_constant_folding_full_range() {
    let mut s = session(GcnArch::Gcn10);
    for v in 0..=64u16 {
        let op = operand(&mut s, &v.to_string(), 1, src_flags(), LitKind::Int).unwrap();
        assert_eq!(op.range, RegRange::new(128 + v, 0));
    }
    for v in 1..=16u16 {
        let op = operand(&mut s, &format!("-{v}"), 1, src_flags(), LitKind::Int).unwrap();
        assert_eq!(op.range, RegRange::new(192 + v, 0));
    }
}

#[test]
fn float_constants_by_default_precision() {
    // (text, f32 code) from the hardware inline-constant set
    let table = [
        ("0.5", 240),
        ("-0.5", 241),
        ("1.0", 242),
        ("-1.0", 243),
        ("2.0", 244),
        ("-2.0", 245),
        ("4.0", 246),
        ("-4.0", 247),
    ];
    let mut s = session(GcnArch::Gcn10);
    for (text, code) in table {
        let op = operand(&mut s, text, 1, src_flags(), LitKind::F32).unwrap();
        assert_eq!(op.range, RegRange::new(code, 0), "{text}");
        let op = operand(&mut s, text, 1, src_flags(), LitKind::F16).unwrap();
        assert_eq!(op.range, RegRange::new(code, 0), "{text} as f16");
        let op = operand(&mut s, text, 1, src_flags(), LitKind::F64).unwrap();
        assert_eq!(op.range, RegRange::new(code, 0), "{text} as f64");
    }
}

#[test]
fn lit_wrapper_and_literals() {
    let mut s = session(GcnArch::Gcn10);
    let op = operand(&mut s, "lit(0.5)", 1, src_flags(), LitKind::F32).unwrap();
    assert_eq!(op.range, RegRange::new(255, 0));
    assert_eq!(op.literal, 0x3f000000);
    let op = operand(&mut s, "lit(-1)", 1, src_flags(), LitKind::Int).unwrap();
    assert_eq!(op.range, RegRange::new(255, 0));
    assert_eq!(op.literal, u32::MAX);
    // non-foldable values become trailing literals
    let op = operand(&mut s, "0.25", 1, src_flags(), LitKind::F32).unwrap();
    assert_eq!(op.range, RegRange::new(255, 0));
    assert_eq!(op.literal, 0x3e800000);
    // f16 precision literal in the low 16 bits
    let op = operand(&mut s, "0.25", 1, src_flags(), LitKind::F16).unwrap();
    assert_eq!(op.literal, 0x3400);
    // 64-bit literals carry the high dword of the double
    let op = operand(&mut s, "0.25", 1, src_flags(), LitKind::F64).unwrap();
    assert_eq!(op.literal, 0x3fd00000);
}

#[test]
fn register_name_mapping() {
    let mut s = session(GcnArch::Gcn10);
    let table = [
        ("vcc", RegRange::new(106, 108)),
        ("vcc_lo", RegRange::new(106, 107)),
        ("vcc_hi", RegRange::new(107, 108)),
        ("exec", RegRange::new(126, 128)),
        ("exec_hi", RegRange::new(127, 128)),
        ("tba", RegRange::new(108, 110)),
        ("tma", RegRange::new(110, 112)),
        ("m0", RegRange::new(124, 125)),
        ("vccz", RegRange::new(251, 252)),
        ("execz", RegRange::new(252, 253)),
        ("scc", RegRange::new(253, 254)),
    ];
    for (text, range) in table {
        let op = operand(&mut s, text, 0, src_flags(), LitKind::Int).unwrap();
        assert_eq!(op.range, range, "{text}");
    }
    let mut cur = Cursor::new("ttmp[0:3]", 1);
    let range = s
        .parse_sreg_range(&mut cur, 0, true, OperandFlags::default())
        .unwrap();
    assert_eq!(range, Some(RegRange::new(112, 116)));
}

#[test]
fn alignment_enforcement() {
    let mut s = session(GcnArch::Gcn10);
    let mut cur = Cursor::new("s[2:3]", 1);
    assert!(s
        .parse_sreg_range(&mut cur, 0, true, OperandFlags::default())
        .is_ok());
    let mut cur = Cursor::new("s[1:2]", 1);
    let err = s
        .parse_sreg_range(&mut cur, 0, true, OperandFlags::default())
        .unwrap_err();
    assert_eq!(
        err,
        AsmError::Range("Unaligned scalar register range".into())
    );
    let mut cur = Cursor::new("s[1:2]", 1);
    assert!(s
        .parse_sreg_range(&mut cur, 0, true, OperandFlag::Unaligned.into())
        .is_ok());
}

#[test]
fn vector_register_count_checking() {
    let mut s = session(GcnArch::Gcn10);
    let mut cur = Cursor::new("v[2:5]", 1);
    let range = s
        .parse_vreg_range(&mut cur, 4, true, OperandFlags::default())
        .unwrap();
    assert_eq!(range, Some(RegRange::new(258, 262)));
    let mut cur = Cursor::new("v[2:5]", 1);
    assert!(s
        .parse_vreg_range(&mut cur, 2, true, OperandFlags::default())
        .is_err());
}

#[test]
fn modifier_cross_encoding_rejection() {
    let mut s = session(GcnArch::Gcn12);
    let mut cur = Cursor::new("mul:2 dst_sel:b0", 1);
    let mut extra = gcnasm::VopExtraModifiers::new(3);
    let err = s
        .parse_vop_modifiers(&mut cur, true, 3, Some(&mut extra))
        .unwrap_err();
    assert_eq!(
        err,
        AsmError::Semantic("Mixing modifiers from different encodings is illegal".into())
    );
}

#[test]
fn dpp_control_encodings() {
    let cases = [
        ("quad_perm:[0,1,2,3]", 0xe4),
        ("row_shl:3", 0x103),
        ("row_ror:5", 0x125),
        ("wave_ror:1", 0x13c),
        ("row_bcast:15", 0x142),
        ("row_bcast:31", 0x143),
        ("row_mirror", 0x140),
        ("row_half_mirror", 0x141),
    ];
    for (text, ctrl) in cases {
        let mut s = session(GcnArch::Gcn12);
        let mut cur = Cursor::new(text, 1);
        let mut extra = gcnasm::VopExtraModifiers::new(3);
        s.parse_vop_modifiers(&mut cur, true, 3, Some(&mut extra))
            .unwrap();
        assert_eq!(extra.dpp_ctrl, ctrl, "{text}");
        assert!(extra.need_dpp);
    }
}

#[test]
fn unresolved_expression_handling() {
    let mut s = session(GcnArch::Gcn10);
    let mut cur = Cursor::new("undefined_sym+4", 1);
    let mut expr = None;
    let op = s
        .parse_operand(&mut cur, 1, src_flags(), LitKind::Int, Some(&mut expr))
        .unwrap();
    assert_eq!(op.range, RegRange::new(255, 0));
    let expr = expr.unwrap();
    assert_eq!(expr.text, "undefined_sym+4");

    // without an expression sink the operand fails
    let mut cur = Cursor::new("undefined_sym+4", 1);
    assert!(s
        .parse_operand(&mut cur, 1, src_flags(), LitKind::Int, None)
        .is_err());
}

#[test]
fn session_defsyms_resolve_in_operands() {
    let mut s = session(GcnArch::Gcn10);
    s.add_defsym("limit", 63);
    let op = operand(&mut s, "limit", 1, src_flags(), LitKind::Int).unwrap();
    assert_eq!(op.range, RegRange::new(191, 0));
    let op = operand(&mut s, "limit+2", 1, src_flags(), LitKind::Int).unwrap();
    assert_eq!(op.range, RegRange::new(255, 0));
    assert_eq!(op.literal, 65);
}
