//! Per-compilation assembler state shared by all parsers.
//!
//! An [`AsmSession`] owns the diagnostics log, the defined-symbol table, the
//! register variables of the current section, and the architecture switches
//! that gate parsing. Parser entry points live in the `regs`, `operand`,
//! `modifiers` and `encoder` modules as `impl AsmSession` blocks.

use std::collections::HashMap;

use crate::cursor::Cursor;
use crate::error::Diagnostics;
use crate::regs::{RegRange, RegVar, RegVarUsage};
use crate::AsmError;
use crate::GcnArch;

/// Section id of an absolute (section-less) expression value.
pub const SECTION_ABS: u32 = u32::MAX;

/// An expression whose symbols are not yet defined. The operand it occurred
/// in is encoded as a trailing literal placeholder; the handle is returned to
/// the caller for a later resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedExpr {
    /// Source text of the expression.
    pub text: String,
    /// 1-based line it was read from.
    pub line: usize,
}

/// Result of the narrow expression-evaluator contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprValue {
    /// Evaluated now.
    Resolved {
        /// The 64-bit value.
        value: u64,
        /// Owning section, [`SECTION_ABS`] for absolute values.
        section: u32,
    },
    /// References symbols that are not defined yet.
    Unresolved(UnresolvedExpr),
}

/// Signedness used when warning about out-of-range immediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmSign {
    /// Value must fit the unsigned range.
    Unsigned,
    /// Value must fit the signed range.
    Signed,
    /// Either interpretation is accepted.
    Both,
}

/// State of a single assembly.
#[derive(Debug)]
pub struct AsmSession {
    /// Architecture generation being assembled for.
    pub arch: GcnArch,
    /// Restores the pre-0.1.2 floating-literal behavior for binary
    /// equivalence with older drivers.
    pub buggy_fp_lit: bool,
    /// Accumulated warnings and errors, in source order.
    pub diags: Diagnostics,
    /// Output position of the instruction being assembled, recorded into
    /// register-variable usage entries.
    pub out_pos: usize,
    reg_vars: HashMap<String, RegVar>,
    reg_symbols: HashMap<String, RegRange>,
    defsyms: HashMap<String, u64>,
    usages: Vec<RegVarUsage>,
}

impl AsmSession {
    /// Creates a session for one device assembly.
    pub fn new(arch: GcnArch, warnings_enabled: bool) -> Self {
        AsmSession {
            arch,
            buggy_fp_lit: false,
            diags: Diagnostics::new(warnings_enabled),
            out_pos: 0,
            reg_vars: HashMap::new(),
            reg_symbols: HashMap::new(),
            defsyms: HashMap::new(),
            usages: Vec::new(),
        }
    }

    /// Defines a symbol with an absolute value (`-D` option or `=` line).
    pub fn add_defsym(&mut self, name: impl Into<String>, value: u64) {
        self.defsyms.insert(name.into(), value);
    }

    /// Looks up a defined symbol.
    pub fn defsym(&self, name: &str) -> Option<u64> {
        self.defsyms.get(name).copied()
    }

    /// Declares a named register variable in the current section.
    pub fn add_reg_var(&mut self, name: impl Into<String>, var: RegVar) {
        self.reg_vars.insert(name.into(), var);
    }

    pub(crate) fn reg_var(&self, name: &str) -> Option<&RegVar> {
        self.reg_vars.get(name)
    }

    /// Binds a symbol to a concrete register range.
    pub fn add_reg_symbol(&mut self, name: impl Into<String>, range: RegRange) {
        self.reg_symbols.insert(name.into(), range);
    }

    pub(crate) fn reg_symbol(&self, name: &str) -> Option<RegRange> {
        self.reg_symbols.get(name).copied()
    }

    pub(crate) fn add_usage(&mut self, usage: RegVarUsage) {
        self.usages.push(usage);
    }

    /// Register-variable usage records collected for the allocation pass.
    pub fn usages(&self) -> &[RegVarUsage] {
        &self.usages
    }

    /// Records an error at the cursor position and returns it for `?`.
    pub(crate) fn error_at(&mut self, cur: &Cursor, pos: usize, err: AsmError) -> AsmError {
        self.diags.error(cur.lineno(), pos + 1, err.to_string());
        err
    }

    /// Warns when `value` does not fit in `bits` under the requested
    /// signedness.
    pub(crate) fn warn_for_range(
        &mut self,
        cur: &Cursor,
        pos: usize,
        bits: u32,
        value: u64,
        sign: ImmSign,
    ) {
        if bits >= 64 {
            return;
        }
        let fits_unsigned = value >> bits == 0;
        let signed = value as i64;
        let fits_signed =
            signed >= -(1i64 << (bits - 1)) && signed < (1i64 << (bits - 1));
        let fits = match sign {
            ImmSign::Unsigned => fits_unsigned,
            ImmSign::Signed => fits_signed,
            ImmSign::Both => fits_unsigned || fits_signed,
        };
        if !fits {
            self.diags.warning(
                cur.lineno(),
                pos + 1,
                format!("Value {value} out of {bits}-bit range"),
            );
        }
    }

    /* expression evaluation: the narrow `evaluate` contract. The built-in
     * evaluator resolves numeric literals and defined symbols with +,-,*,/
     * and parentheses; anything richer is an external collaborator. */

    /// Evaluates an expression at the cursor.
    pub fn evaluate_expr(&mut self, cur: &mut Cursor) -> Result<ExprValue, AsmError> {
        cur.skip_spaces();
        let start = cur.pos();
        let mut unknown = false;
        let value = self.eval_sum(cur, &mut unknown)?;
        if unknown {
            Ok(ExprValue::Unresolved(UnresolvedExpr {
                text: cur.span(start).to_string(),
                line: cur.lineno(),
            }))
        } else {
            Ok(ExprValue::Resolved {
                value: value.unwrap_or(0),
                section: SECTION_ABS,
            })
        }
    }

    fn eval_sum(&mut self, cur: &mut Cursor, unknown: &mut bool) -> Result<Option<u64>, AsmError> {
        let mut acc = self.eval_product(cur, unknown)?;
        loop {
            cur.skip_spaces();
            let op = match cur.peek() {
                Some(b @ (b'+' | b'-')) => b,
                _ => return Ok(acc),
            };
            cur.skip_char_and_spaces();
            let rhs = self.eval_product(cur, unknown)?;
            acc = match (acc, rhs) {
                (Some(a), Some(b)) => Some(if op == b'+' {
                    a.wrapping_add(b)
                } else {
                    a.wrapping_sub(b)
                }),
                _ => None,
            };
        }
    }

    fn eval_product(
        &mut self,
        cur: &mut Cursor,
        unknown: &mut bool,
    ) -> Result<Option<u64>, AsmError> {
        let mut acc = self.eval_factor(cur, unknown)?;
        loop {
            cur.skip_spaces();
            let op = match cur.peek() {
                Some(b @ (b'*' | b'/')) => b,
                _ => return Ok(acc),
            };
            cur.skip_char_and_spaces();
            let rhs = self.eval_factor(cur, unknown)?;
            acc = match (acc, rhs) {
                (Some(a), Some(b)) => {
                    if op == b'*' {
                        Some(a.wrapping_mul(b))
                    } else if b == 0 {
                        return Err(AsmError::Semantic("Division by zero".into()));
                    } else {
                        Some(a / b)
                    }
                }
                _ => None,
            };
        }
    }

    fn eval_factor(
        &mut self,
        cur: &mut Cursor,
        unknown: &mut bool,
    ) -> Result<Option<u64>, AsmError> {
        cur.skip_spaces();
        match cur.peek() {
            Some(b'-') => {
                cur.skip_char_and_spaces();
                Ok(self.eval_factor(cur, unknown)?.map(u64::wrapping_neg))
            }
            Some(b'+') => {
                cur.skip_char_and_spaces();
                self.eval_factor(cur, unknown)
            }
            Some(b'~') => {
                cur.skip_char_and_spaces();
                Ok(self.eval_factor(cur, unknown)?.map(|v| !v))
            }
            Some(b'(') => {
                cur.skip_char_and_spaces();
                let inner = self.eval_sum(cur, unknown)?;
                cur.skip_spaces();
                if !cur.eat(b')') {
                    return Err(AsmError::Parse("Unterminated expression".into()));
                }
                Ok(inner)
            }
            Some(b) if b.is_ascii_digit() => {
                Ok(Some(crate::numeric::parse_u64_cstyle(cur)?))
            }
            _ => {
                let name = cur.extract_sym_name();
                if name.is_empty() {
                    return Err(AsmError::Parse("Expected expression".into()));
                }
                match self.defsym(name) {
                    Some(v) => Ok(Some(v)),
                    None => {
                        *unknown = true;
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Evaluates an expression that must resolve to an absolute value now.
    pub(crate) fn get_absolute_value(&mut self, cur: &mut Cursor) -> Result<u64, AsmError> {
        let pos = cur.pos();
        match self.evaluate_expr(cur)? {
            ExprValue::Resolved { value, section } if section == SECTION_ABS => Ok(value),
            ExprValue::Resolved { .. } => {
                let err = AsmError::Semantic("Expression must be absolute!".into());
                Err(self.error_at(cur, pos, err))
            }
            ExprValue::Unresolved(_) => {
                let err =
                    AsmError::Dependency("Unresolved expression is illegal in this place".into());
                Err(self.error_at(cur, pos, err))
            }
        }
    }

    /// Parses an immediate of `bits` width, warning about range overflow.
    pub fn parse_imm(
        &mut self,
        cur: &mut Cursor,
        bits: u32,
        sign: ImmSign,
    ) -> Result<u64, AsmError> {
        cur.skip_spaces();
        let pos = cur.pos();
        let value = self.get_absolute_value(cur)?;
        self.warn_for_range(cur, pos, bits, value, sign);
        Ok(value & if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 })
    }
}
