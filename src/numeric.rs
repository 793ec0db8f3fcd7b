//! C-style numeric parsing and formatting.
//!
//! Integers accept decimal, octal (`0` prefix), hexadecimal (`0x`) and binary
//! (`0b`) forms with bit-width overflow checks. Floats accept decimal and hex
//! forms and convert with correct round-to-nearest-even into any IEEE-754
//! layout given as `(exp_bits, mantissa_bits)` — half is `(5, 10)`, single
//! `(8, 23)`, double `(11, 52)`, and the high dword of a double used by
//! 64-bit GCN literals is `(11, 20)`.

use phf::phf_map;

use crate::cursor::Cursor;
use crate::AsmError;

const OUT_OF_RANGE: &str = "Number out of range";
const MISSING_NUMBER: &str = "Missing number";
const FLOAT_TOO_BIG: &str = "Absolute value of number is too big";

/// Parses a C-style unsigned integer into 64 bits.
pub fn parse_u64_cstyle(cur: &mut Cursor) -> Result<u64, AsmError> {
    cur.skip_spaces();
    cur.eat(b'+');
    let (radix, mut any) = scan_radix(cur);
    let mut value: u64 = 0;
    let mut seen = false;
    while let Some(b) = cur.peek() {
        let digit = match digit_value(b, radix) {
            Some(d) => d,
            None => break,
        };
        seen = true;
        value = value
            .checked_mul(u64::from(radix))
            .and_then(|v| v.checked_add(u64::from(digit)))
            .ok_or_else(|| AsmError::Range(OUT_OF_RANGE.into()))?;
        cur.bump();
    }
    any |= seen;
    if !any {
        return Err(AsmError::Parse(MISSING_NUMBER.into()));
    }
    Ok(value)
}

/// Parses an unsigned integer and verifies it fits in `bits`.
pub fn parse_uint(cur: &mut Cursor, bits: u32) -> Result<u64, AsmError> {
    let value = parse_u64_cstyle(cur)?;
    if bits < 64 && value >> bits != 0 {
        return Err(AsmError::Range(OUT_OF_RANGE.into()));
    }
    Ok(value)
}

/// Parses a signed integer and verifies it fits in `bits`.
pub fn parse_int(cur: &mut Cursor, bits: u32) -> Result<i64, AsmError> {
    cur.skip_spaces();
    let neg = if cur.eat(b'-') {
        true
    } else {
        cur.eat(b'+');
        false
    };
    let magnitude = parse_u64_cstyle(cur)?;
    let limit = 1u64 << (bits - 1);
    if neg {
        if magnitude > limit {
            return Err(AsmError::Range(OUT_OF_RANGE.into()));
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        if magnitude >= limit {
            return Err(AsmError::Range(OUT_OF_RANGE.into()));
        }
        Ok(magnitude as i64)
    }
}

/// String-level helper used by the compiler-options and env parsing.
pub fn parse_uint_str(text: &str, bits: u32) -> Result<u64, AsmError> {
    let mut cur = Cursor::new(text, 0);
    let value = parse_uint(&mut cur, bits)?;
    cur.skip_spaces();
    if !cur.at_end() {
        return Err(AsmError::Parse("Garbage after number".into()));
    }
    Ok(value)
}

fn scan_radix(cur: &mut Cursor) -> (u32, bool) {
    if cur.peek() == Some(b'0') {
        match cur.peek_at(1) {
            Some(b'x') | Some(b'X') if cur.peek_at(2).and_then(|b| digit_value(b, 16)).is_some() => {
                cur.bump();
                cur.bump();
                (16, false)
            }
            Some(b'b') | Some(b'B') if matches!(cur.peek_at(2), Some(b'0') | Some(b'1')) => {
                cur.bump();
                cur.bump();
                (2, false)
            }
            Some(b) if b.is_ascii_digit() => {
                cur.bump();
                (8, true)
            }
            _ => (10, false),
        }
    } else {
        (10, false)
    }
}

fn digit_value(b: u8, radix: u32) -> Option<u8> {
    let d = match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => return None,
    };
    (u32::from(d) < radix).then_some(d)
}

/* floating point */

/// Parses a float into the bit pattern of the `(exp_bits, mantissa_bits)`
/// layout, correctly rounded to nearest-even.
pub fn parse_float_bits(
    cur: &mut Cursor,
    exp_bits: u32,
    mantissa_bits: u32,
) -> Result<u64, AsmError> {
    cur.skip_spaces();
    let neg = if cur.eat(b'-') {
        true
    } else {
        cur.eat(b'+');
        false
    };
    if cur.looking_at_nocase("0x") && is_hex_float_start(cur) {
        cur.bump();
        cur.bump();
        parse_hex_float(cur, neg, exp_bits, mantissa_bits)
    } else {
        parse_decimal_float(cur, neg, exp_bits, mantissa_bits)
    }
}

/// Half-precision bit pattern.
pub fn parse_f16(cur: &mut Cursor) -> Result<u16, AsmError> {
    parse_float_bits(cur, 5, 10).map(|v| v as u16)
}

/// Single-precision bit pattern.
pub fn parse_f32(cur: &mut Cursor) -> Result<u32, AsmError> {
    parse_float_bits(cur, 8, 23).map(|v| v as u32)
}

/// Double-precision bit pattern.
pub fn parse_f64(cur: &mut Cursor) -> Result<u64, AsmError> {
    parse_float_bits(cur, 11, 52)
}

/// The high 32 bits of a double rounded to 20 mantissa bits, the form a
/// 64-bit GCN float literal is encoded in.
pub fn parse_f64_high(cur: &mut Cursor) -> Result<u32, AsmError> {
    parse_float_bits(cur, 11, 20).map(|v| v as u32)
}

fn is_hex_float_start(cur: &Cursor) -> bool {
    matches!(cur.peek_at(2), Some(b) if b.is_ascii_hexdigit() || b == b'.')
}

fn zero_bits(neg: bool, exp_bits: u32, mantissa_bits: u32) -> u64 {
    (neg as u64) << (exp_bits + mantissa_bits)
}

fn parse_decimal_float(
    cur: &mut Cursor,
    neg: bool,
    exp_bits: u32,
    mantissa_bits: u32,
) -> Result<u64, AsmError> {
    const CAP: usize = 800;
    let mut digits: Vec<u8> = Vec::new();
    let mut dec_exp: i64 = 0;
    let mut sticky = false;
    let mut seen = false;

    while let Some(b) = cur.peek() {
        if !b.is_ascii_digit() {
            break;
        }
        seen = true;
        let d = b - b'0';
        if digits.is_empty() && d == 0 {
            // leading zero of the integer part
        } else if digits.len() < CAP {
            digits.push(d);
        } else {
            dec_exp += 1;
            sticky |= d != 0;
        }
        cur.bump();
    }
    if cur.peek() == Some(b'.') {
        cur.bump();
        while let Some(b) = cur.peek() {
            if !b.is_ascii_digit() {
                break;
            }
            seen = true;
            let d = b - b'0';
            if digits.is_empty() && d == 0 {
                dec_exp -= 1;
            } else if digits.len() < CAP {
                digits.push(d);
                dec_exp -= 1;
            } else {
                sticky |= d != 0;
            }
            cur.bump();
        }
    }
    if !seen {
        return Err(AsmError::Parse(MISSING_NUMBER.into()));
    }
    dec_exp += scan_exponent(cur, b'e')?;

    if digits.is_empty() {
        return Ok(zero_bits(neg, exp_bits, mantissa_bits));
    }
    if dec_exp > 5000 {
        return Err(AsmError::Range(FLOAT_TOO_BIG.into()));
    }
    if dec_exp < -5200 {
        return Ok(zero_bits(neg, exp_bits, mantissa_bits));
    }

    let d = BigUint::from_decimal_digits(&digits);
    let (sig, exp2, below) = if dec_exp >= 0 {
        let n = d.mul_big(&BigUint::pow10(dec_exp as u32));
        let nbits = n.bit_length();
        let take = nbits.min(115);
        let (top, rest) = n.top_bits(take);
        (top, (nbits - take) as i64, rest)
    } else {
        let den = BigUint::pow10((-dec_exp) as u32);
        let needed = mantissa_bits as i64 + 3;
        let shift = den.bit_length() as i64 - d.bit_length() as i64 + needed;
        let (num2, den2) = if shift >= 0 {
            (d.shl(shift as u32), den)
        } else {
            (d, den.shl((-shift) as u32))
        };
        let (q, rem) = div_big(&num2, &den2);
        (q, -shift, rem)
    };
    round_to_format(neg, sig, exp2, sticky | below, exp_bits, mantissa_bits)
}

fn parse_hex_float(
    cur: &mut Cursor,
    neg: bool,
    exp_bits: u32,
    mantissa_bits: u32,
) -> Result<u64, AsmError> {
    const CAP: usize = 28; // hex digits kept exactly (112 bits)
    let mut sig: u128 = 0;
    let mut kept = 0usize;
    let mut hex_exp: i64 = 0;
    let mut sticky = false;
    let mut seen = false;

    while let Some(b) = cur.peek() {
        let d = match digit_value(b, 16) {
            Some(d) => d,
            None => break,
        };
        seen = true;
        if sig == 0 && d == 0 {
            // leading zero
        } else if kept < CAP {
            sig = sig << 4 | u128::from(d);
            kept += 1;
        } else {
            hex_exp += 1;
            sticky |= d != 0;
        }
        cur.bump();
    }
    if cur.peek() == Some(b'.') {
        cur.bump();
        while let Some(b) = cur.peek() {
            let d = match digit_value(b, 16) {
                Some(d) => d,
                None => break,
            };
            seen = true;
            if sig == 0 && d == 0 {
                hex_exp -= 1;
            } else if kept < CAP {
                sig = sig << 4 | u128::from(d);
                kept += 1;
                hex_exp -= 1;
            } else {
                sticky |= d != 0;
            }
            cur.bump();
        }
    }
    if !seen {
        return Err(AsmError::Parse(MISSING_NUMBER.into()));
    }
    let p_exp = scan_exponent(cur, b'p')?;
    if sig == 0 {
        return Ok(zero_bits(neg, exp_bits, mantissa_bits));
    }
    let exp2 = hex_exp
        .checked_mul(4)
        .and_then(|v| v.checked_add(p_exp))
        .ok_or_else(|| AsmError::Range(FLOAT_TOO_BIG.into()))?;
    round_to_format(neg, sig, exp2, sticky, exp_bits, mantissa_bits)
}

/// Consumes `[eE|pP][+-]?digits` when present. The marker is only taken when
/// digits follow, so `1e` leaves the `e` for the caller.
fn scan_exponent(cur: &mut Cursor, marker: u8) -> Result<i64, AsmError> {
    match cur.peek() {
        Some(b) if b.eq_ignore_ascii_case(&marker) => {}
        _ => return Ok(0),
    }
    let mut probe = 1usize;
    let sign_neg = match cur.peek_at(1) {
        Some(b'-') => {
            probe = 2;
            true
        }
        Some(b'+') => {
            probe = 2;
            false
        }
        _ => false,
    };
    if !matches!(cur.peek_at(probe), Some(b) if b.is_ascii_digit()) {
        return Ok(0);
    }
    for _ in 0..probe {
        cur.bump();
    }
    let mut value: i64 = 0;
    while let Some(b) = cur.peek() {
        if !b.is_ascii_digit() {
            break;
        }
        value = (value * 10 + i64::from(b - b'0')).min(1_000_000);
        cur.bump();
    }
    Ok(if sign_neg { -value } else { value })
}

/// Rounds `sig * 2^exp2` (with `sticky` marking dropped low bits) into the
/// target IEEE-754 layout with round-to-nearest-even.
fn round_to_format(
    neg: bool,
    sig: u128,
    exp2: i64,
    sticky: bool,
    exp_bits: u32,
    mantissa_bits: u32,
) -> Result<u64, AsmError> {
    debug_assert!(sig != 0);
    let sign = zero_bits(neg, exp_bits, mantissa_bits);
    let bias = (1i64 << (exp_bits - 1)) - 1;
    let emin = 1 - bias;
    let sb = (128 - sig.leading_zeros()) as i64;
    let e = sb - 1 + exp2; // unbiased exponent of the top bit

    let keep_bits = if e >= emin {
        mantissa_bits as i64 + 1
    } else {
        mantissa_bits as i64 + 1 - (emin - e)
    };
    if keep_bits < 0 {
        return Ok(sign);
    }
    let drop = sb - keep_bits;
    let (mut q, guard, sticky): (u64, bool, bool) = if drop <= 0 {
        ((sig << (-drop) as u32) as u64, false, sticky)
    } else if drop >= 128 {
        (0, false, sticky || sig != 0)
    } else {
        let d = drop as u32;
        let below = d >= 2 && sig & ((1u128 << (d - 1)) - 1) != 0;
        (
            (sig >> d) as u64,
            sig >> (d - 1) & 1 == 1,
            sticky || below,
        )
    };
    if guard && (sticky || q & 1 == 1) {
        q += 1;
    }
    if q == 0 {
        return Ok(sign);
    }
    let mut e = e;
    if e >= emin {
        if q >> (mantissa_bits + 1) != 0 {
            q >>= 1;
            e += 1;
        }
        if e > bias {
            return Err(AsmError::Range(FLOAT_TOO_BIG.into()));
        }
        let exp_field = (e + bias) as u64;
        Ok(sign | exp_field << mantissa_bits | (q & ((1 << mantissa_bits) - 1)))
    } else if q >> mantissa_bits != 0 {
        // rounding carried into the smallest normal
        Ok(sign | 1u64 << mantissa_bits | (q & ((1 << mantissa_bits) - 1)))
    } else {
        Ok(sign | q)
    }
}

/* minimal big unsigned integer, little-endian u32 limbs */

struct BigUint {
    limbs: Vec<u32>,
}

impl BigUint {
    fn zero() -> Self {
        BigUint { limbs: Vec::new() }
    }

    fn is_zero(&self) -> bool {
        self.limbs.iter().all(|&l| l == 0)
    }

    fn from_decimal_digits(digits: &[u8]) -> Self {
        let mut n = BigUint::zero();
        for &d in digits {
            n.mul_small(10);
            n.add_small(u32::from(d));
        }
        n
    }

    fn pow10(exp: u32) -> Self {
        let mut n = BigUint { limbs: vec![1] };
        for _ in 0..exp {
            n.mul_small(10);
        }
        n
    }

    fn mul_small(&mut self, m: u32) {
        let mut carry: u64 = 0;
        for limb in &mut self.limbs {
            let v = u64::from(*limb) * u64::from(m) + carry;
            *limb = v as u32;
            carry = v >> 32;
        }
        if carry != 0 {
            self.limbs.push(carry as u32);
        }
    }

    fn add_small(&mut self, a: u32) {
        let mut carry = u64::from(a);
        for limb in &mut self.limbs {
            if carry == 0 {
                return;
            }
            let v = u64::from(*limb) + carry;
            *limb = v as u32;
            carry = v >> 32;
        }
        if carry != 0 {
            self.limbs.push(carry as u32);
        }
    }

    fn mul_big(&self, other: &BigUint) -> BigUint {
        let mut out = vec![0u32; self.limbs.len() + other.limbs.len()];
        for (i, &a) in self.limbs.iter().enumerate() {
            if a == 0 {
                continue;
            }
            let mut carry: u64 = 0;
            for (j, &b) in other.limbs.iter().enumerate() {
                let v = u64::from(a) * u64::from(b) + u64::from(out[i + j]) + carry;
                out[i + j] = v as u32;
                carry = v >> 32;
            }
            let mut k = i + other.limbs.len();
            while carry != 0 {
                let v = u64::from(out[k]) + carry;
                out[k] = v as u32;
                carry = v >> 32;
                k += 1;
            }
        }
        BigUint { limbs: out }
    }

    fn shl(&self, bits: u32) -> BigUint {
        let words = (bits / 32) as usize;
        let rem = bits % 32;
        let mut out = vec![0u32; words];
        if rem == 0 {
            out.extend_from_slice(&self.limbs);
        } else {
            let mut carry: u32 = 0;
            for &limb in &self.limbs {
                out.push(limb << rem | carry);
                carry = (u64::from(limb) >> (32 - rem)) as u32;
            }
            if carry != 0 {
                out.push(carry);
            }
        }
        BigUint { limbs: out }
    }

    fn bit_length(&self) -> usize {
        for (i, &limb) in self.limbs.iter().enumerate().rev() {
            if limb != 0 {
                return i * 32 + (32 - limb.leading_zeros()) as usize;
            }
        }
        0
    }

    fn bit(&self, index: usize) -> bool {
        let limb = index / 32;
        self.limbs
            .get(limb)
            .is_some_and(|&l| l >> (index % 32) & 1 == 1)
    }

    /// Top `take` bits as an integer plus a flag for any nonzero bit below.
    fn top_bits(&self, take: usize) -> (u128, bool) {
        let nbits = self.bit_length();
        let shift = nbits - take;
        let mut top: u128 = 0;
        for i in (shift..nbits).rev() {
            top = top << 1 | u128::from(self.bit(i));
        }
        let rest = (0..shift).any(|i| self.bit(i));
        (top, rest)
    }

    fn cmp_big(&self, other: &BigUint) -> std::cmp::Ordering {
        let la = self.bit_length();
        let lb = other.bit_length();
        if la != lb {
            return la.cmp(&lb);
        }
        for i in (0..self.limbs.len().max(other.limbs.len())).rev() {
            let a = self.limbs.get(i).copied().unwrap_or(0);
            let b = other.limbs.get(i).copied().unwrap_or(0);
            if a != b {
                return a.cmp(&b);
            }
        }
        std::cmp::Ordering::Equal
    }

    fn sub_assign_big(&mut self, other: &BigUint) {
        let mut borrow: i64 = 0;
        for i in 0..self.limbs.len() {
            let b = other.limbs.get(i).copied().unwrap_or(0);
            let v = i64::from(self.limbs[i]) - i64::from(b) - borrow;
            if v < 0 {
                self.limbs[i] = (v + (1i64 << 32)) as u32;
                borrow = 1;
            } else {
                self.limbs[i] = v as u32;
                borrow = 0;
            }
        }
    }

    fn shl1_add_bit(&mut self, bit: bool) {
        let mut carry = u32::from(bit);
        for limb in &mut self.limbs {
            let v = u64::from(*limb) << 1 | u64::from(carry);
            *limb = v as u32;
            carry = (v >> 32) as u32;
        }
        if carry != 0 {
            self.limbs.push(carry);
        }
    }
}

/// Binary long division; the caller guarantees the quotient fits in 128 bits.
fn div_big(num: &BigUint, den: &BigUint) -> (u128, bool) {
    let nbits = num.bit_length();
    let mut q: u128 = 0;
    let mut rem = BigUint::zero();
    for i in (0..nbits).rev() {
        rem.shl1_add_bit(num.bit(i));
        q <<= 1;
        if rem.cmp_big(den) != std::cmp::Ordering::Less {
            rem.sub_assign_big(den);
            q |= 1;
        }
    }
    (q, !rem.is_zero())
}

/* formatting */

/// Formats an unsigned integer in C-style syntax: radix 2/8/10/16, optional
/// zero-padding to `width` digits, optional radix prefix.
pub fn u64_to_cstyle(value: u64, radix: u32, width: usize, prefix: bool) -> String {
    debug_assert!(matches!(radix, 2 | 8 | 10 | 16));
    let mut digits = Vec::new();
    let mut v = value;
    loop {
        let d = (v % u64::from(radix)) as u8;
        digits.push(if d < 10 { b'0' + d } else { b'a' + d - 10 });
        v /= u64::from(radix);
        if v == 0 {
            break;
        }
    }
    while digits.len() < width {
        digits.push(b'0');
    }
    let mut out = String::new();
    if prefix {
        match radix {
            16 => out.push_str("0x"),
            2 => out.push_str("0b"),
            8 if value != 0 => out.push('0'),
            _ => {}
        }
    }
    out.extend(digits.iter().rev().map(|&b| b as char));
    out
}

/// Formats a signed integer in C-style syntax.
pub fn i64_to_cstyle(value: i64, radix: u32, width: usize, prefix: bool) -> String {
    if value < 0 {
        format!("-{}", u64_to_cstyle(value.unsigned_abs(), radix, width, prefix))
    } else {
        u64_to_cstyle(value as u64, radix, width, prefix)
    }
}

/// Formats a double either human-readable or in scientific notation.
pub fn f64_to_cstyle(value: f64, scientific: bool) -> String {
    if scientific {
        format!("{value:e}")
    } else {
        format!("{value}")
    }
}

/* environment variables */

static BOOL_WORDS: phf::Map<&'static str, bool> = phf_map! {
    "1" => true, "true" => true, "t" => true, "on" => true, "yes" => true,
    "y" => true,
    "0" => false, "false" => false, "f" => false, "off" => false,
    "no" => false, "n" => false,
};

/// A type parsable from an environment variable.
pub trait EnvValue: Sized {
    /// Parses the trimmed variable text; `None` falls back to the default.
    fn parse_env(text: &str) -> Option<Self>;
}

impl EnvValue for bool {
    fn parse_env(text: &str) -> Option<Self> {
        BOOL_WORDS.get(text.to_ascii_lowercase().as_str()).copied()
    }
}

macro_rules! env_uint {
    ($($t:ty),*) => {$(
        impl EnvValue for $t {
            fn parse_env(text: &str) -> Option<Self> {
                let mut cur = Cursor::new(text, 0);
                parse_uint(&mut cur, <$t>::BITS).ok().map(|v| v as $t)
            }
        }
    )*};
}

macro_rules! env_int {
    ($($t:ty),*) => {$(
        impl EnvValue for $t {
            fn parse_env(text: &str) -> Option<Self> {
                let mut cur = Cursor::new(text, 0);
                parse_int(&mut cur, <$t>::BITS).ok().map(|v| v as $t)
            }
        }
    )*};
}

env_uint!(u8, u16, u32, u64);
env_int!(i8, i16, i32, i64);

impl EnvValue for f64 {
    fn parse_env(text: &str) -> Option<Self> {
        let mut cur = Cursor::new(text, 0);
        parse_f64(&mut cur).ok().map(f64::from_bits)
    }
}

impl EnvValue for String {
    fn parse_env(text: &str) -> Option<Self> {
        Some(text.to_string())
    }
}

/// Reads and parses an environment variable, falling back to `default` when
/// the variable is absent, empty, or malformed.
pub fn parse_env_variable<T: EnvValue>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => {
            let text = raw.trim();
            if text.is_empty() {
                default
            } else {
                T::parse_env(text).unwrap_or(default)
            }
        }
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uint(text: &str, bits: u32) -> Result<u64, AsmError> {
        parse_uint(&mut Cursor::new(text, 1), bits)
    }

    fn f32_bits(text: &str) -> u32 {
        parse_f32(&mut Cursor::new(text, 1)).unwrap()
    }

    fn f16_bits(text: &str) -> u16 {
        parse_f16(&mut Cursor::new(text, 1)).unwrap()
    }

    fn f64_bits(text: &str) -> u64 {
        parse_f64(&mut Cursor::new(text, 1)).unwrap()
    }

    #[test]
    fn integer_radixes() {
        assert_eq!(uint("0", 32).unwrap(), 0);
        assert_eq!(uint("1234", 32).unwrap(), 1234);
        assert_eq!(uint("0x1234", 32).unwrap(), 0x1234);
        assert_eq!(uint("0XaBcD", 32).unwrap(), 0xabcd);
        assert_eq!(uint("0b1011", 32).unwrap(), 11);
        assert_eq!(uint("017", 32).unwrap(), 15);
        assert_eq!(uint("0xffffffff", 32).unwrap(), 0xffff_ffff);
    }

    #[test]
    fn integer_overflow() {
        assert_eq!(
            uint("256", 8),
            Err(AsmError::Range("Number out of range".into()))
        );
        assert_eq!(uint("255", 8).unwrap(), 255);
        assert!(uint("0x10000000000000000", 64).is_err());
        let mut cur = Cursor::new("-129", 1);
        assert!(parse_int(&mut cur, 8).is_err());
        let mut cur = Cursor::new("-128", 1);
        assert_eq!(parse_int(&mut cur, 8).unwrap(), -128);
    }

    #[test]
    fn integer_roundtrip() {
        for &v in &[0u64, 1, 9, 255, 1024, 0xdead_beef, u64::MAX] {
            for &radix in &[2u32, 8, 10, 16] {
                let text = u64_to_cstyle(v, radix, 0, true);
                assert_eq!(uint(&text, 64).unwrap(), v, "{text}");
            }
        }
        assert_eq!(u64_to_cstyle(0xff, 16, 4, true), "0x00ff");
        assert_eq!(i64_to_cstyle(-10, 10, 0, true), "-10");
    }

    #[test]
    fn ieee754_fidelity() {
        assert_eq!(f32_bits("1.0"), 0x3f800000);
        assert_eq!(f32_bits("0.5"), 0x3f000000);
        assert_eq!(f32_bits("2.0"), 0x40000000);
        assert_eq!(f32_bits("4.0"), 0x40800000);
        assert_eq!(f32_bits("-1.0"), 0xbf800000);
        assert_eq!(f32_bits("-2.0"), 0xc0000000);
        assert_eq!(f32_bits("-4.0"), 0xc0800000);
        assert_eq!(f32_bits("-0.5"), 0xbf000000);
        assert_eq!(f64_bits("1.0"), 0x3ff0000000000000);
        assert_eq!(f64_bits("0.5"), 0x3fe0000000000000);
        assert_eq!(f16_bits("1.0"), 0x3c00);
        assert_eq!(f16_bits("0.5"), 0x3800);
        assert_eq!(f16_bits("-4.0"), 0xc400);
    }

    #[test]
    fn round_to_nearest_even() {
        assert_eq!(f32_bits("0.1"), 0x3dcccccd);
        // 2^24 + 1 is a tie between 2^24 and 2^24 + 2; even mantissa wins
        assert_eq!(f32_bits("16777217"), 0x4b800000);
        assert_eq!(f32_bits("16777219"), 0x4b800002);
        assert_eq!(f64_bits("0.1"), 0x3fb999999999999a);
    }

    #[test]
    fn half_edges() {
        assert_eq!(f16_bits("65504"), 0x7bff);
        assert!(parse_f16(&mut Cursor::new("65520", 1)).is_err());
        // smallest subnormal half: 2^-24
        assert_eq!(f16_bits("5.9604644775390625e-8"), 0x0001);
        assert_eq!(f16_bits("0.0"), 0x0000);
        assert_eq!(f16_bits("-0.0"), 0x8000);
    }

    #[test]
    fn hex_floats() {
        assert_eq!(f32_bits("0x1p0"), 0x3f800000);
        assert_eq!(f32_bits("0x1.8p1"), 0x40400000); // 3.0
        assert_eq!(f32_bits("0x.8p0"), 0x3f000000); // 0.5
        assert_eq!(f64_bits("0x10p-4"), 0x3ff0000000000000);
        assert_eq!(f16_bits("0x1p-24"), 0x0001);
    }

    #[test]
    fn double_high_dword() {
        let mut cur = Cursor::new("1.0", 1);
        assert_eq!(parse_f64_high(&mut cur).unwrap(), 0x3ff00000);
        let mut cur = Cursor::new("0.5", 1);
        assert_eq!(parse_f64_high(&mut cur).unwrap(), 0x3fe00000);
    }

    #[test]
    fn float_formatting() {
        assert_eq!(f64_to_cstyle(1.5, false), "1.5");
        assert_eq!(f64_to_cstyle(1.5, true), "1.5e0");
    }

    #[test]
    fn env_values() {
        assert_eq!(bool::parse_env("YES"), Some(true));
        assert_eq!(bool::parse_env("off"), Some(false));
        assert_eq!(bool::parse_env("2"), None);
        assert_eq!(u32::parse_env("0x10"), Some(16));
        assert_eq!(i32::parse_env("-5"), Some(-5));
    }
}
