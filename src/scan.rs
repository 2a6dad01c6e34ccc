//! Lenient number scanning for modem text.
//!
//! Modem firmware pads, truncates and mixes radixes freely, so these helpers
//! read the longest numeric prefix and hand back whatever follows.

/// Read a signed integer prefix in `radix`, skipping leading whitespace.
///
/// For radix 16 an optional `0x`/`0X` prefix is accepted. Returns `None` if no
/// digit was found.
pub(crate) fn leading_int(s: &str, radix: u32) -> Option<(i64, &str)> {
    let s = s.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let s = if radix == 16 {
        s.strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .filter(|rest| rest.starts_with(|c: char| c.is_ascii_hexdigit()))
            .unwrap_or(s)
    } else {
        s
    };

    let digits = s
        .char_indices()
        .find(|(_, c)| !c.is_digit(radix))
        .map_or(s.len(), |(i, _)| i);
    if digits == 0 {
        return None;
    }

    let mut value: i64 = 0;
    for c in s[..digits].chars() {
        // Saturate rather than wrap on absurdly long digit runs.
        value = value
            .saturating_mul(radix as i64)
            .saturating_add(c.to_digit(radix).unwrap_or(0) as i64);
    }
    if negative {
        value = -value;
    }
    Some((value, &s[digits..]))
}

/// Decimal prefix, `0` when there is none.
pub(crate) fn dec_or_zero(s: &str) -> i32 {
    leading_int(s, 10).map_or(0, |(v, _)| clamp_i32(v))
}

/// Hexadecimal prefix, `0` when there is none.
pub(crate) fn hex_or_zero(s: &str) -> i64 {
    leading_int(s, 16).map_or(0, |(v, _)| v)
}

/// A whole comma-separated field that must be a decimal integer.
///
/// Trailing whitespace is tolerated; anything else after the digits is not.
pub(crate) fn int_field(field: &str) -> Option<i32> {
    let (value, rest) = leading_int(field, 10)?;
    rest.trim().is_empty().then_some(clamp_i32(value))
}

/// A whole field of the form `"<hex>"`.
pub(crate) fn quoted_hex_field(field: &str) -> Option<u32> {
    let inner = field.trim().strip_prefix('"')?.strip_suffix('"')?;
    if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(inner, 16).ok()
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
