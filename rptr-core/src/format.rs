//! Numeric display formatting for table cells and marker annotations.
//!
//! `format_significant` keeps magnitudes >= 1 readable as integers or fixed
//! decimals and shows small magnitudes with significant digits. Values above
//! one million are additionally compacted (`1.2M`). Malformed inputs render
//! as a dash.

use crate::domain::Numeric;

pub const PLACEHOLDER: &str = "-";

/// Magnitudes strictly above this are compacted.
pub const COMPACT_ABOVE: f64 = 1_000_000.0;

const COMPACT_SIG_DIGITS: usize = 6;

/// Extra digits rendered to tell an exact tie from a near one.
const TIE_DIGITS: usize = 24;

/// Render `value` with `sig_digits`.
///
/// `|value| >= 1`: an integer when there is no fractional part, otherwise
/// fixed-point with `sig_digits` decimals. `|value| < 1`: `sig_digits`
/// significant digits, switching to exponent notation below `1e-6`.
/// Exact ties round away from zero (`1.125` to two decimals is `1.13`).
pub fn format_significant(value: f64, sig_digits: usize) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    if value.abs() >= 1.0 {
        if value.fract() == 0.0 {
            format!("{value}")
        } else {
            to_fixed(value, sig_digits)
        }
    } else {
        to_precision(value, sig_digits.max(1))
    }
}

fn to_precision(value: f64, sig: usize) -> String {
    if value == 0.0 {
        return if sig > 1 {
            format!("0.{}", "0".repeat(sig - 1))
        } else {
            "0".to_string()
        };
    }

    let frac_digits = sig - 1;
    let sci = format!("{value:.frac_digits$e}");
    let exponent: i32 = sci
        .rsplit('e')
        .next()
        .and_then(|e| e.parse().ok())
        .unwrap_or(0);

    if exponent < -6 {
        return sci;
    }
    let decimals = (frac_digits as i32 - exponent).max(0) as usize;
    to_fixed(value, decimals)
}

/// Fixed-point with `decimals` places, ties rounded away from zero.
fn to_fixed(value: f64, decimals: usize) -> String {
    let wide = format!("{:.*}", decimals + TIE_DIGITS, value.abs());
    let (kept, tail) = wide.split_at(wide.len() - TIE_DIGITS);
    let is_tie = tail.starts_with('5') && tail.bytes().skip(1).all(|b| b == b'0');
    if !is_tie {
        return format!("{value:.decimals$}");
    }
    let kept = kept.strip_suffix('.').unwrap_or(kept);
    let rounded = increment_last_digit(kept);
    if value < 0.0 {
        format!("-{rounded}")
    } else {
        rounded
    }
}

/// `"1.12"` -> `"1.13"`, `"9.99"` -> `"10.00"`.
fn increment_last_digit(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    let mut carry = true;
    for b in bytes.iter_mut().rev() {
        match *b {
            b'.' => {}
            b'9' => *b = b'0',
            d => {
                *b = d + 1;
                carry = false;
                break;
            }
        }
    }
    let out = String::from_utf8_lossy(&bytes).into_owned();
    if carry {
        format!("1{out}")
    } else {
        out
    }
}

/// Compact notation with at most six significant digits: `1.23457M`, `2B`.
pub fn compact_number(value: f64) -> String {
    if !value.is_finite() {
        return PLACEHOLDER.to_string();
    }
    const TIERS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

    let abs = value.abs();
    for (i, &(divisor, suffix)) in TIERS.iter().enumerate() {
        if abs < divisor {
            continue;
        }
        let scaled = round_significant(value / divisor, COMPACT_SIG_DIGITS);
        // 999_999_999 rounds to 1000M; promote to the next tier
        if scaled.abs() >= 1000.0 && i > 0 {
            let (up_div, up_suffix) = TIERS[i - 1];
            let promoted = round_significant(value / up_div, COMPACT_SIG_DIGITS);
            return format!("{}{}", trim_decimal(promoted), up_suffix);
        }
        return format!("{}{}", trim_decimal(scaled), suffix);
    }
    trim_decimal(round_significant(value, COMPACT_SIG_DIGITS))
}

fn round_significant(value: f64, sig: usize) -> f64 {
    if value == 0.0 {
        return 0.0;
    }
    let int_digits = value.abs().log10().floor() as i32 + 1;
    let decimals = (sig as i32 - int_digits).max(0) as usize;
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

fn trim_decimal(value: f64) -> String {
    let s = format!("{value}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

fn compact_if_large(value: f64, rendered: String) -> String {
    if value.abs() > COMPACT_ABOVE {
        compact_number(value)
    } else {
        rendered
    }
}

/// Table cell with significant-digit formatting and compaction (quantity, position).
pub fn format_quantity_cell(field: &Numeric, sig_digits: usize) -> String {
    match field.value() {
        Some(v) => compact_if_large(v, format_significant(v, sig_digits)),
        None => PLACEHOLDER.to_string(),
    }
}

/// Table cell with significant-digit formatting only (price, average price).
pub fn format_price_cell(field: &Numeric, sig_digits: usize) -> String {
    match field.value() {
        Some(v) => format_significant(v, sig_digits),
        None => PLACEHOLDER.to_string(),
    }
}

/// Table cell shown as the plain number, compacted when large (pnl, balance).
pub fn format_amount_cell(field: &Numeric) -> String {
    match field.value() {
        Some(v) => compact_if_large(v, format!("{v}")),
        None => PLACEHOLDER.to_string(),
    }
}
