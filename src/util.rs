// Utility helpers for parsing, rounding and basic formatting.
//
// This module centralizes the "dirty" CSV/number/text handling so the rest of
// the code can assume clean, typed values.
use num_format::{Locale, ToFormattedString};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Decimal places of every published monetary figure.
pub const MONEY_DP: u32 = 2;

/// Parse a monthly amount cell into a `Decimal`.
///
/// - Trims whitespace; an empty cell counts as zero.
/// - Strips thousands separators like `","` before parsing.
/// - Accepts scientific notation (`1.5E3`) as some exports emit it.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return Some(Decimal::ZERO);
    }
    let s = s.replace(',', "");
    Decimal::from_str(&s)
        .ok()
        .or_else(|| Decimal::from_scientific(&s).ok())
}

/// Round a summed amount to cents, half-to-even.
pub fn round_money(d: Decimal) -> Decimal {
    d.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointNearestEven)
}

/// `num / den`, or zero when the denominator is not positive.
pub fn ratio(num: Decimal, den: Decimal) -> Decimal {
    if den <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    num.checked_div(den).unwrap_or(Decimal::ZERO)
}

/// Decode raw file bytes as UTF-8, falling back to Latin-1 byte-for-byte
/// mapping so accented characters from legacy exports survive.
pub fn decode_text(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Normalize an identifier cell (unit or program code) to trimmed text.
pub fn normalize_code(s: &str) -> String {
    s.trim().to_string()
}

/// Normalize a line-item code. Spreadsheet round-trips turn `21101` into
/// `21101.0`; a purely zero fraction is dropped.
pub fn normalize_partida(s: &str) -> String {
    let s = s.trim();
    if let Some((int_part, frac)) = s.split_once('.') {
        if !int_part.is_empty()
            && int_part.chars().all(|c| c.is_ascii_digit())
            && frac.chars().all(|c| c == '0')
        {
            return int_part.to_string();
        }
    }
    s.to_string()
}

pub fn format_number(n: Decimal, decimals: u32) -> String {
    // Format a decimal value with:
    // - a fixed number of decimal places, and
    // - locale-aware thousands separators (e.g., `1,234,567.89`).
    let rounded = n.round_dp_with_strategy(decimals, RoundingStrategy::MidpointNearestEven);
    let neg = rounded.is_sign_negative() && !rounded.is_zero();
    let s = format!("{:.*}", decimals as usize, rounded.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i128 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals as usize));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_currency(n: Decimal) -> String {
    let s = format_number(n, MONEY_DP);
    match s.strip_prefix('-') {
        Some(abs) => format!("-${}", abs),
        None => format!("${}", s),
    }
}

/// Render a 0..1 ratio as a percentage with two decimals.
pub fn format_pct(r: Decimal) -> String {
    format!("{}%", format_number(r * Decimal::ONE_HUNDRED, 2))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Thin wrapper around `num-format` for counts in console messages
    // (e.g., `9,855 records`).
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_money_is_half_to_even() {
        assert_eq!(round_money(dec!(10.125)), dec!(10.12));
        assert_eq!(round_money(dec!(10.135)), dec!(10.14));
        assert_eq!(round_money(dec!(0.005)), dec!(0.00));
        assert_eq!(round_money(dec!(0.015)), dec!(0.02));
        assert_eq!(round_money(dec!(-2.345)), dec!(-2.34));
        assert_eq!(round_money(dec!(7.126)), dec!(7.13));
    }

    #[test]
    fn round_money_applies_after_summation() {
        // Each part rounds down alone, the sum sits exactly on a half cent.
        let parts = [dec!(3.3725), dec!(3.3725), dec!(3.3800)];
        let sum: Decimal = parts.iter().sum();
        assert_eq!(sum, dec!(10.125));
        assert_eq!(round_money(sum), dec!(10.12));
    }

    #[test]
    fn ratio_guards_non_positive_denominators() {
        assert_eq!(ratio(dec!(300), dec!(500)), dec!(0.6));
        assert_eq!(ratio(dec!(300), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(ratio(dec!(300), dec!(-1)), Decimal::ZERO);
    }

    #[test]
    fn parse_amount_is_forgiving_but_strict_on_garbage() {
        assert_eq!(parse_amount(""), Some(Decimal::ZERO));
        assert_eq!(parse_amount("  "), Some(Decimal::ZERO));
        assert_eq!(parse_amount("1,234.50"), Some(dec!(1234.50)));
        assert_eq!(parse_amount(" -12.5 "), Some(dec!(-12.5)));
        assert_eq!(parse_amount("1.5E3"), Some(dec!(1500)));
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount("12abc"), None);
    }

    #[test]
    fn decode_text_falls_back_to_latin1() {
        let bytes = vec![b'S', b'a', 0xE9, b'd'];
        assert_eq!(decode_text(bytes), "Saéd");
        assert_eq!(decode_text("Año".as_bytes().to_vec()), "Año");
        assert_eq!(decode_text("\u{feff}UNIDAD".as_bytes().to_vec()), "UNIDAD");
    }

    #[test]
    fn partida_codes_drop_zero_fractions() {
        assert_eq!(normalize_partida(" 21101 "), "21101");
        assert_eq!(normalize_partida("21101.0"), "21101");
        assert_eq!(normalize_partida("21101.5"), "21101.5");
        assert_eq!(normalize_partida(""), "");
    }

    #[test]
    fn format_number_inserts_separators() {
        assert_eq!(format_number(dec!(1234567.891), 2), "1,234,567.89");
        assert_eq!(format_number(dec!(-1500), 2), "-1,500.00");
        assert_eq!(format_number(dec!(0), 0), "0");
        assert_eq!(format_currency(dec!(-12.5)), "-$12.50");
        assert_eq!(format_pct(dec!(0.6)), "60.00%");
    }
}
