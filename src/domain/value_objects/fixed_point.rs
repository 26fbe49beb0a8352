//! Decimal text <-> scaled integer conversion shared by [`Money`](super::Money) and
//! [`Quantity`](super::Quantity).

use serde::de::{self, Visitor};
use std::fmt;

pub(crate) fn pow10(scale: u32) -> i64 {
    10_i64.pow(scale)
}

/// Parses a non-negative decimal string into units of `10^-scale`.
pub(crate) fn parse_fixed(input: &str, scale: u32) -> Result<i64, String> {
    let trimmed = input.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if unsigned.starts_with('-') {
        return Err(format!("negative value not allowed: {input}"));
    }
    if unsigned.is_empty() {
        return Err("empty decimal value".to_string());
    }

    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (unsigned, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(format!("invalid decimal value: {input}"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(format!("invalid decimal value: {input}"));
    }

    let scale_len = scale as usize;
    let (kept, dropped) = if fraction.len() > scale_len {
        fraction.split_at(scale_len)
    } else {
        (fraction, "")
    };
    if dropped.chars().any(|c| c != '0') {
        return Err(format!("too many decimal places (max {scale}): {input}"));
    }

    let whole_value: i64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| format!("decimal value out of range: {input}"))?
    };
    let mut fraction_value: i64 = if kept.is_empty() {
        0
    } else {
        kept.parse()
            .map_err(|_| format!("invalid decimal value: {input}"))?
    };
    for _ in kept.len()..scale_len {
        fraction_value *= 10;
    }

    whole_value
        .checked_mul(pow10(scale))
        .and_then(|v| v.checked_add(fraction_value))
        .ok_or_else(|| format!("decimal value out of range: {input}"))
}

pub(crate) fn format_fixed(value: i64, scale: u32) -> String {
    let factor = pow10(scale);
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    let whole = abs / factor as u64;
    let fraction = abs % factor as u64;
    if scale == 0 {
        format!("{sign}{whole}")
    } else {
        format!(
            "{sign}{whole}.{fraction:0width$}",
            width = scale as usize
        )
    }
}

pub(crate) fn from_f64(value: f64, scale: u32) -> Result<i64, String> {
    if !value.is_finite() {
        return Err(format!("non-finite decimal value: {value}"));
    }
    if value < 0.0 {
        return Err(format!("negative value not allowed: {value}"));
    }
    let scaled = (value * pow10(scale) as f64).round();
    if scaled > i64::MAX as f64 {
        return Err(format!("decimal value out of range: {value}"));
    }
    Ok(scaled as i64)
}

/// Accepts JSON strings and numbers; the backend returns `numeric` columns either way.
pub(crate) struct FixedPointVisitor {
    pub scale: u32,
    pub expecting: &'static str,
}

impl<'de> Visitor<'de> for FixedPointVisitor {
    type Value = i64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str(self.expecting)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<i64, E> {
        parse_fixed(value, self.scale).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
        i64::try_from(value)
            .ok()
            .and_then(|v| v.checked_mul(pow10(self.scale)))
            .ok_or_else(|| E::custom(format!("decimal value out of range: {value}")))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
        if value < 0 {
            return Err(E::custom(format!("negative value not allowed: {value}")));
        }
        value
            .checked_mul(pow10(self.scale))
            .ok_or_else(|| E::custom(format!("decimal value out of range: {value}")))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<i64, E> {
        from_f64(value, self.scale).map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_pads_fraction() {
        assert_eq!(parse_fixed("500", 2), Ok(50_000));
        assert_eq!(parse_fixed("12.5", 2), Ok(1_250));
        assert_eq!(parse_fixed("0.125", 3), Ok(125));
        assert_eq!(parse_fixed(".5", 2), Ok(50));
        assert_eq!(parse_fixed("3.10000", 2), Ok(310));
    }

    #[test]
    fn rejects_negative_and_excess_precision() {
        assert!(parse_fixed("-1", 2).is_err());
        assert!(parse_fixed("1.005", 2).is_err());
        assert!(parse_fixed("1e3", 2).is_err());
        assert!(parse_fixed("", 2).is_err());
        assert!(parse_fixed(".", 2).is_err());
    }

    #[test]
    fn formats_with_fixed_width_fraction() {
        assert_eq!(format_fixed(50_000, 2), "500.00");
        assert_eq!(format_fixed(5, 2), "0.05");
        assert_eq!(format_fixed(-2_500, 3), "-2.500");
    }

    #[test]
    fn float_input_is_rounded_to_scale() {
        assert_eq!(from_f64(0.1 + 0.2, 2), Ok(30));
        assert!(from_f64(-0.01, 2).is_err());
        assert!(from_f64(f64::NAN, 2).is_err());
    }
}
