//! Serde codec for durations stored as seconds in documents and held as
//! integer milliseconds in memory.
//!
//! Use with `#[serde(with = "crate::formats::seconds")]`. Fractional
//! seconds are converted on their decimal text, rounding half up to the
//! nearest millisecond.

use serde::{Deserialize, Deserializer, Serializer};

/// Write whole seconds as an integer, anything else as a decimal.
pub fn serialize<S>(millis: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let (whole, rest) = (millis / 1000, millis % 1000);
    if rest == 0 {
        return serializer.serialize_u64(whole);
    }
    let seconds: f64 = format!("{}.{:03}", whole, rest)
        .parse()
        .map_err(<S::Error as serde::ser::Error>::custom)?;
    serializer.serialize_f64(seconds)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(seconds) = number.as_u64() {
        return seconds.checked_mul(1000).ok_or_else(|| {
            serde::de::Error::custom(format!("duration of {} seconds is too large", seconds))
        });
    }
    decimal_to_millis(&number.to_string()).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "duration must be a non-negative number of seconds, got {}",
            number
        ))
    })
}

/// Parse `digits[.digits][e[+-]exp]` seconds into milliseconds.
///
/// `None` for negative, malformed or overflowing input.
fn decimal_to_millis(text: &str) -> Option<u64> {
    let (mantissa, exponent) = match text.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i32>().ok()?),
        None => (text, 0),
    };
    let (whole, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{}{}", whole, frac);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // value = digits * 10^shift milliseconds
    let shift = exponent
        .checked_sub(i32::try_from(frac.len()).ok()?)?
        .checked_add(3)?;
    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Some(0);
    }

    if shift >= 0 {
        let scale = 10u64.checked_pow(u32::try_from(shift).ok()?)?;
        return digits.parse::<u64>().ok()?.checked_mul(scale);
    }

    let cut = usize::try_from(shift.unsigned_abs()).ok()?;
    if cut > digits.len() {
        return Some(0);
    }
    let (kept, dropped) = digits.split_at(digits.len() - cut);
    let kept = if kept.is_empty() {
        0
    } else {
        kept.parse::<u64>().ok()?
    };
    let round_up = dropped.bytes().next().is_some_and(|b| b >= b'5');
    kept.checked_add(u64::from(round_up))
}
