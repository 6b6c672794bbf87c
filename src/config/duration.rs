// src/config/duration.rs

use std::time::Duration;

/// Parse a duration such as `"10s"`, `"250ms"` or `"1m30s"`.
///
/// Each component is a whole number followed by `ms`, `s`, `m` or `h`;
/// components are summed.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let mut total = Duration::ZERO;
    let mut rest = s;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("expected a number at '{rest}'"));
        }
        let (num, tail) = rest.split_at(digits);
        let unit_len = tail.find(|c: char| c.is_ascii_digit()).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(format!("missing unit after '{num}'"));
        }

        let value: u64 = num
            .parse()
            .map_err(|e| format!("invalid duration number '{num}': {e}"))?;
        total = total
            .checked_add(component(value, unit)?)
            .ok_or_else(|| format!("duration '{s}' is too large"))?;
        rest = tail;
    }

    Ok(total)
}

fn component(value: u64, unit: &str) -> Result<Duration, String> {
    let secs = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration component '{value}{unit}' is too large"))
    };
    match unit.to_ascii_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => secs(1),
        "m" => secs(60),
        "h" => secs(60 * 60),
        other => Err(format!(
            "unsupported duration unit '{other}'; expected ms, s, m or h"
        )),
    }
}
