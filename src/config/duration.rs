// src/config/duration.rs

use std::time::Duration;

/// Parse a duration string.
///
/// Accepted forms:
/// - short: `"250ms"`, `"3s"`, `"1m"`, `"2h"`
/// - clock: `"hh:mm:ss"` or `"d.hh:mm:ss"` (e.g. `"00:05:00"`, `"1.00:00:00"`)
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    if s.contains(':') {
        return parse_clock(s);
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => Some(value),
        "m" => value.checked_mul(60),
        "h" => value.checked_mul(3_600),
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };
    secs.map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}

fn parse_clock(s: &str) -> Result<Duration, String> {
    let (days, clock) = match s.split_once('.') {
        Some((d, rest)) if rest.contains(':') && !d.contains(':') => {
            let days: u64 = d
                .parse()
                .map_err(|e| format!("invalid day count '{}': {}", d, e))?;
            (days, rest)
        }
        _ => (0, s),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("invalid clock duration '{s}'; expected hh:mm:ss"));
    }

    let mut fields = [0u64; 3];
    for (slot, part) in fields.iter_mut().zip(parts.iter()) {
        *slot = part
            .trim()
            .parse()
            .map_err(|e| format!("invalid clock field '{}' in '{}': {}", part, s, e))?;
    }

    let [hours, minutes, seconds] = fields;
    if minutes >= 60 || seconds >= 60 {
        return Err(format!("invalid clock duration '{s}'; minutes/seconds must be < 60"));
    }

    days.checked_mul(86_400)
        .and_then(|d| hours.checked_mul(3_600).and_then(|h| d.checked_add(h)))
        .and_then(|total| total.checked_add(minutes * 60 + seconds))
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' is too large"))
}
