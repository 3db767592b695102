//! Resource limits for a single agent invocation.

use std::time::Duration;

/// Optional bounds on one agent turn. Absence means unbounded.
///
/// `iterations` caps the invoker's internal turns and is enforced by the
/// [`AgentInvoker`](crate::workflow::invoker::AgentInvoker), not by the
/// executor. It is unrelated to validation retries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum wall-clock runtime for one invocation.
    pub runtime: Option<Duration>,
    /// Maximum iteration count, >= 1 when present.
    pub iterations: Option<u32>,
}

impl ResourceLimits {
    pub fn is_unbounded(&self) -> bool {
        self.runtime.is_none() && self.iterations.is_none()
    }
}

/// Parse a duration string of the form `"90s"`, `"25m"`, `"1h"`, or a
/// compound like `"1h30m"`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    let mut components = 0;

    for ch in s.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        if digits.is_empty() {
            return Err(format!("unexpected `{ch}` in duration `{input}`"));
        }
        let n: u64 = digits
            .parse()
            .map_err(|_| format!("number out of range in duration `{input}`"))?;
        let unit: u64 = match ch {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            _ => {
                return Err(format!(
                    "unknown unit `{ch}` in duration `{input}` (expected s, m, or h)"
                ))
            }
        };
        total = n
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| format!("duration `{input}` overflows"))?;
        digits.clear();
        components += 1;
    }

    if !digits.is_empty() {
        return Err(format!("missing unit in duration `{input}`"));
    }
    debug_assert!(components > 0);

    Ok(Duration::from_secs(total))
}
