//! Human-readable durations.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeLength {
    /// Largest unit only: `2d`.
    Short,
    /// Two largest units: `2d 5h`.
    #[default]
    Medium,
    /// Two largest units spelled out: `2 days 5 hours`.
    Full,
}

const UNITS: [(u64, &str, &str); 4] = [
    (86_400, "d", "day"),
    (3_600, "h", "hour"),
    (60, "m", "minute"),
    (1, "s", "second"),
];

pub fn seconds_to_string(seconds: u64, length: TimeLength) -> String {
    let max_parts = match length {
        TimeLength::Short => 1,
        TimeLength::Medium | TimeLength::Full => 2,
    };

    let mut remaining = seconds;
    let mut parts = Vec::with_capacity(max_parts);
    for (size, short, long) in UNITS {
        let count = remaining / size;
        remaining %= size;
        if count == 0 {
            continue;
        }
        parts.push(format_unit(count, short, long, length));
        if parts.len() == max_parts {
            break;
        }
    }

    if parts.is_empty() {
        return format_unit(0, "s", "second", length);
    }
    parts.join(" ")
}

fn format_unit(count: u64, short: &str, long: &str, length: TimeLength) -> String {
    match length {
        TimeLength::Full if count == 1 => format!("{count} {long}"),
        TimeLength::Full => format!("{count} {long}s"),
        _ => format!("{count}{short}"),
    }
}
