//! Human readable rendering of sample values

use crate::catalog::Unit;

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Render a raw sample value for display
///
/// Values arrive from the backend as strings. Anything that does not parse as
/// a float is returned untouched.
#[must_use]
pub fn format_value(value: &str, unit: Unit) -> String {
    match value.trim().parse::<f64>() {
        Ok(num) => format_number(num, unit),
        Err(_) => value.to_string(),
    }
}

/// Render a numeric value according to `unit`
#[must_use]
pub fn format_number(num: f64, unit: Unit) -> String {
    if num.is_nan() {
        // NaN compares false against every bucket, so it lands in the
        // smallest one and is spelled in lowercase.
        let suffix = match unit {
            Unit::Bytes => " B",
            Unit::Ratio => "%",
            Unit::Ops => "/s",
            Unit::Seconds => "s",
            Unit::Items | Unit::Count => "",
        };
        return format!("nan{suffix}");
    }
    match unit {
        Unit::Bytes => {
            if num >= GIB {
                format!("{:.2} GB", num / GIB)
            } else if num >= MIB {
                format!("{:.2} MB", num / MIB)
            } else if num >= KIB {
                format!("{:.2} KB", num / KIB)
            } else {
                format!("{num:.0} B")
            }
        }
        Unit::Ratio => format!("{:.2}%", num * 100.0),
        Unit::Ops => format!("{num:.2}/s"),
        Unit::Seconds => {
            if num >= 3600.0 {
                format!("{:.2}h", num / 3600.0)
            } else if num >= 60.0 {
                format!("{:.2}m", num / 60.0)
            } else {
                format!("{num:.2}s")
            }
        }
        Unit::Items | Unit::Count => format!("{num:.4}"),
    }
}
