const SUFFIXES: [(f64, &str); 4] = [
    (1e12, "T"),
    (1e9, "B"),
    (1e6, "M"),
    (1e3, "K"),
];

/// Compact axis label: `950`, `1.5K`, `2M`, `12.3B`
pub fn format_compact(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let magnitude = value.abs();
    for (threshold, suffix) in SUFFIXES {
        if magnitude >= threshold {
            return format!("{}{}", trim_decimal(value / threshold), suffix);
        }
    }
    trim_decimal(value)
}

/// One decimal place, dropping a trailing `.0`
fn trim_decimal(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}

/// Integer count with thousands separators, e.g. `12,345`
pub fn format_count(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Share of a total as a percentage label, e.g. `42.5%`
pub fn format_percent(part: f64, total: f64) -> String {
    if total <= 0.0 {
        return "0%".to_string();
    }
    format!("{}%", trim_decimal(part / total * 100.0))
}
