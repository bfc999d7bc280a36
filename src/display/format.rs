use crate::store::OutputFormat;

/// Renders a value for display according to its output format.
/// Null values render as `N/A`.
pub fn format_value(value: Option<f64>, format: OutputFormat, currency: &str, precision: u32) -> String {
    let Some(v) = value else {
        return "N/A".to_string();
    };
    let sign = if v < 0.0 { "-" } else { "" };
    let body = grouped(v.abs(), precision);
    match format {
        OutputFormat::Currency => format!("{}{}{}", sign, currency_symbol(currency), body),
        OutputFormat::Percentage => format!("{}{:.*}%", sign, precision as usize, v.abs()),
        OutputFormat::Ratio => format!("{}{:.*}x", sign, precision as usize, v.abs()),
        OutputFormat::Number => format!("{}{}", sign, body),
    }
}

fn currency_symbol(code: &str) -> String {
    match code {
        "USD" | "CAD" | "AUD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "JPY" => "¥".to_string(),
        other => format!("{} ", other),
    }
}

/// Fixed-point formatting with comma thousands separators.
fn grouped(v: f64, precision: u32) -> String {
    let fixed = format!("{:.*}", precision as usize, v);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let digits = int_part.as_bytes();
    let mut out = String::with_capacity(fixed.len() + digits.len() / 3);
    for (i, &d) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(d as char);
    }
    if let Some(f) = frac_part {
        out.push('.');
        out.push_str(f);
    }
    out
}
