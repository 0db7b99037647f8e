//! Display formatting for quality metric values.

const HOURS_IN_DAY: i64 = 8;
const TECHNICAL_DEBT_METRIC: &str = "sqale_index";

/// Formats a raw metric value for display:
/// technical debt (minutes) becomes a `1d 2h 3min` compact string,
/// decimal values become percentages, plain integers get thousands
/// separators, anything else passes through unchanged.
pub fn format_metric(name: &str, value: &str) -> String {
    if name == TECHNICAL_DEBT_METRIC {
        return format_technical_debt(value);
    }
    // a leading dot does not count as a decimal value
    if value.find('.').is_some_and(|i| i > 0) {
        return format!("{value}%");
    }
    if let Ok(number) = value.parse::<u64>() {
        if value.chars().all(|c| c.is_ascii_digit()) {
            return group_thousands(number);
        }
    }
    value.to_string()
}

/// Renders technical debt minutes against an 8-hour working day.
/// Hours are shown below 10 days, minutes only below one day; the sign
/// goes on the first emitted unit.
fn format_technical_debt(raw: &str) -> String {
    let Ok(minutes) = raw.parse::<i64>() else {
        return raw.to_string();
    };
    if minutes == 0 {
        return "0".to_string();
    }

    let negative = minutes < 0;
    let total = minutes.abs();
    let days = total / (HOURS_IN_DAY * 60);
    let mut remaining = total - days * HOURS_IN_DAY * 60;
    let hours = remaining / 60;
    remaining -= hours * 60;
    let minutes = remaining;

    let mut message = String::new();
    if days > 0 {
        message.push_str(&format!("{}d", if negative { -days } else { days }));
    }
    if hours > 0 && days < 10 {
        let first = message.is_empty();
        if !first {
            message.push(' ');
        }
        message.push_str(&format!("{}h", if negative && first { -hours } else { hours }));
    }
    if minutes > 0 && hours < 10 && days == 0 {
        let first = message.is_empty();
        if !first {
            message.push(' ');
        }
        message.push_str(&format!("{}min", if negative && first { -minutes } else { minutes }));
    }
    message
}

fn group_thousands(number: u64) -> String {
    let digits = number.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
