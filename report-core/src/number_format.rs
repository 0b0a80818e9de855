//! FILENAME: report-core/src/number_format.rs
//! PURPOSE: Number formatting shared by both rendering backends.
//! CONTEXT: The grid backend writes real numbers and attaches a format code;
//! the flow backend and the detail panel need the same figures as text. Both go
//! through this module so "1234.5" renders as "£1,234.50" everywhere.

use crate::value::Value;

/// Spreadsheet format code for whole numbers with thousands separators.
pub const NUMBER_FORMAT_CODE: &str = "#,##0";

/// How a column or summary value is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueFormat {
    Currency,
    Number,
    #[default]
    Plain,
}

impl ValueFormat {
    /// Parses the template spelling. Unknown names fall back to plain text.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "currency" | "money" => ValueFormat::Currency,
            "number" | "integer" => ValueFormat::Number,
            _ => ValueFormat::Plain,
        }
    }
}

/// Spreadsheet format code for a currency column, e.g. `£#,##0.00`.
pub fn currency_format_code(symbol: &str) -> String {
    if symbol.is_empty() {
        return "#,##0.00".to_string();
    }
    // Quote the symbol unless the format language accepts it bare.
    if symbol.chars().all(|c| matches!(c, '$' | '£' | '€' | '¥')) {
        format!("{}#,##0.00", symbol)
    } else {
        format!("\"{}\"#,##0.00", symbol.replace('"', ""))
    }
}

/// Rounds half away from zero to the given number of decimal places.
pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    let factor = 10f64.powi(decimal_places as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Fixed decimals with optional thousands separators.
pub fn format_decimal(value: f64, decimal_places: u32, use_thousands_separator: bool) -> String {
    let rounded = format!(
        "{:.prec$}",
        round_to(value, decimal_places),
        prec = decimal_places as usize
    );
    if use_thousands_separator {
        add_thousands_separator(&rounded)
    } else {
        rounded
    }
}

/// Inserts `,` every three integer digits.
fn add_thousands_separator(s: &str) -> String {
    let (integer_part, decimal_part) = match s.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (s, None),
    };

    let negative = integer_part.starts_with('-');
    let digits: String = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut result = String::with_capacity(s.len() + digits.len() / 3 + 1);
    if negative {
        result.push('-');
    }
    let len = digits.len();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    if let Some(decimal) = decimal_part {
        result.push('.');
        result.push_str(decimal);
    }
    result
}

/// Two decimals, separators, symbol in front. Negative amounts get a leading minus.
pub fn format_currency(value: f64, symbol: &str) -> String {
    let rounded = round_to(value, 2);
    let body = format_decimal(rounded.abs(), 2, true);
    if rounded < 0.0 {
        format!("-{}{}", symbol, body)
    } else {
        format!("{}{}", symbol, body)
    }
}

/// Whole number with separators.
pub fn format_integer(value: f64) -> String {
    format_decimal(value, 0, true)
}

/// Renders a value as text under the given format.
/// Currency and number coerce non-numeric input to 0; plain passes text through.
pub fn format_value(value: &Value, format: ValueFormat, currency_symbol: &str) -> String {
    match format {
        ValueFormat::Currency => format_currency(value.to_number_lossy(), currency_symbol),
        ValueFormat::Number => format_integer(value.to_number_lossy()),
        ValueFormat::Plain => value.display_string(),
    }
}
