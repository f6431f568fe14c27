// src/table/cell.rs

use std::fmt;

/// Field contents read as a missing value rather than text.
pub const MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A parsed cell. Every variant has a canonical string form (its `Display`), and all pattern
/// and keyword matching is done on that form, never on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Field text when writing the cell back out as CSV. Missing cells become empty fields.
    pub fn to_field(&self) -> String {
        match self {
            CellValue::Missing => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Missing => f.write_str("nan"),
            CellValue::Bool(true) => f.write_str("True"),
            CellValue::Bool(false) => f.write_str("False"),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => f.write_str(&format_float(*v)),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Shortest round-trip rendering of a float that always carries a fractional part or an
/// exponent: `-5.0`, `0.25`, `1e+16`, `1.5e-05`.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e16).contains(&abs) {
        let sci = format!("{:e}", v);
        if let Some((mantissa, exp)) = sci.split_once('e') {
            if let Ok(exp) = exp.parse::<i32>() {
                let sign = if exp < 0 { '-' } else { '+' };
                return format!("{}e{}{:02}", mantissa, sign, exp.abs());
            }
        }
        return sci;
    }

    let plain = v.to_string();
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

pub fn is_missing_token(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "True" | "TRUE" | "true" => Some(true),
        "False" | "FALSE" | "false" => Some(false),
        _ => None,
    }
}

fn parse_float(raw: &str) -> Option<f64> {
    // NaN spellings are either missing tokens or text, never numbers
    let unsigned = raw.strip_prefix(&['+', '-'][..]).unwrap_or(raw);
    if unsigned.eq_ignore_ascii_case("nan") {
        return None;
    }
    raw.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

fn column_kind(raw: &[String]) -> ColumnKind {
    let present: Vec<&str> = raw
        .iter()
        .map(String::as_str)
        .filter(|s| !is_missing_token(s))
        .collect();
    let has_missing = present.len() < raw.len();

    if present.is_empty() {
        return ColumnKind::Float;
    }
    if !has_missing && present.iter().all(|s| s.parse::<i64>().is_ok()) {
        return ColumnKind::Int;
    }
    if present.iter().all(|s| parse_float(s).is_some()) {
        return ColumnKind::Float;
    }
    if present.iter().all(|s| parse_bool(s).is_some()) {
        return ColumnKind::Bool;
    }
    ColumnKind::Text
}

/// Infer a single type for a column of raw fields and convert every field to it.
///
/// A column is `Int` only when it has no missing cells; integers alongside missing cells widen
/// to `Float`, so `1` reads back as `1.0` there.
pub fn infer_column(raw: &[String]) -> Vec<CellValue> {
    let kind = column_kind(raw);
    raw.iter()
        .map(|s| {
            if is_missing_token(s) {
                return CellValue::Missing;
            }
            let typed = match kind {
                ColumnKind::Int => s.parse().map(CellValue::Int).ok(),
                ColumnKind::Float => parse_float(s).map(CellValue::Float),
                ColumnKind::Bool => parse_bool(s).map(CellValue::Bool),
                ColumnKind::Text => None,
            };
            typed.unwrap_or_else(|| CellValue::Text(s.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn integer_column_keeps_sign() {
        let cells = infer_column(&strings(&["-5", "3"]));
        assert_eq!(cells, vec![CellValue::Int(-5), CellValue::Int(3)]);
        assert_eq!(cells[0].to_string(), "-5");
    }

    #[test]
    fn integers_with_gaps_widen_to_float() {
        let cells = infer_column(&strings(&["1", "", "-2"]));
        assert_eq!(cells[0].to_string(), "1.0");
        assert!(cells[1].is_missing());
        assert_eq!(cells[1].to_string(), "nan");
        assert_eq!(cells[1].to_field(), "");
        assert_eq!(cells[2].to_string(), "-2.0");
    }

    #[test]
    fn mixed_column_is_text() {
        let cells = infer_column(&strings(&["=1+1", "4", "NULL"]));
        assert_eq!(cells[0], CellValue::Text("=1+1".into()));
        assert_eq!(cells[1], CellValue::Text("4".into()));
        assert_eq!(cells[2], CellValue::Missing);
    }

    #[test]
    fn bool_column_uses_title_case() {
        let cells = infer_column(&strings(&["true", "FALSE"]));
        assert_eq!(cells[0].to_string(), "True");
        assert_eq!(cells[1].to_string(), "False");
    }

    #[test]
    fn negative_nan_spelling_is_missing() {
        let cells = infer_column(&strings(&["-nan", "x"]));
        assert!(cells[0].is_missing());
    }

    #[test]
    fn float_rendering() {
        assert_eq!(format_float(-5.0), "-5.0");
        assert_eq!(format_float(0.25), "0.25");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(1.5e-5), "1.5e-05");
        assert_eq!(format_float(1e16), "1e+16");
        assert_eq!(format_float(f64::NEG_INFINITY), "-inf");
    }
}
