// src/scan/formula.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::table::Table;

/// A cell spreadsheet software would evaluate: an optional leading quote, then one of
/// `+ - = * /`.
static FORMULA_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^("|')?[+\-=*/].*"#).expect("formula pattern compiles"));

pub fn is_formula(value: &str) -> bool {
    FORMULA_PATTERN.is_match(value)
}

/// Canonical strings of every formula-looking cell, column by column and top to bottom
/// within each column. Repeated values are kept once per cell.
pub fn detect_in_table(table: &Table) -> Vec<String> {
    let mut flagged = Vec::new();
    for column in table.columns() {
        for cell in &column.cells {
            let value = cell.to_string();
            if is_formula(&value) {
                trace!(column = %column.name, value = %value, "formula pattern");
                flagged.push(value);
            }
        }
    }
    debug!(flagged = flagged.len(), "formula scan finished");
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn trigger_characters() {
        for v in ["=1+1", "+A1", "-5", "*x", "/y", "=", "\"=cmd", "'-2"] {
            assert!(is_formula(v), "{}", v);
        }
        for v in ["hello", " =1", "@SUM(A1)", "'@SUM", "''=1", "", "nan", "1-2"] {
            assert!(!is_formula(v), "{}", v);
        }
    }

    #[test]
    fn multiline_values_still_match() {
        assert!(is_formula("=HYPERLINK(\"x\")\nsecond line"));
    }

    #[test]
    fn column_major_order() -> Result<()> {
        let table = Table::parse("A,B\nok,=b1\n=a2,ok\n", ',')?;
        assert_eq!(detect_in_table(&table), vec!["=a2", "=b1"]);
        Ok(())
    }

    #[test]
    fn duplicates_are_not_collapsed() -> Result<()> {
        let table = Table::parse("A,B\n=x,=x\n=x,y\n", ',')?;
        assert_eq!(detect_in_table(&table), vec!["=x", "=x", "=x"]);
        Ok(())
    }

    #[test]
    fn negative_numbers_are_flagged() -> Result<()> {
        let table = Table::parse("a,b\n-5,text\n", ',')?;
        assert_eq!(detect_in_table(&table), vec!["-5"]);
        Ok(())
    }

    #[test]
    fn widened_floats_match_on_their_rendering() -> Result<()> {
        let table = Table::parse("n,m\n-3,a\n,b\n", ',')?;
        assert_eq!(detect_in_table(&table), vec!["-3.0"]);
        Ok(())
    }
}
