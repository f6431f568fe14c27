// src/scan/mod.rs

pub mod classify;
pub mod formula;
pub mod report;
pub mod sanitize;

pub use classify::{danger_word, detect_malicious, DANGER_WORDS};
pub use formula::{detect_in_table, is_formula};
pub use report::generate_report;
pub use sanitize::{defuse, sanitize_table};

use serde::Serialize;
use tracing::{info, instrument};

use crate::error::Result;
use crate::table::Table;

/// Everything derived from one table: the formula cells, the malicious subset and the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    pub flagged: Vec<String>,
    pub malicious: Vec<String>,
    pub report: Option<String>,
}

impl ScanOutcome {
    pub fn is_clean(&self) -> bool {
        self.flagged.is_empty()
    }

    /// Sanitised CSV of `table`, which must be the table this outcome was computed from.
    pub fn sanitize(&self, table: &Table) -> Result<String> {
        sanitize_table(table, &self.malicious).to_indexed_csv()
    }
}

pub fn scan_table(table: &Table) -> ScanOutcome {
    let flagged = detect_in_table(table);
    let malicious = detect_malicious(&flagged);
    let report = generate_report(&flagged, &malicious);
    ScanOutcome {
        flagged,
        malicious,
        report,
    }
}

/// Parse `raw` and run the whole pipeline over it.
#[instrument(level = "info", skip(raw), fields(len = raw.len()))]
pub fn scan_csv(raw: &str, delimiter: char) -> Result<(Table, ScanOutcome)> {
    let table = Table::parse(raw, delimiter)?;
    let outcome = scan_table(&table);
    info!(
        flagged = outcome.flagged.len(),
        malicious = outcome.malicious.len(),
        "scan finished"
    );
    Ok((table, outcome))
}

/// Formula-looking cell values of `raw_text`, column-major.
pub fn detect_formulae(raw_text: &str, delimiter: char) -> Result<Vec<String>> {
    let table = Table::parse(raw_text, delimiter)?;
    Ok(detect_in_table(&table))
}

/// Re-read `raw_text` and serialise it with every malicious value defused.
pub fn generate_sanitized<S: AsRef<str>>(
    raw_text: &str,
    delimiter: char,
    malicious: &[S],
) -> Result<String> {
    let table = Table::parse(raw_text, delimiter)?;
    sanitize_table(&table, malicious).to_indexed_csv()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;
    use anyhow::Result;

    const ALICE: &str = "name,payload\nAlice,=cmd.exe|'calc'\nBob,hello";

    #[test]
    fn malicious_payload_end_to_end() -> Result<()> {
        let flagged = detect_formulae(ALICE, ',')?;
        assert_eq!(flagged, vec!["=cmd.exe|'calc'"]);

        let malicious = detect_malicious(&flagged);
        assert_eq!(malicious, flagged);

        let report = generate_report(&flagged, &malicious).expect("report");
        assert!(report.contains("1 formulae pattern detected"));
        assert!(report.contains("\n=cmd.exe|'calc'\n"));

        let sanitized = generate_sanitized(ALICE, ',', &malicious)?;
        assert!(sanitized.contains("\n0,Alice,'=cmd.exe|'calc'\n"));
        Ok(())
    }

    #[test]
    fn negative_number_is_flagged_but_benign() -> Result<()> {
        let (_, outcome) = scan_csv("a,b\n-5,text", ',')?;
        assert_eq!(outcome.flagged, vec!["-5"]);
        assert!(outcome.malicious.is_empty());
        let report = outcome.report.expect("report");
        assert!(report.contains("1 formulae pattern detected"));
        assert!(!report.contains("In addition"));
        Ok(())
    }

    #[test]
    fn clean_table_has_no_report() -> Result<()> {
        let (table, outcome) = scan_csv("a,b\n1,text\n2,more\n", ',')?;
        assert!(outcome.is_clean());
        assert_eq!(outcome.report, None);
        assert_eq!(outcome.sanitize(&table)?, ",a,b\n0,1,text\n1,2,more\n");
        Ok(())
    }

    #[test]
    fn flagged_count_matches_matching_cells() -> Result<()> {
        let raw = "A,B,C\n=1,+2,x\n-3,y,/4\n*5,'=6,\"\"\"=7\"\n";
        let (table, outcome) = scan_csv(raw, ',')?;
        let expected = table
            .cells()
            .filter(|c| is_formula(&c.to_string()))
            .count();
        assert_eq!(outcome.flagged.len(), expected);
        assert_eq!(outcome.flagged.len(), 7);
        Ok(())
    }

    #[test]
    fn parse_errors_propagate() {
        let err = detect_formulae("a,b\n1\n", ',').unwrap_err();
        assert!(matches!(err, ScanError::Parse(_)));
        assert!(generate_sanitized("", ',', &["=cmd"]).is_err());
    }

    #[test]
    fn outcome_serializes_to_json() -> Result<()> {
        let (_, outcome) = scan_csv(ALICE, ',')?;
        let json = serde_json::to_value(&outcome)?;
        assert_eq!(json["malicious"][0], "=cmd.exe|'calc'");
        assert!(json["report"].is_string());
        Ok(())
    }
}
