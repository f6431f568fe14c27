// src/scan/sanitize.rs

use std::collections::HashSet;

use tracing::debug;

use crate::table::{CellValue, Table};

/// Quote-prefix a value so spreadsheet software shows it as literal text.
pub fn defuse(value: &str) -> String {
    format!("'{}", value)
}

/// Replace every cell equal to one of `malicious` with its defused form, wherever it sits
/// in the table. Matching is on the whole canonical string, and each cell is rewritten at
/// most once.
pub fn sanitize_table<S: AsRef<str>>(table: &Table, malicious: &[S]) -> Table {
    let threats: HashSet<&str> = malicious.iter().map(|m| m.as_ref()).collect();
    if threats.is_empty() {
        return table.clone();
    }

    let mut replaced = 0usize;
    let sanitized = table.map_cells(|cell| {
        let value = cell.to_string();
        if threats.contains(value.as_str()) {
            replaced += 1;
            CellValue::Text(defuse(&value))
        } else {
            cell.clone()
        }
    });
    debug!(threats = threats.len(), replaced, "sanitized table");
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn prefixes_matching_cells() -> Result<()> {
        let table = Table::parse("name,payload\nAlice,=cmd.exe|'calc'\nBob,hello", ',')?;
        let out = sanitize_table(&table, &["=cmd.exe|'calc'"]).to_indexed_csv()?;
        assert_eq!(out, ",name,payload\n0,Alice,'=cmd.exe|'calc'\n1,Bob,hello\n");
        Ok(())
    }

    #[test]
    fn replacement_is_global_across_columns() -> Result<()> {
        let table = Table::parse("a,b,c\n=cmd.exe,x,=cmd.exe\ny,=cmd.exe,z\n", ',')?;
        let sanitized = sanitize_table(&table, &["=cmd.exe"]);
        let defused: Vec<String> = sanitized
            .cells()
            .map(|c| c.to_string())
            .filter(|v| v.starts_with('\''))
            .collect();
        assert_eq!(defused.len(), 3);
        assert!(defused.iter().all(|v| v == "'=cmd.exe"));
        Ok(())
    }

    #[test]
    fn substrings_are_left_alone() -> Result<()> {
        let table = Table::parse("a\n=cmd.exe /c x\n=cmd.exe\n", ',')?;
        let sanitized = sanitize_table(&table, &["=cmd.exe"]);
        let cells: Vec<String> = sanitized.cells().map(|c| c.to_string()).collect();
        assert_eq!(cells, vec!["=cmd.exe /c x", "'=cmd.exe"]);
        Ok(())
    }

    #[test]
    fn repeated_threats_prefix_once() -> Result<()> {
        let table = Table::parse("a\n=http://x\n", ',')?;
        let sanitized = sanitize_table(&table, &["=http://x", "=http://x"]);
        assert_eq!(sanitized.column("a").unwrap().cells[0].to_string(), "'=http://x");
        Ok(())
    }

    #[test]
    fn sanitizing_twice_does_not_prefix_again() -> Result<()> {
        let malicious = ["=cmd.exe|'calc'"];
        let table = Table::parse("name,payload\nAlice,=cmd.exe|'calc'\nBob,hello", ',')?;
        let first = sanitize_table(&table, &malicious).to_indexed_csv()?;

        let reloaded = Table::parse(&first, ',')?;
        let second = sanitize_table(&reloaded, &malicious);
        assert_eq!(second, reloaded);
        assert_eq!(
            second.column("payload").unwrap().cells[0].to_string(),
            "'=cmd.exe|'calc'"
        );
        Ok(())
    }

    #[test]
    fn no_threats_means_unchanged() -> Result<()> {
        let table = Table::parse("a,b\n-5,=1+1\n", ',')?;
        let none: [&str; 0] = [];
        assert_eq!(sanitize_table(&table, &none), table);
        Ok(())
    }
}
