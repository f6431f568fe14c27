use anyhow::{bail, Context, Result};
use clap::Parser;
use csvguard::{
    archive::{is_zip_path, read_csv_entries},
    cli::{init_logging, parse_delimiter},
    scan_table, ScanOutcome, Table,
};
use serde::Serialize;
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};
use tracing::info;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Detect and defuse spreadsheet formula injection in CSV files"
)]
struct Args {
    /// The .csv to scan, or a .zip whose .csv entries are all scanned
    path: PathBuf,

    /// The CSV delimiter
    #[arg(
        short,
        long,
        default_value = ",",
        env = "CSVGUARD_DELIMITER",
        value_parser = parse_delimiter
    )]
    delimiter: char,

    /// Also write the sanitised CSV to this path
    #[arg(long)]
    sanitized: Option<PathBuf>,

    /// Print the scan outcome as JSON instead of the plain report
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct EntryOutcome<'a> {
    name: &'a str,
    #[serde(flatten)]
    outcome: &'a ScanOutcome,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    if is_zip_path(&args.path) {
        scan_archive(&args)
    } else {
        scan_file(&args)
    }
}

fn scan_bytes(data: &[u8], delimiter: char) -> Result<(Table, ScanOutcome)> {
    let table = Table::parse_bytes(data, delimiter)?;
    let outcome = scan_table(&table);
    Ok((table, outcome))
}

fn scan_file(args: &Args) -> Result<()> {
    let data = fs::read(&args.path)
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let (table, outcome) = scan_bytes(&data, args.delimiter)
        .with_context(|| format!("Failed to scan {}", args.path.display()))?;
    info!(
        path = %args.path.display(),
        flagged = outcome.flagged.len(),
        malicious = outcome.malicious.len(),
        "scanned"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if let Some(report) = &outcome.report {
        print!("{}", report);
    }

    if let Some(out) = &args.sanitized {
        write_sanitized(out, &outcome, &table)?;
    }
    Ok(())
}

fn scan_archive(args: &Args) -> Result<()> {
    let entries = read_csv_entries(&args.path)?;
    info!(entries = entries.len(), "scanning archive");

    let mut outcomes = Vec::with_capacity(entries.len());
    let mut written = HashSet::new();
    for entry in &entries {
        let (table, outcome) = scan_bytes(&entry.data, args.delimiter)
            .with_context(|| format!("Failed to scan {} in {}", entry.name, args.path.display()))?;
        if let Some(out) = &args.sanitized {
            let target = entry_output_path(out, &entry.name);
            if !written.insert(target.clone()) {
                bail!(
                    "{} would overwrite the sanitised copy of an earlier entry at {}",
                    entry.name,
                    target.display()
                );
            }
            write_sanitized(&target, &outcome, &table)?;
        }
        outcomes.push((entry.name.as_str(), outcome));
    }

    if args.json {
        let listing: Vec<EntryOutcome<'_>> = outcomes
            .iter()
            .map(|(name, outcome)| EntryOutcome {
                name: *name,
                outcome,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for (name, outcome) in &outcomes {
            if let Some(report) = &outcome.report {
                println!("== {} ==", name);
                print!("{}", report);
            }
        }
    }
    Ok(())
}

fn write_sanitized(out: &Path, outcome: &ScanOutcome, table: &Table) -> Result<()> {
    let sanitized = outcome.sanitize(table)?;
    fs::write(out, sanitized).with_context(|| format!("Failed to write {}", out.display()))?;
    info!(path = %out.display(), "wrote sanitised CSV");
    Ok(())
}

/// `out/report.csv` + entry `dir/q1.csv` → `out/report_dir_q1.csv`. The entry's directories
/// are flattened into the name, so the result always lands next to `out`.
fn entry_output_path(out: &Path, entry_name: &str) -> PathBuf {
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sanitized".to_string());
    let entry_stem = Path::new(entry_name)
        .with_extension("")
        .to_string_lossy()
        .replace(&['/', '\\'][..], "_");
    out.with_file_name(format!("{}_{}.csv", stem, entry_stem))
}
