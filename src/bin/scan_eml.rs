use anyhow::{Context, Result};
use clap::Parser;
use csvguard::{
    cli::{init_logging, parse_delimiter},
    email::{MailScanner, Message},
};
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Scan the CSV attachments of an email and attach warnings and sanitised copies"
)]
struct Args {
    /// The .eml to scan
    eml: PathBuf,

    /// Where to write the rebuilt message
    #[arg(short, long, default_value = "Secured_Email.eml")]
    output: PathBuf,

    /// The delimiter used by the CSV attachments
    #[arg(
        short,
        long,
        default_value = ",",
        env = "CSVGUARD_DELIMITER",
        value_parser = parse_delimiter
    )]
    delimiter: char,

    /// Print the per-attachment outcomes as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let raw = fs::read(&args.eml)
        .with_context(|| format!("Failed to read {}", args.eml.display()))?;
    let mut message = Message::parse(&raw)
        .with_context(|| format!("Failed to parse {}", args.eml.display()))?;

    let summary = MailScanner::new(args.delimiter).secure(&mut message);
    info!(
        scanned = summary.scanned.len(),
        failed = summary.failures.len(),
        warnings = summary.warnings_attached,
        "message processed"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary.scanned)?);
    }

    fs::write(&args.output, message.to_bytes())
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(path = %args.output.display(), "wrote message");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arguments_with_defaults() {
        let args = Args::try_parse_from(["scan_eml", "in.eml"]).unwrap();
        assert_eq!(args.output, PathBuf::from("Secured_Email.eml"));
        assert_eq!(args.delimiter, ',');
        assert!(!args.json);

        let args =
            Args::try_parse_from(["scan_eml", "--json", "-o", "out.eml", "in.eml"]).unwrap();
        assert!(args.json);
        assert_eq!(args.output, PathBuf::from("out.eml"));
    }
}
