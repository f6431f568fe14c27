// src/cli.rs

use tracing_subscriber::{fmt, EnvFilter};

/// Install the stderr subscriber used by the binaries; stdout is left for reports.
pub fn init_logging() {
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,csvguard=info,scan_eml=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
}

/// `clap` value parser for a delimiter: a single ASCII character, or `\t` / `tab`.
pub fn parse_delimiter(raw: &str) -> Result<char, String> {
    match raw {
        "\\t" | "tab" | "TAB" => return Ok('\t'),
        _ => {}
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() && !matches!(c, '"' | '\n' | '\r') => Ok(c),
        (Some(_), None) => Err(format!("{:?} cannot be used as a CSV delimiter", raw)),
        _ => Err(format!(
            "delimiter must be exactly one character, got {:?}",
            raw
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_single_ascii_characters() {
        assert_eq!(parse_delimiter(","), Ok(','));
        assert_eq!(parse_delimiter(";"), Ok(';'));
        assert_eq!(parse_delimiter("|"), Ok('|'));
        assert_eq!(parse_delimiter("\t"), Ok('\t'));
    }

    #[test]
    fn accepts_tab_spellings() {
        assert_eq!(parse_delimiter("\\t"), Ok('\t'));
        assert_eq!(parse_delimiter("tab"), Ok('\t'));
    }

    #[test]
    fn rejects_everything_else() {
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter(",,").is_err());
        assert!(parse_delimiter("\"").is_err());
        assert!(parse_delimiter("§").is_err());
    }
}
