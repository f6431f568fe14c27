// src/email/pipeline.rs

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::{MailError, Message, Part};
use crate::scan::{scan_csv, ScanOutcome};

/// Name used in warning attachments and the body banner.
pub const BRAND: &str = "CSV Guard";

pub fn warning_banner() -> String {
    format!(
        "<H2 style=\"color:red\">{} has detected potential threats in an attachment to this \
         email,<br/> see the Warning attachments for more details</H2>",
        BRAND
    )
}

/// Result of scanning one CSV attachment.
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentScan {
    pub filename: String,
    pub outcome: ScanOutcome,
}

/// What happened to a whole message.
#[derive(Debug, Default)]
pub struct MailScan {
    pub scanned: Vec<AttachmentScan>,
    /// Attachments that could not be decoded or parsed. They do not stop the others.
    pub failures: Vec<MailError>,
    /// Number of `Warning_{n}.txt` / `Secured_{n}.csv` pairs added to the message.
    pub warnings_attached: usize,
}

impl MailScan {
    pub fn threats_found(&self) -> bool {
        self.warnings_attached > 0
    }
}

pub struct MailScanner {
    delimiter: char,
}

impl Default for MailScanner {
    fn default() -> Self {
        Self::new(',')
    }
}

impl MailScanner {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Scan every top-level `text/csv` part of `message` and attach a warning and a sanitised
    /// copy for each one that contains formulae, plus a banner if any did.
    #[instrument(level = "info", skip_all)]
    pub fn secure(&self, message: &mut Message) -> MailScan {
        let mut summary = MailScan::default();
        let mut findings: Vec<(String, String)> = Vec::new();

        // 1) Scan each CSV attachment on its own; a failure is recorded and skipped
        for part in message
            .payloads()
            .iter()
            .filter(|p| p.content_type() == "text/csv")
        {
            let filename = part.filename().unwrap_or_else(|| "(unnamed)".to_string());
            match self.scan_part(part, &filename) {
                Ok((outcome, sanitized)) => {
                    info!(
                        filename = %filename,
                        flagged = outcome.flagged.len(),
                        malicious = outcome.malicious.len(),
                        "scanned attachment"
                    );
                    if let (Some(report), Some(sanitized)) = (&outcome.report, sanitized) {
                        let warning = format!(
                            "{} has noticed that attachment {} is suspicious:\r\n{}",
                            BRAND, filename, report
                        );
                        findings.push((warning, sanitized));
                    }
                    summary.scanned.push(AttachmentScan { filename, outcome });
                }
                Err(err) => {
                    warn!(error = %err, "skipping attachment");
                    summary.failures.push(err);
                }
            }
        }

        // 2) One warning and one sanitised copy per reported attachment, numbered from 1
        for (i, (warning, sanitized)) in findings.iter().enumerate() {
            let n = i + 1;
            message.attach(Part::attachment(
                &format!("Warning_{}.txt", n),
                warning.as_bytes(),
            ));
            message.attach(Part::attachment(
                &format!("Secured_{}.csv", n),
                sanitized.as_bytes(),
            ));
        }
        // 3) A single banner for the whole message
        if !findings.is_empty() {
            message.attach(Part::html(&warning_banner()));
        }

        summary.warnings_attached = findings.len();
        summary
    }

    /// Decode and scan one attachment. The sanitised table is only produced when something
    /// was flagged.
    fn scan_part(
        &self,
        part: &Part,
        filename: &str,
    ) -> Result<(ScanOutcome, Option<String>), MailError> {
        let decode_err = |reason: String| MailError::Decode {
            filename: filename.to_string(),
            reason,
        };
        let scan_err = |source| MailError::Scan {
            filename: filename.to_string(),
            source,
        };

        let bytes = part.decoded_body().map_err(|e| decode_err(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| decode_err(e.to_string()))?;

        let (table, outcome) = scan_csv(&text, self.delimiter).map_err(scan_err)?;
        let sanitized = if outcome.is_clean() {
            None
        } else {
            Some(outcome.sanitize(&table).map_err(scan_err)?)
        };
        Ok((outcome, sanitized))
    }
}
