// src/email/mod.rs

pub mod mime;
pub mod pipeline;

pub use mime::{Body, Header, Headers, Message, Part};
pub use pipeline::{warning_banner, AttachmentScan, MailScan, MailScanner, BRAND};

use thiserror::Error;

use crate::error::ScanError;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Attachment {filename} could not be decoded: {reason}")]
    Decode { filename: String, reason: String },

    #[error("Attachment {filename} could not be scanned: {source}")]
    Scan {
        filename: String,
        #[source]
        source: ScanError,
    },
}
