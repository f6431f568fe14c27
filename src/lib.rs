pub mod archive;
pub mod cli;
pub mod email;
pub mod error;
pub mod scan;
pub mod table;

pub use error::{Result, ScanError};
pub use scan::{
    detect_formulae, detect_malicious, generate_report, generate_sanitized, scan_csv, scan_table,
    ScanOutcome,
};
pub use table::{CellValue, Column, Table};
