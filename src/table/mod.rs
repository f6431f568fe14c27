// src/table/mod.rs

pub mod cell;

pub use cell::CellValue;

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use tracing::{debug, instrument, trace};

use crate::error::{Result, ScanError};

/// A named column of typed cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<CellValue>,
}

/// Columns in source order, all of the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Parse delimited text, taking the first record as the header row.
    ///
    /// Every record must have as many fields as the header; anything else is a parse error
    /// rather than being padded or truncated.
    #[instrument(level = "debug", skip(raw), fields(len = raw.len()))]
    pub fn parse(raw: &str, delimiter: char) -> Result<Self> {
        // 1) Reader over the whole input; ragged records are rejected by the csv crate
        let delimiter = delimiter_byte(delimiter)?;
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(false)
            .from_reader(raw.as_bytes());

        // 2) Header row, made unique
        let headers = rdr
            .headers()
            .map_err(|e| ScanError::Parse(e.to_string()))?
            .clone();
        if headers.is_empty() {
            return Err(ScanError::Parse("no header row found".into()));
        }
        let names = unique_headers(&headers);
        trace!(?names, "parsed header row");

        // 3) Collect fields column by column
        let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for (idx, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| ScanError::Parse(format!("record {}: {}", idx, e)))?;
            for (column, field) in raw_columns.iter_mut().zip(record.iter()) {
                column.push(field.to_string());
            }
        }

        // 4) Infer one type per column
        let row_count = raw_columns.first().map_or(0, Vec::len);
        let columns: Vec<Column> = names
            .into_iter()
            .zip(raw_columns)
            .map(|(name, raw)| Column {
                name,
                cells: cell::infer_column(&raw),
            })
            .collect();

        debug!(columns = columns.len(), rows = row_count, "loaded table");
        Ok(Self { columns, row_count })
    }

    /// Like [`Table::parse`], for input that has not been decoded yet.
    pub fn parse_bytes(bytes: &[u8], delimiter: char) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ScanError::Parse(format!("input is not valid UTF-8: {}", e)))?;
        Self::parse(text, delimiter)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Every cell, column by column, each column top to bottom.
    pub fn cells(&self) -> impl Iterator<Item = &CellValue> {
        self.columns.iter().flat_map(|c| c.cells.iter())
    }

    /// A copy of the table with `f` applied to every cell. Shape and header names are kept.
    pub fn map_cells<F>(&self, mut f: F) -> Table
    where
        F: FnMut(&CellValue) -> CellValue,
    {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                cells: c.cells.iter().map(&mut f).collect(),
            })
            .collect();
        Table {
            columns,
            row_count: self.row_count,
        }
    }

    /// Serialise as comma-delimited CSV with a leading positional index column. The header's
    /// first field is empty; each row starts with its zero-based position.
    pub fn to_indexed_csv(&self) -> Result<String> {
        let mut wtr = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(String::new());
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        wtr.write_record(&header)
            .map_err(|e| ScanError::Serialization(e.to_string()))?;

        for row in 0..self.row_count {
            let mut record = Vec::with_capacity(self.columns.len() + 1);
            record.push(row.to_string());
            record.extend(self.columns.iter().map(|c| c.cells[row].to_field()));
            wtr.write_record(&record)
                .map_err(|e| ScanError::Serialization(e.to_string()))?;
        }

        let bytes = wtr
            .into_inner()
            .map_err(|e| ScanError::Serialization(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ScanError::Serialization(e.to_string()))
    }
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    match delimiter {
        '"' | '\n' | '\r' => Err(ScanError::Parse(format!(
            "{:?} cannot be used as a delimiter",
            delimiter
        ))),
        d if d.is_ascii() => Ok(d as u8),
        d => Err(ScanError::Parse(format!(
            "delimiter must be a single ASCII character, got {:?}",
            d
        ))),
    }
}

/// Blank names become `Unnamed: <position>` and repeats get a `.1`, `.2`, … suffix.
fn unique_headers(raw: &StringRecord) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(raw.len());
    for (pos, name) in raw.iter().enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {}", pos)
        } else {
            name.to_string()
        };
        let mut candidate = base.clone();
        let mut n = 0;
        while names.contains(&candidate) {
            n += 1;
            candidate = format!("{}.{}", base, n);
        }
        names.push(candidate);
    }
    names
}
