//! Delimited-text reader.
//!
//! Accepted format:
//!   header: <time>,<signal1>,<signal2>,...
//!   data:   <f64>,<f64>,<f64>,...
//!
//! - The delimiter is sniffed per line among `,` `;` tab and space, in that order.
//! - The first column is always the time axis, whatever its header says.
//! - Unparseable cells become `NaN`; rows with an unparseable time are dropped.
//! - Empty lines are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::config::IngestConfig;
use crate::data::table::{SignalTable, TIME_COLUMN};
use crate::error::IngestError;

/// Candidate delimiters in preference order.
pub const DELIMITERS: [char; 4] = [',', ';', '\t', ' '];

/// First delimiter from [`DELIMITERS`] that occurs in `line`.
pub fn sniff_delimiter(line: &str) -> Option<char> {
    DELIMITERS.iter().copied().find(|d| line.contains(*d))
}

/// Split one line. Runs of spaces count as a single separator when space is the delimiter.
pub fn split_fields(line: &str, delim: Option<char>) -> Vec<&str> {
    match delim {
        Some(' ') => line.split(' ').filter(|f| !f.is_empty()).collect(),
        Some(d) => line.split(d).map(str::trim).collect(),
        None => vec![line.trim()],
    }
}

/// Column count of one line using its own sniffed delimiter.
pub fn count_fields(line: &str) -> usize {
    let line = line.trim();
    split_fields(line, sniff_delimiter(line)).len()
}

fn parse_cell(cell: &str) -> f64 {
    let cell = cell.trim().trim_matches('"').trim();
    cell.parse::<f64>().unwrap_or(f64::NAN)
}

fn clean_header(cell: &str) -> String {
    cell.trim()
        .trim_start_matches('\u{feff}')
        .trim_matches('"')
        .trim()
        .to_string()
}

/// Header names with the first column relabelled and duplicates made unique (`a`, `a.1`, ...).
fn header_names(fields: &[&str]) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(fields.len().saturating_sub(1));
    for (i, raw) in fields.iter().enumerate().skip(1) {
        let mut name = clean_header(raw);
        if name.is_empty() {
            name = format!("col{}", i);
        }
        if name == TIME_COLUMN || names.contains(&name) {
            let base = name.clone();
            let mut n = 1;
            while name == TIME_COLUMN || names.contains(&name) {
                name = format!("{}.{}", base, n);
                n += 1;
            }
        }
        names.push(name);
    }
    names
}

/// Incremental parser fed one line at a time.
struct TableBuilder {
    delim: Option<char>,
    names: Vec<String>,
    chunk_rows: usize,
    chunks: Vec<SignalTable>,
    current: SignalTable,
    widest_row: usize,
    first_data_cols: Option<usize>,
}

impl TableBuilder {
    fn from_header(header: &str, chunk_rows: usize) -> Self {
        let delim = sniff_delimiter(header);
        let fields = split_fields(header, delim);
        let names = header_names(&fields);
        Self {
            delim,
            current: SignalTable::new(names.clone()),
            names,
            chunk_rows: chunk_rows.max(1),
            chunks: Vec::new(),
            widest_row: 0,
            first_data_cols: None,
        }
    }

    fn header_cols(&self) -> usize {
        self.names.len() + 1
    }

    fn push_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return;
        }
        if self.first_data_cols.is_none() {
            self.first_data_cols = Some(count_fields(line));
        }
        let fields = split_fields(line, self.delim);
        self.widest_row = self.widest_row.max(fields.len());
        let t = parse_cell(fields[0]);
        if !t.is_finite() {
            return;
        }
        let values: Vec<f64> = fields[1..].iter().map(|c| parse_cell(c)).collect();
        self.current.push_row(t, &values);
        if self.current.len() >= self.chunk_rows {
            let full = std::mem::replace(&mut self.current, SignalTable::new(self.names.clone()));
            self.chunks.push(full);
        }
    }

    /// Reassemble chunks in order and check the header/data/table shape.
    fn finish(mut self, path: &Path) -> Result<SignalTable, IngestError> {
        let header_cols = self.header_cols();
        let data_cols = self.first_data_cols.unwrap_or(header_cols);
        let table_cols = self.widest_row.max(header_cols);
        if header_cols != data_cols || data_cols != table_cols {
            return Err(IngestError::FormatMismatch {
                path: path.to_path_buf(),
                header_cols,
                data_cols,
                table_cols,
            });
        }
        let mut table = match self.chunks.len() {
            0 => self.current,
            _ => {
                let mut first = self.chunks.remove(0);
                for chunk in self.chunks.iter() {
                    first.append(chunk);
                }
                first.append(&self.current);
                first
            }
        };
        table.retain_finite_time();
        if table.is_empty() {
            return Err(IngestError::EmptyTable {
                path: path.to_path_buf(),
            });
        }
        Ok(table)
    }
}

/// Parse an in-memory document.
pub fn parse_str(path: &Path, text: &str) -> Result<SignalTable, IngestError> {
    let lines = text.lines().map(|l| Ok::<_, std::io::Error>(l.to_string()));
    parse_lines(path, lines, usize::MAX)
}

/// Parse any buffered reader, accumulating `chunk_rows` rows per chunk.
pub fn parse_reader<R: BufRead>(
    path: &Path,
    reader: R,
    chunk_rows: usize,
) -> Result<SignalTable, IngestError> {
    parse_lines(path, reader.lines(), chunk_rows)
}

fn parse_lines<I>(path: &Path, mut lines: I, chunk_rows: usize) -> Result<SignalTable, IngestError>
where
    I: Iterator<Item = std::io::Result<String>>,
{
    let io_err = |source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    };
    let header = loop {
        match lines.next() {
            Some(line) => {
                let line = line.map_err(io_err)?;
                if !line.trim().is_empty() {
                    break line;
                }
            }
            None => {
                return Err(IngestError::EmptyTable {
                    path: path.to_path_buf(),
                })
            }
        }
    };
    if clean_header(&header).is_empty() {
        return Err(IngestError::MissingTimeColumn {
            path: path.to_path_buf(),
        });
    }
    let mut builder = TableBuilder::from_header(&header, chunk_rows);
    for line in lines {
        builder.push_line(&line.map_err(io_err)?);
    }
    builder.finish(path)
}

/// Read and parse a file from disk.
///
/// Files above `chunk_threshold_bytes` are streamed in chunks of `chunk_rows`
/// rows; smaller files are read in one go. Both paths yield the same table.
pub fn read_table(path: &Path, cfg: &IngestConfig) -> Result<SignalTable, IngestError> {
    let meta = std::fs::metadata(path).map_err(|e| IngestError::SourceUnavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !meta.is_file() || meta.len() == 0 {
        return Err(IngestError::SourceUnavailable {
            path: path.to_path_buf(),
            reason: "not a non-empty regular file".to_string(),
        });
    }
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if meta.len() > cfg.chunk_threshold_bytes {
        tracing::debug!(path = %path.display(), bytes = meta.len(), "chunked parse");
        parse_reader(path, BufReader::new(file), cfg.chunk_rows)
    } else {
        let text = std::io::read_to_string(BufReader::new(file)).map_err(|source| {
            IngestError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
        parse_str(path, &text)
    }
}
