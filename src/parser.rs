// Row Parser
// Turns raw delimited text into ordered raw rows keyed by canonical header names.
//
// - Delimiter auto-detected among comma, semicolon, tab and pipe
// - First non-blank line is the header
// - Blank lines anywhere are skipped before numbering (header = row 1)

use crate::error::ImportError;
use crate::headers::{self, Field};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info};

// ============================================================================
// CORE TYPES
// ============================================================================

/// Field delimiter of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
    Pipe,
}

impl Delimiter {
    /// Candidates in tie-break order
    pub const CANDIDATES: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Tab,
        Delimiter::Pipe,
    ];

    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }

    pub fn as_char(&self) -> char {
        char::from(self.as_byte())
    }

    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            Delimiter::Comma => "comma",
            Delimiter::Semicolon => "semicolon",
            Delimiter::Tab => "tab",
            Delimiter::Pipe => "pipe",
        }
    }
}

/// One data row before type coercion: canonical field name -> trimmed cell text.
/// Columns the header mapper did not recognize keep their normalized header as key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRow {
    /// Row number as the user sees it in the file (header = 1, data starts at 2)
    pub row_number: usize,
    pub fields: BTreeMap<String, String>,
}

impl RawRow {
    pub fn new(row_number: usize) -> Self {
        RawRow {
            row_number,
            fields: BTreeMap::new(),
        }
    }

    /// Builder pattern: add a cell
    pub fn with_field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    /// Cell for a canonical field, if the column exists in this row
    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(field.as_str()).map(String::as_str)
    }

    /// Cell for a canonical field, `None` when absent or blank
    pub fn get_non_blank(&self, field: Field) -> Option<&str> {
        self.get(field).filter(|value| !value.trim().is_empty())
    }

    /// Cell by raw key (useful for unrecognized pass-through columns)
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// One header cell as written and as mapped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMapping {
    pub raw: String,
    pub mapped: String,
}

/// What the parser learned about the file besides its rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDiagnostics {
    pub delimiter: Delimiter,
    pub headers: Vec<HeaderMapping>,
    /// Mapped header names that match no canonical field
    pub unrecognized_columns: Vec<String>,
    /// Later columns that mapped to an already-used name (first one wins)
    pub duplicate_columns: Vec<String>,
    /// Canonical fields with no column in the header
    pub missing_fields: Vec<Field>,
    /// Records whose every cell is blank. Entirely empty lines are dropped by
    /// the reader before they become records and are not counted here.
    pub blank_records_skipped: usize,
    pub row_count: usize,
    /// Hex SHA-256 of the input bytes
    pub content_sha256: String,
}

/// Output of [`parse_bytes`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub rows: Vec<RawRow>,
    pub diagnostics: ParseDiagnostics,
}

// ============================================================================
// DELIMITER DETECTION
// ============================================================================

/// Pick the candidate that occurs most often outside quotes in the header line.
/// Ties resolve in [`Delimiter::CANDIDATES`] order; no candidate means comma.
pub fn detect_delimiter(header_line: &str) -> Delimiter {
    let mut counts = [0usize; 4];
    let mut in_quotes = false;

    for c in header_line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        for (i, candidate) in Delimiter::CANDIDATES.iter().enumerate() {
            if c == candidate.as_char() {
                counts[i] += 1;
            }
        }
    }

    let mut best = Delimiter::Comma;
    let mut best_count = 0;
    for (i, candidate) in Delimiter::CANDIDATES.iter().enumerate() {
        if counts[i] > best_count {
            best = *candidate;
            best_count = counts[i];
        }
    }

    best
}

// A line made only of whitespace, quotes and delimiter characters carries no data
fn is_blank_line(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_whitespace() || matches!(c, ',' | ';' | '|' | '"'))
}

fn is_blank_record(record: &csv::StringRecord) -> bool {
    record.iter().all(|cell| cell.trim().is_empty())
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse raw file bytes (UTF-8, optional BOM) into raw rows plus diagnostics.
///
/// Fails with [`ImportError::UnparseableFile`] when the bytes are not UTF-8,
/// the file has no non-blank line, or the reader rejects the content.
pub fn parse_bytes(bytes: &[u8]) -> Result<ParsedFile, ImportError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ImportError::UnparseableFile(format!("file is not valid UTF-8: {}", e)))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let (header_index, header_line) = text
        .lines()
        .enumerate()
        .find(|(_, line)| !is_blank_line(line))
        .ok_or_else(|| ImportError::UnparseableFile("file has no header line".to_string()))?;
    // csv positions are 1-based
    let header_line_number = header_index as u64 + 1;

    let delimiter = detect_delimiter(header_line);
    debug!(delimiter = delimiter.name(), "detected delimiter");

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter.as_byte())
        .from_reader(text.as_bytes());

    let mut header_keys: Option<Vec<String>> = None;
    let mut header_mappings = Vec::new();
    let mut duplicate_columns = Vec::new();
    let mut blank_records_skipped = 0;
    let mut rows = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            ImportError::UnparseableFile(format!("failed to read line {}: {}", line, e))
        })?;

        // Anything above the header line is blank by the same rule that chose the header
        let before_header = header_keys.is_none()
            && record
                .position()
                .map_or(false, |p| p.line() < header_line_number);

        if before_header || is_blank_record(&record) {
            blank_records_skipped += 1;
            continue;
        }

        let Some(keys) = header_keys.as_ref() else {
            let keys = map_header_record(&record, &mut header_mappings, &mut duplicate_columns);
            debug!(columns = ?keys, "mapped header");
            header_keys = Some(keys);
            continue;
        };

        // Header is row 1, so the n-th data row (0-based) is row n + 2
        let mut row = RawRow::new(rows.len() + 2);
        for (key, value) in keys.iter().zip(record.iter()) {
            row.fields
                .entry(key.clone())
                .or_insert_with(|| value.to_string());
        }
        rows.push(row);
    }

    let header_keys = header_keys
        .ok_or_else(|| ImportError::UnparseableFile("file has no header line".to_string()))?;

    let mut unrecognized_columns: Vec<String> = header_keys
        .iter()
        .filter(|key| Field::from_canonical(key).is_none())
        .cloned()
        .collect();
    unrecognized_columns.dedup();

    let missing_fields: Vec<Field> = Field::ALL
        .iter()
        .copied()
        .filter(|field| !header_keys.iter().any(|key| key == field.as_str()))
        .collect();

    let diagnostics = ParseDiagnostics {
        delimiter,
        headers: header_mappings,
        unrecognized_columns,
        duplicate_columns,
        missing_fields,
        blank_records_skipped,
        row_count: rows.len(),
        content_sha256: content_hash(bytes),
    };

    info!(
        rows = diagnostics.row_count,
        blank_skipped = diagnostics.blank_records_skipped,
        delimiter = delimiter.name(),
        "parsed file"
    );

    Ok(ParsedFile { rows, diagnostics })
}

// Same header line, same mapping: computed once per file
fn map_header_record(
    record: &csv::StringRecord,
    mappings: &mut Vec<HeaderMapping>,
    duplicates: &mut Vec<String>,
) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(record.len());

    for cell in record.iter() {
        let mapped = headers::map_header(cell);
        if keys.contains(&mapped) {
            duplicates.push(mapped.clone());
        }
        mappings.push(HeaderMapping {
            raw: cell.to_string(),
            mapped: mapped.clone(),
        });
        keys.push(mapped);
    }

    keys
}

/// Hex SHA-256 of the file bytes
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================
