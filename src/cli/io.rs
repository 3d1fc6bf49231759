//! JSON lines I/O for the CLI
//!
//! - Input: one JSON object per line, blank lines ignored
//! - Output: one JSON object per line
//! - UTF-8 only

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

use crate::types::Document;

use super::errors::{CliError, CliResult};

/// Opens `path` for reading, `-` meaning stdin
pub fn open_input(path: &str) -> CliResult<Box<dyn BufRead>> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path)
        .map_err(|e| CliError::io_error(format!("Failed to open input '{}': {}", path, e)))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Reads every document of a JSON lines stream
pub fn read_documents(reader: impl BufRead) -> CliResult<Vec<Document>> {
    let mut docs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc = Document::from_json_str(&line).map_err(|e| {
            CliError::invalid_input(format!("line {}: {}", i + 1, e))
        })?;
        docs.push(doc);
    }
    Ok(docs)
}

/// Writes a document as one JSON line
pub fn write_document(out: &mut impl Write, doc: &Document) -> CliResult<()> {
    serde_json::to_writer(&mut *out, doc)?;
    writeln!(out)?;
    Ok(())
}
