//! Lazy reader for the gzip-compressed TSV corpus.
//!
//! One record per line, UTF-8, exactly three tab-separated fields in fixed
//! order: label, title, text. A line with any other field count is a fatal
//! parse error; there is no partial-record recovery or skipping.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use core_types::Document;
use flate2::read::GzDecoder;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("line {line_no}: expected 3 tab-separated fields, found {found}")]
    Parse { line_no: usize, found: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Iterator over corpus records, in file order.
pub struct CorpusReader {
    lines: Lines<BufReader<GzDecoder<File>>>,
    line_no: usize,
}

impl CorpusReader {
    pub fn open(path: &Path) -> Result<Self, CorpusError> {
        let file = File::open(path)?;
        let reader = BufReader::new(GzDecoder::new(file));
        Ok(Self {
            lines: reader.lines(),
            line_no: 0,
        })
    }
}

impl Iterator for CorpusReader {
    type Item = Result<Document, CorpusError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(err) => return Some(Err(err.into())),
        };
        self.line_no += 1;
        Some(parse_line(line.trim_end_matches(['\r', '\n']), self.line_no))
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<Document, CorpusError> {
    let mut fields = line.split('\t');
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(label), Some(title), Some(text), None) => Ok(Document {
            label: label.to_string(),
            title: title.to_string(),
            text: text.to_string(),
        }),
        _ => Err(CorpusError::Parse {
            line_no,
            found: line.split('\t').count(),
        }),
    }
}
