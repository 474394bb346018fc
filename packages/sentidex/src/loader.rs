//! Plumbing from text files to tokens: a `doc id <TAB> text` corpus and an AFINN-style
//! `term <TAB> score` sentiment lexicon.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use log::{error, warn};

use sentidex_common::{Result, SentimentLexicon, Token};

fn tab_separated_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(reader)
}

/// Lowercased words of `text`, stripped of surrounding punctuation.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
}

/// Streams the tokens of a `doc id <TAB> text` file, one document per line.
///
/// Malformed lines are logged and skipped. A read error ends the stream, and is kept
/// for the caller to collect with [`TsvTokenSource::take_error`].
pub struct TsvTokenSource<R: Read> {
    records: StringRecordsIntoIter<R>,
    pending: std::vec::IntoIter<Token>,
    line: u64,
    error: Option<io::Error>,
}

impl TsvTokenSource<File> {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(TsvTokenSource::new(File::open(path)?))
    }
}

impl<R: Read> TsvTokenSource<R> {
    pub fn new(reader: R) -> Self {
        TsvTokenSource {
            records: tab_separated_reader(reader).into_records(),
            pending: Vec::new().into_iter(),
            line: 0,
            error: None,
        }
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn parse_document(&self, record: &StringRecord) -> Option<Vec<Token>> {
        let doc_id = match record.get(0).map(|field| field.trim().parse::<u64>()) {
            Some(Ok(doc_id)) => doc_id,
            _ => {
                warn!("Skipping line {}: missing or invalid document id", self.line);
                return None;
            }
        };

        let tokens: Vec<Token> = record
            .iter()
            .skip(1)
            .flat_map(tokenize)
            .map(|term| Token::new(term, doc_id))
            .collect();

        Some(tokens)
    }
}

impl<R: Read> Iterator for TsvTokenSource<R> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.pending.next() {
                return Some(token);
            }

            if self.error.is_some() {
                return None;
            }

            let record = match self.records.next()? {
                Ok(record) => record,
                Err(err) => {
                    error!("Failed to read the document source after line {}: {}", self.line, err);
                    self.error = Some(io::Error::from(err));
                    return None;
                }
            };
            self.line += 1;

            if let Some(tokens) = self.parse_document(&record) {
                self.pending = tokens.into_iter();
            }
        }
    }
}

pub fn load_sentiment_lexicon<R: Read>(reader: R) -> Result<SentimentLexicon> {
    let mut lexicon = SentimentLexicon::default();

    for (idx, record) in tab_separated_reader(reader).into_records().enumerate() {
        let record = record.map_err(io::Error::from)?;

        let term = record.get(0).map(str::trim).unwrap_or_default();
        let score = record.get(1).map(|field| field.trim().parse::<i32>());
        match score {
            Some(Ok(score)) if !term.is_empty() && record.len() == 2 => {
                lexicon.insert(term.to_lowercase(), score);
            }
            _ => warn!("Skipping malformed sentiment lexicon line {}", idx + 1),
        }
    }

    Ok(lexicon)
}

pub fn load_sentiment_lexicon_file(path: &Path) -> Result<SentimentLexicon> {
    load_sentiment_lexicon(File::open(path)?)
}
