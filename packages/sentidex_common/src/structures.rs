use std::cmp::Ordering;

use crate::error::{IndexError, Result};

/// One `(term, docId)` occurrence produced by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub doc_id: u64,
}

impl Token {
    pub fn new<S: Into<String>>(term: S, doc_id: u64) -> Self {
        Token { term: term.into(), doc_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    pub doc_id: u64,
    pub term_freq: u32,
    pub weight: f32,
}

impl Posting {
    pub fn new(doc_id: u64, term_freq: u32) -> Self {
        Posting { doc_id, term_freq, weight: 0.0 }
    }

    pub fn with_weight(self, weight: f32) -> Self {
        Posting { weight, ..self }
    }
}

/// Summary statistics of a term. Ordered (and compared) by term only.
#[derive(Debug, Clone)]
pub struct DictionaryEntry {
    pub term: String,
    pub doc_freq: u64,
    pub sentiment: i32,
}

impl DictionaryEntry {
    pub fn new<S: Into<String>>(term: S, doc_freq: u64, sentiment: i32) -> Result<Self> {
        let term = term.into();
        if term.is_empty() {
            return Err(IndexError::invalid("dictionary term cannot be empty"));
        }

        Ok(DictionaryEntry { term, doc_freq, sentiment })
    }
}

impl PartialEq for DictionaryEntry {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term
    }
}

impl Eq for DictionaryEntry {}

impl PartialOrd for DictionaryEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DictionaryEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.term.cmp(&other.term)
    }
}

/// A dictionary entry decoded from disk, pointing at its postings list.
///
/// Only built from a decoded delta, so the offset is always the running sum
/// of non-negative deltas and never decreases in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntryLinked {
    entry: DictionaryEntry,
    postings_offset: u64,
}

impl DictionaryEntryLinked {
    pub fn from_delta(entry: DictionaryEntry, last_offset: u64, offset_delta: u64) -> Result<Self> {
        let postings_offset = last_offset.checked_add(offset_delta).ok_or_else(|| {
            IndexError::corrupt(format!(
                "postings offset overflow for term {} ({} + {})",
                entry.term, last_offset, offset_delta,
            ))
        })?;

        Ok(DictionaryEntryLinked { entry, postings_offset })
    }

    pub fn entry(&self) -> &DictionaryEntry {
        &self.entry
    }

    pub fn into_entry(self) -> DictionaryEntry {
        self.entry
    }

    pub fn term(&self) -> &str {
        &self.entry.term
    }

    pub fn doc_freq(&self) -> u64 {
        self.entry.doc_freq
    }

    pub fn sentiment(&self) -> i32 {
        self.entry.sentiment
    }

    pub fn postings_offset(&self) -> u64 {
        self.postings_offset
    }
}

/// A term with its full postings list. `doc_freq == postings.len()` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    dictionary_entry: DictionaryEntry,
    postings: Vec<Posting>,
}

impl IndexEntry {
    pub fn new(dictionary_entry: DictionaryEntry, postings: Vec<Posting>) -> Result<Self> {
        if dictionary_entry.doc_freq != postings.len() as u64 {
            return Err(IndexError::corrupt(format!(
                "term {} declares a document frequency of {} but has {} postings",
                dictionary_entry.term,
                dictionary_entry.doc_freq,
                postings.len(),
            )));
        }

        Ok(IndexEntry { dictionary_entry, postings })
    }

    /// Entry for a term absent from the index.
    pub fn empty<S: Into<String>>(term: S, sentiment: i32) -> Self {
        IndexEntry {
            dictionary_entry: DictionaryEntry { term: term.into(), doc_freq: 0, sentiment },
            postings: Vec::new(),
        }
    }

    pub fn term(&self) -> &str {
        &self.dictionary_entry.term
    }

    pub fn document_frequency(&self) -> u64 {
        self.dictionary_entry.doc_freq
    }

    pub fn sentiment_value(&self) -> i32 {
        self.dictionary_entry.sentiment
    }

    pub fn dictionary_entry(&self) -> &DictionaryEntry {
        &self.dictionary_entry
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    pub fn into_parts(self) -> (DictionaryEntry, Vec<Posting>) {
        (self.dictionary_entry, self.postings)
    }
}

/// Per-document record of the norm file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormFileEntry {
    pub doc_id: u64,
    /// Euclidean length of the document's tf-idf vector
    pub norm: f32,
    /// Sum of `sentiment(term) * tf` over the document's terms
    pub sentiment: f32,
}

impl NormFileEntry {
    pub fn new(doc_id: u64) -> Self {
        NormFileEntry { doc_id, norm: 0.0, sentiment: 0.0 }
    }
}
