use std::path::Path;
use std::sync::Arc;

use sentidex_common::{IndexEntry, IndexError, Result, SentimentLexicon};

use crate::mmap_reader::IndexReaderMemoryMapped;

/// What a ranking component needs from an index.
pub trait IndexLookup {
    /// Entry of `term`. An unindexed term yields an entry with a document frequency of 0,
    /// no postings and the term's lexicon sentiment.
    ///
    /// An empty term is malformed rather than unindexed, and fails with `InvalidArgument`.
    fn get_postings(&self, term: &str) -> Result<IndexEntry>;

    fn get_document_length_norm(&self, doc_id: u64) -> Result<f32>;

    fn get_document_count(&self) -> u64;
}

pub struct InvertedIndex {
    reader: IndexReaderMemoryMapped,
    sentiment_lexicon: Arc<SentimentLexicon>,
}

impl InvertedIndex {
    pub fn new(reader: IndexReaderMemoryMapped, sentiment_lexicon: Arc<SentimentLexicon>) -> Self {
        InvertedIndex { reader, sentiment_lexicon }
    }

    pub fn open(dir: &Path, index_name: &str, sentiment_lexicon: Arc<SentimentLexicon>) -> Result<Self> {
        Ok(InvertedIndex::new(IndexReaderMemoryMapped::open(dir, index_name)?, sentiment_lexicon))
    }

    pub fn reader(&self) -> &IndexReaderMemoryMapped {
        &self.reader
    }

    /// Sum over the document's terms of sentiment × term frequency.
    pub fn get_document_sentiment(&self, doc_id: u64) -> Result<f32> {
        Ok(self.reader.read_norm_entry(doc_id)?.sentiment)
    }

    pub fn close(self) {
        self.reader.close();
    }
}

impl IndexLookup for InvertedIndex {
    fn get_postings(&self, term: &str) -> Result<IndexEntry> {
        if term.is_empty() {
            return Err(IndexError::invalid("cannot look up an empty term"));
        }

        match self.reader.lookup(term) {
            Some(term_info) => {
                let postings = self.reader.read_postings(term_info)?;
                IndexEntry::new(term_info.entry().clone(), postings)
            }
            None => Ok(IndexEntry::empty(term, self.sentiment_lexicon.get(term).copied().unwrap_or(0))),
        }
    }

    fn get_document_length_norm(&self, doc_id: u64) -> Result<f32> {
        Ok(self.reader.read_norm_entry(doc_id)?.norm)
    }

    fn get_document_count(&self) -> u64 {
        self.reader.doc_count()
    }
}
