use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use sentidex_common::codec::IndexDescriptor;
use sentidex_common::{DictionaryEntry, IndexError, Posting, Result, SentimentLexicon};

use crate::index_file::IndexWriter;

// Rough heap costs of the block structures, see estimated_heap_bytes
const TERM_OVERHEAD_BYTES: u64 = 96;
const DOC_FREQUENCY_BYTES: u64 = 24;
const DOC_ID_BYTES: u64 = 16;

/// In-memory term → (doc id → term frequency) accumulator for one block.
pub struct IndexBlockBuilder {
    sentiment_lexicon: Arc<SentimentLexicon>,
    terms: FxHashMap<String, FxHashMap<u64, u32>>,
    doc_ids: FxHashSet<u64>,
    estimated_heap_bytes: u64,
}

impl IndexBlockBuilder {
    pub fn new(sentiment_lexicon: Arc<SentimentLexicon>) -> Self {
        IndexBlockBuilder {
            sentiment_lexicon,
            terms: FxHashMap::default(),
            doc_ids: FxHashSet::default(),
            estimated_heap_bytes: 0,
        }
    }

    pub fn add_posting(&mut self, term: &str, doc_id: u64) -> Result<()> {
        if term.is_empty() {
            return Err(IndexError::invalid(format!("empty term in document {}", doc_id)));
        }

        if !self.terms.contains_key(term) {
            self.estimated_heap_bytes += TERM_OVERHEAD_BYTES + term.len() as u64;
            self.terms.insert(term.to_owned(), FxHashMap::default());
        }

        if let Some(doc_frequencies) = self.terms.get_mut(term) {
            let term_freq = doc_frequencies.entry(doc_id).or_insert(0);
            if *term_freq == 0 {
                self.estimated_heap_bytes += DOC_FREQUENCY_BYTES;
            }
            *term_freq = term_freq.saturating_add(1);
        }

        if self.doc_ids.insert(doc_id) {
            self.estimated_heap_bytes += DOC_ID_BYTES;
        }

        Ok(())
    }

    /// Number of distinct terms in the block.
    pub fn size(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn doc_count(&self) -> u64 {
        self.doc_ids.len() as u64
    }

    /// Approximate heap footprint of what the block holds, updated on every insertion.
    pub fn estimated_heap_bytes(&self) -> u64 {
        self.estimated_heap_bytes
    }

    /// Writes every term in ascending order, then finalizes with the number of distinct documents.
    pub fn flush(self, mut writer: IndexWriter) -> Result<IndexDescriptor> {
        let doc_count = self.doc_count();

        let mut terms: Vec<(String, FxHashMap<u64, u32>)> = self.terms.into_iter().collect();
        terms.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let mut postings: Vec<Posting> = Vec::new();
        for (term, doc_frequencies) in terms {
            postings.clear();
            postings.extend(doc_frequencies.into_iter().map(|(doc_id, term_freq)| Posting::new(doc_id, term_freq)));
            postings.sort_unstable_by_key(|posting| posting.doc_id);

            let sentiment = self.sentiment_lexicon.get(&term).copied().unwrap_or(0);
            let entry = DictionaryEntry::new(term, postings.len() as u64, sentiment)?;
            writer.write(&entry, &postings)?;
        }

        writer.finalize(doc_count)
    }
}
