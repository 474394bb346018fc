use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use sentidex_common::codec::{self, IndexDescriptor};
use sentidex_common::{DictionaryEntry, IndexError, IndexFiles, NormFileEntry, Posting, Result};

use crate::i_debug;

/// Sequential writer for one index.
///
/// Entries go in strictly ascending term order. Each call to [`IndexWriter::write`] is
/// validated in full before any byte reaches the files, so a rejected entry leaves the
/// output untouched. [`IndexWriter::finalize`] consumes the writer.
pub struct IndexWriter {
    index_name: String,
    files: IndexFiles,
    dictionary_writer: BufWriter<File>,
    postings_writer: BufWriter<File>,
    dictionary_buf: Vec<u8>,
    postings_buf: Vec<u8>,
    postings_offset: u64,
    last_postings_offset: u64,
    last_term: Option<String>,
    term_count: u64,
}

impl IndexWriter {
    pub fn create(dir: &Path, index_name: &str, buffer_size: usize) -> Result<Self> {
        if index_name.is_empty() {
            return Err(IndexError::invalid("index name must not be empty"));
        }
        if buffer_size == 0 {
            return Err(IndexError::invalid("output buffer size must be positive"));
        }

        let files = IndexFiles::new(dir, index_name);
        let dictionary_writer = BufWriter::with_capacity(buffer_size, File::create(&files.dictionary)?);
        let postings_writer = BufWriter::with_capacity(buffer_size, File::create(&files.postings)?);

        Ok(IndexWriter {
            index_name: index_name.to_owned(),
            files,
            dictionary_writer,
            postings_writer,
            dictionary_buf: Vec::new(),
            postings_buf: Vec::new(),
            postings_offset: 0,
            last_postings_offset: 0,
            last_term: None,
            term_count: 0,
        })
    }

    pub fn write(&mut self, entry: &DictionaryEntry, postings: &[Posting]) -> Result<()> {
        if postings.is_empty() {
            return Err(IndexError::invalid(format!("term {} has no postings", entry.term)));
        }
        if entry.doc_freq != postings.len() as u64 {
            return Err(IndexError::invalid(format!(
                "term {} has a document frequency of {} but {} postings",
                entry.term,
                entry.doc_freq,
                postings.len(),
            )));
        }
        if let Some(last_term) = &self.last_term {
            if entry.term.as_str() <= last_term.as_str() {
                return Err(IndexError::invalid(format!(
                    "terms must be written in ascending order ({} after {})",
                    entry.term, last_term,
                )));
            }
        }

        self.postings_buf.clear();
        codec::encode_postings_list(postings, &mut self.postings_buf)?;

        self.dictionary_buf.clear();
        codec::encode_dictionary_entry(entry, self.postings_offset - self.last_postings_offset, &mut self.dictionary_buf);

        self.postings_writer.write_all(&self.postings_buf)?;
        self.dictionary_writer.write_all(&self.dictionary_buf)?;

        self.last_postings_offset = self.postings_offset;
        self.postings_offset += self.postings_buf.len() as u64;
        self.term_count += 1;
        match &mut self.last_term {
            Some(last_term) => {
                last_term.clear();
                last_term.push_str(&entry.term);
            }
            None => self.last_term = Some(entry.term.clone()),
        }

        Ok(())
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn term_count(&self) -> u64 {
        self.term_count
    }

    /// Flushes everything and writes the descriptor with the document count.
    pub fn finalize(self, doc_count: u64) -> Result<IndexDescriptor> {
        self.finish(doc_count, None)
    }

    /// Like [`IndexWriter::finalize`], additionally writing the norm file of a final index.
    ///
    /// `norms` must be sorted by strictly increasing doc id.
    pub fn finalize_with_norms(self, doc_count: u64, norms: &[NormFileEntry]) -> Result<IndexDescriptor> {
        self.finish(doc_count, Some(norms))
    }

    fn finish(mut self, doc_count: u64, norms: Option<&[NormFileEntry]>) -> Result<IndexDescriptor> {
        self.dictionary_writer.flush()?;
        self.postings_writer.flush()?;

        if let Some(norms) = norms {
            let mut norms_writer = BufWriter::new(File::create(&self.files.norms)?);
            codec::write_norm_file(&mut norms_writer, norms)?;
            norms_writer.flush()?;
        }

        // Written last, a descriptor on disk means the rest of the index is complete
        let descriptor = IndexDescriptor { term_count: self.term_count, doc_count: Some(doc_count) };
        let mut descriptor_writer = BufWriter::new(File::create(&self.files.descriptor)?);
        descriptor.write_to(&mut descriptor_writer)?;
        descriptor_writer.flush()?;

        i_debug!("Finalized {} with {} terms, {} documents", self.index_name, self.term_count, doc_count);

        Ok(descriptor)
    }
}
