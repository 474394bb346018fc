use std::fs::File;
use std::path::Path;

use log::info;
use memmap2::Mmap;

use sentidex_common::codec::{self, IndexDescriptor, NORM_ENTRY_SIZE, NORM_HEADER_SIZE};
use sentidex_common::{DictionaryEntryLinked, IndexError, IndexFiles, NormFileEntry, Posting, Result};

use crate::dictionary::Dictionary;

fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path)?;
    // The index files are only ever written by the indexer before the index is opened
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(mmap)
}

/// Random access reader over a finalized index.
///
/// Postings and norms stay memory-mapped and are decoded on demand, the dictionary is
/// held in memory. All reads take `&self`, so one reader can serve any number of lookups.
pub struct IndexReaderMemoryMapped {
    index_name: String,
    descriptor: IndexDescriptor,
    doc_count: u64,
    dictionary: Dictionary,
    postings: Mmap,
    norms: Mmap,
    max_doc_id: i64,
}

impl IndexReaderMemoryMapped {
    pub fn open(dir: &Path, index_name: &str) -> Result<Self> {
        let files = IndexFiles::new(dir, index_name);

        let descriptor = IndexDescriptor::read(&files.descriptor)?;
        let doc_count = descriptor
            .doc_count
            .ok_or_else(|| IndexError::corrupt(format!("index {} was never finalized", index_name)))?;

        let dictionary = Dictionary::load(&files.dictionary, &descriptor)?;
        let postings = map_file(&files.postings)?;
        let norms = map_file(&files.norms)?;

        let max_doc_id = codec::read_norm_header(&mut &norms[..])?;
        let expected_norms_len = max_doc_id
            .checked_add(1)
            .and_then(|records| (records as u64).checked_mul(NORM_ENTRY_SIZE))
            .and_then(|records_len| records_len.checked_add(NORM_HEADER_SIZE));
        if expected_norms_len != Some(norms.len() as u64) {
            return Err(IndexError::corrupt(format!(
                "norm file of {} holds {} bytes, which does not fit max doc id {}",
                index_name,
                norms.len(),
                max_doc_id,
            )));
        }

        info!("Opened index {} ({} terms, {} documents)", index_name, descriptor.term_count, doc_count);

        Ok(IndexReaderMemoryMapped {
            index_name: index_name.to_owned(),
            descriptor,
            doc_count,
            dictionary,
            postings,
            norms,
            max_doc_id,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn term_count(&self) -> u64 {
        self.descriptor.term_count
    }

    pub fn doc_count(&self) -> u64 {
        self.doc_count
    }

    /// Largest document id with a norm record, -1 for an empty index.
    pub fn max_doc_id(&self) -> i64 {
        self.max_doc_id
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn lookup(&self, term: &str) -> Option<&DictionaryEntryLinked> {
        self.dictionary.get_term_info(term)
    }

    pub fn read_postings(&self, entry: &DictionaryEntryLinked) -> Result<Vec<Posting>> {
        let offset = entry.postings_offset();
        if offset >= self.postings.len() as u64 {
            return Err(IndexError::corrupt(format!(
                "postings of term {} at offset {} lie beyond the {} byte postings file",
                entry.term(),
                offset,
                self.postings.len(),
            )));
        }

        let mut reader = &self.postings[offset as usize..];
        codec::decode_postings_list(&mut reader, entry.doc_freq())
    }

    pub fn read_norm_entry(&self, doc_id: u64) -> Result<NormFileEntry> {
        if self.max_doc_id < 0 || doc_id > self.max_doc_id as u64 {
            return Err(IndexError::DocumentOutOfRange { doc_id, max_doc_id: self.max_doc_id });
        }

        let offset = codec::norm_entry_offset(doc_id) as usize;
        let mut reader = &self.norms[offset..];
        match codec::decode_norm_entry(&mut reader)? {
            Some(norm_entry) if norm_entry.doc_id == doc_id => Ok(norm_entry),
            Some(norm_entry) => Err(IndexError::corrupt(format!(
                "norm record of document {} holds document {}",
                doc_id, norm_entry.doc_id,
            ))),
            None => Err(IndexError::DocumentNotFound(doc_id)),
        }
    }

    /// Releases the mappings.
    pub fn close(self) {}
}
