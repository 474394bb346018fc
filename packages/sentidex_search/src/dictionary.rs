use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rustc_hash::FxHashMap;

use sentidex_common::codec::{self, IndexDescriptor};
use sentidex_common::{DictionaryEntryLinked, Result};

/// Immutable term lookup table, loaded once when an index is opened.
pub struct Dictionary {
    term_infos: FxHashMap<String, DictionaryEntryLinked>,
}

impl Dictionary {
    pub fn load(dictionary_path: &Path, descriptor: &IndexDescriptor) -> Result<Self> {
        let mut reader = BufReader::new(File::open(dictionary_path)?);
        let entries = codec::read_dictionary(&mut reader, descriptor.term_count)?;

        let mut term_infos = FxHashMap::default();
        term_infos.reserve(entries.len());
        for entry in entries {
            term_infos.insert(entry.term().to_owned(), entry);
        }

        Ok(Dictionary { term_infos })
    }

    pub fn get_term_info(&self, term: &str) -> Option<&DictionaryEntryLinked> {
        self.term_infos.get(term)
    }

    pub fn len(&self) -> usize {
        self.term_infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_infos.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.term_infos.keys().map(String::as_str)
    }
}
