//! Query-time access to a finalized index: memory-mapped postings and norms behind the
//! lookups a ranking component needs.

pub mod dictionary;
pub mod inverted_index;
pub mod mmap_reader;

pub use inverted_index::{IndexLookup, InvertedIndex};
pub use mmap_reader::IndexReaderMemoryMapped;
