pub mod codec;
pub mod error;
pub mod index_files;
pub mod structures;
pub mod utils;

pub use error::{IndexError, Result};
pub use index_files::IndexFiles;
pub use structures::{DictionaryEntry, DictionaryEntryLinked, IndexEntry, NormFileEntry, Posting, Token};

/// Term → sentiment score, used only to tag dictionary entries.
pub type SentimentLexicon = rustc_hash::FxHashMap<String, i32>;
