//! Construction of a sentiment-tagged, tf-idf weighted inverted index from a token
//! stream, using single-pass in-memory inversion and an external k-way merge.

pub mod index_file;
pub mod indexer;
pub mod loader;
pub mod spimi_reader;
pub mod spimi_writer;
pub mod utils;

pub use indexer::input_config::IndexingConfig;
pub use indexer::{IndexSummary, Indexer};

pub const SENTIDEX_VERSION: &str = env!("CARGO_PKG_VERSION");
pub static CONFIG_FILE: &str = "sentidex.json";
