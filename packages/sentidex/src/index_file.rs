//! On-disk index files: one dictionary, one postings file, a descriptor and, for a
//! final index, the norm file. Blocks and merge intermediates use the same layout.

mod streamed_reader;
mod writer;

pub use streamed_reader::IndexReaderStreamed;
pub use writer::IndexWriter;

pub const DEFAULT_BUFFER_SIZE: usize = 4096;
