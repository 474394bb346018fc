use std::fs::File;
use std::io::{self, BufReader, Read};
use std::iter::FusedIterator;
use std::path::Path;

use sentidex_common::codec::{self, IndexDescriptor};
use sentidex_common::{DictionaryEntryLinked, IndexEntry, IndexError, IndexFiles, Result};

/// Counts the bytes pulled through the postings stream, so every dictionary offset
/// can be checked against the position the stream is actually at.
struct PositionedReader<R> {
    inner: R,
    position: u64,
}

impl<R: Read> Read for PositionedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.position += read as u64;
        Ok(read)
    }
}

/// Forward-only reader yielding the entries of an index in the order they were written.
pub struct IndexReaderStreamed {
    index_name: String,
    descriptor: IndexDescriptor,
    dictionary_reader: BufReader<File>,
    postings_reader: PositionedReader<BufReader<File>>,
    entries_read: u64,
    last_postings_offset: u64,
    /// Set by the first failed read; both streams are out of sync from then on.
    failed: bool,
}

impl IndexReaderStreamed {
    pub fn open(dir: &Path, index_name: &str, buffer_size: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(IndexError::invalid("input buffer size must be positive"));
        }

        let files = IndexFiles::new(dir, index_name);
        let descriptor = IndexDescriptor::read(&files.descriptor)?;

        Ok(IndexReaderStreamed {
            index_name: index_name.to_owned(),
            descriptor,
            dictionary_reader: BufReader::with_capacity(buffer_size, File::open(&files.dictionary)?),
            postings_reader: PositionedReader {
                inner: BufReader::with_capacity(buffer_size, File::open(&files.postings)?),
                position: 0,
            },
            entries_read: 0,
            last_postings_offset: 0,
            failed: false,
        })
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn descriptor(&self) -> IndexDescriptor {
        self.descriptor
    }

    pub fn term_count(&self) -> u64 {
        self.descriptor.term_count
    }

    /// Document count recorded at finalization, `None` for an unfinalized index.
    pub fn doc_count(&self) -> Option<u64> {
        self.descriptor.doc_count
    }

    pub fn has_next_entry(&self) -> bool {
        !self.failed && self.entries_read < self.descriptor.term_count
    }

    /// Reads the next entry. After the first error every later call fails as well.
    pub fn read_next_entry(&mut self) -> Result<IndexEntry> {
        if self.failed {
            return Err(IndexError::corrupt(format!(
                "index {} is unreadable past entry {}",
                self.index_name, self.entries_read,
            )));
        }
        if self.entries_read >= self.descriptor.term_count {
            return Err(IndexError::Exhausted(self.descriptor.term_count));
        }

        let entry = self.decode_next_entry();
        if entry.is_err() {
            self.failed = true;
        }
        entry
    }

    fn decode_next_entry(&mut self) -> Result<IndexEntry> {
        let linked = codec::decode_dictionary_entry(&mut self.dictionary_reader, self.last_postings_offset)?;
        if linked.postings_offset() != self.postings_reader.position {
            return Err(IndexError::corrupt(format!(
                "postings of term {} expected at offset {}, stream is at {}",
                linked.term(),
                linked.postings_offset(),
                self.postings_reader.position,
            )));
        }

        let postings = codec::decode_postings_list(&mut self.postings_reader, linked.doc_freq())?;

        self.last_postings_offset = linked.postings_offset();
        self.entries_read += 1;

        IndexEntry::new(linked.into_entry(), postings)
    }

    /// Reads the whole dictionary of an index without touching its postings.
    pub fn read_complete_dictionary(dir: &Path, index_name: &str) -> Result<Vec<DictionaryEntryLinked>> {
        let files = IndexFiles::new(dir, index_name);
        let descriptor = IndexDescriptor::read(&files.descriptor)?;
        let mut dictionary_reader = BufReader::new(File::open(&files.dictionary)?);

        codec::read_dictionary(&mut dictionary_reader, descriptor.term_count)
    }
}

impl Iterator for IndexReaderStreamed {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_next_entry() {
            Some(self.read_next_entry())
        } else {
            None
        }
    }
}

impl FusedIterator for IndexReaderStreamed {}

#[cfg(test)]
mod test {
    use std::fs::OpenOptions;

    use pretty_assertions::assert_eq;

    use sentidex_common::{DictionaryEntry, IndexError, IndexFiles, Posting};

    use super::IndexReaderStreamed;
    use crate::index_file::IndexWriter;

    fn write_sample(dir: &std::path::Path) {
        let mut writer = IndexWriter::create(dir, "sample", 16).unwrap();
        writer
            .write(&DictionaryEntry::new("bad", 2, -3).unwrap(), &[Posting::new(0, 1), Posting::new(4, 3)])
            .unwrap();
        writer.write(&DictionaryEntry::new("film", 1, 0).unwrap(), &[Posting::new(4, 1)]).unwrap();
        writer
            .write(&DictionaryEntry::new("good", 2, 3).unwrap(), &[Posting::new(1, 2), Posting::new(2, 1)])
            .unwrap();
        writer.finalize(4).unwrap();
    }

    #[test]
    fn test_reads_entries_in_written_order() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path());

        let mut reader = IndexReaderStreamed::open(dir.path(), "sample", 8).unwrap();
        assert_eq!(reader.term_count(), 3);
        assert_eq!(reader.doc_count(), Some(4));

        let first = reader.read_next_entry().unwrap();
        assert_eq!(first.term(), "bad");
        assert_eq!(first.sentiment_value(), -3);
        assert_eq!(first.postings(), &[Posting::new(0, 1), Posting::new(4, 3)][..]);

        let rest: Vec<String> = reader.by_ref().map(|entry| entry.unwrap().term().to_owned()).collect();
        assert_eq!(rest, vec!["film".to_owned(), "good".to_owned()]);

        assert!(!reader.has_next_entry());
        assert!(matches!(reader.read_next_entry(), Err(IndexError::Exhausted(3))));
    }

    #[test]
    fn test_read_complete_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path());

        let dictionary = IndexReaderStreamed::read_complete_dictionary(dir.path(), "sample").unwrap();
        let terms: Vec<(&str, u64)> = dictionary.iter().map(|e| (e.term(), e.doc_freq())).collect();
        assert_eq!(terms, vec![("bad", 2), ("film", 1), ("good", 2)]);
        assert_eq!(dictionary[0].postings_offset(), 0);
        assert!(dictionary[1].postings_offset() < dictionary[2].postings_offset());
    }

    #[test]
    fn test_truncated_postings_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path());

        let files = IndexFiles::new(dir.path(), "sample");
        let len = std::fs::metadata(&files.postings).unwrap().len();
        OpenOptions::new().write(true).open(&files.postings).unwrap().set_len(len - 2).unwrap();

        let reader = IndexReaderStreamed::open(dir.path(), "sample", 8).unwrap();
        let last = reader.last().unwrap();
        assert!(last.unwrap_err().is_corruption());
    }

    #[test]
    fn test_iteration_ends_after_first_error() {
        let dir = tempfile::tempdir().unwrap();
        write_sample(dir.path());

        let files = IndexFiles::new(dir.path(), "sample");
        let len = std::fs::metadata(&files.postings).unwrap().len();
        OpenOptions::new().write(true).open(&files.postings).unwrap().set_len(len - 2).unwrap();

        let mut reader = IndexReaderStreamed::open(dir.path(), "sample", 8).unwrap();
        let results: Vec<_> = reader.by_ref().collect();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok() && results[1].is_ok());
        assert!(results[2].as_ref().unwrap_err().is_corruption());

        assert!(!reader.has_next_entry());
        assert!(reader.next().is_none());
        assert!(reader.read_next_entry().unwrap_err().is_corruption());
    }
}
