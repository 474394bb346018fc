use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::info;
use rustc_hash::FxHashSet;

use sentidex_common::{DictionaryEntry, IndexEntry, IndexError, Posting, Result};

use super::merge_helper::MergeHelper;
use crate::i_debug;
use crate::index_file::{IndexReaderStreamed, IndexWriter};
use crate::indexer::input_config::IndexingConfig;
use crate::utils::time;

pub fn partial_block_name(index_name: &str, group: usize, pass: u32) -> String {
    format!("{}.partial{}_pass{}", index_name, group, pass)
}

/// Result of merging a set of blocks down to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub block_name: String,
    pub passes: u32,
    /// Every partial block written along the way, the final one included.
    /// Passes are numbered from 0 in their names.
    pub intermediate_blocks: Vec<String>,
}

/// Repeatedly merges groups of `input_buffer_count` blocks until one block is left.
pub struct IndexBlockMerger {
    index_name: String,
    block_names: Vec<String>,
    construction_dir: PathBuf,
    input_buffer_count: usize,
    input_buffer_size: usize,
    output_buffer_size: usize,
    log_perf: bool,
}

impl IndexBlockMerger {
    pub fn new(config: &IndexingConfig, block_names: Vec<String>, construction_dir: &Path) -> Result<Self> {
        if block_names.is_empty() {
            return Err(IndexError::invalid("no blocks to merge"));
        }
        if config.input_buffer_count == 0 {
            return Err(IndexError::invalid("a merge needs a fan-in of at least 1"));
        }
        // A single block needs no pass, several would never shrink at a fan-in of 1
        if config.input_buffer_count == 1 && block_names.len() > 1 {
            return Err(IndexError::invalid(format!(
                "a fan-in of 1 cannot merge {} blocks",
                block_names.len()
            )));
        }

        Ok(IndexBlockMerger {
            index_name: config.index_name.clone(),
            block_names,
            construction_dir: construction_dir.to_path_buf(),
            input_buffer_count: config.input_buffer_count,
            input_buffer_size: config.input_buffer_size,
            output_buffer_size: config.output_buffer_size,
            log_perf: false,
        })
    }

    pub fn with_perf_logging(mut self, log_perf: bool) -> Self {
        self.log_perf = log_perf;
        self
    }

    pub fn external_multiway_merge(&self) -> Result<MergeOutcome> {
        let mut outcome = MergeOutcome {
            block_name: String::new(),
            passes: 0,
            intermediate_blocks: Vec::new(),
        };

        let mut block_names = self.block_names.clone();
        while block_names.len() > 1 {
            block_names = self.merge_iteration(&block_names, outcome.passes)?;
            outcome.passes += 1;
            outcome.intermediate_blocks.extend(block_names.iter().cloned());
        }

        // Non-empty by construction
        outcome.block_name = block_names.pop().unwrap_or_default();
        info!("Merged {} blocks into {} in {} passes", self.block_names.len(), outcome.block_name, outcome.passes);

        Ok(outcome)
    }

    fn merge_iteration(&self, block_names: &[String], pass: u32) -> Result<Vec<String>> {
        let now = time::start_timer(self.log_perf);

        let mut output_names = Vec::with_capacity(block_names.len() / self.input_buffer_count + 1);
        for (group, input_names) in block_names.chunks(self.input_buffer_count).enumerate() {
            let output_name = partial_block_name(&self.index_name, group, pass);
            self.merge(input_names, &output_name)?;
            output_names.push(output_name);
        }

        info!("Merge pass {}: {} blocks into {}", pass, block_names.len(), output_names.len());
        time::print_time_elapsed(&now, &format!("merge pass {}", pass));

        Ok(output_names)
    }

    fn merge(&self, input_names: &[String], output_name: &str) -> Result<()> {
        i_debug!("Merging {:?} into {}", input_names, output_name);

        let readers = input_names
            .iter()
            .map(|name| IndexReaderStreamed::open(&self.construction_dir, name, self.input_buffer_size))
            .collect::<Result<Vec<_>>>()?;
        let mut helper = MergeHelper::new(readers)?;

        let mut writer = IndexWriter::create(&self.construction_dir, output_name, self.output_buffer_size)?;
        let mut doc_ids: FxHashSet<u64> = FxHashSet::default();
        while helper.has_next_entry() {
            let merged = merge_entries(helper.next_entries_with_same_term()?)?;
            doc_ids.extend(merged.postings().iter().map(|posting| posting.doc_id));
            writer.write(merged.dictionary_entry(), merged.postings())?;
        }

        writer.finalize(doc_ids.len() as u64)?;

        Ok(())
    }
}

/// Combines the entries of one term from different blocks.
///
/// Term frequencies of a document are summed across blocks, the result is ordered by doc
/// id, and weights are reset to 0 as they are only computed after the final merge.
/// The sentiment of the first entry is kept.
pub fn merge_entries(entries: Vec<IndexEntry>) -> Result<IndexEntry> {
    let mut entries = entries.into_iter();
    let first = entries.next().ok_or_else(|| IndexError::invalid("no entries to merge"))?;
    let (first_entry, first_postings) = first.into_parts();

    let mut term_freqs: BTreeMap<u64, u32> = BTreeMap::new();
    let mut add_postings = |postings: Vec<Posting>| {
        for posting in postings {
            let term_freq = term_freqs.entry(posting.doc_id).or_insert(0);
            *term_freq = term_freq.saturating_add(posting.term_freq);
        }
    };

    add_postings(first_postings);
    for entry in entries {
        if entry.term() != first_entry.term {
            return Err(IndexError::invalid(format!(
                "cannot merge entries of different terms ({} and {})",
                first_entry.term,
                entry.term(),
            )));
        }
        add_postings(entry.into_parts().1);
    }

    let postings: Vec<Posting> =
        term_freqs.into_iter().map(|(doc_id, term_freq)| Posting::new(doc_id, term_freq)).collect();

    IndexEntry::new(
        DictionaryEntry { doc_freq: postings.len() as u64, ..first_entry },
        postings,
    )
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use sentidex_common::{DictionaryEntry, IndexEntry, IndexError, Posting};

    use super::{merge_entries, IndexBlockMerger};
    use crate::index_file::{IndexReaderStreamed, IndexWriter};
    use crate::indexer::input_config::IndexingConfig;

    fn entry(term: &str, sentiment: i32, postings: &[(u64, u32)]) -> IndexEntry {
        IndexEntry::new(
            DictionaryEntry::new(term, postings.len() as u64, sentiment).unwrap(),
            postings.iter().map(|(doc_id, tf)| Posting::new(*doc_id, *tf)).collect(),
        )
        .unwrap()
    }

    fn write_block(dir: &std::path::Path, name: &str, entries: &[IndexEntry]) {
        let mut writer = IndexWriter::create(dir, name, 64).unwrap();
        let mut doc_ids: Vec<u64> = Vec::new();
        for e in entries {
            writer.write(e.dictionary_entry(), e.postings()).unwrap();
            doc_ids.extend(e.postings().iter().map(|p| p.doc_id));
        }
        doc_ids.sort_unstable();
        doc_ids.dedup();
        writer.finalize(doc_ids.len() as u64).unwrap();
    }

    fn read_all(dir: &std::path::Path, name: &str) -> Vec<(String, Vec<(u64, u32)>)> {
        IndexReaderStreamed::open(dir, name, 64)
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                (e.term().to_owned(), e.postings().iter().map(|p| (p.doc_id, p.term_freq)).collect())
            })
            .collect()
    }

    #[test]
    fn test_merge_entries_sums_term_frequencies() {
        let merged = merge_entries(vec![entry("x", 2, &[(1, 2)]), entry("x", 5, &[(1, 3), (2, 1)])]).unwrap();

        assert_eq!(merged.term(), "x");
        assert_eq!(merged.document_frequency(), 2);
        assert_eq!(merged.sentiment_value(), 2);
        assert_eq!(merged.postings(), &[Posting::new(1, 5), Posting::new(2, 1)][..]);
    }

    #[test]
    fn test_merge_entries_resets_weights() {
        let weighted = IndexEntry::new(
            DictionaryEntry::new("x", 1, 0).unwrap(),
            vec![Posting::new(4, 2).with_weight(0.6)],
        )
        .unwrap();

        let merged = merge_entries(vec![weighted]).unwrap();
        assert_eq!(merged.postings(), &[Posting::new(4, 2)][..]);
    }

    #[test]
    fn test_merge_entries_rejects_mixed_terms() {
        let err = merge_entries(vec![entry("x", 0, &[(1, 1)]), entry("y", 0, &[(1, 1)])]).unwrap_err();
        assert!(matches!(err, IndexError::InvalidArgument(_)));
        assert!(matches!(merge_entries(Vec::new()), Err(IndexError::InvalidArgument(_))));
    }

    #[test]
    fn test_multi_pass_merge() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..5).map(|i| format!("index_{}.blk", i)).collect();
        for (i, name) in names.iter().enumerate() {
            write_block(dir.path(), name, &[entry("common", 0, &[(i as u64, 1)]), entry(&format!("t{}", i), 0, &[(i as u64, 2)])]);
        }

        let config = IndexingConfig { input_buffer_count: 2, ..IndexingConfig::default() };
        let outcome = IndexBlockMerger::new(&config, names, dir.path()).unwrap().external_multiway_merge().unwrap();

        // 5 -> 3 -> 2 -> 1
        assert_eq!(outcome.passes, 3);
        assert_eq!(outcome.block_name, "index.partial0_pass2");
        assert_eq!(&outcome.intermediate_blocks[..3], &["index.partial0_pass0", "index.partial1_pass0", "index.partial2_pass0"]);
        assert_eq!(outcome.intermediate_blocks.len(), 6);

        let merged = read_all(dir.path(), &outcome.block_name);
        assert_eq!(merged[0], ("common".to_owned(), vec![(0, 1), (1, 1), (2, 1), (3, 1), (4, 1)]));
        assert_eq!(merged.iter().map(|(term, _)| term.as_str()).collect::<Vec<_>>(), vec!["common", "t0", "t1", "t2", "t3", "t4"]);

        let reader = IndexReaderStreamed::open(dir.path(), &outcome.block_name, 64).unwrap();
        assert_eq!(reader.doc_count(), Some(5));
    }

    #[test]
    fn test_single_block_is_returned_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        write_block(dir.path(), "index_0.blk", &[entry("a", 0, &[(0, 1)])]);

        let outcome = IndexBlockMerger::new(&IndexingConfig::default(), vec!["index_0.blk".to_owned()], dir.path())
            .unwrap()
            .external_multiway_merge()
            .unwrap();

        assert_eq!(outcome.block_name, "index_0.blk");
        assert_eq!(outcome.passes, 0);
        assert!(outcome.intermediate_blocks.is_empty());
    }

    #[test]
    fn test_single_block_with_fan_in_of_one() {
        let dir = tempfile::tempdir().unwrap();
        write_block(dir.path(), "index_0.blk", &[entry("a", 0, &[(0, 1)])]);

        let config = IndexingConfig { input_buffer_count: 1, ..IndexingConfig::default() };
        let outcome = IndexBlockMerger::new(&config, vec!["index_0.blk".to_owned()], dir.path())
            .unwrap()
            .external_multiway_merge()
            .unwrap();

        assert_eq!(outcome.block_name, "index_0.blk");
        assert_eq!(outcome.passes, 0);
        assert_eq!(read_all(dir.path(), "index_0.blk"), vec![("a".to_owned(), vec![(0, 1)])]);
    }

    #[test]
    fn test_fan_in_limits() {
        let names = vec!["index_0.blk".to_owned(), "index_1.blk".to_owned()];
        let dir = std::path::Path::new(".");

        let config = IndexingConfig { input_buffer_count: 1, ..IndexingConfig::default() };
        assert!(matches!(IndexBlockMerger::new(&config, names, dir), Err(IndexError::InvalidArgument(_))));

        let config = IndexingConfig { input_buffer_count: 0, ..IndexingConfig::default() };
        assert!(matches!(
            IndexBlockMerger::new(&config, vec!["index_0.blk".to_owned()], dir),
            Err(IndexError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_no_blocks() {
        assert!(IndexBlockMerger::new(&IndexingConfig::default(), Vec::new(), std::path::Path::new(".")).is_err());
    }
}
