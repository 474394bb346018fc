pub mod input_config;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use log::info;

use sentidex_common::{Result, SentimentLexicon, Token};

use crate::i_debug;
use crate::index_file::IndexWriter;
use crate::spimi_reader::{self, IndexBlockMerger};
use crate::spimi_writer::{BlockFootprint, MemorySignal, SpimiInverter};
use crate::utils::sequence::Sequence;
use crate::utils::time;

use self::input_config::IndexingConfig;

/// What an indexing run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSummary {
    pub index_name: String,
    pub output_dir: PathBuf,
    pub term_count: u64,
    pub doc_count: u64,
    pub block_count: usize,
    pub merge_passes: u32,
}

/// Runs the whole construction: SPIMI blocks, k-way merge, weighting.
///
/// Blocks and merge intermediates live in the construction directory. The final index
/// is written to the output directory under the configured index name. A failed run
/// leaves its temporary blocks behind, they are never resumed from.
pub struct Indexer {
    config: IndexingConfig,
    construction_dir: PathBuf,
    output_dir: PathBuf,
    sentiment_lexicon: Arc<SentimentLexicon>,
    start_instant: Option<Instant>,
}

impl Indexer {
    pub fn new(
        config: IndexingConfig,
        construction_dir: &Path,
        output_dir: &Path,
        sentiment_lexicon: SentimentLexicon,
    ) -> Result<Self> {
        config.validate()?;

        fs::create_dir_all(construction_dir)?;
        fs::create_dir_all(output_dir)?;

        Ok(Indexer {
            config,
            construction_dir: construction_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            sentiment_lexicon: Arc::new(sentiment_lexicon),
            start_instant: None,
        })
    }

    pub fn with_perf_logging(mut self, log_perf: bool) -> Self {
        self.start_instant = time::start_timer(log_perf);
        self
    }

    pub fn config(&self) -> &IndexingConfig {
        &self.config
    }

    pub fn index<I: IntoIterator<Item = Token>>(&self, tokens: I) -> Result<IndexSummary> {
        self.index_with_memory_signal(tokens, BlockFootprint)
    }

    pub fn index_with_memory_signal<I, M>(&self, tokens: I, memory_signal: M) -> Result<IndexSummary>
    where
        I: IntoIterator<Item = Token>,
        M: MemorySignal,
    {
        let log_perf = self.start_instant.is_some();

        // ------------------------------
        // Inversion
        let mut inverter = SpimiInverter::new(
            &self.config,
            &self.construction_dir,
            tokens.into_iter(),
            Arc::clone(&self.sentiment_lexicon),
            Sequence::default(),
        )
        .with_memory_signal(memory_signal)
        .with_perf_logging(log_perf);

        let mut block_names = Vec::new();
        while let Some(block_name) = inverter.invert()? {
            block_names.push(block_name);
        }

        i_debug!("Wrote {} blocks", block_names.len());
        time::print_time_elapsed(&self.start_instant, "Block indexing done!");

        if block_names.is_empty() {
            return self.write_empty_index();
        }

        // ------------------------------
        // Merging
        let outcome = IndexBlockMerger::new(&self.config, block_names.clone(), &self.construction_dir)?
            .with_perf_logging(log_perf)
            .external_multiway_merge()?;

        time::print_time_elapsed(&self.start_instant, "Blocks merged!");

        // ------------------------------
        // Weighting
        let descriptor = spimi_reader::compute_weights_and_create_final_index(
            &outcome.block_name,
            &self.construction_dir,
            &self.config.index_name,
            &self.output_dir,
            self.config.input_buffer_size,
            self.config.output_buffer_size,
        )?;

        time::print_time_elapsed(&self.start_instant, "Final index weighted!");

        if !self.config.keep_intermediate_blocks {
            spimi_reader::cleanup_blocks(block_names.iter().chain(&outcome.intermediate_blocks), &self.construction_dir);
        }

        let summary = IndexSummary {
            index_name: self.config.index_name.clone(),
            output_dir: self.output_dir.clone(),
            term_count: descriptor.term_count,
            doc_count: descriptor.doc_count.unwrap_or(0),
            block_count: block_names.len(),
            merge_passes: outcome.passes,
        };
        info!(
            "Indexed {} documents, {} terms into {} ({} blocks, {} merge passes)",
            summary.doc_count, summary.term_count, summary.index_name, summary.block_count, summary.merge_passes,
        );

        Ok(summary)
    }

    /// An empty token source still produces a valid, empty index.
    fn write_empty_index(&self) -> Result<IndexSummary> {
        info!("No tokens to index, writing an empty index");

        let writer = IndexWriter::create(&self.output_dir, &self.config.index_name, self.config.output_buffer_size)?;
        writer.finalize_with_norms(0, &[])?;

        Ok(IndexSummary {
            index_name: self.config.index_name.clone(),
            output_dir: self.output_dir.clone(),
            term_count: 0,
            doc_count: 0,
            block_count: 0,
            merge_passes: 0,
        })
    }
}
