//! Single-pass in-memory inversion: accumulate postings until the memory budget is
//! reached, then spill the block to disk sorted by term.

mod block_builder;

use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};

use sentidex_common::{Result, SentimentLexicon, Token};

pub use self::block_builder::IndexBlockBuilder;

use crate::i_debug;
use crate::index_file::IndexWriter;
use crate::indexer::input_config::IndexingConfig;
use crate::utils::sequence::Sequence;
use crate::utils::time;

/// Source of the "memory in use" reading the inverter checks before every token.
pub trait MemorySignal {
    fn bytes_in_use(&mut self, builder: &IndexBlockBuilder) -> u64;
}

/// Reads the footprint the block builder tracks for itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockFootprint;

impl MemorySignal for BlockFootprint {
    fn bytes_in_use(&mut self, builder: &IndexBlockBuilder) -> u64 {
        builder.estimated_heap_bytes()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InverterState {
    Accumulating,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdMode {
    /// Blocks end when the memory signal reaches the budget
    MemoryTracking { consecutive_empty_hits: u32 },
    /// The memory signal kept firing on empty blocks, blocks now end at a fixed term count
    BlockSizeCapped,
}

pub fn block_name(index_name: &str, block_number: u32) -> String {
    format!("{}_{}.blk", index_name, block_number)
}

pub struct SpimiInverter<I: Iterator<Item = Token>, M: MemorySignal = BlockFootprint> {
    index_name: String,
    construction_dir: PathBuf,
    tokens: Peekable<I>,
    sentiment_lexicon: Arc<SentimentLexicon>,
    memory_signal: M,
    block_sequence: Sequence,
    max_memory_usage_bytes: u64,
    max_block_terms: usize,
    max_memory_exceeded_count: u32,
    output_buffer_size: usize,
    state: InverterState,
    threshold_mode: ThresholdMode,
    /// Block interrupted by a rejected token, resumed by the next `invert`
    pending_block: Option<IndexBlockBuilder>,
    log_perf: bool,
}

impl<I: Iterator<Item = Token>> SpimiInverter<I, BlockFootprint> {
    pub fn new(
        config: &IndexingConfig,
        construction_dir: &Path,
        tokens: I,
        sentiment_lexicon: Arc<SentimentLexicon>,
        block_sequence: Sequence,
    ) -> Self {
        SpimiInverter {
            index_name: config.index_name.clone(),
            construction_dir: construction_dir.to_path_buf(),
            tokens: tokens.peekable(),
            sentiment_lexicon,
            memory_signal: BlockFootprint,
            block_sequence,
            max_memory_usage_bytes: config.max_memory_usage_bytes(),
            max_block_terms: config.max_block_terms,
            max_memory_exceeded_count: config.max_memory_exceeded_count,
            output_buffer_size: config.output_buffer_size,
            state: InverterState::Accumulating,
            threshold_mode: ThresholdMode::MemoryTracking { consecutive_empty_hits: 0 },
            pending_block: None,
            log_perf: false,
        }
    }
}

impl<I: Iterator<Item = Token>, M: MemorySignal> SpimiInverter<I, M> {
    pub fn with_memory_signal<N: MemorySignal>(self, memory_signal: N) -> SpimiInverter<I, N> {
        SpimiInverter {
            index_name: self.index_name,
            construction_dir: self.construction_dir,
            tokens: self.tokens,
            sentiment_lexicon: self.sentiment_lexicon,
            memory_signal,
            block_sequence: self.block_sequence,
            max_memory_usage_bytes: self.max_memory_usage_bytes,
            max_block_terms: self.max_block_terms,
            max_memory_exceeded_count: self.max_memory_exceeded_count,
            output_buffer_size: self.output_buffer_size,
            state: self.state,
            threshold_mode: self.threshold_mode,
            pending_block: self.pending_block,
            log_perf: self.log_perf,
        }
    }

    pub fn with_perf_logging(mut self, log_perf: bool) -> Self {
        self.log_perf = log_perf;
        self
    }

    pub fn state(&self) -> InverterState {
        self.state
    }

    pub fn threshold_mode(&self) -> ThresholdMode {
        self.threshold_mode
    }

    pub fn block_sequence(&self) -> &Sequence {
        &self.block_sequence
    }

    /// Builds and writes the next block, returning its name.
    ///
    /// `None` once the token source is exhausted and nothing is left to write. If writing
    /// the block fails, the error is returned and the block number is not consumed.
    ///
    /// A malformed token is returned as an error without adding it. The postings gathered
    /// so far are kept, and the next call carries on with the same block.
    pub fn invert(&mut self) -> Result<Option<String>> {
        if self.state == InverterState::Done {
            return Ok(None);
        }

        let now = time::start_timer(self.log_perf);

        let mut builder = match self.pending_block.take() {
            Some(builder) => builder,
            None => IndexBlockBuilder::new(Arc::clone(&self.sentiment_lexicon)),
        };
        loop {
            if self.tokens.peek().is_none() {
                self.state = InverterState::Done;
                break;
            }

            if self.threshold_reached(&builder) {
                if builder.is_empty() {
                    continue;
                }
                break;
            }

            if let Some(token) = self.tokens.next() {
                if let Err(err) = builder.add_posting(&token.term, token.doc_id) {
                    warn!("Rejected token in document {}: {}", token.doc_id, err);
                    self.pending_block = Some(builder);
                    return Err(err);
                }
            }
        }

        if builder.is_empty() {
            return Ok(None);
        }

        let block_number = self.block_sequence.peek();
        let name = block_name(&self.index_name, block_number);
        let (terms, docs) = (builder.size(), builder.doc_count());

        let written = IndexWriter::create(&self.construction_dir, &name, self.output_buffer_size)
            .and_then(|writer| builder.flush(writer));
        if let Err(err) = written {
            error!("Failed to write block {}: {}", name, err);
            return Err(err);
        }

        self.block_sequence.advance();
        info!("Wrote block {} ({} terms, {} documents)", name, terms, docs);
        time::print_time_elapsed(&now, &format!("block {} written", block_number));

        Ok(Some(name))
    }

    fn threshold_reached(&mut self, builder: &IndexBlockBuilder) -> bool {
        match self.threshold_mode {
            ThresholdMode::BlockSizeCapped => builder.size() >= self.max_block_terms,
            ThresholdMode::MemoryTracking { consecutive_empty_hits } => {
                let bytes_in_use = self.memory_signal.bytes_in_use(builder);
                if bytes_in_use < self.max_memory_usage_bytes {
                    return false;
                }

                if !builder.is_empty() {
                    i_debug!("Memory threshold reached at {} bytes with {} terms", bytes_in_use, builder.size());
                    self.threshold_mode = ThresholdMode::MemoryTracking { consecutive_empty_hits: 0 };
                    return true;
                }

                let consecutive_empty_hits = consecutive_empty_hits + 1;
                if consecutive_empty_hits > self.max_memory_exceeded_count {
                    warn!(
                        "Memory usage ({} bytes) stays above the limit with an empty block, capping blocks at {} terms instead",
                        bytes_in_use, self.max_block_terms,
                    );
                    self.threshold_mode = ThresholdMode::BlockSizeCapped;
                } else {
                    info!(
                        "Memory usage ({} bytes) above the limit with an empty block ({}/{})",
                        bytes_in_use, consecutive_empty_hits, self.max_memory_exceeded_count,
                    );
                    self.threshold_mode = ThresholdMode::MemoryTracking { consecutive_empty_hits };
                }

                true
            }
        }
    }
}
