use std::cmp::Ordering;
use std::collections::BinaryHeap;

use sentidex_common::{IndexEntry, Result};

/// Head entry of one merge source.
struct SourceHead {
    entry: IndexEntry,
    source: usize,
}

// Min-heap on (term, source index)
impl Eq for SourceHead {}

impl Ord for SourceHead {
    fn cmp(&self, other: &Self) -> Ordering {
        match other.entry.term().cmp(self.entry.term()) {
            Ordering::Equal => other.source.cmp(&self.source),
            ordering => ordering,
        }
    }
}

impl PartialOrd for SourceHead {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SourceHead {
    fn eq(&self, other: &Self) -> bool {
        self.entry.term() == other.entry.term() && self.source == other.source
    }
}

/// K-way merge over term-sorted entry sources.
///
/// The heap holds at most one entry per source. Popping an entry always refills the slot
/// of the source it came from, so the merge is done exactly when the heap runs empty.
pub struct MergeHelper<S: Iterator<Item = Result<IndexEntry>>> {
    sources: Vec<S>,
    heap: BinaryHeap<SourceHead>,
}

impl<S: Iterator<Item = Result<IndexEntry>>> MergeHelper<S> {
    pub fn new(sources: Vec<S>) -> Result<Self> {
        let mut helper = MergeHelper { heap: BinaryHeap::with_capacity(sources.len()), sources };
        for source in 0..helper.sources.len() {
            helper.refill(source)?;
        }

        Ok(helper)
    }

    pub fn has_next_entry(&self) -> bool {
        !self.heap.is_empty()
    }

    /// Pops every source's entry for the smallest remaining term, in source order.
    ///
    /// Empty once all sources are drained.
    pub fn next_entries_with_same_term(&mut self) -> Result<Vec<IndexEntry>> {
        let mut entries = Vec::new();

        let first = match self.heap.pop() {
            Some(head) => head,
            None => return Ok(entries),
        };
        self.refill(first.source)?;
        entries.push(first.entry);

        while self.heap.peek().map_or(false, |head| head.entry.term() == entries[0].term()) {
            if let Some(head) = self.heap.pop() {
                self.refill(head.source)?;
                entries.push(head.entry);
            }
        }

        Ok(entries)
    }

    fn refill(&mut self, source: usize) -> Result<()> {
        if let Some(entry) = self.sources[source].next() {
            self.heap.push(SourceHead { entry: entry?, source });
        }

        Ok(())
    }
}
