use std::path::Path;

use log::info;
use rustc_hash::FxHashMap;

use sentidex_common::codec::{self, IndexDescriptor};
use sentidex_common::utils::weights;
use sentidex_common::{IndexEntry, IndexError, IndexFiles, NormFileEntry, Posting, Result};

use crate::index_file::{IndexReaderStreamed, IndexWriter};

#[derive(Default)]
struct DocumentAccumulator {
    sum_of_squares: f64,
    sentiment: f64,
}

/// Rewrites the fully merged block as the final index with tf-idf weights and writes
/// the per-document norm file.
///
/// The merged block is read from `construction_dir`, the final index lands in `output_dir`
/// under `index_name`. Both must not name the same files.
pub fn compute_weights_and_create_final_index(
    merged_block_name: &str,
    construction_dir: &Path,
    index_name: &str,
    output_dir: &Path,
    input_buffer_size: usize,
    output_buffer_size: usize,
) -> Result<IndexDescriptor> {
    if IndexFiles::new(construction_dir, merged_block_name).descriptor
        == IndexFiles::new(output_dir, index_name).descriptor
    {
        return Err(IndexError::invalid(format!(
            "final index {} would overwrite the merged block it is built from",
            index_name,
        )));
    }

    let mut reader = IndexReaderStreamed::open(construction_dir, merged_block_name, input_buffer_size)?;
    let doc_count = reader
        .doc_count()
        .ok_or_else(|| IndexError::corrupt(format!("merged block {} has no document count", merged_block_name)))?;

    let mut writer = IndexWriter::create(output_dir, index_name, output_buffer_size)?;
    let mut documents: FxHashMap<u64, DocumentAccumulator> = FxHashMap::default();

    while reader.has_next_entry() {
        let entry = reader.read_next_entry()?;
        let weighted = weigh_entry(entry, doc_count, &mut documents)?;
        writer.write(weighted.dictionary_entry(), weighted.postings())?;
    }

    if documents.len() as u64 != doc_count {
        return Err(IndexError::corrupt(format!(
            "merged block {} claims {} documents but its postings cover {}",
            merged_block_name,
            doc_count,
            documents.len(),
        )));
    }

    let mut norms: Vec<NormFileEntry> = documents
        .into_iter()
        .map(|(doc_id, accumulated)| NormFileEntry {
            doc_id,
            norm: accumulated.sum_of_squares.sqrt() as f32,
            sentiment: accumulated.sentiment as f32,
        })
        .collect();
    norms.sort_unstable_by_key(|norm| norm.doc_id);

    let descriptor = writer.finalize_with_norms(doc_count, &norms)?;
    info!("Weighted {} terms over {} documents into {}", descriptor.term_count, doc_count, index_name);

    Ok(descriptor)
}

fn weigh_entry(
    entry: IndexEntry,
    doc_count: u64,
    documents: &mut FxHashMap<u64, DocumentAccumulator>,
) -> Result<IndexEntry> {
    if entry.document_frequency() > doc_count {
        return Err(IndexError::corrupt(format!(
            "term {} occurs in {} documents out of {}",
            entry.term(),
            entry.document_frequency(),
            doc_count,
        )));
    }

    let idf = weights::get_idf(doc_count as f64, entry.document_frequency() as f64);
    let sentiment = entry.sentiment_value() as f64;
    let (dictionary_entry, postings) = entry.into_parts();

    let postings: Vec<Posting> = postings
        .into_iter()
        .map(|posting| {
            // Norms are accumulated over the weights as they will be read back
            let weight = codec::quantize_weight(weights::get_tf_idf(posting.term_freq, idf));

            let document = documents.entry(posting.doc_id).or_default();
            document.sum_of_squares += (weight as f64) * (weight as f64);
            document.sentiment += sentiment * posting.term_freq as f64;

            posting.with_weight(weight)
        })
        .collect();

    IndexEntry::new(dictionary_entry, postings)
}
