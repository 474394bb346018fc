//! Binary layout shared by every reader and writer of the index.
//!
//! ```text
//! DictionaryFile → (TermInfo)^TermCount
//! TermInfo       → TermLen(varint) Term(utf8) DocFreq(varint) PostingsOffsetDelta(varint) Sentiment(zig-zag varint)
//! PostingsFile   → ((DocIdDelta(varint) TermFreq(varint) Weight(var-float ×1000))^DocFreq)^TermCount
//! DescriptorFile → FileVersion(i32) TermCount(i64) [DocumentCount(i64)]
//! NormFile       → MaxDocId(i64) (DocId(i64) Norm(f32) Sentiment(f32))^(MaxDocId + 1)
//! ```
//!
//! All fixed width values are little endian. Decoders work over any [`Read`],
//! so the same code serves sequential file streams and memory-mapped slices.

use std::io::{Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{IndexError, Result};
use crate::structures::{DictionaryEntry, DictionaryEntryLinked, NormFileEntry, Posting};
use crate::utils::varint;

pub const FILE_VERSION: i32 = 0xAB01;
pub const WEIGHT_VAR_FLOAT_PRECISION: f32 = 1000.0;

pub const NORM_HEADER_SIZE: u64 = 8;
pub const NORM_ENTRY_SIZE: u64 = 16;
const NORM_SENTINEL_DOC_ID: i64 = -1;

const DESCRIPTOR_SIZE: usize = 12;
const FINALIZED_DESCRIPTOR_SIZE: usize = 20;

// Guards allocations against absurd counts read from a corrupted file
const MAX_PREALLOCATED_POSTINGS: u64 = 4096;

// ------------------------------
// Dictionary

pub fn encode_dictionary_entry(entry: &DictionaryEntry, offset_delta: u64, output_buf: &mut Vec<u8>) {
    varint::get_var_int_vec_u64(entry.term.len() as u64, output_buf);
    output_buf.extend_from_slice(entry.term.as_bytes());
    varint::get_var_int_vec_u64(entry.doc_freq, output_buf);
    varint::get_var_int_vec_u64(offset_delta, output_buf);
    varint::get_signed_var_int_vec(entry.sentiment as i64, output_buf);
}

pub fn decode_dictionary_entry<R: Read>(reader: &mut R, last_offset: u64) -> Result<DictionaryEntryLinked> {
    let decode_err = |e| IndexError::from_decode(e, "dictionary entry");

    let term_len = varint::read_var_int_u64(reader).map_err(decode_err)?;
    if term_len == 0 {
        return Err(IndexError::corrupt("empty term in dictionary"));
    }

    let mut term_bytes = Vec::new();
    reader.by_ref().take(term_len).read_to_end(&mut term_bytes).map_err(decode_err)?;
    if term_bytes.len() as u64 != term_len {
        return Err(IndexError::corrupt("truncated dictionary term"));
    }
    let term = String::from_utf8(term_bytes)
        .map_err(|_| IndexError::corrupt("dictionary term is not valid utf-8"))?;

    let doc_freq = varint::read_var_int_u64(reader).map_err(decode_err)?;
    let offset_delta = varint::read_var_int_u64(reader).map_err(decode_err)?;
    let sentiment = varint::read_signed_var_int(reader).map_err(decode_err)?;
    if sentiment < i32::MIN as i64 || sentiment > i32::MAX as i64 {
        return Err(IndexError::corrupt(format!("sentiment {} of term {} out of range", sentiment, term)));
    }

    DictionaryEntryLinked::from_delta(
        DictionaryEntry { term, doc_freq, sentiment: sentiment as i32 },
        last_offset,
        offset_delta,
    )
}

/// Decodes `term_count` consecutive dictionary entries, resolving every offset delta.
pub fn read_dictionary<R: Read>(reader: &mut R, term_count: u64) -> Result<Vec<DictionaryEntryLinked>> {
    let mut entries: Vec<DictionaryEntryLinked> = Vec::with_capacity(term_count.min(MAX_PREALLOCATED_POSTINGS) as usize);
    let mut last_offset: u64 = 0;
    for _ in 0..term_count {
        let entry = decode_dictionary_entry(reader, last_offset)?;
        if let Some(previous) = entries.last() {
            if previous.term() >= entry.term() {
                return Err(IndexError::corrupt(format!(
                    "dictionary terms out of order ({} before {})",
                    previous.term(),
                    entry.term(),
                )));
            }
        }

        last_offset = entry.postings_offset();
        entries.push(entry);
    }

    Ok(entries)
}

// ------------------------------
// Postings

/// Encodes a postings list that must already be sorted by strictly increasing doc id.
///
/// The first posting stores its absolute doc id, the rest store the gap to the previous one.
pub fn encode_postings_list(postings: &[Posting], output_buf: &mut Vec<u8>) -> Result<()> {
    let mut last_doc_id: u64 = 0;
    for (idx, posting) in postings.iter().enumerate() {
        if idx > 0 && posting.doc_id <= last_doc_id {
            return Err(IndexError::invalid(format!(
                "postings must be strictly increasing by doc id (last: {}, current: {})",
                last_doc_id, posting.doc_id,
            )));
        }
        if posting.term_freq == 0 {
            return Err(IndexError::invalid(format!("posting for doc {} has a zero term frequency", posting.doc_id)));
        }
        if !(posting.weight >= 0.0 && posting.weight.is_finite()) {
            return Err(IndexError::invalid(format!(
                "posting for doc {} has an invalid weight {}",
                posting.doc_id, posting.weight,
            )));
        }

        varint::get_var_int_vec_u64(posting.doc_id - last_doc_id, output_buf);
        varint::get_var_int_vec(posting.term_freq, output_buf);
        varint::get_var_float_vec(posting.weight, WEIGHT_VAR_FLOAT_PRECISION, output_buf);

        last_doc_id = posting.doc_id;
    }

    Ok(())
}

/// Rounds a weight to the precision it is stored with.
#[inline(always)]
pub fn quantize_weight(weight: f32) -> f32 {
    let precision = WEIGHT_VAR_FLOAT_PRECISION as f64;
    ((weight as f64 * precision).round() / precision) as f32
}

pub fn decode_postings_list<R: Read>(reader: &mut R, doc_freq: u64) -> Result<Vec<Posting>> {
    if doc_freq == 0 {
        return Err(IndexError::corrupt("stored postings list with a document frequency of 0"));
    }

    let decode_err = |e| IndexError::from_decode(e, "postings list");

    let mut postings = Vec::with_capacity(doc_freq.min(MAX_PREALLOCATED_POSTINGS) as usize);
    let mut last_doc_id: u64 = 0;
    for idx in 0..doc_freq {
        let doc_id_delta = varint::read_var_int_u64(reader).map_err(decode_err)?;
        let term_freq = varint::read_var_int(reader).map_err(decode_err)?;
        let weight = varint::read_var_float(reader, WEIGHT_VAR_FLOAT_PRECISION).map_err(decode_err)?;

        if idx > 0 && doc_id_delta == 0 {
            return Err(IndexError::corrupt(format!("repeated doc id {} in postings list", last_doc_id)));
        }
        let doc_id = last_doc_id
            .checked_add(doc_id_delta)
            .ok_or_else(|| IndexError::corrupt("doc id overflow in postings list"))?;

        postings.push(Posting { doc_id, term_freq, weight });
        last_doc_id = doc_id;
    }

    Ok(postings)
}

// ------------------------------
// Descriptor

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDescriptor {
    pub term_count: u64,
    /// Present once the index (or block) has been finalized with its document count
    pub doc_count: Option<u64>,
}

impl IndexDescriptor {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(FILE_VERSION)?;
        writer.write_i64::<LittleEndian>(to_i64(self.term_count, "term count")?)?;
        if let Some(doc_count) = self.doc_count {
            writer.write_i64::<LittleEndian>(to_i64(doc_count, "document count")?)?;
        }

        Ok(())
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < 4 {
            return Err(IndexError::corrupt("truncated descriptor"));
        }

        let mut reader = buf;
        let decode_err = |e| IndexError::from_decode(e, "descriptor");
        let found = reader.read_i32::<LittleEndian>().map_err(decode_err)?;
        if found != FILE_VERSION {
            return Err(IndexError::VersionMismatch { found, expected: FILE_VERSION });
        }

        if buf.len() != DESCRIPTOR_SIZE && buf.len() != FINALIZED_DESCRIPTOR_SIZE {
            return Err(IndexError::corrupt(format!("descriptor has an unexpected size of {} bytes", buf.len())));
        }

        let term_count = from_i64(reader.read_i64::<LittleEndian>().map_err(decode_err)?, "term count")?;
        let doc_count = if buf.len() == FINALIZED_DESCRIPTOR_SIZE {
            Some(from_i64(reader.read_i64::<LittleEndian>().map_err(decode_err)?, "document count")?)
        } else {
            None
        };

        Ok(IndexDescriptor { term_count, doc_count })
    }

    pub fn read(path: &Path) -> Result<Self> {
        IndexDescriptor::decode(&std::fs::read(path)?)
    }
}

// ------------------------------
// Norms

/// Writes the norm header and one record per doc id in `[0, max doc id]`.
///
/// `norms` must be sorted by strictly increasing doc id. Gaps get a sentinel record.
pub fn write_norm_file<W: Write>(writer: &mut W, norms: &[NormFileEntry]) -> Result<()> {
    let max_doc_id = match norms.last() {
        Some(last) => to_i64(last.doc_id, "doc id")?,
        None => NORM_SENTINEL_DOC_ID,
    };
    writer.write_i64::<LittleEndian>(max_doc_id)?;

    let mut next_doc_id: u64 = 0;
    for norm_entry in norms {
        if norm_entry.doc_id < next_doc_id {
            return Err(IndexError::invalid(format!(
                "norm entries must be strictly increasing by doc id, got {} after {}",
                norm_entry.doc_id,
                next_doc_id - 1,
            )));
        }

        while next_doc_id < norm_entry.doc_id {
            write_norm_record(writer, NORM_SENTINEL_DOC_ID, 0.0, 0.0)?;
            next_doc_id += 1;
        }

        write_norm_record(writer, norm_entry.doc_id as i64, norm_entry.norm, norm_entry.sentiment)?;
        next_doc_id += 1;
    }

    Ok(())
}

fn write_norm_record<W: Write>(writer: &mut W, doc_id: i64, norm: f32, sentiment: f32) -> Result<()> {
    writer.write_i64::<LittleEndian>(doc_id)?;
    writer.write_f32::<LittleEndian>(norm)?;
    writer.write_f32::<LittleEndian>(sentiment)?;
    Ok(())
}

pub fn read_norm_header<R: Read>(reader: &mut R) -> Result<i64> {
    let max_doc_id = reader
        .read_i64::<LittleEndian>()
        .map_err(|e| IndexError::from_decode(e, "norm header"))?;
    if max_doc_id < NORM_SENTINEL_DOC_ID {
        return Err(IndexError::corrupt(format!("negative max doc id {} in norm header", max_doc_id)));
    }

    Ok(max_doc_id)
}

/// Decodes one norm record, `None` for the sentinel of a missing document.
pub fn decode_norm_entry<R: Read>(reader: &mut R) -> Result<Option<NormFileEntry>> {
    let decode_err = |e| IndexError::from_decode(e, "norm entry");

    let doc_id = reader.read_i64::<LittleEndian>().map_err(decode_err)?;
    let norm = reader.read_f32::<LittleEndian>().map_err(decode_err)?;
    let sentiment = reader.read_f32::<LittleEndian>().map_err(decode_err)?;

    match doc_id {
        NORM_SENTINEL_DOC_ID => Ok(None),
        doc_id if doc_id < 0 => Err(IndexError::corrupt(format!("invalid doc id {} in norm file", doc_id))),
        doc_id => Ok(Some(NormFileEntry { doc_id: doc_id as u64, norm, sentiment })),
    }
}

#[inline(always)]
pub fn norm_entry_offset(doc_id: u64) -> u64 {
    NORM_HEADER_SIZE + doc_id * NORM_ENTRY_SIZE
}

fn to_i64(value: u64, what: &str) -> Result<i64> {
    if value > i64::MAX as u64 {
        return Err(IndexError::invalid(format!("{} {} does not fit the index format", what, value)));
    }
    Ok(value as i64)
}

fn from_i64(value: i64, what: &str) -> Result<u64> {
    if value < 0 {
        return Err(IndexError::corrupt(format!("negative {} {}", what, value)));
    }
    Ok(value as u64)
}
