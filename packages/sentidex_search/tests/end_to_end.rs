use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use sentidex::loader::TsvTokenSource;
use sentidex::spimi_writer::{IndexBlockBuilder, MemorySignal};
use sentidex::{IndexingConfig, Indexer};
use sentidex_common::{IndexError, IndexFiles, SentimentLexicon};
use sentidex_search::{IndexLookup, InvertedIndex};

struct AlwaysOver;

impl MemorySignal for AlwaysOver {
    fn bytes_in_use(&mut self, _builder: &IndexBlockBuilder) -> u64 {
        u64::MAX
    }
}

fn lexicon() -> SentimentLexicon {
    let mut lexicon = SentimentLexicon::default();
    lexicon.insert("great".to_owned(), 3);
    lexicon.insert("awful".to_owned(), -3);
    lexicon.insert("boring".to_owned(), -2);
    lexicon
}

fn build(dir: &Path, corpus: &str, config: IndexingConfig) -> InvertedIndex {
    let mut source = TsvTokenSource::new(corpus.as_bytes());
    Indexer::new(config, &dir.join("construction"), dir, lexicon())
        .unwrap()
        .index(&mut source)
        .unwrap();
    assert!(source.take_error().is_none());

    InvertedIndex::open(dir, "index", Arc::new(lexicon())).unwrap()
}

#[test]
fn test_two_document_index() {
    let dir = tempfile::tempdir().unwrap();
    let index = build(dir.path(), "0\ta b\n1\tb c\n", IndexingConfig::default());

    assert_eq!(index.get_document_count(), 2);

    let b = index.get_postings("b").unwrap();
    assert_eq!(b.document_frequency(), 2);
    assert_eq!(b.postings().iter().map(|p| p.doc_id).collect::<Vec<_>>(), vec![0, 1]);
    // Present in every document, so its idf is 0
    assert!(b.postings().iter().all(|p| p.weight == 0.0));

    let a = index.get_postings("a").unwrap();
    assert_eq!(a.postings().len(), 1);
    assert!(a.postings()[0].weight > 0.0);
    assert_eq!(index.get_document_length_norm(0).unwrap(), a.postings()[0].weight);
}

#[test]
fn test_norms_match_stored_weights() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = "0\tgreat great film\n1\tawful film\n2\tboring plot awful acting\n3\ta great plot\n";
    let index = build(dir.path(), corpus, IndexingConfig::default());

    let terms: Vec<String> = index.reader().dictionary().terms().map(str::to_owned).collect();
    let mut sum_of_squares = vec![0f64; 4];
    for term in &terms {
        for posting in index.get_postings(term).unwrap().postings() {
            sum_of_squares[posting.doc_id as usize] += (posting.weight as f64).powi(2);
        }
    }

    for (doc_id, sum) in sum_of_squares.iter().enumerate() {
        let norm = index.get_document_length_norm(doc_id as u64).unwrap();
        assert!((norm as f64 - sum.sqrt()).abs() < 1e-6, "doc {}: {} vs {}", doc_id, norm, sum.sqrt());
    }

    // great × 2, boring + awful, great
    assert_eq!(index.get_document_sentiment(0).unwrap(), 6.0);
    assert_eq!(index.get_document_sentiment(2).unwrap(), -5.0);
    assert_eq!(index.get_document_sentiment(3).unwrap(), 3.0);
}

#[test]
fn test_unknown_terms() {
    let dir = tempfile::tempdir().unwrap();
    let index = build(dir.path(), "0\tgood film\n", IndexingConfig::default());

    let awful = index.get_postings("awful").unwrap();
    assert_eq!((awful.document_frequency(), awful.sentiment_value()), (0, -3));
    assert!(awful.postings().is_empty());

    let unseen = index.get_postings("zebra").unwrap();
    assert_eq!((unseen.document_frequency(), unseen.sentiment_value()), (0, 0));

    assert!(matches!(index.get_postings(""), Err(IndexError::InvalidArgument(_))));
}

#[test]
fn test_norm_lookups_outside_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let index = build(dir.path(), "0\tfirst doc\n3\tlast doc\n", IndexingConfig::default());

    assert!(matches!(
        index.get_document_length_norm(4),
        Err(IndexError::DocumentOutOfRange { doc_id: 4, max_doc_id: 3 }),
    ));
    assert!(matches!(index.get_document_length_norm(1), Err(IndexError::DocumentNotFound(1))));
    assert!(index.get_document_length_norm(3).is_ok());
}

#[test]
fn test_block_partitioning_does_not_change_the_index() {
    let corpus = "0\tgreat film great cast\n1\tawful film\n2\tboring boring plot\n5\tgreat plot awful ending\n";

    let single_dir = tempfile::tempdir().unwrap();
    let single = build(single_dir.path(), corpus, IndexingConfig::default());

    let multi_dir = tempfile::tempdir().unwrap();
    let config = IndexingConfig {
        max_block_terms: 2,
        max_memory_exceeded_count: 1,
        input_buffer_count: 3,
        ..IndexingConfig::default()
    };
    let summary = Indexer::new(config, &multi_dir.path().join("construction"), multi_dir.path(), lexicon())
        .unwrap()
        .index_with_memory_signal(TsvTokenSource::new(corpus.as_bytes()), AlwaysOver)
        .unwrap();
    assert!(summary.block_count > 3);
    assert!(summary.merge_passes >= 2);
    let multi = InvertedIndex::open(multi_dir.path(), "index", Arc::new(lexicon())).unwrap();

    let mut single_terms: Vec<&str> = single.reader().dictionary().terms().collect();
    let mut multi_terms: Vec<&str> = multi.reader().dictionary().terms().collect();
    single_terms.sort_unstable();
    multi_terms.sort_unstable();
    assert_eq!(single_terms, multi_terms);

    for term in single_terms {
        assert_eq!(single.get_postings(term).unwrap(), multi.get_postings(term).unwrap());
    }
    for doc_id in [0, 1, 2, 5] {
        assert_eq!(
            single.get_document_length_norm(doc_id).unwrap(),
            multi.get_document_length_norm(doc_id).unwrap(),
        );
    }
    assert_eq!(single.get_document_count(), multi.get_document_count());
}

#[test]
fn test_open_rejects_foreign_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    build(dir.path(), "0\tsome text\n", IndexingConfig::default()).close();

    let descriptor = IndexFiles::new(dir.path(), "index").descriptor;
    let mut bytes = std::fs::read(&descriptor).unwrap();
    bytes[0] ^= 0xFF;
    std::fs::write(&descriptor, bytes).unwrap();

    assert!(matches!(
        InvertedIndex::open(dir.path(), "index", Arc::new(lexicon())),
        Err(IndexError::VersionMismatch { .. }),
    ));
}

#[test]
fn test_missing_index() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        InvertedIndex::open(dir.path(), "index", Arc::new(lexicon())),
        Err(IndexError::Io(_)),
    ));
}

#[test]
fn test_truncated_postings_are_corruption() {
    let dir = tempfile::tempdir().unwrap();
    build(dir.path(), "0\talpha beta\n1\tbeta gamma zeta\n", IndexingConfig::default()).close();

    let postings = IndexFiles::new(dir.path(), "index").postings;
    let len = std::fs::metadata(&postings).unwrap().len();
    std::fs::OpenOptions::new().write(true).open(&postings).unwrap().set_len(len - 1).unwrap();

    let index = InvertedIndex::open(dir.path(), "index", Arc::new(lexicon())).unwrap();
    assert!(index.get_postings("alpha").is_ok());
    // Last term in the dictionary, its postings now end one byte short
    assert!(index.get_postings("zeta").unwrap_err().is_corruption());
}
