/// `log10(N / df)`. A term present in every document scores 0.
#[inline(always)]
pub fn get_idf(num_docs: f64, doc_freq: f64) -> f64 {
    (num_docs / doc_freq).log10()
}

/// `log10(1 + tf) * idf`, with a zero term frequency kept out of the log domain.
#[inline(always)]
pub fn get_tf_idf(term_freq: u32, idf: f64) -> f32 {
    if term_freq == 0 {
        return 0.0;
    }

    ((1.0 + term_freq as f64).log10() * idf) as f32
}

#[cfg(test)]
mod test {
    use super::{get_idf, get_tf_idf};

    #[test]
    fn test_idf() {
        assert_eq!(get_idf(2.0, 2.0), 0.0);
        assert!((get_idf(10.0, 1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tf_idf() {
        assert_eq!(get_tf_idf(0, 1.0), 0.0);
        assert_eq!(get_tf_idf(3, 0.0), 0.0);
        assert!((get_tf_idf(9, 1.0) - 1.0).abs() < 1e-6);
        assert!((get_tf_idf(1, 2.0) - 2.0 * 2f32.log10()).abs() < 1e-6);
    }
}
