use std::io;
use std::path::{Path, PathBuf};

pub static DICTIONARY_EXTENSION: &str = "dic";
pub static POSTINGS_EXTENSION: &str = "pst";
pub static DESCRIPTOR_EXTENSION: &str = "desc";
pub static NORMS_EXTENSION: &str = "nrm";

/// Paths of the files sharing one index (or block) base name.
#[derive(Debug, Clone)]
pub struct IndexFiles {
    pub dictionary: PathBuf,
    pub postings: PathBuf,
    pub descriptor: PathBuf,
    pub norms: PathBuf,
}

impl IndexFiles {
    pub fn new(dir: &Path, index_name: &str) -> Self {
        let with_ext = |ext: &str| dir.join(format!("{}.{}", index_name, ext));

        IndexFiles {
            dictionary: with_ext(DICTIONARY_EXTENSION),
            postings: with_ext(POSTINGS_EXTENSION),
            descriptor: with_ext(DESCRIPTOR_EXTENSION),
            norms: with_ext(NORMS_EXTENSION),
        }
    }

    /// Removes whichever of the files exist.
    pub fn remove_all(&self) -> io::Result<()> {
        for path in [&self.dictionary, &self.postings, &self.descriptor, &self.norms] {
            match std::fs::remove_file(path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }

        Ok(())
    }
}
