//! Everything that happens after the blocks are on disk: k-way merging them into one
//! block, then weighting that block into the final index.

mod merge_helper;
mod merger;
mod weighting;

use std::path::Path;

use log::warn;

use sentidex_common::IndexFiles;

pub use self::merge_helper::MergeHelper;
pub use self::merger::{merge_entries, partial_block_name, IndexBlockMerger, MergeOutcome};
pub use self::weighting::compute_weights_and_create_final_index;

/// Removes temporary block and merge files. Failures are logged, never fatal.
pub fn cleanup_blocks<'a, T: IntoIterator<Item = &'a String>>(block_names: T, construction_dir: &Path) {
    for block_name in block_names {
        if let Err(err) = IndexFiles::new(construction_dir, block_name).remove_all() {
            warn!("Failed to remove temporary block {}: {}", block_name, err);
        }
    }
}
