use std::path::Path;

use serde::{Deserialize, Serialize};

use sentidex_common::{IndexError, Result};

/// Lower bound on the memory budget of a block, whatever the configuration says.
pub const MIN_MEMORY_USAGE_MB: u64 = 32;

fn get_default_index_name() -> String {
    "index".to_owned()
}

fn get_default_max_memory_usage_mb() -> u64 {
    64
}

fn get_default_max_block_terms() -> usize {
    1_000_000
}

fn get_default_max_memory_exceeded_count() -> u32 {
    3
}

fn get_default_input_buffer_count() -> usize {
    4
}

fn get_default_buffer_size() -> usize {
    4096
}

fn get_default_keep_intermediate_blocks() -> bool {
    false
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IndexingConfig {
    #[serde(default = "get_default_index_name")]
    pub index_name: String,

    #[serde(default = "get_default_max_memory_usage_mb")]
    pub max_memory_usage_mb: u64,

    /// Term cap per block once memory tracking has been given up on
    #[serde(default = "get_default_max_block_terms")]
    pub max_block_terms: usize,

    /// Consecutive memory threshold hits on an empty block tolerated before switching to the term cap
    #[serde(default = "get_default_max_memory_exceeded_count")]
    pub max_memory_exceeded_count: u32,

    /// Fan-in of a single merge
    #[serde(default = "get_default_input_buffer_count")]
    pub input_buffer_count: usize,

    #[serde(default = "get_default_buffer_size")]
    pub input_buffer_size: usize,

    #[serde(default = "get_default_buffer_size")]
    pub output_buffer_size: usize,

    #[serde(default = "get_default_keep_intermediate_blocks")]
    pub keep_intermediate_blocks: bool,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        IndexingConfig {
            index_name: get_default_index_name(),
            max_memory_usage_mb: get_default_max_memory_usage_mb(),
            max_block_terms: get_default_max_block_terms(),
            max_memory_exceeded_count: get_default_max_memory_exceeded_count(),
            input_buffer_count: get_default_input_buffer_count(),
            input_buffer_size: get_default_buffer_size(),
            output_buffer_size: get_default_buffer_size(),
            keep_intermediate_blocks: get_default_keep_intermediate_blocks(),
        }
    }
}

impl IndexingConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IndexingConfig = serde_json::from_str(json)
            .map_err(|e| IndexError::invalid(format!("indexing config does not match schema: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        IndexingConfig::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.index_name.is_empty() {
            return Err(IndexError::invalid("index_name must not be empty"));
        }
        if self.index_name.contains(|c| std::path::is_separator(c) || c == '.') {
            return Err(IndexError::invalid(format!("index_name {} must be a plain file stem", self.index_name)));
        }
        if self.max_block_terms == 0 {
            return Err(IndexError::invalid("max_block_terms must be at least 1"));
        }
        if self.input_buffer_count == 0 {
            return Err(IndexError::invalid("input_buffer_count must be at least 1"));
        }
        if self.input_buffer_size == 0 || self.output_buffer_size == 0 {
            return Err(IndexError::invalid("buffer sizes must be positive"));
        }

        Ok(())
    }

    /// Configured memory budget in bytes, raised to the minimum if set lower.
    pub fn max_memory_usage_bytes(&self) -> u64 {
        self.max_memory_usage_mb.max(MIN_MEMORY_USAGE_MB) * 1024 * 1024
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::IndexingConfig;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = IndexingConfig::from_json_str(r#"{ "index_name": "reviews", "input_buffer_count": 8 }"#).unwrap();
        assert_eq!(
            config,
            IndexingConfig {
                index_name: "reviews".to_owned(),
                input_buffer_count: 8,
                ..IndexingConfig::default()
            }
        );
    }

    #[test]
    fn test_memory_floor() {
        let config = IndexingConfig { max_memory_usage_mb: 1, ..IndexingConfig::default() };
        assert_eq!(config.max_memory_usage_bytes(), 32 * 1024 * 1024);

        let config = IndexingConfig { max_memory_usage_mb: 128, ..IndexingConfig::default() };
        assert_eq!(config.max_memory_usage_bytes(), 128 * 1024 * 1024);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(IndexingConfig::from_json_str(r#"{ "max_block_terms": 0 }"#).is_err());
        assert!(IndexingConfig::from_json_str(r#"{ "input_buffer_count": 0 }"#).is_err());
        assert!(IndexingConfig::from_json_str(r#"{ "input_buffer_count": 1 }"#).is_ok());
        assert!(IndexingConfig::from_json_str(r#"{ "index_name": "a/b" }"#).is_err());
        assert!(IndexingConfig::from_json_str(r#"{ "unknown_field": true }"#).is_err());
    }
}
