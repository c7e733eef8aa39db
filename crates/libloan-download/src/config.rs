//! Download pipeline configuration

use std::path::PathBuf;
use std::time::Duration;

use libloan_core::batcher::DEFAULT_PLACEHOLDER;
use libloan_core::stream::DEFAULT_CHARSET;

/// Runtime configuration for the download pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// Backing dataset file
    pub dataset: PathBuf,
    /// Charset the published files are encoded in
    pub charset: String,
    /// Timestamps kept for the ETA
    pub window: usize,
    /// Per-row estimate before the window has an interval
    pub placeholder: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("datasource.csv"),
            charset: DEFAULT_CHARSET.to_string(),
            window: 8,
            placeholder: DEFAULT_PLACEHOLDER,
        }
    }
}
