//! Download one row's resource to its `SaveAt` destination

use libloan_core::batcher::BatchTask;
use libloan_core::error::{DatasetError, RowError};
use libloan_core::source::{is_complete, write_atomic};
use libloan_core::stream::{StreamError, fetch_text};
use libloan_core::{Row, RowSource};

/// Source of resource bodies, keyed by url
pub trait Fetcher {
    fn fetch(&mut self, url: &str) -> Result<String, StreamError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &mut F {
    fn fetch(&mut self, url: &str) -> Result<String, StreamError> {
        (**self).fetch(url)
    }
}

/// Blocking HTTP GET, decoded with a fixed charset
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    charset: String,
}

impl HttpFetcher {
    pub fn new(charset: impl Into<String>) -> Self {
        Self {
            charset: charset.into(),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&mut self, url: &str) -> Result<String, StreamError> {
        fetch_text(url, &self.charset)
    }
}

/// Selects valid rows whose destination is missing or empty; fetches and
/// writes them. A failed fetch permanently marks the row's url invalid.
#[derive(Debug)]
pub struct DownloadTask<F> {
    fetcher: F,
    pub downloaded: usize,
    pub invalidated: usize,
    pub bytes_written: u64,
}

impl<F: Fetcher> DownloadTask<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            downloaded: 0,
            invalidated: 0,
            bytes_written: 0,
        }
    }
}

impl<F: Fetcher> BatchTask for DownloadTask<F> {
    fn name(&self) -> &str {
        "download"
    }

    fn should_process(&self, _index: usize, row: &Row, source: &RowSource) -> bool {
        row.valid_url && !is_complete(&source.resolve(row))
    }

    fn process(&mut self, index: usize, row: &Row, source: &mut RowSource) -> Result<(), RowError> {
        let dest = source.resolve(row);
        log::info!("Downloading \"{}\"", row.url);

        match self.fetcher.fetch(&row.url) {
            Ok(text) => {
                log::info!("Writing \"{}\"", dest.display());
                write_atomic(&dest, text.as_bytes()).map_err(|e| DatasetError::Persistence {
                    path: dest.clone(),
                    source: e,
                })?;
                self.downloaded += 1;
                self.bytes_written += text.len() as u64;
                Ok(())
            }
            Err(e) => {
                log::warn!(
                    "Fetch failed for \"{}\": {e}; not creating \"{}\", marking url invalid",
                    row.url,
                    dest.display()
                );
                source.mark_invalid(index)?;
                self.invalidated += 1;
                Err(RowError::Fetch(e))
            }
        }
    }
}
