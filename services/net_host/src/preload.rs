//! Warmup pre-loader
//!
//! Pages in files the application is likely to need, so specialization does
//! not wait on cold disk reads. The manifest is a text file with one path per
//! line; blank lines and `#` comments are skipped.

use async_trait::async_trait;
use relay_core::PreWarmer;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use worker_config::service::prewarm::READ_CHUNK_BYTES;

#[derive(Debug, Clone, Default)]
pub struct FilePreloader {
    manifest: Option<PathBuf>,
}

impl FilePreloader {
    pub fn new(manifest: Option<PathBuf>) -> Self {
        Self { manifest }
    }

    /// Paths listed in a manifest body
    pub fn parse_manifest(contents: &str) -> Vec<PathBuf> {
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(PathBuf::from)
            .collect()
    }

    /// Read every file; returns (files read, bytes read)
    fn page_in(files: &[PathBuf]) -> (usize, u64) {
        let mut chunk = vec![0u8; READ_CHUNK_BYTES];
        let mut read_files = 0;
        let mut read_bytes = 0;
        for path in files {
            match read_in_chunks(path, &mut chunk) {
                Ok(bytes) => {
                    read_files += 1;
                    read_bytes += bytes;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping preload file"),
            }
        }
        (read_files, read_bytes)
    }
}

fn read_in_chunks(path: &Path, chunk: &mut [u8]) -> io::Result<u64> {
    let mut file = File::open(path)?;
    let mut total = 0u64;
    loop {
        let n = file.read(chunk)?;
        if n == 0 {
            return Ok(total);
        }
        total += n as u64;
    }
}

#[async_trait]
impl PreWarmer for FilePreloader {
    async fn pre_warm(&self) {
        let Some(manifest) = &self.manifest else {
            debug!("No preload manifest configured");
            return;
        };

        let contents = match tokio::fs::read_to_string(manifest).await {
            Ok(contents) => contents,
            Err(e) => {
                warn!(manifest = %manifest.display(), error = %e, "Preload manifest unreadable");
                return;
            }
        };
        let files = Self::parse_manifest(&contents);

        match tokio::task::spawn_blocking(move || Self::page_in(&files)).await {
            Ok((files, bytes)) => info!(files, bytes, "🔥 Preload complete"),
            Err(e) => warn!(error = %e, "Preload task failed"),
        }
    }
}
