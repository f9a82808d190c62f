//! Periodic persistence of generated grids.
//!
//! Grids are buffered and written out `batch_size` at a time, each batch to its own
//! `{prefix}_{sequence}.txt` file with the grids joined by single spaces.

use std::path::{Path, PathBuf};

use log::info;

use crate::PuzzleString;

/// How many grids go into each file unless told otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to create output directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write batch '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct BatchWriter {
    dir: PathBuf,
    prefix: String,
    batch_size: usize,
    sequence: usize,
    pending: Vec<PuzzleString>,
    written: Vec<PathBuf>,
}

impl BatchWriter {
    /// Create a writer for `dir`, creating the directory if needed. A batch size of zero is
    /// treated as one.
    pub fn new<P: AsRef<Path>>(dir: P, prefix: &str, batch_size: usize) -> Result<BatchWriter, BatchError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| BatchError::CreateDir { path: dir.clone(), source })?;

        Ok(BatchWriter {
            dir,
            prefix: prefix.to_string(),
            batch_size: batch_size.max(1),
            sequence: 0,
            pending: Vec::with_capacity(batch_size.max(1)),
            written: vec![],
        })
    }

    /// Buffer a grid, writing out a batch once enough have accumulated. Returns the path of the
    /// file written, if any.
    pub fn push(&mut self, puzzle: PuzzleString) -> Result<Option<PathBuf>, BatchError> {
        self.pending.push(puzzle);

        if self.pending.len() >= self.batch_size {
            self.write_batch().map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Write any remaining grids and return every path written by this writer.
    pub fn finish(mut self) -> Result<Vec<PathBuf>, BatchError> {
        if !self.pending.is_empty() {
            self.write_batch()?;
        }

        Ok(self.written)
    }

    fn write_batch(&mut self) -> Result<PathBuf, BatchError> {
        let path = self.dir.join(format!("{}_{}.txt", self.prefix, self.sequence));
        let contents = self.pending.iter().map(PuzzleString::as_str).collect::<Vec<_>>().join(" ");

        std::fs::write(&path, contents).map_err(|source| BatchError::Write { path: path.clone(), source })?;
        info!("Wrote {} grids to {}", self.pending.len(), path.display());

        self.pending.clear();
        self.sequence += 1;
        self.written.push(path.clone());

        Ok(path)
    }
}
