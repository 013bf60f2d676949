//! Line source: supplies the URLs to feed, sequentially or by random sampling
//!
//! Each non-blank line of the input (trimmed) is one entry. Entry indices
//! count non-blank lines from zero.
//!
//! Random mode reads the input twice: once to sample entry indices and once
//! more to resolve them back to text, so the reader must be seekable.

pub mod sampler;

use rand::Rng;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use sampler::sample_indices;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to open input {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to rewind input: {0}")]
    Rewind(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// How entries are selected from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// First `count` entries in file order (0 = all)
    Sequential,
    /// `count` distinct entries chosen uniformly at random (0 = all)
    Random,
}

/// URL supplier over a seekable reader
pub struct LineSource<R> {
    reader: R,
}

impl LineSource<BufReader<File>> {
    /// Open an input file. Failure here is fatal to the run.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SourceError::Open {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Opened input");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead + Seek> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Select entries with the given mode, using the thread-local RNG for sampling
    pub fn select(&mut self, mode: SelectionMode, count: usize) -> Result<Vec<String>> {
        match mode {
            SelectionMode::Sequential => self.sequential(count),
            SelectionMode::Random => self.random(count, &mut rand::rng()),
        }
    }

    /// First `count` entries in file order; `count == 0` yields every entry
    pub fn sequential(&mut self, count: usize) -> Result<Vec<String>> {
        self.rewind()?;
        let limit = if count == 0 { usize::MAX } else { count };
        let urls: Vec<String> = entries(&mut self.reader).take(limit).collect();

        if count != 0 && urls.len() < count {
            warn!(
                requested = count,
                available = urls.len(),
                "Input exhausted before requested count, using what is available"
            );
        }

        Ok(urls)
    }

    /// `min(count, total)` distinct entries chosen uniformly at random, in
    /// sampler order; `count == 0` yields every entry
    pub fn random<G: Rng + ?Sized>(&mut self, count: usize, rng: &mut G) -> Result<Vec<String>> {
        let size = if count == 0 { usize::MAX } else { count };

        self.rewind()?;
        let indices = sample_indices(entries(&mut self.reader), size, rng);
        info!(sampled = indices.len(), requested = count, "Sampled entry indices");

        self.rewind()?;
        Ok(resolve(&mut self.reader, &indices))
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(0))
            .map(|_| ())
            .map_err(SourceError::Rewind)
    }
}

/// Non-blank, trimmed lines. A read error ends the stream; entries read so
/// far are kept.
fn entries<R: BufRead>(reader: R) -> impl Iterator<Item = String> {
    reader
        .lines()
        .map_while(|line| match line {
            Ok(line) => Some(line),
            Err(e) => {
                warn!(error = %e, "Failed to read input, keeping entries read so far");
                None
            }
        })
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
}

/// Map sampled indices back to their text in a single pass, keeping the
/// order of `indices`.
fn resolve<R: BufRead>(reader: R, indices: &[usize]) -> Vec<String> {
    let slots: HashMap<usize, usize> = indices
        .iter()
        .enumerate()
        .map(|(slot, &index)| (index, slot))
        .collect();
    let mut resolved: Vec<Option<String>> = vec![None; indices.len()];
    let mut remaining = indices.len();

    for (index, entry) in entries(reader).enumerate() {
        if remaining == 0 {
            break;
        }
        if let Some(&slot) = slots.get(&index) {
            resolved[slot] = Some(entry);
            remaining -= 1;
        }
    }

    if remaining > 0 {
        warn!(missing = remaining, "Some sampled entries could not be read back");
    }

    resolved.into_iter().flatten().collect()
}
